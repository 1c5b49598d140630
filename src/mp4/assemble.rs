use super::ftyp::FileTypeBox;
use super::mvhd::MovieHeader;
use super::r#box::{header_size_for, write_box_header};
use super::reader::{MediaDataHeader, MDAT};
use super::trak::{boxed, Track};
use super::trim::rescale;
use crate::errors::{Mp4Error, SeekResult};
use log::{debug, info};
use std::ops::Range;

pub const MOOV: &[u8; 4] = b"moov";

/// What to send to the client: freshly built header bytes followed by a
/// byte range of the source file copied unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekOutput {
    pub header: Vec<u8>,
    pub passthrough: Range<u64>,
    pub content_length: u64,
}

impl SeekOutput {
    /// Output that replays the whole source file untouched
    pub fn whole_file(file_len: u64) -> Self {
        Self {
            header: Vec::new(),
            passthrough: 0..file_len,
            content_length: file_len,
        }
    }
}

/// Rewrite mdhd, tkhd and mvhd durations from the cropped tables.
pub fn update_durations(mvhd: &mut MovieHeader, tracks: &mut [Track]) {
    let mut longest = 0u64;
    for track in tracks.iter_mut() {
        let ticks = track.stts.total_duration();
        track.mdhd.set_duration(ticks);
        let movie_ticks = rescale(ticks, track.timescale(), mvhd.timescale);
        track.tkhd.set_duration(movie_ticks);
        longest = longest.max(movie_ticks);
    }
    mvhd.set_duration(longest);
}

/// Media byte range `[start_pos, end_pos)` spanned by the trimmed tracks.
pub fn media_range(tracks: &[Track], mdat: &MediaDataHeader) -> SeekResult<Range<u64>> {
    let kept = tracks
        .iter()
        .filter_map(|t| t.bounds)
        .filter(|b| !b.is_empty());
    let (start, end) = kept.fold((u64::MAX, 0u64), |(lo, hi), b| {
        (lo.min(b.start_offset), hi.max(b.end_offset))
    });
    if start > end {
        return Err(Mp4Error::invalid_range("no track keeps any sample").into());
    }
    if start < mdat.payload_start() || end > mdat.payload_end() {
        return Err(Mp4Error::malformed(format!(
            "samples span bytes {}..{} outside mdat payload {}..{}",
            start,
            end,
            mdat.payload_start(),
            mdat.payload_end()
        ))
        .into());
    }
    Ok(start..end)
}

/// Build the output header (ftyp, rewritten moov, new mdat header) for
/// trimmed `tracks` and shift every chunk offset to its new position.
pub fn assemble(
    ftyp: &FileTypeBox,
    mvhd: &mut MovieHeader,
    tracks: &mut [Track],
    mdat: &MediaDataHeader,
) -> SeekResult<SeekOutput> {
    update_durations(mvhd, tracks);
    let range = media_range(tracks, mdat)?;
    let span = range.end - range.start;
    let mdat_header_size = header_size_for(span);

    let moov_size = boxed(mvhd.size() + tracks.iter().map(Track::size).sum::<u64>());
    let header_len = ftyp.size() + moov_size + mdat_header_size;
    let adjustment = header_len as i128 - range.start as i128;
    let adjustment = i64::try_from(adjustment).map_err(|_| {
        Mp4Error::unsupported(format!("chunk offset shift {} out of range", adjustment))
    })?;
    debug!(
        "moov {} bytes, mdat header {} bytes, chunk offsets shift by {}",
        moov_size, mdat_header_size, adjustment
    );
    for track in tracks.iter_mut() {
        track.stco.adjust(adjustment)?;
    }

    let mut header = Vec::with_capacity(header_len as usize);
    ftyp.write(&mut header);
    write_box_header(&mut header, MOOV, moov_size);
    mvhd.write(&mut header);
    for track in tracks.iter() {
        track.write(&mut header);
    }
    write_box_header(&mut header, MDAT, mdat_header_size + span);

    if header.len() as u64 != header_len {
        return Err(Mp4Error::malformed(format!(
            "rebuilt header is {} bytes, expected {}",
            header.len(),
            header_len
        ))
        .into());
    }

    info!(
        "Output: {} header bytes + media bytes {}..{}",
        header_len, range.start, range.end
    );
    Ok(SeekOutput {
        header,
        content_length: header_len + span,
        passthrough: range,
    })
}
