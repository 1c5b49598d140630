use super::assemble::{assemble, SeekOutput, MOOV};
use super::ftyp::{FileTypeBox, FTYP};
use super::mvhd::{MovieHeader, MVHD};
use super::r#box::{find_box, BoxDispatcher, BoxHeader};
use super::reader::{BoxReader, MediaDataHeader, ReadEvent};
use super::trak::{Track, TRAK};
use super::trim::trim_tracks;
use crate::errors::{Mp4Error, SeekResult};
use crate::seek::{SeekConfig, SeekRequest};
use log::{debug, info, warn};

pub const CMOV: &[u8; 4] = b"cmov";

/// Progress of a session after a [`Mp4Meta::feed`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaStatus {
    /// At least this many more bytes are needed
    NeedMore(u64),
    /// The output is ready, see [`Mp4Meta::output`]
    Complete,
}

/// Boxes parsed from the top level and from `moov`
#[derive(Debug, Default)]
pub struct Movie {
    pub ftyp: Option<FileTypeBox>,
    pub mvhd: Option<MovieHeader>,
    pub tracks: Vec<Track>,
    moov_seen: bool,
    max_tracks: usize,
    max_ftyp_size: usize,
}

fn on_ftyp(movie: &mut Movie, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    if movie.ftyp.is_some() {
        return Err(Mp4Error::malformed("duplicate ftyp box").into());
    }
    let ftyp = FileTypeBox::parse(data, movie.max_ftyp_size)?;
    debug!("ftyp major brand {}", ftyp.brand());
    movie.ftyp = Some(ftyp);
    Ok(())
}

fn on_mvhd(movie: &mut Movie, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    if movie.mvhd.is_some() {
        return Err(Mp4Error::malformed("duplicate mvhd box").into());
    }
    movie.mvhd = Some(MovieHeader::parse(data)?);
    Ok(())
}

fn on_trak(movie: &mut Movie, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    if movie.tracks.len() >= movie.max_tracks {
        return Err(Mp4Error::unsupported(format!(
            "more than {} tracks",
            movie.max_tracks
        ))
        .into());
    }
    movie.tracks.push(Track::parse(data)?);
    Ok(())
}

fn on_moov(movie: &mut Movie, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    if movie.moov_seen {
        return Err(Mp4Error::malformed("duplicate moov box").into());
    }
    if find_box(data, CMOV).is_some() {
        return Err(Mp4Error::unsupported("compressed movie box (cmov)").into());
    }
    BoxDispatcher::new()
        .with_handler(MVHD, on_mvhd)
        .with_handler(TRAK, on_trak)
        .walk(movie, MOOV, data)?;

    let Some(mvhd) = &movie.mvhd else {
        return Err(Mp4Error::malformed("moov box without mvhd").into());
    };
    if movie.tracks.is_empty() {
        return Err(Mp4Error::malformed("moov box without tracks").into());
    }
    info!(
        "moov parsed: {} tracks, timescale {}, duration {}",
        movie.tracks.len(),
        mvhd.timescale,
        mvhd.duration
    );
    movie.moov_seen = true;
    Ok(())
}

/// One seek session over one source file.
///
/// Feed the file from offset [`next_offset`](Self::next_offset) onwards; once
/// `moov` and the `mdat` header are known the tracks are trimmed and the output
/// is built. Any error ends the session without output.
pub struct Mp4Meta {
    request: SeekRequest,
    file_len: u64,
    reader: BoxReader,
    dispatcher: BoxDispatcher<Movie>,
    movie: Movie,
    mdat: Option<MediaDataHeader>,
    output: Option<SeekOutput>,
}

impl Mp4Meta {
    pub fn new(request: SeekRequest, file_len: u64, config: &SeekConfig) -> Self {
        Self {
            request,
            file_len,
            reader: BoxReader::new(file_len, config.max_buffer_size),
            dispatcher: BoxDispatcher::new()
                .with_handler(FTYP, on_ftyp)
                .with_handler(MOOV, on_moov),
            movie: Movie {
                max_tracks: config.max_tracks,
                max_ftyp_size: config.max_ftyp_size,
                ..Movie::default()
            },
            mdat: None,
            output: None,
        }
    }

    pub fn request(&self) -> &SeekRequest {
        &self.request
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    pub fn tracks(&self) -> &[Track] {
        &self.movie.tracks
    }

    pub fn mdat(&self) -> Option<&MediaDataHeader> {
        self.mdat.as_ref()
    }

    pub fn output(&self) -> Option<&SeekOutput> {
        self.output.as_ref()
    }

    pub fn into_output(self) -> Option<SeekOutput> {
        self.output
    }

    pub fn is_complete(&self) -> bool {
        self.output.is_some()
    }

    /// File offset of the next byte to feed.
    pub fn next_offset(&self) -> u64 {
        self.reader.next_offset()
    }

    /// Bytes the session will discard before it needs data again. A driver
    /// able to seek may jump over them with [`skip`](Self::skip).
    pub fn pending_skip(&self) -> u64 {
        self.reader.pending_skip()
    }

    /// Jump over up to `n` pending skip bytes without feeding them.
    pub fn skip(&mut self, n: u64) -> u64 {
        self.reader.skip(n)
    }

    /// Feed the next bytes of the file.
    pub fn feed(&mut self, chunk: &[u8]) -> SeekResult<MetaStatus> {
        if self.output.is_some() {
            return Ok(MetaStatus::Complete);
        }
        self.reader.feed(chunk);
        loop {
            let dispatcher = &self.dispatcher;
            match self.reader.poll(|name| dispatcher.handles(name))? {
                ReadEvent::NeedMore(n) => return Ok(MetaStatus::NeedMore(n)),
                ReadEvent::Box { header, data, .. } => {
                    self.dispatcher.dispatch(&mut self.movie, &header, &data)?;
                }
                ReadEvent::MediaData(mdat) => {
                    if self.mdat.is_some() {
                        warn!("Ignoring additional mdat box at offset {}", mdat.offset);
                    } else {
                        self.mdat = Some(mdat);
                    }
                }
                ReadEvent::End => return Err(self.missing_boxes().into()),
            }

            if self.movie.moov_seen && self.mdat.is_some() {
                self.finish()?;
                return Ok(MetaStatus::Complete);
            }
        }
    }

    /// Report that the input ended before the session completed.
    pub fn end_of_input(&mut self) -> SeekResult<()> {
        if self.output.is_some() {
            return Ok(());
        }
        let needed = self.file_len.saturating_sub(self.reader.next_offset()).max(1);
        Err(Mp4Error::TruncatedInput { needed }.into())
    }

    fn missing_boxes(&self) -> Mp4Error {
        if !self.movie.moov_seen {
            Mp4Error::malformed("no moov box in file")
        } else {
            Mp4Error::malformed("no mdat box in file")
        }
    }

    fn finish(&mut self) -> SeekResult<()> {
        let Movie {
            ftyp, mvhd, tracks, ..
        } = &mut self.movie;
        let (Some(ftyp), Some(mvhd), Some(mdat)) = (ftyp.as_ref(), mvhd.as_mut(), self.mdat)
        else {
            return Err(Mp4Error::malformed("no ftyp box ahead of moov and mdat").into());
        };

        trim_tracks(tracks, &self.request)?;
        let output = if self.request.is_full() {
            info!("Full-file request, passing {} bytes through", self.file_len);
            SeekOutput::whole_file(self.file_len)
        } else {
            assemble(ftyp, mvhd, tracks, &mdat)?
        };
        self.output = Some(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SeekError;
    use crate::mp4::fixtures::{build_mp4, make_box, MovieSpec, TrackSpec};

    fn run(
        file: &[u8],
        request: SeekRequest,
        config: &SeekConfig,
        chunk: usize,
    ) -> SeekResult<Mp4Meta> {
        let mut meta = Mp4Meta::new(request, file.len() as u64, config);
        loop {
            let start = meta.next_offset() as usize;
            let end = (start + chunk).min(file.len());
            if start >= end {
                meta.end_of_input()?;
                return Ok(meta);
            }
            if let MetaStatus::Complete = meta.feed(&file[start..end])? {
                return Ok(meta);
            }
        }
    }

    #[test]
    fn test_session_completes_in_small_chunks() {
        let file = build_mp4(&MovieSpec::two_track_70s());
        let request = SeekRequest::from_start(35_000);
        let meta = run(&file, request, &SeekConfig::default(), 500).unwrap();
        let output = meta.output().unwrap();
        assert_eq!(meta.tracks().len(), 2);
        assert_eq!(
            output.content_length,
            output.header.len() as u64 + output.passthrough.end - output.passthrough.start
        );
    }

    #[test]
    fn test_moov_after_mdat_skips_media_payload() {
        let mut spec = MovieSpec::two_track_70s();
        spec.moov_last = true;
        let file = build_mp4(&spec);

        let request = SeekRequest::from_start(10_000);
        let mut meta = Mp4Meta::new(request, file.len() as u64, &SeekConfig::default());
        let mut fed = 0u64;
        loop {
            if meta.pending_skip() > 0 {
                let n = meta.pending_skip();
                meta.skip(n);
            }
            let start = meta.next_offset() as usize;
            let end = (start + 4096).min(file.len());
            fed += (end - start) as u64;
            if meta.feed(&file[start..end]).unwrap() == MetaStatus::Complete {
                break;
            }
        }
        assert!(meta.is_complete());
        // only the boxes around the media payload were read
        assert!(fed < file.len() as u64 / 2);
    }

    #[test]
    fn test_full_request_passes_file_through() {
        let file = build_mp4(&MovieSpec::two_track_70s());
        let meta = run(&file, SeekRequest::default(), &SeekConfig::default(), 8192).unwrap();
        assert_eq!(meta.output(), Some(&SeekOutput::whole_file(file.len() as u64)));
    }

    #[test]
    fn test_cmov_rejected_before_tracks() {
        let mut spec = MovieSpec::new(vec![TrackSpec::audio(1, 5)]);
        spec.extra_moov_boxes.push(make_box(b"cmov", &[0; 16]));
        let file = build_mp4(&spec);
        let err = run(&file, SeekRequest::from_start(1000), &SeekConfig::default(), 1 << 20)
            .err()
            .unwrap();
        assert!(matches!(err, SeekError::Mp4(Mp4Error::Unsupported { .. })));
    }

    #[test]
    fn test_too_many_tracks() {
        let tracks = (1..=3).map(|id| TrackSpec::audio(id, 2)).collect();
        let file = build_mp4(&MovieSpec::new(tracks));
        let config = SeekConfig {
            max_tracks: 2,
            ..SeekConfig::default()
        };
        let err = run(&file, SeekRequest::from_start(500), &config, 1 << 20)
            .err()
            .unwrap();
        assert!(matches!(err, SeekError::Mp4(Mp4Error::Unsupported { .. })));
    }

    #[test]
    fn test_truncated_input_reports_needed_bytes() {
        let file = build_mp4(&MovieSpec::new(vec![TrackSpec::audio(1, 5)]));
        let request = SeekRequest::from_start(1000);
        let mut meta = Mp4Meta::new(request, file.len() as u64, &SeekConfig::default());
        assert!(matches!(meta.feed(&file[..100]).unwrap(), MetaStatus::NeedMore(_)));
        let err = meta.end_of_input().unwrap_err();
        assert!(matches!(err, SeekError::Mp4(Mp4Error::TruncatedInput { .. })));
        assert!(meta.output().is_none());
    }

    #[test]
    fn test_file_without_moov() {
        let file = [make_box(b"ftyp", b"isom\0\0\0\0"), make_box(b"mdat", &[0; 64])].concat();
        let err = run(&file, SeekRequest::from_start(0), &SeekConfig::default(), 1024)
            .err()
            .unwrap();
        assert!(matches!(err, SeekError::Mp4(Mp4Error::MalformedBox { .. })));
    }
}
