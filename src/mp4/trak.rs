use super::ctts::{CompositionOffsetBox, CTTS};
use super::mdhd::{MediaHeader, MDHD};
use super::r#box::{header_size_for, write_box_header, BoxDispatcher, BoxHeader};
use super::stco::{ChunkOffsetBox, CO64, STCO};
use super::stsc::{SampleToChunkBox, STSC};
use super::stss::{SyncSampleBox, STSS};
use super::stsz::{SampleSizeBox, STSZ};
use super::stts::{TimeToSampleBox, STTS};
use super::tkhd::{TrackHeader, TKHD};
use crate::errors::{Mp4Error, SeekResult};
use log::{debug, warn};
use std::borrow::Cow;

pub const TRAK: &[u8; 4] = b"trak";
pub const MDIA: &[u8; 4] = b"mdia";
pub const MINF: &[u8; 4] = b"minf";
pub const STBL: &[u8; 4] = b"stbl";
pub const HDLR: &[u8; 4] = b"hdlr";
pub const DINF: &[u8; 4] = b"dinf";
pub const STSD: &[u8; 4] = b"stsd";

/// Media information headers, one per handler family
const MEDIA_HEADERS: [&[u8; 4]; 6] = [b"vmhd", b"smhd", b"hmhd", b"nmhd", b"sthd", b"gmhd"];

/// A sub-box copied through untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBox {
    pub name: [u8; 4],
    pub data: Vec<u8>,
}

impl RawBox {
    pub fn size(&self) -> u64 {
        header_size_for(self.data.len() as u64) + self.data.len() as u64
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, &self.name, self.size());
        out.extend_from_slice(&self.data);
    }
}

/// Trim cursors of one track. Samples and chunks are 0-based; the `end_*`
/// sample and chunk are exclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrimBounds {
    pub start_sample: u32,
    pub start_chunk: u32,
    /// Samples of the first kept chunk that precede `start_sample`
    pub start_chunk_samples: u32,
    /// Byte size of those leading samples
    pub start_chunk_samples_size: u64,
    /// Absolute file offset of `start_sample`
    pub start_offset: u64,
    pub end_sample: u32,
    pub end_chunk: u32,
    /// Retained samples in the last kept chunk
    pub end_chunk_samples: u32,
    /// Byte size of those retained samples
    pub end_chunk_samples_size: u64,
    /// Absolute file offset one past the last retained byte
    pub end_offset: u64,
}

impl TrimBounds {
    pub fn sample_count(&self) -> u32 {
        self.end_sample - self.start_sample
    }

    pub fn chunk_count(&self) -> u32 {
        self.end_chunk - self.start_chunk
    }

    pub fn is_empty(&self) -> bool {
        self.end_sample <= self.start_sample
    }
}

/// Sub-boxes collected while walking one `trak`
#[derive(Debug, Default)]
struct TrackParts {
    tkhd: Option<TrackHeader>,
    mdhd: Option<MediaHeader>,
    hdlr: Option<RawBox>,
    media_header: Option<RawBox>,
    dinf: Option<RawBox>,
    stsd: Option<RawBox>,
    stts: Option<TimeToSampleBox>,
    ctts: Option<CompositionOffsetBox>,
    stss: Option<SyncSampleBox>,
    stsc: Option<SampleToChunkBox>,
    stsz: Option<SampleSizeBox>,
    stco: Option<ChunkOffsetBox>,
}

fn store<T>(slot: &mut Option<T>, value: T, name: &[u8; 4]) -> SeekResult<()> {
    if slot.is_some() {
        return Err(Mp4Error::malformed(format!(
            "duplicate {} box in trak",
            String::from_utf8_lossy(name)
        ))
        .into());
    }
    *slot = Some(value);
    Ok(())
}

fn raw(header: &BoxHeader, data: &[u8]) -> RawBox {
    RawBox {
        name: header.name,
        data: data.to_vec(),
    }
}

fn on_tkhd(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.tkhd, TrackHeader::parse(data)?, TKHD)
}

fn on_mdhd(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.mdhd, MediaHeader::parse(data)?, MDHD)
}

fn on_hdlr(parts: &mut TrackParts, header: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    if data.len() < 12 {
        return Err(
            Mp4Error::malformed(format!("hdlr box too small: {} bytes", data.len())).into(),
        );
    }
    store(&mut parts.hdlr, raw(header, data), HDLR)
}

fn on_media_header(parts: &mut TrackParts, header: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.media_header, raw(header, data), &header.name)
}

fn on_dinf(parts: &mut TrackParts, header: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.dinf, raw(header, data), DINF)
}

fn on_stsd(parts: &mut TrackParts, header: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.stsd, raw(header, data), STSD)
}

fn on_stts(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.stts, TimeToSampleBox::parse(data)?, STTS)
}

fn on_ctts(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.ctts, CompositionOffsetBox::parse(data)?, CTTS)
}

fn on_stss(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.stss, SyncSampleBox::parse(data)?, STSS)
}

fn on_stsc(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.stsc, SampleToChunkBox::parse(data)?, STSC)
}

fn on_stsz(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.stsz, SampleSizeBox::parse(data)?, STSZ)
}

fn on_stz2(_: &mut TrackParts, _: &BoxHeader, _: &[u8]) -> SeekResult<()> {
    Err(Mp4Error::unsupported("compact sample size box (stz2)").into())
}

fn on_stco(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.stco, ChunkOffsetBox::parse_stco(data)?, STCO)
}

fn on_co64(parts: &mut TrackParts, _: &BoxHeader, data: &[u8]) -> SeekResult<()> {
    store(&mut parts.stco, ChunkOffsetBox::parse_co64(data)?, CO64)
}

fn track_dispatcher() -> BoxDispatcher<TrackParts> {
    let mut dispatcher = BoxDispatcher::new()
        .with_container(MDIA)
        .with_container(MINF)
        .with_container(STBL)
        .with_handler(TKHD, on_tkhd)
        .with_handler(MDHD, on_mdhd)
        .with_handler(HDLR, on_hdlr)
        .with_handler(DINF, on_dinf)
        .with_handler(STSD, on_stsd)
        .with_handler(STTS, on_stts)
        .with_handler(CTTS, on_ctts)
        .with_handler(STSS, on_stss)
        .with_handler(STSC, on_stsc)
        .with_handler(STSZ, on_stsz)
        .with_handler(b"stz2", on_stz2)
        .with_handler(STCO, on_stco)
        .with_handler(CO64, on_co64);
    for name in MEDIA_HEADERS {
        dispatcher = dispatcher.with_handler(name, on_media_header);
    }
    dispatcher
}

fn missing(name: &[u8; 4]) -> Mp4Error {
    Mp4Error::malformed(format!(
        "trak is missing its {} box",
        String::from_utf8_lossy(name)
    ))
}

/// One `trak`: typed sample tables plus the verbatim boxes needed to rebuild it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub tkhd: TrackHeader,
    pub mdhd: MediaHeader,
    pub handler_type: [u8; 4],
    hdlr: RawBox,
    media_header: Option<RawBox>,
    dinf: Option<RawBox>,
    stsd: RawBox,
    pub stts: TimeToSampleBox,
    pub ctts: Option<CompositionOffsetBox>,
    pub stss: Option<SyncSampleBox>,
    pub stsc: SampleToChunkBox,
    pub stsz: SampleSizeBox,
    pub stco: ChunkOffsetBox,
    /// Set once the trimmer has run
    pub bounds: Option<TrimBounds>,
}

impl Track {
    /// Parse a `trak` payload.
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let mut parts = TrackParts::default();
        track_dispatcher().walk(&mut parts, TRAK, data)?;

        let hdlr = parts.hdlr.ok_or_else(|| missing(HDLR))?;
        let handler_type = [hdlr.data[8], hdlr.data[9], hdlr.data[10], hdlr.data[11]];
        let track = Self {
            tkhd: parts.tkhd.ok_or_else(|| missing(TKHD))?,
            mdhd: parts.mdhd.ok_or_else(|| missing(MDHD))?,
            handler_type,
            hdlr,
            media_header: parts.media_header,
            dinf: parts.dinf,
            stsd: parts.stsd.ok_or_else(|| missing(STSD))?,
            stts: parts.stts.ok_or_else(|| missing(STTS))?,
            ctts: parts.ctts,
            stss: parts.stss,
            stsc: parts.stsc.ok_or_else(|| missing(STSC))?,
            stsz: parts.stsz.ok_or_else(|| missing(STSZ))?,
            stco: parts.stco.ok_or_else(|| missing(STCO))?,
            bounds: None,
        };
        track.validate()?;

        if track.media_header.is_none() {
            warn!("Track {} has no media information header", track.id());
        }
        if track.stss.as_ref().is_some_and(|s| s.samples.is_empty()) {
            warn!("Track {} has an empty stss box", track.id());
        }
        debug!(
            "Track {} ({}): {} samples, {} chunks, timescale {}",
            track.id(),
            track.handler(),
            track.sample_count(),
            track.stco.chunk_count(),
            track.timescale()
        );
        Ok(track)
    }

    /// Cross-table consistency checks
    fn validate(&self) -> SeekResult<()> {
        let samples = self.stsz.sample_count as u64;
        if self.stts.sample_count() != samples {
            return Err(Mp4Error::malformed(format!(
                "track {}: stts describes {} samples, stsz {}",
                self.id(),
                self.stts.sample_count(),
                samples
            ))
            .into());
        }
        if self.stsz.uniform_size == 0 && self.stsz.sizes.len() as u64 != samples {
            return Err(Mp4Error::malformed(format!(
                "track {}: stsz lists {} sizes for {} samples",
                self.id(),
                self.stsz.sizes.len(),
                samples
            ))
            .into());
        }
        let addressed = self.stsc.sample_count(self.stco.chunk_count());
        if addressed < samples {
            return Err(Mp4Error::malformed(format!(
                "track {}: stsc addresses {} of {} samples",
                self.id(),
                addressed,
                samples
            ))
            .into());
        }
        if self.stsc.entries.iter().any(|e| e.samples_per_chunk == 0) {
            return Err(Mp4Error::malformed(format!(
                "track {}: stsc entry with zero samples per chunk",
                self.id()
            ))
            .into());
        }
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.tkhd.track_id
    }

    pub fn timescale(&self) -> u32 {
        self.mdhd.timescale
    }

    pub fn handler(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.handler_type)
    }

    pub fn is_video(&self) -> bool {
        &self.handler_type == b"vide"
    }

    pub fn sample_count(&self) -> u32 {
        self.stsz.sample_count
    }

    fn stbl_payload_size(&self) -> u64 {
        self.stsd.size()
            + self.stts.size()
            + self.ctts.as_ref().map_or(0, |b| b.size())
            + self.stss.as_ref().map_or(0, |b| b.size())
            + self.stsc.size()
            + self.stsz.size()
            + self.stco.size()
    }

    fn minf_payload_size(&self) -> u64 {
        self.media_header.as_ref().map_or(0, |b| b.size())
            + self.dinf.as_ref().map_or(0, |b| b.size())
            + boxed(self.stbl_payload_size())
    }

    fn mdia_payload_size(&self) -> u64 {
        self.mdhd.size() + self.hdlr.size() + boxed(self.minf_payload_size())
    }

    fn trak_payload_size(&self) -> u64 {
        self.tkhd.size() + boxed(self.mdia_payload_size())
    }

    /// Size of the rebuilt `trak` box.
    pub fn size(&self) -> u64 {
        boxed(self.trak_payload_size())
    }

    /// Rebuild the `trak` box from the current tables.
    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, TRAK, self.size());
        self.tkhd.write(out);

        write_box_header(out, MDIA, boxed(self.mdia_payload_size()));
        self.mdhd.write(out);
        self.hdlr.write(out);

        write_box_header(out, MINF, boxed(self.minf_payload_size()));
        if let Some(media_header) = &self.media_header {
            media_header.write(out);
        }
        if let Some(dinf) = &self.dinf {
            dinf.write(out);
        }

        write_box_header(out, STBL, boxed(self.stbl_payload_size()));
        self.stsd.write(out);
        self.stts.write(out);
        if let Some(ctts) = &self.ctts {
            ctts.write(out);
        }
        if let Some(stss) = &self.stss {
            stss.write(out);
        }
        self.stsc.write(out);
        self.stsz.write(out);
        self.stco.write(out);
    }
}

/// Size of a box holding `payload` bytes.
pub(crate) fn boxed(payload: u64) -> u64 {
    header_size_for(payload) + payload
}
