use super::r#box::{write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{patch_u32, patch_u64, u32_at, u64_at};
use crate::errors::{Mp4Error, SeekResult};

pub const MDHD: &[u8; 4] = b"mdhd";

/// Media header: the track's own timescale and duration in media ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHeader {
    pub version: u8,
    pub timescale: u32,
    pub duration: u64,
    data: Vec<u8>,
}

impl MediaHeader {
    pub fn parse(mdhd: &[u8]) -> SeekResult<Self> {
        let version = mdhd.first().copied().unwrap_or_default();
        let fields = if version == 1 {
            // Version 1: 64-bit values
            u32_at(mdhd, 20).zip(u64_at(mdhd, 24))
        } else {
            // Version 0: 32-bit values
            u32_at(mdhd, 12).zip(u32_at(mdhd, 16).map(u64::from))
        };
        let (timescale, duration) = fields.ok_or_else(|| {
            Mp4Error::malformed(format!(
                "mdhd v{} box too small: {} bytes",
                version,
                mdhd.len()
            ))
        })?;
        if timescale == 0 {
            return Err(Mp4Error::malformed("mdhd timescale is zero").into());
        }

        Ok(Self {
            version,
            timescale,
            duration,
            data: mdhd.to_vec(),
        })
    }

    pub fn set_duration(&mut self, duration: u64) {
        self.duration = duration;
        if self.version == 1 {
            patch_u64(&mut self.data, 24, duration);
        } else {
            patch_u32(&mut self.data, 16, duration.min(u32::MAX as u64) as u32);
        }
    }

    pub fn size(&self) -> u64 {
        BOX_HEADER_SIZE + self.data.len() as u64
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, MDHD, self.size());
        out.extend_from_slice(&self.data);
    }
}
