use super::r#box::{write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{patch_u32, patch_u64, u32_at, u64_at};
use crate::errors::{Mp4Error, SeekResult};

pub const TKHD: &[u8; 4] = b"tkhd";

/// Track header; its duration is expressed in the movie timescale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHeader {
    pub version: u8,
    pub track_id: u32,
    pub duration: u64,
    data: Vec<u8>,
}

impl TrackHeader {
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let version = data.first().copied().unwrap_or_default();
        let fields = if version == 1 {
            u32_at(data, 20).zip(u64_at(data, 28))
        } else {
            u32_at(data, 12).zip(u32_at(data, 20).map(u64::from))
        };
        let (track_id, duration) = fields.ok_or_else(|| {
            Mp4Error::malformed(format!(
                "tkhd v{} box too small: {} bytes",
                version,
                data.len()
            ))
        })?;

        Ok(Self {
            version,
            track_id,
            duration,
            data: data.to_vec(),
        })
    }

    pub fn set_duration(&mut self, duration: u64) {
        self.duration = duration;
        if self.version == 1 {
            patch_u64(&mut self.data, 28, duration);
        } else {
            patch_u32(&mut self.data, 20, duration.min(u32::MAX as u64) as u32);
        }
    }

    pub fn size(&self) -> u64 {
        BOX_HEADER_SIZE + self.data.len() as u64
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, TKHD, self.size());
        out.extend_from_slice(&self.data);
    }
}
