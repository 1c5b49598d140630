use super::r#box::{write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{patch_u32, patch_u64, u32_at, u64_at};
use crate::errors::{Mp4Error, SeekResult};

pub const MVHD: &[u8; 4] = b"mvhd";

/// Movie header. Version 0 stores 32-bit times, version 1 64-bit times; both
/// decode into the same fields and the payload is kept to be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieHeader {
    pub version: u8,
    pub timescale: u32,
    pub duration: u64,
    data: Vec<u8>,
}

impl MovieHeader {
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let version = data.first().copied().unwrap_or_default();
        let fields = if version == 1 {
            u32_at(data, 20).zip(u64_at(data, 24))
        } else {
            u32_at(data, 12).zip(u32_at(data, 16).map(u64::from))
        };
        let (timescale, duration) = fields.ok_or_else(|| {
            Mp4Error::malformed(format!(
                "mvhd v{} box too small: {} bytes",
                version,
                data.len()
            ))
        })?;
        if timescale == 0 {
            return Err(Mp4Error::malformed("mvhd timescale is zero").into());
        }

        Ok(Self {
            version,
            timescale,
            duration,
            data: data.to_vec(),
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
        write_box_header(out, MVHD, self.size());
        out.extend_from_slice(&self.data);
    }
}
