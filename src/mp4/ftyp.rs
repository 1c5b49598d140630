use super::r#box::{write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::u32_at;
use crate::errors::{Mp4Error, SeekResult};
use std::borrow::Cow;

pub const FTYP: &[u8; 4] = b"ftyp";

/// File type box, re-emitted verbatim in front of the rewritten movie box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeBox {
    pub major_brand: [u8; 4],
    pub minor_version: u32,
    data: Vec<u8>,
}

impl FileTypeBox {
    /// Parse an ftyp payload no larger than `max_size` bytes including its header.
    pub fn parse(data: &[u8], max_size: usize) -> SeekResult<Self> {
        let total = data.len() as u64 + BOX_HEADER_SIZE;
        if total > max_size as u64 {
            return Err(Mp4Error::malformed(format!(
                "ftyp box is {} bytes, limit is {}",
                total, max_size
            ))
            .into());
        }
        let (Some(brand), Some(minor_version)) = (data.get(0..4), u32_at(data, 4)) else {
            return Err(Mp4Error::malformed(format!(
                "ftyp box too small: {} bytes",
                data.len()
            ))
            .into());
        };

        Ok(Self {
            major_brand: [brand[0], brand[1], brand[2], brand[3]],
            minor_version,
            data: data.to_vec(),
        })
    }

    pub fn brand(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.major_brand)
    }

    /// Compatible brands following the major brand and minor version
    pub fn compatible_brands(&self) -> impl Iterator<Item = &[u8]> {
        self.data.get(8..).unwrap_or_default().chunks_exact(4)
    }

    pub fn size(&self) -> u64 {
        BOX_HEADER_SIZE + self.data.len() as u64
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, FTYP, self.size());
        out.extend_from_slice(&self.data);
    }
}
