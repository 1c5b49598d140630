use super::r#box::{parse_table_header, write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{read_u32, u32_at, write_u32};
use crate::errors::{Mp4Error, SeekResult};

pub const STSZ: &[u8; 4] = b"stsz";

/// Per-sample byte sizes, or one uniform size for every sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSizeBox {
    pub version_flags: u32,
    /// Non-zero when every sample has this size and `sizes` is empty
    pub uniform_size: u32,
    pub sample_count: u32,
    pub sizes: Vec<u32>,
}

impl SampleSizeBox {
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let uniform_size = u32_at(data, 4).ok_or_else(|| {
            Mp4Error::malformed("stsz box too small: expected at least 12 bytes".to_string())
        })?;
        let entry_size = if uniform_size == 0 { 4 } else { 0 };
        let (version_flags, sample_count, mut pos) =
            parse_table_header(STSZ, data, 8, entry_size)?;

        let mut sizes = Vec::new();
        if uniform_size == 0 {
            sizes.reserve(sample_count as usize);
            for _ in 0..sample_count {
                sizes.push(read_u32(data, &mut pos).unwrap_or_default());
            }
        }

        Ok(Self {
            version_flags,
            uniform_size,
            sample_count,
            sizes,
        })
    }

    pub fn sample_size(&self, sample: u32) -> u64 {
        if self.uniform_size != 0 {
            self.uniform_size as u64
        } else {
            self.sizes.get(sample as usize).copied().unwrap_or_default() as u64
        }
    }

    /// Total byte size of samples `[start, end)`.
    pub fn range_size(&self, start: u32, end: u32) -> u64 {
        if end <= start {
            return 0;
        }
        if self.uniform_size != 0 {
            return self.uniform_size as u64 * (end - start) as u64;
        }
        let end = (end as usize).min(self.sizes.len());
        let start = (start as usize).min(end);
        self.sizes[start..end].iter().map(|&s| s as u64).sum()
    }

    /// Keep samples `[start, end)`.
    pub fn crop(&self, start: u32, end: u32) -> Self {
        let sizes = if self.uniform_size == 0 {
            let end = (end as usize).min(self.sizes.len());
            let start = (start as usize).min(end);
            self.sizes[start..end].to_vec()
        } else {
            Vec::new()
        };
        Self {
            version_flags: self.version_flags,
            uniform_size: self.uniform_size,
            sample_count: end.saturating_sub(start),
            sizes,
        }
    }

    pub fn size(&self) -> u64 {
        BOX_HEADER_SIZE + 12 + self.sizes.len() as u64 * 4
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, STSZ, self.size());
        write_u32(out, self.version_flags);
        write_u32(out, self.uniform_size);
        write_u32(out, self.sample_count);
        for size in &self.sizes {
            write_u32(out, *size);
        }
    }
}
