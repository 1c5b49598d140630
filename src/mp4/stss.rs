use super::r#box::{parse_table_header, write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{read_u32, write_u32};
use crate::errors::SeekResult;

pub const STSS: &[u8; 4] = b"stss";

/// Sync samples (key frames), 1-based sample numbers in increasing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSampleBox {
    pub version_flags: u32,
    pub samples: Vec<u32>,
}

impl SyncSampleBox {
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let (version_flags, entry_count, mut pos) = parse_table_header(STSS, data, 4, 4)?;

        let mut samples = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            samples.push(read_u32(data, &mut pos).unwrap_or_default());
        }

        Ok(Self {
            version_flags,
            samples,
        })
    }

    /// Snap the 0-based `sample` to the closest sync sample at or before it.
    ///
    /// When no sync sample precedes it, the first sync sample is returned.
    /// `None` for an empty table.
    pub fn key_sample(&self, sample: u32) -> Option<u32> {
        let target = sample as u64 + 1;
        let preceding = self
            .samples
            .iter()
            .take_while(|&&s| s as u64 <= target)
            .last();
        preceding
            .or_else(|| self.samples.first())
            .map(|&s| s.saturating_sub(1))
    }

    /// Keep sync samples inside the 0-based range `[start, end)`, renumbered
    /// relative to `start`.
    pub fn crop(&self, start: u32, end: u32) -> Self {
        let samples = self
            .samples
            .iter()
            .filter(|&&s| s > start && s <= end)
            .map(|&s| s - start)
            .collect();
        Self {
            version_flags: self.version_flags,
            samples,
        }
    }

    pub fn size(&self) -> u64 {
        BOX_HEADER_SIZE + 8 + self.samples.len() as u64 * 4
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, STSS, self.size());
        write_u32(out, self.version_flags);
        write_u32(out, self.samples.len() as u32);
        for sample in &self.samples {
            write_u32(out, *sample);
        }
    }
}
