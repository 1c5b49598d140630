use super::r#box::{parse_table_header, write_box_header, BOX_HEADER_SIZE};
use super::stts::crop_runs;
use crate::bits::reader::{read_u32, write_u32};
use crate::errors::SeekResult;

pub const CTTS: &[u8; 4] = b"ctts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CttsEntry {
    pub sample_count: u32,
    /// Raw offset; signed for version 1 boxes, never interpreted here.
    pub sample_offset: u32,
}

/// Composition time offsets, run-length encoded per sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionOffsetBox {
    pub version_flags: u32,
    pub entries: Vec<CttsEntry>,
}

impl CompositionOffsetBox {
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let (version_flags, entry_count, mut pos) = parse_table_header(CTTS, data, 4, 8)?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let sample_count = read_u32(data, &mut pos).unwrap_or_default();
            let sample_offset = read_u32(data, &mut pos).unwrap_or_default();
            entries.push(CttsEntry {
                sample_count,
                sample_offset,
            });
        }

        Ok(Self {
            version_flags,
            entries,
        })
    }

    /// Keep only the offsets of samples `[start, end)`.
    pub fn crop(&self, start: u32, end: u32) -> Self {
        let runs = self
            .entries
            .iter()
            .map(|e| (e.sample_count, e.sample_offset));
        let entries = crop_runs(runs, start, end)
            .into_iter()
            .map(|(sample_count, sample_offset)| CttsEntry {
                sample_count,
                sample_offset,
            })
            .collect();
        Self {
            version_flags: self.version_flags,
            entries,
        }
    }

    pub fn size(&self) -> u64 {
        BOX_HEADER_SIZE + 8 + self.entries.len() as u64 * 8
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, CTTS, self.size());
        write_u32(out, self.version_flags);
        write_u32(out, self.entries.len() as u32);
        for entry in &self.entries {
            write_u32(out, entry.sample_count);
            write_u32(out, entry.sample_offset);
        }
    }
}
