use super::r#box::{parse_table_header, write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{read_u32, read_u64, write_u32, write_u64};
use crate::errors::{Mp4Error, SeekResult};

pub const STCO: &[u8; 4] = b"stco";
pub const CO64: &[u8; 4] = b"co64";

/// Width of the stored chunk offsets, kept from the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetWidth {
    /// `stco`
    Bits32,
    /// `co64`
    Bits64,
}

/// Chunk offset table (stco or co64) decoded into absolute 64-bit file offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOffsetBox {
    pub width: OffsetWidth,
    pub version_flags: u32,
    pub offsets: Vec<u64>,
}

impl ChunkOffsetBox {
    /// Parse a stco payload (32-bit offsets).
    pub fn parse_stco(data: &[u8]) -> SeekResult<Self> {
        let (version_flags, entry_count, mut pos) = parse_table_header(STCO, data, 4, 4)?;
        let mut offsets = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            offsets.push(read_u32(data, &mut pos).unwrap_or_default() as u64);
        }
        Ok(Self {
            width: OffsetWidth::Bits32,
            version_flags,
            offsets,
        })
    }

    /// Parse a co64 payload (64-bit offsets).
    pub fn parse_co64(data: &[u8]) -> SeekResult<Self> {
        let (version_flags, entry_count, mut pos) = parse_table_header(CO64, data, 4, 8)?;
        let mut offsets = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            offsets.push(read_u64(data, &mut pos).unwrap_or_default());
        }
        Ok(Self {
            width: OffsetWidth::Bits64,
            version_flags,
            offsets,
        })
    }

    pub fn name(&self) -> &'static [u8; 4] {
        match self.width {
            OffsetWidth::Bits32 => STCO,
            OffsetWidth::Bits64 => CO64,
        }
    }

    pub fn chunk_count(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Keep chunks `[start_chunk, end_chunk)`; the first kept chunk now begins
    /// at `first_offset` because leading samples were dropped from it.
    pub fn crop(&self, start_chunk: u32, end_chunk: u32, first_offset: u64) -> Self {
        let end = (end_chunk as usize).min(self.offsets.len());
        let start = (start_chunk as usize).min(end);
        let mut offsets = self.offsets[start..end].to_vec();
        if let Some(first) = offsets.first_mut() {
            *first = first_offset;
        }
        Self {
            width: self.width,
            version_flags: self.version_flags,
            offsets,
        }
    }

    /// Shift every offset by `adjustment` bytes, checking that each result
    /// still fits the table's width.
    pub fn adjust(&mut self, adjustment: i64) -> SeekResult<()> {
        let limit = match self.width {
            OffsetWidth::Bits32 => u32::MAX as i128,
            OffsetWidth::Bits64 => u64::MAX as i128,
        };
        for offset in self.offsets.iter_mut() {
            let moved = *offset as i128 + adjustment as i128;
            if moved < 0 {
                return Err(Mp4Error::malformed(format!(
                    "chunk offset {} moves before the start of the file",
                    offset
                ))
                .into());
            }
            if moved > limit {
                return Err(Mp4Error::unsupported(format!(
                    "chunk offset {} does not fit a 32-bit {} table",
                    moved,
                    String::from_utf8_lossy(self.name())
                ))
                .into());
            }
            *offset = moved as u64;
        }
        Ok(())
    }

    pub fn size(&self) -> u64 {
        let entry = match self.width {
            OffsetWidth::Bits32 => 4,
            OffsetWidth::Bits64 => 8,
        };
        BOX_HEADER_SIZE + 8 + self.offsets.len() as u64 * entry
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, self.name(), self.size());
        write_u32(out, self.version_flags);
        write_u32(out, self.offsets.len() as u32);
        for offset in &self.offsets {
            match self.width {
                OffsetWidth::Bits32 => write_u32(out, *offset as u32),
                OffsetWidth::Bits64 => write_u64(out, *offset),
            }
        }
    }
}
