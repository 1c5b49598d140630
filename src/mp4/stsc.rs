use super::r#box::{parse_table_header, write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{read_u32, write_u32};
use crate::errors::{Mp4Error, SeekResult};

pub const STSC: &[u8; 4] = b"stsc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleToChunkEntry {
    /// 1-based index of the first chunk this run applies to
    pub first_chunk: u32,
    pub samples_per_chunk: u32,
    pub sample_description_index: u32,
}

/// Where a sample lives inside the chunk layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPosition {
    /// 0-based chunk index
    pub chunk: u32,
    /// Sample index relative to the chunk's first sample
    pub within: u32,
    pub samples_per_chunk: u32,
    /// 0-based index of the chunk's first sample
    pub first_sample: u32,
}

/// Sample-to-chunk table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleToChunkBox {
    pub version_flags: u32,
    pub entries: Vec<SampleToChunkEntry>,
}

impl SampleToChunkBox {
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let (version_flags, entry_count, mut pos) = parse_table_header(STSC, data, 4, 12)?;

        let mut entries: Vec<SampleToChunkEntry> = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let first_chunk = read_u32(data, &mut pos).unwrap_or_default();
            let samples_per_chunk = read_u32(data, &mut pos).unwrap_or_default();
            let sample_description_index = read_u32(data, &mut pos).unwrap_or_default();

            let previous = entries.last().map_or(0, |e| e.first_chunk);
            if first_chunk <= previous {
                return Err(Mp4Error::malformed(format!(
                    "stsc first_chunk {} does not follow {}",
                    first_chunk, previous
                ))
                .into());
            }
            entries.push(SampleToChunkEntry {
                first_chunk,
                samples_per_chunk,
                sample_description_index,
            });
        }

        Ok(Self {
            version_flags,
            entries,
        })
    }

    /// 0-based chunk range `[lo, hi)` covered by entry `i`, given the total
    /// chunk count from the chunk offset table.
    fn entry_chunks(&self, i: usize, chunk_count: u32) -> (u32, u32) {
        let lo = self.entries[i].first_chunk - 1;
        let hi = self
            .entries
            .get(i + 1)
            .map_or(chunk_count, |next| next.first_chunk - 1)
            .min(chunk_count);
        (lo, hi.max(lo))
    }

    /// Total number of samples addressed by the table.
    pub fn sample_count(&self, chunk_count: u32) -> u64 {
        (0..self.entries.len())
            .map(|i| {
                let (lo, hi) = self.entry_chunks(i, chunk_count);
                (hi - lo) as u64 * self.entries[i].samples_per_chunk as u64
            })
            .sum()
    }

    /// Locate the chunk holding the 0-based `sample`.
    pub fn locate(&self, sample: u32, chunk_count: u32) -> Option<ChunkPosition> {
        let mut first = 0u64;
        for i in 0..self.entries.len() {
            let (lo, hi) = self.entry_chunks(i, chunk_count);
            let spc = self.entries[i].samples_per_chunk;
            let n = (hi - lo) as u64 * spc as u64;
            if (sample as u64) < first + n {
                let rel = sample as u64 - first;
                let chunk = lo + (rel / spc as u64) as u32;
                let within = (rel % spc as u64) as u32;
                return Some(ChunkPosition {
                    chunk,
                    within,
                    samples_per_chunk: spc,
                    first_sample: sample - within,
                });
            }
            first += n;
        }
        None
    }

    /// Keep chunks `start.chunk..=last.chunk`, renumbered from 1.
    ///
    /// `start.within` samples are dropped from the first chunk and only
    /// `last.within + 1` samples are kept in the last one. A partially kept
    /// boundary chunk gets an entry of its own; every other entry keeps its
    /// original shape.
    pub fn crop(&self, start: &ChunkPosition, last: &ChunkPosition, chunk_count: u32) -> Self {
        let base = start.chunk;
        let mut entries = Vec::new();
        let mut push = |chunk: u32, samples_per_chunk: u32, sample_description_index: u32| {
            entries.push(SampleToChunkEntry {
                first_chunk: chunk - base + 1,
                samples_per_chunk,
                sample_description_index,
            })
        };

        for i in 0..self.entries.len() {
            let (lo, hi) = self.entry_chunks(i, chunk_count);
            let mut lo = lo.max(start.chunk);
            let mut hi = hi.min(last.chunk + 1);
            if lo >= hi {
                continue;
            }
            let entry = &self.entries[i];
            let spc = entry.samples_per_chunk;
            let desc = entry.sample_description_index;

            if lo == start.chunk {
                let kept = if start.chunk == last.chunk {
                    last.within + 1 - start.within
                } else {
                    spc - start.within
                };
                if kept != spc {
                    push(lo, kept, desc);
                    lo += 1;
                }
            }

            let mut tail = None;
            if lo < hi && hi - 1 == last.chunk && last.chunk != start.chunk {
                let kept = last.within + 1;
                if kept != spc {
                    hi -= 1;
                    tail = Some(kept);
                }
            }

            if lo < hi {
                push(lo, spc, desc);
            }
            if let Some(kept) = tail {
                push(last.chunk, kept, desc);
            }
        }

        Self {
            version_flags: self.version_flags,
            entries,
        }
    }

    pub fn size(&self) -> u64 {
        BOX_HEADER_SIZE + 8 + self.entries.len() as u64 * 12
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        write_box_header(out, STSC, self.size());
        write_u32(out, self.version_flags);
        write_u32(out, self.entries.len() as u32);
        for entry in &self.entries {
            write_u32(out, entry.first_chunk);
            write_u32(out, entry.samples_per_chunk);
            write_u32(out, entry.sample_description_index);
        }
    }
}
