use super::r#box::{parse_table_header, write_box_header, BOX_HEADER_SIZE};
use crate::bits::reader::{read_u32, write_u32};
use crate::errors::SeekResult;

pub const STTS: &[u8; 4] = b"stts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Time-to-sample table: runs of `sample_count` samples lasting `sample_delta` ticks each
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeToSampleBox {
    pub version_flags: u32,
    pub entries: Vec<SttsEntry>,
}

impl TimeToSampleBox {
    /// Parse the stts payload (after the box header).
    pub fn parse(data: &[u8]) -> SeekResult<Self> {
        let (version_flags, entry_count, mut pos) = parse_table_header(STTS, data, 4, 8)?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            // bounds were checked by parse_table_header
            let sample_count = read_u32(data, &mut pos).unwrap_or_default();
            let sample_delta = read_u32(data, &mut pos).unwrap_or_default();
            entries.push(SttsEntry {
                sample_count,
                sample_delta,
            });
        }

        Ok(Self {
            version_flags,
            entries,
        })
    }

    pub fn sample_count(&self) -> u64 {
        self.entries.iter().map(|e| e.sample_count as u64).sum()
    }

    /// Sum of all sample durations in media ticks.
    pub fn total_duration(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.sample_count as u64 * e.sample_delta as u64)
            .sum()
    }

    /// Index of the sample whose interval contains `ticks`, `None` when `ticks`
    /// lies at or after the end of the table.
    pub fn sample_at_time(&self, ticks: u64) -> Option<u32> {
        let mut elapsed = 0u64;
        let mut sample = 0u64;
        for entry in &self.entries {
            let span = entry.sample_count as u64 * entry.sample_delta as u64;
            if ticks < elapsed + span {
                let pass = (ticks - elapsed) / entry.sample_delta as u64;
                return u32::try_from(sample + pass).ok();
            }
            elapsed += span;
            sample += entry.sample_count as u64;
        }
        None
    }

    /// Number of samples whose decode time is strictly before `ticks`.
    pub fn samples_before(&self, ticks: u64) -> u32 {
        let mut elapsed = 0u64;
        let mut sample = 0u64;
        for entry in &self.entries {
            if ticks <= elapsed {
                break;
            }
            let count = entry.sample_count as u64;
            let taken = if entry.sample_delta == 0 {
                count
            } else {
                count.min((ticks - elapsed).div_ceil(entry.sample_delta as u64))
            };
            sample += taken;
            if taken < count {
                break;
            }
            elapsed += count * entry.sample_delta as u64;
        }
        u32::try_from(sample).unwrap_or(u32::MAX)
    }

    /// Decode time of `sample` in media ticks.
    pub fn time_of_sample(&self, sample: u32) -> u64 {
        let mut remaining = sample as u64;
        let mut elapsed = 0u64;
        for entry in &self.entries {
            let count = entry.sample_count as u64;
            if remaining <= count {
                return elapsed + remaining * entry.sample_delta as u64;
            }
            remaining -= count;
            elapsed += count * entry.sample_delta as u64;
        }
        elapsed
    }

    /// Keep only samples `[start, end)`.
    pub fn crop(&self, start: u32, end: u32) -> Self {
        let runs = self
            .entries
            .iter()
            .map(|e| (e.sample_count, e.sample_delta));
        let entries = crop_runs(runs, start, end)
            .into_iter()
            .map(|(sample_count, sample_delta)| SttsEntry {
                sample_count,
                sample_delta,
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
        write_box_header(out, STTS, self.size());
        write_u32(out, self.version_flags);
        write_u32(out, self.entries.len() as u32);
        for entry in &self.entries {
            write_u32(out, entry.sample_count);
            write_u32(out, entry.sample_delta);
        }
    }
}

/// Intersect run-length `(count, value)` entries with the sample range
/// `[start, end)`. Runs entirely outside the range are dropped, boundary runs
/// are shortened.
pub(crate) fn crop_runs<I>(runs: I, start: u32, end: u32) -> Vec<(u32, u32)>
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let (start, end) = (start as u64, end as u64);
    let mut out = Vec::new();
    let mut first = 0u64;
    for (count, value) in runs {
        let last = first + count as u64;
        let lo = first.max(start);
        let hi = last.min(end);
        if lo < hi {
            out.push(((hi - lo) as u32, value));
        }
        if last >= end {
            break;
        }
        first = last;
    }
    out
}
