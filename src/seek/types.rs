use serde::{Deserialize, Serialize};

/// Requested playback window in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekRequest {
    pub start: u64,
    /// Zero means "to the end of the file"
    pub end: u64,
}

impl SeekRequest {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn from_start(start: u64) -> Self {
        Self { start, end: 0 }
    }

    /// A request covering the whole file, answered with the untouched source
    pub fn is_full(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// Limits and I/O sizes of a seek session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekConfig {
    /// Cap on buffered metadata bytes
    pub max_buffer_size: usize,
    pub max_tracks: usize,
    /// Largest accepted ftyp box, header included
    pub max_ftyp_size: usize,
    /// Bytes requested per read while collecting metadata
    pub read_chunk_size: usize,
    /// Staging buffer size when copying media bytes
    pub copy_chunk_size: usize,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 10 * 1024 * 1024,
            max_tracks: 6,
            max_ftyp_size: 1024,
            read_chunk_size: 64 * 1024,
            copy_chunk_size: 64 * 1024,
        }
    }
}

/// Per-track outcome of a trim, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSummary {
    pub track_id: u32,
    #[serde(rename = "type")]
    pub handler: String,
    pub timescale: u32,
    pub start_sample: u32,
    pub end_sample: u32,
    pub start_chunk: u32,
    pub end_chunk: u32,
    pub start_offset: u64,
    pub end_offset: u64,
    /// Retained duration in media ticks
    pub duration: u64,
}

/// Outcome of a prepared seek
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeekSummary {
    pub request: SeekRequest,
    pub file_len: u64,
    pub header_len: u64,
    pub passthrough_start: u64,
    pub passthrough_end: u64,
    pub content_length: u64,
    pub tracks: Vec<TrackSummary>,
}
