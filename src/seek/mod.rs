pub mod extractor;
mod types;

pub use extractor::{prepare_seek, stream_seek, summarize, write_seek_output};
pub use types::{SeekConfig, SeekRequest, SeekSummary, TrackSummary};

#[cfg(test)]
pub mod unit_test;
