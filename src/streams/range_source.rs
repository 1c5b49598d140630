use crate::errors::SeekResult;
use async_trait::async_trait;

/// Random-access byte source the seek driver reads from: an origin
/// server answering range requests, or a local file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RangeSource: Send {
    /// Total length of the source in bytes.
    async fn content_length(&mut self) -> SeekResult<u64>;

    /// Read bytes `[start, end)`. Fewer bytes are returned only when the
    /// source ends first.
    async fn read_range(&mut self, start: u64, end: u64) -> SeekResult<Vec<u8>>;

    fn print_stats(&self) {}

    fn request_count(&self) -> u64 {
        0
    }

    fn bytes_read(&self) -> u64 {
        0
    }
}
