use super::RangeSource;
use crate::errors::SeekResult;
use async_trait::async_trait;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Local file wrapper
pub struct LocalRangeSource {
    file: File,
    length: u64,
    read_count: u64,
    bytes_read: u64,
}

impl LocalRangeSource {
    pub fn open<P: AsRef<Path>>(path: P) -> SeekResult<Self> {
        let file = File::open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            file,
            length,
            read_count: 0,
            bytes_read: 0,
        })
    }
}

#[async_trait]
impl RangeSource for LocalRangeSource {
    async fn content_length(&mut self) -> SeekResult<u64> {
        Ok(self.length)
    }

    async fn read_range(&mut self, start: u64, end: u64) -> SeekResult<Vec<u8>> {
        let end = end.min(self.length);
        if start >= end {
            return Ok(Vec::new());
        }
        self.file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::with_capacity((end - start) as usize);
        (&mut self.file).take(end - start).read_to_end(&mut buf)?;
        self.read_count += 1;
        self.bytes_read += buf.len() as u64;
        Ok(buf)
    }

    fn request_count(&self) -> u64 {
        self.read_count
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_local_ranges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let mut source = LocalRangeSource::open(file.path()).unwrap();
        assert_eq!(source.content_length().await.unwrap(), 10);
        assert_eq!(source.read_range(2, 5).await.unwrap(), b"234");
        assert_eq!(source.read_range(8, 20).await.unwrap(), b"89");
        assert!(source.read_range(10, 12).await.unwrap().is_empty());
        assert_eq!(source.request_count(), 2);
        assert_eq!(source.bytes_read(), 5);
    }

    #[test]
    fn test_missing_file() {
        assert!(LocalRangeSource::open("/nonexistent/file.mp4").is_err());
    }
}
