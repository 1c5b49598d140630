use super::RangeSource;
use crate::errors::{SeekError, SeekResult, StreamError};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{
    header::{CONTENT_LENGTH, RANGE},
    Client, StatusCode,
};

/// Origin file fetched with HTTP range requests
pub struct HttpRangeSource {
    url: String,
    client: Client,
    length: Option<u64>,
    http_request_count: u64,
    http_request_bytes_read: u64,
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn content_length(&mut self) -> SeekResult<u64> {
        self.get_content_length().await
    }

    async fn read_range(&mut self, start: u64, end: u64) -> SeekResult<Vec<u8>> {
        self.get_byte_range(start, end).await
    }

    fn print_stats(&self) {
        self.print_stats()
    }

    fn request_count(&self) -> u64 {
        self.http_request_count
    }

    fn bytes_read(&self) -> u64 {
        self.http_request_bytes_read
    }
}

impl HttpRangeSource {
    pub async fn new(url: String) -> SeekResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StreamError::new(e.to_string()))?;

        let mut source = Self {
            url,
            client,
            length: None,
            http_request_count: 0,
            http_request_bytes_read: 0,
        };

        source.get_content_length().await?;
        Ok(source)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Print stats function.
    pub fn print_stats(&self) {
        info!("📊 Download Statistics:");
        info!("   🔢 HTTP Requests: {}", self.http_request_count);
        info!(
            "   📥 Total Downloaded: {} bytes ({:.2} KB, {:.2} MB)",
            self.http_request_bytes_read,
            self.http_request_bytes_read as f64 / 1024.0,
            self.http_request_bytes_read as f64 / 1024.0 / 1024.0
        );
        if let Some(length) = self.length.filter(|l| *l > 0) {
            let percentage = (self.http_request_bytes_read as f64 / length as f64) * 100.0;
            info!("   📊 Downloaded: {:.2}% of total file", percentage);
        }
    }

    async fn get_content_length(&mut self) -> SeekResult<u64> {
        if let Some(length) = self.length {
            return Ok(length);
        }

        let response = self
            .client
            .head(&self.url)
            .send()
            .await
            .map_err(|e| StreamError::new(e.to_string()))?;

        self.http_request_count += 1;

        if !response.status().is_success() {
            return Err(SeekError::Stream(StreamError::new(format!(
                "HTTP error: {}",
                response.status()
            ))));
        }

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or(StreamError::new(
                "Content-Length header not found or invalid",
            ))?;

        self.length = Some(content_length);
        Ok(content_length)
    }

    async fn get_byte_range(&mut self, start: u64, end: u64) -> SeekResult<Vec<u8>> {
        let length = self.get_content_length().await?;
        let end = end.min(length);
        if start >= end {
            return Ok(Vec::new());
        }

        let range_header = format!("bytes={}-{}", start, end - 1);
        debug!("GET {} {}", self.url, range_header);
        let response = self
            .client
            .get(&self.url)
            .header(RANGE, range_header)
            .send()
            .await
            .map_err(|e| StreamError::new(e.to_string()))?;

        self.http_request_count += 1;

        let status = response.status();
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Vec::new());
        }

        if !status.is_success() {
            return Err(SeekError::Stream(StreamError::new(format!(
                "HTTP error: {}",
                status
            ))));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StreamError::new(e.to_string()))?;

        self.http_request_bytes_read += bytes.len() as u64;

        // An origin ignoring the Range header answers 200 with the whole file
        let wanted = (end - start) as usize;
        let body = if status == StatusCode::OK {
            if bytes.len() as u64 != length {
                return Err(SeekError::Stream(StreamError::new(format!(
                    "HTTP 200 for range {}-{} carried {} bytes, expected the whole file of {}",
                    start,
                    end - 1,
                    bytes.len(),
                    length
                ))));
            }
            &bytes[start as usize..end as usize]
        } else {
            &bytes[..bytes.len().min(wanted)]
        };

        Ok(body.to_vec())
    }
}
