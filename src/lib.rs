pub mod bits;

pub mod mp4;
pub use mp4::{Mp4Meta, SeekOutput, Track, TrimBounds};

pub mod seek;
pub use seek::{SeekConfig, SeekRequest, SeekSummary, TrackSummary};

pub mod streams;
pub use streams::{HttpRangeSource, LocalRangeSource, RangeSource};

pub mod errors;
pub use errors::{FailureKind, Mp4Error, SeekError, SeekResult, StreamError};

use std::io::Write;

macro_rules! with_range_source {
    ($source:expr, |$stream:ident| $body:expr) => {
        if $source.starts_with("http://") || $source.starts_with("https://") {
            let $stream = HttpRangeSource::new($source).await?;
            $body.await
        } else {
            let $stream = LocalRangeSource::open($source)?;
            $body.await
        }
    };
}

/// Write the pseudo-streamed form of `source` (a path or an http(s) URL)
/// starting at `request.start` milliseconds.
pub async fn pseudo_stream<W: Write + Send>(
    source: String,
    request: SeekRequest,
    writer: &mut W,
) -> SeekResult<SeekSummary> {
    pseudo_stream_with_config(source, request, writer, &SeekConfig::default()).await
}

pub async fn pseudo_stream_with_config<W: Write + Send>(
    source: String,
    request: SeekRequest,
    writer: &mut W,
    config: &SeekConfig,
) -> SeekResult<SeekSummary> {
    with_range_source!(source, |stream| {
        crate::seek::stream_seek(stream, request, &mut *writer, config)
    })
}

/// Collect the seek plan without writing anything.
pub async fn plan_seek(source: String, request: SeekRequest) -> SeekResult<SeekSummary> {
    let config = SeekConfig::default();
    with_range_source!(source, |stream| async {
        let mut stream = stream;
        let meta = crate::seek::prepare_seek(&mut stream, request, &config).await?;
        crate::seek::summarize(&meta)
            .ok_or_else(|| SeekError::from(StreamError::new("seek did not complete")))
    })
}
