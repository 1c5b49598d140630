use super::types::{SeekConfig, SeekRequest, SeekSummary, TrackSummary};
use crate::errors::{SeekResult, StreamError};
use crate::mp4::{MetaStatus, Mp4Meta, SeekOutput};
use crate::streams::RangeSource;
use log::{debug, info};
use std::io::Write;

/// Read the source until the session can build its output.
///
/// Reads start at `read_chunk_size` and grow to cover the box being buffered,
/// up to `max_buffer_size`. Skipped payloads (unknown boxes, media data ahead
/// of `moov`) are jumped over instead of being fetched.
pub async fn prepare_seek<S>(
    source: &mut S,
    request: SeekRequest,
    config: &SeekConfig,
) -> SeekResult<Mp4Meta>
where
    S: RangeSource + ?Sized,
{
    let file_len = source.content_length().await?;
    let mut meta = Mp4Meta::new(request, file_len, config);
    let mut wanted = config.read_chunk_size as u64;

    loop {
        let skip = meta.pending_skip();
        if skip > 0 {
            debug!("Jumping over {} bytes at offset {}", skip, meta.next_offset());
            meta.skip(skip);
        }

        let start = meta.next_offset();
        if start >= file_len {
            meta.end_of_input()?;
            break;
        }
        let end = start.saturating_add(wanted).min(file_len);
        let chunk = source.read_range(start, end).await?;
        if chunk.is_empty() {
            meta.end_of_input()?;
            break;
        }

        match meta.feed(&chunk)? {
            MetaStatus::Complete => break,
            MetaStatus::NeedMore(n) => {
                wanted = n
                    .max(config.read_chunk_size as u64)
                    .min(config.max_buffer_size.max(1) as u64);
            }
        }
    }

    if let Some(output) = meta.output() {
        info!(
            "Seek prepared: {} header bytes, media {}..{}, content length {}",
            output.header.len(),
            output.passthrough.start,
            output.passthrough.end,
            output.content_length
        );
    }
    Ok(meta)
}

/// Write the header, then copy the pass-through range from `source` in
/// `copy_chunk_size` pieces. Returns the number of bytes written.
pub async fn write_seek_output<S, W>(
    source: &mut S,
    output: &SeekOutput,
    writer: &mut W,
    config: &SeekConfig,
) -> SeekResult<u64>
where
    S: RangeSource + ?Sized,
    W: Write + Send,
{
    writer.write_all(&output.header)?;
    let mut written = output.header.len() as u64;

    let step = config.copy_chunk_size.max(1) as u64;
    let mut position = output.passthrough.start;
    while position < output.passthrough.end {
        let end = position.saturating_add(step).min(output.passthrough.end);
        let chunk = source.read_range(position, end).await?;
        if chunk.is_empty() {
            return Err(StreamError::new(format!(
                "source ended at offset {} before {}",
                position, output.passthrough.end
            ))
            .into());
        }
        writer.write_all(&chunk)?;
        position += chunk.len() as u64;
        written += chunk.len() as u64;
    }
    writer.flush()?;

    debug!("Wrote {} of {} bytes", written, output.content_length);
    Ok(written)
}

/// Diagnostic view of a completed session.
pub fn summarize(meta: &Mp4Meta) -> Option<SeekSummary> {
    let output = meta.output()?;
    let tracks = meta
        .tracks()
        .iter()
        .map(|track| {
            let bounds = track.bounds.unwrap_or_default();
            TrackSummary {
                track_id: track.id(),
                handler: track.handler().into_owned(),
                timescale: track.timescale(),
                start_sample: bounds.start_sample,
                end_sample: bounds.end_sample,
                start_chunk: bounds.start_chunk,
                end_chunk: bounds.end_chunk,
                start_offset: bounds.start_offset,
                end_offset: bounds.end_offset,
                duration: track.stts.total_duration(),
            }
        })
        .collect();

    Some(SeekSummary {
        request: *meta.request(),
        file_len: meta.file_len(),
        header_len: output.header.len() as u64,
        passthrough_start: output.passthrough.start,
        passthrough_end: output.passthrough.end,
        content_length: output.content_length,
        tracks,
    })
}

/// Prepare and write a seek in one go.
pub async fn stream_seek<S, W>(
    mut source: S,
    request: SeekRequest,
    writer: &mut W,
    config: &SeekConfig,
) -> SeekResult<SeekSummary>
where
    S: RangeSource,
    W: Write + Send,
{
    let meta = prepare_seek(&mut source, request, config).await?;
    let summary = summarize(&meta).ok_or_else(|| StreamError::new("seek did not complete"))?;
    if let Some(output) = meta.output() {
        write_seek_output(&mut source, output, writer, config).await?;
    }
    source.print_stats();
    Ok(summary)
}
