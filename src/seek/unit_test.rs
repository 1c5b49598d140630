use crate::errors::{FailureKind, Mp4Error, SeekError, StreamError};
use crate::mp4::fixtures::{build_mp4, MovieSpec};
use crate::seek::{prepare_seek, summarize, write_seek_output, SeekConfig, SeekRequest};
use crate::streams::range_source::MockRangeSource;
use std::sync::{Arc, Mutex};

#[cfg(test)]
mod test_helpers {
    use super::*;

    /// Mock serving `file`, recording every requested range
    pub fn serving(file: Vec<u8>) -> (MockRangeSource, Arc<Mutex<Vec<(u64, u64)>>>) {
        let len = file.len() as u64;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let mut source = MockRangeSource::new();
        source.expect_content_length().returning(move || Ok(len));
        source.expect_read_range().returning(move |start, end| {
            seen.lock().unwrap().push((start, end));
            let end = end.min(file.len() as u64) as usize;
            let start = (start as usize).min(end);
            Ok(file[start..end].to_vec())
        });
        (source, requests)
    }
}

#[tokio::test]
async fn test_prepare_and_write_through_mock_source() {
    use test_helpers::*;
    let file = build_mp4(&MovieSpec::two_track_70s());
    let (mut source, _) = serving(file.clone());
    let config = SeekConfig::default();

    let meta = prepare_seek(&mut source, SeekRequest::from_start(35_000), &config)
        .await
        .unwrap();
    let output = meta.output().unwrap().clone();

    let mut written = Vec::new();
    let n = write_seek_output(&mut source, &output, &mut written, &config)
        .await
        .unwrap();
    assert_eq!(n, output.content_length);
    assert_eq!(&written[..output.header.len()], &output.header[..]);
    let media = &file[output.passthrough.start as usize..output.passthrough.end as usize];
    assert_eq!(&written[output.header.len()..], media);

    let summary = summarize(&meta).unwrap();
    assert_eq!(summary.tracks.len(), 2);
    assert_eq!(summary.tracks[1].handler, "vide");
    assert_eq!(summary.tracks[1].start_sample, 1020);
    assert_eq!(summary.content_length, output.content_length);
}

#[tokio::test]
async fn test_media_payload_is_never_fetched_while_collecting_metadata() {
    use test_helpers::*;
    let mut spec = MovieSpec::two_track_70s();
    spec.moov_last = true;
    let file = build_mp4(&spec);
    let (mut source, requests) = serving(file.clone());
    let config = SeekConfig {
        read_chunk_size: 1024,
        ..SeekConfig::default()
    };

    let meta = prepare_seek(&mut source, SeekRequest::from_start(1_000), &config)
        .await
        .unwrap();
    let mdat = *meta.mdat().unwrap();

    let requests = requests.lock().unwrap();
    assert!(requests
        .iter()
        .all(|&(start, end)| end <= mdat.payload_start() + 1024 || start >= mdat.payload_end()));
}

#[tokio::test]
async fn test_source_ending_early_is_truncated_input() {
    let file = build_mp4(&MovieSpec::two_track_70s());
    let len = file.len() as u64;
    let mut source = MockRangeSource::new();
    source.expect_content_length().returning(move || Ok(len));
    source
        .expect_read_range()
        .returning(move |start, end| match start {
            0 => Ok(file[..(end as usize).min(300)].to_vec()),
            _ => Ok(Vec::new()),
        });

    let err = prepare_seek(&mut source, SeekRequest::from_start(1_000), &SeekConfig::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SeekError::Mp4(Mp4Error::TruncatedInput { .. })));
    assert_eq!(err.kind(), FailureKind::BadInput);
}

#[tokio::test]
async fn test_transport_error_is_propagated() {
    let mut source = MockRangeSource::new();
    source.expect_content_length().returning(|| Ok(4096));
    source
        .expect_read_range()
        .times(1)
        .returning(|_, _| Err(StreamError::new("HTTP error: 503").into()));

    let err = prepare_seek(&mut source, SeekRequest::from_start(1_000), &SeekConfig::default())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn test_small_buffer_cap_is_resource_limit() {
    use test_helpers::*;
    let file = build_mp4(&MovieSpec::two_track_70s());
    let (mut source, _) = serving(file);
    let config = SeekConfig {
        max_buffer_size: 4096,
        read_chunk_size: 512,
        ..SeekConfig::default()
    };

    let err = prepare_seek(&mut source, SeekRequest::from_start(1_000), &config)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SeekError::Mp4(Mp4Error::BufferExhausted { limit: 4096 })));
    assert_eq!(err.kind(), FailureKind::ResourceLimit);
}

#[tokio::test]
async fn test_moov_just_over_cap_is_rejected() {
    use test_helpers::*;
    let file = build_mp4(&MovieSpec::two_track_70s());
    let (start, _, end) = crate::mp4::find_box_range(&file, b"moov").unwrap();
    let moov_size = end - start;
    let (mut source, _) = serving(file);
    // the hinted read would complete the box in one step
    let config = SeekConfig {
        max_buffer_size: moov_size - 1,
        read_chunk_size: 512,
        ..SeekConfig::default()
    };

    let err = prepare_seek(&mut source, SeekRequest::from_start(1_000), &config)
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), FailureKind::ResourceLimit);

    let (mut source, _) = serving(build_mp4(&MovieSpec::two_track_70s()));
    let config = SeekConfig {
        max_buffer_size: moov_size,
        read_chunk_size: 512,
        ..SeekConfig::default()
    };
    assert!(prepare_seek(&mut source, SeekRequest::from_start(1_000), &config)
        .await
        .is_ok());
}
