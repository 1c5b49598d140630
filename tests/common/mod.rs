#![allow(dead_code)]

#[path = "../../src/mp4/fixtures.rs"]
pub mod fixtures;

use mp4seek::mp4::{MetaStatus, Mp4Meta};
use mp4seek::{SeekConfig, SeekRequest, SeekResult, Track};

/// Run a whole in-memory file through a session, `chunk` bytes at a time.
pub fn run_session(file: &[u8], request: SeekRequest, chunk: usize) -> SeekResult<Mp4Meta> {
    let mut meta = Mp4Meta::new(request, file.len() as u64, &SeekConfig::default());
    loop {
        meta.skip(meta.pending_skip());
        let start = meta.next_offset() as usize;
        let end = (start + chunk).min(file.len());
        if start >= end {
            meta.end_of_input()?;
            return Ok(meta);
        }
        if let MetaStatus::Complete = meta.feed(&file[start..end])? {
            return Ok(meta);
        }
    }
}

/// Assemble the output of a completed session from the source bytes.
pub fn render(meta: &Mp4Meta, file: &[u8]) -> Vec<u8> {
    let output = meta.output().expect("session complete");
    let mut out = output.header.clone();
    out.extend_from_slice(&file[output.passthrough.start as usize..output.passthrough.end as usize]);
    out
}

/// Parse a produced file back into its tracks.
pub fn reparse(file: &[u8]) -> Mp4Meta {
    run_session(file, SeekRequest::new(0, 0), 1 << 20).expect("output parses")
}

/// Check that every sample of `track` in `file` holds the bytes the
/// fixture wrote for sample `first_sample + i` of fixture track `index`.
pub fn assert_samples_intact(file: &[u8], track: &Track, index: usize, first_sample: u32) {
    let chunk_count = track.stco.chunk_count();
    for sample in 0..track.sample_count() {
        let pos = track.stsc.locate(sample, chunk_count).expect("sample in a chunk");
        let offset = track.stco.offsets[pos.chunk as usize]
            + track.stsz.range_size(pos.first_sample, sample);
        let size = track.stsz.sample_size(sample) as usize;
        let expected = fixtures::sample_byte(index, (first_sample + sample) as usize);
        let bytes = &file[offset as usize..offset as usize + size];
        assert!(
            bytes.iter().all(|&b| b == expected),
            "track {} sample {} at offset {} holds the wrong bytes",
            track.id(),
            sample,
            offset
        );
    }
}
