//! Per-track sample table trimming.
//!
//! The start time is resolved against one authoritative track (the first video
//! track with sync samples, else the first track with sync samples). Its
//! snapped start is converted into every other track's timescale, so audio is
//! cut at the same instant as the key frame playback resumes from.

use super::trak::{Track, TrimBounds};
use crate::errors::{Mp4Error, SeekResult};
use crate::seek::SeekRequest;
use log::{debug, info};

/// Convert milliseconds to ticks of `timescale`, rounding down.
pub fn ms_to_ticks(ms: u64, timescale: u32) -> u64 {
    (ms as u128 * timescale as u128 / 1000) as u64
}

/// Convert ticks between timescales, rounding down.
pub fn rescale(ticks: u64, from: u32, to: u32) -> u64 {
    if from == 0 {
        return 0;
    }
    (ticks as u128 * to as u128 / from as u128) as u64
}

fn has_sync_samples(track: &Track) -> bool {
    track.stss.as_ref().is_some_and(|s| !s.samples.is_empty())
}

/// Index of the track whose key frames decide the start time.
pub fn clock_track(tracks: &[Track]) -> Option<usize> {
    tracks
        .iter()
        .position(|t| t.is_video() && has_sync_samples(t))
        .or_else(|| tracks.iter().position(has_sync_samples))
}

/// Start sample of `track` for `start_ticks`, snapped to its own sync samples.
fn snapped_start(track: &Track, start_ticks: u64) -> SeekResult<u32> {
    let sample = track.stts.sample_at_time(start_ticks).ok_or_else(|| {
        Mp4Error::invalid_range(format!(
            "start tick {} is past the end of track {} ({} ticks)",
            start_ticks,
            track.id(),
            track.stts.total_duration()
        ))
    })?;
    let snapped = match &track.stss {
        Some(stss) if !stss.samples.is_empty() => stss.key_sample(sample).unwrap_or(sample),
        _ => sample,
    };
    if snapped != sample {
        debug!(
            "Track {}: start sample {} snapped to key frame {}",
            track.id(),
            sample,
            snapped
        );
    }
    Ok(snapped)
}

/// Compute the trim cursors of `track` for the sample range starting at
/// `start_ticks` and ending at `end_ms` (zero for the end of the track).
pub fn compute_bounds(track: &Track, start_ticks: u64, end_ms: u64) -> SeekResult<TrimBounds> {
    let sample_count = track.sample_count();
    let start_sample = snapped_start(track, start_ticks)?;
    let end_sample = if end_ms == 0 {
        sample_count
    } else {
        track
            .stts
            .samples_before(ms_to_ticks(end_ms, track.timescale()))
            .min(sample_count)
    };
    if end_sample <= start_sample {
        return Err(Mp4Error::invalid_range(format!(
            "track {} keeps no samples: start sample {}, end sample {}",
            track.id(),
            start_sample,
            end_sample
        ))
        .into());
    }

    let chunk_count = track.stco.chunk_count();
    let unaddressed = |sample: u32| {
        Mp4Error::malformed(format!(
            "track {}: sample {} is not mapped to a chunk",
            track.id(),
            sample
        ))
    };
    let first = track
        .stsc
        .locate(start_sample, chunk_count)
        .ok_or_else(|| unaddressed(start_sample))?;
    let last = track
        .stsc
        .locate(end_sample - 1, chunk_count)
        .ok_or_else(|| unaddressed(end_sample - 1))?;

    let start_chunk_samples_size = track.stsz.range_size(first.first_sample, start_sample);
    let end_chunk_samples_size = track.stsz.range_size(last.first_sample, end_sample);
    let offset_of = |chunk: u32| {
        track
            .stco
            .offsets
            .get(chunk as usize)
            .copied()
            .ok_or_else(|| {
                Mp4Error::malformed(format!(
                    "track {}: chunk {} has no offset",
                    track.id(),
                    chunk
                ))
            })
    };

    Ok(TrimBounds {
        start_sample,
        start_chunk: first.chunk,
        start_chunk_samples: first.within,
        start_chunk_samples_size,
        start_offset: offset_of(first.chunk)? + start_chunk_samples_size,
        end_sample,
        end_chunk: last.chunk + 1,
        end_chunk_samples: last.within + 1,
        end_chunk_samples_size,
        end_offset: offset_of(last.chunk)? + end_chunk_samples_size,
    })
}

/// Replace every sample table of `track` with its cropped form and record
/// the bounds. Sizes and entry counts follow from the new tables.
pub fn crop_track(track: &mut Track, bounds: TrimBounds) -> SeekResult<()> {
    let chunk_count = track.stco.chunk_count();
    let first = track
        .stsc
        .locate(bounds.start_sample, chunk_count)
        .ok_or_else(|| Mp4Error::malformed("start sample left the chunk map"))?;
    let last = track
        .stsc
        .locate(bounds.end_sample - 1, chunk_count)
        .ok_or_else(|| Mp4Error::malformed("end sample left the chunk map"))?;

    let (start, end) = (bounds.start_sample, bounds.end_sample);
    track.stsc = track.stsc.crop(&first, &last, chunk_count);
    track.stts = track.stts.crop(start, end);
    track.ctts = track.ctts.as_ref().map(|ctts| ctts.crop(start, end));
    track.stss = track.stss.as_ref().map(|stss| stss.crop(start, end));
    track.stsz = track.stsz.crop(start, end);
    track.stco = track
        .stco
        .crop(bounds.start_chunk, bounds.end_chunk, bounds.start_offset);
    track.bounds = Some(bounds);
    Ok(())
}

/// Trim every track to `request`.
pub fn trim_tracks(tracks: &mut [Track], request: &SeekRequest) -> SeekResult<()> {
    if request.end != 0 && request.end <= request.start {
        return Err(Mp4Error::invalid_range(format!(
            "end {} ms is not after start {} ms",
            request.end, request.start
        ))
        .into());
    }

    // Start instant on the authoritative clock, in that track's ticks
    let clock = match clock_track(tracks) {
        Some(index) => {
            let track = &tracks[index];
            let ticks = ms_to_ticks(request.start, track.timescale());
            let sample = snapped_start(track, ticks)?;
            let snapped = track.stts.time_of_sample(sample);
            info!(
                "Start {} ms resolved on track {} to sample {} ({} ms)",
                request.start,
                track.id(),
                sample,
                rescale(snapped, track.timescale(), 1000)
            );
            Some((snapped, track.timescale()))
        }
        None => None,
    };

    for index in 0..tracks.len() {
        let track = &tracks[index];
        if track.sample_count() == 0 {
            debug!("Track {} has no samples, kept empty", track.id());
            tracks[index].bounds = Some(TrimBounds::default());
            continue;
        }
        let start_ticks = match clock {
            Some((ticks, timescale)) => rescale(ticks, timescale, track.timescale()),
            None => ms_to_ticks(request.start, track.timescale()),
        };
        let bounds = compute_bounds(track, start_ticks, request.end)?;
        debug!(
            "Track {}: samples {}..{}, chunks {}..{}, bytes {}..{}",
            track.id(),
            bounds.start_sample,
            bounds.end_sample,
            bounds.start_chunk,
            bounds.end_chunk,
            bounds.start_offset,
            bounds.end_offset
        );
        crop_track(&mut tracks[index], bounds)?;
    }
    Ok(())
}
