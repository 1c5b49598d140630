// Synthetic MP4 files for tests. Self-contained so integration tests can
// include it with `#[path]`.
#![allow(dead_code)]

pub fn make_box(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 8);
    buf.extend_from_slice(&(payload.len() as u32 + 8).to_be_bytes());
    buf.extend_from_slice(name);
    buf.extend_from_slice(payload);
    buf
}

fn full_box(name: &[u8; 4], version: u8, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![version, 0, 0, 0];
    payload.extend_from_slice(body);
    make_box(name, &payload)
}

fn table(name: &[u8; 4], rows: &[&[u32]]) -> Vec<u8> {
    let mut body = (rows.len() as u32).to_be_bytes().to_vec();
    for row in rows {
        for value in *row {
            body.extend_from_slice(&value.to_be_bytes());
        }
    }
    full_box(name, 0, &body)
}

#[derive(Debug, Clone)]
pub struct TrackSpec {
    pub track_id: u32,
    pub handler: [u8; 4],
    pub timescale: u32,
    pub sample_delta: u32,
    pub sample_sizes: Vec<u32>,
    pub samples_per_chunk: u32,
    /// 1-based sync sample numbers; `None` writes no stss
    pub sync_samples: Option<Vec<u32>>,
    pub with_ctts: bool,
}

impl TrackSpec {
    /// 30 fps video with a key frame every `gop` samples
    pub fn video(track_id: u32, seconds: u32, gop: u32) -> Self {
        let count = seconds * 30;
        Self {
            track_id,
            handler: *b"vide",
            timescale: 600,
            sample_delta: 20,
            sample_sizes: (0..count).map(|i| 40 + i % 7).collect(),
            samples_per_chunk: 5,
            sync_samples: Some((0..count).step_by(gop as usize).map(|i| i + 1).collect()),
            with_ctts: true,
        }
    }

    /// 8 kHz audio in 100 ms samples
    pub fn audio(track_id: u32, seconds: u32) -> Self {
        let count = seconds * 10;
        Self {
            track_id,
            handler: *b"soun",
            timescale: 8000,
            sample_delta: 800,
            sample_sizes: (0..count).map(|i| 10 + i % 3).collect(),
            samples_per_chunk: 4,
            sync_samples: None,
            with_ctts: false,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_sizes.len() as u32
    }

    pub fn chunk_count(&self) -> u32 {
        self.sample_count().div_ceil(self.samples_per_chunk)
    }

    fn chunk_samples(&self, chunk: u32) -> std::ops::Range<usize> {
        let start = (chunk * self.samples_per_chunk) as usize;
        let end = (start + self.samples_per_chunk as usize).min(self.sample_sizes.len());
        start..end
    }

    fn duration(&self) -> u64 {
        self.sample_count() as u64 * self.sample_delta as u64
    }
}

#[derive(Debug, Clone)]
pub struct MovieSpec {
    pub timescale: u32,
    pub tracks: Vec<TrackSpec>,
    /// Place moov after mdat
    pub moov_last: bool,
    pub co64: bool,
    /// Extra boxes appended inside moov (udta, cmov, ...)
    pub extra_moov_boxes: Vec<Vec<u8>>,
}

impl MovieSpec {
    pub fn new(tracks: Vec<TrackSpec>) -> Self {
        Self {
            timescale: 1000,
            tracks,
            moov_last: false,
            co64: false,
            extra_moov_boxes: Vec::new(),
        }
    }

    /// The reference scenario: 70 s of 8 kHz audio followed by 70 s of
    /// 600 Hz video with a key frame every 2 s.
    pub fn two_track_70s() -> Self {
        Self::new(vec![TrackSpec::audio(1, 70), TrackSpec::video(2, 70, 60)])
    }
}

/// Byte value of sample `sample` of track `track`, repeated across the sample
pub fn sample_byte(track: usize, sample: usize) -> u8 {
    ((track * 31 + sample * 7) % 251) as u8
}

pub fn ftyp() -> Vec<u8> {
    make_box(b"ftyp", b"isom\x00\x00\x02\x00isomiso2avc1mp41")
}

/// Interleave chunks round-robin across tracks. Returns the mdat payload
/// and each track's chunk offsets relative to the payload start.
fn layout(spec: &MovieSpec) -> (Vec<u8>, Vec<Vec<u64>>) {
    let mut payload = Vec::new();
    let mut offsets = vec![Vec::new(); spec.tracks.len()];
    let rounds = spec.tracks.iter().map(|t| t.chunk_count()).max().unwrap_or(0);
    for chunk in 0..rounds {
        for (t, track) in spec.tracks.iter().enumerate() {
            if chunk >= track.chunk_count() {
                continue;
            }
            offsets[t].push(payload.len() as u64);
            for sample in track.chunk_samples(chunk) {
                let size = track.sample_sizes[sample] as usize;
                payload.extend(std::iter::repeat(sample_byte(t, sample)).take(size));
            }
        }
    }
    (payload, offsets)
}

fn trak(spec: &MovieSpec, track: &TrackSpec, offsets: &[u64], base: u64) -> Vec<u8> {
    let movie_duration = track.duration() * spec.timescale as u64 / track.timescale as u64;

    let mut tkhd = vec![0u8; 80];
    tkhd[8..12].copy_from_slice(&track.track_id.to_be_bytes());
    tkhd[16..20].copy_from_slice(&(movie_duration as u32).to_be_bytes());
    let tkhd = full_box(b"tkhd", 0, &tkhd);

    let mut mdhd = vec![0u8; 20];
    mdhd[8..12].copy_from_slice(&track.timescale.to_be_bytes());
    mdhd[12..16].copy_from_slice(&(track.duration() as u32).to_be_bytes());
    mdhd[16..18].copy_from_slice(&[0x15, 0xc7]);
    let mdhd = full_box(b"mdhd", 0, &mdhd);

    let mut hdlr = vec![0u8; 4];
    hdlr.extend_from_slice(&track.handler);
    hdlr.extend_from_slice(&[0u8; 12]);
    hdlr.extend_from_slice(b"handler\0");
    let hdlr = full_box(b"hdlr", 0, &hdlr);

    let media_header = if &track.handler == b"vide" {
        full_box(b"vmhd", 0, &[0u8; 8])
    } else {
        full_box(b"smhd", 0, &[0u8; 4])
    };
    let dref = full_box(b"dref", 0, &[0, 0, 0, 1, 0, 0, 0, 12, b'u', b'r', b'l', b' ', 0, 0, 0, 1]);
    let dinf = make_box(b"dinf", &dref);

    let mut stbl = full_box(b"stsd", 0, &[0, 0, 0, 0]);
    stbl.extend(table(b"stts", &[&[track.sample_count(), track.sample_delta]]));
    if track.with_ctts {
        let rows: Vec<[u32; 2]> = (0..track.sample_count())
            .map(|i| [1, if i % 2 == 0 { 40 } else { 0 }])
            .collect();
        let rows: Vec<&[u32]> = rows.iter().map(|r| &r[..]).collect();
        stbl.extend(table(b"ctts", &rows));
    }
    if let Some(sync) = &track.sync_samples {
        let rows: Vec<[u32; 1]> = sync.iter().map(|s| [*s]).collect();
        let rows: Vec<&[u32]> = rows.iter().map(|r| &r[..]).collect();
        stbl.extend(table(b"stss", &rows));
    }
    let mut stsc_rows = vec![[1, track.samples_per_chunk, 1]];
    let remainder = track.sample_count() % track.samples_per_chunk;
    if remainder != 0 && track.chunk_count() > 1 {
        stsc_rows.push([track.chunk_count(), remainder, 1]);
    } else if remainder != 0 {
        stsc_rows[0][1] = remainder;
    }
    let stsc_rows: Vec<&[u32]> = stsc_rows.iter().map(|r| &r[..]).collect();
    stbl.extend(table(b"stsc", &stsc_rows));

    let mut stsz = vec![0u8; 4];
    stsz.extend_from_slice(&track.sample_count().to_be_bytes());
    for size in &track.sample_sizes {
        stsz.extend_from_slice(&size.to_be_bytes());
    }
    stbl.extend(full_box(b"stsz", 0, &stsz));

    let mut stco = (offsets.len() as u32).to_be_bytes().to_vec();
    for offset in offsets {
        if spec.co64 {
            stco.extend_from_slice(&(base + offset).to_be_bytes());
        } else {
            stco.extend_from_slice(&((base + offset) as u32).to_be_bytes());
        }
    }
    let name = if spec.co64 { b"co64" } else { b"stco" };
    stbl.extend(full_box(name, 0, &stco));

    let minf = make_box(b"minf", &[media_header, dinf, make_box(b"stbl", &stbl)].concat());
    let mdia = make_box(b"mdia", &[mdhd, hdlr, minf].concat());
    make_box(b"trak", &[tkhd, mdia].concat())
}

fn moov(spec: &MovieSpec, offsets: &[Vec<u64>], base: u64) -> Vec<u8> {
    let duration = spec
        .tracks
        .iter()
        .map(|t| t.duration() * spec.timescale as u64 / t.timescale as u64)
        .max()
        .unwrap_or(0);
    let mut mvhd = vec![0u8; 96];
    mvhd[8..12].copy_from_slice(&spec.timescale.to_be_bytes());
    mvhd[12..16].copy_from_slice(&(duration as u32).to_be_bytes());
    let mut payload = full_box(b"mvhd", 0, &mvhd);
    for (track, offsets) in spec.tracks.iter().zip(offsets) {
        payload.extend(trak(spec, track, offsets, base));
    }
    for extra in &spec.extra_moov_boxes {
        payload.extend_from_slice(extra);
    }
    make_box(b"moov", &payload)
}

/// Build a complete file: ftyp, free, moov and mdat (or mdat before moov).
pub fn build_mp4(spec: &MovieSpec) -> Vec<u8> {
    let (media, offsets) = layout(spec);
    let ftyp = ftyp();
    let free = make_box(b"free", &[0u8; 8]);
    let mdat = make_box(b"mdat", &media);

    if spec.moov_last {
        let base = (ftyp.len() + free.len() + 8) as u64;
        let moov = moov(spec, &offsets, base);
        [ftyp, free, mdat, moov].concat()
    } else {
        let moov_len = moov(spec, &offsets, 0).len();
        let base = (ftyp.len() + free.len() + moov_len + 8) as u64;
        let moov = moov(spec, &offsets, base);
        [ftyp, free, moov, mdat].concat()
    }
}
