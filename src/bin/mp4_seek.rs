use mp4seek::mp4::{MetaStatus, Mp4Meta, SeekOutput};
use mp4seek::{SeekConfig, SeekRequest, SeekResult};
use std::env;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

fn main() {
    println!("🎬 MP4 Seek - Pseudo-streaming Cutter");
    println!("=====================================");

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        println!("Usage: mp4_seek <input.mp4> <start_ms> [end_ms] <output.mp4>");
        println!("Example: mp4_seek movie.mp4 35000 clip.mp4");
        return;
    }

    let input = &args[1];
    let output = &args[args.len() - 1];
    let parse_ms = |arg: &str| arg.parse::<u64>().map_err(|e| format!("{}: {}", arg, e));
    let request = match (parse_ms(&args[2]), args.len()) {
        (Ok(start), 4) => Ok(SeekRequest::from_start(start)),
        (Ok(start), _) => parse_ms(&args[3]).map(|end| SeekRequest::new(start, end)),
        (Err(e), _) => Err(e),
    };
    let request = match request {
        Ok(request) => request,
        Err(e) => {
            println!("❌ Invalid time: {}", e);
            return;
        }
    };

    match cut(input, request, output) {
        Ok(written) => println!("\n✅ Wrote {} bytes to {}", written, output),
        Err(e) => println!("\n❌ Seek failed: {}", e),
    }
}

fn cut(input: &str, request: SeekRequest, output: &str) -> SeekResult<u64> {
    let config = SeekConfig::default();
    let mut file = File::open(input)?;
    let file_len = file.metadata()?.len();

    println!("📄 File: {}", input);
    println!("📏 Size: {} bytes", file_len);
    println!("⏱️  Range: {} ms .. {} ms", request.start, request.end);

    let mut meta = Mp4Meta::new(request, file_len, &config);
    let mut buf = vec![0u8; config.read_chunk_size];
    loop {
        let skip = meta.pending_skip();
        if skip > 0 {
            meta.skip(skip);
        }
        file.seek(SeekFrom::Start(meta.next_offset()))?;
        let n = file.read(&mut buf)?;
        if n == 0 {
            meta.end_of_input()?;
            break;
        }
        if let MetaStatus::Complete = meta.feed(&buf[..n])? {
            break;
        }
    }

    for track in meta.tracks() {
        let bounds = track.bounds.unwrap_or_default();
        println!(
            "🎞️  Track {} [{}]: samples {}..{}, chunks {}..{}",
            track.id(),
            track.handler(),
            bounds.start_sample,
            bounds.end_sample,
            bounds.start_chunk,
            bounds.end_chunk
        );
    }

    match meta.into_output() {
        Some(out) => write_output(&mut file, &out, output),
        None => Ok(0),
    }
}

fn write_output(file: &mut File, out: &SeekOutput, path: &str) -> SeekResult<u64> {
    println!(
        "📦 Header: {} bytes, media: {}..{}",
        out.header.len(),
        out.passthrough.start,
        out.passthrough.end
    );

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&out.header)?;
    file.seek(SeekFrom::Start(out.passthrough.start))?;
    let copied = std::io::copy(
        &mut file.take(out.passthrough.end - out.passthrough.start),
        &mut writer,
    )?;
    writer.flush()?;
    Ok(out.header.len() as u64 + copied)
}
