use super::r#box::{parse_box_header, BoxHeader, BOX_HEADER64_SIZE};
use crate::errors::{Mp4Error, SeekResult};
use log::debug;

pub const MDAT: &[u8; 4] = b"mdat";

/// Location of the media data box in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDataHeader {
    /// Absolute offset of the box header
    pub offset: u64,
    pub header_size: u64,
    /// Declared size, resolved against the file length for size-0 boxes
    pub size: u64,
}

impl MediaDataHeader {
    pub fn payload_start(&self) -> u64 {
        self.offset + self.header_size
    }

    pub fn payload_end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Outcome of one [`BoxReader::poll`] step
#[derive(Debug, PartialEq, Eq)]
pub enum ReadEvent {
    /// At least this many more input bytes are needed
    NeedMore(u64),
    /// A complete, fully buffered top-level box
    Box {
        header: BoxHeader,
        offset: u64,
        data: Vec<u8>,
    },
    /// The media data header; its payload is skipped, never buffered
    MediaData(MediaDataHeader),
    /// Every byte of the file has been consumed
    End,
}

/// Resumable top-level box reader.
///
/// Input arrives in arbitrary chunks through [`feed`](Self::feed). Wanted
/// boxes are buffered until complete; every other box, and the media data
/// payload, is skipped by its declared size without being buffered.
#[derive(Debug)]
pub struct BoxReader {
    buffer: Vec<u8>,
    /// Absolute file offset of `buffer[0]`
    position: u64,
    /// Bytes still to discard before the next box header
    skip: u64,
    file_len: u64,
    max_buffer_size: usize,
}

impl BoxReader {
    pub fn new(file_len: u64, max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::new(),
            position: 0,
            skip: 0,
            file_len,
            max_buffer_size,
        }
    }

    /// Absolute offset of the next byte expected by [`feed`](Self::feed).
    pub fn next_offset(&self) -> u64 {
        self.position + self.buffer.len() as u64
    }

    /// Bytes that will be discarded before the next box header.
    pub fn pending_skip(&self) -> u64 {
        self.skip
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Record that up to `n` pending skip bytes were jumped over by the
    /// caller instead of being fed. Returns the number of bytes accounted.
    pub fn skip(&mut self, n: u64) -> u64 {
        self.apply_skip();
        let n = n.min(self.skip);
        self.skip -= n;
        self.position += n;
        n
    }

    /// Append the next input bytes, dropping those inside a skipped box.
    pub fn feed(&mut self, chunk: &[u8]) {
        let dropped = self.skip.min(chunk.len() as u64) as usize;
        if self.buffer.is_empty() && dropped > 0 {
            self.skip -= dropped as u64;
            self.position += dropped as u64;
            self.buffer.extend_from_slice(&chunk[dropped..]);
        } else {
            self.buffer.extend_from_slice(chunk);
        }
    }

    fn apply_skip(&mut self) {
        if self.skip == 0 || self.buffer.is_empty() {
            return;
        }
        let n = self.skip.min(self.buffer.len() as u64) as usize;
        self.buffer.drain(..n);
        self.skip -= n as u64;
        self.position += n as u64;
    }

    fn need(&self, missing: u64) -> SeekResult<ReadEvent> {
        if self.buffer.len() >= self.max_buffer_size {
            return Err(Mp4Error::BufferExhausted {
                limit: self.max_buffer_size,
            }
            .into());
        }
        Ok(ReadEvent::NeedMore(missing))
    }

    /// Advance to the next event. `wanted` selects the top-level boxes to
    /// buffer; the media data box is always reported.
    pub fn poll<F>(&mut self, wanted: F) -> SeekResult<ReadEvent>
    where
        F: Fn(&[u8; 4]) -> bool,
    {
        loop {
            self.apply_skip();
            if self.skip > 0 {
                return Ok(ReadEvent::NeedMore(self.skip));
            }
            if self.buffer.is_empty() && self.position >= self.file_len {
                return Ok(ReadEvent::End);
            }

            let Some(header) = parse_box_header(&self.buffer)? else {
                let extended = self.buffer.len() >= 4 && self.buffer[..4] == [0, 0, 0, 1];
                let wanted_header = if extended { BOX_HEADER64_SIZE } else { 8 };
                if self.position + wanted_header > self.file_len {
                    return Err(Mp4Error::malformed(format!(
                        "{} trailing bytes at offset {} do not form a box header",
                        self.file_len - self.position,
                        self.position
                    ))
                    .into());
                }
                return self.need(wanted_header - self.buffer.len() as u64);
            };

            let remaining = self.file_len.saturating_sub(self.position);
            let size = if header.size == 0 { remaining } else { header.size };
            if size > remaining {
                return Err(Mp4Error::malformed(format!(
                    "{} box at offset {} declares {} bytes, only {} left in file",
                    header.name(),
                    self.position,
                    size,
                    remaining
                ))
                .into());
            }
            let header = BoxHeader { size, ..header };
            let offset = self.position;

            if &header.name == MDAT {
                let mdat = MediaDataHeader {
                    offset,
                    header_size: header.header_size,
                    size,
                };
                self.buffer.drain(..header.header_size as usize);
                self.position += header.header_size;
                self.skip = header.data_size();
                debug!(
                    "mdat at offset {}: {} payload bytes",
                    offset,
                    header.data_size()
                );
                return Ok(ReadEvent::MediaData(mdat));
            }

            if !wanted(&header.name) {
                debug!(
                    "Skipping {} box at offset {} ({} bytes)",
                    header.name(),
                    offset,
                    size
                );
                self.skip = size;
                continue;
            }

            if size > self.max_buffer_size as u64 {
                return Err(Mp4Error::BufferExhausted {
                    limit: self.max_buffer_size,
                }
                .into());
            }
            if (self.buffer.len() as u64) < size {
                return self.need(size - self.buffer.len() as u64);
            }

            let rest = self.buffer.split_off(size as usize);
            let mut data = std::mem::replace(&mut self.buffer, rest);
            data.drain(..header.header_size as usize);
            self.position += size;
            return Ok(ReadEvent::Box {
                header,
                offset,
                data,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SeekError;
    use crate::mp4::fixtures::make_box;

    fn wanted(name: &[u8; 4]) -> bool {
        name == b"ftyp" || name == b"moov"
    }

    #[test]
    fn test_boxes_complete_across_chunks() {
        let file = [
            make_box(b"ftyp", b"isom\0\0\0\0"),
            make_box(b"free", &[9; 30]),
            make_box(b"moov", &[1; 20]),
        ]
        .concat();
        let mut reader = BoxReader::new(file.len() as u64, 1024);
        let mut events = Vec::new();
        for chunk in file.chunks(3) {
            reader.feed(chunk);
            loop {
                match reader.poll(wanted).unwrap() {
                    ReadEvent::NeedMore(_) => break,
                    ReadEvent::End => break,
                    ReadEvent::Box { header, offset, data } => {
                        events.push((header.name().into_owned(), offset, data.len()))
                    }
                    ReadEvent::MediaData(_) => unreachable!(),
                }
            }
        }
        assert_eq!(
            events,
            vec![("ftyp".to_string(), 0, 8), ("moov".to_string(), 54, 20)]
        );
        assert_eq!(reader.poll(wanted).unwrap(), ReadEvent::End);
    }

    #[test]
    fn test_mdat_payload_is_skipped() {
        let file = [make_box(b"mdat", &[7; 100]), make_box(b"moov", &[1; 4])].concat();
        let mut reader = BoxReader::new(file.len() as u64, 1024);
        reader.feed(&file[..20]);
        let event = reader.poll(wanted).unwrap();
        assert_eq!(
            event,
            ReadEvent::MediaData(MediaDataHeader {
                offset: 0,
                header_size: 8,
                size: 108
            })
        );
        assert_eq!(reader.poll(wanted).unwrap(), ReadEvent::NeedMore(88));
        assert_eq!(reader.buffered(), 0);

        // jump over the rest of the payload instead of feeding it
        assert_eq!(reader.next_offset(), 20);
        assert_eq!(reader.skip(88), 88);
        assert_eq!(reader.next_offset(), 108);
        reader.feed(&file[108..]);
        assert!(matches!(reader.poll(wanted).unwrap(), ReadEvent::Box { offset: 108, .. }));
    }

    #[test]
    fn test_box_past_end_of_file_is_malformed() {
        let mut file = make_box(b"moov", &[0; 32]);
        file.truncate(20);
        let mut reader = BoxReader::new(file.len() as u64, 1024);
        reader.feed(&file);
        let err = reader.poll(wanted).unwrap_err();
        assert!(matches!(err, SeekError::Mp4(Mp4Error::MalformedBox { .. })));
    }

    #[test]
    fn test_buffer_cap_reached_while_incomplete() {
        let file = make_box(b"moov", &[0; 64]);
        let mut reader = BoxReader::new(file.len() as u64, 16);
        reader.feed(&file[..6]);
        assert_eq!(reader.poll(wanted).unwrap(), ReadEvent::NeedMore(2));
        reader.feed(&file[6..20]);
        let err = reader.poll(wanted).unwrap_err();
        assert!(matches!(
            err,
            SeekError::Mp4(Mp4Error::BufferExhausted { limit: 16 })
        ));
    }

    #[test]
    fn test_box_over_cap_rejected_before_buffering() {
        let file = make_box(b"moov", &[0; 64]);
        let mut reader = BoxReader::new(file.len() as u64, 64);
        reader.feed(&file[..10]);
        let err = reader.poll(wanted).unwrap_err();
        assert!(matches!(
            err,
            SeekError::Mp4(Mp4Error::BufferExhausted { limit: 64 })
        ));

        // the whole box arriving at once is rejected all the same
        let mut reader = BoxReader::new(file.len() as u64, 64);
        reader.feed(&file);
        assert!(reader.poll(wanted).is_err());
    }

    #[test]
    fn test_box_at_cap_is_accepted() {
        let file = make_box(b"moov", &[0; 56]);
        let mut reader = BoxReader::new(file.len() as u64, 64);
        reader.feed(&file[..10]);
        assert_eq!(reader.poll(wanted).unwrap(), ReadEvent::NeedMore(54));
        reader.feed(&file[10..]);
        assert!(matches!(reader.poll(wanted).unwrap(), ReadEvent::Box { .. }));
    }

    #[test]
    fn test_size_zero_box_runs_to_end_of_file() {
        let mut file = make_box(b"ftyp", b"isom\0\0\0\0");
        file.extend_from_slice(&[0, 0, 0, 0]);
        file.extend_from_slice(b"mdat");
        file.extend_from_slice(&[5; 12]);
        let mut reader = BoxReader::new(file.len() as u64, 1024);
        reader.feed(&file);
        assert!(matches!(reader.poll(wanted).unwrap(), ReadEvent::Box { .. }));
        match reader.poll(wanted).unwrap() {
            ReadEvent::MediaData(mdat) => assert_eq!(mdat.size, 20),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(reader.poll(wanted).unwrap(), ReadEvent::End);
    }
}
