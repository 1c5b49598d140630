use crate::bits::reader::{u32_at, u64_at, write_u32, write_u64};
use crate::errors::{Mp4Error, SeekResult};
use log::debug;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

/// Size of a compact box header (`size` + `type`)
pub const BOX_HEADER_SIZE: u64 = 8;
/// Size of an extended box header (`size == 1` + `type` + 64-bit size)
pub const BOX_HEADER64_SIZE: u64 = 16;

/// Box header information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub name: [u8; 4],
    /// Declared size including the header. Zero means "extends to the end of
    /// the enclosing space" and is resolved by the caller.
    pub size: u64,
    pub header_size: u64,
}

impl BoxHeader {
    /// Printable box name.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Payload size, zero for boxes that extend to the end of their container.
    pub fn data_size(&self) -> u64 {
        self.size.saturating_sub(self.header_size)
    }
}

/// Parse a box header at the start of `data`.
///
/// Returns `Ok(None)` when `data` does not yet hold the complete header.
pub fn parse_box_header(data: &[u8]) -> SeekResult<Option<BoxHeader>> {
    let (size32, name) = match (u32_at(data, 0), data.get(4..8)) {
        (Some(size), Some(name)) => (size, [name[0], name[1], name[2], name[3]]),
        _ => return Ok(None),
    };

    if size32 == 1 {
        let Some(size) = u64_at(data, 8) else {
            return Ok(None);
        };
        if size < BOX_HEADER64_SIZE {
            return Err(Mp4Error::malformed(format!(
                "{} box declares 64-bit size {} smaller than its header",
                String::from_utf8_lossy(&name),
                size
            ))
            .into());
        }
        return Ok(Some(BoxHeader {
            name,
            size,
            header_size: BOX_HEADER64_SIZE,
        }));
    }

    if size32 != 0 && (size32 as u64) < BOX_HEADER_SIZE {
        return Err(Mp4Error::malformed(format!(
            "{} box declares size {} smaller than its header",
            String::from_utf8_lossy(&name),
            size32
        ))
        .into());
    }

    Ok(Some(BoxHeader {
        name,
        size: size32 as u64,
        header_size: BOX_HEADER_SIZE,
    }))
}

/// Header size needed for a box carrying `data_size` payload bytes.
pub fn header_size_for(data_size: u64) -> u64 {
    if data_size + BOX_HEADER_SIZE > u32::MAX as u64 {
        BOX_HEADER64_SIZE
    } else {
        BOX_HEADER_SIZE
    }
}

/// Write a box header to a vector, switching to the 64-bit form when `size`
/// does not fit 32 bits. `size` must already account for the header form, see
/// [`header_size_for`].
pub fn write_box_header(output: &mut Vec<u8>, name: &[u8; 4], size: u64) {
    if size > u32::MAX as u64 {
        write_u32(output, 1);
        output.extend_from_slice(name);
        write_u64(output, size);
    } else {
        write_u32(output, size as u32);
        output.extend_from_slice(name);
    }
}

/// Find a box and return the contained slice
pub fn find_box<'a>(data: &'a [u8], name: &[u8; 4]) -> Option<&'a [u8]> {
    let (_, start, end) = find_box_range(data, name)?;
    Some(&data[start..end])
}

/// Find a box and return the start and end indices of its payload
pub fn find_box_range(data: &[u8], name: &[u8; 4]) -> Option<(usize, usize, usize)> {
    let mut pos = 0usize;

    while pos + BOX_HEADER_SIZE as usize <= data.len() {
        let start = pos;
        let header = parse_box_header(&data[pos..]).ok()??;
        let remaining = (data.len() - start) as u64;
        let size = if header.size == 0 {
            remaining
        } else {
            header.size
        };
        if size > remaining {
            return None;
        }

        let payload_start = start + header.header_size as usize;
        let payload_end = start + size as usize;
        if &header.name == name {
            return Some((start, payload_start, payload_end));
        }
        pos = payload_end;
    }
    None
}

/// Parse the version/flags word and entry count of a sample table payload.
///
/// `count_at` is the offset of the 32-bit entry count; entries of
/// `entry_size` bytes follow it. Returns `(version_flags, entry_count,
/// first_entry_offset)` after checking that every declared entry fits.
pub fn parse_table_header(
    name: &[u8; 4],
    data: &[u8],
    count_at: usize,
    entry_size: usize,
) -> SeekResult<(u32, u32, usize)> {
    let (Some(version_flags), Some(count)) = (u32_at(data, 0), u32_at(data, count_at)) else {
        return Err(Mp4Error::malformed(format!(
            "{} box too small: expected at least {} bytes, got {}",
            String::from_utf8_lossy(name),
            count_at + 4,
            data.len()
        ))
        .into());
    };

    let first_entry = count_at + 4;
    let required = (count as u64) * (entry_size as u64) + first_entry as u64;
    if required > data.len() as u64 {
        return Err(Mp4Error::malformed(format!(
            "{} box too small for {} entries: expected {} bytes, got {}",
            String::from_utf8_lossy(name),
            count,
            required,
            data.len()
        ))
        .into());
    }
    Ok((version_flags, count, first_entry))
}

/// Per-name box handler.
///
/// `C` is the context the handler mutates: the session for top-level and
/// `moov` children, a track for everything below `trak`.
pub trait BoxHandler<C> {
    fn handle(&self, ctx: &mut C, header: &BoxHeader, data: &[u8]) -> SeekResult<()>;
}

impl<C, F> BoxHandler<C> for F
where
    F: Fn(&mut C, &BoxHeader, &[u8]) -> SeekResult<()>,
{
    fn handle(&self, ctx: &mut C, header: &BoxHeader, data: &[u8]) -> SeekResult<()> {
        self(ctx, header, data)
    }
}

/// Name to handler table. Boxes without a registered handler are skipped;
/// registered containers are descended into by [`BoxDispatcher::walk`].
pub struct BoxDispatcher<C> {
    handlers: HashMap<[u8; 4], Box<dyn BoxHandler<C> + Send + Sync>>,
    containers: HashSet<[u8; 4]>,
}

impl<C> Default for BoxDispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            containers: HashSet::new(),
        }
    }
}

impl<C> BoxDispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler<H>(mut self, name: &[u8; 4], handler: H) -> Self
    where
        H: BoxHandler<C> + Send + Sync + 'static,
    {
        self.handlers.insert(*name, Box::new(handler));
        self
    }

    /// Register a container whose children are walked with this same table.
    pub fn with_container(mut self, name: &[u8; 4]) -> Self {
        self.containers.insert(*name);
        self
    }

    pub fn handles(&self, name: &[u8; 4]) -> bool {
        self.handlers.contains_key(name) || self.containers.contains(name)
    }

    /// Run the handler registered for `header.name`. Returns `false` when the
    /// box is unknown and was skipped.
    pub fn dispatch(&self, ctx: &mut C, header: &BoxHeader, data: &[u8]) -> SeekResult<bool> {
        match self.handlers.get(&header.name) {
            Some(handler) => {
                handler.handle(ctx, header, data)?;
                Ok(true)
            }
            None => {
                debug!("Skipping {} box ({} bytes)", header.name(), header.size);
                Ok(false)
            }
        }
    }

    /// Walk the children of a fully buffered container payload, dispatching
    /// each one. A child overrunning the container is a malformed box.
    pub fn walk(&self, ctx: &mut C, container: &[u8; 4], data: &[u8]) -> SeekResult<()> {
        let mut pos = 0usize;
        while pos < data.len() {
            let rest = &data[pos..];
            let header = match parse_box_header(rest)? {
                Some(header) => header,
                // QuickTime writers may pad containers with a zero terminator
                None if rest.iter().all(|b| *b == 0) => break,
                None => {
                    return Err(Mp4Error::malformed(format!(
                        "{} box ends with {} stray bytes",
                        String::from_utf8_lossy(container),
                        rest.len()
                    ))
                    .into())
                }
            };

            let size = if header.size == 0 {
                rest.len() as u64
            } else {
                header.size
            };
            if size > rest.len() as u64 {
                return Err(Mp4Error::malformed(format!(
                    "{} box ({} bytes) exceeds its {} container ({} bytes left)",
                    header.name(),
                    size,
                    String::from_utf8_lossy(container),
                    rest.len()
                ))
                .into());
            }

            let header = BoxHeader { size, ..header };
            let payload = &rest[header.header_size as usize..size as usize];
            if self.containers.contains(&header.name) {
                self.walk(ctx, &header.name, payload)?;
            } else {
                self.dispatch(ctx, &header, payload)?;
            }
            pos += size as usize;
        }
        Ok(())
    }
}
