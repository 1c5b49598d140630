/*
# Byte Reader Module

 Big-endian integer access over byte slices, used by every box codec.
 Readers take a position cursor and return `None` when the slice is too short,
 writers append to an output vector or patch a value in place.

 Key components:
 - Slice readers: `read_u8()`, `read_u32()`, `read_u64()` with position tracking
 - Checked access: `u32_at()`, `u64_at()` for fixed-offset fields
 - Writers: `write_u32()`, `write_u64()`, `patch_u32()`, `patch_u64()`
*/

/// Read one byte from a byte slice advancing the position.
pub fn read_u8(data: &[u8], pos: &mut usize) -> Option<u8> {
    let v = *data.get(*pos)?;
    *pos += 1;
    Some(v)
}

/// Read a 32-bit big endian value from a byte slice advancing the position.
pub fn read_u32(data: &[u8], pos: &mut usize) -> Option<u32> {
    let v = u32_at(data, *pos)?;
    *pos += 4;
    Some(v)
}

/// Read a 64-bit big endian value from a byte slice advancing the position.
pub fn read_u64(data: &[u8], pos: &mut usize) -> Option<u64> {
    let v = u64_at(data, *pos)?;
    *pos += 8;
    Some(v)
}

/// 32-bit big endian value at a fixed offset.
pub fn u32_at(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// 64-bit big endian value at a fixed offset.
pub fn u64_at(data: &[u8], at: usize) -> Option<u64> {
    let bytes = data.get(at..at.checked_add(8)?)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

/// Append a 32-bit big endian value.
pub fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Append a 64-bit big endian value.
pub fn write_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Overwrite a 32-bit big endian value in place. Returns `false` if out of bounds.
pub fn patch_u32(data: &mut [u8], at: usize, v: u32) -> bool {
    match data.get_mut(at..at + 4) {
        Some(slot) => {
            slot.copy_from_slice(&v.to_be_bytes());
            true
        }
        None => false,
    }
}

/// Overwrite a 64-bit big endian value in place. Returns `false` if out of bounds.
pub fn patch_u64(data: &mut [u8], at: usize, v: u64) -> bool {
    match data.get_mut(at..at + 8) {
        Some(slot) => {
            slot.copy_from_slice(&v.to_be_bytes());
            true
        }
        None => false,
    }
}
