//! Variable-length quantities, the integer format used for MIDI delta times
//! and meta/SysEx lengths.
//!
//! Each byte carries 7 bits of the value, most significant group first. Every
//! byte except the last has its high bit set.

use super::MidiError;

/// Largest number of bytes a `u32` can occupy as a VLQ.
const MAX_VLQ_BYTES: usize = 5;

/// Appends the VLQ encoding of `value` to `buffer`.
///
/// Zero encodes as a single `0x00` byte. Values below 2^28 never take more
/// than 4 bytes.
pub fn write_vlq(value: u32, buffer: &mut Vec<u8>) {
    if value == 0 {
        buffer.push(0);
        return;
    }

    let mut temp = value;
    let mut groups = [0u8; MAX_VLQ_BYTES];
    let mut count = 0;

    while temp > 0 {
        groups[count] = (temp & 0x7F) as u8;
        temp >>= 7;
        count += 1;
    }

    for i in (0..count).rev() {
        if i > 0 {
            buffer.push(groups[i] | 0x80);
        } else {
            buffer.push(groups[i]);
        }
    }
}

/// Returns the VLQ encoding of `value` as a fresh byte vector.
///
/// # Examples
///
/// ```
/// use promptmidi::midi::encode_vlq;
///
/// assert_eq!(encode_vlq(0), vec![0x00]);
/// assert_eq!(encode_vlq(480), vec![0x83, 0x60]);
/// ```
pub fn encode_vlq(value: u32) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(4);
    write_vlq(value, &mut buffer);
    buffer
}

/// Decodes a VLQ starting at `offset`.
///
/// # Returns
///
/// `(value, bytes_consumed)`
///
/// # Errors
///
/// `MalformedStream` if the data ends before a byte with the high bit clear,
/// or if the value does not fit in 32 bits.
pub fn decode_vlq(bytes: &[u8], offset: usize) -> Result<(u32, usize), MidiError> {
    let mut value: u32 = 0;
    let mut consumed = 0;

    loop {
        let byte = *bytes.get(offset + consumed).ok_or_else(|| {
            MidiError::malformed(format!(
                "variable-length quantity at offset {} runs past end of data",
                offset
            ))
        })?;
        consumed += 1;

        if value > (u32::MAX >> 7) {
            return Err(MidiError::malformed(format!(
                "variable-length quantity at offset {} overflows 32 bits",
                offset
            )));
        }
        value = (value << 7) | (byte & 0x7F) as u32;

        if byte & 0x80 == 0 {
            return Ok((value, consumed));
        }
        if consumed == MAX_VLQ_BYTES {
            return Err(MidiError::malformed(format!(
                "variable-length quantity at offset {} is longer than {} bytes",
                offset, MAX_VLQ_BYTES
            )));
        }
    }
}
