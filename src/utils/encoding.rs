use std::io::{self, Write};

/// Encode a u32 as a variable-length integer
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer from a slice
/// Returns (value, bytes_consumed)
pub fn decode_varint(buf: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    let mut shift = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 32 {
            return None; // Overflow
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None // Incomplete
}

/// Delta-encode a sorted list of u32s
pub fn delta_encode(values: &[u32], buf: &mut Vec<u8>) {
    debug_assert!(
        values.windows(2).all(|w| w[0] <= w[1]),
        "delta encoding requires sorted input"
    );
    let mut prev = 0u32;
    for &value in values {
        let delta = value - prev;
        encode_varint(delta, buf);
        prev = value;
    }
}

/// Delta-decode `count` u32s from the front of a slice
/// Returns (values, bytes_consumed), or None if the slice runs out early
pub fn delta_decode(buf: &[u8], count: usize) -> Option<(Vec<u32>, usize)> {
    let mut result = Vec::with_capacity(count);
    let mut prev = 0u32;
    let mut pos = 0;

    for _ in 0..count {
        let (delta, consumed) = decode_varint(&buf[pos..])?;
        prev = prev.checked_add(delta)?;
        result.push(prev);
        pos += consumed;
    }

    Some((result, pos))
}

/// Write a u32 in little-endian format
pub fn write_u32_le<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Write a u64 in little-endian format
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a u32 in little-endian format at `pos`, returning the value and the
/// position just past it
pub fn read_u32_le_at(buf: &[u8], pos: usize) -> Option<(u32, usize)> {
    let end = pos.checked_add(4)?;
    let bytes = buf.get(pos..end)?;
    Some((u32::from_le_bytes(bytes.try_into().ok()?), end))
}

/// Read a u64 in little-endian format at `pos`, returning the value and the
/// position just past it
pub fn read_u64_le_at(buf: &[u8], pos: usize) -> Option<(u64, usize)> {
    let end = pos.checked_add(8)?;
    let bytes = buf.get(pos..end)?;
    Some((u64::from_le_bytes(bytes.try_into().ok()?), end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let values = [0, 1, 127, 128, 16383, 16384, u32::MAX];
        for value in values {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            let (decoded, _) = decode_varint(&buf).unwrap();
            assert_eq!(value, decoded);
        }
    }

    #[test]
    fn test_delta_encoding() {
        let values = vec![1, 5, 10, 15, 100, 1000];
        let mut buf = Vec::new();
        delta_encode(&values, &mut buf);
        let (decoded, consumed) = delta_decode(&buf, values.len()).unwrap();
        assert_eq!(values, decoded);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn test_delta_decode_truncated() {
        let values = vec![3, 9, 500];
        let mut buf = Vec::new();
        delta_encode(&values, &mut buf);
        buf.pop();
        assert!(delta_decode(&buf, values.len()).is_none());
    }

    #[test]
    fn test_read_le_at_bounds() {
        let buf = 42u32.to_le_bytes();
        assert_eq!(read_u32_le_at(&buf, 0), Some((42, 4)));
        assert_eq!(read_u32_le_at(&buf, 1), None);
        assert_eq!(read_u64_le_at(&buf, 0), None);
    }
}
