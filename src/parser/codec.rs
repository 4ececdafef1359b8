use super::constants::Endianness;

/// Decodes an unsigned integer stored in `bytes` with the given byte order.
pub fn decode_int(bytes: &[u8], endianness: Endianness) -> u64 {
    let fold = |num: u64, &b: &u8| (num << 8) | u64::from(b);
    match endianness {
        Endianness::Big => bytes.iter().fold(0, fold),
        Endianness::Little => bytes.iter().rev().fold(0, fold),
    }
}

/// Encodes `value` into exactly `size` bytes.
///
/// Bits that do not fit into `size` bytes are dropped.
pub fn encode_int(value: u64, size: usize, endianness: Endianness) -> Vec<u8> {
    let mut out: Vec<u8> = (0..size)
        .map(|pos| value.checked_shr(8 * pos as u32).unwrap_or(0) as u8)
        .collect();
    if endianness == Endianness::Big {
        out.reverse();
    }
    out
}
