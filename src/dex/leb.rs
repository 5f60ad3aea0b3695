pub(crate) fn encode_uleb128(value: u32) -> Vec<u8> {
    let mut result = Vec::new();
    let mut remaining = value;

    loop {
        let mut byte = (remaining & 0x7F) as u8;
        remaining >>= 7;

        if remaining != 0 {
            byte |= 0x80;
        }

        result.push(byte);

        if remaining == 0 {
            break;
        }
    }

    result
}

/// Decodes a uleb128 value from the start of `encoded`, returning the value and the number of
/// bytes consumed. `None` when the input ends before the final byte of the encoding.
pub(crate) fn decode_uleb128(encoded: &[u8]) -> Option<(u32, usize)> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;

    for (count, &byte) in encoded.iter().enumerate() {
        let low = (byte & 0x7F) as u32;
        if shift < 32 {
            value = value.wrapping_add(low.wrapping_shl(shift));
        }
        shift = shift.saturating_add(7);

        // DEX uleb128 values are 32-bit, valid encodings are at most 5 bytes.
        if (byte & 0x80) == 0 || count == 4 {
            return Some((value, count + 1));
        }
    }

    None
}
