use nom::{bytes::complete::take, number::complete::be_i8, IResult};

pub use crate::encoder::compact_encoder::write_compact_value;

/// Largest value the writer packs into a single byte.
pub(crate) const MAX_1BYTE_VALUE: i8 = i8::MAX;
/// Smallest single-byte literal; everything below is a length token.
pub(crate) const MIN_1BYTE_VALUE: i8 = -120;
/// Token announcing a 2-byte big-endian payload.
pub(crate) const COMPACT_2_TOKEN: i8 = i8::MIN;
/// Token announcing the widest payload, 8 bytes.
pub(crate) const COMPACT_8_TOKEN: i8 = -122;

/// Reads one compact-encoded signed integer.
///
/// A first byte of −120..=127 is the value itself. −128 announces a 2-byte
/// big-endian payload, and −127..=−122 announce 3..=8 payload bytes,
/// sign-extended from the high bit of the first payload byte. Payloads
/// wider than the value needs are legal; old writers produced them. −121
/// has no defined payload width and is a protocol error.
///
/// Reconstruction is strictly big-endian. Rebuilding the value from the
/// little end flips the sign of anything whose low bytes look negative,
/// which is precisely the corruption this reader exists to avoid.
pub fn read_compact_value(input: &[u8]) -> IResult<&[u8], i64> {
    let (remaining_input, first) = be_i8(input)?;
    if first >= MIN_1BYTE_VALUE {
        return Ok((remaining_input, i64::from(first)));
    }
    if first > COMPACT_8_TOKEN {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }

    let byte_count = (first - COMPACT_2_TOKEN) as usize + 2;
    let (remaining_input, payload) = take(byte_count)(remaining_input)?;

    let mut value = i64::from(payload[0] as i8);
    for byte in &payload[1..] {
        value = (value << 8) | i64::from(*byte);
    }
    Ok((remaining_input, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_literals() {
        let cases: [(&[u8], i64); 5] = [
            (b"\x00", 0),
            (b"\x7F", 127),
            (b"\x2A", 42),
            (b"\xFF", -1),
            (b"\x88", -120),
        ];
        for (input, expected) in cases {
            let (remaining_input, value) = read_compact_value(input).unwrap();
            assert!(remaining_input.is_empty());
            assert_eq!(value, expected);
        }
    }

    #[test]
    fn test_two_byte_payload() {
        let (_, value) = read_compact_value(b"\x80\x01\x00").unwrap();
        assert_eq!(value, 256);

        let (_, value) = read_compact_value(b"\x80\xFF\x00").unwrap();
        assert_eq!(value, -256);

        let (_, value) = read_compact_value(b"\x80\xFF\x87").unwrap();
        assert_eq!(value, -121);

        let (_, value) = read_compact_value(b"\x80\x7F\xFF").unwrap();
        assert_eq!(value, 32767);
    }

    #[test]
    fn test_wide_payloads() {
        // 3 bytes, sign-extended from the first payload byte.
        let (_, value) = read_compact_value(b"\x81\xFF\xFF\x00").unwrap();
        assert_eq!(value, -256);

        // 4 bytes.
        let (_, value) = read_compact_value(b"\x82\x80\x00\x00\x00").unwrap();
        assert_eq!(value, i64::from(i32::MIN));

        // 6 bytes.
        let (_, value) = read_compact_value(b"\x84\x01\x00\x00\x00\x00\x00").unwrap();
        assert_eq!(value, 1 << 40);

        // 8 bytes.
        let (_, value) =
            read_compact_value(b"\x86\x80\x00\x00\x00\x00\x00\x00\x00").unwrap();
        assert_eq!(value, i64::MIN);

        let (_, value) =
            read_compact_value(b"\x86\x7F\xFF\xFF\xFF\xFF\xFF\xFF\xFF").unwrap();
        assert_eq!(value, i64::MAX);
    }

    #[test]
    fn test_reserved_token_is_rejected() {
        // -121 is the one leading byte with no defined payload width.
        let result = read_compact_value(b"\x87\x00\x00");
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_payload() {
        let result = read_compact_value(b"\x82\x80\x00");
        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_input_is_left_alone() {
        let (remaining_input, value) = read_compact_value(b"\x80\x01\x00\x2A").unwrap();
        assert_eq!(value, 256);
        assert_eq!(remaining_input, b"\x2A");
    }
}
