use smallvec::SmallVec;

use crate::compact::{COMPACT_2_TOKEN, MAX_1BYTE_VALUE, MIN_1BYTE_VALUE};

/// Writes a signed integer in the archive's compact form, using the
/// narrowest encoding the format defines for the value.
pub fn write_compact_value<W: std::io::Write>(value: i64, writer: &mut W) -> std::io::Result<()> {
    if (i64::from(MIN_1BYTE_VALUE)..=i64::from(MAX_1BYTE_VALUE)).contains(&value) {
        return writer.write_all(&[value as i8 as u8]);
    }

    // Strip leading bytes that are pure sign extension; what remains is
    // the big-endian payload. At least two bytes always stay, the 2-byte
    // token being the narrowest multi-byte form.
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 6 {
        let redundant = match bytes[start] {
            0x00 => bytes[start + 1] & 0x80 == 0,
            0xFF => bytes[start + 1] & 0x80 != 0,
            _ => false,
        };
        if !redundant {
            break;
        }
        start += 1;
    }

    let byte_count = bytes.len() - start;
    let token = COMPACT_2_TOKEN + (byte_count as i8 - 2);

    let mut out = SmallVec::<[u8; 9]>::new();
    out.push(token as u8);
    out.extend_from_slice(&bytes[start..]);
    writer.write_all(&out)
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use crate::compact::read_compact_value;

    use super::*;

    #[test]
    fn test_known_encodings() {
        let cases: [(i64, &[u8]); 8] = [
            (0, b"\x00"),
            (42, b"\x2A"),
            (127, b"\x7F"),
            (-120, b"\x88"),
            (-121, b"\x80\xFF\x87"),
            (256, b"\x80\x01\x00"),
            (i64::from(i32::MIN), b"\x82\x80\x00\x00\x00"),
            (i64::MIN, b"\x86\x80\x00\x00\x00\x00\x00\x00\x00"),
        ];
        for (value, expected) in cases {
            let mut buffer: Vec<u8> = Vec::new();
            write_compact_value(value, &mut buffer).unwrap();
            assert_eq!(buffer, expected, "encoding of {value}");
        }
    }

    #[test]
    fn test_round_trip() {
        let mut buffer: Vec<u8> = Vec::new();
        let mut writer = std::io::Cursor::new(&mut buffer);

        let mut numbers = vec![
            i64::MIN,
            i64::MIN + 1,
            i64::from(i32::MIN) - 1,
            i64::from(i32::MIN),
            -9_000_000_000,
            -16_777_216,
            -65_536,
            -32_769,
            -32_768,
            -256,
            -122,
            -121,
            -120,
            -1,
            0,
            1,
            42,
            127,
            128,
            255,
            256,
            32_767,
            32_768,
            16_777_215,
            16_777_216,
            i64::from(i32::MAX),
            i64::from(i32::MAX) + 1,
            1 << 40,
            1 << 48,
            i64::MAX - 1,
            i64::MAX,
        ];

        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        // Add some random numbers
        for _ in 0..500 {
            let number: i64 = rng.gen();
            numbers.push(number);
        }

        // Write
        for number in &numbers {
            write_compact_value(*number, &mut writer).unwrap();
        }

        // Read
        let mut cursor = &buffer[..];
        for number in numbers {
            let (new_cursor, read_number) = read_compact_value(cursor).unwrap();
            assert_eq!(read_number, number);
            cursor = new_cursor;
        }
    }
}
