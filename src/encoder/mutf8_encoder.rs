/// Writes a string in the Java `writeUTF` wire format: a big-endian u16
/// byte count, then the modified UTF-8 payload (U+0000 as 0xC0 0x80,
/// supplementary code points as two 3-byte surrogate sequences).
pub fn write_java_utf<W: std::io::Write>(value: &str, writer: &mut W) -> std::io::Result<()> {
    let mut payload: Vec<u8> = Vec::with_capacity(value.len());
    for c in value.chars() {
        let code_point = c as u32;
        match code_point {
            0 => payload.extend_from_slice(&[0xC0, 0x80]),
            0x01..=0x7F => payload.push(code_point as u8),
            0x80..=0x7FF => {
                payload.push(0xC0 | (code_point >> 6) as u8);
                payload.push(0x80 | (code_point & 0x3F) as u8);
            }
            0x800..=0xFFFF => push_three_byte(&mut payload, code_point),
            _ => {
                let v = code_point - 0x10000;
                push_three_byte(&mut payload, 0xD800 + (v >> 10));
                push_three_byte(&mut payload, 0xDC00 + (v & 0x3FF));
            }
        }
    }

    let length = u16::try_from(payload.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "string payload exceeds 65535 bytes",
        )
    })?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(&payload)
}

fn push_three_byte(payload: &mut Vec<u8>, code_point: u32) {
    payload.push(0xE0 | (code_point >> 12) as u8);
    payload.push(0x80 | ((code_point >> 6) & 0x3F) as u8);
    payload.push(0x80 | (code_point & 0x3F) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nul_is_overlong() {
        let mut buffer: Vec<u8> = Vec::new();
        write_java_utf("\0", &mut buffer).unwrap();
        assert_eq!(buffer, [0x00, 0x02, 0xC0, 0x80]);
    }

    #[test]
    fn test_supplementary_is_a_surrogate_pair() {
        let mut buffer: Vec<u8> = Vec::new();
        write_java_utf("\u{1F600}", &mut buffer).unwrap();
        assert_eq!(buffer, [0x00, 0x06, 0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]);
    }

    #[test]
    fn test_ascii_passes_through() {
        let mut buffer: Vec<u8> = Vec::new();
        write_java_utf("statSampler", &mut buffer).unwrap();
        assert_eq!(&buffer[..2], [0x00, 0x0B]);
        assert_eq!(&buffer[2..], b"statSampler");
    }
}
