use nom::{
    bytes::complete::tag,
    number::complete::{be_i32, be_i64, be_u8},
    sequence::tuple,
    IResult,
};

use crate::mutf8::read_java_utf;

/// Marker byte opening every statistics archive.
pub const HEADER_TOKEN: u8 = 77;
/// Newest archive format version this reader understands.
pub const ARCHIVE_VERSION: u8 = 4;
/// Oldest version still accepted, on a best-effort basis.
pub const MIN_ARCHIVE_VERSION: u8 = 2;

/// Everything the writer records about itself before the first record.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveHeader {
    pub version: u8,
    /// Milliseconds since the epoch; the running sample clock starts here.
    pub start_time_ms: i64,
    pub system_id: i64,
    pub system_start_time_ms: i64,
    /// Offset from UTC in milliseconds.
    pub timezone_offset: i32,
    pub timezone_name: String,
    pub system_directory: String,
    pub product_description: String,
    pub os_info: String,
    pub machine_info: String,
}

/// Reads the archive header. Callers are expected to have sniffed the
/// marker and version bytes already; this parser re-reads them as part of
/// the fixed layout.
pub fn read_archive_header(input: &[u8]) -> IResult<&[u8], ArchiveHeader> {
    let (remaining_input, (_, version, start_time_ms, system_id, system_start_time_ms, timezone_offset)) =
        tuple((
            tag([HEADER_TOKEN]),
            be_u8,
            be_i64,
            be_i64,
            be_i64,
            be_i32,
        ))(input)?;

    let (remaining_input, timezone_name) = read_java_utf(remaining_input)?;
    let (remaining_input, system_directory) = read_java_utf(remaining_input)?;
    let (remaining_input, product_description) = read_java_utf(remaining_input)?;
    let (remaining_input, os_info) = read_java_utf(remaining_input)?;
    let (remaining_input, machine_info) = read_java_utf(remaining_input)?;

    Ok((
        remaining_input,
        ArchiveHeader {
            version,
            start_time_ms,
            system_id,
            system_start_time_ms,
            timezone_offset,
            timezone_name,
            system_directory,
            product_description,
            os_info,
            machine_info,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_header() {
        let mut input: Vec<u8> = vec![0x4D, 0x04];
        input.extend_from_slice(&1000i64.to_be_bytes());
        input.extend_from_slice(&7i64.to_be_bytes());
        input.extend_from_slice(&900i64.to_be_bytes());
        input.extend_from_slice(&3_600_000i32.to_be_bytes());
        input.extend_from_slice(b"\x00\x03UTC");
        input.extend_from_slice(b"\x00\x08/gemfire");
        input.extend_from_slice(b"\x00\x06GF 9.1");
        input.extend_from_slice(b"\x00\x05Linux");
        input.extend_from_slice(b"\x00\x06x86_64");

        let (remaining_input, header) = read_archive_header(&input).unwrap();
        assert!(remaining_input.is_empty());
        assert_eq!(header.version, 4);
        assert_eq!(header.start_time_ms, 1000);
        assert_eq!(header.system_id, 7);
        assert_eq!(header.system_start_time_ms, 900);
        assert_eq!(header.timezone_offset, 3_600_000);
        assert_eq!(header.timezone_name, "UTC");
        assert_eq!(header.system_directory, "/gemfire");
        assert_eq!(header.product_description, "GF 9.1");
        assert_eq!(header.os_info, "Linux");
        assert_eq!(header.machine_info, "x86_64");
    }

    #[test]
    fn test_wrong_marker() {
        let input = [0x4E, 0x04, 0, 0, 0, 0];
        assert!(read_archive_header(&input).is_err());
    }

    #[test]
    fn test_truncated_header() {
        let input = [0x4D, 0x04, 0, 0];
        assert!(read_archive_header(&input).is_err());
    }
}
