use nom::{
    number::complete::{be_u16, be_u32, be_u8},
    IResult,
};

/// First byte announcing a 2-byte instance id.
pub(crate) const SHORT_RESOURCE_ID_TOKEN: u8 = 253;
/// First byte announcing a 4-byte instance id.
pub(crate) const INT_RESOURCE_ID_TOKEN: u8 = 254;
/// The sentinel closing a sample row.
pub(crate) const ILLEGAL_RESOURCE_ID_TOKEN: u8 = 255;

/// A resource-instance id as it appears in sample rows and delete records.
///
/// Ids below 253 are packed into the token byte itself. The 253/254/255
/// values here are unrelated to the sample-row timestamp tokens even
/// though the numbers collide; the two never share a syntactic position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceId {
    Id(i32),
    /// The end-of-sample-row sentinel.
    End,
}

pub fn read_resource_id(input: &[u8]) -> IResult<&[u8], ResourceId> {
    let (remaining_input, first) = be_u8(input)?;
    match first {
        ILLEGAL_RESOURCE_ID_TOKEN => Ok((remaining_input, ResourceId::End)),
        INT_RESOURCE_ID_TOKEN => {
            let (remaining_input, id) = be_u32(remaining_input)?;
            Ok((remaining_input, ResourceId::Id(id as i32)))
        }
        SHORT_RESOURCE_ID_TOKEN => {
            let (remaining_input, id) = be_u16(remaining_input)?;
            Ok((remaining_input, ResourceId::Id(i32::from(id))))
        }
        packed => Ok((remaining_input, ResourceId::Id(i32::from(packed)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_ids() {
        let (_, id) = read_resource_id(b"\x00").unwrap();
        assert_eq!(id, ResourceId::Id(0));

        let (_, id) = read_resource_id(b"\xFC").unwrap();
        assert_eq!(id, ResourceId::Id(252));
    }

    #[test]
    fn test_short_id() {
        let (_, id) = read_resource_id(b"\xFD\x04\x00").unwrap();
        assert_eq!(id, ResourceId::Id(1024));
    }

    #[test]
    fn test_int_id() {
        let (_, id) = read_resource_id(b"\xFE\x00\x10\x00\x00").unwrap();
        assert_eq!(id, ResourceId::Id(1 << 20));
    }

    #[test]
    fn test_end_sentinel() {
        let (remaining_input, id) = read_resource_id(b"\xFF\x01").unwrap();
        assert_eq!(id, ResourceId::End);
        assert_eq!(remaining_input, b"\x01");
    }

    #[test]
    fn test_truncated_short_id() {
        assert!(read_resource_id(b"\xFD\x04").is_err());
    }
}
