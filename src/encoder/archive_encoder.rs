use std::io;

use crate::decoder::{
    RESOURCE_INSTANCE_CREATE_TOKEN, RESOURCE_INSTANCE_DELETE_TOKEN, RESOURCE_TYPE_TOKEN,
    SAMPLE_TOKEN,
};
use crate::header::{ArchiveHeader, HEADER_TOKEN};
use crate::resource_id::{ILLEGAL_RESOURCE_ID_TOKEN, INT_RESOURCE_ID_TOKEN, SHORT_RESOURCE_ID_TOKEN};
use crate::sample::StatValue;
use crate::schema::{ResourceInstance, ResourceType, StatKind};

use super::compact_encoder::write_compact_value;
use super::mutf8_encoder::write_java_utf;

/// Serialises statistics archives.
///
/// The decoder's test suite round-trips through this writer, and it is
/// handy for building fixtures, but the crate's job is reading archives:
/// nothing in the decode pipeline depends on it.
pub struct ArchiveWriter<W> {
    writer: W,
}

impl<W: io::Write> ArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        ArchiveWriter { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn header(&mut self, header: &ArchiveHeader) -> io::Result<()> {
        self.writer.write_all(&[HEADER_TOKEN, header.version])?;
        self.writer.write_all(&header.start_time_ms.to_be_bytes())?;
        self.writer.write_all(&header.system_id.to_be_bytes())?;
        self.writer
            .write_all(&header.system_start_time_ms.to_be_bytes())?;
        self.writer.write_all(&header.timezone_offset.to_be_bytes())?;
        write_java_utf(&header.timezone_name, &mut self.writer)?;
        write_java_utf(&header.system_directory, &mut self.writer)?;
        write_java_utf(&header.product_description, &mut self.writer)?;
        write_java_utf(&header.os_info, &mut self.writer)?;
        write_java_utf(&header.machine_info, &mut self.writer)
    }

    pub fn resource_type(&mut self, resource_type: &ResourceType) -> io::Result<()> {
        self.writer.write_all(&[RESOURCE_TYPE_TOKEN])?;
        self.writer.write_all(&resource_type.id.to_be_bytes())?;
        write_java_utf(&resource_type.name, &mut self.writer)?;
        write_java_utf(&resource_type.description, &mut self.writer)?;

        let stat_count = i16::try_from(resource_type.stats.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "too many stats for one type"))?;
        self.writer.write_all(&stat_count.to_be_bytes())?;

        for stat in &resource_type.stats {
            write_java_utf(&stat.name, &mut self.writer)?;
            self.writer.write_all(&[
                stat.kind.code(),
                u8::from(stat.is_counter),
                u8::from(stat.larger_is_better),
            ])?;
            write_java_utf(&stat.unit, &mut self.writer)?;
            write_java_utf(&stat.description, &mut self.writer)?;
        }
        Ok(())
    }

    pub fn instance_create(&mut self, instance: &ResourceInstance) -> io::Result<()> {
        self.writer.write_all(&[RESOURCE_INSTANCE_CREATE_TOKEN])?;
        self.writer.write_all(&instance.id.to_be_bytes())?;
        write_java_utf(&instance.text_id, &mut self.writer)?;
        self.writer.write_all(&instance.numeric_id.to_be_bytes())?;
        self.writer.write_all(&instance.type_id.to_be_bytes())
    }

    pub fn instance_delete(&mut self, instance_id: i32) -> io::Result<()> {
        self.writer.write_all(&[RESOURCE_INSTANCE_DELETE_TOKEN])?;
        self.resource_id(instance_id)
    }

    /// Opens a sample row advancing the clock by `delta_ms`. Follow with
    /// any number of `row_instance`/`row_stat`/`end_instance_stats`
    /// groups, then `end_sample_row`.
    pub fn begin_sample_row(&mut self, delta_ms: i64) -> io::Result<()> {
        self.writer.write_all(&[SAMPLE_TOKEN])?;
        match i16::try_from(delta_ms) {
            // -1 collides with the int-delta escape, so it takes the long
            // form too.
            Ok(short) if short != -1 => self.writer.write_all(&(short as u16).to_be_bytes()),
            _ => {
                let wide = i32::try_from(delta_ms).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "clock delta exceeds 32 bits")
                })?;
                self.writer.write_all(&u16::MAX.to_be_bytes())?;
                self.writer.write_all(&wide.to_be_bytes())
            }
        }
    }

    pub fn row_instance(&mut self, instance_id: i32) -> io::Result<()> {
        self.resource_id(instance_id)
    }

    pub fn row_stat(&mut self, offset: u8, kind: StatKind, value: StatValue) -> io::Result<()> {
        self.writer.write_all(&[offset])?;
        match kind {
            StatKind::Float => {
                let value = value.as_f64() as f32;
                self.writer.write_all(&value.to_be_bytes())
            }
            StatKind::Double => self.writer.write_all(&value.as_f64().to_be_bytes()),
            _ => {
                let value = match value {
                    StatValue::I32(v) => i64::from(v),
                    StatValue::I64(v) => v,
                    StatValue::F64(v) => v as i64,
                };
                write_compact_value(value, &mut self.writer)
            }
        }
    }

    pub fn end_instance_stats(&mut self) -> io::Result<()> {
        self.writer.write_all(&[0xFF])
    }

    pub fn end_sample_row(&mut self) -> io::Result<()> {
        self.writer.write_all(&[ILLEGAL_RESOURCE_ID_TOKEN])
    }

    fn resource_id(&mut self, instance_id: i32) -> io::Result<()> {
        match u32::try_from(instance_id) {
            Ok(id) if id < u32::from(SHORT_RESOURCE_ID_TOKEN) => {
                self.writer.write_all(&[id as u8])
            }
            Ok(id) if id <= u32::from(u16::MAX) => {
                self.writer.write_all(&[SHORT_RESOURCE_ID_TOKEN])?;
                self.writer.write_all(&(id as u16).to_be_bytes())
            }
            _ => {
                self.writer.write_all(&[INT_RESOURCE_ID_TOKEN])?;
                self.writer.write_all(&(instance_id as u32).to_be_bytes())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::StatDescriptor;

    use super::*;

    fn tiny_type() -> ResourceType {
        ResourceType {
            id: 1,
            name: "cachePerfStats".to_string(),
            description: String::new(),
            stats: vec![StatDescriptor {
                name: "puts".to_string(),
                description: String::new(),
                unit: "operations".to_string(),
                kind: StatKind::Int,
                is_counter: true,
                larger_is_better: true,
            }],
        }
    }

    #[test]
    fn test_sample_row_layout() {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer.begin_sample_row(5).unwrap();
        writer.row_instance(2).unwrap();
        writer.row_stat(0, StatKind::Int, StatValue::I32(42)).unwrap();
        writer.end_instance_stats().unwrap();
        writer.end_sample_row().unwrap();

        assert_eq!(
            writer.into_inner(),
            [0x00, 0x00, 0x05, 0x02, 0x00, 0x2A, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_negative_one_delta_takes_the_long_form() {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer.begin_sample_row(-1).unwrap();
        assert_eq!(
            writer.into_inner(),
            [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_resource_type_layout() {
        let mut writer = ArchiveWriter::new(Vec::new());
        writer.resource_type(&tiny_type()).unwrap();
        let bytes = writer.into_inner();

        assert_eq!(bytes[0], RESOURCE_TYPE_TOKEN);
        assert_eq!(&bytes[1..5], 1i32.to_be_bytes());
        // name length prefix, then the name itself
        assert_eq!(&bytes[5..7], [0x00, 0x0E]);
        assert_eq!(&bytes[7..21], b"cachePerfStats");
    }
}
