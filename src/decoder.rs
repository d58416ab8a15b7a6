use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nom::number::complete::{be_f32, be_f64, be_i16, be_i32, be_i64, be_u16, be_u8};
use nom::IResult;
use tracing::{debug, warn};

use crate::adapter::MetricAdapter;
use crate::errors::DecodeError;
use crate::header::{read_archive_header, ArchiveHeader, ARCHIVE_VERSION, HEADER_TOKEN, MIN_ARCHIVE_VERSION};
use crate::mutf8::read_java_utf;
use crate::resource_id::{read_resource_id, ResourceId};
use crate::sample::{SampleConsumer, SampleRecord, StatValue};
use crate::schema::{ResourceInstance, ResourceType, StatDescriptor, StatKind};
use crate::sink::Sink;

pub use crate::encoder::archive_encoder::ArchiveWriter;

/// Record kinds legal at the top of the record loop. Anything else aborts
/// the decode; in particular, unknown bytes are never reinterpreted as
/// timestamp deltas.
pub(crate) const SAMPLE_TOKEN: u8 = 0;
pub(crate) const RESOURCE_TYPE_TOKEN: u8 = 1;
pub(crate) const RESOURCE_INSTANCE_CREATE_TOKEN: u8 = 2;
pub(crate) const RESOURCE_INSTANCE_DELETE_TOKEN: u8 = 3;

/// A sample row escapes to a 4-byte signed delta when its leading u16 is
/// all ones.
const INT_TIMESTAMP_TOKEN: u16 = 65535;
/// Stat offsets 0..=254 address descriptors; 255 ends the block.
const ILLEGAL_STAT_OFFSET: u8 = 255;
/// Declared stat counts above this are treated as corruption.
const MAX_STATS_PER_TYPE: i16 = 10000;

/// Cooperative cancellation flag, checked between records. Clone it, hand
/// one copy to the decoder and keep the other to pull the plug.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Knobs for one decode run.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// First component of every metric name. Defaults to `"gemfire"`.
    pub metric_prefix: String,
    /// Fixed labels attached to every sample, e.g. cluster or node name.
    pub extra_labels: BTreeMap<String, String>,
    /// When set, a corrupt sample row is skipped (logged and counted)
    /// instead of aborting the decode. Off by default: resyncing a token
    /// stream is guesswork and has historically dropped data silently.
    pub lenient: bool,
    pub cancel: Option<CancelToken>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            metric_prefix: "gemfire".to_string(),
            extra_labels: BTreeMap::new(),
            lenient: false,
            cancel: None,
        }
    }
}

/// Counters describing one decode run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Top-level records processed, sample rows included.
    pub records: u64,
    pub resource_types: u64,
    pub instances_created: u64,
    /// Individual samples handed to the consumer.
    pub samples: u64,
    /// Sample rows abandoned in lenient mode.
    pub rows_skipped: u64,
    /// Bytes scanned over while resyncing in lenient mode.
    pub bytes_skipped: u64,
}

type Input<'a> = &'a [u8];

fn eof<'a, T>(result: IResult<Input<'a>, T>) -> Result<(Input<'a>, T), DecodeError> {
    result.map_err(|err| DecodeError::map_nom(err, DecodeError::UnexpectedEof))
}

fn utf(input: Input) -> Result<(Input, String), DecodeError> {
    read_java_utf(input).map_err(|err| DecodeError::map_nom(err, DecodeError::BadString))
}

fn compact(input: Input) -> Result<(Input, i64), DecodeError> {
    crate::compact::read_compact_value(input).map_err(|err| {
        let token = input.first().copied().unwrap_or(0) as i8;
        DecodeError::map_nom(err, DecodeError::BadCompactToken(token))
    })
}

fn read_stat_value(input: Input, kind: StatKind) -> Result<(Input, StatValue), DecodeError> {
    match kind {
        StatKind::Long => {
            let (input, value) = compact(input)?;
            Ok((input, StatValue::I64(value)))
        }
        StatKind::Float => {
            let (input, value) = eof(be_f32(input))?;
            Ok((input, StatValue::F64(f64::from(value))))
        }
        StatKind::Double => {
            let (input, value) = eof(be_f64(input))?;
            Ok((input, StatValue::F64(value)))
        }
        _ => {
            let (input, value) = compact(input)?;
            Ok((input, StatValue::I32(value as i32)))
        }
    }
}

/// Reads a sample row's leading clock delta: a u16, read as signed unless
/// it is the all-ones escape, in which case a full i32 follows.
fn read_timestamp_delta(input: Input) -> Result<(Input, i64), DecodeError> {
    let (input, delta_short) = eof(be_u16(input))?;
    if delta_short == INT_TIMESTAMP_TOKEN {
        let (input, delta_int) = eof(be_i32(input))?;
        Ok((input, i64::from(delta_int)))
    } else {
        Ok((input, i64::from(delta_short as i16)))
    }
}

/// Scans forward to the next byte that could open a record. Lenient mode
/// only; returns how many bytes were abandoned.
fn resync(input: Input) -> (usize, Input) {
    match input.iter().position(|b| *b <= RESOURCE_INSTANCE_DELETE_TOKEN) {
        Some(position) => (position, &input[position..]),
        None => (input.len(), &input[input.len()..]),
    }
}

/// The token-driven state machine that replays one statistics archive.
///
/// Owns the schema table, the live-instance table and the running clock;
/// none of that state is shared or global. Feed it the whole archive and a
/// [`SampleConsumer`], get [`DecodeStats`] back.
pub struct ArchiveDecoder {
    header: Option<ArchiveHeader>,
    types: HashMap<i32, ResourceType>,
    instances: HashMap<i32, ResourceInstance>,
    clock_ms: i64,
    lenient: bool,
    cancel: Option<CancelToken>,
    stats: DecodeStats,
}

impl ArchiveDecoder {
    pub fn new(options: &DecodeOptions) -> Self {
        ArchiveDecoder {
            header: None,
            types: HashMap::new(),
            instances: HashMap::new(),
            clock_ms: 0,
            lenient: options.lenient,
            cancel: options.cancel.clone(),
            stats: DecodeStats::default(),
        }
    }

    /// The archive header, once the header phase has run.
    pub fn header(&self) -> Option<&ArchiveHeader> {
        self.header.as_ref()
    }

    /// Runs the decode to end-of-stream. Samples reach the consumer as
    /// they are parsed, so on error the consumer has already seen an
    /// arbitrary prefix of the archive.
    ///
    /// A decoder decodes one archive; build a fresh one per file.
    pub fn decode<C: SampleConsumer>(
        &mut self,
        input: &[u8],
        consumer: &mut C,
    ) -> Result<DecodeStats, DecodeError> {
        let mut input = self.read_header(input)?;

        while !input.is_empty() {
            self.check_cancelled()?;
            let kind = input[0];
            let rest = &input[1..];
            self.stats.records += 1;

            input = match kind {
                SAMPLE_TOKEN => self.read_sample_row(rest, consumer)?,
                RESOURCE_TYPE_TOKEN => self.read_resource_type(rest)?,
                RESOURCE_INSTANCE_CREATE_TOKEN => self.read_instance_create(rest)?,
                RESOURCE_INSTANCE_DELETE_TOKEN => self.read_instance_delete(rest)?,
                other => return Err(DecodeError::BadRecord(other)),
            };
        }

        consumer.finish()?;
        debug!(
            records = self.stats.records,
            samples = self.stats.samples,
            "archive decoded"
        );
        Ok(self.stats)
    }

    fn check_cancelled(&self) -> Result<(), DecodeError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(DecodeError::Cancelled),
            _ => Ok(()),
        }
    }

    fn read_header<'a>(&mut self, input: Input<'a>) -> Result<Input<'a>, DecodeError> {
        let marker = *input.first().ok_or(DecodeError::UnexpectedEof)?;
        if marker != HEADER_TOKEN {
            return Err(DecodeError::BadMagic(marker));
        }
        let version = *input.get(1).ok_or(DecodeError::UnexpectedEof)?;
        if !(MIN_ARCHIVE_VERSION..=ARCHIVE_VERSION).contains(&version) {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let (input, header) = read_archive_header(input)
            .map_err(|err| DecodeError::map_nom(err, DecodeError::BadString))?;
        debug!(
            version = header.version,
            start_time_ms = header.start_time_ms,
            system_id = header.system_id,
            "archive header read"
        );
        self.clock_ms = header.start_time_ms;
        self.header = Some(header);
        Ok(input)
    }

    fn read_resource_type<'a>(&mut self, input: Input<'a>) -> Result<Input<'a>, DecodeError> {
        let (input, type_id) = eof(be_i32(input))?;
        let (input, name) = utf(input)?;
        let (input, description) = utf(input)?;
        let (mut input, stat_count) = eof(be_i16(input))?;

        if !(0..=MAX_STATS_PER_TYPE).contains(&stat_count) {
            return Err(DecodeError::BadSchema(format!(
                "type {name} declares {stat_count} stats"
            )));
        }

        let mut stats = Vec::with_capacity(stat_count as usize);
        for _ in 0..stat_count {
            let (rest, descriptor) = read_stat_descriptor(input)?;
            input = rest;
            stats.push(descriptor);
        }

        debug!(type_id, name = %name, stats = stats.len(), "resource type recorded");
        match self.types.entry(type_id) {
            Entry::Occupied(_) => Err(DecodeError::BadSchema(format!(
                "duplicate resource type id {type_id}"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(ResourceType {
                    id: type_id,
                    name,
                    description,
                    stats,
                });
                self.stats.resource_types += 1;
                Ok(input)
            }
        }
    }

    fn read_instance_create<'a>(&mut self, input: Input<'a>) -> Result<Input<'a>, DecodeError> {
        let (input, instance_id) = eof(be_i32(input))?;
        let (input, text_id) = utf(input)?;
        let (input, numeric_id) = eof(be_i64(input))?;
        let (input, type_id) = eof(be_i32(input))?;

        if !self.types.contains_key(&type_id) {
            return Err(DecodeError::UnknownType(type_id));
        }
        match self.instances.entry(instance_id) {
            Entry::Occupied(_) => Err(DecodeError::DuplicateInstance(instance_id)),
            Entry::Vacant(slot) => {
                debug!(instance_id, text_id = %text_id, type_id, "resource instance created");
                slot.insert(ResourceInstance {
                    id: instance_id,
                    text_id,
                    numeric_id,
                    type_id,
                    created_at_ms: self.clock_ms,
                });
                self.stats.instances_created += 1;
                Ok(input)
            }
        }
    }

    fn read_instance_delete<'a>(&mut self, input: Input<'a>) -> Result<Input<'a>, DecodeError> {
        let (input, id) = eof(read_resource_id(input))?;
        match id {
            // The end-of-row sentinel has no meaning in a delete record.
            ResourceId::End => Err(DecodeError::BadRecord(0xFF)),
            ResourceId::Id(instance_id) => {
                if self.instances.remove(&instance_id).is_none() {
                    return Err(DecodeError::UnknownInstance(instance_id));
                }
                debug!(instance_id, "resource instance deleted");
                Ok(input)
            }
        }
    }

    fn read_sample_row<'a, C: SampleConsumer>(
        &mut self,
        input: Input<'a>,
        consumer: &mut C,
    ) -> Result<Input<'a>, DecodeError> {
        let (input, delta) = read_timestamp_delta(input)?;
        let advanced = self
            .clock_ms
            .checked_add(delta)
            .ok_or(DecodeError::BadClock)?;
        if advanced < 0 {
            return Err(DecodeError::BadClock);
        }
        self.clock_ms = advanced;

        let mut input = input;
        loop {
            let (rest, id) = eof(read_resource_id(input))?;
            input = rest;
            let instance_id = match id {
                ResourceId::End => return Ok(input),
                ResourceId::Id(instance_id) => instance_id,
            };

            input = match self.read_changed_stats(instance_id, input, consumer) {
                Ok(rest) => rest,
                Err(err) if self.lenient && err.is_row_recoverable() => {
                    let (skipped, rest) = resync(input);
                    warn!(
                        instance_id,
                        error = %err,
                        bytes_skipped = skipped,
                        "abandoning corrupt sample row"
                    );
                    self.stats.rows_skipped += 1;
                    self.stats.bytes_skipped += skipped as u64;
                    return Ok(rest);
                }
                Err(err) => return Err(err),
            };
        }
    }

    fn read_changed_stats<'a, C: SampleConsumer>(
        &mut self,
        instance_id: i32,
        input: Input<'a>,
        consumer: &mut C,
    ) -> Result<Input<'a>, DecodeError> {
        let instance = self
            .instances
            .get(&instance_id)
            .ok_or(DecodeError::UnknownInstance(instance_id))?;
        let resource_type = self
            .types
            .get(&instance.type_id)
            .ok_or(DecodeError::UnknownType(instance.type_id))?;

        let mut input = input;
        loop {
            let (rest, offset) = eof(be_u8(input))?;
            input = rest;
            if offset == ILLEGAL_STAT_OFFSET {
                return Ok(input);
            }

            // Every offset up to 254 is addressable; only the declared
            // stat count bounds it.
            let descriptor = resource_type.stats.get(offset as usize).ok_or(
                DecodeError::BadOffset {
                    offset,
                    stat_count: resource_type.stats.len(),
                },
            )?;

            let (rest, value) = read_stat_value(input, descriptor.kind)?;
            input = rest;

            consumer.sample(SampleRecord {
                timestamp_ms: self.clock_ms,
                instance_id,
                instance_text_id: &instance.text_id,
                instance_numeric_id: instance.numeric_id,
                resource_type: &resource_type.name,
                stat_offset: offset,
                stat: descriptor,
                value,
            })?;
            self.stats.samples += 1;
        }
    }
}

fn read_stat_descriptor(input: Input) -> Result<(Input, StatDescriptor), DecodeError> {
    let (input, name) = utf(input)?;
    let (input, code) = eof(be_u8(input))?;
    let kind = StatKind::from_code(code).ok_or_else(|| {
        DecodeError::BadSchema(format!("unknown value kind code {code} for stat {name}"))
    })?;
    let (input, is_counter) = eof(be_u8(input))?;
    let (input, larger_is_better) = eof(be_u8(input))?;
    let (input, unit) = utf(input)?;
    let (input, description) = utf(input)?;

    Ok((
        input,
        StatDescriptor {
            name,
            description,
            unit,
            kind,
            is_counter: is_counter != 0,
            larger_is_better: larger_is_better != 0,
        },
    ))
}

/// Decodes one archive file into `sink`.
pub fn decode_archive<P, S>(
    path: P,
    sink: &S,
    options: &DecodeOptions,
) -> Result<DecodeStats, DecodeError>
where
    P: AsRef<Path>,
    S: Sink,
{
    let bytes = fs::read(path)?;
    decode_archive_bytes(&bytes, sink, options)
}

/// Decodes an archive already held in memory into `sink`.
pub fn decode_archive_bytes<S: Sink>(
    bytes: &[u8],
    sink: &S,
    options: &DecodeOptions,
) -> Result<DecodeStats, DecodeError> {
    let mut adapter = MetricAdapter::new(sink, options);
    let mut decoder = ArchiveDecoder::new(options);
    decoder.decode(bytes, &mut adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_delta_short_form() {
        let (_, delta) = read_timestamp_delta(b"\x00\x05").unwrap();
        assert_eq!(delta, 5);

        // Read as signed: 0x8000 is a negative delta, not 32768.
        let (_, delta) = read_timestamp_delta(b"\x80\x00").unwrap();
        assert_eq!(delta, -32768);
    }

    #[test]
    fn test_timestamp_delta_int_escape() {
        let (_, delta) = read_timestamp_delta(b"\xFF\xFF\x00\x01\x86\xA0").unwrap();
        assert_eq!(delta, 100_000);

        let (_, delta) = read_timestamp_delta(b"\xFF\xFF\xFF\xFF\xFF\xFF").unwrap();
        assert_eq!(delta, -1);
    }

    #[test]
    fn test_resync_finds_next_plausible_record() {
        let (skipped, rest) = resync(b"\xAA\xBB\x01\x02");
        assert_eq!(skipped, 2);
        assert_eq!(rest, b"\x01\x02");

        let (skipped, rest) = resync(b"\xAA\xBB");
        assert_eq!(skipped, 2);
        assert!(rest.is_empty());
    }
}
