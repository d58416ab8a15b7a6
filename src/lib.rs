//!
//! A Rust reader for GemFire/Apache Geode statistics archives (`.gfs`).
//!
//! ## Features
//!
//! - Parse the token-encoded binary archive stream: header, self-describing
//!   resource-type schemas, instance lifecycle records, per-row clock
//!   deltas, and compact-encoded sample values.
//! - Replay every recorded sample, with millisecond timestamps, into a
//!   Prometheus-style sink as `(metric_name, labels, timestamp, value)`.
//! - Strict by default: a protocol violation aborts with a typed error
//!   instead of guessing where the stream resumes. An opt-in lenient mode
//!   skips corrupt sample rows, loudly.
//! - Also comes with the leaf codecs (`compact` integers, Java's modified
//!   UTF-8) and a reference writer used by the test suite.
//!
//! ## Why?
//!
//! GemFire servers sample hundreds of statistics into `.gfs` archives, and
//! the only practical way to look at them used to be dragging the files
//! into a Java GUI. Decoding the archive natively means the samples can go
//! straight into a Prometheus TSDB and onto a Grafana dashboard. The format
//! is unforgiving (variable-width integers, sentinel-terminated rows, one
//! byte deciding how the next eight parse), which is exactly why the
//! reader is strict about it.
//!
//! ## Example
//!
//! ```rust
//! use rusty_statarchive::{
//!     decode_archive_bytes, ArchiveHeader, ArchiveWriter, DecodeOptions, MemorySink,
//!     ResourceInstance, ResourceType, StatDescriptor, StatKind, StatValue,
//! };
//!
//! // Build a one-sample archive with the reference writer.
//! let mut writer = ArchiveWriter::new(Vec::new());
//! writer
//!     .header(&ArchiveHeader {
//!         version: 4,
//!         start_time_ms: 1_000,
//!         system_id: 1,
//!         system_start_time_ms: 900,
//!         timezone_offset: 0,
//!         timezone_name: "UTC".to_string(),
//!         system_directory: String::new(),
//!         product_description: String::new(),
//!         os_info: String::new(),
//!         machine_info: String::new(),
//!     })
//!     .unwrap();
//! writer
//!     .resource_type(&ResourceType {
//!         id: 10,
//!         name: "cachePerfStats".to_string(),
//!         description: String::new(),
//!         stats: vec![StatDescriptor {
//!             name: "puts".to_string(),
//!             description: String::new(),
//!             unit: "operations".to_string(),
//!             kind: StatKind::Int,
//!             is_counter: true,
//!             larger_is_better: true,
//!         }],
//!     })
//!     .unwrap();
//! writer
//!     .instance_create(&ResourceInstance {
//!         id: 0,
//!         text_id: "server-1".to_string(),
//!         numeric_id: 0,
//!         type_id: 10,
//!         created_at_ms: 0,
//!     })
//!     .unwrap();
//! writer.begin_sample_row(5).unwrap();
//! writer.row_instance(0).unwrap();
//! writer.row_stat(0, StatKind::Int, StatValue::I32(42)).unwrap();
//! writer.end_instance_stats().unwrap();
//! writer.end_sample_row().unwrap();
//!
//! // Decode it straight into an in-memory sink.
//! let sink = MemorySink::new();
//! let stats =
//!     decode_archive_bytes(&writer.into_inner(), &sink, &DecodeOptions::default()).unwrap();
//! assert_eq!(stats.samples, 1);
//!
//! let samples = sink.samples();
//! assert_eq!(samples[0].metric_name, "gemfire_cacheperfstats_puts");
//! assert_eq!(samples[0].labels["instance"], "server-1");
//! assert_eq!(samples[0].timestamp_ms, 1_005);
//! assert_eq!(samples[0].value, 42.0);
//! ```

/// Turns decoded samples into Prometheus-style metric names and labels.
pub mod adapter;
/// The archive's variable-width signed integer encoding.
pub mod compact;
/// The token-driven archive state machine and decode entry points.
pub mod decoder;
mod encoder;
mod errors;
/// The archive header and its parser.
pub mod header;
/// Java's modified UTF-8, length-prefixed.
pub mod mutf8;
/// Decode many archives on a bounded worker pool.
pub mod pool;
/// The 1/3/5-byte resource-instance id encoding.
pub mod resource_id;
mod sample;
mod schema;
/// The sink side: where flattened samples go.
pub mod sink;

// Re-exports
pub use adapter::{metric_name, MetricAdapter};
pub use decoder::{
    decode_archive, decode_archive_bytes, ArchiveDecoder, ArchiveWriter, CancelToken,
    DecodeOptions, DecodeStats,
};
pub use errors::{DecodeError, SinkError};
pub use header::ArchiveHeader;
pub use pool::{decode_archives, DEFAULT_WORKERS};
pub use resource_id::ResourceId;
pub use sample::{SampleConsumer, SampleRecord, StatValue};
pub use schema::{ResourceInstance, ResourceType, StatDescriptor, StatKind};
pub use sink::{MemorySink, MetricSample, Sink};
