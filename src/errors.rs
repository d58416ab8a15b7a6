use thiserror::Error;

/// Error returned by a [`Sink`](crate::sink::Sink) when an append or flush
/// fails. The decoder aborts on the first one it sees.
#[derive(Error, Debug)]
#[error("sink: {0}")]
pub struct SinkError(Box<dyn std::error::Error + Send + Sync>);

impl SinkError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SinkError(err.into())
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("not a statistics archive (first byte {0:#04x})")]
    BadMagic(u8),

    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u8),

    #[error("unexpected end of archive")]
    UnexpectedEof,

    #[error("invalid resource type definition: {0}")]
    BadSchema(String),

    #[error("unrecognised record token {0:#04x}")]
    BadRecord(u8),

    #[error("stat offset {offset} out of range (type declares {stat_count} stats)")]
    BadOffset { offset: u8, stat_count: usize },

    #[error("invalid compact value token {0}")]
    BadCompactToken(i8),

    #[error("sample timestamp went negative")]
    BadClock,

    #[error("malformed modified UTF-8 string")]
    BadString,

    #[error("reference to unknown resource type {0}")]
    UnknownType(i32),

    #[error("reference to unknown resource instance {0}")]
    UnknownInstance(i32),

    #[error("resource instance {0} created twice")]
    DuplicateInstance(i32),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("decode cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Translates a nom-level failure into a typed error: exhausted input
    /// becomes [`DecodeError::UnexpectedEof`], anything else becomes
    /// `fallback`.
    pub(crate) fn map_nom(
        err: nom::Err<nom::error::Error<&[u8]>>,
        fallback: DecodeError,
    ) -> DecodeError {
        match err {
            nom::Err::Incomplete(_) => DecodeError::UnexpectedEof,
            nom::Err::Error(inner) | nom::Err::Failure(inner) => match inner.code {
                nom::error::ErrorKind::Eof => DecodeError::UnexpectedEof,
                _ => fallback,
            },
        }
    }

    /// The errors lenient mode may recover from in the middle of a sample
    /// row. Everything else aborts even when lenient.
    pub(crate) fn is_row_recoverable(&self) -> bool {
        matches!(
            self,
            DecodeError::BadOffset { .. } | DecodeError::UnknownInstance(_)
        )
    }
}
