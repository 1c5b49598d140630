use std::error::Error;
use std::fmt;
use std::io;

/// Enumeration of all possible errors that can occur while preparing a seek
#[derive(Debug)]
pub enum SeekError {
    Mp4(Mp4Error),
    Stream(StreamError),
    Other(io::Error),
}

/// Coarse classification of a failed session, used by callers to decide how to
/// answer the client (for example falling back to full-file delivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The source file is malformed, truncated or uses an unsupported feature.
    BadInput,
    /// The requested start/end times do not describe a playable range.
    BadRange,
    /// The metadata does not fit the configured working buffer.
    ResourceLimit,
    /// Fetching bytes from the origin failed.
    Transport,
}

/// Range fetch / transport errors
#[derive(Debug)]
pub struct StreamError {
    pub message: String,
}

impl StreamError {
    /// Create a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// MP4 parse, trim and reassembly errors
#[derive(Debug)]
pub enum Mp4Error {
    /// Declared size inconsistent with its container, the buffer or the file
    MalformedBox { message: String },
    /// Compressed movie box, too many tracks, or an offset width that cannot hold the result
    Unsupported { message: String },
    /// Metadata did not fit the working buffer before becoming complete
    BufferExhausted { limit: usize },
    /// Requested start/end outside the playable duration
    InvalidRange { message: String },
    /// Input ended before a declared box was complete
    TruncatedInput { needed: u64 },
}

impl Mp4Error {
    pub fn malformed(message: impl Into<String>) -> Self {
        Mp4Error::MalformedBox {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Mp4Error::Unsupported {
            message: message.into(),
        }
    }

    pub fn invalid_range(message: impl Into<String>) -> Self {
        Mp4Error::InvalidRange {
            message: message.into(),
        }
    }
}

impl SeekError {
    /// Classify the error for the caller.
    pub fn kind(&self) -> FailureKind {
        match self {
            SeekError::Mp4(Mp4Error::InvalidRange { .. }) => FailureKind::BadRange,
            SeekError::Mp4(Mp4Error::BufferExhausted { .. }) => FailureKind::ResourceLimit,
            SeekError::Mp4(_) => FailureKind::BadInput,
            SeekError::Stream(_) | SeekError::Other(_) => FailureKind::Transport,
        }
    }
}

impl fmt::Display for SeekError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeekError::Other(err) => write!(f, "I/O error: {}", err),
            SeekError::Stream(err) => write!(f, "Stream error: {}", err),
            SeekError::Mp4(err) => write!(f, "MP4 error: {}", err),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for Mp4Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mp4Error::MalformedBox { message } => write!(f, "malformed box: {}", message),
            Mp4Error::Unsupported { message } => write!(f, "unsupported: {}", message),
            Mp4Error::BufferExhausted { limit } => {
                write!(f, "metadata too large to buffer (limit {} bytes)", limit)
            }
            Mp4Error::InvalidRange { message } => write!(f, "invalid range: {}", message),
            Mp4Error::TruncatedInput { needed } => {
                write!(f, "input ended with {} bytes still needed", needed)
            }
        }
    }
}

impl Error for SeekError {}
impl Error for StreamError {}
impl Error for Mp4Error {}

// Conversion implementations
impl From<io::Error> for SeekError {
    fn from(err: io::Error) -> Self {
        SeekError::Other(err)
    }
}

impl From<StreamError> for SeekError {
    fn from(err: StreamError) -> Self {
        SeekError::Stream(err)
    }
}

impl From<Mp4Error> for SeekError {
    fn from(err: Mp4Error) -> Self {
        SeekError::Mp4(err)
    }
}

// Conversion to io::Error for callers driving plain std I/O
impl From<SeekError> for io::Error {
    fn from(err: SeekError) -> Self {
        io::Error::other(err)
    }
}

impl From<Mp4Error> for io::Error {
    fn from(err: Mp4Error) -> Self {
        io::Error::other(err)
    }
}

// Type alias for Result with SeekError
pub type SeekResult<T> = Result<T, SeekError>;
