use std::io;

/// Failures of the loose-object database.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object {0} not found")]
    NotFound(String),

    #[error("malformed object header: {0}")]
    MalformedHeader(String),

    #[error("object is {actual} bytes, header says {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("decompression failed: {0}")]
    Decompression(io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures while parsing tree or commit payloads.
#[derive(Debug, thiserror::Error)]
#[error("malformed {kind} object: {reason}")]
pub struct ParseError {
    pub kind: &'static str,
    pub reason: String,
}

impl ParseError {
    pub fn tree(reason: impl Into<String>) -> Self {
        Self {
            kind: "tree",
            reason: reason.into(),
        }
    }

    pub fn commit(reason: impl Into<String>) -> Self {
        Self {
            kind: "commit",
            reason: reason.into(),
        }
    }
}

/// Failures of the packfile reader.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("bad pack signature")]
    BadMagic,

    #[error("unsupported pack version {0}")]
    UnsupportedVersion(u32),

    #[error("OBJ_OFS_DELTA records are not supported")]
    UnsupportedDeltaForm,

    #[error("unknown pack object type {0}")]
    UnknownType(u8),

    #[error("truncated pack: {0}")]
    Truncated(&'static str),

    #[error("object size varint overflows a usize")]
    OversizedVarint,

    #[error("inflated record is {actual} bytes, header says {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("decompression failed: {0}")]
    Decompression(io::Error),

    #[error("trailing data after pack checksum")]
    CountMismatch,

    #[error("pack checksum mismatch: computed {computed}, stored {stored}")]
    TrailerMismatch { computed: String, stored: String },

    #[error("delta base {0} not present in pack or store")]
    MissingBase(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures while applying a REF_DELTA instruction stream.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    #[error("delta source size is {declared}, base object is {actual} bytes")]
    SourceSizeMismatch { declared: usize, actual: usize },

    #[error("applied delta is {actual} bytes, declared target size is {declared}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("copy range {offset}..{end} is outside the base object")]
    CopyOutOfRange { offset: usize, end: usize },

    #[error("reserved zero-length insert instruction")]
    ZeroInsert,

    #[error("truncated delta: {0}")]
    Truncated(&'static str),

    #[error("varint overflow reading the {0}")]
    Oversized(&'static str),
}
