use std::path::PathBuf;

use thiserror::Error;

/// Why a matched span could not be treated as a string record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordFault {
    /// No NUL byte precedes the match before the start of the body.
    #[error("no string start before match")]
    UnboundedStart,

    /// No NUL terminator follows the match before the end of the body.
    #[error("no string terminator after match")]
    UnboundedEnd,

    /// The record starts too close to the body start to hold a tag and length.
    #[error("no room for type tag and length")]
    MissingTypeTag,

    #[error("type tag is {0:#04x}, expected 0x04")]
    TypeTag(u8),

    #[error("length prefix is {declared}, expected {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("content is not valid UTF-8")]
    NotUtf8,
}

/// Errors raised while loading or patching a bytecode file.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("this is not a Lua file (signature {found:02x?})")]
    NotLuaFile { found: Vec<u8> },

    #[error("header truncated after {len} bytes")]
    TruncatedHeader { len: usize },

    #[error("Lua file not compatible with PUC-Rio (format byte {reserved:#04x})")]
    UnsupportedVersion { reserved: u8 },

    #[error("Lua file is big endian (flag {flag}), not supported")]
    UnsupportedEndianness { flag: u8 },

    #[error("failed to parse Lua string structure at offset {offset}: {fault}")]
    MalformedRecord { offset: usize, fault: RecordFault },

    #[error("find string must not be empty")]
    EmptyFind,
}

pub type Result<T> = std::result::Result<T, PatchError>;
