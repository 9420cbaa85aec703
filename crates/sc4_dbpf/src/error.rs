//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::tgi::{Tgi, TgiKind};

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file is an invalid dbpf archive
    #[error("file is an invalid dbpf archive")]
    InvalidArchive(#[from] FormatError),

    /// qfs stream is corrupt
    #[error("qfs stream is corrupt")]
    CorruptStream(#[from] CorruptStreamError),

    /// unable to find requested entry
    #[error("unable to find requested entry")]
    EntryNotFound(#[from] EntryNotFoundError),

    /// entry {tgi} has an invalid body
    #[error("entry {tgi} has an invalid body")]
    InvalidPayload {
        /// Entry the body belongs to
        tgi: Tgi,
        /// What was wrong with it
        #[source]
        #[diagnostic_source]
        source: PayloadError,
    },

    /// encoding {kind} entries is not supported (entry {tgi})
    #[error("encoding {kind} entries is not supported (entry {tgi})")]
    Unsupported {
        /// Entry the operation was requested on
        tgi: Tgi,
        /// Classification of the entry
        kind: TgiKind,
    },

    /// {0} bytes is too large for a qfs stream
    #[error("{0} bytes is too large for a qfs stream")]
    TooLarge(usize),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Structural problems in the container header or index
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// identifier {0:?} is not DBPF
    #[error("identifier {0:?} is not DBPF")]
    BadMagic([u8; 4]),

    /// header field {field} is {found}, expected {expected}
    #[error("header field {field} is {found}, expected {expected}")]
    UnsupportedVersion {
        /// Name of the header field
        field: &'static str,
        /// The only supported value
        expected: u32,
        /// What the file contains
        found: u32,
    },

    /// index table at {offset:#x} (+{size:#x}) lies outside the file ({length:#x} bytes)
    #[error("index table at {offset:#x} (+{size:#x}) lies outside the file ({length:#x} bytes)")]
    IndexOutOfBounds {
        /// Declared index offset
        offset: u32,
        /// Declared index size
        size: u32,
        /// Length of the file
        length: u64,
    },

    /// index declares {count} entries but is only {size} bytes
    #[error("index declares {count} entries but is only {size} bytes")]
    IndexSizeMismatch {
        /// Declared entry count
        count: u32,
        /// Declared index size
        size: u32,
    },

    /// entry {tgi} at {offset:#x} (+{size:#x}) lies outside the file ({length:#x} bytes)
    #[error("entry {tgi} at {offset:#x} (+{size:#x}) lies outside the file ({length:#x} bytes)")]
    EntryOutOfBounds {
        /// Entry identity
        tgi: Tgi,
        /// Declared offset
        offset: u32,
        /// Declared size
        size: u32,
        /// Length of the file
        length: u64,
    },
}

/// Failures while expanding a QFS stream
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum CorruptStreamError {
    /// command at {position:#x} reads past the end of the source
    #[error("command at {position:#x} reads past the end of the source")]
    SourceOverrun {
        /// Offset of the command byte
        position: usize,
    },

    /// back reference of {offset} bytes at output position {position} points before the start
    #[error("back reference of {offset} bytes at output position {position} points before the start")]
    BackReferenceOutOfRange {
        /// Distance of the reference
        offset: usize,
        /// Output cursor when the reference was made
        position: usize,
    },

    /// command at {position:#x} writes past the declared size of {expected} bytes
    #[error("command at {position:#x} writes past the declared size of {expected} bytes")]
    OutputOverflow {
        /// Offset of the command byte
        position: usize,
        /// Declared decompressed size
        expected: usize,
    },

    /// decompressed {actual} bytes, expected {expected}
    #[error("decompressed {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// Declared decompressed size
        expected: usize,
        /// Bytes actually produced
        actual: usize,
    },
}

/// Failures reading the fixed part of an entry body
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// unknown body tag {0:?}
    #[error("unknown body tag {0:?}")]
    UnknownTag(String),

    /// body needs {needed} bytes but only has {available}
    #[error("body needs {needed} bytes but only has {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// {0}
    #[error("{0}")]
    Malformed(String),
}

/// Error type to provide further information when an entry has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested entry")]
pub enum EntryNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// with instance {0:#010x}
    #[error("with instance {0:#010x}")]
    Instance(u32),

    /// with tgi {0}
    #[error("with tgi {0}")]
    Tgi(Tgi),
}

/// Problems with the contents of an entry that leave the rest of it usable
///
/// These are never returned as errors. They are logged and collected on the entry so a
/// caller can inspect them after decoding.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum DataQualityError {
    /// required property {0:#010x} is missing
    #[error("required property {0:#010x} is missing")]
    MissingProperty(u32),

    /// property {0:#010x} appears more than once, keeping the first
    #[error("property {0:#010x} appears more than once, keeping the first")]
    DuplicateProperty(u32),

    /// property record {index} is unreadable: {reason}
    #[error("property record {index} is unreadable: {reason}")]
    UnreadableProperty {
        /// Position of the record in the body
        index: usize,
        /// Why it could not be read
        reason: String,
    },

    /// {0}
    #[error("{0}")]
    UndecodableText(String),

    /// {0} trailing bytes after the last record were ignored
    #[error("{0} trailing bytes after the last record were ignored")]
    TrailingBytes(usize),

    /// entry failed to decode: {0}
    #[error("entry failed to decode: {0}")]
    DecodeFailed(String),

    /// entry failed to encode: {0}
    #[error("entry failed to encode: {0}")]
    EncodeFailed(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
