use std::{io, path::PathBuf};

use thiserror::Error;

/// Fatal, per-artifact failure while decoding a class file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("class file truncated at offset {offset}")]
    Truncated { offset: usize },
    #[error("constant pool count must be at least 1")]
    EmptyConstantPool,
    #[error("invalid constant pool tag {tag} at index {index}")]
    InvalidConstantTag { tag: u8, index: u16 },
    #[error("constant pool index {index} is out of range")]
    BadConstantIndex { index: u16 },
    #[error("constant pool index {index} is the unusable second slot of a wide constant")]
    PhantomSlot { index: u16 },
    #[error("constant pool entry {index} is not a {expected} constant")]
    ConstantTypeMismatch { index: u16, expected: &'static str },
    #[error("constant pool entry {index} is not valid modified UTF-8")]
    InvalidUtf8 { index: u16 },
    #[error("attribute {name} does not fill its declared length of {declared} bytes")]
    AttributeLength { name: String, declared: u32 },
    #[error("invalid descriptor {0:?}")]
    InvalidDescriptor(String),
    #[error("{0} trailing bytes after the class file")]
    TrailingBytes(usize),
    #[error("malformed class file at offset {offset} ({kind})")]
    Malformed { offset: usize, kind: String },
}

/// Caller-facing failure when adding a library location.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("library location {0} does not exist")]
    NotFound(PathBuf),
    #[error("library location {path} is not readable")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not a readable archive")]
    InvalidArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("{path} is not a valid class file")]
    InvalidClassFile {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("library location {0} is already registered")]
    AlreadyRegistered(PathBuf),
}

/// I/O failure while materialising an entry of an already registered library.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
}

/// A declared signature or call site that does not read as `name(Type a, Type b)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed signature {0:?}")]
pub struct SignatureError(pub String);
