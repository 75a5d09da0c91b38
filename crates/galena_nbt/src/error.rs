use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur when encoding or decoding NBT data.
#[derive(Debug)]
pub struct Error {
    /// Box this to keep the size of `Result<T, Error>` small.
    cause: Box<Cause>,
}

#[derive(Debug)]
enum Cause {
    Io(io::Error),
    Owned(Box<str>),
    Static(&'static str),
    /// A tag byte that does not name any NBT type.
    UnknownTag(u8),
    /// A compound entry with no matching field in the target, under strict
    /// decoding.
    UnknownField(Box<str>),
    /// A required field with no matching compound entry.
    MissingField(Box<str>),
}

impl Error {
    pub(crate) fn new_owned(msg: impl Into<Box<str>>) -> Self {
        Self {
            cause: Box::new(Cause::Owned(msg.into())),
        }
    }

    pub(crate) fn new_static(msg: &'static str) -> Self {
        Self {
            cause: Box::new(Cause::Static(msg)),
        }
    }

    pub fn unknown_tag(byte: u8) -> Self {
        Self {
            cause: Box::new(Cause::UnknownTag(byte)),
        }
    }

    pub fn unknown_field(name: impl Into<Box<str>>) -> Self {
        Self {
            cause: Box::new(Cause::UnknownField(name.into())),
        }
    }

    pub fn missing_field(name: impl Into<Box<str>>) -> Self {
        Self {
            cause: Box::new(Cause::MissingField(name.into())),
        }
    }

    pub fn is_unknown_tag(&self) -> bool {
        matches!(*self.cause, Cause::UnknownTag(_))
    }

    pub fn is_unknown_field(&self) -> bool {
        matches!(*self.cause, Cause::UnknownField(_))
    }

    pub fn is_missing_field(&self) -> bool {
        matches!(*self.cause, Cause::MissingField(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &*self.cause {
            Cause::Io(e) => e.fmt(f),
            Cause::Owned(msg) => write!(f, "{msg}"),
            Cause::Static(msg) => write!(f, "{msg}"),
            Cause::UnknownTag(byte) => write!(f, "invalid tag byte of {byte:#x}"),
            Cause::UnknownField(name) => write!(f, "compound entry `{name}` matches no field"),
            Cause::MissingField(name) => write!(f, "missing compound entry for field `{name}`"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &*self.cause {
            Cause::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self {
            cause: Box::new(Cause::Io(e)),
        }
    }
}
