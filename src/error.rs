// Copyright (c) 2015-2021 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! Error objects and codes

use std::fmt;
use std::io;
use std::error;
use std::result;

#[derive(Clone, PartialEq, Debug)]
pub enum ErrorCode {
    /// Unsupported opcode
    Unsupported(char),
    /// PROTO announced a protocol we cannot read or write
    UnsupportedProtocol(u8),
    /// EOF while parsing op argument
    EOFWhileParsing,
    /// Stack underflowed
    StackUnderflow,
    /// No MARK found on the stack
    MarkNotFound,
    /// Length prefix found negative
    NegativeLength,
    /// String decoding as UTF-8 failed
    StringNotUTF8,
    /// Wrong stack top type for opcode
    InvalidStackTop(&'static str, String),
    /// Value not hashable, but used as dict key
    ValueNotHashable,
    /// Recursive structure found where a tree was required
    Recursive,
    /// A "module global" could not be resolved
    UnresolvedGlobal(String, String),
    /// EXT opcode with a code missing from the extension registry
    UnregisteredExtension(u32),
    /// A value was missing from the memo
    MissingMemo(u32),
    /// Invalid literal found
    InvalidLiteral(Vec<u8>),
    /// Found trailing bytes after STOP opcode
    TrailingBytes,
    /// Invalid value in pickle stream
    InvalidValue(String),
    /// BUILD applied to something that has no state
    BadBuildTarget(String),
    /// Persistent id found, but no persistent_load hook installed
    NoPersistentLoad,
    /// Object explicitly refuses to be pickled
    Unpickleable(String),
    /// Object cannot be reduced to something picklable
    Pickling(String),
    /// Nesting deeper than the configured maximum
    MaxDepthExceeded,
    /// Memo table cannot grow any further
    MemoTooLarge(usize),
    /// Malformed format specifier or template
    Format(String),
    /// Type code not valid for the formatted value
    UnknownFormatCode(char, &'static str),
    /// Malformed field name in a template
    FieldName(String),
    /// Unknown `!x` conversion in a template
    Conversion(char),
    /// Value or precision too large to format
    Overflow(String),
    /// Template field refers to a missing argument, item or attribute
    Lookup(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ErrorCode::Unsupported(ch) => write!(fmt, "unsupported opcode {:?}", ch),
            ErrorCode::UnsupportedProtocol(p) =>
                write!(fmt, "unsupported pickle protocol: {}", p),
            ErrorCode::EOFWhileParsing => write!(fmt, "EOF while parsing"),
            ErrorCode::StackUnderflow => write!(fmt, "pickle stack underflow"),
            ErrorCode::MarkNotFound => write!(fmt, "Inputstream corrupt, marker not found"),
            ErrorCode::NegativeLength => write!(fmt, "negative length prefix"),
            ErrorCode::StringNotUTF8 => write!(fmt, "string is not UTF-8 encoded"),
            ErrorCode::InvalidStackTop(what, ref it) =>
                write!(fmt, "invalid stack top, expected {}, got {}", what, it),
            ErrorCode::ValueNotHashable => write!(fmt, "dict key not hashable"),
            ErrorCode::Recursive => write!(fmt, "recursive structure found"),
            ErrorCode::UnresolvedGlobal(ref m, ref g) =>
                write!(fmt, "could not find global {}.{}", m, g),
            ErrorCode::UnregisteredExtension(code) =>
                write!(fmt, "unregistered extension code {}", code),
            ErrorCode::MissingMemo(n) => write!(fmt, "bad pickle get: missing memo with id {}", n),
            ErrorCode::InvalidLiteral(ref l) =>
                write!(fmt, "literal is invalid: {}", String::from_utf8_lossy(l)),
            ErrorCode::TrailingBytes => write!(fmt, "trailing bytes found"),
            ErrorCode::InvalidValue(ref s) => write!(fmt, "invalid value: {}", s),
            ErrorCode::BadBuildTarget(ref s) => write!(fmt, "bad BUILD target: {}", s),
            ErrorCode::NoPersistentLoad =>
                write!(fmt, "A load persistent id instruction was encountered, \
                             but no persistent_load function was specified."),
            ErrorCode::Unpickleable(ref s) => write!(fmt, "unpickleable object: {}", s),
            ErrorCode::Pickling(ref s) => fmt.write_str(s),
            ErrorCode::MaxDepthExceeded => write!(fmt, "maximum recursion depth exceeded"),
            ErrorCode::MemoTooLarge(n) => write!(fmt, "can't make hashtable of size: {}", n),
            ErrorCode::Format(ref s) => fmt.write_str(s),
            ErrorCode::UnknownFormatCode(c, ty) =>
                write!(fmt, "Unknown format code '{}' for object of type '{}'", c, ty),
            ErrorCode::FieldName(ref s) => fmt.write_str(s),
            ErrorCode::Conversion(c) => write!(fmt, "Unknown conversion specifier {}", c),
            ErrorCode::Overflow(ref s) => fmt.write_str(s),
            ErrorCode::Lookup(ref s) => fmt.write_str(s),
        }
    }
}

/// This type represents all possible errors that can occur when pickling,
/// unpickling or formatting.
#[derive(Debug)]
pub enum Error {
    /// Some IO error occurred when writing or reading a stream.
    Io(io::Error),
    /// The pickle had some error while interpreting, at the given offset.
    Eval(ErrorCode, usize),
    /// An object could not be pickled.
    Pickle(ErrorCode),
    /// A format specifier, template or formatted value was rejected.
    Format(ErrorCode),
    /// An object graph could not be built or converted.
    Syntax(ErrorCode),
}

/// Coarse classification of an [`Error`], mirroring the exception kinds a
/// host runtime raises for it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    Io,
    Eof,
    Format,
    FieldName,
    Overflow,
    Lookup,
    Pickling,
    Unpickleable,
    Unpickling,
    BadMemoReference,
    Depth,
    Value,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::Io(ref err) if err.kind() == io::ErrorKind::UnexpectedEof => ErrorKind::Eof,
            Error::Io(_) => ErrorKind::Io,
            Error::Eval(ref code, _) => match *code {
                ErrorCode::EOFWhileParsing => ErrorKind::Eof,
                ErrorCode::MissingMemo(_) => ErrorKind::BadMemoReference,
                ErrorCode::MaxDepthExceeded => ErrorKind::Depth,
                _ => ErrorKind::Unpickling,
            },
            Error::Pickle(ref code) => match *code {
                ErrorCode::Unpickleable(_) => ErrorKind::Unpickleable,
                ErrorCode::MaxDepthExceeded => ErrorKind::Depth,
                _ => ErrorKind::Pickling,
            },
            Error::Format(ref code) => match *code {
                ErrorCode::FieldName(_) => ErrorKind::FieldName,
                ErrorCode::Overflow(_) => ErrorKind::Overflow,
                ErrorCode::Lookup(_) => ErrorKind::Lookup,
                _ => ErrorKind::Format,
            },
            Error::Syntax(_) => ErrorKind::Value,
        }
    }

    /// The error code, if this is not an I/O error.
    pub fn code(&self) -> Option<&ErrorCode> {
        match *self {
            Error::Io(_) => None,
            Error::Eval(ref code, _) | Error::Pickle(ref code) |
            Error::Format(ref code) | Error::Syntax(ref code) => Some(code),
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

pub type Result<T> = result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref error) => error.fmt(fmt),
            Error::Eval(ref code, offset) => write!(fmt, "eval error at offset {}: {}",
                                                    offset, code),
            Error::Pickle(ref code) => write!(fmt, "pickling error: {}", code),
            Error::Format(ref code) => code.fmt(fmt),
            Error::Syntax(ref code) => write!(fmt, "decoding error: {}", code)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}
