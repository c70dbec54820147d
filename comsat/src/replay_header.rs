//! Replay header stored in the user data of `.SC2Replay` archives
//!
//! The blob is a serialized value tree. Every value starts with a type byte;
//! integers are variable length with the sign in the lowest bit, and structs
//! map numeric field tags to values. The header struct holds the signature
//! (tag 0), the game version (tag 1), the replay type (tag 2) and the game
//! length in game loops (tag 3).

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read};
use thiserror::Error;

/// Game loops per second of game time at Normal speed
pub const GAME_LOOPS_PER_SECOND: u64 = 16;

/// Deepest nesting accepted while decoding
const MAX_DEPTH: usize = 32;

mod kind {
    pub(super) const ARRAY: u8 = 0x00;
    pub(super) const BIT_BLOB: u8 = 0x01;
    pub(super) const BLOB: u8 = 0x02;
    pub(super) const CHOICE: u8 = 0x03;
    pub(super) const OPTIONAL: u8 = 0x04;
    pub(super) const STRUCT: u8 = 0x05;
    pub(super) const U8: u8 = 0x06;
    pub(super) const U32: u8 = 0x07;
    pub(super) const U64: u8 = 0x08;
    pub(super) const VINT: u8 = 0x09;
}

/// Errors raised while decoding a replay header
#[derive(Error, Debug)]
pub enum HeaderError {
    /// The blob ended inside a value
    #[error("Replay header ends early at offset {0}")]
    Truncated(u64),

    /// A type byte that names no known value type
    #[error("Unknown value type 0x{kind:02X} at offset {offset}")]
    UnknownType {
        /// The type byte
        kind: u8,
        /// Offset of the type byte
        offset: u64,
    },

    /// An integer wider than 64 bits
    #[error("Integer at offset {0} does not fit in 64 bits")]
    Overflow(u64),

    /// Values nested deeper than the decoder follows
    #[error("Values nested deeper than {MAX_DEPTH} levels")]
    TooDeep,

    /// A header field is absent or holds the wrong kind of value
    #[error("Replay header field {0} is missing or malformed")]
    Field(&'static str),
}

type Result<T> = std::result::Result<T, HeaderError>;

/// One decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Sequence of values
    Array(Vec<Value>),
    /// Bit field of the given length in bits
    BitBlob(u64, Vec<u8>),
    /// Raw bytes
    Blob(Vec<u8>),
    /// Tagged union member
    Choice(u64, Box<Value>),
    /// Value that may be absent
    Optional(Option<Box<Value>>),
    /// Fields keyed by their tag
    Struct(BTreeMap<u64, Value>),
    /// Any integer type
    Int(i64),
}

impl Value {
    /// Field `tag` of a struct
    pub fn field(&self, tag: u64) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.get(&tag),
            _ => None,
        }
    }

    /// The integer held by this value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The bytes held by a blob
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Decode the first value of `data`
pub fn decode_value(data: &[u8]) -> Result<Value> {
    Decoder {
        cursor: Cursor::new(data),
    }
    .value(0)
}

struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl Decoder<'_> {
    fn remaining(&self) -> u64 {
        self.cursor.get_ref().len() as u64 - self.cursor.position()
    }

    fn truncated(&self) -> HeaderError {
        HeaderError::Truncated(self.cursor.position())
    }

    fn u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| self.truncated())
    }

    fn bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        if len > self.remaining() {
            return Err(self.truncated());
        }
        let mut buf = vec![0u8; len as usize];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| self.truncated())?;
        Ok(buf)
    }

    fn vint(&mut self) -> Result<i64> {
        let start = self.cursor.position();
        let mut raw = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8()?;
            let part = (byte & 0x7F) as u64;
            if shift >= 64 || (part << shift) >> shift != part {
                return Err(HeaderError::Overflow(start));
            }
            raw |= part << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                break;
            }
        }

        let magnitude = (raw >> 1) as i64;
        Ok(if raw & 1 == 1 { -magnitude } else { magnitude })
    }

    /// A non-negative integer used as a length or tag
    fn count(&mut self) -> Result<u64> {
        let start = self.cursor.position();
        u64::try_from(self.vint()?).map_err(|_| HeaderError::Overflow(start))
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(HeaderError::TooDeep);
        }

        let offset = self.cursor.position();
        let value = match self.u8()? {
            kind::ARRAY => {
                let len = self.count()?;
                // Every element takes at least one byte
                if len > self.remaining() {
                    return Err(self.truncated());
                }
                let mut items = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    items.push(self.value(depth + 1)?);
                }
                Value::Array(items)
            }
            kind::BIT_BLOB => {
                let bits = self.count()?;
                Value::BitBlob(bits, self.bytes(bits.div_ceil(8))?)
            }
            kind::BLOB => {
                let len = self.count()?;
                Value::Blob(self.bytes(len)?)
            }
            kind::CHOICE => {
                let tag = self.count()?;
                Value::Choice(tag, Box::new(self.value(depth + 1)?))
            }
            kind::OPTIONAL => {
                if self.u8()? == 0 {
                    Value::Optional(None)
                } else {
                    Value::Optional(Some(Box::new(self.value(depth + 1)?)))
                }
            }
            kind::STRUCT => {
                let len = self.count()?;
                let mut fields = BTreeMap::new();
                for _ in 0..len {
                    let tag = self.count()?;
                    fields.insert(tag, self.value(depth + 1)?);
                }
                Value::Struct(fields)
            }
            kind::U8 => Value::Int(self.u8()? as i64),
            kind::U32 => Value::Int(
                self.cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|_| self.truncated())? as i64,
            ),
            kind::U64 => {
                let n = self
                    .cursor
                    .read_u64::<LittleEndian>()
                    .map_err(|_| self.truncated())?;
                Value::Int(i64::try_from(n).map_err(|_| HeaderError::Overflow(offset))?)
            }
            kind::VINT => Value::Int(self.vint()?),
            other => return Err(HeaderError::UnknownType { kind: other, offset }),
        };
        Ok(value)
    }
}

/// Game version a replay was recorded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameVersion {
    /// Version flags
    pub flags: i64,
    /// Major version
    pub major: i64,
    /// Minor version
    pub minor: i64,
    /// Patch level
    pub patch: i64,
    /// Base build number
    pub build: i64,
    /// Data build number, absent in some early replays
    pub data_build: Option<i64>,
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.patch, self.build)
    }
}

/// Decoded replay header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayHeader {
    /// Signature text, `StarCraft II replay\x1b11`
    pub signature: String,
    /// Game version
    pub version: GameVersion,
    /// Replay type
    pub replay_type: Option<i64>,
    /// Game length in game loops
    pub elapsed_game_loops: u64,
}

impl ReplayHeader {
    /// Decode the header from a replay's user data content
    pub fn parse(data: &[u8]) -> Result<Self> {
        let root = decode_value(data)?;

        let signature = root
            .field(0)
            .and_then(Value::as_blob)
            .ok_or(HeaderError::Field("signature"))?;
        let version = root.field(1).ok_or(HeaderError::Field("version"))?;
        let version_field = |tag: u64, name: &'static str| {
            version
                .field(tag)
                .and_then(Value::as_int)
                .ok_or(HeaderError::Field(name))
        };
        let elapsed_game_loops = root
            .field(3)
            .and_then(Value::as_int)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or(HeaderError::Field("game length"))?;

        Ok(ReplayHeader {
            signature: String::from_utf8_lossy(signature).into_owned(),
            version: GameVersion {
                flags: version_field(0, "version flags")?,
                major: version_field(1, "major version")?,
                minor: version_field(2, "minor version")?,
                patch: version_field(3, "patch version")?,
                build: version_field(4, "build")?,
                data_build: version.field(5).and_then(Value::as_int),
            },
            replay_type: root.field(2).and_then(Value::as_int),
            elapsed_game_loops,
        })
    }

    /// Game length in seconds of game time
    pub fn game_seconds(&self) -> u64 {
        self.elapsed_game_loops / GAME_LOOPS_PER_SECOND
    }

    /// Game length as `m:ss`
    pub fn game_length(&self) -> String {
        let seconds = self.game_seconds();
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }
}
