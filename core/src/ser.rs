// Copyright 2016 The Grin Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Serialization and deserialization layer specialized for the binary
//! wire formats in §6: fixed-width header fields plus varint-prefixed
//! vectors (Bitcoin's "CompactSize" encoding).

use std::io::{self, Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;

/// Errors deriving from serializing or deserializing.
#[derive(Debug, Fail)]
pub enum Error {
	/// Wraps an io error produced when reading or writing.
	#[fail(display = "IO error: {}", _0)]
	IOErr(String),
	/// Data wasn't in a consumable format.
	#[fail(display = "corrupted data: {}", _0)]
	CorruptedData(String),
	/// A length prefix (varint, vector count, ...) exceeded a sanity bound.
	#[fail(display = "oversized read: {}", _0)]
	TooLarge(String),
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::IOErr(e.to_string())
	}
}

/// Implemented by types that serialize to the wire format.
pub trait Writeable {
	/// Write `self` to `writer`.
	fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error>;
}

/// Implemented by types that deserialize from the wire format.
pub trait Readable: Sized {
	/// Read an instance of `Self` from `reader`.
	fn read<R: Read>(reader: &mut R) -> Result<Self, Error>;
}

/// Serializes a `Writeable` into a freshly allocated `Vec<u8>`.
pub fn ser_vec<W: Writeable>(thing: &W) -> Result<Vec<u8>, Error> {
	let mut vec = Vec::new();
	thing.write(&mut vec)?;
	Ok(vec)
}

/// Deserializes a `Readable` from a byte slice.
pub fn deserialize<R: Readable>(bytes: &[u8]) -> Result<R, Error> {
	let mut cursor = bytes;
	R::read(&mut cursor)
}

/// Maximum length accepted for any varint-prefixed vector. Pure DoS
/// protection; no format on the wire is anywhere near this size.
pub const MAX_VARINT_VEC_LEN: u64 = 10_000_000;

/// Reads a Bitcoin-style CompactSize varint.
pub fn read_varint<R: Read>(reader: &mut R) -> Result<u64, Error> {
	let first = reader.read_u8()?;
	let value = match first {
		0xff => reader.read_u64::<LittleEndian>()?,
		0xfe => reader.read_u32::<LittleEndian>()? as u64,
		0xfd => reader.read_u16::<LittleEndian>()? as u64,
		n => n as u64,
	};
	if value > MAX_VARINT_VEC_LEN {
		return Err(Error::TooLarge(format!("varint {} exceeds sanity bound", value)));
	}
	Ok(value)
}

/// Writes a Bitcoin-style CompactSize varint.
pub fn write_varint<W: Write>(writer: &mut W, value: u64) -> Result<(), Error> {
	if value < 0xfd {
		writer.write_u8(value as u8)?;
	} else if value <= u16::MAX as u64 {
		writer.write_u8(0xfd)?;
		writer.write_u16::<LittleEndian>(value as u16)?;
	} else if value <= u32::MAX as u64 {
		writer.write_u8(0xfe)?;
		writer.write_u32::<LittleEndian>(value as u32)?;
	} else {
		writer.write_u8(0xff)?;
		writer.write_u64::<LittleEndian>(value)?;
	}
	Ok(())
}

/// Reads exactly 32 bytes into a fixed array (used for hashes).
pub fn read_hash_bytes<R: Read>(reader: &mut R) -> Result<[u8; 32], Error> {
	let mut buf = [0u8; 32];
	reader.read_exact(&mut buf)?;
	Ok(buf)
}

/// Reads a varint-prefixed byte vector, bounded by `MAX_VARINT_VEC_LEN`.
pub fn read_vec<R: Read>(reader: &mut R) -> Result<Vec<u8>, Error> {
	let len = read_varint(reader)?;
	let mut buf = vec![0u8; len as usize];
	reader.read_exact(&mut buf)?;
	Ok(buf)
}

/// Writes a varint-prefixed byte vector.
pub fn write_vec<W: Write>(writer: &mut W, data: &[u8]) -> Result<(), Error> {
	write_varint(writer, data.len() as u64)?;
	writer.write_all(data)?;
	Ok(())
}

/// Convenience re-export so callers of this module don't need byteorder
/// directly for the rare big-endian field.
pub fn read_u32_be<R: Read>(reader: &mut R) -> Result<u32, Error> {
	Ok(reader.read_u32::<BigEndian>()?)
}
