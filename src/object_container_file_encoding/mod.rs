//! Support for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
//!
//! This is typically what you want when reading/writing avro files with
//! multiple objects.
//!
//! A file is made of:
//! - a header: the `Obj1` magic, a `map<bytes>` of metadata (that holds the
//!   schema and the codec), and a random 16-byte sync marker
//! - any number of blocks: a record count, the byte size of the (possibly
//!   compressed) block, the encoded records, and the sync marker again
//!
//! See [`Reader`] and [`Writer`] documentations for their respective examples.

mod reader;
mod writer;

pub use {reader::*, writer::*};

use crate::{
	de::{read::ReaderRead, DeserializerState},
	schema::{Map, RegularType, Schema, SchemaKey, SchemaNode},
	Error, ErrorKind, Value,
};

use std::{io::BufRead, num::NonZeroU8, sync::Arc, sync::OnceLock};

/// Specifies the compression codec and level to be used for the data blocks
/// in the file.
///
/// Variants may be made available by enabling features.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Compression {
	/// The `Null` codec simply passes through data uncompressed.
	Null,
	#[cfg(feature = "deflate")]
	/// The `Deflate` codec writes the data block using the deflate algorithm
	/// as specified in RFC 1951. Note that this format (unlike the "zlib
	/// format" in RFC 1950) does not have a checksum.
	Deflate {
		/// Deflate compression level to use (1-9 or
		/// [`CompressionLevel::default()`])
		level: CompressionLevel,
	},
	#[cfg(feature = "snappy")]
	/// The `Snappy` codec uses Google's [Snappy](http://google.github.io/snappy/)
	/// compression algorithm. Each compressed block is followed by the 4-byte,
	/// big-endian CRC32 checksum of the uncompressed data in the block.
	Snappy,
}

/// Compression level to use for the compression algorithm
///
/// You may either specify a given number (1-9) or use the default compression
/// level.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompressionLevel {
	repr: NonZeroU8,
}
impl CompressionLevel {
	/// Specifies the compression level that will be used for the compression
	/// algorithms
	///
	/// # Default value
	/// All algorithms have a default compression level configured
	/// that may be used by instantiating [`CompressionLevel::default()`].
	///
	/// # Clipping
	/// Depending on the algorithm that will be used, `level` may get clipped
	/// into the appropriate range (e.g. set to `9` if higher than `9`).
	///
	/// # Panics
	/// If `level` is lower than `1`
	///
	/// Compression level 0 means "actually don't compress" for most
	/// algorithms, and in that case one should just use [`Compression::Null`]
	/// instead.
	pub const fn new(mut level: u8) -> Self {
		if level == u8::MAX {
			level -= 1;
		}
		match NonZeroU8::new(level) {
			Some(n) => Self { repr: n },
			None => panic!("Compression level must be greater than 0"),
		}
	}

	/// Use the default compression level of the considered algorithm
	pub const fn default() -> Self {
		Self {
			repr: match NonZeroU8::new(u8::MAX) {
				Some(nonzero) => nonzero,
				None => unreachable!(),
			},
		}
	}

	#[allow(unused)]
	/// may be unused depending on which compression codecs features are enabled
	fn clip(mut self, high: u8) -> Self {
		if let (true, Some(high)) = (self.repr.get() != u8::MAX, NonZeroU8::new(high)) {
			self.repr = self.repr.min(high);
		}
		self
	}

	#[allow(unused)]
	/// may be unused depending on which compression codecs features are enabled
	fn instantiate<T: Default, C: From<u8>, F: FnOnce(C) -> T>(self, f: F) -> T {
		match self.repr.get() {
			u8::MAX => T::default(),
			specified_compression_level => f(specified_compression_level.into()),
		}
	}
}
impl Default for CompressionLevel {
	fn default() -> Self {
		CompressionLevel::default()
	}
}
impl std::fmt::Debug for CompressionLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.repr.get() {
			u8::MAX => write!(f, "Default"),
			_ => write!(f, "{}", self.repr),
		}
	}
}

impl Compression {
	/// The codec that will be advertised in the header of the file
	pub fn codec(&self) -> CompressionCodec {
		match self {
			Compression::Null => CompressionCodec::Null,
			#[cfg(feature = "deflate")]
			Compression::Deflate { .. } => CompressionCodec::Deflate,
			#[cfg(feature = "snappy")]
			Compression::Snappy => CompressionCodec::Snappy,
		}
	}

	/// The compression for a codec, with the default level
	///
	/// Fails if support for the codec is not enabled.
	pub fn from_codec(codec: CompressionCodec) -> Result<Self, Error> {
		Ok(match codec {
			CompressionCodec::Null => Compression::Null,
			#[cfg(feature = "deflate")]
			CompressionCodec::Deflate => Compression::Deflate {
				level: CompressionLevel::default(),
			},
			#[cfg(feature = "snappy")]
			CompressionCodec::Snappy => Compression::Snappy,
			#[allow(unreachable_patterns)]
			unavailable => return Err(unavailable.not_enabled()),
		})
	}
}

/// The compression codec used to compress blocks, as named in the header of
/// the file
///
/// This lists every codec that may be encountered in a file, regardless of
/// whether support for it is enabled.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde_derive::Deserialize, serde_derive::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionCodec {
	/// The `Null` codec simply passes through data uncompressed.
	Null,
	/// The `Deflate` codec writes the data block using the deflate algorithm
	/// as specified in RFC 1951. Requires the `deflate` feature.
	Deflate,
	/// The `Snappy` codec uses Google's [Snappy](http://google.github.io/snappy/)
	/// compression algorithm, followed by the CRC32 of the uncompressed data.
	/// Requires the `snappy` feature.
	Snappy,
}

impl CompressionCodec {
	/// The name of the codec, as written in the `avro.codec` metadata
	pub fn as_str(self) -> &'static str {
		match self {
			CompressionCodec::Null => "null",
			CompressionCodec::Deflate => "deflate",
			CompressionCodec::Snappy => "snappy",
		}
	}

	#[allow(unused)]
	/// may be unused depending on which compression codecs features are enabled
	fn not_enabled(self) -> Error {
		Error::custom(
			ErrorKind::Data,
			format_args!(
				"The {} codec requires the `{}` feature of this crate, which is not enabled",
				self.as_str(),
				match self {
					CompressionCodec::Null => "default",
					CompressionCodec::Deflate => "deflate",
					CompressionCodec::Snappy => "snappy",
				}
			),
		)
	}
}

impl std::fmt::Display for CompressionCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for CompressionCodec {
	type Err = Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		serde_json::from_value(serde_json::Value::String(s.to_owned())).map_err(|_| {
			Error::custom(
				ErrorKind::Data,
				format_args!("Unsupported codec in object container file: {s:?}"),
			)
		})
	}
}

const HEADER_CONST: [u8; 4] = [b'O', b'b', b'j', 1u8];

const SCHEMA_KEY: &str = "avro.schema";
const CODEC_KEY: &str = "avro.codec";
const RESERVED_KEY_PREFIX: &str = "avro.";

/// The schema of the header metadata: `{"type": "map", "values": "bytes"}`
fn metadata_schema() -> &'static Schema {
	static METADATA_SCHEMA: OnceLock<Schema> = OnceLock::new();
	METADATA_SCHEMA.get_or_init(|| Schema {
		nodes: vec![
			SchemaNode::new(Map::new(SchemaKey::from_idx(1))),
			SchemaNode::new(RegularType::Bytes),
		],
		json: r#"{"type":"map","values":"bytes"}"#.to_owned(),
	})
}

/// What the header of a file tells about the blocks that follow it
struct Header {
	schema: Arc<Schema>,
	codec: CompressionCodec,
	sync_marker: [u8; 16],
	user_metadata: Vec<(String, Vec<u8>)>,
}

/// Read the header of a file, leaving `reader` positioned on its first block
fn read_header<R: BufRead>(reader: &mut R) -> Result<Header, Error> {
	let mut reader = ReaderRead::new(reader);
	let magic: [u8; 4] = crate::de::read::Read::read_const_size_buf(&mut reader).map_err(|_| {
		Error::new(
			ErrorKind::Data,
			"Not an avro object container file (too short to hold the header)",
		)
	})?;
	if magic != HEADER_CONST {
		return Err(Error::new(
			ErrorKind::Data,
			"Not an avro object container file (magic bytes don't match)",
		));
	}

	let mut header_deserializer_state = DeserializerState::new(reader, metadata_schema());
	let entries = match header_deserializer_state.deserialize()? {
		Value::Map(entries) => entries,
		_ => return Err(Error::data("Object container file header metadata is not a map")),
	};
	let mut reader = header_deserializer_state.into_reader();

	let mut schema = None;
	let mut codec = CompressionCodec::Null;
	let mut user_metadata = Vec::new();
	for (key, value) in entries {
		let Value::Bytes(value) = value else {
			return Err(Error::data("Object container file header metadata value is not bytes"));
		};
		match key.as_str() {
			SCHEMA_KEY => {
				let json = std::str::from_utf8(&value).map_err(|e| {
					Error::custom(
						ErrorKind::Data,
						format_args!("Schema in object container file header is not UTF-8: {e}"),
					)
				})?;
				schema = Some(json.parse::<Schema>()?);
			}
			CODEC_KEY => {
				codec = std::str::from_utf8(&value)
					.map_err(|_| Error::data("Codec in object container file header is not UTF-8"))?
					.parse()?;
			}
			_ => user_metadata.push((key, value)),
		}
	}
	let schema = schema.ok_or_else(|| {
		Error::new(
			ErrorKind::Data,
			"Object container file header has no avro.schema metadata",
		)
	})?;

	let sync_marker: [u8; 16] = crate::de::read::Read::read_const_size_buf(&mut reader)?;

	Ok(Header {
		schema: Arc::new(schema),
		codec,
		sync_marker,
		user_metadata,
	})
}
