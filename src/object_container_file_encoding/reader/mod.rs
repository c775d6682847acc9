mod decompression;

use crate::{
	de::{
		read::{Read as _, ReaderRead, SliceRead},
		DeserializerConfig, DeserializerState,
	},
	Error, ErrorKind, Schema, Value,
};

use super::{read_header, CompressionCodec, Header};

use std::{
	io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom},
	sync::Arc,
};

/// Reader for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// Iterating over the `Reader` yields the values of the file, in the order
/// they were written.
///
/// # Example
/// ```
/// use avro_dynamic::{
/// 	object_container_file_encoding::{Compression, Reader, WriterBuilder},
/// 	Schema, Value,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema: Schema = r#"["null", "string"]"#.parse()?;
///
/// let mut writer = WriterBuilder::new(schema)
/// 	.compression(Compression::Null)
/// 	.user_metadata("origin", "doc-test")
/// 	.build(Vec::new())?;
/// writer.append(&Value::Null)?;
/// writer.append(&"hello".into())?;
/// let file = writer.into_inner()?;
///
/// let mut reader = Reader::from_slice(&file)?;
/// assert_eq!(reader.user_metadata("origin"), Some(&b"doc-test"[..]));
/// assert_eq!(
/// 	reader.by_ref().collect::<Result<Vec<_>, _>>()?,
/// 	[Value::Null, Value::String("hello".to_owned())]
/// );
///
/// // The values may be read again from the start
/// reader.rewind()?;
/// assert_eq!(reader.count(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Reader<R> {
	reader: R,
	header: Header,
	reader_schema: Option<Arc<Schema>>,
	reader_state: ReaderState,
	/// Decompressed content of the current block
	block: Vec<u8>,
	/// Raw content of the current block, kept around to reuse its allocation
	compressed_block: Vec<u8>,
	/// Once we have yielded an error we can't recover from, we pretend we have
	/// reached the end of the file so that `collect` & co. stop there.
	pretend_eof_because_yielded_unrecoverable_error: bool,
}

enum ReaderState {
	Broken,
	NotInBlock,
	InBlock {
		n_objects_in_block: usize,
		position: usize,
	},
}

impl<'a> Reader<Cursor<&'a [u8]>> {
	/// Read an object container file from a slice
	pub fn from_slice(slice: &'a [u8]) -> Result<Self, Error> {
		Self::new(Cursor::new(slice))
	}
}

impl<R: Read + Seek> Reader<BufReader<R>> {
	/// Read an object container file from an
	/// [`impl Read + Seek`](std::io::Read) (e.g. a [`File`](std::fs::File))
	///
	/// This wraps it in a [`BufReader`]: prefer [`Reader::new`] if it already
	/// implements [`BufRead`].
	pub fn from_reader(reader: R) -> Result<Self, Error> {
		Self::new(BufReader::new(reader))
	}
}

impl<R: BufRead + Seek> Reader<R> {
	/// Read an object container file from an
	/// [`impl BufRead + Seek`](std::io::BufRead)
	///
	/// `reader` is moved back to its start, then the header is read right
	/// away.
	pub fn new(mut reader: R) -> Result<Self, Error> {
		reader.seek(SeekFrom::Start(0)).map_err(Error::io)?;
		let header = read_header(&mut reader)?;
		log::debug!(
			"Read object container file header (schema: {}, codec: {}, {} user metadata entries)",
			header.schema.root().type_,
			header.codec,
			header.user_metadata.len()
		);
		Ok(Self {
			reader,
			header,
			reader_schema: None,
			reader_state: ReaderState::NotInBlock,
			block: Vec::new(),
			compressed_block: Vec::new(),
			pretend_eof_because_yielded_unrecoverable_error: false,
		})
	}

	/// Project every value onto `reader_schema` (using schema resolution)
	/// instead of yielding them as written
	///
	/// Values that can't be resolved yield an [`ErrorKind::SchemaMismatch`]
	/// error.
	pub fn with_reader_schema(mut self, reader_schema: impl Into<Arc<Schema>>) -> Self {
		self.reader_schema = Some(reader_schema.into());
		self
	}

	/// Go back to the first block of the file
	///
	/// The header is read again, so this also recovers from errors that
	/// occurred while reading blocks.
	pub fn rewind(&mut self) -> Result<(), Error> {
		self.reader.seek(SeekFrom::Start(0)).map_err(Error::io)?;
		self.header = read_header(&mut self.reader)?;
		self.reader_state = ReaderState::NotInBlock;
		self.pretend_eof_because_yielded_unrecoverable_error = false;
		Ok(())
	}

	fn next_value(&mut self) -> Result<Option<Value>, Error> {
		loop {
			match self.reader_state {
				ReaderState::Broken => {
					return Err(Error::new(
						ErrorKind::Data,
						"Reader is broken after a previous error",
					))
				}
				ReaderState::NotInBlock => {
					if !self.read_block()? {
						return Ok(None);
					}
				}
				ReaderState::InBlock {
					n_objects_in_block: 0,
					position,
				} => {
					if position != self.block.len() {
						return Err(Error::custom(
							ErrorKind::Data,
							format_args!(
								"Block has {} trailing bytes after its last object",
								self.block.len() - position
							),
						));
					}
					self.reader_state = ReaderState::NotInBlock;
				}
				ReaderState::InBlock {
					ref mut n_objects_in_block,
					ref mut position,
				} => {
					let slice_read = SliceRead::new(&self.block[*position..]);
					let mut deserializer_state = DeserializerState::with_config(
						slice_read,
						DeserializerConfig::new(&self.header.schema),
					);
					let value = match self.reader_schema {
						None => deserializer_state.deserialize()?,
						Some(ref reader_schema) => {
							deserializer_state.deserialize_resolved(reader_schema)?
						}
					};
					*position = self.block.len() - deserializer_state.into_reader().remaining().len();
					*n_objects_in_block -= 1;
					return Ok(Some(value));
				}
			}
		}
	}

	/// Move to the next block, decompressing it
	///
	/// Returns `false` if the end of the file was reached.
	fn read_block(&mut self) -> Result<bool, Error> {
		self.reader_state = ReaderState::Broken;
		if self.at_eof()? {
			self.reader_state = ReaderState::NotInBlock;
			return Ok(false);
		}
		self.skip_sync_marker()?;
		if self.at_eof()? {
			self.reader_state = ReaderState::NotInBlock;
			return Ok(false);
		}

		let mut reader = ReaderRead::new(&mut self.reader);
		let n_objects_in_block: i64 = reader.read_varint()?;
		let n_objects_in_block = usize::try_from(n_objects_in_block).map_err(|_| {
			Error::custom(
				ErrorKind::Data,
				format_args!("Invalid object count in block: {n_objects_in_block}"),
			)
		})?;
		let block_size: i64 = reader.read_varint()?;
		let block_size = usize::try_from(block_size).map_err(|_| {
			Error::custom(
				ErrorKind::Data,
				format_args!("Invalid block size: {block_size}"),
			)
		})?;
		self.compressed_block.clear();
		(&mut self.reader)
			.take(block_size as u64)
			.read_to_end(&mut self.compressed_block)
			.map_err(Error::io)?;
		if self.compressed_block.len() != block_size {
			return Err(Error::unexpected_eof());
		}

		decompression::decompress(
			self.header.codec,
			&mut self.compressed_block,
			&mut self.block,
		)?;
		log::trace!(
			"Read block of {n_objects_in_block} objects ({block_size} bytes, {} once decompressed)",
			self.block.len()
		);

		self.reader_state = ReaderState::InBlock {
			n_objects_in_block,
			position: 0,
		};
		Ok(true)
	}

	/// The sync marker that ends a block is consumed if it's there, otherwise
	/// whatever was read is put back
	fn skip_sync_marker(&mut self) -> Result<(), Error> {
		let mut candidate = Vec::with_capacity(16);
		(&mut self.reader)
			.take(16)
			.read_to_end(&mut candidate)
			.map_err(Error::io)?;
		if candidate == self.header.sync_marker {
			log::trace!("Consumed sync marker");
		} else {
			log::trace!("No sync marker, rewinding {} bytes", candidate.len());
			self.reader
				.seek(SeekFrom::Current(-(candidate.len() as i64)))
				.map_err(Error::io)?;
		}
		Ok(())
	}

	fn at_eof(&mut self) -> Result<bool, Error> {
		Ok(self.reader.fill_buf().map_err(Error::io)?.is_empty())
	}
}

impl<R> Reader<R> {
	/// The schema the values of the file were written with
	pub fn schema(&self) -> &Schema {
		&self.header.schema
	}

	/// The schema values are projected onto, if set with
	/// [`with_reader_schema`](Self::with_reader_schema)
	pub fn reader_schema(&self) -> Option<&Schema> {
		self.reader_schema.as_deref()
	}

	/// The codec blocks of the file are compressed with
	pub fn codec(&self) -> CompressionCodec {
		self.header.codec
	}

	/// The sync marker that ends each block of the file
	pub fn sync_marker(&self) -> &[u8; 16] {
		&self.header.sync_marker
	}

	/// Get a metadata entry of the header, other than the reserved `avro.`
	/// ones
	pub fn user_metadata(&self, key: &str) -> Option<&[u8]> {
		self.header
			.user_metadata
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, value)| value.as_slice())
	}

	/// Turn the `Reader` into the underlying reader
	pub fn into_inner(self) -> R {
		self.reader
	}
}

impl<R: BufRead + Seek> Iterator for Reader<R> {
	type Item = Result<Value, Error>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.pretend_eof_because_yielded_unrecoverable_error {
			return None;
		}
		let res = self.next_value();
		if res.is_err() {
			self.reader_state = ReaderState::Broken;
			self.pretend_eof_because_yielded_unrecoverable_error = true;
		}
		res.transpose()
	}
}
