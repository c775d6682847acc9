mod compression;

use compression::CompressionCodecState;

use crate::{ser::SerializerState, Error, ErrorKind, Schema, Value};

use super::{
	metadata_schema, read_header, Compression, CompressionCodec, CODEC_KEY, HEADER_CONST,
	RESERVED_KEY_PREFIX, SCHEMA_KEY,
};

use std::{
	borrow::Borrow,
	io::{Read, Seek, SeekFrom, Write},
	num::NonZeroUsize,
	sync::Arc,
};

/// Write all the values of the provided sequence in an [object container file](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// # Example
/// ```
/// use avro_dynamic::{
/// 	object_container_file_encoding::{self, Compression, Reader},
/// 	Value,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema: avro_dynamic::Schema = r#"
/// {
/// 	"type": "record",
/// 	"name": "test",
/// 	"fields": [
/// 		{ "name": "a", "type": "long" },
/// 		{ "name": "b", "type": "string" }
/// 	]
/// }
/// "#
/// .parse()?;
///
/// let records: Vec<Value> = (0..3)
/// 	.map(|a| {
/// 		Value::Record(vec![
/// 			("a".to_owned(), Value::Long(a)),
/// 			("b".to_owned(), "hello".into()),
/// 		])
/// 	})
/// 	.collect();
///
/// let object_container_file_encoded: Vec<u8> =
/// 	object_container_file_encoding::write_all(&schema, Compression::Null, Vec::new(), &records)?;
///
/// let decoded = Reader::from_slice(&object_container_file_encoded)?.collect::<Result<Vec<Value>, _>>()?;
///
/// assert_eq!(decoded, records);
/// # Ok(())
/// # }
/// ```
pub fn write_all<W, IT>(
	schema: &Schema,
	compression: Compression,
	writer: W,
	values: IT,
) -> Result<W, Error>
where
	W: Write,
	IT: IntoIterator,
	IT::Item: Borrow<Value>,
{
	let mut writer = WriterBuilder::new(schema.clone())
		.compression(compression)
		.build(writer)?;
	writer.append_all(values)?;
	writer.into_inner()
}

/// [`Writer`] builder for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// See [`Writer`] for an example.
pub struct WriterBuilder {
	schema: Arc<Schema>,
	compression: Compression,
	approx_block_size: u32,
	sync_marker: Option<[u8; 16]>,
	user_metadata: Vec<(String, Vec<u8>)>,
}

impl WriterBuilder {
	/// Start building a writer for values of the given schema
	pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
		Self {
			schema: schema.into(),
			compression: Compression::Null,
			approx_block_size: 64_000,
			sync_marker: None,
			user_metadata: Vec::new(),
		}
	}

	/// Specify the compression codec that each block will be compressed with
	pub fn compression(mut self, compression: Compression) -> Self {
		self.compression = compression;
		self
	}

	/// Approximate uncompressed block size in bytes
	///
	/// If after encoding a value, the total size of the uncompressed block
	/// reaches this value, the block will be compressed and flushed.
	///
	/// Default value is 64 000 bytes.
	pub fn approx_block_size(mut self, approx_block_size: u32) -> Self {
		self.approx_block_size = approx_block_size;
		self
	}

	/// Use this sync marker instead of a randomly generated one
	///
	/// This is mostly useful to produce reproducible files.
	pub fn sync_marker(mut self, sync_marker: [u8; 16]) -> Self {
		self.sync_marker = Some(sync_marker);
		self
	}

	/// Add an entry to the header metadata
	///
	/// Keys starting with `avro.` are reserved: [`build`](Self::build) will
	/// fail if one is provided.
	pub fn user_metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
		self.user_metadata.push((key.into(), value.into()));
		self
	}

	/// Build the [`Writer`]
	///
	/// After this method is called, it is guaranteed that the full object
	/// container file encoding header is already written to the `writer`.
	pub fn build<W: Write>(self, mut writer: W) -> Result<Writer<W>, Error> {
		if let Some((key, _)) = self
			.user_metadata
			.iter()
			.find(|(key, _)| key.starts_with(RESERVED_KEY_PREFIX))
		{
			return Err(Error::custom(
				ErrorKind::Data,
				format_args!("Metadata key {key:?} is reserved"),
			));
		}

		let sync_marker = self.sync_marker.unwrap_or_else(|| {
			let mut sync_marker = [0; 16];
			rand::Rng::fill(&mut rand::thread_rng(), &mut sync_marker);
			sync_marker
		});

		// We'll use this both for encoding the header and as a buffer when
		// encoding blocks
		let mut buf = Vec::with_capacity(self.approx_block_size as usize * 5 / 4);
		buf.extend_from_slice(&HEADER_CONST);
		let metadata = Value::Map(
			[
				(SCHEMA_KEY.to_owned(), self.schema.json().as_bytes().to_vec()),
				(
					CODEC_KEY.to_owned(),
					self.compression.codec().as_str().as_bytes().to_vec(),
				),
			]
			.into_iter()
			.chain(self.user_metadata)
			.map(|(key, value)| (key, Value::Bytes(value)))
			.collect(),
		);
		let mut header_serializer_state = SerializerState::from_writer(buf, metadata_schema());
		header_serializer_state
			.serialize(&metadata)
			.map_err(|error| {
				Error::custom(
					ErrorKind::Data,
					format_args!("Failed to encode object container file header metadata: {error}"),
				)
			})?;
		buf = header_serializer_state.into_writer();
		buf.extend_from_slice(&sync_marker);

		writer.write_all(&buf).map_err(Error::io)?;
		buf.clear();

		log::debug!(
			"Wrote object container file header (codec: {})",
			self.compression.codec()
		);

		Ok(Writer::from_parts(
			writer,
			self.schema,
			self.compression,
			self.approx_block_size,
			sync_marker,
			buf,
		))
	}
}

/// Writer for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// To be constructed via [`WriterBuilder`], or [`Writer::append_to`] to add
/// values to an existing file.
///
/// # Example
///
/// ```
/// use avro_dynamic::{
/// 	object_container_file_encoding::{Compression, Reader, WriterBuilder},
/// 	Value,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema: avro_dynamic::Schema = r#"
/// {
/// 	"type": "record",
/// 	"name": "test",
/// 	"fields": [
/// 		{ "name": "a", "type": "long" },
/// 		{ "name": "b", "type": "string" }
/// 	]
/// }
/// "#
/// .parse()?;
///
/// let mut writer = WriterBuilder::new(schema)
/// 	.compression(Compression::Null)
/// 	.build(Vec::new())?;
///
/// for i in 0..3 {
/// 	writer.append(&Value::Record(vec![
/// 		("a".to_owned(), Value::Long(i)),
/// 		("b".to_owned(), "hello".into()),
/// 	]))?;
/// }
///
/// let object_container_file_encoded: Vec<u8> = writer.into_inner()?;
///
/// let decoded = Reader::from_slice(&object_container_file_encoded)?
/// 	.map(|value| Ok(value?.field("a").cloned()))
/// 	.collect::<Result<Vec<_>, avro_dynamic::Error>>()?;
///
/// assert_eq!(
/// 	decoded,
/// 	[Some(Value::Long(0)), Some(Value::Long(1)), Some(Value::Long(2))]
/// );
/// # Ok(())
/// # }
/// ```
pub struct Writer<W: Write> {
	inner: WriterInner,
	writer: Option<W>,
}

impl<W: Write> Writer<W> {
	fn from_parts(
		writer: W,
		schema: Arc<Schema>,
		compression: Compression,
		approx_block_size: u32,
		sync_marker: [u8; 16],
		buffer: Vec<u8>,
	) -> Self {
		Writer {
			inner: WriterInner {
				schema,
				buffer,
				sync_marker,
				compression_codec_state: CompressionCodecState::new(compression),
				n_elements_in_block: 0,
				approx_block_size,
				block_header_buffer: [0; 20],
				block_header_size: None,
			},
			writer: Some(writer),
		}
	}

	/// Append each value of the provided sequence to the object container
	/// file
	pub fn append_all<IT>(&mut self, values: IT) -> Result<(), Error>
	where
		IT: IntoIterator,
		IT::Item: Borrow<Value>,
	{
		values
			.into_iter()
			.try_for_each(|value| self.append(value.borrow()))
	}

	/// Append one value to the object container file
	///
	/// The value is validated against the schema: if it doesn't conform,
	/// this fails with [`ErrorKind::Type`] and nothing is added to the file.
	pub fn append(&mut self, value: &Value) -> Result<(), Error> {
		self.flush_finished_block()?;
		if self.inner.buffer.len() >= self.inner.approx_block_size as usize {
			self.finish_block()?;
		}
		self.inner.append(value)?;
		self.flush_finished_block()?;
		Ok(())
	}

	/// Flush the final block (if a block was started) then return the
	/// underlying writer.
	pub fn into_inner(mut self) -> Result<W, Error> {
		self.finish_block()?;
		let mut writer = self.writer.take().ok_or_else(already_consumed)?;
		writer.flush().map_err(Error::io)?;
		Ok(writer)
	}

	/// Flush the current block (if a block was started)
	///
	/// After this function is called, if it returned no error, it is guaranteed
	/// that the full block is written to the writer.
	/// This implies that all bytes written so far amount to a valid object
	/// container file.
	pub fn finish_block(&mut self) -> Result<(), Error> {
		self.inner.finish_block()?;
		self.flush_finished_block()?;
		Ok(())
	}

	fn flush_finished_block(&mut self) -> Result<(), Error> {
		if let Some(block_header_size) = self.inner.block_header_size {
			let writer = self.writer.as_mut().ok_or_else(already_consumed)?;
			let compressed_block = self.inner.compressed_block();
			writer
				.write_all(&self.inner.block_header_buffer[..block_header_size.get()])
				.and_then(|()| writer.write_all(compressed_block))
				.and_then(|()| writer.write_all(&self.inner.sync_marker))
				.map_err(Error::io)?;
			log::debug!(
				"Flushed block of {} bytes ({} bytes before compression)",
				compressed_block.len(),
				self.inner.buffer.len()
			);
			self.inner.block_header_size = None; // Mark that we have flushed
			self.inner.buffer.clear();
		}
		Ok(())
	}

	/// Get a mutable reference to the inner writer
	///
	/// If you haven't received any error while manipulating the [`Writer`] or
	/// its builder, you may expect that:
	/// - The object container file encoding header has been written
	/// - All blocks written so far are complete
	///
	/// It is however not guaranteed that all `append`ed values have been
	/// written as a block: there may still be an incomplete block in the
	/// writer's own buffer.
	pub fn inner_mut(&mut self) -> &mut W {
		match self.writer {
			Some(ref mut writer) => writer,
			// Only unset by `into_inner` and `drop`, which consume the writer
			None => unreachable!(),
		}
	}

	/// Get a reference to the inner writer
	///
	/// See [`inner_mut`](Self::inner_mut) for what may be expected to have
	/// been written so far.
	pub fn inner(&self) -> &W {
		match self.writer {
			Some(ref writer) => writer,
			None => unreachable!(),
		}
	}

	/// The schema values are appended with
	pub fn schema(&self) -> &Schema {
		&self.inner.schema
	}

	/// The sync marker that ends each block of this file
	pub fn sync_marker(&self) -> &[u8; 16] {
		&self.inner.sync_marker
	}
}

impl<S: Read + Write + Seek> Writer<S> {
	/// Append to an existing object container file
	///
	/// The header is read from the start of `stream` to recover the schema,
	/// the codec and the sync marker of the file, then the stream is
	/// positioned at its end so that new blocks get added after the existing
	/// ones.
	///
	/// If `codec` is provided, it has to match the codec of the file.
	pub fn append_to(mut stream: S, codec: Option<CompressionCodec>) -> Result<Self, Error> {
		stream.seek(SeekFrom::Start(0)).map_err(Error::io)?;
		let header = read_header(&mut std::io::BufReader::new(&mut stream))?;
		if let Some(codec) = codec {
			if codec != header.codec {
				return Err(Error::custom(
					ErrorKind::Data,
					format_args!(
						"Codec {codec} does not match the codec of the existing file ({})",
						header.codec
					),
				));
			}
		}
		let compression = Compression::from_codec(header.codec)?;
		let end = stream.seek(SeekFrom::End(0)).map_err(Error::io)?;
		log::debug!(
			"Appending to object container file at offset {end} (codec: {})",
			header.codec
		);
		Ok(Self::from_parts(
			stream,
			header.schema,
			compression,
			64_000,
			header.sync_marker,
			Vec::new(),
		))
	}
}

impl<W: Write> Drop for Writer<W> {
	fn drop(&mut self) {
		if self.writer.is_some() && !std::thread::panicking() {
			if let Err(error) = self.finish_block() {
				log::error!(
					"Failed to flush object container file Writer on Drop: {error}. \
						Please favor flushing manually before dropping the Writer."
				);
			}
		}
	}
}

fn already_consumed() -> Error {
	Error::new(ErrorKind::Io, "Writer was already consumed")
}

struct WriterInner {
	schema: Arc<Schema>,
	buffer: Vec<u8>,
	n_elements_in_block: u64,
	approx_block_size: u32,
	sync_marker: [u8; 16],
	compression_codec_state: CompressionCodecState,
	block_header_buffer: [u8; 20],
	block_header_size: Option<NonZeroUsize>,
}

impl WriterInner {
	fn append(&mut self, value: &Value) -> Result<(), Error> {
		let buf_len_before_attempt = self.buffer.len();
		let mut serializer_state = SerializerState::from_writer(&mut self.buffer, &self.schema);
		if let Err(e) = serializer_state.serialize(value) {
			// Drop any partially written value
			self.buffer.truncate(buf_len_before_attempt);
			return Err(e);
		}
		self.n_elements_in_block += 1;
		if self.buffer.len() >= self.approx_block_size as usize {
			self.finish_block()?;
		}
		Ok(())
	}

	fn finish_block(&mut self) -> Result<(), Error> {
		if self.n_elements_in_block > 0 && self.block_header_size.is_none() {
			self.compression_codec_state.encode(&self.buffer)?;

			let n = <i64 as integer_encoding::VarInt>::encode_var(
				self.n_elements_in_block as i64,
				&mut self.block_header_buffer,
			);
			let n2 = <i64 as integer_encoding::VarInt>::encode_var(
				self.compressed_block().len() as i64,
				&mut self.block_header_buffer[n..],
			);
			self.block_header_size = NonZeroUsize::new(n + n2);
			self.n_elements_in_block = 0;
		}
		Ok(())
	}

	fn compressed_block(&self) -> &[u8] {
		self.compression_codec_state
			.compressed_buffer()
			.unwrap_or(&self.buffer)
	}
}
