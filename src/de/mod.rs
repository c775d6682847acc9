//! Defines everything necessary for avro deserialization
//!
//! # For advanced usage
//!
//! You typically want to use top-level functions such as
//! [`from_datum_slice`](crate::from_datum_slice) but access to this may be
//! necessary for more advanced usage.
//!
//! This gives manual access to configuration parameters meant to prevent DOS:
//! - [`DeserializerConfig::max_seq_size`]
//! - [`DeserializerConfig::allowed_depth`]
//! - [`read::ReaderRead::max_alloc_size`]
//!
//! Such usage would go as follows:
//! ```
//! use avro_dynamic::{de, Schema, Value};
//!
//! let schema: Schema = r#"
//! {
//! 	"namespace": "test",
//! 	"type": "record",
//! 	"name": "Test",
//! 	"fields": [
//! 		{
//! 			"type": {
//! 				"type": "string"
//! 			},
//! 			"name": "field"
//! 		}
//! 	]
//! }
//! "#
//! .parse()
//! .expect("Failed to parse schema");
//!
//! let avro_datum: &[u8] = &[6, 102, 111, 111]; // Any `impl BufRead`
//!
//! // Of course, don't actually use `ReaderRead` if you have a slice
//! let mut avro_reader = de::read::ReaderRead::new(avro_datum);
//!
//! // Now we can set some custom parameters
//! avro_reader.max_alloc_size = 32 * 1024;
//!
//! // We can also set parameters that are common to the slice version and the reader version
//! let mut deserializer_config = de::DeserializerConfig::new(&schema);
//! deserializer_config.max_seq_size = 1_000_000;
//!
//! let mut deserializer_state = de::DeserializerState::with_config(avro_reader, deserializer_config);
//! assert_eq!(
//! 	deserializer_state.deserialize().expect("Failed to deserialize"),
//! 	Value::Record(vec![("field".to_owned(), Value::String("foo".to_owned()))]),
//! );
//! ```

mod allowed_depth;
mod decode;
pub mod read;
mod resolve;
mod skip;

pub(crate) use allowed_depth::AllowedDepth;

use read::*;

use crate::{
	schema::{Enum, Schema, SchemaKey, Union},
	Error, ErrorKind, Value,
};

/// All configuration and state necessary for the deserialization to run
///
/// Notably holds the reader and a [`DeserializerConfig`].
pub struct DeserializerState<'s, R> {
	pub(crate) reader: R,
	config: DeserializerConfig<'s>,
}

/// Schema + other configs for deserialization
#[derive(Clone)]
pub struct DeserializerConfig<'s> {
	schema: &'s Schema,
	/// If a sequence turns out to be longer than this during deserialization,
	/// we will throw an error instead.
	///
	/// This is to avoid running into an infinite loop at deserialization time.
	/// Default for this is `1 000 000 000` (~1s CPU time)
	///
	/// Note that if you're deserializing from an `impl BufRead` instead of a
	/// slice (consequently using [`ReaderRead`]), there's an additional similar
	/// parameter [there](ReaderRead::max_alloc_size) that you may want to
	/// configure.
	pub max_seq_size: usize,
	/// If a datum turns out to be deeper than this during deserialization, we
	/// will throw an error instead.
	///
	/// This is to avoid running into a stack overflow at deserialization time.
	/// Default for this is `64`.
	pub allowed_depth: usize,
}

impl<'s> DeserializerConfig<'s> {
	/// Construct a `DeserializerConfig` from a schema, otherwise initializing
	/// all other parameters to their default values
	pub fn new(schema: &'s Schema) -> Self {
		Self {
			schema,
			max_seq_size: 1_000_000_000,
			allowed_depth: 64,
		}
	}

	/// The (writer) schema the data is decoded with
	pub fn schema(&self) -> &'s Schema {
		self.schema
	}
}

impl<'s, R: Read> DeserializerState<'s, R> {
	/// Construct a `DeserializerState` from a reader and a schema, internally
	/// initializing a `DeserializerConfig` from the schema with all other
	/// parameters set to their default values
	pub fn new(r: R, schema: &'s Schema) -> Self {
		Self::with_config(r, DeserializerConfig::new(schema))
	}

	/// Construct a `DeserializerState` from a [`Read`] (either a
	/// [`SliceRead`] or a [`ReaderRead`]) and a [`DeserializerConfig`]
	///
	/// This is only useful if you want to set custom parameters on the
	/// `DeserializerConfig` for the deserialization, otherwise you may simply
	/// use [`DeserializerState::from_slice`] or
	/// [`DeserializerState::from_reader`].
	pub fn with_config(r: R, config: DeserializerConfig<'s>) -> Self {
		DeserializerState { reader: r, config }
	}

	/// Decode one datum, as described by the schema
	pub fn deserialize(&mut self) -> Result<Value, Error> {
		let allowed_depth = AllowedDepth::new(self.config.allowed_depth);
		self.decode(SchemaKey::root(), allowed_depth)
	}

	/// Decode one datum that was written with the schema of this
	/// `DeserializerState`, projecting it onto `reader_schema`
	///
	/// Fails with [`ErrorKind::SchemaMismatch`] if the schemas are not
	/// compatible.
	pub fn deserialize_resolved(&mut self, reader_schema: &Schema) -> Result<Value, Error> {
		let allowed_depth = AllowedDepth::new(self.config.allowed_depth);
		self.resolve(SchemaKey::root(), reader_schema, SchemaKey::root(), allowed_depth)
	}

	/// Advance past one datum without materializing it
	pub fn skip(&mut self) -> Result<(), Error> {
		let allowed_depth = AllowedDepth::new(self.config.allowed_depth);
		self.skip_node(SchemaKey::root(), allowed_depth)
	}

	fn read_bool(&mut self) -> Result<bool, Error> {
		match self.read_const_size_buf::<1>()? {
			[0] => Ok(false),
			[1] => Ok(true),
			[other] => Err(Error::custom(
				ErrorKind::Data,
				format_args!("Invalid byte value when deserializing boolean: {other:?}"),
			)),
		}
	}

	fn read_int(&mut self) -> Result<i32, Error> {
		let n: i64 = self.read_varint()?;
		n.try_into().map_err(|_| {
			Error::custom(
				ErrorKind::Data,
				format_args!("Value {n} read for an int is out of range"),
			)
		})
	}

	fn read_len(&mut self) -> Result<usize, Error> {
		let len: i64 = self.read_varint()?;
		len.try_into().map_err(|e| {
			Error::custom(
				ErrorKind::Data,
				format_args!("Invalid length in stream: {len} ({e})"),
			)
		})
	}

	fn read_length_delimited(&mut self) -> Result<Vec<u8>, Error> {
		let len = self.read_len()?;
		self.reader.read_bytes(len)
	}

	fn read_string(&mut self) -> Result<String, Error> {
		String::from_utf8(self.read_length_delimited()?).map_err(|e| {
			Error::custom(
				ErrorKind::Data,
				format_args!("String is not valid UTF-8: {e}"),
			)
		})
	}

	fn read_union_discriminant(&mut self, union: &Union) -> Result<SchemaKey, Error> {
		let discriminant: i64 = self.read_varint()?;
		usize::try_from(discriminant)
			.ok()
			.and_then(|idx| union.variants.get(idx).copied())
			.ok_or_else(|| {
				Error::custom(
					ErrorKind::InvalidIndex,
					format_args!(
						"Union discriminant {discriminant} is out of range (union has {} branches)",
						union.variants.len()
					),
				)
			})
	}

	fn read_enum_symbol<'e>(&mut self, enum_: &'e Enum) -> Result<&'e str, Error> {
		let idx: i64 = self.read_varint()?;
		usize::try_from(idx)
			.ok()
			.and_then(|idx| enum_.symbols.get(idx))
			.map(String::as_str)
			.ok_or_else(|| {
				Error::custom(
					ErrorKind::InvalidIndex,
					format_args!(
						"Enum index {idx} is out of range for {} (which has {} symbols)",
						enum_.name,
						enum_.symbols.len()
					),
				)
			})
	}
}

/// Keeps track of where we are in a sequence of blocks (arrays and maps)
struct Blocks {
	current_block_len: usize,
	n_read: usize,
}
impl Blocks {
	fn new() -> Self {
		Self {
			current_block_len: 0,
			n_read: 0,
		}
	}

	/// Whether there is another item in the sequence, reading the next block
	/// header if necessary
	fn has_more<R: Read>(&mut self, state: &mut DeserializerState<'_, R>) -> Result<bool, Error> {
		self.current_block_len = match self.current_block_len.checked_sub(1) {
			None => match read_block_len(state)? {
				None => return Ok(false),
				Some((len, _byte_size)) => {
					self.count(state, len)?;
					len - 1
				}
			},
			Some(new_len) => new_len,
		};
		Ok(true)
	}

	fn count<R>(&mut self, state: &DeserializerState<'_, R>, len: usize) -> Result<(), Error> {
		let n_read = self.n_read.saturating_add(len);
		if n_read > state.config.max_seq_size {
			return Err(Error::new(
				ErrorKind::Data,
				"Exceeding max sequence size while deserializing",
			));
		}
		self.n_read = n_read;
		Ok(())
	}
}

/// Reads a block header: the (non-zero) number of items, and the size in bytes
/// of the block if it was provided (negative count)
///
/// Returns `None` for the terminating empty block.
fn read_block_len<R: Read>(
	state: &mut DeserializerState<'_, R>,
) -> Result<Option<(usize, Option<usize>)>, Error> {
	let len: i64 = state.read_varint()?;
	if len == 0 {
		return Ok(None);
	}
	let byte_size = if len < 0 { Some(state.read_len()?) } else { None };
	let len = usize::try_from(len.unsigned_abs()).map_err(|e| {
		Error::custom(
			ErrorKind::Data,
			format_args!("Invalid block length in stream: {e}"),
		)
	})?;
	Ok(Some((len, byte_size)))
}

impl<'s, 'a> DeserializerState<'s, read::SliceRead<'a>> {
	/// Construct a `DeserializerState` from an `&[u8]` and a schema, otherwise
	/// initializing all other parameters to their default values
	pub fn from_slice(slice: &'a [u8], schema: &'s Schema) -> Self {
		Self::new(read::SliceRead::new(slice), schema)
	}
}

impl<'s, R: std::io::BufRead> DeserializerState<'s, read::ReaderRead<R>> {
	/// Construct a `DeserializerState` from an
	/// [`impl BufRead`](std::io::BufRead) and a schema, otherwise initializing
	/// all other parameters to their default values
	///
	/// Prefer using [`DeserializerState::from_slice`] if you have a slice.
	pub fn from_reader(reader: R, schema: &'s Schema) -> Self {
		Self::new(read::ReaderRead::new(reader), schema)
	}
}

impl<'s, R> DeserializerState<'s, R> {
	/// Turn the `DeserializerState` into the reader it was built from
	pub fn into_reader(self) -> R {
		self.reader
	}

	/// Turn the `DeserializerState` into the reader it was built from, also
	/// extracting the original configuration (in case that needs to be re-used)
	pub fn into_inner(self) -> (R, DeserializerConfig<'s>) {
		(self.reader, self.config)
	}

	/// Get the configuration that this `DeserializerState` uses (that it was
	/// built with)
	pub fn config(&self) -> &DeserializerConfig<'s> {
		&self.config
	}
}

impl<R> std::ops::Deref for DeserializerState<'_, R> {
	type Target = R;
	fn deref(&self) -> &Self::Target {
		&self.reader
	}
}

impl<R> std::ops::DerefMut for DeserializerState<'_, R> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.reader
	}
}
