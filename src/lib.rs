//! # Getting started
//!
//! ```
//! use avro_dynamic::{Schema, Value};
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
//! let value = Value::Record(vec![("field".to_owned(), "foo".into())]);
//! let avro_datum = &[6, 102, 111, 111];
//!
//! // Avro datum decoding
//! assert_eq!(
//! 	avro_dynamic::from_datum_slice(avro_datum, &schema).expect("Failed to decode"),
//! 	value
//! );
//!
//! // Avro datum encoding
//! assert_eq!(
//! 	avro_dynamic::to_datum_vec(&value, &schema).expect("Failed to encode"),
//! 	avro_datum
//! );
//! ```
//!
//! # Schema resolution
//!
//! Data written with one schema (the writer schema) may be read as another
//! compatible schema (the reader schema): numbers get promoted, record fields
//! that the reader doesn't know are dropped and those it expects but that
//! weren't written get their default value.
//!
//! ```
//! use avro_dynamic::{Schema, Value};
//!
//! let writer_schema: Schema = r#"{"type": "record", "name": "R", "fields": [
//! 	{"name": "a", "type": "int"},
//! 	{"name": "b", "type": "string"}
//! ]}"#
//! .parse()
//! .unwrap();
//! let reader_schema: Schema = r#"{"type": "record", "name": "R", "fields": [
//! 	{"name": "a", "type": "double"},
//! 	{"name": "c", "type": "long", "default": 5}
//! ]}"#
//! .parse()
//! .unwrap();
//!
//! let datum = avro_dynamic::to_datum_vec(
//! 	&Value::Record(vec![("a".to_owned(), Value::Int(3)), ("b".to_owned(), "x".into())]),
//! 	&writer_schema,
//! )
//! .unwrap();
//!
//! assert_eq!(
//! 	avro_dynamic::from_datum_slice_resolved(&datum, &writer_schema, &reader_schema).unwrap(),
//! 	Value::Record(vec![
//! 		("a".to_owned(), Value::Double(3.)),
//! 		("c".to_owned(), Value::Long(5)),
//! 	])
//! );
//! ```
//!
//! # Object container file encoding
//! Otherwise called "avro files", avro object container files contain a header
//! that holds the schema, followed by an arbitrary number of avro objects.
//!
//! For this use-case, please see the [`object_container_file_encoding`] module
//! documentation.

// Get docs.rs to display all compression methods and corresponding feature flags.
// That is used jointly with `package.metadata.docs.rs` in the `Cargo.toml`
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod de;
mod error;
pub mod object_container_file_encoding;
pub mod schema;
pub mod ser;
mod value;

pub use {
	error::{Error, ErrorKind},
	schema::Schema,
	value::Value,
};

/// Decode an avro "datum" (raw data, no headers...) from a slice
pub fn from_datum_slice(slice: &[u8], schema: &Schema) -> Result<Value, Error> {
	de::DeserializerState::from_slice(slice, schema).deserialize()
}

/// Decode an avro "datum" (raw data, no headers...) from an `impl BufRead`
///
/// If you only have an `impl Read`, wrap it in a
/// [`BufReader`](std::io::BufReader) first.
///
/// If decoding from a slice, a `Vec`, ... prefer using [`from_datum_slice`],
/// as it will be more performant.
pub fn from_datum_reader<R>(reader: R, schema: &Schema) -> Result<Value, Error>
where
	R: std::io::BufRead,
{
	de::DeserializerState::from_reader(reader, schema).deserialize()
}

/// Decode an avro "datum" that was written with `writer_schema`, projecting
/// it onto `reader_schema`
///
/// Fails with [`ErrorKind::SchemaMismatch`] if the two schemas are not
/// compatible.
pub fn from_datum_slice_resolved(
	slice: &[u8],
	writer_schema: &Schema,
	reader_schema: &Schema,
) -> Result<Value, Error> {
	de::DeserializerState::from_slice(slice, writer_schema).deserialize_resolved(reader_schema)
}

/// Encode an avro "datum" (raw data, no headers...)
///
/// to the provided writer
///
/// The value is validated against the schema first: if it doesn't conform,
/// this fails with [`ErrorKind::Type`] and nothing is written.
/// ```
/// # use avro_dynamic::{Schema, Value};
/// let schema: Schema = r#""int""#.parse().unwrap();
///
/// let mut encoded: Vec<u8> = avro_dynamic::to_datum_vec(&Value::Int(3), &schema).unwrap();
/// assert_eq!(encoded, &[6]);
///
/// // reuse the output buffer across encodings
/// encoded.clear();
/// let encoded = avro_dynamic::to_datum(&Value::Int(4), encoded, &schema).unwrap();
/// assert_eq!(encoded, &[8]);
/// ```
pub fn to_datum<W>(value: &Value, writer: W, schema: &Schema) -> Result<W, Error>
where
	W: std::io::Write,
{
	let mut serializer_state = ser::SerializerState::from_writer(writer, schema);
	serializer_state.serialize(value)?;
	Ok(serializer_state.into_writer())
}

/// Encode an avro "datum" (raw data, no headers...)
///
/// to a newly allocated Vec
///
/// Note that unless you would otherwise allocate a new `Vec` anyway, it will be
/// more efficient to use [`to_datum`] instead.
pub fn to_datum_vec(value: &Value, schema: &Schema) -> Result<Vec<u8>, Error> {
	to_datum(value, Vec::new(), schema)
}
