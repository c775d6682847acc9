//! Defines everything necessary for avro serialization
//!
//! # For advanced usage
//!
//! You typically want to use top-level functions such as
//! [`to_datum`](crate::to_datum) but access to this may be
//! necessary for more advanced usage.
//!
//! Such usage would go as follows:
//! ```
//! use avro_dynamic::{ser::SerializerState, Schema, Value};
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
//! let mut serializer_state = SerializerState::from_writer(Vec::new(), &schema);
//! serializer_state
//! 	.serialize(&Value::Record(vec![("field".to_owned(), "foo".into())]))
//! 	.expect("Failed to serialize");
//!
//! // The same state may be used to write several data in a row
//! serializer_state
//! 	.serialize(&Value::Record(vec![("field".to_owned(), "bar".into())]))
//! 	.expect("Failed to serialize");
//!
//! assert_eq!(
//! 	serializer_state.into_writer(),
//! 	&[6, b'f', b'o', b'o', 6, b'b', b'a', b'r']
//! );
//! ```

mod validate;
mod write;

pub use {validate::is_valid_datum, write::*};

use crate::{
	schema::{materialize_default, RegularType, Schema, SchemaKey},
	Error, ErrorKind, Value,
};

/// All configuration and state necessary for the serialization to run
///
/// Holds the writer and the schema that values are encoded with.
pub struct SerializerState<'s, W> {
	writer: W,
	schema: &'s Schema,
}

impl<'s, W: std::io::Write> SerializerState<'s, W> {
	/// Build a `SerializerState` from a writer and a schema
	pub fn from_writer(writer: W, schema: &'s Schema) -> Self {
		Self { writer, schema }
	}

	/// Validate `value` against the schema, then write its binary encoding
	///
	/// Nothing is written if the value does not conform to the schema: that
	/// fails with [`ErrorKind::Type`].
	pub fn serialize(&mut self, value: &Value) -> Result<(), Error> {
		let root = SchemaKey::root();
		if !is_valid_datum(self.schema, root, value) {
			return Err(type_error(self.schema, root, value));
		}
		self.write_node(root, value)
	}

	/// `value` is expected to have been validated against `key`
	fn write_node(&mut self, key: SchemaKey, value: &Value) -> Result<(), Error> {
		let schema = self.schema;
		let w = &mut self.writer;
		match (&schema[key].type_, value) {
			(RegularType::Null, Value::Null) => Ok(()),
			(RegularType::Boolean, &Value::Boolean(b)) => write_boolean(w, b),
			(RegularType::Int, &Value::Int(n)) => write_int(w, n),
			(RegularType::Int, &Value::Long(n)) => write_int(
				w,
				n.try_into().map_err(|_| type_error(schema, key, value))?,
			),
			(RegularType::Long, &Value::Int(n)) => write_long(w, n.into()),
			(RegularType::Long, &Value::Long(n)) => write_long(w, n),
			(RegularType::Float, &Value::Int(n)) => write_float(w, n as f32),
			(RegularType::Float, &Value::Long(n)) => write_float(w, n as f32),
			(RegularType::Float, &Value::Float(f)) => write_float(w, f),
			(RegularType::Float, &Value::Double(f)) => write_float(w, f as f32),
			(RegularType::Double, &Value::Int(n)) => write_double(w, n.into()),
			(RegularType::Double, &Value::Long(n)) => write_double(w, n as f64),
			(RegularType::Double, &Value::Float(f)) => write_double(w, f.into()),
			(RegularType::Double, &Value::Double(f)) => write_double(w, f),
			(RegularType::Bytes, Value::Bytes(bytes)) => write_bytes(w, bytes),
			(RegularType::String, Value::String(s)) => write_string(w, s),
			(RegularType::Fixed(_), Value::Fixed(bytes) | Value::Bytes(bytes)) => {
				w.write_all(bytes).map_err(Error::io)
			}
			(RegularType::Enum(enum_), Value::Enum(symbol) | Value::String(symbol)) => {
				match enum_.symbols.iter().position(|s| s == symbol) {
					Some(idx) => write_len(w, idx),
					None => Err(type_error(schema, key, value)),
				}
			}
			(RegularType::Array(array), Value::Array(items)) => {
				// Blocks are never split on write
				if !items.is_empty() {
					write_len(w, items.len())?;
					for item in items {
						self.write_node(array.items, item)?;
					}
				}
				write_long(&mut self.writer, 0)
			}
			(RegularType::Map(map), Value::Map(entries)) => {
				if !entries.is_empty() {
					write_len(w, entries.len())?;
					for (k, v) in entries {
						write_string(&mut self.writer, k)?;
						self.write_node(map.values, v)?;
					}
				}
				write_long(&mut self.writer, 0)
			}
			(RegularType::Union(union), _) => {
				match union
					.variants
					.iter()
					.position(|&variant| is_valid_datum(schema, variant, value))
				{
					Some(idx) => {
						write_len(w, idx)?;
						self.write_node(union.variants[idx], value)
					}
					None => Err(type_error(schema, key, value)),
				}
			}
			(RegularType::Record(record), Value::Record(entries) | Value::Map(entries)) => {
				for field in &record.fields {
					match entries.iter().find(|(name, _)| *name == field.name) {
						Some((_, field_value)) => self.write_node(field.type_, field_value)?,
						None => match field.default {
							Some(ref default) => {
								let default = materialize_default(schema, field.type_, default)?;
								self.write_node(field.type_, &default)?
							}
							None => self.write_node(field.type_, &Value::Null)?,
						},
					}
				}
				Ok(())
			}
			_ => Err(type_error(schema, key, value)),
		}
	}
}

fn type_error(schema: &Schema, key: SchemaKey, value: &Value) -> Error {
	Error::custom(
		ErrorKind::Type,
		format_args!(
			"{} value does not conform to schema {}: {value:?}",
			value.kind_name(),
			schema[key].type_
		),
	)
}

impl<W> SerializerState<'_, W> {
	/// Get writer back
	pub fn into_writer(self) -> W {
		self.writer
	}

	/// Get writer by reference
	///
	/// This may be useful to observe the state of the inner buffer,
	/// notably when re-using a `SerializerState` to write multiple objects.
	pub fn writer(&self) -> &W {
		&self.writer
	}

	/// Get writer by mutable reference
	///
	/// This may be useful to clear the inner buffer, when re-using a
	/// `SerializerState`.
	pub fn writer_mut(&mut self) -> &mut W {
		&mut self.writer
	}
}
