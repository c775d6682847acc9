//! The dynamically-typed datum that is encoded and decoded

use crate::schema::JsonValue;

/// An Avro datum
///
/// This is what gets [encoded](crate::to_datum) according to a schema, and
/// what [decoding](crate::from_datum_slice) produces.
///
/// Maps and records keep their entries in order: maps in the order they were
/// written, records in the order of the fields of the (reader) schema.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Null,
	Boolean(bool),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	Bytes(Vec<u8>),
	String(String),
	/// Raw bytes of a `fixed`
	Fixed(Vec<u8>),
	/// The symbol of an `enum`
	Enum(String),
	Array(Vec<Value>),
	Map(Vec<(String, Value)>),
	/// Fields of a record, by name
	Record(Vec<(String, Value)>),
}

impl Value {
	/// Look up a field of a [`Value::Record`] (or an entry of a
	/// [`Value::Map`]) by name
	pub fn field(&self, name: &str) -> Option<&Value> {
		match self {
			Value::Record(entries) | Value::Map(entries) => entries
				.iter()
				.find(|(key, _)| key == name)
				.map(|(_, value)| value),
			_ => None,
		}
	}

	/// Build a value from untyped JSON
	///
	/// Integers become [`Value::Long`], other numbers [`Value::Double`], and
	/// objects [`Value::Map`]. Encoding is lenient enough that such a value is
	/// accepted for records, ints, floats...
	pub fn from_json(json: &JsonValue) -> Self {
		match json {
			JsonValue::Null => Value::Null,
			JsonValue::Bool(b) => Value::Boolean(*b),
			JsonValue::Number(n) => match n.as_i64() {
				Some(i) => Value::Long(i),
				None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
			},
			JsonValue::String(s) => Value::String(s.clone()),
			JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
			JsonValue::Object(entries) => Value::Map(
				entries
					.iter()
					.map(|(key, value)| (key.clone(), Value::from_json(value)))
					.collect(),
			),
		}
	}

	/// Short description of the kind of value, for error messages
	pub(crate) fn kind_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Boolean(_) => "boolean",
			Value::Int(_) => "int",
			Value::Long(_) => "long",
			Value::Float(_) => "float",
			Value::Double(_) => "double",
			Value::Bytes(_) => "bytes",
			Value::String(_) => "string",
			Value::Fixed(_) => "fixed",
			Value::Enum(_) => "enum",
			Value::Array(_) => "array",
			Value::Map(_) => "map",
			Value::Record(_) => "record",
		}
	}
}

macro_rules! impl_from {
	($($t: ty => $variant: ident,)*) => {
		$(
			impl From<$t> for Value {
				fn from(v: $t) -> Self {
					Value::$variant(v.into())
				}
			}
		)*
	};
}
impl_from! {
	bool => Boolean,
	i32 => Int,
	i64 => Long,
	f32 => Float,
	f64 => Double,
	Vec<u8> => Bytes,
	&[u8] => Bytes,
	String => String,
	&str => String,
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		match v {
			None => Value::Null,
			Some(v) => v.into(),
		}
	}
}
