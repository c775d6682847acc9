//! Compatibility between writer and reader schemas, and materialization of
//! field defaults

use crate::{de::AllowedDepth, schema::*, Error, ErrorKind, Value};

/// Whether data written with the `writer` schema may be read as the `reader`
/// schema
///
/// This only looks at the roots of both schemas (and the elements of arrays
/// and maps): record fields and union branches are reconciled while
/// decoding.
pub fn matches(writer: &Schema, reader: &Schema) -> bool {
	matches_nodes(writer, SchemaKey::root(), reader, SchemaKey::root())
}

/// Same as [`matches`], for arbitrary nodes of both schemas
pub fn matches_nodes(
	writer: &Schema,
	writer_key: SchemaKey,
	reader: &Schema,
	reader_key: SchemaKey,
) -> bool {
	let (Some(writer_node), Some(reader_node)) = (writer.get(writer_key), reader.get(reader_key))
	else {
		return false;
	};
	match (&writer_node.type_, &reader_node.type_) {
		// Branch selection happens while decoding
		(RegularType::Union(_), _) | (_, RegularType::Union(_)) => true,

		(RegularType::Null, RegularType::Null)
		| (RegularType::Boolean, RegularType::Boolean)
		| (RegularType::Int, RegularType::Int)
		| (RegularType::Long, RegularType::Long)
		| (RegularType::Float, RegularType::Float)
		| (RegularType::Double, RegularType::Double)
		| (RegularType::Bytes, RegularType::Bytes)
		| (RegularType::String, RegularType::String) => true,

		// Promotions
		(RegularType::Int, RegularType::Long | RegularType::Float | RegularType::Double)
		| (RegularType::Long, RegularType::Float | RegularType::Double)
		| (RegularType::Float, RegularType::Double) => true,

		(RegularType::Array(writer_array), RegularType::Array(reader_array)) => {
			matches_nodes(writer, writer_array.items, reader, reader_array.items)
		}
		(RegularType::Map(writer_map), RegularType::Map(reader_map)) => {
			matches_nodes(writer, writer_map.values, reader, reader_map.values)
		}
		(RegularType::Enum(writer_enum), RegularType::Enum(reader_enum)) => {
			writer_enum.name == reader_enum.name
		}
		(RegularType::Fixed(writer_fixed), RegularType::Fixed(reader_fixed)) => {
			writer_fixed.name == reader_fixed.name && writer_fixed.size == reader_fixed.size
		}
		(RegularType::Record(writer_record), RegularType::Record(reader_record)) => {
			match (writer_record.kind, reader_record.kind) {
				(RecordKind::Request, RecordKind::Request) => true,
				(writer_kind, reader_kind) => {
					writer_kind == reader_kind && writer_record.name == reader_record.name
				}
			}
		}

		_ => false,
	}
}

/// Turn the JSON default of a field into a [`Value`] of the field's type
///
/// Bytes and fixed defaults are JSON strings where each character is a byte
/// (`"ÿ"`). Union defaults are for the first branch of the union.
/// Within a record default, fields that are not specified fall back to their
/// own default, or are left absent if they have none.
///
/// `enum` and `fixed` defaults are taken as they are, without checking the
/// symbol or the size. Numbers are coerced to the numeric type of the node.
///
/// Fails with [`ErrorKind::SchemaMismatch`] if the JSON kind of the default
/// does not fit the schema.
pub fn materialize_default(
	schema: &Schema,
	key: SchemaKey,
	default: &JsonValue,
) -> Result<Value, Error> {
	materialize_default_with_depth(schema, key, default, AllowedDepth::new(64))
}

pub(crate) fn materialize_default_with_depth(
	schema: &Schema,
	key: SchemaKey,
	default: &JsonValue,
	allowed_depth: AllowedDepth,
) -> Result<Value, Error> {
	let node = schema.get(key).ok_or_else(|| {
		Error::new(ErrorKind::Parse, "SchemaKey refers to non-existing node")
	})?;
	let mismatch = || {
		Error::custom(
			ErrorKind::SchemaMismatch,
			format_args!("Default value {default} does not match schema {}", node.type_),
		)
	};
	Ok(match (&node.type_, default) {
		(RegularType::Null, JsonValue::Null) => Value::Null,
		(RegularType::Boolean, &JsonValue::Bool(b)) => Value::Boolean(b),
		(RegularType::Int, JsonValue::Number(n)) => Value::Int(
			integral(n)
				.and_then(|n| i32::try_from(n).ok())
				.ok_or_else(mismatch)?,
		),
		(RegularType::Long, JsonValue::Number(n)) => Value::Long(integral(n).ok_or_else(mismatch)?),
		(RegularType::Float, JsonValue::Number(n)) => {
			Value::Float(n.as_f64().ok_or_else(mismatch)? as f32)
		}
		(RegularType::Double, JsonValue::Number(n)) => {
			Value::Double(n.as_f64().ok_or_else(mismatch)?)
		}
		(RegularType::String, JsonValue::String(s)) => Value::String(s.clone()),
		(RegularType::Bytes, JsonValue::String(s)) => {
			Value::Bytes(latin1_bytes(s).ok_or_else(mismatch)?)
		}
		// Passed through as is: neither the size nor the symbol is checked
		(RegularType::Fixed(_), JsonValue::String(s)) => {
			Value::Fixed(latin1_bytes(s).ok_or_else(mismatch)?)
		}
		(RegularType::Enum(_), JsonValue::String(s)) => Value::Enum(s.clone()),
		(RegularType::Array(array), JsonValue::Array(items)) => {
			let allowed_depth = allowed_depth.dec()?;
			Value::Array(
				items
					.iter()
					.map(|item| {
						materialize_default_with_depth(schema, array.items, item, allowed_depth)
					})
					.collect::<Result<_, _>>()?,
			)
		}
		(RegularType::Map(map), JsonValue::Object(entries)) => {
			let allowed_depth = allowed_depth.dec()?;
			Value::Map(
				entries
					.iter()
					.map(|(k, v)| {
						Ok((
							k.clone(),
							materialize_default_with_depth(schema, map.values, v, allowed_depth)?,
						))
					})
					.collect::<Result<_, Error>>()?,
			)
		}
		(RegularType::Union(union), _) => {
			let first_variant = *union.variants.first().ok_or_else(mismatch)?;
			materialize_default_with_depth(schema, first_variant, default, allowed_depth.dec()?)?
		}
		(RegularType::Record(record), JsonValue::Object(entries)) => {
			let allowed_depth = allowed_depth.dec()?;
			let mut fields = Vec::with_capacity(record.fields.len());
			for field in &record.fields {
				let field_default = match entries.get(&field.name).or(field.default.as_ref()) {
					Some(field_default) => field_default,
					None => continue,
				};
				fields.push((
					field.name.clone(),
					materialize_default_with_depth(schema, field.type_, field_default, allowed_depth)?,
				));
			}
			Value::Record(fields)
		}
		_ => return Err(mismatch()),
	})
}

/// Integers, or floats without a fractional part that fit an `i64` (`5.0`)
fn integral(n: &serde_json::Number) -> Option<i64> {
	n.as_i64().or_else(|| {
		n.as_f64()
			.filter(|f| f.fract() == 0. && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
			.map(|f| f as i64)
	})
}

/// Each char of the string is a byte
fn latin1_bytes(s: &str) -> Option<Vec<u8>> {
	s.chars().map(|c| u8::try_from(c).ok()).collect()
}
