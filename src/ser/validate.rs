use crate::{
	schema::{materialize_default, RegularType, Schema, SchemaKey},
	Value,
};

/// Whether `value` may be encoded with the node `key` of `schema`
///
/// - `int` accepts [`Value::Int`], and [`Value::Long`] within the `int` range
/// - `long` accepts [`Value::Int`] and [`Value::Long`]
/// - `float` and `double` accept any numeric value
/// - `enum` accepts a [`Value::Enum`] or a [`Value::String`] that is one of its
///   symbols
/// - `fixed` accepts a [`Value::Fixed`] or [`Value::Bytes`] of exactly its
///   size
/// - records accept [`Value::Record`] or [`Value::Map`]. A field that is absent
///   from the value is checked using its default, or as `null` if it has none.
/// - unions accept a value if any of their branches does
pub fn is_valid_datum(schema: &Schema, key: SchemaKey, value: &Value) -> bool {
	let Some(node) = schema.get(key) else {
		return false;
	};
	match (&node.type_, value) {
		(RegularType::Null, Value::Null)
		| (RegularType::Boolean, Value::Boolean(_))
		| (RegularType::Int, Value::Int(_))
		| (RegularType::Long, Value::Int(_) | Value::Long(_))
		| (
			RegularType::Float | RegularType::Double,
			Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_),
		)
		| (RegularType::Bytes, Value::Bytes(_))
		| (RegularType::String, Value::String(_)) => true,
		(RegularType::Int, &Value::Long(n)) => i32::try_from(n).is_ok(),
		(RegularType::Fixed(fixed), Value::Fixed(bytes) | Value::Bytes(bytes)) => {
			bytes.len() == fixed.size
		}
		(RegularType::Enum(enum_), Value::Enum(symbol) | Value::String(symbol)) => {
			enum_.symbols.contains(symbol)
		}
		(RegularType::Array(array), Value::Array(items)) => items
			.iter()
			.all(|item| is_valid_datum(schema, array.items, item)),
		(RegularType::Map(map), Value::Map(entries)) => entries
			.iter()
			.all(|(_, v)| is_valid_datum(schema, map.values, v)),
		(RegularType::Union(union), _) => union
			.variants
			.iter()
			.any(|&variant| is_valid_datum(schema, variant, value)),
		(RegularType::Record(record), Value::Record(entries) | Value::Map(entries)) => {
			record.fields.iter().all(|field| {
				match entries.iter().find(|(name, _)| *name == field.name) {
					Some((_, field_value)) => is_valid_datum(schema, field.type_, field_value),
					None => match field.default {
						Some(ref default) => materialize_default(schema, field.type_, default)
							.is_ok_and(|default| is_valid_datum(schema, field.type_, &default)),
						None => is_valid_datum(schema, field.type_, &Value::Null),
					},
				}
			})
		}
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn int_range() {
		let schema: Schema = r#""int""#.parse().unwrap();
		let root = SchemaKey::root();
		assert!(is_valid_datum(&schema, root, &Value::Long(i32::MAX.into())));
		assert!(is_valid_datum(&schema, root, &Value::Long(i32::MIN.into())));
		assert!(!is_valid_datum(&schema, root, &Value::Long(i64::from(i32::MAX) + 1)));
		assert!(!is_valid_datum(&schema, root, &Value::Double(1.0)));
	}

	#[test]
	fn absent_record_fields() {
		let schema: Schema = r#"{
			"type": "record",
			"name": "R",
			"fields": [
				{"name": "a", "type": "long", "default": 5},
				{"name": "b", "type": ["null", "string"]},
				{"name": "c", "type": "string"}
			]
		}"#
		.parse()
		.unwrap();
		let root = SchemaKey::root();
		assert!(is_valid_datum(
			&schema,
			root,
			&Value::Record(vec![("c".to_owned(), "x".into())])
		));
		assert!(!is_valid_datum(&schema, root, &Value::Record(vec![])));
	}
}
