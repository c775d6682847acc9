use avro_dynamic::{
	from_datum_slice_resolved,
	schema::{materialize_default, matches, SchemaKey},
	to_datum_vec, ErrorKind, Schema, Value,
};

use {lazy_static::lazy_static, pretty_assertions::assert_eq, serde_json::json};

lazy_static! {
	static ref WRITER_AB: Schema = r#"
	{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "a", "type": "int" },
			{ "name": "b", "type": { "type": "array", "items": "string" } }
		]
	}"#
	.parse()
	.unwrap();
	static ref READER_AC: Schema = r#"
	{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "a", "type": "int" },
			{ "name": "c", "type": "long", "default": 5 }
		]
	}"#
	.parse()
	.unwrap();
}

fn resolve(writer_schema: &str, reader_schema: &str, value: Value) -> Result<Value, avro_dynamic::Error> {
	let writer_schema: Schema = writer_schema.parse().unwrap();
	let reader_schema: Schema = reader_schema.parse().unwrap();
	let encoded = to_datum_vec(&value, &writer_schema).unwrap();
	from_datum_slice_resolved(&encoded, &writer_schema, &reader_schema)
}

#[test]
fn int_promotions() {
	for (reader, expected) in [
		(r#""int""#, Value::Int(1000)),
		(r#""long""#, Value::Long(1000)),
		(r#""float""#, Value::Float(1000.)),
		(r#""double""#, Value::Double(1000.)),
	] {
		assert_eq!(resolve(r#""int""#, reader, Value::Int(1000)).unwrap(), expected);
	}
	assert_eq!(
		resolve(r#""long""#, r#""double""#, Value::Long(-7)).unwrap(),
		Value::Double(-7.)
	);
	assert_eq!(
		resolve(r#""float""#, r#""double""#, Value::Float(0.5)).unwrap(),
		Value::Double(0.5)
	);
	// No demotion
	assert_eq!(
		resolve(r#""long""#, r#""int""#, Value::Long(1)).unwrap_err().kind(),
		ErrorKind::SchemaMismatch
	);
}

#[test]
fn field_evolution() {
	let encoded = to_datum_vec(
		&Value::Record(vec![
			("a".to_owned(), Value::Int(12)),
			("b".to_owned(), Value::Array(vec!["x".into(), "y".into()])),
		]),
		&WRITER_AB,
	)
	.unwrap();
	assert_eq!(
		from_datum_slice_resolved(&encoded, &WRITER_AB, &READER_AC).unwrap(),
		Value::Record(vec![
			("a".to_owned(), Value::Int(12)),
			("c".to_owned(), Value::Long(5)),
		])
	);
}

#[test]
fn fields_are_matched_by_name() {
	let value = resolve(
		r#"{"type": "record", "name": "R", "fields": [
			{"name": "x", "type": "string"},
			{"name": "y", "type": "int"}
		]}"#,
		r#"{"type": "record", "name": "R", "fields": [
			{"name": "y", "type": "long"},
			{"name": "x", "type": "string"}
		]}"#,
		Value::Record(vec![
			("x".to_owned(), "s".into()),
			("y".to_owned(), Value::Int(2)),
		]),
	)
	.unwrap();
	assert_eq!(
		value,
		Value::Record(vec![
			("y".to_owned(), Value::Long(2)),
			("x".to_owned(), "s".into()),
		])
	);
}

#[test]
fn missing_field_without_default_is_left_absent() {
	let value = resolve(
		r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
		r#"{"type": "record", "name": "R", "fields": [
			{"name": "a", "type": "int"},
			{"name": "z", "type": "string"}
		]}"#,
		Value::Record(vec![("a".to_owned(), Value::Int(1))]),
	)
	.unwrap();
	assert_eq!(value, Value::Record(vec![("a".to_owned(), Value::Int(1))]));
}

#[test]
fn unions() {
	// Reader union: first matching branch
	assert_eq!(
		resolve(r#""int""#, r#"["null", "string", "long"]"#, Value::Int(3)).unwrap(),
		Value::Long(3)
	);
	// Writer union: the branch that was written is resolved against the reader
	assert_eq!(
		resolve(r#"["null", "int"]"#, r#""double""#, Value::Int(3)).unwrap(),
		Value::Double(3.)
	);
	assert_eq!(
		resolve(r#"["null", "int"]"#, r#""double""#, Value::Null)
			.unwrap_err()
			.kind(),
		ErrorKind::SchemaMismatch
	);
	// Both unions
	assert_eq!(
		resolve(r#"["null", "int"]"#, r#"["long", "null"]"#, Value::Int(3)).unwrap(),
		Value::Long(3)
	);
	assert_eq!(
		resolve(r#""string""#, r#"["null", "long"]"#, "a".into())
			.unwrap_err()
			.kind(),
		ErrorKind::SchemaMismatch
	);
}

#[test]
fn named_types_must_agree() {
	let fixed = |name: &str, size: usize| format!(r#"{{"type": "fixed", "name": "{name}", "size": {size}}}"#);
	assert_eq!(
		resolve(&fixed("F", 2), &fixed("F", 2), Value::Fixed(vec![1, 2])).unwrap(),
		Value::Fixed(vec![1, 2])
	);
	assert!(resolve(&fixed("F", 2), &fixed("G", 2), Value::Fixed(vec![1, 2])).is_err());
	assert!(resolve(&fixed("F", 2), &fixed("F", 3), Value::Fixed(vec![1, 2])).is_err());

	let writer_enum = r#"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"#;
	let reader_enum = r#"{"type": "enum", "name": "E", "symbols": ["B", "A", "C"]}"#;
	assert_eq!(
		resolve(writer_enum, reader_enum, Value::Enum("B".to_owned())).unwrap(),
		Value::Enum("B".to_owned())
	);
	// Symbols are not checked against the reader enum
	assert_eq!(
		resolve(
			writer_enum,
			r#"{"type": "enum", "name": "E", "symbols": ["A"]}"#,
			Value::Enum("B".to_owned())
		)
		.unwrap(),
		Value::Enum("B".to_owned())
	);
}

#[test]
fn nested_collections() {
	assert_eq!(
		resolve(
			r#"{"type": "map", "values": {"type": "array", "items": "int"}}"#,
			r#"{"type": "map", "values": {"type": "array", "items": "double"}}"#,
			Value::Map(vec![("k".to_owned(), Value::Array(vec![Value::Int(1)]))]),
		)
		.unwrap(),
		Value::Map(vec![("k".to_owned(), Value::Array(vec![Value::Double(1.)]))])
	);
	assert!(resolve(
		r#"{"type": "array", "items": "int"}"#,
		r#"{"type": "map", "values": "int"}"#,
		Value::Array(vec![]),
	)
	.is_err());
}

#[test]
fn schema_matching() {
	assert!(matches(&WRITER_AB, &READER_AC));
	let long: Schema = r#""long""#.parse().unwrap();
	let int: Schema = r#""int""#.parse().unwrap();
	assert!(matches(&int, &long));
	assert!(!matches(&long, &int));
	assert!(!matches(&WRITER_AB, &long));
}

#[test]
fn default_materialization() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "bytes", "type": "bytes" },
			{ "name": "fixed", "type": { "type": "fixed", "name": "F", "size": 2 } },
			{ "name": "union", "type": ["null", "string"] },
			{ "name": "enum", "type": { "type": "enum", "name": "E", "symbols": ["A"] } },
			{ "name": "map", "type": { "type": "map", "values": "float" } },
			{ "name": "defaulted", "type": "int", "default": 9 }
		]
	}"#
	.parse()
	.unwrap();
	assert_eq!(
		materialize_default(
			&schema,
			SchemaKey::root(),
			&json!({
				"bytes": "\u{00ff}a",
				"fixed": "zz",
				"union": null,
				"enum": "A",
				"map": {"x": 1}
			})
		)
		.unwrap(),
		Value::Record(vec![
			("bytes".to_owned(), Value::Bytes(vec![0xff, b'a'])),
			("fixed".to_owned(), Value::Fixed(b"zz".to_vec())),
			("union".to_owned(), Value::Null),
			("enum".to_owned(), Value::Enum("A".to_owned())),
			("map".to_owned(), Value::Map(vec![("x".to_owned(), Value::Float(1.))])),
			("defaulted".to_owned(), Value::Int(9)),
		])
	);

	let writer: Schema = r#"{"type": "record", "name": "R", "fields": []}"#.parse().unwrap();

	// Enum and fixed defaults are taken as written
	let reader: Schema = r#"{"type": "record", "name": "R", "fields": [
		{"name": "e", "type": {"type": "enum", "name": "E", "symbols": ["A"]}, "default": "Z"},
		{"name": "f", "type": {"type": "fixed", "name": "F", "size": 4}, "default": "ab"},
		{"name": "i", "type": "int", "default": 5.0}
	]}"#
	.parse()
	.unwrap();
	assert_eq!(
		from_datum_slice_resolved(&[], &writer, &reader).unwrap(),
		Value::Record(vec![
			("e".to_owned(), Value::Enum("Z".to_owned())),
			("f".to_owned(), Value::Fixed(b"ab".to_vec())),
			("i".to_owned(), Value::Int(5)),
		])
	);

	// A default of the wrong JSON kind is only detected when needed
	let reader: Schema = r#"{"type": "record", "name": "R", "fields": [
		{"name": "i", "type": "int", "default": "five"}
	]}"#
	.parse()
	.unwrap();
	assert_eq!(
		from_datum_slice_resolved(&[], &writer, &reader).unwrap_err().kind(),
		ErrorKind::SchemaMismatch
	);
}
