use avro_dynamic::{
	schema::{
		Decimal, Fixed, LogicalType, Name, RecordField, RecordKind, RegularType, SchemaKey, SchemaMut,
		SchemaNode, Union,
	},
	ErrorKind, Schema,
};

use pretty_assertions::assert_eq;

fn record_fields(schema: &Schema) -> &[RecordField] {
	match schema.root().type_ {
		RegularType::Record(ref record) => &record.fields,
		ref other => panic!("Expected a record, got {other}"),
	}
}

fn parse_err(schema: &str) -> String {
	match schema.parse::<Schema>() {
		Ok(schema) => panic!("Expected {schema:?} to be rejected"),
		Err(e) => e.to_string(),
	}
}

#[test]
fn forbids_zero_sized_cycles() {
	let schema = r#"
	{
		"type": "record",
		"name": "A",
		"fields": [
			{
				"name": "a",
				"type": {
					"type": "record",
					"name": "B",
					"fields": [
						{
							"name": "b",
							"type": "A"
						}
					]
				}
			}
		]
	}"#;
	assert!(schema.parse::<Schema>().is_err());
}

#[test]
fn recursive_types_through_unions_are_allowed() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "LinkedList",
		"namespace": "a",
		"fields": [
			{ "name": "value", "type": "long" },
			{ "name": "next", "type": ["null", "LinkedList"], "default": null }
		]
	}"#
	.parse()
	.unwrap();
	let next = record_fields(&schema)[1].type_;
	match schema[next].type_ {
		RegularType::Union(ref union) => assert_eq!(union.variants[1], SchemaKey::root()),
		ref other => panic!("Expected a union, got {other}"),
	}
}

#[test]
fn forward_references_resolve() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "A",
		"fields": [
			{ "name": "b", "type": "B" },
			{ "name": "c", "type": { "type": "fixed", "name": "B", "size": 2 } }
		]
	}"#
	.parse()
	.unwrap();
	let fields = record_fields(&schema);
	assert_eq!(fields[0].type_, fields[1].type_);
	assert!(matches!(schema[fields[0].type_].type_, RegularType::Fixed(Fixed { size: 2, .. })));

	assert!(parse_err(r#"{"type": "array", "items": "Unknown"}"#).contains("unknown reference"));
}

#[test]
fn namespaces_are_inherited() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "R",
		"namespace": "com.example",
		"fields": [
			{ "name": "e", "type": { "type": "enum", "name": "E", "symbols": ["A", "B"] } },
			{ "name": "f", "type": { "type": "fixed", "name": "other.F", "size": 1 } },
			{ "name": "g", "type": { "type": "fixed", "name": "G", "namespace": "", "size": 1 } },
			{ "name": "h", "type": "com.example.E" }
		]
	}"#
	.parse()
	.unwrap();
	let names: Vec<&str> = record_fields(&schema)
		.iter()
		.map(|field| {
			schema[field.type_]
				.type_
				.name()
				.map(Name::fully_qualified_name)
				.unwrap()
		})
		.collect();
	assert_eq!(names, ["com.example.E", "other.F", "G", "com.example.E"]);
	assert_eq!(
		schema.root().type_.name().unwrap().namespace(),
		Some("com.example")
	);
}

#[test]
fn name_resolution() {
	let name = Name::resolve("Foo", Some("a.b"), Some("ignored")).unwrap();
	assert_eq!(name.fully_qualified_name(), "a.b.Foo");
	assert_eq!(name.name(), "Foo");
	assert_eq!(name.namespace(), Some("a.b"));

	let name = Name::resolve("x.Foo", Some("a.b"), None).unwrap();
	assert_eq!(name.fully_qualified_name(), "x.Foo");

	let name = Name::resolve("Foo", None, Some("inherited")).unwrap();
	assert_eq!(name.fully_qualified_name(), "inherited.Foo");

	let name = Name::resolve("Foo", Some(""), Some("inherited")).unwrap();
	assert_eq!(name.fully_qualified_name(), "Foo");
	assert_eq!(name.namespace(), None);

	for invalid in ["", "1Foo", "Fo-o", "a..Foo", "a.Foo."] {
		assert!(Name::resolve(invalid, None, None).is_err(), "{invalid:?}");
	}
	assert!(Name::resolve("Foo", Some("a.1b"), None).is_err());
}

#[test]
fn field_typed_with_a_bare_complex_type_name() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "R",
		"fields": [
			{ "name": "md5", "type": "fixed", "size": 16 }
		]
	}"#
	.parse()
	.unwrap();
	let fields = record_fields(&schema);
	assert_eq!(fields[0].name, "md5");
	match schema[fields[0].type_].type_ {
		RegularType::Fixed(ref fixed) => {
			assert_eq!(fixed.name.fully_qualified_name(), "md5");
			assert_eq!(fixed.size, 16);
		}
		ref other => panic!("Expected a fixed, got {other}"),
	}
}

#[test]
fn structural_invariants_are_enforced() {
	assert!(parse_err(r#"{"type": "enum", "name": "E", "symbols": ["A", "A"]}"#).contains("A"));
	parse_err(
		r#"{"type": "record", "name": "R", "fields": [
			{"name": "a", "type": "int"},
			{"name": "a", "type": "long"}
		]}"#,
	);
	parse_err(r#"["int", ["long", "string"]]"#);
	parse_err(r#"["int", "string", "int"]"#);
	parse_err(
		r#"["null", {"type": "record", "name": "R", "fields": []}, {"type": "record", "name": "R", "fields": []}]"#,
	);
	parse_err(r#"{"type": "fixed", "name": "1F", "size": 4}"#);
	parse_err(r#"{"type": "fixed", "name": "F"}"#);
	parse_err(r#"{"type": "record", "name": "R"}"#);
	parse_err(r#"{"type": "array"}"#);
	parse_err(r#"{"type": "bytes", "logicalType": "decimal"}"#);
	parse_err(r#"{"type": "whatever"}"#);
	parse_err("not json");

	// Different named types of the same kind may be in the same union
	r#"[
		{"type": "fixed", "name": "A", "size": 1},
		{"type": "fixed", "name": "B", "size": 1}
	]"#
	.parse::<Schema>()
	.unwrap();
}

#[test]
fn schema_errors_convert_to_parse_errors() {
	let schema_error = "{".parse::<Schema>().unwrap_err();
	assert_eq!(avro_dynamic::Error::from(schema_error).kind(), ErrorKind::Parse);
}

#[test]
fn logical_types() {
	let schema: Schema = r#"{"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 2}"#
		.parse()
		.unwrap();
	assert_eq!(
		schema.root().logical_type,
		Some(LogicalType::Decimal(Decimal::new(2, 4)))
	);

	let schema: Schema = r#"{"type": "int", "logicalType": "date"}"#.parse().unwrap();
	assert_eq!(schema.root().logical_type, Some(LogicalType::Date));
	assert!(matches!(schema.root().type_, RegularType::Int));

	let schema: Schema = r#"{"type": "long", "logicalType": "nanoseconds", "scale": 3}"#
		.parse()
		.unwrap();
	assert_eq!(
		schema.root().logical_type.as_ref().map(LogicalType::as_str),
		Some("nanoseconds")
	);
	// Not consumed by the logical type: kept as is
	assert_eq!(
		schema.json(),
		r#"{"type":"long","logicalType":"nanoseconds","scale":3}"#
	);
}

#[test]
fn json_round_trips() {
	for (input, expected) in [
		(r#""int""#, r#""int""#),
		(r#"{"type": "int"}"#, r#"{"type":"int"}"#),
		(
			r#"{"type": "string", "avro.java.string": "String"}"#,
			r#"{"type":"string","avro.java.string":"String"}"#,
		),
		(r#"["null", "long"]"#, r#"["null","long"]"#),
		(
			r#"{"type": "map", "values": {"type": "array", "items": "bytes"}}"#,
			r#"{"type":"map","values":{"type":"array","items":"bytes"}}"#,
		),
		(
			r#"{"type": "fixed", "name": "F", "namespace": "n", "size": 4, "doc": "dropped"}"#,
			r#"{"type":"fixed","name":"n.F","size":4}"#,
		),
		(
			r#"{"type": "enum", "name": "E", "symbols": ["A", "B"], "doc": "kept"}"#,
			r#"{"type":"enum","name":"E","doc":"kept","symbols":["A","B"]}"#,
		),
		(
			r#"{"type": "error", "name": "Oops", "fields": [{"name": "m", "type": "string", "order": "descending"}]}"#,
			r#"{"type":"error","name":"Oops","fields":[{"name":"m","type":"string","order":"descending"}]}"#,
		),
	] {
		let schema: Schema = input.parse().unwrap();
		assert_eq!(schema.json(), expected);
		// Parsing the output again yields the same output
		assert_eq!(schema.json().parse::<Schema>().unwrap().json(), expected);
	}
}

#[test]
fn build_schema_programmatically() {
	let mut schema = SchemaMut::from_nodes(vec![
		SchemaNode::new(Union::new(vec![SchemaKey::from_idx(1), SchemaKey::from_idx(2)])),
		SchemaNode::new(RegularType::Null),
		SchemaNode::new(Fixed::new(Name::from_fully_qualified_name("a.Md5"), 16)),
	]);
	schema.nodes_mut().push(SchemaNode::new(RegularType::Int));
	let schema = schema.freeze().unwrap();
	assert_eq!(schema.json(), r#"["null",{"type":"fixed","name":"a.Md5","size":16}]"#);

	// Freezing validates invariants
	assert!(SchemaMut::from_nodes(vec![SchemaNode::new(Union::new(vec![
		SchemaKey::from_idx(7)
	]))])
	.freeze()
	.is_err());
}

#[test]
fn error_records() {
	let schema: Schema = r#"{"type": "error", "name": "E", "fields": []}"#.parse().unwrap();
	match schema.root().type_ {
		RegularType::Record(ref record) => assert_eq!(record.kind, RecordKind::Error),
		ref other => panic!("Expected an error record, got {other}"),
	}
}

#[test]
fn extra_attributes_keep_source_order() {
	let schema: Schema = r#"{"type": "fixed", "name": "F", "size": 4, "zeta": 1, "alpha": 2}"#
		.parse()
		.unwrap();
	assert_eq!(
		schema.json(),
		r#"{"type":"fixed","name":"F","size":4,"zeta":1,"alpha":2}"#
	);
	let keys: Vec<&str> = schema.root().extra_attributes().map(|(key, _)| key).collect();
	assert_eq!(keys, ["zeta", "alpha"]);

	// Also within JSON defaults
	let schema: Schema = r#"{"type": "record", "name": "R", "fields": [
		{"name": "m", "type": {"type": "map", "values": "int"}, "default": {"zeta": 1, "alpha": 2}}
	]}"#
	.parse()
	.unwrap();
	assert_eq!(
		schema.json(),
		r#"{"type":"record","name":"R","fields":[{"name":"m","type":{"type":"map","values":"int"},"default":{"zeta":1,"alpha":2}}]}"#
	);
}
