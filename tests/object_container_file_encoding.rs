//! Reading files written by other implementations, and writing files that read
//! back to the same values

use avro_dynamic::{
	from_datum_slice,
	object_container_file_encoding::{
		write_all, Compression, CompressionCodec, Reader, Writer, WriterBuilder,
	},
	ErrorKind, Schema, Value,
};

use {lazy_static::lazy_static, pretty_assertions::assert_eq, std::io::Cursor};

const SCHEMA: &str = r#"
    {
      "type": "record",
      "name": "test",
      "fields": [
        {
          "name": "a",
          "type": "long",
          "default": 42
        },
        {
          "name": "b",
          "type": "string"
        }
      ]
    }
    "#;
const UNION_SCHEMA: &str = r#"["null", "long"]"#;
/// A file holding two `test` records, with the null codec
const ENCODED: &[u8] = &[
	79u8, 98u8, 106u8, 1u8, 4u8, 22u8, 97u8, 118u8, 114u8, 111u8, 46u8, 115u8, 99u8, 104u8, 101u8, 109u8, 97u8, 222u8,
	1u8, 123u8, 34u8, 116u8, 121u8, 112u8, 101u8, 34u8, 58u8, 34u8, 114u8, 101u8, 99u8, 111u8, 114u8, 100u8, 34u8,
	44u8, 34u8, 110u8, 97u8, 109u8, 101u8, 34u8, 58u8, 34u8, 116u8, 101u8, 115u8, 116u8, 34u8, 44u8, 34u8, 102u8,
	105u8, 101u8, 108u8, 100u8, 115u8, 34u8, 58u8, 91u8, 123u8, 34u8, 110u8, 97u8, 109u8, 101u8, 34u8, 58u8, 34u8,
	97u8, 34u8, 44u8, 34u8, 116u8, 121u8, 112u8, 101u8, 34u8, 58u8, 34u8, 108u8, 111u8, 110u8, 103u8, 34u8, 44u8, 34u8,
	100u8, 101u8, 102u8, 97u8, 117u8, 108u8, 116u8, 34u8, 58u8, 52u8, 50u8, 125u8, 44u8, 123u8, 34u8, 110u8, 97u8,
	109u8, 101u8, 34u8, 58u8, 34u8, 98u8, 34u8, 44u8, 34u8, 116u8, 121u8, 112u8, 101u8, 34u8, 58u8, 34u8, 115u8, 116u8,
	114u8, 105u8, 110u8, 103u8, 34u8, 125u8, 93u8, 125u8, 20u8, 97u8, 118u8, 114u8, 111u8, 46u8, 99u8, 111u8, 100u8,
	101u8, 99u8, 8u8, 110u8, 117u8, 108u8, 108u8, 0u8, 94u8, 61u8, 54u8, 221u8, 190u8, 207u8, 108u8, 180u8, 158u8,
	57u8, 114u8, 40u8, 173u8, 199u8, 228u8, 239u8, 4u8, 20u8, 54u8, 6u8, 102u8, 111u8, 111u8, 84u8, 6u8, 98u8, 97u8,
	114u8, 94u8, 61u8, 54u8, 221u8, 190u8, 207u8, 108u8, 180u8, 158u8, 57u8, 114u8, 40u8, 173u8, 199u8, 228u8, 239u8,
];

lazy_static! {
	static ref MEMBER_SCHEMA: Schema = r#"
	{
		"type": "record",
		"name": "member",
		"fields": [
			{ "name": "__int", "type": "int" },
			{ "name": "__long", "type": "long" },
			{ "name": "__double", "type": "double" },
			{ "name": "__string", "type": "string" },
			{ "name": "__bytes", "type": "bytes" },
			{ "name": "__enum", "type": { "type": "enum", "name": "__enum", "symbols": ["__ENUM__"] } },
			{ "name": "__map", "type": { "type": "map", "values": "long" } },
			{ "name": "__fixed", "type": { "type": "fixed", "name": "__fixed", "size": 16 } },
			{ "name": "__array", "type": { "type": "array", "items": "long" } }
		]
	}"#
	.parse()
	.unwrap();
	static ref MEMBER: Value = Value::Record(vec![
		("__int".to_owned(), Value::Int(1000)),
		("__long".to_owned(), Value::Long(100000000)),
		("__double".to_owned(), Value::Double(99.99)),
		("__string".to_owned(), "TEST".into()),
		("__bytes".to_owned(), Value::Bytes(vec![0; 5])),
		("__enum".to_owned(), Value::Enum("__ENUM__".to_owned())),
		("__map".to_owned(), Value::Map(vec![("value".to_owned(), Value::Long(1))])),
		("__fixed".to_owned(), Value::Fixed(b"AAAAAAAAAAAAAAAA".to_vec())),
		(
			"__array".to_owned(),
			Value::Array(vec![Value::Long(1), Value::Long(2), Value::Long(3)])
		),
	]);
}

fn test_record(a: i64, b: &str) -> Value {
	Value::Record(vec![("a".to_owned(), Value::Long(a)), ("b".to_owned(), b.into())])
}

#[test]
fn test_from_avro_datum() {
	let schema: Schema = SCHEMA.parse().unwrap();
	let encoded: &'static [u8] = &[54, 6, 102, 111, 111];

	assert_eq!(from_datum_slice(encoded, &schema).unwrap(), test_record(27, "foo"));
}

#[test]
fn test_null_union() {
	let schema: Schema = UNION_SCHEMA.parse().unwrap();
	let encoded: &'static [u8] = &[2, 0];

	assert_eq!(from_datum_slice(encoded, &schema).unwrap(), Value::Long(0));
}

#[test]
fn test_reader_iterator() {
	let reader = Reader::from_slice(ENCODED).unwrap();
	assert_eq!(reader.codec(), CompressionCodec::Null);
	assert_eq!(
		reader.schema().json(),
		r#"{"type":"record","name":"test","fields":[{"name":"a","type":"long","default":42},{"name":"b","type":"string"}]}"#
	);
	assert_eq!(reader.user_metadata("avro.schema"), None);

	let res: Vec<Value> = reader.collect::<Result<_, _>>().unwrap();
	assert_eq!(res, [test_record(27, "foo"), test_record(42, "bar")]);
}

#[test]
fn test_reader_with_reader_schema() {
	let reader_schema: Schema = r#"
	{
		"type": "record",
		"name": "test",
		"fields": [
			{ "name": "b", "type": "string" },
			{ "name": "c", "type": ["string", "null"], "default": "none" }
		]
	}"#
	.parse()
	.unwrap();
	let res: Vec<Value> = Reader::from_slice(ENCODED)
		.unwrap()
		.with_reader_schema(reader_schema)
		.collect::<Result<_, _>>()
		.unwrap();
	let expected = |b: &str| {
		Value::Record(vec![
			("b".to_owned(), b.into()),
			("c".to_owned(), "none".into()),
		])
	};
	assert_eq!(res, [expected("foo"), expected("bar")]);
}

#[test]
fn test_reader_incompatible_reader_schema() {
	let reader_schema: Schema = r#"{"type": "enum", "name": "test", "symbols": ["A"]}"#.parse().unwrap();
	let mut reader = Reader::from_slice(ENCODED).unwrap().with_reader_schema(reader_schema);
	assert_eq!(reader.next().unwrap().unwrap_err().kind(), ErrorKind::SchemaMismatch);
	// The error is yielded only once
	assert!(reader.next().is_none());
}

#[test]
fn test_reader_invalid_header() {
	let invalid = &ENCODED[1..];
	assert_eq!(Reader::from_slice(invalid).err().unwrap().kind(), ErrorKind::Data);
}

#[test]
fn test_reader_invalid_block() {
	let invalid = &ENCODED[0..(ENCODED.len() - 19)];
	let reader = Reader::from_slice(invalid).unwrap();
	let res: Result<Vec<Value>, _> = reader.collect();
	assert_eq!(res.unwrap_err().kind(), ErrorKind::Io);
}

#[test]
fn test_reader_empty_buffer() {
	let empty: &[u8] = &[];
	assert_eq!(Reader::from_slice(empty).err().unwrap().kind(), ErrorKind::Data);
}

#[test]
fn test_reader_only_header() {
	let only_header = &ENCODED[..163];
	let reader = Reader::from_slice(only_header).unwrap();
	assert_eq!(reader.count(), 0);

	let truncated_block_header = &ENCODED[..165];
	let reader = Reader::from_slice(truncated_block_header).unwrap();
	let res: Result<Vec<Value>, _> = reader.collect();
	assert!(res.is_err());
}

#[test]
fn test_reader_rewind() {
	let mut reader = Reader::from_slice(ENCODED).unwrap();
	assert_eq!(reader.next().unwrap().unwrap(), test_record(27, "foo"));
	reader.rewind().unwrap();
	assert_eq!(reader.count(), 2);
}

#[test]
fn test_reader_starts_from_the_beginning_of_the_stream() {
	let mut cursor = Cursor::new(ENCODED);
	cursor.set_position(50);
	let reader = Reader::new(cursor).unwrap();
	let res: Vec<Value> = reader.collect::<Result<_, _>>().unwrap();
	assert_eq!(res, [test_record(27, "foo"), test_record(42, "bar")]);
}

#[cfg(not(feature = "snappy"))]
#[test]
fn test_read_not_enabled_codec() {
	let snappy_compressed_avro: &[u8] = &[
		79, 98, 106, 1, 4, 22, 97, 118, 114, 111, 46, 115, 99, 104, 101, 109, 97, 210, 1, 123, 34, 102, 105, 101, 108,
		100, 115, 34, 58, 91, 123, 34, 110, 97, 109, 101, 34, 58, 34, 110, 117, 109, 34, 44, 34, 116, 121, 112, 101,
		34, 58, 34, 115, 116, 114, 105, 110, 103, 34, 125, 93, 44, 34, 110, 97, 109, 101, 34, 58, 34, 101, 118, 101,
		110, 116, 34, 44, 34, 110, 97, 109, 101, 115, 112, 97, 99, 101, 34, 58, 34, 101, 120, 97, 109, 112, 108, 101,
		110, 97, 109, 101, 115, 112, 97, 99, 101, 34, 44, 34, 116, 121, 112, 101, 34, 58, 34, 114, 101, 99, 111, 114,
		100, 34, 125, 20, 97, 118, 114, 111, 46, 99, 111, 100, 101, 99, 12, 115, 110, 97, 112, 112, 121, 0, 213, 209,
		241, 208, 200, 110, 164, 47, 203, 25, 90, 235, 161, 167, 195, 177, 2, 20, 4, 12, 6, 49, 50, 51, 115, 38, 58, 0,
		213, 209, 241, 208, 200, 110, 164, 47, 203, 25, 90, 235, 161, 167, 195, 177,
	];

	let reader = Reader::from_slice(snappy_compressed_avro).unwrap();
	assert_eq!(reader.codec(), CompressionCodec::Snappy);
	let err = reader.collect::<Result<Vec<Value>, _>>().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Data);
	assert_eq!(
		err.to_string(),
		"The snappy codec requires the `snappy` feature of this crate, which is not enabled"
	);
}

fn round_trip_writer(compression: Compression, approx_block_size: u32) {
	let schema: Schema = SCHEMA.parse().unwrap();
	let input: Vec<Value> = (0..1000).map(|i| test_record(i, &"hello".repeat(i as usize % 7))).collect();

	let mut writer = WriterBuilder::new(schema)
		.compression(compression)
		.approx_block_size(approx_block_size)
		.build(Vec::new())
		.unwrap();
	writer.append_all(&input).unwrap();
	let serialized = writer.into_inner().unwrap();

	let reader = Reader::from_slice(&serialized).unwrap();
	assert_eq!(reader.codec(), compression.codec());
	let output: Vec<Value> = reader.collect::<Result<_, _>>().unwrap();
	assert_eq!(input, output);
}

#[test]
fn test_writer_no_compression_regular_block_size() {
	round_trip_writer(Compression::Null, 64_000);
}

#[test]
fn test_writer_no_compression_small_block_size() {
	round_trip_writer(Compression::Null, 1);
}

#[cfg(feature = "snappy")]
#[test]
fn test_writer_snappy() {
	round_trip_writer(Compression::Snappy, 64_000);
	round_trip_writer(Compression::Snappy, 1);
}

#[cfg(feature = "deflate")]
#[test]
fn test_writer_deflate() {
	use avro_dynamic::object_container_file_encoding::CompressionLevel;

	round_trip_writer(
		Compression::Deflate {
			level: CompressionLevel::default(),
		},
		64_000,
	);
	round_trip_writer(
		Compression::Deflate {
			level: CompressionLevel::new(1),
		},
		1,
	);
	round_trip_writer(
		Compression::Deflate {
			level: CompressionLevel::new(200),
		},
		1024,
	);
}

#[cfg(feature = "deflate")]
#[test]
fn member_record_round_trips_through_deflate_file() {
	let file = write_all(
		&MEMBER_SCHEMA,
		Compression::Deflate {
			level: Default::default(),
		},
		Vec::new(),
		[&*MEMBER],
	)
	.unwrap();

	let read: Vec<Value> = Reader::from_slice(&file)
		.unwrap()
		.collect::<Result<_, _>>()
		.unwrap();
	assert_eq!(read, [MEMBER.clone()]);
}

#[cfg(feature = "snappy")]
#[test]
fn snappy_checksum_mismatch_yields_no_record_of_the_block() {
	let sync_marker = [7; 16];
	let mut file = WriterBuilder::new(MEMBER_SCHEMA.clone())
		.compression(Compression::Snappy)
		.sync_marker(sync_marker)
		.build(Vec::new())
		.unwrap();
	file.append(&MEMBER).unwrap();
	let mut file = file.into_inner().unwrap();

	// The CRC is right before the trailing sync marker
	let crc_end = file.len() - sync_marker.len();
	file[crc_end - 1] ^= 0xff;

	let mut reader = Reader::from_slice(&file).unwrap();
	let err = reader.next().unwrap().unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Data);
	assert!(reader.next().is_none());
}

#[test]
fn header_carries_user_metadata_and_sync_marker() {
	let sync_marker = *b"0123456789abcdef";
	let file = WriterBuilder::new(MEMBER_SCHEMA.clone())
		.sync_marker(sync_marker)
		.user_metadata("producer", "tests")
		.build(Vec::new())
		.unwrap()
		.into_inner()
		.unwrap();

	let reader = Reader::from_slice(&file).unwrap();
	assert_eq!(reader.sync_marker(), &sync_marker);
	assert_eq!(reader.user_metadata("producer"), Some(&b"tests"[..]));
	assert_eq!(reader.schema().json(), MEMBER_SCHEMA.json());
	// No block was written: there's no data after the header
	assert!(file.ends_with(&sync_marker));
	assert_eq!(reader.count(), 0);
}

#[test]
fn reserved_user_metadata_is_rejected() {
	let err = WriterBuilder::new(MEMBER_SCHEMA.clone())
		.user_metadata("avro.codec", "null")
		.build(Vec::new())
		.err()
		.unwrap();
	assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn invalid_value_leaves_no_trace_in_the_file() {
	let schema: Schema = SCHEMA.parse().unwrap();
	let mut writer = WriterBuilder::new(schema).build(Vec::new()).unwrap();
	writer.append(&test_record(1, "a")).unwrap();
	let err = writer.append(&Value::Record(vec![("a".to_owned(), Value::Boolean(true))])).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Type);
	writer.append(&test_record(2, "b")).unwrap();

	let file = writer.into_inner().unwrap();
	let read: Vec<Value> = Reader::from_slice(&file).unwrap().collect::<Result<_, _>>().unwrap();
	assert_eq!(read, [test_record(1, "a"), test_record(2, "b")]);
}

#[test]
fn append_mode_adds_blocks_after_existing_ones() -> anyhow::Result<()> {
	let schema: Schema = SCHEMA.parse()?;
	let mut file = Cursor::new(write_all(
		&schema,
		Compression::Null,
		Vec::new(),
		[test_record(1, "first")],
	)?);

	let mut writer = Writer::append_to(&mut file, None)?;
	assert_eq!(writer.schema().json(), schema.json());
	writer.append(&test_record(2, "second"))?;
	writer.into_inner()?;

	// Appending with a codec that differs from the one of the file fails
	assert_eq!(
		Writer::append_to(&mut file, Some(CompressionCodec::Snappy))
			.err()
			.map(|e| e.kind()),
		Some(ErrorKind::Data)
	);

	let read: Vec<Value> = Reader::from_slice(file.get_ref())?.collect::<Result<_, _>>()?;
	assert_eq!(read, [test_record(1, "first"), test_record(2, "second")]);
	Ok(())
}
