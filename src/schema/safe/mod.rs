//! Defines the editable counterpart of the [`Schema`](crate::Schema), which
//! is used for its initialization

mod check_invariants;
mod extra_attributes;
mod parsing;
mod serialize;

use super::{Name, SchemaError};

pub(crate) use extra_attributes::ExtraAttributes;
pub use extra_attributes::JsonValue;

use extra_attributes::extra_attributes;

/// An editable representation of an Avro schema
///
/// In there, references to other nodes are represented as [`SchemaKey`], which
/// allow to index into [`SchemaMut`].
///
/// It is represented this way because, due to how referencing via
/// [Names](https://avro.apache.org/docs/current/specification/#names) works in Avro,
/// a named type may refer to itself (e.g. a linked list record). Children are
/// owned by the arena, not by their parent node, so the ownership structure
/// stays acyclic while the logical structure may recurse.
///
/// Turn it into a [`Schema`](crate::Schema) via [`freeze`](Self::freeze) to use
/// it for encoding or decoding.
#[derive(Clone, Debug)]
pub struct SchemaMut {
	// First node in the array is considered to be the root
	pub(super) nodes: Vec<SchemaNode>,
}

impl SchemaMut {
	/// Obtain the underlying graph storage
	///
	/// The first node (index `0`) is the root of the schema.
	///
	/// [`SchemaKey`]s can be converted to indexes of this `Vec`.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// Obtain the underlying graph storage mutably
	///
	/// The first node (index `0`) is the root of the schema.
	///
	/// [`SchemaKey`]s can be converted to/from indexes of this `Vec`.
	pub fn nodes_mut(&mut self) -> &mut Vec<SchemaNode> {
		&mut self.nodes
	}

	/// Initialize a [`SchemaMut`] from a set of nodes.
	///
	/// The first node (index `0`) is the root of the schema.
	pub fn from_nodes(nodes: Vec<SchemaNode>) -> Self {
		Self { nodes }
	}

	/// Turn this [`SchemaMut`] into a [`Schema`](crate::Schema)
	///
	/// This validates every structural invariant (union branches, enum symbols,
	/// unique field names, key validity...) and computes the schema JSON.
	pub fn freeze(self) -> Result<super::Schema, SchemaError> {
		self.check_invariants()?;
		let json = self.serialize_to_json()?;
		Ok(super::Schema {
			nodes: self.nodes,
			json,
		})
	}

	/// Try to get the node at the given [`SchemaKey`]
	///
	/// (or return `None` if the key is invalid)
	pub fn get(&self, key: SchemaKey) -> Option<&SchemaNode> {
		self.nodes.get(key.idx)
	}
}

/// The location of a node in a [`SchemaMut`] or [`Schema`](crate::Schema)
///
/// This can be used to [`Index`](std::ops::Index) into either.
///
/// (Note that `Index`ing with an invalid index would cause a panic.)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaKey {
	pub(crate) idx: usize,
}

impl SchemaKey {
	/// Construct a new SchemaKey
	///
	/// This is expected to be an index in the [`nodes`](SchemaMut::nodes_mut)
	/// `Vec` of a [`SchemaMut`].
	pub const fn from_idx(idx: usize) -> Self {
		Self { idx }
	}
	/// Obtain the index in the [`nodes`](SchemaMut::nodes) `Vec` that this
	/// [`SchemaKey`] points to.
	pub const fn idx(self) -> usize {
		self.idx
	}
	/// The root of the schema, that is, the first element of the `nodes` array
	pub const fn root() -> Self {
		Self { idx: 0 }
	}
}
impl std::ops::Index<SchemaKey> for SchemaMut {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &Self::Output {
		&self.nodes[key.idx]
	}
}
impl std::fmt::Debug for SchemaKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.idx, f)
	}
}

/// A node of an avro schema
///
/// More information about Avro schemas can be found in the
/// [Avro Specification](https://avro.apache.org/docs/current/specification/).
#[derive(Clone, Debug)]
pub struct SchemaNode {
	/// The actual type of this node
	pub type_: RegularType,
	/// The logical type this node is annotated with, if any
	///
	/// Logical types are carried along but do not change how values are
	/// encoded or decoded.
	pub logical_type: Option<LogicalType>,
	pub(crate) extra_attributes: ExtraAttributes,
	/// Primitive types may be written either as `"int"` or as
	/// `{"type": "int"}`. This remembers which one was parsed.
	pub(crate) object_form: bool,
}
extra_attributes!(SchemaNode);

impl SchemaNode {
	/// A node of the given type, without logical type or extra attributes
	pub fn new(type_: impl Into<RegularType>) -> Self {
		Self {
			type_: type_.into(),
			logical_type: None,
			extra_attributes: ExtraAttributes::default(),
			object_form: false,
		}
	}

	/// Annotate this node with a logical type
	pub fn with_logical_type(mut self, logical_type: LogicalType) -> Self {
		self.logical_type = Some(logical_type);
		self
	}
}

/// A primitive or complex type of an avro schema, stored in a [`SchemaNode`].
///
/// More information about Avro schemas can be found in the
/// [Avro Specification](https://avro.apache.org/docs/current/specification/).
///
/// In there, references to other nodes are represented as [`SchemaKey`], which
/// allow to index into [`SchemaMut`].
#[derive(Clone, Debug)]
pub enum RegularType {
	/// A `null` Avro schema.
	Null,
	/// A `boolean` Avro schema.
	Boolean,
	/// An `int` Avro schema.
	Int,
	/// A `long` Avro schema.
	Long,
	/// A `float` Avro schema.
	Float,
	/// A `double` Avro schema.
	Double,
	/// A `bytes` Avro schema.
	/// `Bytes` represents a sequence of 8-bit unsigned bytes.
	Bytes,
	/// A `string` Avro schema.
	/// `String` represents a unicode character sequence.
	String,
	/// A `array` Avro schema. Avro arrays are required to have the same type
	/// for each element. This variant holds the `Schema` for the array element
	/// type.
	Array(Array),
	/// A `map` Avro schema.
	/// `Map` holds a pointer to the `Schema` of its values, which must all be
	/// the same schema. `Map` keys are assumed to be `string`.
	Map(Map),
	/// A `union` Avro schema.
	///
	/// When encoding, the first variant that accepts the value is picked.
	Union(Union),
	/// A `record`, `error` or `request` Avro schema.
	Record(Record),
	/// An `enum` Avro schema.
	Enum(Enum),
	/// A `fixed` Avro schema.
	Fixed(Fixed),
}

impl RegularType {
	/// The type name, as it appears in the `type` attribute of the schema JSON
	pub fn type_name(&self) -> &'static str {
		match self {
			RegularType::Null => "null",
			RegularType::Boolean => "boolean",
			RegularType::Int => "int",
			RegularType::Long => "long",
			RegularType::Float => "float",
			RegularType::Double => "double",
			RegularType::Bytes => "bytes",
			RegularType::String => "string",
			RegularType::Array(_) => "array",
			RegularType::Map(_) => "map",
			RegularType::Union(_) => "union",
			RegularType::Record(record) => record.kind.type_name(),
			RegularType::Enum(_) => "enum",
			RegularType::Fixed(_) => "fixed",
		}
	}

	/// The name of this type, if it is a named type
	pub fn name(&self) -> Option<&Name> {
		match self {
			RegularType::Record(Record { name, .. })
			| RegularType::Enum(Enum { name, .. })
			| RegularType::Fixed(Fixed { name, .. }) => Some(name),
			_ => None,
		}
	}
}

impl std::fmt::Display for RegularType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.name() {
			None => f.write_str(self.type_name()),
			Some(name) => write!(f, "{} {}", self.type_name(), name),
		}
	}
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug)]
pub struct Array {
	/// The key (in the [`SchemaMut`]) of the schema of each item that will be
	/// in the array
	pub items: SchemaKey,
	pub(crate) _private: (),
}
impl Array {
	/// `items` is the key (in the [`SchemaMut`]) of the schema of each item
	/// that will be in the array
	pub fn new(items: SchemaKey) -> Self {
		Self {
			items,
			_private: (),
		}
	}
}

/// Component of a [`SchemaMut`]
///
/// An Avro map is a collection of key-value pairs, where the keys are assumed
/// to be strings.
#[derive(Clone, Debug)]
pub struct Map {
	/// The key (in the [`SchemaMut`]) of the schema of each value that will be
	/// in the map
	pub values: SchemaKey,
	pub(crate) _private: (),
}
impl Map {
	/// `values` is the key (in the [`SchemaMut`]) of the schema of each value
	/// that will be in the map
	pub fn new(values: SchemaKey) -> Self {
		Self {
			values,
			_private: (),
		}
	}
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug)]
pub struct Union {
	/// The keys (in the [`SchemaMut`]) of the schemas of each variant that
	/// this Avro *union* supports.
	///
	/// A variant may not itself be a union, and there may be at most one
	/// variant per unnamed type.
	pub variants: Vec<SchemaKey>,
	pub(crate) _private: (),
}
impl Union {
	/// `variants` is the keys (in the [`SchemaMut`]) of the schemas of each
	/// variant that this Avro *union* supports.
	pub fn new(variants: Vec<SchemaKey>) -> Self {
		Self {
			variants,
			_private: (),
		}
	}
}

/// Which flavor of record a [`Record`] is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
	/// `"type": "record"`
	Record,
	/// `"type": "error"`, used to declare protocol errors. Encoded exactly
	/// like a record.
	Error,
	/// The parameters of a protocol message. Encoded exactly like a record,
	/// but serialized in JSON as the bare list of its fields.
	Request,
}
impl RecordKind {
	fn type_name(self) -> &'static str {
		match self {
			RecordKind::Record => "record",
			RecordKind::Error => "error",
			RecordKind::Request => "request",
		}
	}
}

/// Component of a [`SchemaMut`]
///
/// An avro `record` is ~equivalent to a Rust struct.
#[derive(Clone, Debug)]
pub struct Record {
	/// The list of fields in this *record* (~= `struct`)
	pub fields: Vec<RecordField>,
	/// The name of the record (including namespace)
	pub name: Name,
	/// Whether this is a `record`, an `error` or a `request`
	pub kind: RecordKind,
	/// Documentation of this record
	pub doc: Option<String>,
	pub(crate) _private: (),
}
impl Record {
	/// `name` is the name of the record (including namespace), and `fields` is
	/// the list of fields in this record.
	pub fn new(name: Name, fields: Vec<RecordField>) -> Self {
		Self {
			fields,
			name,
			kind: RecordKind::Record,
			doc: None,
			_private: (),
		}
	}

	/// The parameters of a protocol message
	pub fn new_request(name: Name, fields: Vec<RecordField>) -> Self {
		Self {
			kind: RecordKind::Request,
			..Self::new(name, fields)
		}
	}

	/// Look up a field by name
	pub fn field(&self, name: &str) -> Option<(usize, &RecordField)> {
		self.fields
			.iter()
			.enumerate()
			.find(|(_, field)| field.name == name)
	}
}

/// Sort order of a [`RecordField`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde_derive::Deserialize, serde_derive::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOrder {
	/// `"order": "ascending"`
	Ascending,
	/// `"order": "descending"`
	Descending,
	/// `"order": "ignore"`
	Ignore,
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug)]
pub struct RecordField {
	/// Name of the field
	pub name: String,
	/// The key (in the [`SchemaMut`]) of the schema of the type of this field
	pub type_: SchemaKey,
	/// Default value, as it appears in the schema JSON
	///
	/// It is only turned into a [`Value`](crate::Value) of the field's type when
	/// it is needed (schema resolution, or encoding a record where the field is
	/// absent).
	pub default: Option<JsonValue>,
	/// Sort order of the field
	pub order: Option<FieldOrder>,
	/// Documentation of the field
	pub doc: Option<String>,
	/// `precision` attribute of the field
	pub precision: Option<usize>,
	/// `scale` attribute of the field
	pub scale: Option<u32>,
	pub(crate) extra_attributes: ExtraAttributes,
	pub(crate) _private: (),
}
extra_attributes!(RecordField);
impl RecordField {
	/// `schema` is the key (in the [`SchemaMut`]) of the schema of the type of
	/// this field.
	pub fn new(name: impl Into<String>, schema: SchemaKey) -> Self {
		Self {
			name: name.into(),
			type_: schema,
			default: None,
			order: None,
			doc: None,
			precision: None,
			scale: None,
			extra_attributes: ExtraAttributes::default(),
			_private: (),
		}
	}

	/// Set the default value of the field
	pub fn with_default(mut self, default: impl Into<JsonValue>) -> Self {
		self.default = Some(default.into());
		self
	}
}

/// Component of a [`SchemaMut`]
///
/// This is the ~equivalent of a Rust `enum` where none of the variants would
/// hold any inner value. (e.g. `enum Foo { Bar, Baz }`)
#[derive(Clone, Debug)]
pub struct Enum {
	/// All the variants of the enum (e.g. `["Bar", "Baz"]`)
	pub symbols: Vec<String>,
	/// The name of the enum (including namespace)
	pub name: Name,
	/// Documentation of this enum
	pub doc: Option<String>,
	pub(crate) _private: (),
}
impl Enum {
	/// `name` is the name of the enum (including namespace), and `symbols` is
	/// the list of variants of the enum.
	pub fn new(name: Name, symbols: Vec<String>) -> Self {
		Self {
			symbols,
			name,
			doc: None,
			_private: (),
		}
	}
}

/// Component of a [`SchemaMut`]
#[derive(Clone, Debug)]
pub struct Fixed {
	/// The size in bytes of the *fixed* type
	pub size: usize,
	/// The name of the *fixed* type, including the namespace
	pub name: Name,
	pub(crate) _private: (),
}
impl Fixed {
	/// `name` is name of the *fixed* type, including the namespace, `size` is
	/// the size in bytes of the fixed type
	pub fn new(name: Name, size: usize) -> Self {
		Self {
			size,
			name,
			_private: (),
		}
	}
}

/// Logical type
///
/// <https://avro.apache.org/docs/current/specification/#logical-types>
///
/// These are carried along with the schema but do not alter encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogicalType {
	/// Arbitrary-precision signed decimal number, annotating `bytes` or
	/// `fixed`
	Decimal(Decimal),
	/// A universally unique identifier, annotating a string.
	Uuid,
	/// Number of days since the unix epoch, annotating an `int`.
	Date,
	/// Milliseconds after midnight, annotating an `int`.
	TimeMillis,
	/// Microseconds after midnight, annotating a `long`.
	TimeMicros,
	/// Milliseconds since the unix epoch, annotating a `long`.
	TimestampMillis,
	/// Microseconds since the unix epoch, annotating a `long`.
	TimestampMicros,
	/// Months, days and milliseconds, annotating a `fixed` of size 12.
	Duration,
	/// A logical type that is not known to this library.
	///
	/// Prefer matching on [`as_str`](Self::as_str) if you need to recognize a
	/// specific one, as it may become a known variant in a later release.
	Unknown(String),
}

/// Component of a [`LogicalType`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decimal {
	/// The number of digits to the right of the decimal point
	pub scale: u32,
	/// The number of significant digits
	pub precision: usize,
	pub(crate) _private: (),
}
impl Decimal {
	/// `scale` is the number of digits to the right of the decimal point, and
	/// `precision` is the number of significant digits in the number.
	pub fn new(scale: u32, precision: usize) -> Self {
		Self {
			precision,
			scale,
			_private: (),
		}
	}
}

impl LogicalType {
	/// The name of the logical type, as used in the `logicalType` attribute
	pub fn as_str(&self) -> &str {
		match self {
			LogicalType::Decimal(_) => "decimal",
			LogicalType::Uuid => "uuid",
			LogicalType::Date => "date",
			LogicalType::TimeMillis => "time-millis",
			LogicalType::TimeMicros => "time-micros",
			LogicalType::TimestampMillis => "timestamp-millis",
			LogicalType::TimestampMicros => "timestamp-micros",
			LogicalType::Duration => "duration",
			LogicalType::Unknown(name) => name,
		}
	}
}

impl From<RegularType> for SchemaNode {
	fn from(regular_type: RegularType) -> Self {
		Self::new(regular_type)
	}
}

macro_rules! impl_froms_for_regular_type {
	($($variant: ident)*) => {
		$(
			impl From<$variant> for RegularType {
				fn from(variant: $variant) -> Self {
					Self::$variant(variant)
				}
			}
			impl From<$variant> for SchemaNode {
				fn from(variant: $variant) -> Self {
					SchemaNode::new(RegularType::$variant(variant))
				}
			}
		)*
	};
}
impl_froms_for_regular_type! { Array Map Union Record Enum Fixed }
