use crate::schema::safe::{FieldOrder, JsonValue};

use serde::de::*;

pub(super) enum SchemaNode {
	Type(Type),
	Ref(String),
	Object(Box<SchemaNodeObject>),
	Union(Vec<SchemaNode>),
}

#[derive(serde_derive::Deserialize, serde_derive::Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub(super) enum Type {
	// Primitive types
	Null,
	Boolean,
	Int,
	Long,
	Float,
	Double,
	Bytes,
	String,
	// Complex types
	Array,
	Map,
	Record,
	Error,
	Enum,
	Fixed,
}

impl Type {
	pub(super) fn is_primitive(self) -> bool {
		matches!(
			self,
			Type::Null
				| Type::Boolean | Type::Int
				| Type::Long | Type::Float
				| Type::Double | Type::Bytes
				| Type::String
		)
	}
}

#[derive(serde_derive::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SchemaNodeObject {
	/// If there is a logical type, this can be a primitive type or type object
	/// but not a ComplexType, but if there is none it must be a ComplexType.
	#[serde(rename = "type")]
	pub(super) type_: SchemaNode,
	pub(super) logical_type: Option<String>,
	/// For named types
	pub(super) name: Option<String>,
	/// For named types
	pub(super) namespace: Option<String>,
	/// Reserved, recomputed from `name` and `namespace`
	#[allow(unused)]
	pub(super) fullname: Option<IgnoredAny>,
	pub(super) doc: Option<String>,
	/// For record type
	pub(super) fields: Option<Vec<Field>>,
	/// For enum type
	pub(super) symbols: Option<Vec<String>>,
	/// For array type
	pub(super) items: Option<SchemaNode>,
	/// For map type
	pub(super) values: Option<SchemaNode>,
	/// For fixed type
	pub(super) size: Option<usize>,
	/// For decimal logical type
	pub(super) precision: Option<JsonValue>,
	/// For decimal logical type
	pub(super) scale: Option<JsonValue>,
	#[serde(flatten)]
	pub(super) extra_attributes: serde_json::Map<String, JsonValue>,
}

#[derive(serde_derive::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Field {
	pub(super) name: Option<String>,
	#[serde(rename = "type")]
	pub(super) type_: Option<SchemaNode>,
	/// `"default": null` is a default, so it has to be distinguished from an
	/// absent default
	#[serde(default, deserialize_with = "deserialize_present")]
	pub(super) default: Option<JsonValue>,
	pub(super) order: Option<FieldOrder>,
	pub(super) doc: Option<String>,
	pub(super) precision: Option<JsonValue>,
	pub(super) scale: Option<JsonValue>,
	/// Also holds the type attributes (`symbols`, `size`...) when `type` is a
	/// bare complex type name
	#[serde(flatten)]
	pub(super) extra_attributes: serde_json::Map<String, JsonValue>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
	D: Deserializer<'de>,
{
	JsonValue::deserialize(deserializer).map(Some)
}

impl<'de> Deserialize<'de> for SchemaNode {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct SchemaNodeVisitor;
		impl<'de> Visitor<'de> for SchemaNodeVisitor {
			type Value = SchemaNode;

			fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
				write!(
					formatter,
					"A string (type) or an object with a `type` field or an array (union)"
				)
			}

			fn visit_map<A>(self, map: A) -> Result<Self::Value, A::Error>
			where
				A: MapAccess<'de>,
			{
				// That's an object.
				Ok(SchemaNode::Object(Deserialize::deserialize(
					serde::de::value::MapAccessDeserializer::new(map),
				)?))
			}

			fn visit_seq<A>(self, seq: A) -> Result<Self::Value, A::Error>
			where
				A: SeqAccess<'de>,
			{
				// That's a union.
				Ok(SchemaNode::Union(Deserialize::deserialize(
					serde::de::value::SeqAccessDeserializer::new(seq),
				)?))
			}

			fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
			where
				E: Error,
			{
				// That's a type right away, or a ref.
				Ok(
					match Type::deserialize(value::StrDeserializer::<FailedDeserialization>::new(v))
					{
						Ok(type_) => SchemaNode::Type(type_),
						Err(FailedDeserialization) => SchemaNode::Ref(v.to_owned()),
					},
				)
			}
		}
		deserializer.deserialize_any(SchemaNodeVisitor)
	}
}

#[derive(thiserror::Error, Debug)]
#[error("Failed to deserialize")]
struct FailedDeserialization;
impl Error for FailedDeserialization {
	fn custom<T: std::fmt::Display>(_msg: T) -> Self {
		FailedDeserialization
	}
}
