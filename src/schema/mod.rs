//! Navigate, build and parse the [`Schema`]

mod error;
mod name;
mod resolution;
mod safe;

pub use {
	error::SchemaError,
	name::Name,
	resolution::{materialize_default, matches, matches_nodes},
	safe::*,
};

pub(crate) use {name::is_valid_identifier, resolution::materialize_default_with_depth};

/// A validated, immutable Avro schema
///
/// Obtained either by parsing schema JSON:
/// ```
/// let schema: avro_dynamic::Schema = r#"{"type": "array", "items": "long"}"#
/// 	.parse()
/// 	.expect("Failed to parse schema");
/// assert_eq!(schema.json(), r#"{"type":"array","items":"long"}"#);
/// ```
/// or by [freezing](SchemaMut::freeze) a [`SchemaMut`].
///
/// Once built, a `Schema` is only ever read, so it may be shared (e.g. behind
/// an [`Arc`](std::sync::Arc)) by any number of encoders, decoders, and
/// object container file readers and writers.
#[derive(Clone)]
pub struct Schema {
	// First node in the array is considered to be the root
	pub(crate) nodes: Vec<SchemaNode>,
	pub(crate) json: String,
}

impl Schema {
	/// The root node of the schema
	pub fn root(&self) -> &SchemaNode {
		&self.nodes[0]
	}

	/// All the nodes of the schema. The root is at index `0`.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// Try to get the node at the given [`SchemaKey`]
	pub fn get(&self, key: SchemaKey) -> Option<&SchemaNode> {
		self.nodes.get(key.idx)
	}

	/// The JSON representation of the schema
	///
	/// This is what gets written in object container file headers. Extra
	/// attributes are preserved.
	pub fn json(&self) -> &str {
		&self.json
	}

	/// Turn the schema back into an editable [`SchemaMut`]
	pub fn into_mut(self) -> SchemaMut {
		SchemaMut::from_nodes(self.nodes)
	}
}

impl std::ops::Index<SchemaKey> for Schema {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &Self::Output {
		&self.nodes[key.idx]
	}
}

impl std::fmt::Debug for Schema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Schema").field(&self.json).finish()
	}
}

impl std::str::FromStr for Schema {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let safe_schema: SchemaMut = s.parse()?;
		safe_schema.freeze()
	}
}
