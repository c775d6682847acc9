use {super::*, crate::schema::is_valid_identifier};

use std::collections::{HashMap, HashSet};

impl SchemaMut {
	/// Check every structural invariant of the schema graph
	///
	/// The parser already enforces most of these, but a [`SchemaMut`] may also
	/// have been edited by hand.
	pub(crate) fn check_invariants(&self) -> Result<(), SchemaError> {
		if self.nodes.is_empty() {
			return Err(SchemaError::new("Schema must have at least one node (the root)"));
		}
		let check_key = |key: SchemaKey| {
			if key.idx >= self.nodes.len() {
				Err(SchemaError::msg(format_args!(
					"SchemaKey index {} is out of bounds (len: {})",
					key.idx,
					self.nodes.len()
				)))
			} else {
				Ok(())
			}
		};

		let mut names: HashMap<&str, usize> = HashMap::new();
		for (idx, node) in self.nodes.iter().enumerate() {
			if let Some(name) = node.type_.name() {
				if !name.fully_qualified_name().split('.').all(is_valid_identifier) {
					return Err(SchemaError::msg(format_args!("Invalid name: {name:?}")));
				}
				if names.insert(name.fully_qualified_name(), idx).is_some() {
					return Err(SchemaError::msg(format_args!(
						"The Schema contains duplicate definitions for {name}"
					)));
				}
			}
			match node.type_ {
				RegularType::Null
				| RegularType::Boolean
				| RegularType::Int
				| RegularType::Long
				| RegularType::Float
				| RegularType::Double
				| RegularType::Bytes
				| RegularType::String
				| RegularType::Fixed(_) => {}
				RegularType::Array(Array { items: key, .. })
				| RegularType::Map(Map { values: key, .. }) => check_key(key)?,
				RegularType::Union(ref union) => self.check_union(union, check_key)?,
				RegularType::Enum(ref enum_) => {
					let mut symbols = HashSet::new();
					for symbol in &enum_.symbols {
						if symbol.is_empty() {
							return Err(SchemaError::msg(format_args!(
								"Empty symbol in enum {}",
								enum_.name
							)));
						}
						if !symbols.insert(symbol.as_str()) {
							return Err(SchemaError::msg(format_args!(
								"Duplicate symbol {symbol:?} in enum {}",
								enum_.name
							)));
						}
					}
				}
				RegularType::Record(ref record) => {
					let mut field_names = HashSet::new();
					for field in &record.fields {
						check_key(field.type_)?;
						if !field_names.insert(field.name.as_str()) {
							return Err(SchemaError::msg(format_args!(
								"Duplicate field name {:?} in record {}",
								field.name, record.name
							)));
						}
					}
				}
			}
		}

		self.check_for_cycles()
	}

	fn check_union(
		&self,
		union: &Union,
		check_key: impl Fn(SchemaKey) -> Result<(), SchemaError>,
	) -> Result<(), SchemaError> {
		// Unnamed types are identified by their type name, named types by their
		// full name
		let mut seen = HashSet::new();
		for &variant in &union.variants {
			check_key(variant)?;
			let variant_type = &self.nodes[variant.idx].type_;
			let identity = match variant_type {
				RegularType::Union(_) => {
					return Err(SchemaError::new(
						"Unions may not immediately contain other unions",
					))
				}
				named @ (RegularType::Record(_) | RegularType::Enum(_) | RegularType::Fixed(_)) => {
					named.name().map_or("", |name| name.fully_qualified_name())
				}
				unnamed => unnamed.type_name(),
			};
			if !seen.insert(identity) {
				return Err(SchemaError::msg(format_args!(
					"Union contains more than one branch of type {variant_type}"
				)));
			}
		}
		Ok(())
	}

	/// Zero-size cycles (that would trigger infinite recursion when decoding,
	/// without consuming any input) can only happen with records that contain
	/// themselves only through record fields. Any other path consumes at least
	/// one byte (union index, block count...).
	fn check_for_cycles(&self) -> Result<(), SchemaError> {
		let mut visited_nodes = vec![false; self.nodes.len()];
		let mut checked_nodes = vec![false; self.nodes.len()];
		for (idx, node) in self.nodes.iter().enumerate() {
			if let RegularType::Record(ref record) = node.type_ {
				if !checked_nodes[idx] {
					self.check_no_zero_sized_cycle(idx, record, &mut visited_nodes, &mut checked_nodes)?;
				}
			}
		}
		Ok(())
	}

	fn check_no_zero_sized_cycle(
		&self,
		node_idx: usize,
		record: &Record,
		visited_nodes: &mut Vec<bool>,
		checked_nodes: &mut Vec<bool>,
	) -> Result<(), SchemaError> {
		visited_nodes[node_idx] = true;
		for field in &record.fields {
			if let RegularType::Record(ref inner) = self.nodes[field.type_.idx].type_ {
				if visited_nodes[field.type_.idx] {
					return Err(SchemaError::msg(format_args!(
						"Record {} ends up always containing itself",
						record.name
					)));
				}
				self.check_no_zero_sized_cycle(field.type_.idx, inner, visited_nodes, checked_nodes)?;
			}
		}
		visited_nodes[node_idx] = false;
		// If it was ok as part of another record, no need to re-visit it
		checked_nodes[node_idx] = true;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn name(s: &str) -> Name {
		Name::from_fully_qualified_name(s)
	}

	#[test]
	fn rejects_duplicate_unnamed_union_branches() {
		let schema = SchemaMut::from_nodes(vec![
			Union::new(vec![SchemaKey::from_idx(1), SchemaKey::from_idx(2)]).into(),
			RegularType::Int.into(),
			RegularType::Int.into(),
		]);
		assert!(schema.freeze().is_err());
	}

	#[test]
	fn named_union_branches_may_repeat_with_different_names() {
		let schema = SchemaMut::from_nodes(vec![
			Union::new(vec![SchemaKey::from_idx(1), SchemaKey::from_idx(2)]).into(),
			Fixed::new(name("a.Md5"), 16).into(),
			Fixed::new(name("a.Sha1"), 20).into(),
		]);
		assert!(schema.freeze().is_ok());
	}

	#[test]
	fn rejects_out_of_bounds_keys() {
		let schema = SchemaMut::from_nodes(vec![Array::new(SchemaKey::from_idx(3)).into()]);
		assert!(schema.freeze().is_err());
	}

	#[test]
	fn rejects_unconditional_record_cycles() {
		let schema = SchemaMut::from_nodes(vec![Record::new(
			name("Loop"),
			vec![RecordField::new("inner", SchemaKey::from_idx(0))],
		)
		.into()]);
		assert!(schema.freeze().is_err());
	}
}
