mod raw;

use crate::schema::{is_valid_identifier, safe::*};

use std::collections::HashMap;

const LATE_NAME_LOOKUP_REMAP_BIT: usize = 1usize << (usize::BITS - 1);

struct SchemaConstructionState {
	nodes: Vec<SchemaNode>,
	names: HashMap<String, usize>,
	unresolved_names: Vec<UnresolvedName>,
}

/// A reference that was encountered before the definition of the type it
/// refers to
struct UnresolvedName {
	/// Reference qualified with the enclosing namespace
	qualified: String,
	/// Reference as written, tried if the qualified lookup fails
	as_written: String,
}

impl std::str::FromStr for SchemaMut {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut state = SchemaConstructionState {
			nodes: Vec::new(),
			names: HashMap::new(),
			unresolved_names: Vec::new(),
		};

		let raw_schema: raw::SchemaNode =
			serde_json::from_str(s).map_err(SchemaError::serde_json)?;

		state.register_node(&raw_schema, None)?;

		// Support for unordered name definitions
		if !state.unresolved_names.is_empty() {
			let resolved_names: Vec<SchemaKey> = state
				.unresolved_names
				.iter()
				.map(|unresolved| {
					state
						.names
						.get(&unresolved.qualified)
						.or_else(|| state.names.get(&unresolved.as_written))
						.ok_or_else(|| {
							SchemaError::msg(format_args!(
								"The Schema contains an unknown reference: {}",
								unresolved.qualified,
							))
						})
						.map(|&idx| SchemaKey { idx })
				})
				.collect::<Result<_, _>>()?;
			let fix_key = |key: &mut SchemaKey| {
				if key.idx & LATE_NAME_LOOKUP_REMAP_BIT != 0 {
					*key = resolved_names[key.idx ^ LATE_NAME_LOOKUP_REMAP_BIT];
				}
			};
			for schema_node in &mut state.nodes {
				match &mut schema_node.type_ {
					RegularType::Array(Array { items: key, .. })
					| RegularType::Map(Map { values: key, .. }) => fix_key(key),
					RegularType::Union(union) => union.variants.iter_mut().for_each(fix_key),
					RegularType::Record(record) => record
						.fields
						.iter_mut()
						.for_each(|f| fix_key(&mut f.type_)),
					RegularType::Null
					| RegularType::Boolean
					| RegularType::Int
					| RegularType::Long
					| RegularType::Float
					| RegularType::Double
					| RegularType::Bytes
					| RegularType::String
					| RegularType::Enum(_)
					| RegularType::Fixed(_) => {}
				}
			}
		}

		Ok(Self { nodes: state.nodes })
	}
}

impl SchemaConstructionState {
	fn register_node(
		&mut self,
		raw_schema: &raw::SchemaNode,
		enclosing_namespace: Option<&str>,
	) -> Result<SchemaKey, SchemaError> {
		Ok(match *raw_schema {
			raw::SchemaNode::Type(type_) => {
				let regular_type = primitive(type_).ok_or_else(|| {
					SchemaError::msg(format_args!(
						"Expected primitive type name, but got {:?} as type which is a complex \
							type, so should be in an object.",
						type_
					))
				})?;
				self.push(SchemaNode::new(regular_type))
			}
			raw::SchemaNode::Object(ref object) => {
				self.register_object(object, enclosing_namespace, None)?
			}
			raw::SchemaNode::Union(ref union_schemas) => {
				let idx = self.nodes.len();
				self.nodes.push(SchemaNode::new(RegularType::Null)); // Reserve the spot for us
				let variants = union_schemas
					.iter()
					.map(|schema| {
						if let raw::SchemaNode::Union(_) = schema {
							return Err(SchemaError::new(
								"Unions may not immediately contain other unions",
							));
						}
						self.register_node(schema, enclosing_namespace)
					})
					.collect::<Result<_, _>>()?;
				self.nodes[idx] = SchemaNode::new(Union::new(variants));
				SchemaKey { idx }
			}
			raw::SchemaNode::Ref(ref reference) => {
				// This is supposed to be the fullname of a previous named type.
				// The definition is usually parsed before, but we also support
				// forward references.
				let qualified = match (reference.contains('.'), enclosing_namespace) {
					(false, Some(namespace)) => format!("{namespace}.{reference}"),
					_ => reference.clone(),
				};
				match self
					.names
					.get(&qualified)
					.or_else(|| self.names.get(reference.as_str()))
				{
					Some(&idx) => SchemaKey { idx },
					None => {
						let idx = self.unresolved_names.len();
						self.unresolved_names.push(UnresolvedName {
							qualified,
							as_written: reference.clone(),
						});
						SchemaKey {
							idx: idx | LATE_NAME_LOOKUP_REMAP_BIT,
						}
					}
				}
			}
		})
	}

	fn push(&mut self, node: SchemaNode) -> SchemaKey {
		let idx = self.nodes.len();
		self.nodes.push(node);
		SchemaKey { idx }
	}

	/// `field_name` is set when the object is a record field whose `type` is a
	/// bare complex type name, in which case the field itself describes the
	/// type and its name is the type's name.
	fn register_object(
		&mut self,
		object: &raw::SchemaNodeObject,
		enclosing_namespace: Option<&str>,
		field_name: Option<&str>,
	) -> Result<SchemaKey, SchemaError> {
		let type_ = match object.type_ {
			raw::SchemaNode::Type(type_) => type_,
			ref inner_type @ (raw::SchemaNode::Ref(_)
			| raw::SchemaNode::Object(_)
			| raw::SchemaNode::Union(_)) => {
				// We have to allow {"type": {"type": "string"}}
				// (an object with an inner type and nothing
				// else is a valid representation)
				// However in that case we would ignore all keys
				// that are set at our current level, so we check for this
				return match object {
					raw::SchemaNodeObject {
						logical_type: None,
						fields: None,
						symbols: None,
						items: None,
						values: None,
						size: None,
						precision: None,
						scale: None,
						extra_attributes,
						..
					} if extra_attributes.is_empty() => self.register_node(
						inner_type,
						object
							.namespace
							.as_deref()
							.map(|ns| Some(ns).filter(|ns| !ns.is_empty()))
							.unwrap_or(enclosing_namespace),
					),
					_ => Err(SchemaError::new(
						"Got unnecessarily-nested type, but local object properties are set \
							- those would be ignored",
					)),
				};
			}
		};

		let mut extra_attributes: ExtraAttributes = object
			.extra_attributes
			.iter()
			.map(|(k, v)| (k.clone(), v.clone()))
			.collect();
		let logical_type =
			parse_logical_type(object, &mut extra_attributes)?;

		macro_rules! field {
			($name: ident) => {
				match &object.$name {
					Some(v) => v,
					None => {
						return Err(SchemaError::msg(format_args!(
							concat!("Missing field `", stringify!($name), "` on type {:?}"),
							type_
						)));
					}
				}
			};
		}

		let name = || -> Result<Name, SchemaError> {
			match object.name.as_deref().or(field_name) {
				None => Err(SchemaError::msg(format_args!(
					"Missing name for type {:?}",
					type_
				))),
				Some(name) => {
					Name::resolve(name, object.namespace.as_deref(), enclosing_namespace)
				}
			}
		};

		let mut node = |regular_type: RegularType| SchemaNode {
			type_: regular_type,
			logical_type: logical_type.clone(),
			extra_attributes: std::mem::take(&mut extra_attributes),
			object_form: true,
		};

		if let Some(regular_type) = primitive(type_) {
			return Ok(self.push(node(regular_type)));
		}

		Ok(match type_ {
			raw::Type::Array => {
				let idx = self.reserve();
				let items = self.register_node(field!(items), enclosing_namespace)?;
				self.nodes[idx] = node(Array::new(items).into());
				SchemaKey { idx }
			}
			raw::Type::Map => {
				let idx = self.reserve();
				let values = self.register_node(field!(values), enclosing_namespace)?;
				self.nodes[idx] = node(Map::new(values).into());
				SchemaKey { idx }
			}
			raw::Type::Enum => {
				let name = name()?;
				let symbols = field!(symbols).clone();
				let idx = self.register_name(&name)?;
				self.nodes[idx] = node(
					Enum {
						symbols,
						name,
						doc: object.doc.clone(),
						_private: (),
					}
					.into(),
				);
				SchemaKey { idx }
			}
			raw::Type::Fixed => {
				let name = name()?;
				let size = *field!(size);
				let idx = self.register_name(&name)?;
				self.nodes[idx] = node(Fixed::new(name, size).into());
				SchemaKey { idx }
			}
			raw::Type::Record | raw::Type::Error => {
				let name = name()?;
				let raw_fields = field!(fields);
				let idx = self.register_name(&name)?;
				let fields = raw_fields
					.iter()
					.map(|field| self.register_field(field, &name))
					.collect::<Result<Vec<_>, _>>()?;
				self.nodes[idx] = node(
					Record {
						fields,
						kind: match type_ {
							raw::Type::Error => RecordKind::Error,
							_ => RecordKind::Record,
						},
						doc: object.doc.clone(),
						name,
						_private: (),
					}
					.into(),
				);
				SchemaKey { idx }
			}
			raw::Type::Null
			| raw::Type::Boolean
			| raw::Type::Int
			| raw::Type::Long
			| raw::Type::Float
			| raw::Type::Double
			| raw::Type::Bytes
			| raw::Type::String => unreachable!("primitives are handled above"),
		})
	}

	fn reserve(&mut self) -> usize {
		let idx = self.nodes.len();
		self.nodes.push(SchemaNode::new(RegularType::Null));
		idx
	}

	/// Reserve the spot for a named node and register its name, so that it
	/// may be referenced from its own children
	fn register_name(&mut self, name: &Name) -> Result<usize, SchemaError> {
		let idx = self.reserve();
		if self
			.names
			.insert(name.fully_qualified_name().to_owned(), idx)
			.is_some()
		{
			return Err(SchemaError::msg(format_args!(
				"The Schema contains duplicate definitions for {}",
				name
			)));
		}
		Ok(idx)
	}

	fn register_field(
		&mut self,
		field: &raw::Field,
		record_name: &Name,
	) -> Result<RecordField, SchemaError> {
		let name = field.name.as_deref().ok_or_else(|| {
			SchemaError::msg(format_args!(
				"Field name is missing in a field of record {record_name}"
			))
		})?;
		if !is_valid_identifier(name) {
			return Err(SchemaError::msg(format_args!(
				"Invalid field name {name:?} in record {record_name}"
			)));
		}
		let type_ = field.type_.as_ref().ok_or_else(|| {
			SchemaError::msg(format_args!(
				"Field {name}'s type is missing in record {record_name}"
			))
		})?;
		let namespace = record_name.namespace();

		let mut extra_attributes = ExtraAttributes::default();
		let schema = match *type_ {
			raw::SchemaNode::Type(type_name) if !type_name.is_primitive() => {
				// `{"name": "f", "type": "enum", "symbols": [...]}`: the field
				// object itself describes the type
				let mut as_type_object = field.extra_attributes.clone();
				as_type_object.insert(
					"type".to_owned(),
					serde_json::to_value(type_name).map_err(SchemaError::serde_json)?,
				);
				if let Some(ref doc) = field.doc {
					as_type_object.insert("doc".to_owned(), doc.clone().into());
				}
				let object: raw::SchemaNodeObject =
					serde_json::from_value(JsonValue::Object(as_type_object))
						.map_err(SchemaError::serde_json)?;
				self.register_object(&object, namespace, Some(name))?
			}
			_ => {
				extra_attributes = field
					.extra_attributes
					.iter()
					.map(|(k, v)| (k.clone(), v.clone()))
					.collect();
				self.register_node(type_, namespace)?
			}
		};

		Ok(RecordField {
			name: name.to_owned(),
			type_: schema,
			default: field.default.clone(),
			order: field.order,
			doc: field.doc.clone(),
			precision: field
				.precision
				.as_ref()
				.map(|p| json_integer(p, "precision", name))
				.transpose()?,
			scale: field
				.scale
				.as_ref()
				.map(|s| json_integer(s, "scale", name))
				.transpose()?,
			extra_attributes,
			_private: (),
		})
	}
}

fn primitive(type_: raw::Type) -> Option<RegularType> {
	Some(match type_ {
		raw::Type::Null => RegularType::Null,
		raw::Type::Boolean => RegularType::Boolean,
		raw::Type::Int => RegularType::Int,
		raw::Type::Long => RegularType::Long,
		raw::Type::Float => RegularType::Float,
		raw::Type::Double => RegularType::Double,
		raw::Type::Bytes => RegularType::Bytes,
		raw::Type::String => RegularType::String,
		raw::Type::Array
		| raw::Type::Map
		| raw::Type::Record
		| raw::Type::Error
		| raw::Type::Enum
		| raw::Type::Fixed => return None,
	})
}

fn json_integer<T: TryFrom<u64>>(
	value: &JsonValue,
	attribute: &str,
	owner: &str,
) -> Result<T, SchemaError> {
	value
		.as_u64()
		.and_then(|v| T::try_from(v).ok())
		.ok_or_else(|| {
			SchemaError::msg(format_args!(
				"`{attribute}` of {owner} should be a non-negative integer, got {value}"
			))
		})
}

/// `precision` and `scale` are only meaningful for `decimal`. Otherwise they
/// are kept as extra attributes.
fn parse_logical_type(
	object: &raw::SchemaNodeObject,
	extra_attributes: &mut ExtraAttributes,
) -> Result<Option<LogicalType>, SchemaError> {
	let logical_type = object.logical_type.as_deref();
	if logical_type != Some("decimal") {
		for (key, value) in [("precision", &object.precision), ("scale", &object.scale)] {
			if let Some(value) = value {
				extra_attributes.add(key, value.clone());
			}
		}
	}
	Ok(logical_type.map(|logical_type| -> Result<_, SchemaError> {
		Ok(match logical_type {
			"decimal" => LogicalType::Decimal(Decimal {
				precision: match object.precision {
					Some(ref precision) => json_integer(precision, "precision", "decimal")?,
					None => {
						return Err(SchemaError::new(
							"Missing field `precision` on logical type \"decimal\"",
						))
					}
				},
				scale: match object.scale {
					Some(ref scale) => json_integer(scale, "scale", "decimal")?,
					None => 0,
				},
				_private: (),
			}),
			"uuid" => LogicalType::Uuid,
			"date" => LogicalType::Date,
			"time-millis" => LogicalType::TimeMillis,
			"time-micros" => LogicalType::TimeMicros,
			"timestamp-millis" => LogicalType::TimestampMillis,
			"timestamp-micros" => LogicalType::TimestampMicros,
			"duration" => LogicalType::Duration,
			unknown => LogicalType::Unknown(unknown.to_owned()),
		})
	})
	.transpose()?)
}
