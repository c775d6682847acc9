use super::*;

use crate::schema::{materialize_default_with_depth, matches_nodes, RegularType};

impl<R: Read> DeserializerState<'_, R> {
	/// Decode a datum of the writer node `writer_key`, as the reader node
	/// `reader_key`
	pub(super) fn resolve(
		&mut self,
		writer_key: SchemaKey,
		reader: &Schema,
		reader_key: SchemaKey,
		allowed_depth: AllowedDepth,
	) -> Result<Value, Error> {
		let writer = self.config.schema;
		let writer_type = &writer[writer_key].type_;
		let reader_type = &reader[reader_key].type_;
		let mismatch = || {
			Error::custom(
				ErrorKind::SchemaMismatch,
				format_args!(
					"Writer schema {writer_type} does not match reader schema {reader_type}"
				),
			)
		};
		if !matches_nodes(writer, writer_key, reader, reader_key) {
			return Err(mismatch());
		}

		if let (RegularType::Union(reader_union), false) =
			(reader_type, matches!(writer_type, RegularType::Union(_)))
		{
			let reader_variant = reader_union
				.variants
				.iter()
				.copied()
				.find(|&variant| matches_nodes(writer, writer_key, reader, variant))
				.ok_or_else(mismatch)?;
			return self.resolve(writer_key, reader, reader_variant, allowed_depth.dec()?);
		}

		Ok(match (writer_type, reader_type) {
			(RegularType::Union(writer_union), _) => {
				let writer_variant = self.read_union_discriminant(writer_union)?;
				self.resolve(writer_variant, reader, reader_key, allowed_depth.dec()?)?
			}
			(RegularType::Null, _) => Value::Null,
			(RegularType::Boolean, _) => Value::Boolean(self.read_bool()?),
			(RegularType::Int, _) => promote(Value::Int(self.read_int()?), reader_type),
			(RegularType::Long, _) => promote(Value::Long(self.read_varint()?), reader_type),
			(RegularType::Float, _) => promote(
				Value::Float(f32::from_le_bytes(self.read_const_size_buf()?)),
				reader_type,
			),
			(RegularType::Double, _) => {
				Value::Double(f64::from_le_bytes(self.read_const_size_buf()?))
			}
			(RegularType::Bytes, _) => Value::Bytes(self.read_length_delimited()?),
			(RegularType::String, _) => Value::String(self.read_string()?),
			(RegularType::Array(writer_array), RegularType::Array(reader_array)) => {
				let allowed_depth = allowed_depth.dec()?;
				let mut blocks = Blocks::new();
				let mut values = Vec::new();
				while blocks.has_more(self)? {
					values.push(self.resolve(
						writer_array.items,
						reader,
						reader_array.items,
						allowed_depth,
					)?);
				}
				Value::Array(values)
			}
			(RegularType::Map(writer_map), RegularType::Map(reader_map)) => {
				let allowed_depth = allowed_depth.dec()?;
				let mut blocks = Blocks::new();
				let mut entries = Vec::new();
				while blocks.has_more(self)? {
					let key = self.read_string()?;
					entries.push((
						key,
						self.resolve(writer_map.values, reader, reader_map.values, allowed_depth)?,
					));
				}
				Value::Map(entries)
			}
			// The writer's symbol is kept as is, whether or not the reader enum lists it
			(RegularType::Enum(writer_enum), _) => {
				Value::Enum(self.read_enum_symbol(writer_enum)?.to_owned())
			}
			(RegularType::Fixed(writer_fixed), _) => {
				Value::Fixed(self.reader.read_bytes(writer_fixed.size)?)
			}
			(RegularType::Record(writer_record), RegularType::Record(reader_record)) => {
				let allowed_depth = allowed_depth.dec()?;
				let mut resolved: Vec<Option<Value>> = vec![None; reader_record.fields.len()];
				for writer_field in &writer_record.fields {
					match reader_record.field(&writer_field.name) {
						Some((idx, reader_field)) => {
							resolved[idx] = Some(self.resolve(
								writer_field.type_,
								reader,
								reader_field.type_,
								allowed_depth,
							)?);
						}
						None => self.skip_node(writer_field.type_, allowed_depth)?,
					}
				}
				let mut fields = Vec::with_capacity(resolved.len());
				for (reader_field, value) in reader_record.fields.iter().zip(resolved) {
					let value = match (value, &reader_field.default) {
						(Some(value), _) => value,
						(None, Some(default)) => materialize_default_with_depth(
							reader,
							reader_field.type_,
							default,
							allowed_depth,
						)?,
						(None, None) => {
							log::warn!(
								"Field {} of {} is neither in the written data nor has a default: \
									leaving it absent",
								reader_field.name,
								reader_record.name,
							);
							continue;
						}
					};
					fields.push((reader_field.name.clone(), value));
				}
				Value::Record(fields)
			}
			_ => return Err(mismatch()),
		})
	}
}

/// Numeric promotions (`int` to `long`, `float` or `double`...)
fn promote(value: Value, reader_type: &RegularType) -> Value {
	match (value, reader_type) {
		(Value::Int(n), RegularType::Long) => Value::Long(n.into()),
		(Value::Int(n), RegularType::Float) => Value::Float(n as f32),
		(Value::Int(n), RegularType::Double) => Value::Double(n.into()),
		(Value::Long(n), RegularType::Float) => Value::Float(n as f32),
		(Value::Long(n), RegularType::Double) => Value::Double(n as f64),
		(Value::Float(f), RegularType::Double) => Value::Double(f.into()),
		(value, _) => value,
	}
}
