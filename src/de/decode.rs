use super::*;

use crate::schema::{Array, Map, RegularType};

impl<R: Read> DeserializerState<'_, R> {
	pub(super) fn decode(
		&mut self,
		key: SchemaKey,
		allowed_depth: AllowedDepth,
	) -> Result<Value, Error> {
		let schema = self.config.schema;
		Ok(match schema[key].type_ {
			RegularType::Null => Value::Null,
			RegularType::Boolean => Value::Boolean(self.read_bool()?),
			RegularType::Int => Value::Int(self.read_int()?),
			RegularType::Long => Value::Long(self.read_varint()?),
			RegularType::Float => Value::Float(f32::from_le_bytes(self.read_const_size_buf()?)),
			RegularType::Double => Value::Double(f64::from_le_bytes(self.read_const_size_buf()?)),
			RegularType::Bytes => Value::Bytes(self.read_length_delimited()?),
			RegularType::String => Value::String(self.read_string()?),
			RegularType::Array(Array { items, .. }) => {
				let allowed_depth = allowed_depth.dec()?;
				let mut blocks = Blocks::new();
				let mut values = Vec::new();
				while blocks.has_more(self)? {
					values.push(self.decode(items, allowed_depth)?);
				}
				Value::Array(values)
			}
			RegularType::Map(Map { values, .. }) => {
				let allowed_depth = allowed_depth.dec()?;
				let mut blocks = Blocks::new();
				let mut entries = Vec::new();
				while blocks.has_more(self)? {
					let key = self.read_string()?;
					entries.push((key, self.decode(values, allowed_depth)?));
				}
				Value::Map(entries)
			}
			RegularType::Union(ref union) => {
				let variant = self.read_union_discriminant(union)?;
				self.decode(variant, allowed_depth.dec()?)?
			}
			RegularType::Record(ref record) => {
				// NB: infinite recursion is prevented here by the fact we prevent constructing
				// a schema that contains a record that always ends up containing itself
				let allowed_depth = allowed_depth.dec()?;
				Value::Record(
					record
						.fields
						.iter()
						.map(|field| Ok((field.name.clone(), self.decode(field.type_, allowed_depth)?)))
						.collect::<Result<_, Error>>()?,
				)
			}
			RegularType::Enum(ref enum_) => Value::Enum(self.read_enum_symbol(enum_)?.to_owned()),
			RegularType::Fixed(ref fixed) => Value::Fixed(self.reader.read_bytes(fixed.size)?),
		})
	}
}
