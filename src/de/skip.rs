use super::*;

use crate::schema::{Array, Map, RegularType};

impl<R: Read> DeserializerState<'_, R> {
	/// Consume the encoding of a datum of the given node without building it
	pub(super) fn skip_node(&mut self, key: SchemaKey, allowed_depth: AllowedDepth) -> Result<(), Error> {
		let schema = self.config.schema;
		match schema[key].type_ {
			RegularType::Null => {}
			RegularType::Boolean => self.reader.skip_bytes(1)?,
			RegularType::Int | RegularType::Long | RegularType::Enum(_) => {
				let _: i64 = self.read_varint()?;
			}
			RegularType::Float => self.reader.skip_bytes(4)?,
			RegularType::Double => self.reader.skip_bytes(8)?,
			RegularType::Bytes | RegularType::String => {
				let len = self.read_len()?;
				self.reader.skip_bytes(len)?;
			}
			RegularType::Fixed(ref fixed) => self.reader.skip_bytes(fixed.size)?,
			RegularType::Array(Array { items, .. }) => {
				self.skip_blocks(allowed_depth.dec()?, |state, allowed_depth| {
					state.skip_node(items, allowed_depth)
				})?
			}
			RegularType::Map(Map { values, .. }) => {
				self.skip_blocks(allowed_depth.dec()?, |state, allowed_depth| {
					let len = state.read_len()?;
					state.reader.skip_bytes(len)?;
					state.skip_node(values, allowed_depth)
				})?
			}
			RegularType::Union(ref union) => {
				let variant = self.read_union_discriminant(union)?;
				self.skip_node(variant, allowed_depth.dec()?)?
			}
			RegularType::Record(ref record) => {
				let allowed_depth = allowed_depth.dec()?;
				for field in &record.fields {
					self.skip_node(field.type_, allowed_depth)?;
				}
			}
		}
		Ok(())
	}

	/// Blocks that advertise their size in bytes are skipped in one go
	fn skip_blocks(
		&mut self,
		allowed_depth: AllowedDepth,
		mut skip_item: impl FnMut(&mut Self, AllowedDepth) -> Result<(), Error>,
	) -> Result<(), Error> {
		let mut blocks = Blocks::new();
		while let Some((len, byte_size)) = read_block_len(self)? {
			blocks.count(self, len)?;
			match byte_size {
				Some(byte_size) => self.reader.skip_bytes(byte_size)?,
				None => {
					for _ in 0..len {
						skip_item(self, allowed_depth)?;
					}
				}
			}
		}
		Ok(())
	}
}
