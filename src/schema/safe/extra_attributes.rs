pub use serde_json::Value as JsonValue;

/// Schema JSON attributes that carry no meaning for encoding or decoding
/// (`aliases`, custom annotations...), kept in source order so that they are
/// written back when the schema is serialized
#[derive(Default, Clone, Debug, PartialEq)]
pub(crate) struct ExtraAttributes {
	pub(crate) attributes: Vec<(String, JsonValue)>,
}

impl ExtraAttributes {
	pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
		self.attributes.iter().map(|(k, v)| (k.as_str(), v))
	}

	pub(crate) fn add(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
		self.attributes.push((key.into(), value.into()));
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}
}

impl FromIterator<(String, JsonValue)> for ExtraAttributes {
	fn from_iter<T: IntoIterator<Item = (String, JsonValue)>>(iter: T) -> Self {
		Self {
			attributes: iter.into_iter().collect(),
		}
	}
}

/// We don't make the `ExtraAttributes` type public in case we need to turn
/// some of these attributes into structured properties later on.
macro_rules! extra_attributes {
	($($t: ty)+) => {
		$(
			impl $t {
				/// Schema JSON attributes that are not interpreted by this library but
				/// are preserved when the schema is serialized back to JSON
				pub fn extra_attributes(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
					self.extra_attributes.iter()
				}

				/// Add an attribute to be written when the schema is serialized as
				/// JSON
				///
				/// This can be used to add properties such as `aliases` or custom
				/// annotations that other systems using this schema might need.
				pub fn add_extra_attribute(
					&mut self,
					key: impl Into<String>,
					value: impl Into<JsonValue>,
				) {
					self.extra_attributes.add(key, value);
				}
			}
		)*
	};
}
pub(crate) use extra_attributes;
