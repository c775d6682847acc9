use super::SchemaError;

use {regex_lite::Regex, std::sync::OnceLock};

/// Schema component for named nodes of a [`SchemaMut`](super::SchemaMut)
///
/// This holds both the "name" and the "namespace".
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}

impl std::fmt::Debug for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.fully_qualified_name, f)
	}
}

impl std::fmt::Display for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.fully_qualified_name, f)
	}
}

fn identifier_regex() -> &'static Regex {
	static IDENTIFIER_ONCE: OnceLock<Regex> = OnceLock::new();
	IDENTIFIER_ONCE.get_or_init(|| {
		Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
	})
}

/// Whether `s` is a valid Avro identifier (`[A-Za-z_][A-Za-z0-9_]*`)
pub(crate) fn is_valid_identifier(s: &str) -> bool {
	identifier_regex().is_match(s)
}

fn validate_segments(dotted: &str, what: &str) -> Result<(), SchemaError> {
	for segment in dotted.split('.') {
		if segment.is_empty() {
			return Err(SchemaError::msg(format_args!(
				"Empty segment in {what} {dotted:?}"
			)));
		}
		if !is_valid_identifier(segment) {
			return Err(SchemaError::msg(format_args!(
				"Invalid {what} {dotted:?}: {segment:?} does not match [A-Za-z_][A-Za-z0-9_]*"
			)));
		}
	}
	Ok(())
}

impl Name {
	/// The rightmost component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `c`
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(delimiter_idx) => &self.fully_qualified_name[delimiter_idx + 1..],
		}
	}

	/// The namespace component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b`
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx
			.map(|idx| &self.fully_qualified_name[..idx])
	}

	/// The fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b.c`
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}

	/// The name as it should be written when the enclosing namespace is
	/// `default_namespace`: the namespace is omitted if it is the same.
	pub fn qualified_name(&self, default_namespace: Option<&str>) -> &str {
		if self.namespace() == default_namespace {
			self.name()
		} else {
			self.fully_qualified_name()
		}
	}

	/// Build a [`Name`] from a fully qualified name, without validating it
	pub fn from_fully_qualified_name(fully_qualified_name: impl Into<String>) -> Self {
		fn non_generic_inner(fully_qualified_name: String) -> Name {
			Name {
				namespace_delimiter_idx: fully_qualified_name.rfind('.'),
				fully_qualified_name,
			}
		}
		non_generic_inner(fully_qualified_name.into())
	}

	/// Resolve a name as it appears in a schema
	///
	/// - If `name` is already dotted, every segment is validated and it is used
	///   as the fully qualified name as-is.
	/// - Otherwise it is qualified with `explicit_namespace` if provided, else
	///   with `default_namespace` (the namespace inherited from the enclosing
	///   named type), else left unqualified.
	///
	/// An explicit empty namespace means "no namespace".
	pub fn resolve(
		name: &str,
		explicit_namespace: Option<&str>,
		default_namespace: Option<&str>,
	) -> Result<Self, SchemaError> {
		if name.is_empty() {
			return Err(SchemaError::new("Named types must have a non-empty name"));
		}
		if name.contains('.') {
			validate_segments(name, "name")?;
			return Ok(Self::from_fully_qualified_name(name));
		}
		if !is_valid_identifier(name) {
			return Err(SchemaError::msg(format_args!(
				"Invalid name {name:?}: does not match [A-Za-z_][A-Za-z0-9_]*"
			)));
		}
		let namespace = match explicit_namespace {
			Some(explicit_namespace) => Some(explicit_namespace).filter(|ns| !ns.is_empty()),
			None => default_namespace.filter(|ns| !ns.is_empty()),
		};
		Ok(match namespace {
			None => Self {
				fully_qualified_name: name.to_owned(),
				namespace_delimiter_idx: None,
			},
			Some(namespace) => {
				validate_segments(namespace, "namespace")?;
				Self {
					fully_qualified_name: format!("{namespace}.{name}"),
					namespace_delimiter_idx: Some(namespace.len()),
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bare_name_inherits_default_namespace() {
		let name = Name::resolve("Foo", None, Some("a.b")).unwrap();
		assert_eq!(name.fully_qualified_name(), "a.b.Foo");
		assert_eq!(name.name(), "Foo");
		assert_eq!(name.namespace(), Some("a.b"));
		assert_eq!(name.qualified_name(Some("a.b")), "Foo");
		assert_eq!(name.qualified_name(Some("c")), "a.b.Foo");
	}

	#[test]
	fn explicit_namespace_wins() {
		let name = Name::resolve("Foo", Some("x"), Some("a.b")).unwrap();
		assert_eq!(name.fully_qualified_name(), "x.Foo");
		let name = Name::resolve("Foo", Some(""), Some("a.b")).unwrap();
		assert_eq!(name.fully_qualified_name(), "Foo");
		assert_eq!(name.namespace(), None);
	}

	#[test]
	fn dotted_name_is_used_as_is() {
		let name = Name::resolve("x.y.Foo", Some("ignored"), Some("a")).unwrap();
		assert_eq!(name.fully_qualified_name(), "x.y.Foo");
		assert_eq!(name.namespace(), Some("x.y"));
	}

	#[test]
	fn rejects_malformed_names() {
		assert!(Name::resolve("", None, None).is_err());
		assert!(Name::resolve("1abc", None, None).is_err());
		assert!(Name::resolve("a-b", None, None).is_err());
		assert!(Name::resolve("a..b", None, None).is_err());
		assert!(Name::resolve(".b", None, None).is_err());
		assert!(Name::resolve("b", Some("x..y"), None).is_err());
		assert!(Name::resolve("_ok9", None, None).is_ok());
	}
}
