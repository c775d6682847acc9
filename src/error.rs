use {crate::schema::SchemaError, std::borrow::Cow};

/// Any error that may happen when encoding, decoding, resolving or handling
/// object container files
///
/// The broad category of the failure is available through
/// [`kind`](Error::kind).
#[derive(thiserror::Error)]
#[error("{}", inner.value)]
pub struct Error {
	inner: Box<ErrorInner>,
}

struct ErrorInner {
	kind: ErrorKind,
	value: Cow<'static, str>,
	io_error: Option<std::io::Error>,
}

/// Category of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
	/// The schema could not be parsed, or violates a structural invariant
	Parse,
	/// A value does not conform to the schema it is being encoded with
	Type,
	/// The writer schema and reader schema are not compatible
	SchemaMismatch,
	/// Object container file violations, unavailable or failing compression
	/// codecs, and otherwise malformed data
	Data,
	/// A union branch index or an enum symbol index read from the data is out
	/// of range
	InvalidIndex,
	/// The underlying stream failed (this includes unexpected end of input)
	Io,
}

impl std::fmt::Debug for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{:?}: ", self.inner.kind)?;
		std::fmt::Debug::fmt(&*self.inner.value, f)
	}
}

impl Error {
	/// If you need a dynamic string use `Error::custom(kind, format_args!(...))`
	pub(crate) fn new(kind: ErrorKind, s: &'static str) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				kind,
				value: Cow::Borrowed(s),
				io_error: None,
			}),
		}
	}

	pub(crate) fn custom(kind: ErrorKind, msg: impl std::fmt::Display) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				kind,
				value: Cow::Owned(msg.to_string()),
				io_error: None,
			}),
		}
	}

	pub(crate) fn data(s: &'static str) -> Self {
		Self::new(ErrorKind::Data, s)
	}

	pub(crate) fn unexpected_eof() -> Self {
		Self::new(ErrorKind::Io, "Unexpected end of input while decoding")
	}

	pub(crate) fn io(io_error: std::io::Error) -> Self {
		Self {
			inner: Box::new(ErrorInner {
				kind: ErrorKind::Io,
				value: Cow::Owned(format!("Encountered IO error: {io_error}")),
				io_error: Some(io_error),
			}),
		}
	}

	/// The category of this error
	pub fn kind(&self) -> ErrorKind {
		self.inner.kind
	}

	/// If this error was caused by the underlying stream, the original IO
	/// error
	pub fn io_error(&self) -> Option<&std::io::Error> {
		self.inner.io_error.as_ref()
	}
}

impl From<SchemaError> for Error {
	fn from(schema_error: SchemaError) -> Self {
		Self::custom(ErrorKind::Parse, schema_error)
	}
}
