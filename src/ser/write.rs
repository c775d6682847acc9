//! Binary encoding of primitive values on any [`std::io::Write`]

use crate::Error;

use {integer_encoding::VarIntWriter, std::io::Write};

/// `long`: zig-zag then base-128 varint
pub fn write_long<W: Write>(writer: &mut W, n: i64) -> Result<(), Error> {
	// integer-encoding zig-zags signed integers
	writer.write_varint(n).map_err(Error::io)?;
	Ok(())
}

/// `int` shares the wire format of `long`
pub fn write_int<W: Write>(writer: &mut W, n: i32) -> Result<(), Error> {
	write_long(writer, n.into())
}

pub fn write_boolean<W: Write>(writer: &mut W, b: bool) -> Result<(), Error> {
	writer.write_all(&[b as u8]).map_err(Error::io)
}

pub fn write_float<W: Write>(writer: &mut W, f: f32) -> Result<(), Error> {
	writer.write_all(&f.to_le_bytes()).map_err(Error::io)
}

pub fn write_double<W: Write>(writer: &mut W, f: f64) -> Result<(), Error> {
	writer.write_all(&f.to_le_bytes()).map_err(Error::io)
}

/// `bytes`: `long` length followed by the raw bytes
pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), Error> {
	write_len(writer, bytes.len())?;
	writer.write_all(bytes).map_err(Error::io)
}

/// `string`: same as `bytes`, with the UTF-8 encoding of the string
pub fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<(), Error> {
	write_bytes(writer, s.as_bytes())
}

pub(crate) fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<(), Error> {
	let len: i64 = len
		.try_into()
		.map_err(|_| Error::data("Length overflows i64"))?;
	write_long(writer, len)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn long(n: i64) -> Vec<u8> {
		let mut buf = Vec::new();
		write_long(&mut buf, n).unwrap();
		buf
	}

	#[test]
	fn zig_zag_varint() {
		assert_eq!(long(0), [0x00]);
		assert_eq!(long(-1), [0x01]);
		assert_eq!(long(1), [0x02]);
		assert_eq!(long(-64), [0x7f]);
		assert_eq!(long(63), [0x7e]);
		assert_eq!(long(64), [0x80, 0x01]);
		assert_eq!(long(i64::MAX).len(), 10);
		assert_eq!(long(i64::MIN).len(), 10);
	}

	#[test]
	fn length_prefixed() {
		let mut buf = Vec::new();
		write_string(&mut buf, "foo").unwrap();
		assert_eq!(buf, [6, b'f', b'o', b'o']);
	}
}
