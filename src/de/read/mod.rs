//! Abstract reading from slices or any other `impl BufRead` behind the same
//! interface
//!
//! The decoder is implemented generically on this.

use crate::{Error, ErrorKind};

use integer_encoding::{VarInt, VarIntReader};

/// Abstracts reading from slices or any other `impl BufRead` behind the same
/// interface
///
/// The decoder is implemented generically on this.
pub trait Read: std::io::Read + Sized + private::Sealed {
	/// Read an integer of type `I` from the underlying buffer using varint
	/// encoding
	///
	/// Signed integers are zig-zag decoded.
	fn read_varint<I>(&mut self) -> Result<I, Error>
	where
		I: VarInt;

	/// Read a buffer of size `N` from the underlying buffer, returning it
	/// as an array
	fn read_const_size_buf<const N: usize>(&mut self) -> Result<[u8; N], Error> {
		let mut buf = [0u8; N];
		self.read_exact(&mut buf).map_err(Error::io)?;
		Ok(buf)
	}

	/// Read exactly `n` bytes into a new `Vec`
	fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error>;

	/// Advance past `n` bytes without looking at them
	fn skip_bytes(&mut self, n: usize) -> Result<(), Error>;
}

mod private {
	pub trait Sealed {}
}

/// Implements [`Read`] reading from `&'de [u8]`
pub struct SliceRead<'de> {
	slice: &'de [u8],
}
impl<'de> SliceRead<'de> {
	/// Construct a `SliceRead` from a `&'de [u8]`
	pub fn new(slice: &'de [u8]) -> Self {
		Self { slice }
	}

	/// The part of the slice that has not been read yet
	pub fn remaining(&self) -> &'de [u8] {
		self.slice
	}

	fn split_off(&mut self, n: usize) -> Result<&'de [u8], Error> {
		if n > self.slice.len() {
			Err(Error::unexpected_eof())
		} else {
			let (just_read, end) = self.slice.split_at(n);
			self.slice = end;
			Ok(just_read)
		}
	}
}
impl private::Sealed for SliceRead<'_> {}
impl Read for SliceRead<'_> {
	fn read_varint<I>(&mut self) -> Result<I, Error>
	where
		I: VarInt,
	{
		match I::decode_var(self.slice) {
			None => Err(Error::new(
				ErrorKind::Io,
				"All bytes have MSB set when decoding varint (Reached EOF)",
			)),
			Some((val, read)) => {
				self.slice = &self.slice[read..];
				Ok(val)
			}
		}
	}

	fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
		self.split_off(n).map(<[u8]>::to_vec)
	}

	fn skip_bytes(&mut self, n: usize) -> Result<(), Error> {
		self.split_off(n).map(|_| ())
	}
}
impl std::io::Read for SliceRead<'_> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		self.slice.read(buf)
	}
	fn read_vectored(&mut self, bufs: &mut [std::io::IoSliceMut<'_>]) -> std::io::Result<usize> {
		self.slice.read_vectored(bufs)
	}
}
impl std::io::BufRead for SliceRead<'_> {
	fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
		self.slice.fill_buf()
	}

	fn consume(&mut self, amt: usize) {
		self.slice.consume(amt)
	}
}

/// Implements [`Read`] reading from any `impl BufRead`
pub struct ReaderRead<R> {
	reader: R,
	/// Maximum allocation size for a single field (string, bytes...)
	///
	/// This is a safeguard for malformed data
	///
	/// Default is 512 MB.
	pub max_alloc_size: usize,
}
impl<R: std::io::Read> private::Sealed for ReaderRead<R> {}
impl<R: std::io::BufRead> ReaderRead<R> {
	/// Construct a `ReaderRead` from an `impl BufRead`
	///
	/// If you only have an `impl Read`, wrap it in a
	/// [`BufReader`](std::io::BufReader) first.
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			max_alloc_size: 512 * 1024 * 1024,
		}
	}
}
impl<R> ReaderRead<R> {
	/// Consume the `ReaderRead` and return the inner reader
	pub fn into_inner(self) -> R {
		self.reader
	}
}
impl<R: std::io::BufRead> Read for ReaderRead<R> {
	fn read_varint<I>(&mut self) -> Result<I, Error>
	where
		I: VarInt,
	{
		use std::io::BufRead;
		// Try to decode in one go from the buffer slice.
		// On buffer refill boundaries, that may fail, so we fall back to the
		// more general `read_varint` method that reads byte by byte.
		match I::decode_var(self.fill_buf().map_err(Error::io)?) {
			None => <Self as VarIntReader>::read_varint(self).map_err(Error::io),
			Some((val, read)) => {
				self.consume(read);
				Ok(val)
			}
		}
	}

	fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
		if n > self.max_alloc_size {
			return Err(Error::custom(
				ErrorKind::Data,
				format_args!(
					"Allocation size that would be required ({n}) is larger than \
						allowed for this decoder from reader ({}) - \
						this is probably due to malformed data",
					self.max_alloc_size
				),
			));
		}
		let mut buf = vec![0; n];
		self.reader.read_exact(&mut buf).map_err(Error::io)?;
		Ok(buf)
	}

	fn skip_bytes(&mut self, n: usize) -> Result<(), Error> {
		let skipped = std::io::copy(
			&mut std::io::Read::take(&mut self.reader, n as u64),
			&mut std::io::sink(),
		)
		.map_err(Error::io)?;
		if skipped < n as u64 {
			return Err(Error::unexpected_eof());
		}
		Ok(())
	}
}
impl<R: std::io::Read> std::io::Read for ReaderRead<R> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		self.reader.read(buf)
	}
	fn read_vectored(&mut self, bufs: &mut [std::io::IoSliceMut<'_>]) -> std::io::Result<usize> {
		self.reader.read_vectored(bufs)
	}
}
impl<R: std::io::BufRead> std::io::BufRead for ReaderRead<R> {
	fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
		self.reader.fill_buf()
	}

	fn consume(&mut self, amt: usize) {
		self.reader.consume(amt)
	}
}
