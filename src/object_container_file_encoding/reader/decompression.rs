use crate::{object_container_file_encoding::CompressionCodec, Error, ErrorKind};

/// Decompress a whole block into `output`
///
/// `compressed` may be left in any state afterwards: it's only passed mutably
/// so that its allocation can be reused.
pub(super) fn decompress(
	codec: CompressionCodec,
	compressed: &mut Vec<u8>,
	output: &mut Vec<u8>,
) -> Result<(), Error> {
	#[allow(unused)]
	fn error(codec: &str, error: &dyn std::fmt::Display) -> Error {
		Error::custom(
			ErrorKind::Data,
			format_args!("{codec} decompression error: {error}"),
		)
	}
	match codec {
		CompressionCodec::Null => std::mem::swap(compressed, output),
		#[cfg(feature = "deflate")]
		CompressionCodec::Deflate => {
			use std::io::Read;
			output.clear();
			flate2::bufread::DeflateDecoder::new(compressed.as_slice())
				.read_to_end(output)
				.map_err(|deflate_error| error("Deflate", &deflate_error))?;
		}
		#[cfg(feature = "snappy")]
		CompressionCodec::Snappy => {
			// Snappy does not support block decompression in the format used by Avro.
			// This should be fine because avro blocks themselves should typically be of a
			// reasonable size
			let block_raw_size = compressed.len().checked_sub(4).ok_or_else(|| {
				Error::new(
					ErrorKind::Data,
					"Incorrect block size for Snappy compression: should be at least 4 for CRC",
				)
			})?;
			let (compressed_slice, crc) = compressed.split_at(block_raw_size);
			output.resize(
				snap::raw::decompress_len(compressed_slice)
					.map_err(|snappy_error| error("Snappy", &snappy_error))?,
				0,
			);
			let written = snap::raw::Decoder::new()
				.decompress(compressed_slice, output)
				.map_err(|snappy_error| error("Snappy", &snappy_error))?;
			if written != output.len() {
				return Err(Error::new(
					ErrorKind::Data,
					"Snappy decompression error: incorrect decompressed size",
				));
			}
			let mut expected_crc32 = [0; 4];
			expected_crc32.copy_from_slice(crc);
			if crc32fast::hash(output) != u32::from_be_bytes(expected_crc32) {
				return Err(Error::new(
					ErrorKind::Data,
					"Invalid CRC32 checksum of data in Snappy compressed block",
				));
			}
		}
		#[allow(unreachable_patterns)]
		unavailable => return Err(unavailable.not_enabled()),
	}
	Ok(())
}
