use crate::{object_container_file_encoding::Compression, Error, ErrorKind};

/// Holds the compressor of the codec and its output buffer, so that both can
/// be reused from one block to the next
pub(super) struct CompressionCodecState {
	output_vec: Vec<u8>,
	kind: Kind,
}

impl CompressionCodecState {
	pub(super) fn new(compression: Compression) -> Self {
		Self {
			output_vec: Vec::new(),
			kind: match compression {
				Compression::Null => Kind::Null,
				#[cfg(feature = "deflate")]
				Compression::Deflate { level } => Kind::Deflate {
					compress: flate2::Compress::new(
						level.clip(9).instantiate(flate2::Compression::new),
						false,
					),
				},
				#[cfg(feature = "snappy")]
				Compression::Snappy => Kind::Snappy {
					encoder: snap::raw::Encoder::new(),
				},
			},
		}
	}
}

enum Kind {
	Null,
	#[cfg(feature = "deflate")]
	Deflate { compress: flate2::Compress },
	#[cfg(feature = "snappy")]
	Snappy { encoder: snap::raw::Encoder },
}

impl CompressionCodecState {
	/// If none, this means the codec is Null and the original
	/// buffer should be used instead
	pub(super) fn compressed_buffer(&self) -> Option<&[u8]> {
		match self.kind {
			Kind::Null => None,
			#[allow(unreachable_patterns)]
			_ => Some(&self.output_vec),
		}
	}

	pub(super) fn encode(&mut self, input: &[u8]) -> Result<(), Error> {
		#[allow(unused)]
		fn error(codec: &str, error: &dyn std::fmt::Display) -> Error {
			Error::custom(
				ErrorKind::Data,
				format_args!("{codec} compression error: {error}"),
			)
		}
		match &mut self.kind {
			Kind::Null => {}
			#[cfg(feature = "deflate")]
			Kind::Deflate { compress } => {
				compress.reset();
				self.output_vec.clear();
				// Default buffer length in flate2
				self.output_vec.reserve(32 * 1024);
				loop {
					let consumed = compress.total_in() as usize;
					let status = compress
						.compress_vec(
							&input[consumed..],
							&mut self.output_vec,
							flate2::FlushCompress::Finish,
						)
						.map_err(|deflate_error| error("Deflate", &deflate_error))?;
					match status {
						flate2::Status::StreamEnd => break,
						flate2::Status::Ok => {
							// Output buffer is full
							self.output_vec.reserve(self.output_vec.capacity().max(1024));
						}
						flate2::Status::BufError => {
							if self.output_vec.len() < self.output_vec.capacity() {
								return Err(error("Deflate", &"got BufError from flate2"));
							}
							self.output_vec.reserve(self.output_vec.capacity().max(1024));
						}
					}
				}
			}
			#[cfg(feature = "snappy")]
			Kind::Snappy { encoder } => {
				self.output_vec
					.resize(snap::raw::max_compress_len(input.len()), 0);
				let n = encoder
					.compress(input, &mut self.output_vec)
					.map_err(|snappy_error| error("Snappy", &snappy_error))?;
				self.output_vec.truncate(n);
				// Checksum is that of the uncompressed data
				self.output_vec
					.extend(crc32fast::hash(input).to_be_bytes());
			}
		}
		Ok(())
	}
}
