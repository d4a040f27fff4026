//! Streaming encoders and one-shot compression.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use brotli::CompressorWriter as BrotliEncoder;
use brotli::enc::backward_references::{BrotliEncoderMode, BrotliEncoderParams};
use exn::ResultExt;
use flate2::{Compression as GzCompression, write::GzEncoder};
use std::io::{self, Write};
use tracing::instrument;

// Use the highest compression level available for the formats; output is
// written once and served many times, so storage space wins over speed.
const GZIP_LEVEL: GzCompression = GzCompression::best();
const BROTLI_LEVEL: i32 = 11;
const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_LG_WINDOW_SIZE: i32 = 22;

/// A streaming encoder for one [`Compression`] format.
///
/// Bytes written are compressed into the inner writer. The stream is only
/// complete once [`finish`](Self::finish) has been called; dropping the encoder
/// without finishing it may leave a truncated stream behind.
pub enum Encoder<W: Write> {
    Brotli(Box<BrotliEncoder<Recorded<W>>>),
    Gzip(GzEncoder<W>),
}

/// Remembers the first write error of the inner writer.
///
/// Brotli writes its final meta-block while handing back the inner writer
/// and swallows any error doing so; this is where it turns up again.
pub struct Recorded<W> {
    inner: W,
    error: Option<io::Error>,
}

impl<W> Recorded<W> {
    fn new(inner: W) -> Self {
        Self { inner, error: None }
    }

    fn into_result(self) -> io::Result<W> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.inner),
        }
    }

    fn record<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if let Err(err) = &result
            && self.error.is_none()
        {
            self.error = Some(io::Error::new(err.kind(), err.to_string()));
        }
        result
    }
}

impl<W: Write> Write for Recorded<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        self.record(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.record(result)
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Brotli(encoder) => encoder.write(buf),
            Encoder::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Brotli(encoder) => encoder.flush(),
            Encoder::Gzip(encoder) => encoder.flush(),
        }
    }
}

impl<W: Write> Encoder<W> {
    /// Write the stream trailer and hand back the inner writer.
    ///
    /// The inner writer is not flushed; that is left to the caller, who owns
    /// whatever buffering sits underneath.
    pub fn finish(self) -> io::Result<W> {
        match self {
            // Taking the inner writer emits the final meta-block.
            Encoder::Brotli(encoder) => encoder.into_inner().into_result(),
            Encoder::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl Compression {
    /// Wrap a writer with a streaming encoder for this format.
    ///
    /// `size_hint` is the expected number of input bytes (usually the source
    /// file's length). Brotli uses it to size its internal tables; gzip has
    /// no use for it.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Write;
    /// use precompress_compress::Compression;
    ///
    /// let data = b"Hello, world!";
    /// let mut encoder = Compression::Gzip.encoder(Vec::new(), data.len() as u64);
    /// encoder.write_all(data).unwrap();
    /// let compressed = encoder.finish().unwrap();
    /// assert!(!compressed.is_empty());
    /// ```
    pub fn encoder<W: Write>(&self, writer: W, size_hint: u64) -> Encoder<W> {
        match self {
            Compression::Brotli => {
                let params = BrotliEncoderParams {
                    mode: BrotliEncoderMode::BROTLI_MODE_TEXT,
                    quality: BROTLI_LEVEL,
                    lgwin: BROTLI_LG_WINDOW_SIZE,
                    size_hint: usize::try_from(size_hint).unwrap_or(usize::MAX),
                    ..BrotliEncoderParams::default()
                };
                Encoder::Brotli(Box::new(BrotliEncoder::with_params(Recorded::new(writer), BROTLI_BUFFER_SIZE, &params)))
            },
            Compression::Gzip => Encoder::Gzip(GzEncoder::new(writer, GZIP_LEVEL)),
        }
    }

    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use precompress_compress::Compression;
    ///
    /// let data = "a".repeat(1000);
    /// let compressed = Compression::Brotli.compress(data.as_bytes()).unwrap();
    /// assert!(compressed.len() < data.len());
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.compress_into(input, &mut output)?;
        Ok(output)
    }

    #[instrument(skip(input, output), fields(
        format = %self,
        input_size = input.len(),
        output_size
    ))]
    pub fn compress_into(&self, input: &[u8], output: &mut Vec<u8>) -> Result<usize> {
        let before = output.len();
        let mut encoder = self.encoder(&mut *output, input.len() as u64);
        encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
        encoder.finish().or_raise(|| ErrorKind::Io)?;
        let size = output.len() - before;
        tracing::Span::current().record("output_size", size);
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;
    use std::io::{Read, Write};

    fn decompress(format: Compression, input: &[u8]) -> Vec<u8> {
        let mut output = Vec::new();
        match format {
            Compression::Brotli => brotli::Decompressor::new(input, 4096).read_to_end(&mut output).unwrap(),
            Compression::Gzip => flate2::read::GzDecoder::new(input).read_to_end(&mut output).unwrap(),
        };
        output
    }

    #[rstest]
    #[case(Compression::Brotli)]
    #[case(Compression::Gzip)]
    fn test_compress_is_decodable(#[case] format: Compression) {
        let original = b"Hello, world! This is a test of some compression.";
        let compressed = format.compress(original).unwrap();
        assert_eq!(decompress(format, &compressed), original);
    }

    #[rstest]
    #[case(Compression::Brotli)]
    #[case(Compression::Gzip)]
    fn test_streaming_encoder_in_chunks(#[case] format: Compression) {
        let original = "body { color: red; }\n".repeat(500);
        let mut encoder = format.encoder(Vec::new(), original.len() as u64);
        for chunk in original.as_bytes().chunks(7) {
            encoder.write_all(chunk).unwrap();
        }
        let compressed = encoder.finish().unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(format, &compressed), original.as_bytes());
    }

    #[rstest]
    #[case(Compression::Brotli)]
    #[case(Compression::Gzip)]
    fn test_size_hint_is_only_a_hint(#[case] format: Compression) {
        let original = b"the hint says ten bytes but this is longer than that";
        let mut encoder = format.encoder(Vec::new(), 10);
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decompress(format, &compressed), original);
    }

    #[test]
    fn test_tiny_input_grows() {
        // Container overhead outweighs any saving on tiny inputs; the
        // delete-larger policy exists for exactly this case.
        let original = b"aaaaaaaaaa";
        let compressed = Compression::Gzip.compress(original).unwrap();
        assert!(compressed.len() >= original.len());
    }

    #[rstest]
    #[case(Compression::Brotli)]
    #[case(Compression::Gzip)]
    fn test_empty_input(#[case] format: Compression) {
        let compressed = format.compress(b"").unwrap();
        assert!(decompress(format, &compressed).is_empty());
    }

    #[test]
    fn test_compress_into_appends() {
        let mut output = b"prefix".to_vec();
        let written = Compression::Gzip.compress_into(b"payload", &mut output).unwrap();
        assert_eq!(output.len(), 6 + written);
        assert_eq!(&output[..6], b"prefix");
    }

    /// Accepts nothing.
    struct Full;

    impl Write for Full {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::StorageFull))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_brotli_finish_reports_failed_trailer() {
        // Brotli holds small inputs back, so the failing write may only
        // happen while finishing; it must be reported either way.
        let mut encoder = Compression::Brotli.encoder(Full, 5);
        let _ = encoder.write_all(b"hello");
        let err = encoder.finish().err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::StorageFull);
    }
}
