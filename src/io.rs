// File-level I/O helpers for CM6 encoding/decoding.
//
// Sample files are plain text: decimal integers separated by whitespace or
// commas, with `#` starting a comment that runs to the end of the line. CM6
// files hold the symbol stream wrapped into lines; all whitespace is ignored
// when reading them back.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::cm6::{self, DecodeError, DecodeOptions, DecodeWarning, EncodeError, EncodeOptions};

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_stream()` / `encode_file()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeStats {
    /// Samples read.
    pub samples: usize,
    /// CM6 symbols written, excluding line breaks.
    pub symbols: usize,
    /// Output lines written.
    pub lines: usize,
    /// CHK2 checksum of the samples.
    pub checksum: u32,
}

/// Statistics returned by `decode_stream()` / `decode_file()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeStats {
    /// CM6 symbols read, excluding whitespace.
    pub symbols: usize,
    /// Samples written.
    pub samples: usize,
    /// CHK2 checksum of the decoded samples.
    pub checksum: u32,
    pub warnings: Vec<DecodeWarning>,
}

impl EncodeStats {
    /// Symbols per sample.
    pub fn ratio(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.symbols as f64 / self.samples as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {token:?} is not a 32-bit integer")]
    Parse { line: usize, token: String },
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

// ---------------------------------------------------------------------------
// Text readers and writers
// ---------------------------------------------------------------------------

/// Read a text list of integers.
pub fn read_samples<R: BufRead>(reader: R) -> Result<Vec<i32>, IoError> {
    let mut samples = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let body = line.split_once('#').map_or(line.as_str(), |(body, _)| body);
        for token in body
            .split(|c: char| c.is_ascii_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let value = token.parse().map_err(|_| IoError::Parse {
                line: idx + 1,
                token: token.to_string(),
            })?;
            samples.push(value);
        }
    }
    Ok(samples)
}

/// Write one integer per line.
pub fn write_samples<W: Write>(writer: &mut W, samples: &[i32]) -> io::Result<()> {
    for value in samples {
        writeln!(writer, "{value}")?;
    }
    Ok(())
}

/// Read a CM6 symbol stream, dropping all ASCII whitespace.
///
/// Other bytes are kept as-is; what happens to bytes outside the alphabet is
/// up to the decoder's `InvalidBytePolicy`.
pub fn read_cm6_text<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    raw.retain(|b| !b.is_ascii_whitespace());
    Ok(raw)
}

/// Write `symbols` in lines of at most `width` characters and return the
/// number of lines. `0` writes a single line.
pub fn write_cm6_lines<W: Write>(writer: &mut W, symbols: &[u8], width: usize) -> io::Result<usize> {
    if symbols.is_empty() {
        return Ok(0);
    }
    let width = if width == 0 { symbols.len() } else { width };
    let mut lines = 0;
    for chunk in symbols.chunks(width) {
        writer.write_all(chunk)?;
        writer.write_all(b"\n")?;
        lines += 1;
    }
    Ok(lines)
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// Read integers from `input`, write wrapped CM6 text to `output`.
pub fn encode_stream<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    opts: &EncodeOptions,
    line_width: usize,
) -> Result<EncodeStats, IoError> {
    let samples = read_samples(input)?;
    let symbols = cm6::encode(&samples, opts)?;
    let lines = write_cm6_lines(output, &symbols, line_width)?;
    output.flush()?;

    debug!(
        "encoded {} samples into {} symbols (D={})",
        samples.len(),
        symbols.len(),
        opts.differences
    );
    Ok(EncodeStats {
        samples: samples.len(),
        symbols: symbols.len(),
        lines,
        checksum: cm6::checksum(&samples),
    })
}

/// Read CM6 text from `input`, write one integer per line to `output`.
pub fn decode_stream<R: Read, W: Write>(
    input: R,
    output: &mut W,
    opts: &DecodeOptions,
) -> Result<DecodeStats, IoError> {
    let symbols = read_cm6_text(input)?;
    let decoded = cm6::decode(&symbols, opts)?;
    write_samples(output, &decoded.samples)?;
    output.flush()?;

    debug!(
        "decoded {} symbols into {} samples (D={})",
        symbols.len(),
        decoded.samples.len(),
        opts.differences
    );
    Ok(DecodeStats {
        symbols: symbols.len(),
        samples: decoded.samples.len(),
        checksum: cm6::checksum(&decoded.samples),
        warnings: decoded.warnings,
    })
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Encode the integer file at `input_path` into CM6 text at `output_path`.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    opts: &EncodeOptions,
    line_width: usize,
) -> Result<EncodeStats, IoError> {
    let input = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let mut output = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    encode_stream(input, &mut output, opts, line_width)
}

/// Decode the CM6 text file at `input_path` into an integer file at
/// `output_path`.
pub fn decode_file(
    input_path: &Path,
    output_path: &Path,
    opts: &DecodeOptions,
) -> Result<DecodeStats, IoError> {
    let input = BufReader::with_capacity(BUF_SIZE, File::open(input_path)?);
    let mut output = BufWriter::with_capacity(BUF_SIZE, File::create(output_path)?);
    decode_stream(input, &mut output, opts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
