// Streaming GSE2 waveform reader.
//
// Reads one WID2..CHK2 section at a time, so memory use is bounded by the
// largest single section rather than the whole file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use super::wid2::{DataFormat, StartTime, Wid2, column};
use super::{ChecksumPolicy, GseError, SectionWarning};
use crate::cm6::{self, DecodeOptions, alphabet, checksum};

const BUF_SIZE: usize = 64 * 1024;

/// Shortest STA2 line carrying the network code.
const STA2_MIN_LEN: usize = 14;

/// Shortest CHK2 line carrying a checksum.
const CHK2_MIN_LEN: usize = 6;

/// Reader configuration.
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    pub checksum: ChecksumPolicy,
}

/// One decoded waveform section.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub header: Wid2,
    /// Network code from STA2, if one preceded the data block.
    pub network: Option<String>,
    /// Logical samples.
    pub samples: Vec<i32>,
    /// Checksum declared on the CHK2 line.
    pub declared_checksum: u32,
    /// Checksum computed over `samples`.
    pub checksum: u32,
    pub warnings: Vec<SectionWarning>,
}

impl Waveform {
    pub fn start(&self) -> StartTime {
        self.header.start
    }

    pub fn sample_rate(&self) -> f64 {
        self.header.sample_rate
    }

    pub fn checksum_ok(&self) -> bool {
        self.checksum == self.declared_checksum
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// `NET.STA.AUX.CHA`, with empty parts left empty.
    pub fn id(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.network.as_deref().unwrap_or(""),
            self.header.station,
            self.header.aux_id,
            self.header.channel
        )
    }
}

/// A data block collected between DAT2 and CHK2.
struct Block {
    header: Wid2,
    network: Option<String>,
    start_line: usize,
    symbols: Vec<u8>,
    values: Vec<i32>,
}

/// Iterates over the waveform sections of a GSE2 stream.
pub struct GseReader<R> {
    reader: R,
    opts: ReaderOptions,
    line: Vec<u8>,
    line_no: usize,
    failed: bool,
}

impl<R: BufRead> GseReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ReaderOptions::default())
    }

    pub fn with_options(reader: R, opts: ReaderOptions) -> Self {
        Self {
            reader,
            opts,
            line: Vec::new(),
            line_no: 0,
            failed: false,
        }
    }

    /// Read the next waveform section, or `None` at end of input.
    pub fn next_waveform(&mut self) -> Result<Option<Waveform>, GseError> {
        let mut header: Option<Wid2> = None;
        let mut network: Option<String> = None;
        let mut block: Option<Block> = None;

        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return match block {
                    Some(b) => Err(GseError::UnterminatedData { line: b.start_line }),
                    None => Ok(None),
                };
            }
            self.line_no += 1;
            let line_no = self.line_no;
            let line = trim_newline(&self.line);

            if line.starts_with(b"CHK2") {
                let Some(block) = block.take() else {
                    debug!("line {line_no}: CHK2 outside a data block ignored");
                    continue;
                };
                if line.len() < CHK2_MIN_LEN {
                    return Err(GseError::ShortLine {
                        line: line_no,
                        kind: "CHK2",
                        len: line.len(),
                    });
                }
                let field = column(line, 5, line.len());
                let declared = field
                    .split_whitespace()
                    .next()
                    .and_then(checksum::parse_checksum)
                    .ok_or_else(|| GseError::InvalidField {
                        line: line_no,
                        field: "CHK2 checksum",
                        value: field.clone(),
                    })?;
                return self.finish(block, declared).map(Some);
            }

            match block.as_mut() {
                Some(b) => push_data_line(b, line, line_no)?,
                None if line.starts_with(b"WID2") => {
                    header = Some(Wid2::parse(line, line_no)?);
                }
                None if line.starts_with(b"STA2") => {
                    if line.len() < STA2_MIN_LEN {
                        return Err(GseError::ShortLine {
                            line: line_no,
                            kind: "STA2",
                            len: line.len(),
                        });
                    }
                    let code = column(line, 5, STA2_MIN_LEN);
                    network = (!code.is_empty()).then_some(code);
                }
                None if line.starts_with(b"DAT2") => {
                    let Some(header) = header.take() else {
                        return Err(GseError::DataWithoutHeader { line: line_no });
                    };
                    block = Some(Block {
                        header,
                        network: network.take(),
                        start_line: line_no,
                        symbols: Vec::new(),
                        values: Vec::new(),
                    });
                }
                None => {}
            }
        }
    }

    fn finish(&self, block: Block, declared: u32) -> Result<Waveform, GseError> {
        let Block {
            mut header,
            network,
            symbols,
            values,
            ..
        } = block;
        let mut warnings = Vec::new();

        let samples = match header.format {
            DataFormat::Cm6 => {
                let decoded = cm6::decode(&symbols, &DecodeOptions::default())?;
                warnings.extend(decoded.warnings.into_iter().map(SectionWarning::Decode));
                decoded.samples
            }
            DataFormat::Int => values,
        };

        if samples.len() != header.sample_count {
            warn!(
                "{} {}: unpacked {} of {} samples",
                header.station,
                header.channel,
                samples.len(),
                header.sample_count
            );
            warnings.push(SectionWarning::SampleCountMismatch {
                declared: header.sample_count,
                decoded: samples.len(),
            });
            header.sample_count = samples.len();
        }

        let computed = match checksum::verify(&samples, declared) {
            Ok(computed) => computed,
            Err(mismatch) => match self.opts.checksum {
                ChecksumPolicy::Enforce => {
                    return Err(GseError::Checksum {
                        station: header.station,
                        channel: header.channel,
                        source: mismatch,
                    });
                }
                ChecksumPolicy::Warn => {
                    warn!("{} {}: {mismatch}", header.station, header.channel);
                    warnings.push(SectionWarning::ChecksumMismatch(mismatch));
                    mismatch.computed
                }
            },
        };

        debug!(
            "{} {}: {} samples @ {} Hz from {}",
            header.station,
            header.channel,
            samples.len(),
            header.sample_rate,
            header.start
        );

        Ok(Waveform {
            header,
            network,
            samples,
            declared_checksum: declared,
            checksum: computed,
            warnings,
        })
    }
}

impl<R: BufRead> Iterator for GseReader<R> {
    type Item = Result<Waveform, GseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_waveform().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

fn push_data_line(block: &mut Block, line: &[u8], line_no: usize) -> Result<(), GseError> {
    match block.header.format {
        DataFormat::Cm6 => {
            // Data ends at the first blank; anything after it is ignored.
            let end = line
                .iter()
                .position(|b| b.is_ascii_whitespace())
                .unwrap_or(line.len());
            let data = &line[..end];
            if !data.iter().all(|&b| alphabet::is_symbol(b)) {
                return Err(GseError::InvalidCm6Line { line: line_no });
            }
            block.symbols.extend_from_slice(data);
        }
        DataFormat::Int => {
            let text = String::from_utf8_lossy(line);
            for token in text.split_ascii_whitespace() {
                if block.values.len() >= block.header.sample_count {
                    return Err(GseError::TooManySamples {
                        line: line_no,
                        declared: block.header.sample_count,
                    });
                }
                let value = token.parse().map_err(|_| GseError::InvalidField {
                    line: line_no,
                    field: "INT sample",
                    value: token.to_string(),
                })?;
                block.values.push(value);
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Convenience functions
// ---------------------------------------------------------------------------

/// Read every waveform section from `reader`.
pub fn read_waveforms<R: BufRead>(
    reader: R,
    opts: ReaderOptions,
) -> Result<Vec<Waveform>, GseError> {
    GseReader::with_options(reader, opts).collect()
}

/// Read every waveform section from the file at `path`.
pub fn read_file<P: AsRef<Path>>(path: P, opts: ReaderOptions) -> Result<Vec<Waveform>, GseError> {
    let file = File::open(path)?;
    read_waveforms(BufReader::with_capacity(BUF_SIZE, file), opts)
}

/// Read several files concurrently. Results are in input order.
#[cfg(feature = "parallel")]
pub fn read_files_parallel<P: AsRef<Path> + Sync>(
    paths: &[P],
    opts: &ReaderOptions,
) -> Vec<Result<Vec<Waveform>, GseError>> {
    use rayon::prelude::*;

    paths
        .par_iter()
        .map(|path| read_file(path, opts.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
