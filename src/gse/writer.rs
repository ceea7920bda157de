// GSE2 waveform writer.

use std::io::{self, Write};

use log::debug;

use super::wid2::{DataFormat, Wid2};
use super::{DEFAULT_LINE_WIDTH, GseError};
use crate::cm6::{self, DEFAULT_DIFFERENCES, DigitBudget, EncodeOptions, checksum};
use crate::io::write_cm6_lines;

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Maximum characters per data line. `0` puts the whole block on one line.
    pub line_width: usize,
    /// Digit budget for CM6 blocks. [`DigitBudget::Gse`] keeps the output
    /// readable by every GSE2 implementation.
    pub budget: DigitBudget,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            budget: DigitBudget::Gse,
        }
    }
}

/// Writes WID2 / STA2 / DAT2 / CHK2 sections.
pub struct GseWriter<W> {
    inner: W,
    opts: WriterOptions,
    symbols: Vec<u8>,
    sections: usize,
}

impl<W: Write> GseWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, WriterOptions::default())
    }

    pub fn with_options(inner: W, opts: WriterOptions) -> Self {
        Self {
            inner,
            opts,
            symbols: Vec::new(),
            sections: 0,
        }
    }

    /// Sections written so far.
    pub fn sections(&self) -> usize {
        self.sections
    }

    /// Write one waveform section and return its checksum.
    ///
    /// The sample count written to WID2 is always `samples.len()`, whatever
    /// `header.sample_count` says. Nothing is written if CM6 encoding fails or
    /// a header value does not fit its WID2 column.
    pub fn write_waveform(
        &mut self,
        header: &Wid2,
        network: Option<&str>,
        samples: &[i32],
    ) -> Result<u32, GseError> {
        if header.format == DataFormat::Cm6 {
            self.symbols.clear();
            let opts = EncodeOptions {
                differences: DEFAULT_DIFFERENCES,
                budget: self.opts.budget,
            };
            cm6::encode_into(samples, &mut self.symbols, &opts)?;
        }

        let mut wid2 = header.clone();
        wid2.sample_count = samples.len();
        let wid2_line = wid2.to_line()?;
        writeln!(self.inner, "{wid2_line}")?;
        if let Some(network) = network {
            writeln!(self.inner, "STA2 {network:<9}")?;
        }
        writeln!(self.inner, "DAT2")?;

        match header.format {
            DataFormat::Cm6 => {
                write_cm6_lines(&mut self.inner, &self.symbols, self.opts.line_width)?;
            }
            DataFormat::Int => write_values(&mut self.inner, samples, self.opts.line_width)?,
        }

        let sum = checksum(samples);
        writeln!(self.inner, "CHK2 {sum:>8}")?;
        self.sections += 1;
        debug!(
            "wrote {} {}: {} samples, checksum {sum}",
            header.station,
            header.channel,
            samples.len()
        );
        Ok(sum)
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn write_values<W: Write>(w: &mut W, samples: &[i32], width: usize) -> io::Result<()> {
    let mut line = String::new();
    for value in samples {
        let token = value.to_string();
        if !line.is_empty() && width > 0 && line.len() + 1 + token.len() > width {
            writeln!(w, "{line}")?;
            line.clear();
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&token);
    }
    if !line.is_empty() {
        writeln!(w, "{line}")?;
    }
    Ok(())
}
