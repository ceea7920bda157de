// GSE2 / IMS1.0 waveform sections.
//
// Only the structures needed to move sample data are recognised:
//
// - `WID2`: waveform identification (time, station, channel, rate, format)
// - `STA2`: station network code
// - `DAT2`: start of the data block (CM6 symbols or INT values)
// - `CHK2`: end of the data block and its checksum
//
// Every other line is ignored.

pub mod reader;
pub mod wid2;
pub mod writer;

use std::io;

use thiserror::Error;

use crate::cm6::{ChecksumMismatch, DecodeError, DecodeWarning, EncodeError};

pub use reader::{GseReader, ReaderOptions, Waveform, read_file, read_waveforms};
pub use wid2::{DataFormat, StartTime, Wid2};
pub use writer::{GseWriter, WriterOptions};

#[cfg(feature = "parallel")]
pub use reader::read_files_parallel;

/// Default width of CM6 data lines.
pub const DEFAULT_LINE_WIDTH: usize = 80;

// ---------------------------------------------------------------------------
// Policies and warnings
// ---------------------------------------------------------------------------

/// What a CHK2 mismatch means for the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// Keep the section and record [`SectionWarning::ChecksumMismatch`].
    #[default]
    Warn,
    /// Fail with [`GseError::Checksum`].
    Enforce,
}

/// Non-fatal problems found in one waveform section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionWarning {
    Decode(DecodeWarning),
    /// WID2 declared a different number of samples than the block held.
    SampleCountMismatch { declared: usize, decoded: usize },
    ChecksumMismatch(ChecksumMismatch),
}

impl std::fmt::Display for SectionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(w) => write!(f, "{w}"),
            Self::SampleCountMismatch { declared, decoded } => {
                write!(f, "unpacked {decoded} of {declared} samples")
            }
            Self::ChecksumMismatch(m) => write!(f, "{m}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {kind} line is too short ({len} characters)")]
    ShortLine {
        line: usize,
        kind: &'static str,
        len: usize,
    },
    #[error("line {line}: only CM6 and INT data are supported, not {format:?}")]
    UnsupportedFormat { line: usize, format: String },
    #[error("line {line}: invalid {field} {value:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("WID2 {field} {value:?} does not fit its {width}-character column")]
    FieldTooWide {
        field: &'static str,
        value: String,
        width: usize,
    },
    #[error("line {line}: DAT2 read but the data format is not yet known")]
    DataWithoutHeader { line: usize },
    #[error("line {line}: expected a line of CM6 characters")]
    InvalidCm6Line { line: usize },
    #[error("line {line}: more than {declared} INT samples")]
    TooManySamples { line: usize, declared: usize },
    #[error("input ended inside the DAT2 block that started on line {line}")]
    UnterminatedData { line: usize },
    #[error("{station} {channel}: {source}")]
    Checksum {
        station: String,
        channel: String,
        source: ChecksumMismatch,
    },
    #[error("CM6 decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("CM6 encode failed: {0}")]
    Encode(#[from] EncodeError),
}
