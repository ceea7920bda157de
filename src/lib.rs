//! gsecm6: the GSE2 CM6 waveform codec in Rust.
//!
//! The crate provides:
//! - The CM6 codec: alphabet, differencing, encoder, decoder and the CHK2
//!   checksum (`cm6`)
//! - GSE2 waveform section reading and writing (`gse`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use gsecm6::cm6::{self, DecodeOptions, EncodeOptions};
//!
//! let samples = [12, 15, 21, 30, 28, -4];
//! let symbols = cm6::encode(&samples, &EncodeOptions::default()).unwrap();
//! assert!(symbols.iter().all(|b| b.is_ascii_graphic()));
//!
//! let decoded = cm6::decode(&symbols, &DecodeOptions::default()).unwrap();
//! assert_eq!(decoded.samples, samples);
//! assert_eq!(cm6::checksum(&decoded.samples), 102);
//! ```

pub mod cm6;
pub mod gse;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use cm6::{DecodeOptions, EncodeOptions, checksum, decode, encode};
