// Command-line front end for gsecm6.
//
// Subcommands convert between integer text files and CM6 text, compute CHK2
// checksums, and summarise the waveform sections of GSE2 files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::cm6::{
    self, DEFAULT_DIFFERENCES, DecodeOptions, DigitBudget, EncodeOptions, InvalidBytePolicy,
    SampleCount, alphabet,
    checksum::CHECKSUM_MODULO,
    encoder::{GSE_MAX_DIGITS, MAX_DIGITS},
};
use crate::gse::{self, ChecksumPolicy, DEFAULT_LINE_WIDTH, GseError, ReaderOptions, Waveform};
use crate::io as cm6_io;

const BUF_SIZE: usize = 64 * 1024;

/// Largest differencing order accepted on the command line.
const MAX_DIFFERENCES: u32 = 16;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// GSE2 CM6 waveform codec.
#[derive(Parser, Debug)]
#[command(
    name = "gsecm6",
    version,
    about = "GSE2 CM6 encoder/decoder and CHK2 checksum tool",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode a text list of integers as CM6.
    Encode(EncodeArgs),
    /// Decode CM6 text into a list of integers.
    Decode(DecodeArgs),
    /// Print the CHK2 checksum of a text list of integers.
    Checksum(ChecksumArgs),
    /// Summarise the waveform sections of GSE2 files.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct IoArgs {
    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Differencing order applied before encoding.
    #[arg(long, short = 'd', value_parser = clap::value_parser!(u32).range(0..=MAX_DIFFERENCES as i64), default_value_t = DEFAULT_DIFFERENCES)]
    differences: u32,

    /// Maximum CM6 characters per output line (0 = one line).
    #[arg(long = "line-width", short = 'w', default_value_t = DEFAULT_LINE_WIDTH)]
    line_width: usize,

    /// Reject values that need more than six CM6 characters.
    #[arg(long = "gse-budget")]
    gse_budget: bool,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Differencing order the stream was encoded with.
    #[arg(long, short = 'd', value_parser = clap::value_parser!(u32).range(0..=MAX_DIFFERENCES as i64), default_value_t = DEFAULT_DIFFERENCES)]
    differences: u32,

    /// Number of samples to decode (0 or negative = all).
    #[arg(long, short = 'n', allow_negative_numbers = true, default_value_t = 0)]
    count: i64,

    /// Fail on bytes outside the CM6 alphabet instead of reading them as zero.
    #[arg(long)]
    strict: bool,

    /// Expected CHK2 checksum of the decoded samples.
    #[arg(long = "checksum")]
    expected_checksum: Option<u32>,

    /// Check/compute only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    #[command(flatten)]
    io: IoArgs,
}

#[derive(Args, Debug)]
struct ChecksumArgs {
    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// GSE2 files to read.
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Report CHK2 mismatches as warnings instead of failing.
    #[arg(long = "ignore-checksum", short = 'i')]
    ignore_checksum: bool,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    Checksum,
    Inspect,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    no_output: bool,
    encode: EncodeOptions,
    decode: DecodeOptions,
    line_width: usize,
    expected_checksum: Option<u32>,
    checksum_policy: ChecksumPolicy,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    files: Vec<PathBuf>,
}

impl Options {
    fn new(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            use_stdout: false,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            no_output: false,
            encode: EncodeOptions::default(),
            decode: DecodeOptions::default(),
            line_width: DEFAULT_LINE_WIDTH,
            expected_checksum: None,
            checksum_policy: ChecksumPolicy::Enforce,
            input_file: None,
            output_file: None,
            files: Vec::new(),
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    let command = match &cli.command {
        Cmd::Encode(_) => Command::Encode,
        Cmd::Decode(_) => Command::Decode,
        Cmd::Checksum(_) => Command::Checksum,
        Cmd::Inspect(_) => Command::Inspect,
        Cmd::Config => Command::Config,
    };
    let mut opts = Options::new(command, &cli);

    match cli.command {
        Cmd::Encode(args) => {
            opts.encode = EncodeOptions {
                differences: args.differences,
                budget: if args.gse_budget {
                    DigitBudget::Gse
                } else {
                    DigitBudget::Extended
                },
            };
            opts.line_width = args.line_width;
            opts.use_stdout = args.io.stdout;
            opts.input_file = args.io.input.or(args.io.input_pos);
            opts.output_file = args.io.output.or(args.io.output_pos);
        }
        Cmd::Decode(args) => {
            opts.decode = DecodeOptions {
                differences: args.differences,
                count: SampleCount::from_requested(args.count),
                invalid_bytes: if args.strict {
                    InvalidBytePolicy::Reject
                } else {
                    InvalidBytePolicy::Zero
                },
            };
            opts.expected_checksum = args.expected_checksum;
            opts.no_output = args.no_output;
            opts.use_stdout = args.io.stdout;
            opts.input_file = args.io.input.or(args.io.input_pos);
            opts.output_file = args.io.output.or(args.io.output_pos);
        }
        Cmd::Checksum(args) => {
            opts.input_file = args.input;
        }
        Cmd::Inspect(args) => {
            opts.files = args.files;
            if args.ignore_checksum {
                opts.checksum_policy = ChecksumPolicy::Warn;
            }
        }
        Cmd::Config => {}
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("gsecm6".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>, String> {
    match path {
        Some(path) => File::open(path)
            .map(|f| Box::new(BufReader::with_capacity(BUF_SIZE, f)) as Box<dyn BufRead>)
            .map_err(|e| format!("input file: {}: {e}", path.display())),
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(opts: &Options) -> Result<Box<dyn Write>, String> {
    if opts.no_output {
        return Ok(Box::new(io::sink()));
    }
    match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => Ok(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
        (false, Some(path)) => {
            if path.exists() && !opts.force {
                return Err(format!(
                    "output file exists, use -f to overwrite: {}",
                    path.display()
                ));
            }
            File::create(path)
                .map(|f| Box::new(BufWriter::with_capacity(BUF_SIZE, f)) as Box<dyn Write>)
                .map_err(|e| format!("output file: {}: {e}", path.display()))
        }
    }
}

fn open_streams(opts: &Options) -> Result<(Box<dyn BufRead>, Box<dyn Write>), i32> {
    let input = open_input(opts.input_file.as_deref());
    let output = input.and_then(|input| Ok((input, open_output(opts)?)));
    output.map_err(|e| {
        eprintln!("gsecm6: {e}");
        1
    })
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("gsecm6 version {version} (Rust), Copyright (C) gsecm6 contributors");
    eprintln!("Licensed under the MIT License");

    let parallel = cfg!(feature = "parallel") as u8;
    let alphabet = String::from_utf8_lossy(&alphabet::ALPHABET);

    eprintln!("PARALLEL={parallel}");
    eprintln!("ALPHABET={alphabet}");
    eprintln!("DEFAULT_DIFFERENCES={DEFAULT_DIFFERENCES}");
    eprintln!("DEFAULT_LINE_WIDTH={DEFAULT_LINE_WIDTH}");
    eprintln!("GSE_MAX_DIGITS={GSE_MAX_DIGITS}");
    eprintln!("MAX_DIGITS={MAX_DIGITS}");
    eprintln!("CHECKSUM_MODULO={CHECKSUM_MODULO}");

    0
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let (input, mut output) = match open_streams(opts) {
        Ok(streams) => streams,
        Err(code) => return code,
    };

    let stats = match cm6_io::encode_stream(input, &mut output, &opts.encode, opts.line_width) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("gsecm6: encode error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "gsecm6: encoder: samples: {}, symbols: {}, lines: {}, checksum: {}",
            stats.samples, stats.symbols, stats.lines, stats.checksum
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "encode",
            "samples": stats.samples,
            "symbols": stats.symbols,
            "lines": stats.lines,
            "checksum": stats.checksum,
            "differences": opts.encode.differences,
            "symbols_per_sample": stats.ratio(),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let (input, mut output) = match open_streams(opts) {
        Ok(streams) => streams,
        Err(code) => return code,
    };

    let stats = match cm6_io::decode_stream(input, &mut output, &opts.decode) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("gsecm6: decode error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "gsecm6: decoder: symbols: {}, samples: {}, checksum: {}, warnings: {}",
            stats.symbols,
            stats.samples,
            stats.checksum,
            stats.warnings.len()
        );
    }

    if opts.json_output {
        let warnings: Vec<String> = stats.warnings.iter().map(|w| w.to_string()).collect();
        let json = serde_json::json!({
            "command": "decode",
            "symbols": stats.symbols,
            "samples": stats.samples,
            "checksum": stats.checksum,
            "differences": opts.decode.differences,
            "warnings": warnings,
        });
        eprintln!("{json:#}");
    }

    if let Some(expected) = opts.expected_checksum
        && expected != stats.checksum
    {
        eprintln!(
            "gsecm6: checksum mismatch: expected {expected}, computed {}",
            stats.checksum
        );
        return 1;
    }

    0
}

// ---------------------------------------------------------------------------
// Checksum command
// ---------------------------------------------------------------------------

fn cmd_checksum(opts: &Options) -> i32 {
    let samples = match open_input(opts.input_file.as_deref()) {
        Ok(input) => cm6_io::read_samples(input).map_err(|e| e.to_string()),
        Err(e) => Err(e),
    };
    let samples = match samples {
        Ok(samples) => samples,
        Err(e) => {
            eprintln!("gsecm6: {e}");
            return 1;
        }
    };

    let sum = cm6::checksum(&samples);
    println!("{sum}");

    if opts.json_output {
        let json = serde_json::json!({
            "command": "checksum",
            "samples": samples.len(),
            "checksum": sum,
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

#[cfg(feature = "parallel")]
fn read_all(files: &[PathBuf], opts: &ReaderOptions) -> Vec<Result<Vec<Waveform>, GseError>> {
    gse::read_files_parallel(files, opts)
}

#[cfg(not(feature = "parallel"))]
fn read_all(files: &[PathBuf], opts: &ReaderOptions) -> Vec<Result<Vec<Waveform>, GseError>> {
    files
        .iter()
        .map(|path| gse::read_file(path, opts.clone()))
        .collect()
}

fn describe(w: &Waveform) -> String {
    let mut line = format!(
        "{} {} {} {} samples @ {} Hz CHK2 {}",
        w.id(),
        w.start(),
        w.header.format,
        w.samples.len(),
        w.sample_rate(),
        w.checksum
    );
    for warning in &w.warnings {
        line.push_str(&format!(" [{warning}]"));
    }
    line
}

fn cmd_inspect(opts: &Options) -> i32 {
    let reader_opts = ReaderOptions {
        checksum: opts.checksum_policy,
    };
    let results = read_all(&opts.files, &reader_opts);

    let mut exit_code = 0;
    let mut report = Vec::new();
    for (path, result) in opts.files.iter().zip(results) {
        let waveforms = match result {
            Ok(waveforms) => waveforms,
            Err(e) => {
                eprintln!("gsecm6: {}: {e}", path.display());
                exit_code = 1;
                continue;
            }
        };
        for w in &waveforms {
            if !opts.quiet {
                println!("{}: {}", path.display(), describe(w));
            }
            if opts.json_output {
                let warnings: Vec<String> = w.warnings.iter().map(|x| x.to_string()).collect();
                report.push(serde_json::json!({
                    "file": path.display().to_string(),
                    "id": w.id(),
                    "start": w.start().to_string(),
                    "format": w.header.format.as_str(),
                    "samples": w.samples.len(),
                    "sample_rate": w.sample_rate(),
                    "checksum": w.checksum,
                    "declared_checksum": w.declared_checksum,
                    "warnings": warnings,
                }));
            }
        }
        if opts.verbose > 0 && !opts.quiet {
            eprintln!(
                "gsecm6: {}: {} waveform sections",
                path.display(),
                waveforms.len()
            );
        }
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "inspect",
            "waveforms": report,
        });
        eprintln!("{json:#}");
    }

    exit_code
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(opts: &Options) -> &'static str {
    match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // -c wins over an output filename.
    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        eprintln!(
            "gsecm6: warning: -c option overrides output filename: {}",
            path.display()
        );
    }

    let exit_code = match opts.command {
        Command::Encode => cmd_encode(&opts),
        Command::Decode => cmd_decode(&opts),
        Command::Checksum => cmd_checksum(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("gsecm6".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    fn parse_fails(args: &[&str]) -> bool {
        let argv = std::iter::once("gsecm6").chain(args.iter().copied());
        Cli::try_parse_from(argv).is_err()
    }

    #[test]
    fn encode_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "encode",
            "--differences",
            "1",
            "--line-width",
            "64",
            "--gse-budget",
            "in.txt",
            "out.cm6",
        ]);
        assert_eq!(opts.command, Command::Encode);
        assert_eq!(opts.encode.differences, 1);
        assert_eq!(opts.encode.budget, DigitBudget::Gse);
        assert_eq!(opts.line_width, 64);
        assert_eq!(opts.input_file, Some(PathBuf::from("in.txt")));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.cm6")));
    }

    #[test]
    fn encode_defaults() {
        let opts = parse_opts(&["encode"]);
        assert_eq!(opts.encode.differences, DEFAULT_DIFFERENCES);
        assert_eq!(opts.encode.budget, DigitBudget::Extended);
        assert_eq!(opts.line_width, DEFAULT_LINE_WIDTH);
        assert!(opts.input_file.is_none());
        assert!(opts.output_file.is_none());
    }

    #[test]
    fn decode_subcommand_maps_correctly() {
        let opts = parse_opts(&[
            "--quiet",
            "decode",
            "-d",
            "0",
            "--count",
            "12",
            "--strict",
            "--checksum",
            "4711",
            "--check-only",
            "--input",
            "in.cm6",
            "--output",
            "out.txt",
        ]);
        assert_eq!(opts.command, Command::Decode);
        assert_eq!(opts.decode.differences, 0);
        assert_eq!(opts.decode.count, SampleCount::Exactly(12));
        assert_eq!(opts.decode.invalid_bytes, InvalidBytePolicy::Reject);
        assert_eq!(opts.expected_checksum, Some(4711));
        assert!(opts.no_output);
        assert!(opts.quiet);
        assert_eq!(opts.input_file, Some(PathBuf::from("in.cm6")));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn non_positive_count_means_all() {
        assert_eq!(parse_opts(&["decode", "--count", "-1"]).decode.count, SampleCount::All);
        assert_eq!(parse_opts(&["decode"]).decode.count, SampleCount::All);
    }

    #[test]
    fn differences_are_bounded() {
        assert!(parse_fails(&["encode", "--differences", "17"]));
        assert!(parse_fails(&["decode", "-d", "-1"]));
    }

    #[test]
    fn global_stdio_and_force_flags() {
        let opts = parse_opts(&["--force", "encode", "--stdout", "in", "out"]);
        assert!(opts.use_stdout);
        assert!(opts.force);
    }

    #[test]
    fn verbose_is_capped() {
        let opts = parse_opts(&["-v", "-v", "-v", "encode"]);
        assert_eq!(opts.verbose, 2);
        assert_eq!(log_filter(&opts), "debug");
        assert_eq!(log_filter(&parse_opts(&["-q", "config"])), "error");
        assert_eq!(log_filter(&parse_opts(&["config"])), "warn");
    }

    #[test]
    fn inspect_flags_parse() {
        let opts = parse_opts(&["inspect", "a.gse", "b.gse"]);
        assert_eq!(opts.command, Command::Inspect);
        assert_eq!(opts.files, [PathBuf::from("a.gse"), PathBuf::from("b.gse")]);
        assert_eq!(opts.checksum_policy, ChecksumPolicy::Enforce);

        let lenient = parse_opts(&["inspect", "--ignore-checksum", "a.gse"]);
        assert_eq!(lenient.checksum_policy, ChecksumPolicy::Warn);

        assert!(parse_fails(&["inspect"]));
    }

    #[test]
    fn checksum_and_config_map() {
        let opts = parse_opts(&["--json", "checksum", "samples.txt"]);
        assert_eq!(opts.command, Command::Checksum);
        assert!(opts.json_output);
        assert_eq!(opts.input_file, Some(PathBuf::from("samples.txt")));
        assert_eq!(parse_opts(&["config"]).command, Command::Config);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(parse_fails(&["-q", "-v", "config"]));
    }

    #[test]
    fn fuzz_hook_tolerates_garbage() {
        fuzz_try_parse_args(&["--nope".into()]);
        fuzz_try_parse_args(&["decode".into(), "--count".into(), "x".into()]);
        fuzz_try_parse_args(&[]);
    }
}
