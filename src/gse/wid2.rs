// WID2 waveform identification line (GSE2.1 / IMS1.0).
//
// Fixed-column layout (0-based, end exclusive):
//
//   0..4    "WID2"
//   5..15   date         yyyy/mm/dd
//   16..28  time         hh:mm:ss.sss
//   29..34  station
//   35..38  channel
//   39..43  auxiliary id
//   44..47  sub-format   CM6 | INT
//   48..56  sample count
//   57..68  sample rate (Hz)
//   69..79  calibration factor     (optional)
//   80..87  calibration period     (optional)
//   88..94  instrument type        (optional)
//   95..100 horizontal orientation (optional)
//   101..105 vertical orientation  (optional)

use std::fmt;

use super::GseError;

/// Shortest WID2 line accepted, line terminator excluded. The last character
/// of the sample-rate column may be missing.
pub const WID2_MIN_LEN: usize = 67;

/// Trimmed contents of `line[start..end]`, clamped to the line length.
pub(crate) fn column(line: &[u8], start: usize, end: usize) -> String {
    let end = end.min(line.len());
    if start >= end {
        return String::new();
    }
    String::from_utf8_lossy(&line[start..end]).trim().to_string()
}

/// `text` if it fits `width` characters.
fn fit(field: &'static str, text: String, width: usize) -> Result<String, GseError> {
    if text.len() > width {
        Err(GseError::FieldTooWide {
            field,
            value: text,
            width,
        })
    } else {
        Ok(text)
    }
}

fn truncated(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Start time
// ---------------------------------------------------------------------------

/// Start time of the first sample, millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StartTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl StartTime {
    /// Parse `yyyy/mm/dd` and `hh:mm:ss[.fff]`.
    pub fn parse(date: &str, time: &str) -> Option<Self> {
        let mut d = date.trim().splitn(3, '/');
        let year = d.next()?.parse().ok()?;
        let month = d.next()?.parse().ok()?;
        let day = d.next()?.parse().ok()?;

        let mut t = time.trim().splitn(3, ':');
        let hour = t.next()?.parse().ok()?;
        let minute = t.next()?.parse().ok()?;
        let sec_field = t.next()?;
        let (sec, frac) = sec_field.split_once('.').unwrap_or((sec_field, ""));
        let second = sec.parse().ok()?;
        let millisecond = parse_millis(frac)?;

        let valid = (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            && second <= 60;
        valid.then_some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
        })
    }
}

fn is_leap_year(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Fractional seconds to milliseconds; digits beyond the third are dropped.
fn parse_millis(frac: &str) -> Option<u16> {
    if frac.is_empty() {
        return Some(0);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut ms = 0u16;
    for (i, b) in frac.bytes().chain(std::iter::repeat(b'0')).take(3).enumerate() {
        ms += u16::from(b - b'0') * [100, 10, 1][i];
    }
    Some(ms)
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}/{:02}/{:02} {:02}:{:02}:{:02}.{:03}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.millisecond
        )
    }
}

// ---------------------------------------------------------------------------
// Data format
// ---------------------------------------------------------------------------

/// WID2 sub-format of the DAT2 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// CM6 symbols, second-order differences.
    Cm6,
    /// Plain decimal integers.
    Int,
}

impl DataFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CM6" => Some(Self::Cm6),
            "INT" => Some(Self::Int),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cm6 => "CM6",
            Self::Int => "INT",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WID2
// ---------------------------------------------------------------------------

/// Parsed WID2 line.
#[derive(Debug, Clone, PartialEq)]
pub struct Wid2 {
    pub start: StartTime,
    pub station: String,
    pub channel: String,
    pub aux_id: String,
    pub format: DataFormat,
    /// Sample count as declared by the header.
    pub sample_count: usize,
    /// Samples per second.
    pub sample_rate: f64,
    pub calib: Option<f64>,
    pub calper: Option<f64>,
    pub instrument: String,
    pub hang: Option<f64>,
    pub vang: Option<f64>,
}

impl Wid2 {
    /// A CM6 header with the optional fields left blank.
    pub fn new(
        start: StartTime,
        station: &str,
        channel: &str,
        sample_rate: f64,
        sample_count: usize,
    ) -> Self {
        Self {
            start,
            station: station.to_string(),
            channel: channel.to_string(),
            aux_id: String::new(),
            format: DataFormat::Cm6,
            sample_count,
            sample_rate,
            calib: None,
            calper: None,
            instrument: String::new(),
            hang: None,
            vang: None,
        }
    }

    /// Parse a WID2 line. `line_no` is only used for error reporting.
    pub fn parse(line: &[u8], line_no: usize) -> Result<Self, GseError> {
        if line.len() < WID2_MIN_LEN {
            return Err(GseError::ShortLine {
                line: line_no,
                kind: "WID2",
                len: line.len(),
            });
        }

        let invalid = |field: &'static str, value: String| GseError::InvalidField {
            line: line_no,
            field,
            value,
        };

        let date = column(line, 5, 15);
        let time = column(line, 16, 28);
        let start = StartTime::parse(&date, &time)
            .ok_or_else(|| invalid("start time", format!("{date} {time}")))?;

        let format_str = column(line, 44, 47);
        let format = DataFormat::parse(&format_str).ok_or_else(|| GseError::UnsupportedFormat {
            line: line_no,
            format: format_str.clone(),
        })?;

        let count_str = column(line, 48, 56);
        let sample_count = count_str
            .parse()
            .map_err(|_| invalid("sample count", count_str.clone()))?;

        let rate_str = column(line, 57, 68);
        let sample_rate: f64 = rate_str
            .parse()
            .map_err(|_| invalid("sample rate", rate_str.clone()))?;
        if !sample_rate.is_finite() || sample_rate < 0.0 {
            return Err(invalid("sample rate", rate_str));
        }

        let optional = |start: usize, end: usize| column(line, start, end).parse::<f64>().ok();

        Ok(Self {
            start,
            station: column(line, 29, 34),
            channel: column(line, 35, 38),
            aux_id: column(line, 39, 43),
            format,
            sample_count,
            sample_rate,
            calib: optional(69, 79),
            calper: optional(80, 87),
            instrument: column(line, 88, 94),
            hang: optional(95, 100),
            vang: optional(101, 105),
        })
    }

    /// Render the fixed-column WID2 line (without newline).
    ///
    /// Fails with [`GseError::FieldTooWide`] when a value would spill into
    /// the next column.
    pub fn to_line(&self) -> Result<String, GseError> {
        let opt = |field: &'static str, v: Option<f64>, width: usize, prec: usize| match v {
            Some(v) => fit(field, format!("{v:>width$.prec$}"), width),
            None => Ok(" ".repeat(width)),
        };
        let calib = match self.calib {
            Some(v) => fit("calibration factor", format!("{:>10}", exp_notation(v, 2)), 10)?,
            None => " ".repeat(10),
        };
        let line = format!(
            "WID2 {} {:<5} {:<3} {:<4} {} {} {} {} {} {:<6} {} {}",
            fit("start time", self.start.to_string(), 23)?,
            truncated(&self.station, 5),
            truncated(&self.channel, 3),
            truncated(&self.aux_id, 4),
            self.format,
            fit("sample count", format!("{:>8}", self.sample_count), 8)?,
            fit("sample rate", format!("{:>11.6}", self.sample_rate), 11)?,
            calib,
            opt("calibration period", self.calper, 7, 3)?,
            truncated(&self.instrument, 6),
            opt("horizontal orientation", self.hang, 5, 1)?,
            opt("vertical orientation", self.vang, 4, 1)?,
        );
        Ok(line.trim_end().to_string())
    }

    /// Seconds between the first and the last sample.
    pub fn span_seconds(&self) -> f64 {
        if self.sample_rate > 0.0 && self.sample_count > 1 {
            (self.sample_count - 1) as f64 / self.sample_rate
        } else {
            0.0
        }
    }
}

/// Fortran-style `E` notation, e.g. `1.00e+00`.
fn exp_notation(value: f64, precision: usize) -> String {
    let s = format!("{value:.precision$e}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
        }
        None => s,
    }
}
