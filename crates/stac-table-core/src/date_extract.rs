//! Timestamp inference from asset filenames.
//!
//! Data providers encode acquisition dates in filenames in many different
//! ways. [`DateExtractor`] runs a fixed cascade of strategies, from the most
//! specific to the most permissive, and returns the first hit:
//!
//! 1. the extension-stripped name parsed as a whole against
//!    [`EXACT_FORMATS`], in order;
//! 2. the first `YYYYMMDD[_-]HHMM` substring;
//! 3. each standalone run of exactly eight digits, as `YYYYMMDD`;
//! 4. the injected [`Clock`]'s current time.
//!
//! The cascade order is part of the public contract: reordering changes
//! which timestamp ambiguous names resolve to.
//!
//! Shapes that look right but are not real dates (month 13, February 30)
//! are rejected by the parser and the cascade moves on.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Source of "now" for the last-resort fallback.
///
/// Injected so that reruns and tests can pin the fallback to a fixed instant.
pub trait Clock {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// One strict chrono pattern that must consume the whole stripped filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactFormat {
    /// chrono `strftime` pattern.
    pub pattern: &'static str,
    has_time: bool,
}

impl ExactFormat {
    const fn date(pattern: &'static str) -> Self {
        Self {
            pattern,
            has_time: false,
        }
    }

    const fn date_time(pattern: &'static str) -> Self {
        Self {
            pattern,
            has_time: true,
        }
    }

    /// Parse `input` in full; date-only patterns resolve to midnight.
    pub fn parse(&self, input: &str) -> Option<NaiveDateTime> {
        if self.has_time {
            NaiveDateTime::parse_from_str(input, self.pattern).ok()
        } else {
            NaiveDate::parse_from_str(input, self.pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
    }
}

/// Whole-name formats, tried in this order.
pub const EXACT_FORMATS: [ExactFormat; 7] = [
    ExactFormat::date_time("%Y%m%d%H%M"),
    ExactFormat::date("%Y%m%d"),
    ExactFormat::date("%Y-%m-%d"),
    ExactFormat::date_time("%Y%m%d_%H%M"),
    ExactFormat::date_time("%Y-%m-%dT%H%M"),
    ExactFormat::date_time("%Y-%m-%dT%H:%M"),
    ExactFormat::date_time("%Y-%m-%dT%H:%M:%S"),
];

const COMPACT_DATE_TIME: ExactFormat = ExactFormat::date_time("%Y%m%d%H%M");
const COMPACT_DATE: ExactFormat = ExactFormat::date("%Y%m%d");

static DELIMITED_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{8})[_-]([0-9]{4})").expect("delimited date-time regex is valid")
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit run regex is valid"));

/// Which cascade stage produced a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStrategy {
    /// The whole stripped name matched this exact pattern.
    Exact(&'static str),
    /// An embedded `YYYYMMDD_HHMM` / `YYYYMMDD-HHMM` substring.
    DelimitedDateTime,
    /// A standalone eight-digit `YYYYMMDD` run.
    EightDigitRun,
}

/// A timestamp recovered from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateMatch {
    /// Recovered instant; filename dates carry no zone and are read as UTC.
    pub timestamp: DateTime<Utc>,
    /// Stage that matched.
    pub strategy: DateStrategy,
}

/// Remove the last `.suffix` (only when the suffix is non-empty and dot-free).
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx + 1 < filename.len() => &filename[..idx],
        _ => filename,
    }
}

fn starts_with_year(name: &str) -> bool {
    name.len() >= 4 && name.as_bytes()[..4].iter().all(u8::is_ascii_digit)
}

/// Run the deterministic part of the cascade.
///
/// Returns `None` when only the clock fallback is left.
pub fn match_filename(filename: &str) -> Option<DateMatch> {
    let name = strip_extension(filename);

    // Every exact pattern opens with a four-digit year; chrono alone would
    // also accept shorter years.
    if starts_with_year(name) {
        for format in &EXACT_FORMATS {
            if let Some(naive) = format.parse(name) {
                return Some(DateMatch {
                    timestamp: naive.and_utc(),
                    strategy: DateStrategy::Exact(format.pattern),
                });
            }
        }
    }

    if let Some(caps) = DELIMITED_DATE_TIME.captures(name) {
        let joined = format!("{}{}", &caps[1], &caps[2]);
        if let Some(naive) = COMPACT_DATE_TIME.parse(&joined) {
            return Some(DateMatch {
                timestamp: naive.and_utc(),
                strategy: DateStrategy::DelimitedDateTime,
            });
        }
    }

    DIGIT_RUN
        .find_iter(name)
        .filter(|run| run.as_str().len() == 8)
        .find_map(|run| COMPACT_DATE.parse(run.as_str()))
        .map(|naive| DateMatch {
            timestamp: naive.and_utc(),
            strategy: DateStrategy::EightDigitRun,
        })
}

/// Filename timestamp inference with an injectable fallback clock.
#[derive(Debug, Clone, Default)]
pub struct DateExtractor<C = SystemClock> {
    clock: C,
}

impl DateExtractor<SystemClock> {
    /// Extractor that falls back to wall-clock time.
    pub fn system() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> DateExtractor<C> {
    /// Extractor that falls back to `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Best-effort timestamp for `filename`; never fails.
    ///
    /// When nothing in the name parses this is the clock's "now", which
    /// callers should read as "date unknown".
    pub fn extract(&self, filename: &str) -> DateTime<Utc> {
        match match_filename(filename) {
            Some(m) => {
                tracing::debug!(filename, strategy = ?m.strategy, "inferred datetime from filename");
                m.timestamp
            }
            None => {
                tracing::warn!(filename, "no date found in filename; using current time");
                self.clock.now()
            }
        }
    }
}

/// Coerce a free-form explicit date value into a UTC instant.
///
/// Accepts RFC 3339 (zoned values are converted to UTC), common naive
/// date-time and date layouts, and every [`EXACT_FORMATS`] pattern. Naive
/// values are taken as UTC. Blank or unrecognised input yields `None`.
pub fn parse_explicit_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(zoned) = DateTime::parse_from_rfc3339(raw) {
        return Some(zoned.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(zoned) = DateTime::parse_from_str(raw, pattern) {
            return Some(zoned.with_timezone(&Utc));
        }
    }

    const NAIVE_DATE_TIMES: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    for pattern in NAIVE_DATE_TIMES {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y/%m/%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }

    if starts_with_year(raw) {
        return EXACT_FORMATS
            .iter()
            .find_map(|format| format.parse(raw))
            .map(|naive| naive.and_utc());
    }
    None
}
