use crate::config::AssemblyConfig;
use crate::puzzle::{AssemblyError, DATE_FORMAT, Puzzle, assemble_with};
use crate::word::{PendingWord, WordError};
use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::io::{self, BufRead};
use std::string::FromUtf8Error;
use tracing::{info, warn};

static URL_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d{4})/(\d{2})/(\d{2})(?:/|$)").expect("valid url date pattern")
});

/// One line of the scraper's JSON Lines output.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedPuzzle {
    #[serde(default)]
    pub url_from: Option<String>,
    #[serde(default)]
    pub value_date: Option<String>,
    pub solution_unjumbled: String,
    #[serde(default)]
    pub solution_jumbled: Option<String>,
    pub clue_sentence: String,
    pub jumbles: Vec<ScrapedJumble>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedJumble {
    pub jumbled: String,
    pub unjumbled: String,
}

impl ScrapedPuzzle {
    pub fn value_date(&self) -> Result<NaiveDate, IngestError> {
        record_date(self.value_date.as_deref(), self.url_from.as_deref()).ok_or_else(|| {
            IngestError::Date(
                self.value_date
                    .clone()
                    .or_else(|| self.url_from.clone())
                    .unwrap_or_default(),
            )
        })
    }

    pub fn assemble(&self, config: &AssemblyConfig) -> Result<Puzzle, IngestError> {
        let value_date = self.value_date()?;
        let words = self
            .jumbles
            .iter()
            .map(|jumble| PendingWord::new(&jumble.jumbled, &jumble.unjumbled))
            .collect::<Result<Vec<_>, _>>()?;
        let puzzle = assemble_with(
            config,
            value_date,
            &self.solution_unjumbled,
            &self.clue_sentence,
            words,
        )?;
        Ok(puzzle)
    }
}

/// Date of a scraped record: the explicit `value_date` (a date or a
/// timestamp starting with one), else the `/YYYY/MM/DD/` part of the URL.
fn record_date(value_date: Option<&str>, url_from: Option<&str>) -> Option<NaiveDate> {
    value_date
        .and_then(parse_value_date)
        .or_else(|| url_from.and_then(date_from_url))
}

pub fn parse_value_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok().or_else(|| {
        raw.get(..10)
            .and_then(|head| NaiveDate::parse_from_str(head, DATE_FORMAT).ok())
    })
}

fn date_from_url(url: &str) -> Option<NaiveDate> {
    URL_DATE.captures_iter(url).find_map(|caps| {
        NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    })
}

/// A record that could not become a puzzle.
#[derive(Debug)]
pub struct PuzzleFailure {
    /// 1-based line number in the input.
    pub line: usize,
    pub value_date: Option<NaiveDate>,
    pub error: IngestError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Assembled puzzles, ordered by date.
    pub puzzles: Vec<Puzzle>,
    /// Failures, ordered by line.
    pub failures: Vec<PuzzleFailure>,
}

/// Parses and assembles every record of a JSON Lines stream.
///
/// Only read errors abort the batch. Bad records are collected in
/// [`BatchReport::failures`] and the rest are still assembled, including
/// lines that are not valid UTF-8. When two records share a date the earlier
/// line owns it: a later line is a [`IngestError::DuplicateDate`] even if the
/// earlier one failed to assemble.
pub fn ingest_jsonl<R: BufRead>(
    reader: R,
    config: &AssemblyConfig,
) -> Result<BatchReport, IngestError> {
    let mut lines = Vec::new();
    let mut undecodable = Vec::new();
    for (idx, raw) in reader.split(b'\n').enumerate() {
        match String::from_utf8(raw?) {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => lines.push((idx + 1, line)),
            Err(err) => undecodable.push(PuzzleFailure {
                line: idx + 1,
                value_date: None,
                error: err.into(),
            }),
        }
    }

    let outcomes: Vec<(usize, Result<Puzzle, PuzzleFailure>)> = lines
        .into_par_iter()
        .map(|(line_no, text)| (line_no, ingest_line(line_no, &text, config)))
        .collect();

    // A date belongs to its first dated line, whether or not that line assembled.
    let mut report = BatchReport {
        puzzles: Vec::new(),
        failures: undecodable,
    };
    let mut seen = HashSet::new();
    for (line, outcome) in outcomes {
        match outcome {
            Ok(puzzle) if seen.insert(puzzle.value_date()) => report.puzzles.push(puzzle),
            Ok(puzzle) => report.failures.push(PuzzleFailure {
                line,
                value_date: Some(puzzle.value_date()),
                error: IngestError::DuplicateDate(puzzle.value_date()),
            }),
            Err(failure) => {
                if let Some(date) = failure.value_date {
                    seen.insert(date);
                }
                report.failures.push(failure);
            }
        }
    }
    report.failures.sort_by_key(|failure| failure.line);
    report.puzzles.sort_by_key(Puzzle::value_date);

    for failure in &report.failures {
        warn!(
            line = failure.line,
            value_date = ?failure.value_date,
            error = %failure.error,
            "skipping puzzle"
        );
    }
    info!(
        assembled = report.puzzles.len(),
        failed = report.failures.len(),
        "ingested jumble batch"
    );
    Ok(report)
}

fn ingest_line(line: usize, text: &str, config: &AssemblyConfig) -> Result<Puzzle, PuzzleFailure> {
    let record: ScrapedPuzzle = serde_json::from_str(text).map_err(|err| PuzzleFailure {
        line,
        value_date: None,
        error: err.into(),
    })?;
    record.assemble(config).map_err(|error| PuzzleFailure {
        line,
        value_date: record.value_date().ok(),
        error,
    })
}

#[derive(Deserialize)]
struct DatedLine {
    #[serde(default)]
    value_date: Option<String>,
    #[serde(default)]
    url_from: Option<String>,
}

/// Dates already present in a JSON Lines file. Unreadable records are
/// skipped.
pub fn recorded_dates<R: BufRead>(reader: R) -> Result<BTreeSet<NaiveDate>, IngestError> {
    let mut dates = BTreeSet::new();
    for (idx, raw) in reader.split(b'\n').enumerate() {
        let line = match String::from_utf8(raw?) {
            Ok(line) => line,
            Err(err) => {
                warn!(line = idx + 1, error = %err, "ignoring undecodable record");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DatedLine>(&line) {
            Ok(record) => {
                if let Some(date) =
                    record_date(record.value_date.as_deref(), record.url_from.as_deref())
                {
                    dates.insert(date);
                }
            }
            Err(err) => warn!(error = %err, "ignoring unreadable record"),
        }
    }
    Ok(dates)
}

/// The `days_back` dates ending at `end` (newest first) that still need
/// scraping. With `force`, every date is returned.
pub fn pending_dates(
    end: NaiveDate,
    days_back: u32,
    recorded: &BTreeSet<NaiveDate>,
    force: bool,
) -> Vec<NaiveDate> {
    (0..u64::from(days_back))
        .filter_map(|offset| end.checked_sub_days(Days::new(offset)))
        .filter(|date| force || !recorded.contains(date))
        .collect()
}

#[derive(Debug)]
pub enum IngestError {
    Io(io::Error),
    Encoding(FromUtf8Error),
    Json(serde_json::Error),
    Date(String),
    Word(WordError),
    Assembly(AssemblyError),
    DuplicateDate(NaiveDate),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Io(err) => write!(f, "io error: {err}"),
            IngestError::Encoding(err) => write!(f, "record is not utf-8: {err}"),
            IngestError::Json(err) => write!(f, "malformed record: {err}"),
            IngestError::Date(raw) => write!(f, "no usable date in {raw:?}"),
            IngestError::Word(err) => write!(f, "bad word: {err}"),
            IngestError::Assembly(err) => write!(f, "{err}"),
            IngestError::DuplicateDate(date) => write!(f, "duplicate puzzle for {date}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Io(err) => Some(err),
            IngestError::Encoding(err) => Some(err),
            IngestError::Json(err) => Some(err),
            IngestError::Word(err) => Some(err),
            IngestError::Assembly(err) => Some(err),
            IngestError::Date(_) | IngestError::DuplicateDate(_) => None,
        }
    }
}

impl From<io::Error> for IngestError {
    fn from(value: io::Error) -> Self {
        IngestError::Io(value)
    }
}

impl From<FromUtf8Error> for IngestError {
    fn from(value: FromUtf8Error) -> Self {
        IngestError::Encoding(value)
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(value: serde_json::Error) -> Self {
        IngestError::Json(value)
    }
}

impl From<WordError> for IngestError {
    fn from(value: WordError) -> Self {
        IngestError::Word(value)
    }
}

impl From<AssemblyError> for IngestError {
    fn from(value: AssemblyError) -> Self {
        IngestError::Assembly(value)
    }
}
