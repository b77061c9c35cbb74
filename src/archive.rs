use crate::data::{
    ArchiveStore, ArchivedArchiveStore, ArchivedPuzzleRecord, ArchivedRange, ArchivedWordRecord,
    FORMAT_VERSION, PuzzleRecord, Range, WordRecord,
};
use crate::puzzle::{DATE_FORMAT, Puzzle};
use crate::sanitize::sanitize;
use chrono::NaiveDate;
use fst::Automaton;
use fst::automaton::Str;
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use rkyv::rancor::Error as RkyvError;
use rkyv::util::AlignedVec;
use rkyv::{access, access_unchecked, to_bytes};
use std::fmt;
use std::io::{self, Cursor};
use std::num::ParseIntError;
use std::path::Path;
use zstd::bulk::compress as zstd_compress;
use zstd::stream::decode_all;

const ARCHIVE_COMPRESSION_LEVEL: i32 = 4;

/// Read-only collection of assembled puzzles keyed by date.
pub struct PuzzleArchive {
    bytes: AlignedVec,
    index: Map<Vec<u8>>,
}

impl PuzzleArchive {
    /// Serializes `puzzles` into a compressed archive. Dates must be unique.
    pub fn build(puzzles: &[Puzzle]) -> Result<Vec<u8>, ArchiveError> {
        let mut ordered: Vec<&Puzzle> = puzzles.iter().collect();
        ordered.sort_by_key(|puzzle| puzzle.value_date());
        if let Some(pair) = ordered
            .windows(2)
            .find(|pair| pair[0].value_date() == pair[1].value_date())
        {
            return Err(ArchiveError::DuplicateDate(pair[0].value_date()));
        }

        let mut records = Vec::with_capacity(ordered.len());
        let mut words = Vec::new();
        let mut index = MapBuilder::memory();
        for (idx, puzzle) in ordered.iter().enumerate() {
            let key = puzzle.date_key();
            index.insert(&key, idx as u64)?;
            let start = words.len() as u32;
            words.extend(puzzle.words().iter().map(|word| WordRecord {
                scrambled: word.scrambled().to_string(),
                solved: word.solved().to_string(),
                contribution_indices: word
                    .contribution_indices()
                    .iter()
                    .map(|&index| index as u32)
                    .collect(),
            }));
            records.push(PuzzleRecord {
                value_date: key,
                answer_display: puzzle.answer_display().to_string(),
                answer_canonical: puzzle.answer_canonical().to_string(),
                clue_sentence: puzzle.clue_sentence().to_string(),
                words: Range::new(start, puzzle.words().len() as u32),
            });
        }

        let store = ArchiveStore {
            format_version: FORMAT_VERSION,
            puzzles: records,
            words,
            date_index: index.into_inner()?,
        };
        let archived = to_bytes::<RkyvError>(&store)?;
        Ok(zstd_compress(archived.as_slice(), ARCHIVE_COMPRESSION_LEVEL)?)
    }

    /// Decompresses and validates an archive produced by [`PuzzleArchive::build`].
    pub fn open(compressed: &[u8]) -> Result<Self, ArchiveError> {
        let decompressed = decode_all(Cursor::new(compressed))
            .map_err(|err| ArchiveError::Corrupt(format!("decompression failed: {err}")))?;
        let mut bytes = AlignedVec::with_capacity(decompressed.len());
        bytes.extend_from_slice(&decompressed);

        let store = access::<ArchivedArchiveStore, RkyvError>(&bytes)
            .map_err(|err| ArchiveError::Corrupt(err.to_string()))?;
        let version = store.format_version.to_native();
        if version != FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedVersion(version));
        }
        let word_count = store.words.len();
        for record in store.puzzles.iter() {
            let start = record.words.start.to_native() as usize;
            let len = record.words.len.to_native() as usize;
            if start.checked_add(len).is_none_or(|end| end > word_count) {
                return Err(ArchiveError::Corrupt(format!(
                    "word range of {} is out of bounds",
                    record.value_date.as_str()
                )));
            }
        }
        let index = Map::new(store.date_index.as_slice().to_vec())?;
        if index.len() != store.puzzles.len() {
            return Err(ArchiveError::Corrupt(format!(
                "date index holds {} keys for {} puzzles",
                index.len(),
                store.puzzles.len()
            )));
        }

        Ok(Self { bytes, index })
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let compressed = std::fs::read(path)?;
        Self::open(&compressed)
    }

    fn store(&self) -> &ArchivedArchiveStore {
        // SAFETY: `open` validated these bytes and they are never mutated.
        unsafe { access_unchecked::<ArchivedArchiveStore>(&self.bytes) }
    }

    pub fn len(&self) -> usize {
        self.store().puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a puzzle by its `YYYY-MM-DD` key.
    pub fn get(&self, date_key: &str) -> Option<PuzzleView<'_>> {
        let idx = self.index.get(date_key)?;
        self.view(idx as usize)
    }

    pub fn get_date(&self, date: NaiveDate) -> Option<PuzzleView<'_>> {
        self.get(&date.format(DATE_FORMAT).to_string())
    }

    /// The earliest puzzle in the archive.
    pub fn first(&self) -> Option<PuzzleView<'_>> {
        self.view(0)
    }

    /// Up to `limit` puzzles whose date key starts with `prefix`, oldest
    /// first. `"2024-03"` selects a month.
    pub fn prefix(&self, prefix: &str, limit: usize) -> Vec<PuzzleView<'_>> {
        let automaton = Str::new(prefix).starts_with();
        let mut stream = self.index.search(automaton).into_stream();
        let mut results = Vec::new();
        while let Some((_, idx)) = stream.next() {
            if results.len() >= limit {
                break;
            }
            if let Some(view) = self.view(idx as usize) {
                results.push(view);
            }
        }
        results
    }

    pub fn iter(&self) -> impl Iterator<Item = PuzzleView<'_>> {
        (0..self.len()).filter_map(|idx| self.view(idx))
    }

    fn view(&self, idx: usize) -> Option<PuzzleView<'_>> {
        let store = self.store();
        store
            .puzzles
            .get(idx)
            .map(|record| PuzzleView { store, record })
    }
}

#[derive(Clone, Copy)]
pub struct PuzzleView<'a> {
    store: &'a ArchivedArchiveStore,
    record: &'a ArchivedPuzzleRecord,
}

impl<'a> PuzzleView<'a> {
    pub fn date_key(&self) -> &'a str {
        self.record.value_date.as_str()
    }

    pub fn value_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date_key(), DATE_FORMAT).ok()
    }

    pub fn answer_display(&self) -> &'a str {
        self.record.answer_display.as_str()
    }

    pub fn answer_canonical(&self) -> &'a str {
        self.record.answer_canonical.as_str()
    }

    pub fn clue_sentence(&self) -> &'a str {
        self.record.clue_sentence.as_str()
    }

    pub fn words(&self) -> Vec<WordView<'a>> {
        range_slice(self.store.words.as_slice(), &self.record.words)
            .iter()
            .map(|record| WordView { record })
            .collect()
    }

    pub fn sanitized(&self, mask: char) -> String {
        sanitize(self.answer_display(), self.answer_canonical(), mask)
    }
}

#[derive(Clone, Copy)]
pub struct WordView<'a> {
    record: &'a ArchivedWordRecord,
}

impl<'a> WordView<'a> {
    pub fn scrambled(&self) -> &'a str {
        self.record.scrambled.as_str()
    }

    pub fn solved(&self) -> &'a str {
        self.record.solved.as_str()
    }

    pub fn contribution_indices(&self) -> Vec<usize> {
        self.record
            .contribution_indices
            .iter()
            .map(|index| index.to_native() as usize)
            .collect()
    }

    /// Indices in the comma-delimited column format.
    pub fn indices_text(&self) -> String {
        indices_to_text(&self.contribution_indices())
    }

    pub fn contributed_letters(&self) -> String {
        crate::word::contributed_letters(self.solved(), &self.contribution_indices())
    }
}

fn range_slice<'a, T>(data: &'a [T], range: &'a ArchivedRange) -> &'a [T] {
    let start = range.start.to_native() as usize;
    let len = range.len.to_native() as usize;
    &data[start..start + len]
}

/// Renders contribution indices as `"2,0,1"`.
pub fn indices_to_text(indices: &[usize]) -> String {
    indices
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses the output of [`indices_to_text`]. An empty string is an empty list.
pub fn indices_from_text(text: &str) -> Result<Vec<usize>, ParseIntError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(',').map(|part| part.trim().parse()).collect()
}

#[derive(Debug)]
pub enum ArchiveError {
    Io(io::Error),
    Serialize(RkyvError),
    Index(fst::Error),
    Corrupt(String),
    UnsupportedVersion(u32),
    DuplicateDate(NaiveDate),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Io(err) => write!(f, "io error: {err}"),
            ArchiveError::Serialize(err) => write!(f, "serialization failed: {err}"),
            ArchiveError::Index(err) => write!(f, "date index error: {err}"),
            ArchiveError::Corrupt(detail) => write!(f, "corrupt archive: {detail}"),
            ArchiveError::UnsupportedVersion(version) => {
                write!(f, "unsupported archive format version {version}")
            }
            ArchiveError::DuplicateDate(date) => write!(f, "more than one puzzle for {date}"),
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiveError::Io(err) => Some(err),
            ArchiveError::Serialize(err) => Some(err),
            ArchiveError::Index(err) => Some(err),
            ArchiveError::Corrupt(_)
            | ArchiveError::UnsupportedVersion(_)
            | ArchiveError::DuplicateDate(_) => None,
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(value: io::Error) -> Self {
        ArchiveError::Io(value)
    }
}

impl From<RkyvError> for ArchiveError {
    fn from(value: RkyvError) -> Self {
        ArchiveError::Serialize(value)
    }
}

impl From<fst::Error> for ArchiveError {
    fn from(value: fst::Error) -> Self {
        ArchiveError::Index(value)
    }
}
