use rkyv::{Archive, Serialize};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Archive, Serialize, Debug, Clone, Copy)]
pub struct Range {
    pub start: u32,
    pub len: u32,
}

impl Range {
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }
}

#[derive(Archive, Serialize, Debug)]
pub struct WordRecord {
    pub scrambled: String,
    pub solved: String,
    pub contribution_indices: Vec<u32>,
}

#[derive(Archive, Serialize, Debug)]
pub struct PuzzleRecord {
    pub value_date: String,
    pub answer_display: String,
    pub answer_canonical: String,
    pub clue_sentence: String,
    pub words: Range,
}

#[derive(Archive, Serialize, Debug)]
pub struct ArchiveStore {
    pub format_version: u32,
    pub puzzles: Vec<PuzzleRecord>,
    pub words: Vec<WordRecord>,
    /// `fst::Map` bytes from date key to index in `puzzles`.
    pub date_index: Vec<u8>,
}
