//! Letter-provenance resolution for daily word-jumble puzzles.
//!
//! Raw scraped text flows through [`canonicalize`], [`resolve`] and
//! [`assemble_with`] into an immutable [`Puzzle`]; [`sanitize`] renders the
//! masked answer shown to players.

pub mod archive;
pub mod canonical;
pub mod config;
mod data;
pub mod ingest;
pub mod puzzle;
pub mod resolver;
pub mod sanitize;
pub mod word;

pub use archive::{ArchiveError, PuzzleArchive, PuzzleView, WordView};
pub use canonical::{canonicalize, wrap_connectors};
pub use config::{AssemblyConfig, DEFAULT_CONNECTOR_WORDS};
pub use ingest::{BatchReport, IngestError, PuzzleFailure, ingest_jsonl};
pub use puzzle::{AssemblyError, DATE_FORMAT, Puzzle, assemble, assemble_with};
pub use resolver::{UnresolvableLetter, resolve};
pub use sanitize::{DEFAULT_MASK, sanitize};
pub use word::{PendingWord, Word, WordError};
