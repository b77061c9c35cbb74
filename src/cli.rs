use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind};
use std::path::PathBuf;

use atty::Stream;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use pastiche::ingest::{parse_value_date, pending_dates, recorded_dates};
use pastiche::{
    AssemblyConfig, BatchReport, DATE_FORMAT, DEFAULT_CONNECTOR_WORDS, DEFAULT_MASK, PendingWord,
    PuzzleArchive, PuzzleView, canonicalize, ingest_jsonl, resolve, sanitize,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pastiche", about = "Trace and mask daily jumble puzzles", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical letters of an answer.
    Canonicalize {
        /// Answer text as displayed.
        text: String,
    },
    /// Mask the solved letters of an answer.
    Sanitize {
        /// Answer text as displayed.
        answer: String,
        /// Letters to mask. Defaults to the canonical form of the answer.
        #[arg(long)]
        letters: Option<String>,
        /// Character substituted for each solved letter.
        #[arg(long, default_value_t = DEFAULT_MASK)]
        mask: char,
    },
    /// Trace every answer letter to a position in one of the words.
    Resolve {
        /// Answer text as displayed.
        answer: String,
        /// Words as SCRAMBLED=SOLVED, in puzzle order.
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Assemble a JSON Lines dump of scraped puzzles.
    Ingest {
        /// Scraper output, one puzzle per line.
        input: PathBuf,
        /// Write the assembled puzzles to this archive file.
        #[arg(long)]
        archive: Option<PathBuf>,
        #[command(flatten)]
        repair: RepairArgs,
    },
    /// Show one puzzle from an archive.
    Show {
        /// Archive written by `ingest --archive`.
        archive: PathBuf,
        /// Puzzle date (YYYY-MM-DD).
        date: String,
        /// Character substituted for each solved letter.
        #[arg(long, default_value_t = DEFAULT_MASK)]
        mask: char,
    },
    /// List archived puzzles whose date starts with a prefix.
    List {
        /// Archive written by `ingest --archive`.
        archive: PathBuf,
        /// Date prefix such as `2024` or `2024-03`.
        #[arg(default_value = "")]
        prefix: String,
        /// Maximum number of puzzles to list.
        #[arg(short, long, default_value_t = 31)]
        limit: usize,
    },
    /// List dates that a JSON Lines dump does not cover yet.
    Pending {
        /// Scraper output; a missing file counts as empty.
        input: PathBuf,
        /// Newest date to consider (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,
        /// Number of days to look back from `end`.
        #[arg(long, default_value_t = 10)]
        days: u32,
        /// List every date, recorded or not.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct RepairArgs {
    /// Connector word treated as a hint when an answer does not resolve.
    /// Repeat to build the set; defaults to the built-in list.
    #[arg(long = "connector", value_name = "WORD")]
    connectors: Vec<String>,
    /// Never rewrite answers.
    #[arg(long, conflicts_with = "connectors")]
    no_repair: bool,
}

impl RepairArgs {
    fn config(&self) -> AssemblyConfig {
        if self.no_repair {
            AssemblyConfig::default()
        } else if self.connectors.is_empty() {
            AssemblyConfig::with_connectors(DEFAULT_CONNECTOR_WORDS)
        } else {
            AssemblyConfig::with_connectors(&self.connectors)
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Canonicalize { text } => handle_canonicalize(text, cli.json),
        Command::Sanitize {
            answer,
            letters,
            mask,
        } => handle_sanitize(answer, letters, mask, cli.json),
        Command::Resolve { answer, words } => handle_resolve(answer, words, cli.json),
        Command::Ingest {
            input,
            archive,
            repair,
        } => handle_ingest(input, archive, repair.config(), cli.json),
        Command::Show {
            archive,
            date,
            mask,
        } => handle_show(archive, date, mask, cli.json),
        Command::List {
            archive,
            prefix,
            limit,
        } => handle_list(archive, prefix, limit, cli.json),
        Command::Pending {
            input,
            end,
            days,
            force,
        } => handle_pending(input, end, days, force, cli.json),
    }
}

fn handle_canonicalize(text: String, as_json: bool) -> Result<(), Box<dyn Error>> {
    let canonical = canonicalize(&text);
    if as_json {
        let payload = json!({ "text": text, "canonical": canonical });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{canonical}");
    }
    Ok(())
}

fn handle_sanitize(
    answer: String,
    letters: Option<String>,
    mask: char,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let letters = letters.unwrap_or_else(|| canonicalize(&answer));
    let masked = sanitize(&answer, &letters, mask);
    if as_json {
        let payload = json!({ "answer": answer, "letters": letters, "masked": masked });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{masked}");
    }
    Ok(())
}

fn handle_resolve(answer: String, words: Vec<String>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let candidates = words
        .iter()
        .map(|pair| -> Result<PendingWord, Box<dyn Error>> {
            let (scrambled, solved) = pair
                .split_once('=')
                .ok_or_else(|| format!("Expected SCRAMBLED=SOLVED, got {pair:?}"))?;
            Ok(PendingWord::new(scrambled, solved)?)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let canonical = canonicalize(&answer);
    if canonical.is_empty() {
        return Err(format!("Answer {answer:?} contains no letters").into());
    }
    let contributions = resolve(&canonical, &candidates)?;

    if as_json {
        let payload = json!({
            "answer": canonical,
            "words": candidates.iter().zip(&contributions).map(|(word, indices)| {
                json!({
                    "scrambled": word.scrambled(),
                    "solved": word.solved(),
                    "contribution_indices": indices,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let rows: Vec<(String, String, String)> = candidates
            .iter()
            .zip(&contributions)
            .map(|(word, indices)| {
                (
                    word.scrambled().to_string(),
                    word.solved().to_string(),
                    format_indices(indices),
                )
            })
            .collect();
        println!("Answer: {canonical}");
        print_word_table(&rows);
    }
    Ok(())
}

fn handle_ingest(
    input: PathBuf,
    archive: Option<PathBuf>,
    config: AssemblyConfig,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let reader = BufReader::new(File::open(&input)?);
    let report = ingest_jsonl(reader, &config)?;

    if let Some(path) = &archive {
        let bytes = PuzzleArchive::build(&report.puzzles)?;
        fs::write(path, &bytes)?;
        info!(
            path = %path.display(),
            puzzles = report.puzzles.len(),
            bytes = bytes.len(),
            "wrote puzzle archive"
        );
    }

    if as_json {
        let payload = json!({
            "input": input.display().to_string(),
            "archive": archive.map(|path| path.display().to_string()),
            "puzzles": serde_json::to_value(&report.puzzles)?,
            "failures": report.failures.iter().map(|failure| {
                json!({
                    "line": failure.line,
                    "value_date": failure.value_date,
                    "error": failure.error.to_string(),
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_batch(&report);
    }
    Ok(())
}

fn handle_show(
    archive: PathBuf,
    date: String,
    mask: char,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let archive = PuzzleArchive::read(&archive)?;
    let key = parse_value_date(&date)
        .map(|date| date.format(DATE_FORMAT).to_string())
        .ok_or_else(|| format!("Failed to parse date from {date:?}"))?;
    let view = archive
        .get(&key)
        .ok_or_else(|| format!("No puzzle recorded for {key}"))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view_to_json(&view, mask))?);
    } else {
        print_puzzle(&view, mask);
    }
    Ok(())
}

fn handle_list(
    archive: PathBuf,
    prefix: String,
    limit: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let archive = PuzzleArchive::read(&archive)?;
    let limit = limit.max(1);
    let views = archive.prefix(&prefix, limit);

    if as_json {
        let payload = json!({
            "prefix": prefix,
            "limit": limit,
            "results": views.iter().map(|view| {
                json!({
                    "value_date": view.date_key(),
                    "masked": view.sanitized(DEFAULT_MASK),
                    "words": view.words().len(),
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if views.is_empty() {
        println!("No puzzles matched prefix \"{prefix}\".");
    } else {
        let rows: Vec<(String, String, String)> = views
            .iter()
            .map(|view| {
                (
                    view.date_key().to_string(),
                    view.sanitized(DEFAULT_MASK),
                    view.words().len().to_string(),
                )
            })
            .collect();
        print_table(["DATE", "ANSWER", "WORDS"], &rows);
    }
    Ok(())
}

fn handle_pending(
    input: PathBuf,
    end: Option<String>,
    days: u32,
    force: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let end: NaiveDate = match end {
        Some(raw) => {
            parse_value_date(&raw).ok_or_else(|| format!("Failed to parse date from {raw:?}"))?
        }
        None => Local::now().date_naive(),
    };
    let recorded = match File::open(&input) {
        Ok(file) => recorded_dates(BufReader::new(file))?,
        Err(err) if err.kind() == ErrorKind::NotFound => Default::default(),
        Err(err) => return Err(err.into()),
    };
    let dates = pending_dates(end, days, &recorded, force);

    if as_json {
        let payload = json!({
            "end": end,
            "days": days,
            "force": force,
            "pending": dates,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if dates.is_empty() {
        println!("Nothing to fetch: every date up to {end} is recorded.");
    } else {
        for date in dates {
            println!("{}", date.format(DATE_FORMAT));
        }
    }
    Ok(())
}

fn view_to_json(view: &PuzzleView<'_>, mask: char) -> serde_json::Value {
    let words = view
        .words()
        .iter()
        .map(|word| {
            json!({
                "scrambled": word.scrambled(),
                "solved": word.solved(),
                "contribution_indices": word.contribution_indices(),
            })
        })
        .collect::<Vec<_>>();
    json!({
        "value_date": view.date_key(),
        "answer_display": view.answer_display(),
        "answer_canonical": view.answer_canonical(),
        "masked": view.sanitized(mask),
        "clue_sentence": view.clue_sentence(),
        "words": words,
    })
}

fn print_puzzle(view: &PuzzleView<'_>, mask: char) {
    println!("Puzzle for {}", view.date_key());
    render_markdown_block("Clue", view.clue_sentence());
    println!("\nAnswer: {}", view.sanitized(mask));
    println!();
    let rows: Vec<(String, String, String)> = view
        .words()
        .iter()
        .map(|word| {
            (
                word.scrambled().to_string(),
                mask_solved(word.solved(), mask),
                word.indices_text(),
            )
        })
        .collect();
    print_word_table(&rows);
}

fn mask_solved(solved: &str, mask: char) -> String {
    solved.chars().map(|_| mask).collect()
}

fn print_batch(report: &BatchReport) {
    if report.puzzles.is_empty() {
        println!("No puzzles assembled.");
    } else {
        let rows: Vec<(String, String, String)> = report
            .puzzles
            .iter()
            .map(|puzzle| {
                (
                    puzzle.date_key(),
                    puzzle.answer_canonical().to_string(),
                    puzzle.words().len().to_string(),
                )
            })
            .collect();
        println!("Assembled {} puzzle(s):", report.puzzles.len());
        print_table(["DATE", "ANSWER", "WORDS"], &rows);
    }

    if !report.failures.is_empty() {
        println!("\n{} record(s) failed:", report.failures.len());
        let rows: Vec<(String, String, String)> = report
            .failures
            .iter()
            .map(|failure| {
                (
                    failure.line.to_string(),
                    failure
                        .value_date
                        .map(|date| date.format(DATE_FORMAT).to_string())
                        .unwrap_or_else(|| "<unknown>".to_string()),
                    failure.error.to_string(),
                )
            })
            .collect();
        print_table(["LINE", "DATE", "ERROR"], &rows);
    }
}

fn print_word_table(rows: &[(String, String, String)]) {
    if rows.is_empty() {
        println!("No words provided.");
        return;
    }
    print_table(["SCRAMBLED", "SOLVED", "INDICES"], rows);
}

fn print_table(headers: [&str; 3], rows: &[(String, String, String)]) {
    let first = rows
        .iter()
        .map(|(value, _, _)| value.chars().count())
        .max()
        .unwrap_or(0)
        .max(headers[0].len());
    let second = rows
        .iter()
        .map(|(_, value, _)| value.chars().count())
        .max()
        .unwrap_or(0)
        .max(headers[1].len());
    println!(
        "{:<first$}  {:<second$}  {}",
        headers[0], headers[1], headers[2]
    );
    println!(
        "{:-<first$}  {:-<second$}  {:-<third$}",
        "",
        "",
        "",
        third = headers[2].len()
    );
    for (a, b, c) in rows {
        println!("{a:<first$}  {b:<second$}  {c}");
    }
}

fn format_indices(indices: &[usize]) -> String {
    if indices.is_empty() {
        return "-".to_string();
    }
    pastiche::archive::indices_to_text(indices)
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
