use once_cell::sync::Lazy;
use paperlens_core::models::paper::is_plausible_year;
use paperlens_core::text::{char_len, head_chars};
use regex::Regex;

pub const DEFAULT_TITLE: &str = "Untitled Research Paper";
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

const TITLE_SCAN_LINES: usize = 5;
const MIN_TITLE_CHARS: usize = 10;
const MAX_TITLE_CHARS: usize = 200;
const MIN_ABSTRACT_CHARS: usize = 100;
const MAX_ABSTRACT_CHARS: usize = 1500;
const FALLBACK_ABSTRACT_CHARS: usize = 500;
const ABSTRACT_CLIP_CHARS: usize = 2000;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid regex"));
static ABSTRACT_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)abstract([:\s]+)").expect("valid regex"));
static ABSTRACT_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\n\n|introduction").expect("valid regex"));

/// Bibliographic guesses made by pattern matching alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub year: Option<i32>,
}

/// Extracted text plus the heuristics derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub full_text: String,
    pub metadata: HeuristicMetadata,
}

impl ExtractedDocument {
    pub fn from_text(full_text: String) -> Self {
        let metadata = extract_metadata(&full_text);
        Self {
            full_text,
            metadata,
        }
    }
}

/// Pure and total: any input yields a complete record.
pub fn extract_metadata(text: &str) -> HeuristicMetadata {
    let abstract_text = find_abstract(text)
        .unwrap_or_else(|| format!("{}...", head_chars(text, FALLBACK_ABSTRACT_CHARS)));

    HeuristicMetadata {
        title: find_title(text).unwrap_or(DEFAULT_TITLE).to_string(),
        authors: vec![UNKNOWN_AUTHOR.to_string()],
        abstract_text: head_chars(&abstract_text, ABSTRACT_CLIP_CHARS).to_string(),
        year: find_year(text),
    }
}

fn find_title(text: &str) -> Option<&str> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(TITLE_SCAN_LINES)
        .find(|line| (MIN_TITLE_CHARS..MAX_TITLE_CHARS).contains(&char_len(line)))
}

/// Shortest run of 100..=1500 characters after an `Abstract` marker that is
/// followed by a blank line or `Introduction`.
///
/// The separator run after the marker may lend characters to the run, down to
/// a single separator char. Starts are tried from the end of the separator
/// backwards and the first one that yields a run wins.
fn find_abstract(text: &str) -> Option<String> {
    for marker in ABSTRACT_MARKER_RE.captures_iter(text) {
        let Some(separator) = marker.get(1) else {
            continue;
        };
        let mut starts: Vec<usize> = separator
            .as_str()
            .char_indices()
            .skip(1)
            .map(|(offset, _)| separator.start() + offset)
            .collect();
        starts.push(separator.end());

        let earliest = starts[0];
        if text[earliest..].char_indices().nth(MIN_ABSTRACT_CHARS).is_none() {
            // Later markers only leave less text behind them.
            return None;
        }

        if let Some(run) = starts.iter().rev().find_map(|&start| abstract_run(&text[start..])) {
            return Some(run.trim().to_string());
        }
    }
    None
}

/// Prefix of `body` holding 100..=1500 chars and ending right before the
/// first terminator that leaves at least 100 chars.
fn abstract_run(body: &str) -> Option<&str> {
    let (min_end, _) = body.char_indices().nth(MIN_ABSTRACT_CHARS)?;
    let end = ABSTRACT_END_RE.find_at(body, min_end)?;
    let run = &body[..end.start()];
    (char_len(run) <= MAX_ABSTRACT_CHARS).then_some(run)
}

fn find_year(text: &str) -> Option<i32> {
    YEAR_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|year| is_plausible_year(*year))
}
