use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use super::dates::{DateNormalizer, TocDate};
use super::pages::expand_page_ranges;
use super::{DEFAULT_HEADER_MAX_CHARS, TocEntry, assemble_header};

pub const CONTENT_KEYWORDS: &[&str] = &[
    "HISTORY",
    "SUBJECTIVE",
    "CHIEF",
    "ASSESSMENT",
    "PLAN",
    "DIAGNOSIS",
];

pub const PATIENT_SENTENCE_VERBS: &[&str] = &[
    "is",
    "was",
    "presents",
    "presented",
    "reports",
    "reported",
    "states",
    "stated",
    "has",
    "had",
    "denies",
    "complains",
    "returns",
];

#[derive(Debug, Clone)]
pub struct SourceParserConfig {
    pub max_toc_pages: usize,
    pub max_page_number: u32,
    pub header_max_chars: usize,
    pub lookahead_lines: usize,
    pub content_keywords: Vec<String>,
    pub patient_verbs: Vec<String>,
}

impl Default for SourceParserConfig {
    fn default() -> Self {
        Self {
            max_toc_pages: 25,
            max_page_number: 500,
            header_max_chars: DEFAULT_HEADER_MAX_CHARS,
            lookahead_lines: 2,
            content_keywords: CONTENT_KEYWORDS.iter().map(|value| value.to_string()).collect(),
            patient_verbs: PATIENT_SENTENCE_VERBS
                .iter()
                .map(|value| value.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Date,
    Undated,
    ContentMarker,
    EmbeddedDate,
    PageNumbers,
    PagesThenHeader,
    Text,
}

#[derive(Debug)]
struct EntryDraft {
    date: TocDate,
    date_str: String,
    page_fragments: Vec<String>,
    header_fragments: Vec<String>,
}

#[derive(Debug)]
enum ScanState {
    Scanning,
    CollectingPages(EntryDraft),
    CollectingHeader(EntryDraft),
}

#[derive(Debug)]
pub struct SourceTocParser {
    config: SourceParserConfig,
    dates: DateNormalizer,
    date_line: Regex,
    undated_line: Regex,
    page_line: Regex,
    pages_then_header: Regex,
    embedded_date: Regex,
    content_marker: Regex,
}

impl SourceTocParser {
    pub fn new(config: SourceParserConfig) -> Result<Self> {
        let keywords = config
            .content_keywords
            .iter()
            .map(|keyword| regex::escape(keyword))
            .collect::<Vec<String>>()
            .join("|");
        let verbs = config
            .patient_verbs
            .iter()
            .map(|verb| regex::escape(verb))
            .collect::<Vec<String>>()
            .join("|");
        let content_pattern = format!(r"^(?:(?:{keywords})\b|Patient\s+(?:{verbs})\b)");

        Ok(Self {
            dates: DateNormalizer::new()?,
            date_line: Regex::new(r"^\d{1,2}/\d{1,2}/(?:\d{4}|\d{2})$")
                .context("failed to compile vendor date line regex")?,
            undated_line: Regex::new(r"(?i)^undated$")
                .context("failed to compile undated marker regex")?,
            page_line: Regex::new(r"^[\d,\-\s]*\d[\d,\-\s]*$")
                .context("failed to compile page line regex")?,
            pages_then_header: Regex::new(r"^(\d(?:[\d,\-\s]*[\d,\-])?)([A-Z][A-Za-z].*)$")
                .context("failed to compile pages-then-header regex")?,
            embedded_date: Regex::new(r"\b\d{1,2}/\d{1,2}\b")
                .context("failed to compile embedded date regex")?,
            content_marker: Regex::new(&content_pattern)
                .context("failed to compile content marker regex")?,
            config,
        })
    }

    pub fn parse_text(&self, text: &str) -> Vec<TocEntry> {
        let lines = text
            .split('\u{000C}')
            .take(self.config.max_toc_pages)
            .flat_map(str::lines)
            .collect::<Vec<&str>>();
        self.parse_lines(&lines)
    }

    pub fn parse_lines(&self, raw_lines: &[&str]) -> Vec<TocEntry> {
        let normalized = raw_lines
            .iter()
            .map(|line| normalize_line(line))
            .filter(|line| !line.is_empty())
            .collect::<Vec<String>>();
        let lines = normalized.iter().map(String::as_str).collect::<Vec<&str>>();

        let mut entries = Vec::new();
        let mut state = ScanState::Scanning;

        for (cursor, &line) in lines.iter().enumerate() {
            let kind = self.classify(line);
            let confirmed = kind == LineKind::Date && self.confirms_boundary(&lines, cursor);

            state = match (state, kind) {
                (ScanState::Scanning, LineKind::Date) if confirmed => {
                    ScanState::CollectingPages(self.start_entry(line))
                }
                (ScanState::Scanning, LineKind::Undated) => {
                    ScanState::CollectingPages(self.start_entry(line))
                }
                (ScanState::Scanning, _) => ScanState::Scanning,
                (
                    ScanState::CollectingPages(draft) | ScanState::CollectingHeader(draft),
                    LineKind::Undated,
                ) => {
                    self.finish(draft, &mut entries);
                    ScanState::CollectingPages(self.start_entry(line))
                }
                (
                    ScanState::CollectingPages(draft) | ScanState::CollectingHeader(draft),
                    LineKind::Date,
                ) if confirmed => {
                    self.finish(draft, &mut entries);
                    ScanState::CollectingPages(self.start_entry(line))
                }
                (
                    ScanState::CollectingPages(draft) | ScanState::CollectingHeader(draft),
                    LineKind::ContentMarker,
                ) => {
                    self.finish(draft, &mut entries);
                    ScanState::Scanning
                }
                (ScanState::CollectingPages(mut draft), LineKind::PageNumbers) => {
                    draft.page_fragments.push(line.to_string());
                    ScanState::CollectingPages(draft)
                }
                (ScanState::CollectingPages(mut draft), LineKind::PagesThenHeader) => {
                    if let Some((pages, header)) = self.split_pages_then_header(line) {
                        draft.page_fragments.push(pages);
                        draft.header_fragments.push(header);
                    }
                    ScanState::CollectingHeader(draft)
                }
                (
                    ScanState::CollectingPages(mut draft) | ScanState::CollectingHeader(mut draft),
                    _,
                ) => {
                    draft.header_fragments.push(line.to_string());
                    ScanState::CollectingHeader(draft)
                }
            };
        }

        if let ScanState::CollectingPages(draft) | ScanState::CollectingHeader(draft) = state {
            self.finish(draft, &mut entries);
        }

        entries
    }

    fn classify(&self, line: &str) -> LineKind {
        if self.date_line.is_match(line) {
            LineKind::Date
        } else if self.undated_line.is_match(line) {
            LineKind::Undated
        } else if self.content_marker.is_match(line) {
            LineKind::ContentMarker
        } else if self.embedded_date.is_match(line) {
            LineKind::EmbeddedDate
        } else if self.page_line.is_match(line) {
            LineKind::PageNumbers
        } else if self.pages_then_header.is_match(line) {
            LineKind::PagesThenHeader
        } else {
            LineKind::Text
        }
    }

    /// A bare date opens a new entry only when page numbers follow within the
    /// lookahead window. Another date or an undated marker in that window
    /// claims those pages for itself.
    fn confirms_boundary(&self, lines: &[&str], index: usize) -> bool {
        for next in lines.iter().skip(index + 1).take(self.config.lookahead_lines) {
            match self.classify(next) {
                LineKind::PageNumbers | LineKind::PagesThenHeader => return true,
                LineKind::Date | LineKind::Undated => return false,
                _ => {}
            }
        }
        false
    }

    fn start_entry(&self, line: &str) -> EntryDraft {
        let date = if self.undated_line.is_match(line) {
            TocDate::Unknown
        } else {
            self.dates.normalize(line)
        };

        EntryDraft {
            date,
            date_str: line.to_string(),
            page_fragments: Vec::new(),
            header_fragments: Vec::new(),
        }
    }

    fn split_pages_then_header(&self, line: &str) -> Option<(String, String)> {
        let captures = self.pages_then_header.captures(line)?;
        let pages = captures.get(1)?.as_str().trim().to_string();
        let header = captures.get(2)?.as_str().trim().to_string();
        Some((pages, header))
    }

    fn finish(&self, draft: EntryDraft, entries: &mut Vec<TocEntry>) {
        let page_text = draft.page_fragments.join(" ");
        let pages = expand_page_ranges(&page_text, Some(self.config.max_page_number));

        if pages.is_empty() {
            debug!(
                date = %draft.date,
                page_text = %page_text,
                "dropping vendor entry without usable pages"
            );
            return;
        }

        entries.push(TocEntry {
            date: draft.date,
            date_str: draft.date_str,
            pages,
            header: assemble_header(&draft.header_fragments, self.config.header_max_chars),
        });
    }
}

fn normalize_line(line: &str) -> String {
    line.replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{00a0}', " ")
        .trim()
        .to_string()
}
