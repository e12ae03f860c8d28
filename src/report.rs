use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fingerprint::MatchConfidence;
use crate::matcher::{MatchDirection, PageMatch, PageMatcher, ScoredPage};
use crate::model::{ReconciliationResult, SameDateMatch, UnmatchedEntry};
use crate::toc::{Side, format_page_list};
use crate::util::ensure_directory;

pub const STATUS_EXACT_DATE: &str = "EXACT DATE MATCH";
pub const STATUS_NOT_IN_DOCUMENT: &str = "MANUAL REVIEW - PAGE NOT IN DOCUMENT";
const MANUAL_REVIEW_PREFIX: &str = "MANUAL REVIEW";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscrepancyRow {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Your Date")]
    pub your_date: String,
    #[serde(rename = "Their Date")]
    pub their_date: String,
    #[serde(rename = "Your Pages")]
    pub your_pages: String,
    #[serde(rename = "Their Match Pages")]
    pub their_match_pages: String,
    #[serde(rename = "Match Confidence")]
    pub match_confidence: String,
    #[serde(rename = "Your Header")]
    pub your_header: String,
    #[serde(rename = "Their Header")]
    pub their_header: String,
    #[serde(rename = "Action")]
    pub action: String,
}

impl DiscrepancyRow {
    pub fn is_manual_review(&self) -> bool {
        self.status.starts_with(MANUAL_REVIEW_PREFIX)
    }
}

fn only_status(side: Side) -> &'static str {
    match side {
        Side::Yours => "ONLY IN YOUR TOC",
        Side::Theirs => "ONLY IN THEIR TOC",
    }
}

fn not_in_counterpart_status(side: Side) -> &'static str {
    match side {
        Side::Yours => "MANUAL REVIEW - PAGE NOT IN THEIR TOC",
        Side::Theirs => "MANUAL REVIEW - PAGE NOT IN YOUR TOC",
    }
}

fn counterpart_label(side: Side) -> &'static str {
    match side {
        Side::Yours => "THEIR",
        Side::Theirs => "YOUR",
    }
}

fn missing_action(side: Side) -> &'static str {
    match side {
        Side::Yours => "MISSING FROM VENDOR",
        Side::Theirs => "MISSING FROM YOURS",
    }
}

pub fn recommended_action(side: Side, best: &ScoredPage) -> String {
    let counterpart = counterpart_label(side);
    match best.confidence {
        MatchConfidence::Strong | MatchConfidence::Likely => {
            format!("VERIFY MATCH - CHECK {counterpart} PAGE {}", best.logical)
        }
        MatchConfidence::Weak => format!("REVIEW - CHECK {counterpart} PAGE {}", best.logical),
        MatchConfidence::NoMatch => missing_action(side).to_string(),
    }
}

pub struct DiscrepancyReporter<'m, 'a> {
    matcher: &'m PageMatcher<'a>,
}

impl<'m, 'a> DiscrepancyReporter<'m, 'a> {
    pub fn new(matcher: &'m PageMatcher<'a>) -> Self {
        Self { matcher }
    }

    pub fn build(&self, result: &ReconciliationResult) -> Vec<DiscrepancyRow> {
        let mut rows = Vec::with_capacity(
            result.yours_only.len() + result.theirs_only.len() + result.same_dates.len(),
        );
        rows.extend(
            result
                .yours_only
                .iter()
                .map(|entry| self.unmatched_row(Side::Yours, entry)),
        );
        rows.extend(
            result
                .theirs_only
                .iter()
                .map(|entry| self.unmatched_row(Side::Theirs, entry)),
        );
        rows.extend(result.same_dates.iter().map(same_date_row));
        rows
    }

    pub fn unmatched_row(&self, side: Side, entry: &UnmatchedEntry) -> DiscrepancyRow {
        let direction = MatchDirection::from_side(side);
        let pages = format_page_list(&entry.pages);

        let outcome = match entry.pages.first() {
            None => Outcome::NoPages,
            Some(&first) => match self.matcher.match_page(direction, first) {
                PageMatch::NotInDocument { logical } => Outcome::NotInDocument(logical),
                PageMatch::NotInCounterpartToc { logical, .. } => {
                    Outcome::NotInCounterpart(logical)
                }
                PageMatch::Scored(first_scored) => {
                    Outcome::Scored(self.best_scored(direction, &entry.pages[1..], first_scored))
                }
            },
        };

        let (status, confidence, action, matched_page) = match outcome {
            Outcome::NoPages => (
                only_status(side).to_string(),
                MatchConfidence::NoMatch.label().to_string(),
                missing_action(side).to_string(),
                String::new(),
            ),
            Outcome::NotInDocument(logical) => (
                STATUS_NOT_IN_DOCUMENT.to_string(),
                "N/A".to_string(),
                format!("LOCATE PAGE {logical} MANUALLY"),
                String::new(),
            ),
            Outcome::NotInCounterpart(logical) => (
                not_in_counterpart_status(side).to_string(),
                "N/A".to_string(),
                format!(
                    "SEARCH {} DOCUMENT FOR PAGE {logical} MANUALLY",
                    counterpart_label(side)
                ),
                String::new(),
            ),
            Outcome::Scored(best) => (
                only_status(side).to_string(),
                format!("{} ({:.2})", best.confidence.label(), best.score),
                recommended_action(side, &best),
                if best.confidence == MatchConfidence::NoMatch {
                    String::new()
                } else {
                    best.logical.to_string()
                },
            ),
        };

        let date = entry.date.to_string();
        match side {
            Side::Yours => DiscrepancyRow {
                status,
                your_date: date,
                their_date: String::new(),
                your_pages: pages,
                their_match_pages: matched_page,
                match_confidence: confidence,
                your_header: entry.header.clone(),
                their_header: String::new(),
                action,
            },
            Side::Theirs => DiscrepancyRow {
                status,
                your_date: String::new(),
                their_date: date,
                your_pages: matched_page,
                their_match_pages: pages,
                match_confidence: confidence,
                your_header: String::new(),
                their_header: entry.header.clone(),
                action,
            },
        }
    }

    fn best_scored(
        &self,
        direction: MatchDirection,
        remaining: &[u32],
        first: ScoredPage,
    ) -> ScoredPage {
        remaining
            .iter()
            .filter_map(|page| match self.matcher.match_page(direction, *page) {
                PageMatch::Scored(scored) => Some(scored),
                _ => None,
            })
            .fold(first, |best, candidate| {
                if candidate.score > best.score {
                    candidate
                } else {
                    best
                }
            })
    }
}

enum Outcome {
    NoPages,
    NotInDocument(u32),
    NotInCounterpart(u32),
    Scored(ScoredPage),
}

pub fn same_date_row(record: &SameDateMatch) -> DiscrepancyRow {
    let date = record.date.to_string();
    DiscrepancyRow {
        status: STATUS_EXACT_DATE.to_string(),
        your_date: date.clone(),
        their_date: date,
        your_pages: format_page_list(&record.your_pages),
        their_match_pages: format_page_list(&record.their_pages),
        match_confidence: "EXACT DATE".to_string(),
        your_header: record.your_header.clone(),
        their_header: record.their_header.clone(),
        action: format!(
            "COMPARE PAGE COUNTS ({} vs {}) AND HEADERS",
            record.your_pages.len(),
            record.their_pages.len()
        ),
    }
}

pub fn write_report_csv(path: &Path, rows: &[DiscrepancyRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create report file: {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write report row: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush report file: {}", path.display()))?;

    Ok(())
}

pub fn read_report_csv(path: &Path) -> Result<Vec<DiscrepancyRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open report file: {}", path.display()))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<DiscrepancyRow>, csv::Error>>()
        .with_context(|| format!("failed to parse report file: {}", path.display()))
}
