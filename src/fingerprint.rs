use std::collections::BTreeSet;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::toc::{DateNormalizer, TocDate};

pub const PREVIEW_CHARS: usize = 200;
pub const WHOLE_TEXT_CHARS: usize = 500;

pub const CREDENTIALS: &[&str] = &["md", "do", "pa", "np", "dc", "dds", "phd", "psyd"];

pub const MEDICAL_TERMS: &[&str] = &[
    "assessment",
    "chief complaint",
    "diagnosis",
    "discharge",
    "emergency",
    "evaluation",
    "examination",
    "follow-up",
    "history",
    "impression",
    "injection",
    "medication",
    "mri",
    "objective",
    "pain",
    "physical therapy",
    "plan",
    "prescription",
    "progress note",
    "radiology",
    "subjective",
    "surgery",
    "treatment",
    "x-ray",
];

const DATE_WEIGHT: f64 = 3.0;
const PROVIDER_WEIGHT: f64 = 2.0;
const PREVIEW_WEIGHT: f64 = 1.0;
const MEDICAL_TERM_WEIGHT: f64 = 1.0;
const WHOLE_TEXT_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fingerprint {
    pub preview: String,
    pub dates: BTreeSet<String>,
    pub providers: BTreeSet<String>,
    pub medical_terms: BTreeSet<String>,
    pub full_text: String,
}

#[derive(Debug)]
pub struct Fingerprinter {
    normalizer: DateNormalizer,
    date_patterns: Vec<Regex>,
    provider: Regex,
    terms: Vec<(String, Regex)>,
}

impl Fingerprinter {
    pub fn new() -> Result<Self> {
        Self::with_vocabulary(CREDENTIALS, MEDICAL_TERMS)
    }

    pub fn with_vocabulary(credentials: &[&str], medical_terms: &[&str]) -> Result<Self> {
        let credential_alternatives = credentials
            .iter()
            .map(|credential| {
                credential
                    .chars()
                    .map(|ch| regex::escape(&ch.to_string()))
                    .collect::<Vec<String>>()
                    .join(r"\.?")
            })
            .collect::<Vec<String>>()
            .join("|");
        let provider_pattern =
            format!(r"\b([a-z][a-z'\-]+),?\s+({credential_alternatives})\b");

        let terms = medical_terms
            .iter()
            .map(|term| {
                let pattern = format!(r"\b{}\b", regex::escape(term));
                Regex::new(&pattern)
                    .with_context(|| format!("failed to compile medical term regex: {term}"))
                    .map(|regex| (term.to_string(), regex))
            })
            .collect::<Result<Vec<(String, Regex)>>>()?;

        Ok(Self {
            normalizer: DateNormalizer::new()?,
            date_patterns: vec![
                Regex::new(r"\b\d{1,2}/\d{1,2}/(?:\d{4}|\d{2})\b")
                    .context("failed to compile slash date regex")?,
                Regex::new(r"\b\d{4}-\d{1,2}-\d{1,2}\b")
                    .context("failed to compile ISO date regex")?,
                Regex::new(
                    r"\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4}\b",
                )
                .context("failed to compile month-name date regex")?,
            ],
            provider: Regex::new(&provider_pattern).context("failed to compile provider regex")?,
            terms,
        })
    }

    pub fn fingerprint(&self, text: &str) -> Fingerprint {
        let full_text = normalize_text(text);

        let mut dates = BTreeSet::new();
        for pattern in &self.date_patterns {
            for found in pattern.find_iter(&full_text) {
                let value = match self.normalizer.normalize(found.as_str()) {
                    TocDate::Known(date) => date.format("%Y-%m-%d").to_string(),
                    TocDate::Unknown => found.as_str().to_string(),
                };
                dates.insert(value);
            }
        }

        let providers = self
            .provider
            .captures_iter(&full_text)
            .filter_map(|captures| {
                let name = captures.get(1)?.as_str();
                let credential = captures.get(2)?.as_str().replace('.', "");
                Some(format!("{name} {credential}"))
            })
            .collect::<BTreeSet<String>>();

        let medical_terms = self
            .terms
            .iter()
            .filter(|(_, regex)| regex.is_match(&full_text))
            .map(|(term, _)| term.clone())
            .collect::<BTreeSet<String>>();

        Fingerprint {
            preview: leading_chars(&full_text, PREVIEW_CHARS).to_string(),
            dates,
            providers,
            medical_terms,
            full_text,
        }
    }
}

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

fn leading_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Dates,
    Providers,
    Preview,
    MedicalTerms,
    WholeText,
}

impl Component {
    pub fn weight(self) -> f64 {
        match self {
            Component::Dates => DATE_WEIGHT,
            Component::Providers => PROVIDER_WEIGHT,
            Component::Preview => PREVIEW_WEIGHT,
            Component::MedicalTerms => MEDICAL_TERM_WEIGHT,
            Component::WholeText => WHOLE_TEXT_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComponentScore {
    pub component: Component,
    pub value: f64,
    pub weight: f64,
}

pub fn component_scores(left: &Fingerprint, right: &Fingerprint) -> Vec<ComponentScore> {
    let mut scores = Vec::new();
    let mut push = |component: Component, value: Option<f64>| {
        if let Some(value) = value {
            scores.push(ComponentScore {
                component,
                value,
                weight: component.weight(),
            });
        }
    };

    push(Component::Dates, set_overlap(&left.dates, &right.dates));
    push(
        Component::Providers,
        set_overlap(&left.providers, &right.providers),
    );
    push(
        Component::Preview,
        word_jaccard(&left.preview, &right.preview),
    );
    push(
        Component::MedicalTerms,
        set_overlap(&left.medical_terms, &right.medical_terms),
    );
    push(
        Component::WholeText,
        word_jaccard(
            leading_chars(&left.full_text, WHOLE_TEXT_CHARS),
            leading_chars(&right.full_text, WHOLE_TEXT_CHARS),
        ),
    );

    scores
}

pub fn similarity_score(left: &Fingerprint, right: &Fingerprint) -> f64 {
    let scores = component_scores(left, right);
    if scores.is_empty() {
        return 0.0;
    }

    let weighted = scores
        .iter()
        .map(|score| score.value * score.weight)
        .sum::<f64>();
    weighted / scores.len() as f64
}

fn set_overlap(left: &BTreeSet<String>, right: &BTreeSet<String>) -> Option<f64> {
    if left.is_empty() || right.is_empty() {
        return None;
    }
    let shared = left.intersection(right).count();
    Some(shared as f64 / left.len().max(right.len()) as f64)
}

fn word_jaccard(left: &str, right: &str) -> Option<f64> {
    let left_words = word_set(left);
    let right_words = word_set(right);
    if left_words.is_empty() || right_words.is_empty() {
        return None;
    }

    let shared = left_words.intersection(&right_words).count();
    let union = left_words.union(&right_words).count();
    Some(shared as f64 / union as f64)
}

fn word_set(text: &str) -> BTreeSet<&str> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|ch: char| !ch.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum MatchConfidence {
    Strong,
    Likely,
    Weak,
    NoMatch,
}

impl MatchConfidence {
    pub fn label(self) -> &'static str {
        match self {
            MatchConfidence::Strong => "STRONG",
            MatchConfidence::Likely => "LIKELY",
            MatchConfidence::Weak => "WEAK",
            MatchConfidence::NoMatch => "NO MATCH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub name: &'static str,
    pub strong: f64,
    pub likely: f64,
    pub weak: f64,
}

pub const MATCH_POLICY: ConfidencePolicy = ConfidencePolicy {
    name: "match",
    strong: 0.7,
    likely: 0.5,
    weak: 0.3,
};

pub const SAME_DOCUMENT_POLICY: ConfidencePolicy = ConfidencePolicy {
    name: "same_document",
    strong: 0.8,
    likely: 0.5,
    weak: 0.3,
};

impl ConfidencePolicy {
    pub fn band(&self, score: f64) -> MatchConfidence {
        if score > self.strong {
            MatchConfidence::Strong
        } else if score > self.likely {
            MatchConfidence::Likely
        } else if score > self.weak {
            MatchConfidence::Weak
        } else {
            MatchConfidence::NoMatch
        }
    }
}
