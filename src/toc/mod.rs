use serde::{Deserialize, Serialize};

mod dates;
mod pages;
mod source;
mod target;
#[cfg(test)]
mod tests;

pub use dates::{DateNormalizer, TocDate};
pub use pages::format_page_list;
pub use source::{SourceParserConfig, SourceTocParser};
pub use target::{TargetParserConfig, TargetTocParser};

pub const DEFAULT_HEADER_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yours,
    Theirs,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Yours => "yours",
            Side::Theirs => "theirs",
        }
    }

    pub fn counterpart(self) -> Side {
        match self {
            Side::Yours => Side::Theirs,
            Side::Theirs => Side::Yours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub date: TocDate,
    pub date_str: String,
    pub pages: Vec<u32>,
    pub header: String,
}

impl TocEntry {
    pub fn has_pages(&self) -> bool {
        !self.pages.is_empty()
    }
}

pub fn assemble_header(fragments: &[String], max_chars: usize) -> String {
    let joined = fragments
        .iter()
        .flat_map(|fragment| fragment.split_whitespace())
        .collect::<Vec<&str>>()
        .join(" ");
    truncate_at_word_boundary(&joined, max_chars)
}

pub fn truncate_at_word_boundary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    let head = &text[..cut];

    if text[cut..].starts_with(' ') {
        return head.trim_end().to_string();
    }

    match head.rfind(' ') {
        Some(space) if space > 0 => head[..space].trim_end().to_string(),
        _ => head.to_string(),
    }
}
