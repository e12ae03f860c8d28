use std::collections::BTreeSet;

use tracing::warn;

/// Widest range accepted when no page bound applies. Wider spans come from
/// OCR-merged digits, not real documents.
pub const MAX_RANGE_SPAN: u32 = 10_000;

pub fn expand_page_ranges(text: &str, max_page: Option<u32>) -> Vec<u32> {
    let mut pages = BTreeSet::new();
    let ceiling = max_page.unwrap_or(u32::MAX);

    let normalized = normalize_hyphen_spacing(text);
    for token in normalized.split(|ch: char| ch == ',' || ch.is_whitespace()) {
        let token = token.trim_matches('-');
        if token.is_empty() {
            continue;
        }

        match token.split_once('-') {
            Some((start, end)) => {
                let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) else {
                    continue;
                };
                if start == 0 || start > end || start > ceiling {
                    continue;
                }
                let end = end.min(ceiling);
                if end - start >= MAX_RANGE_SPAN {
                    warn!(range = token, "ignoring implausibly wide page range");
                    continue;
                }
                pages.extend(start..=end);
            }
            None => {
                if let Ok(page) = token.parse::<u32>()
                    && page > 0
                    && page <= ceiling
                {
                    pages.insert(page);
                }
            }
        }
    }

    pages.into_iter().collect()
}

pub fn normalize_hyphen_spacing(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '-' {
            while out.ends_with(char::is_whitespace) {
                out.pop();
            }
            out.push('-');
            while chars.peek().map(|next| next.is_whitespace()).unwrap_or(false) {
                chars.next();
            }
            continue;
        }
        out.push(ch);
    }

    out
}

pub fn format_page_list(pages: &[u32]) -> String {
    let mut parts = Vec::<String>::new();
    let mut index = 0usize;

    while index < pages.len() {
        let start = pages[index];
        let mut end = start;
        while index + 1 < pages.len() && pages[index + 1] == end + 1 {
            end = pages[index + 1];
            index += 1;
        }

        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
        index += 1;
    }

    parts.join(", ")
}
