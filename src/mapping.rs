use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::util::{document_basename, read_json, run_tool, write_json_pretty};

pub const OFFSET_SCAN_PAGES: u32 = 50;
pub const LINK_SCAN_PAGES: u32 = 30;
pub const DEFAULT_MAX_LOGICAL_PAGE: u32 = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageMapping(BTreeMap<u32, u32>);

impl PageMapping {
    pub fn get(&self, logical: u32) -> Option<u32> {
        self.0.get(&logical).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(logical, physical)| (*logical, *physical))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "page mapping file not found; using empty mapping");
            return Ok(Self::default());
        }
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
    }
}

impl FromIterator<(u32, u32)> for PageMapping {
    fn from_iter<T: IntoIterator<Item = (u32, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

pub fn mapping_path(case_dir: &Path, document: &Path) -> PathBuf {
    case_dir.join("mappings").join(format!(
        "{}_hyperlink_mapping.json",
        document_basename(document)
    ))
}

pub fn linear_mapping(offset: u32, max_logical: u32) -> PageMapping {
    (1..=max_logical)
        .map(|logical| (logical, logical + offset))
        .collect()
}

pub fn detect_offset(links: &[Hyperlink]) -> Option<u32> {
    links
        .iter()
        .find(|link| link.text.trim() == "1")
        .and_then(|link| link.destination.checked_sub(1))
}

pub fn build_linear_mapping(
    links: &[Hyperlink],
    fallback_offset: Option<u32>,
    max_logical: u32,
) -> Result<(PageMapping, u32)> {
    let offset = match (detect_offset(links), fallback_offset) {
        (Some(offset), _) => {
            info!(offset, "detected page offset from hyperlinks");
            offset
        }
        (None, Some(offset)) => {
            warn!(offset, "could not detect page offset from hyperlinks; using fallback");
            offset
        }
        (None, None) => {
            bail!("could not detect page offset from hyperlinks and no fallback offset was given")
        }
    };

    Ok((linear_mapping(offset, max_logical), offset))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    pub text: String,
    pub destination: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkLabel {
    Single(u32),
    Range(u32, u32),
    Multiple(Vec<u32>),
    Unreadable,
}

fn classify_label(text: &str, range: &Regex) -> LinkLabel {
    let text = text.trim();
    let is_number =
        |value: &str| !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit());

    if let Some(captures) = range.captures(text) {
        let start = captures.get(1).and_then(|m| m.as_str().parse().ok());
        let end = captures.get(2).and_then(|m| m.as_str().parse().ok());
        if let (Some(start), Some(end)) = (start, end) {
            return LinkLabel::Range(start, end);
        }
    }

    if is_number(text) {
        return text.parse().map(LinkLabel::Single).unwrap_or(LinkLabel::Unreadable);
    }

    if let Some(stripped) = text.strip_suffix(['-', ',']) {
        let stripped = stripped.trim();
        if is_number(stripped) {
            return stripped
                .parse()
                .map(LinkLabel::Single)
                .unwrap_or(LinkLabel::Unreadable);
        }
    }

    if text.contains(',') {
        let numbers = text
            .split(',')
            .map(str::trim)
            .filter(|part| is_number(part))
            .filter_map(|part| part.parse().ok())
            .collect::<Vec<u32>>();
        return match numbers.as_slice() {
            [] => LinkLabel::Unreadable,
            [single] => LinkLabel::Single(*single),
            _ => LinkLabel::Multiple(numbers),
        };
    }

    LinkLabel::Unreadable
}

/// Builds a mapping from TOC hyperlinks whose labels are page numbers.
///
/// A labelled range `A-B` is filled in page by page when `B` also has a link
/// and both spans have the same length. Afterwards any gap between two
/// consecutive mapped pages is filled when the physical gap equals the
/// logical gap.
pub fn build_hyperlink_mapping(links: &[Hyperlink]) -> Result<PageMapping> {
    let range = Regex::new(r"^(\d+)\s*-\s*(\d+)$").context("failed to compile link range regex")?;

    let mut mapping = BTreeMap::<u32, u32>::new();
    let mut ranges = Vec::new();

    for link in links {
        match classify_label(&link.text, &range) {
            LinkLabel::Single(logical) => {
                mapping.insert(logical, link.destination);
            }
            LinkLabel::Range(start, end) => {
                mapping.insert(start, link.destination);
                ranges.push((start, end, link.destination));
            }
            LinkLabel::Multiple(pages) => {
                warn!(
                    text = %link.text,
                    destination = link.destination,
                    pages = pages.len(),
                    "link names several pages; skipping"
                );
            }
            LinkLabel::Unreadable => {
                debug!(text = %link.text, "ignoring non-numeric link label");
            }
        }
    }

    for (start, end, start_physical) in ranges {
        let Some(&end_physical) = mapping.get(&end) else {
            continue;
        };
        let logical_span = i64::from(end) - i64::from(start);
        let physical_span = i64::from(end_physical) - i64::from(start_physical);
        if logical_span != physical_span || logical_span < 0 {
            warn!(
                start,
                end,
                start_physical,
                end_physical,
                "range size mismatch; not interpolating"
            );
            continue;
        }
        for step in 0..=(end - start) {
            mapping.insert(start + step, start_physical + step);
        }
    }

    let anchors = mapping
        .iter()
        .map(|(logical, physical)| (*logical, *physical))
        .collect::<Vec<(u32, u32)>>();
    for pair in anchors.windows(2) {
        let (start_logical, start_physical) = pair[0];
        let (end_logical, end_physical) = pair[1];
        let logical_gap = end_logical - start_logical;
        if logical_gap > 1
            && i64::from(end_physical) - i64::from(start_physical) == i64::from(logical_gap)
        {
            for step in 1..logical_gap {
                mapping.insert(start_logical + step, start_physical + step);
            }
        }
    }

    Ok(PageMapping(mapping))
}

#[derive(Debug)]
pub struct HyperlinkReader {
    anchor: Regex,
    tag: Regex,
}

impl HyperlinkReader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            anchor: Regex::new(r##"(?s)<a href="[^"#]*#(\d+)"[^>]*>(.*?)</a>"##)
                .context("failed to compile hyperlink regex")?,
            tag: Regex::new(r"<[^>]+>").context("failed to compile markup tag regex")?,
        })
    }

    pub fn parse_xml(&self, xml: &str) -> Vec<Hyperlink> {
        self.anchor
            .captures_iter(xml)
            .filter_map(|captures| {
                let destination = captures.get(1)?.as_str().parse::<u32>().ok()?;
                let raw_text = captures.get(2)?.as_str();
                let text = unescape_xml(&self.tag.replace_all(raw_text, ""))
                    .trim()
                    .to_string();
                (destination > 0 && !text.is_empty()).then_some(Hyperlink { text, destination })
            })
            .collect()
    }

    pub fn read(&self, pdf_path: &Path, max_pages: u32) -> Result<Vec<Hyperlink>> {
        let args: Vec<OsString> = vec![
            "-xml".into(),
            "-stdout".into(),
            "-i".into(),
            "-q".into(),
            "-f".into(),
            "1".into(),
            "-l".into(),
            max_pages.to_string().into(),
            pdf_path.as_os_str().to_os_string(),
        ];
        let xml = run_tool("pdftohtml", &args, pdf_path)?;
        let links = self.parse_xml(&xml);
        info!(path = %pdf_path.display(), links = links.len(), "read TOC hyperlinks");
        Ok(links)
    }
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
