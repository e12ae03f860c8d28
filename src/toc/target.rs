use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use super::dates::{DateParts, MONTH_NAMES, TocDate, month_from_name, normalize_date};
use super::pages::expand_page_ranges;
use super::{DEFAULT_HEADER_MAX_CHARS, TocEntry, assemble_header};

#[derive(Debug, Clone)]
pub struct TargetParserConfig {
    pub description_column: usize,
    pub header_max_chars: usize,
    pub month_names: Vec<(String, u32)>,
}

impl Default for TargetParserConfig {
    fn default() -> Self {
        Self {
            description_column: 2,
            header_max_chars: DEFAULT_HEADER_MAX_CHARS,
            month_names: MONTH_NAMES
                .iter()
                .map(|(name, month)| (name.to_string(), *month))
                .collect(),
        }
    }
}

#[derive(Debug)]
enum TableLine {
    Separator,
    Row(Vec<String>),
    Other,
}

impl TableLine {
    fn date_cell(&self) -> Option<&str> {
        match self {
            TableLine::Row(cells) => cells.first().map(String::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DateLayout {
    NumericInline,
    NumericYearWrapped,
    NumericDayWrapped,
    MonthNameInline,
    MonthNameWrapped,
    IsoInline,
    IsoWrapped,
    UnknownMarker,
}

const DATE_LAYOUTS: &[DateLayout] = &[
    DateLayout::NumericInline,
    DateLayout::NumericYearWrapped,
    DateLayout::NumericDayWrapped,
    DateLayout::MonthNameInline,
    DateLayout::MonthNameWrapped,
    DateLayout::IsoInline,
    DateLayout::IsoWrapped,
    DateLayout::UnknownMarker,
];

const DATE_WINDOW_ROWS: usize = 4;

#[derive(Debug)]
struct DateStart {
    date: TocDate,
    date_str: String,
    rows: usize,
}

#[derive(Debug)]
pub struct TargetTocParser {
    config: TargetParserConfig,
    separator: Regex,
    numeric_full: Regex,
    month_day: Regex,
    month_slash: Regex,
    bare_number: Regex,
    slash_year: Regex,
    month_name_full: Regex,
    month_name_day: Regex,
    month_fragment: Regex,
    day_year: Regex,
    year_only: Regex,
    iso_full: Regex,
    iso_year: Regex,
    iso_month_day: Regex,
    unknown_full: Regex,
    unknown_head: Regex,
    unknown_tail: Regex,
}

impl TargetTocParser {
    pub fn new(config: TargetParserConfig) -> Result<Self> {
        let compile = |pattern: &str, label: &str| {
            Regex::new(pattern).with_context(|| format!("failed to compile {label} regex"))
        };

        Ok(Self {
            separator: compile(r"^[\s|+:=-]*[-=]{3,}[\s|+:=-]*$", "table separator")?,
            numeric_full: compile(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$", "numeric date")?,
            month_day: compile(r"^(\d{1,2})/(\d{1,2})$", "month/day fragment")?,
            month_slash: compile(r"^(\d{1,2})/$", "month fragment")?,
            bare_number: compile(r"^(\d{1,2})$", "day fragment")?,
            slash_year: compile(r"^/(\d{4}|\d{2})$", "year fragment")?,
            month_name_full: compile(
                r"^([A-Za-z]+)\.?\s+(\d{1,2}),?\s+(\d{4})$",
                "month-name date",
            )?,
            month_name_day: compile(r"^([A-Za-z]+)\.?\s+(\d{1,2}),?$", "month-name day")?,
            month_fragment: compile(r"^[A-Za-z]+\.?$", "month-name fragment")?,
            day_year: compile(r"^(\d{1,2}),?\s+(\d{4})$", "day/year fragment")?,
            year_only: compile(r"^(\d{4})$", "year-only fragment")?,
            iso_full: compile(r"^(\d{4})-(\d{1,2})-(\d{1,2})$", "ISO date")?,
            iso_year: compile(r"^(\d{4})-$", "ISO year fragment")?,
            iso_month_day: compile(r"^(\d{1,2})-(\d{1,2})$", "ISO month/day fragment")?,
            unknown_full: compile(r"(?i)^unknown$", "unknown marker")?,
            unknown_head: compile(r"(?i)^un$", "unknown head")?,
            unknown_tail: compile(r"(?i)^known$", "unknown tail")?,
            config,
        })
    }

    pub fn parse_text(&self, text: &str) -> Vec<TocEntry> {
        let lines = text.lines().collect::<Vec<&str>>();
        self.parse_lines(&lines)
    }

    pub fn parse_lines(&self, raw_lines: &[&str]) -> Vec<TocEntry> {
        let lines = raw_lines
            .iter()
            .map(|line| self.classify(line))
            .collect::<Vec<TableLine>>();

        let mut entries = Vec::new();
        let mut index = 0usize;

        while index < lines.len() {
            let Some(start) = self.detect_date_start(&lines, index) else {
                index += 1;
                continue;
            };

            let (entry, next_index) = self.collect_entry(&lines, index, start);
            if let Some(entry) = entry {
                entries.push(entry);
            }
            index = next_index;
        }

        entries
    }

    fn classify(&self, raw_line: &str) -> TableLine {
        let line = raw_line
            .replace(['\u{2013}', '\u{2014}'], "-")
            .replace('\u{00a0}', " ");
        let line = line.trim();

        if self.separator.is_match(line) {
            return TableLine::Separator;
        }
        if !line.starts_with('|') {
            return TableLine::Other;
        }

        let inner = line.trim_start_matches('|');
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        TableLine::Row(inner.split('|').map(|cell| cell.trim().to_string()).collect())
    }

    fn collect_entry(
        &self,
        lines: &[TableLine],
        start_index: usize,
        start: DateStart,
    ) -> (Option<TocEntry>, usize) {
        let mut description_fragments = Vec::<String>::new();
        let mut page_fragments = Vec::<String>::new();

        let mut index = start_index;
        while index < lines.len() {
            match &lines[index] {
                TableLine::Separator => break,
                TableLine::Other => {}
                TableLine::Row(cells) => {
                    let inside_date_rows = index < start_index + start.rows;
                    if !inside_date_rows && self.detect_date_start(lines, index).is_some() {
                        break;
                    }
                    self.collect_cells(cells, &mut description_fragments, &mut page_fragments);
                }
            }
            index += 1;
        }

        let pages = expand_page_ranges(&page_fragments.join(" "), None);
        if start.date.is_unknown() && pages.is_empty() {
            debug!(date_str = %start.date_str, "dropping undated reviewer entry without pages");
            return (None, index);
        }

        let entry = TocEntry {
            date: start.date,
            date_str: start.date_str,
            pages,
            header: assemble_header(&description_fragments, self.config.header_max_chars),
        };
        (Some(entry), index)
    }

    fn collect_cells(
        &self,
        cells: &[String],
        description_fragments: &mut Vec<String>,
        page_fragments: &mut Vec<String>,
    ) {
        let column = self.config.description_column;
        if cells.len() <= column + 1 {
            return;
        }

        if let Some(description) = cells.get(column)
            && !description.is_empty()
            && !description_fragments.contains(description)
        {
            description_fragments.push(description.clone());
        }

        if let Some(pages) = cells.last()
            && !pages.is_empty()
        {
            page_fragments.push(pages.clone());
        }
    }

    fn detect_date_start(&self, lines: &[TableLine], index: usize) -> Option<DateStart> {
        let window = lines
            .iter()
            .skip(index)
            .take(DATE_WINDOW_ROWS)
            .map(TableLine::date_cell)
            .collect::<Vec<Option<&str>>>();

        if window.first().copied().flatten().unwrap_or("").is_empty() {
            return None;
        }

        DATE_LAYOUTS
            .iter()
            .find_map(|layout| self.match_layout(*layout, &window))
    }

    fn match_layout(&self, layout: DateLayout, window: &[Option<&str>]) -> Option<DateStart> {
        let cell = |offset: usize| window.get(offset).copied().flatten().filter(|c| !c.is_empty());
        let first = cell(0)?;

        match layout {
            DateLayout::NumericInline => {
                let captures = self.numeric_full.captures(first)?;
                dated(
                    number(&captures, 1)?,
                    number(&captures, 2)?,
                    number(&captures, 3)?,
                    &[first],
                )
            }
            DateLayout::NumericYearWrapped => {
                let head = self.month_day.captures(first)?;
                let second = cell(1)?;
                let tail = self.slash_year.captures(second)?;
                dated(
                    number(&head, 1)?,
                    number(&head, 2)?,
                    number(&tail, 1)?,
                    &[first, second],
                )
            }
            DateLayout::NumericDayWrapped => {
                let head = self.month_slash.captures(first)?;
                let second = cell(1)?;
                let middle = self.bare_number.captures(second)?;
                let third = cell(2)?;
                let tail = self.slash_year.captures(third)?;
                dated(
                    number(&head, 1)?,
                    number(&middle, 1)?,
                    number(&tail, 1)?,
                    &[first, second, third],
                )
            }
            DateLayout::MonthNameInline => {
                let captures = self.month_name_full.captures(first)?;
                let month = month_from_name(captures.get(1)?.as_str(), &self.config.month_names)?;
                dated(month, number(&captures, 2)?, number(&captures, 3)?, &[first])
            }
            DateLayout::MonthNameWrapped => self.match_wrapped_month_name(&cell),
            DateLayout::IsoInline => {
                let captures = self.iso_full.captures(first)?;
                dated(
                    number(&captures, 2)?,
                    number(&captures, 3)?,
                    number(&captures, 1)?,
                    &[first],
                )
            }
            DateLayout::IsoWrapped => {
                let head = self.iso_year.captures(first)?;
                let second = cell(1)?;
                let tail = self.iso_month_day.captures(second)?;
                dated(
                    number(&tail, 1)?,
                    number(&tail, 2)?,
                    number(&head, 1)?,
                    &[first, second],
                )
            }
            DateLayout::UnknownMarker => {
                if self.unknown_full.is_match(first) {
                    return Some(DateStart {
                        date: TocDate::Unknown,
                        date_str: first.to_string(),
                        rows: 1,
                    });
                }
                let second = cell(1)?;
                if self.unknown_head.is_match(first) && self.unknown_tail.is_match(second) {
                    return Some(DateStart {
                        date: TocDate::Unknown,
                        date_str: format!("{first}{second}"),
                        rows: 2,
                    });
                }
                None
            }
        }
    }

    fn match_wrapped_month_name<'a>(
        &self,
        cell: &dyn Fn(usize) -> Option<&'a str>,
    ) -> Option<DateStart> {
        let first = cell(0)?;

        if let Some(captures) = self.month_name_day.captures(first)
            && let Some(month) =
                month_from_name(captures.get(1)?.as_str(), &self.config.month_names)
            && let Some(second) = cell(1)
            && let Some(year) = self.year_only.captures(second)
        {
            return dated(
                month,
                number(&captures, 2)?,
                number(&year, 1)?,
                &[first, second],
            );
        }

        for month_rows in 1..=2usize {
            let fragments = (0..month_rows)
                .map(|offset| cell(offset))
                .collect::<Option<Vec<&str>>>()?;
            if !fragments
                .iter()
                .all(|fragment| self.month_fragment.is_match(fragment))
            {
                return None;
            }

            let name = fragments.concat().to_ascii_lowercase();
            let Some(month) = month_from_name(&name, &self.config.month_names) else {
                continue;
            };

            let Some(next) = cell(month_rows) else {
                continue;
            };
            if let Some(day_year) = self.day_year.captures(next) {
                let mut rows = fragments.clone();
                rows.push(next);
                return dated(month, number(&day_year, 1)?, number(&day_year, 2)?, &rows);
            }

            let day_text = next.trim_end_matches(',');
            if let Some(day) = self.bare_number.captures(day_text)
                && let Some(after) = cell(month_rows + 1)
                && let Some(year) = self.year_only.captures(after)
            {
                let mut rows = fragments.clone();
                rows.push(next);
                rows.push(after);
                return dated(month, number(&day, 1)?, number(&year, 1)?, &rows);
            }
        }

        None
    }
}

fn number<T: std::str::FromStr>(captures: &regex::Captures<'_>, index: usize) -> Option<T> {
    captures.get(index)?.as_str().parse().ok()
}

fn dated(month: u32, day: u32, year: i32, fragments: &[&str]) -> Option<DateStart> {
    Some(DateStart {
        date: normalize_date(DateParts { month, day, year }),
        date_str: fragments.join(" "),
        rows: fragments.len(),
    })
}
