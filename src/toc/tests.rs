use std::time::{Duration, Instant};

use chrono::NaiveDate;

use super::pages::expand_page_ranges;
use super::*;

fn ymd(year: i32, month: u32, day: u32) -> TocDate {
    TocDate::Known(NaiveDate::from_ymd_opt(year, month, day).expect("valid test date"))
}

fn source_parser() -> SourceTocParser {
    SourceTocParser::new(SourceParserConfig::default()).expect("vendor parser builds")
}

fn target_parser() -> TargetTocParser {
    TargetTocParser::new(TargetParserConfig::default()).expect("reviewer parser builds")
}

#[test]
fn expand_page_ranges_expands_and_deduplicates() {
    assert_eq!(expand_page_ranges("103-105", None), vec![103, 104, 105]);
    assert_eq!(expand_page_ranges("103-105,103", None), vec![103, 104, 105]);
    assert_eq!(expand_page_ranges("7, 3, 5-6", None), vec![3, 5, 6, 7]);
}

#[test]
fn expand_page_ranges_rejoins_ranges_split_across_lines() {
    assert_eq!(expand_page_ranges("253- 257,", None), vec![253, 254, 255, 256, 257]);
    assert_eq!(expand_page_ranges("12 -14", None), vec![12, 13, 14]);
}

#[test]
fn expand_page_ranges_ignores_noise_zero_and_reversed_ranges() {
    assert_eq!(expand_page_ranges("0, 9-4, abc, 2", None), vec![2]);
    assert!(expand_page_ranges("", None).is_empty());
}

#[test]
fn expand_page_ranges_clamps_to_the_page_bound() {
    let started = Instant::now();
    let pages = expand_page_ranges("20-22, 1-60000000", Some(500));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(pages, (1..=500).collect::<Vec<u32>>());
    assert_eq!(expand_page_ranges("498-505, 700", Some(500)), vec![498, 499, 500]);
    assert!(expand_page_ranges("600-900", Some(500)).is_empty());
}

#[test]
fn expand_page_ranges_rejects_implausibly_wide_unbounded_ranges() {
    assert_eq!(expand_page_ranges("1-4000000000, 12", None), vec![12]);
    assert_eq!(expand_page_ranges("1-10000", None).len(), 10_000);
    assert_eq!(expand_page_ranges("1-10001", None), Vec::<u32>::new());
}

#[test]
fn vendor_parser_clamps_noisy_ranges_to_the_bound() {
    let started = Instant::now();
    let entries = source_parser().parse_text("09/28/23\n20-22,\n1-60000000\nValley Clinic\n");
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].pages, (1..=500).collect::<Vec<u32>>());
    assert_eq!(entries[0].header, "Valley Clinic");
}

#[test]
fn format_page_list_folds_consecutive_runs() {
    assert_eq!(format_page_list(&[1, 2, 3, 7, 9, 10]), "1-3, 7, 9-10");
    assert_eq!(format_page_list(&[]), "");
}

#[test]
fn date_normalizer_promotes_two_digit_years() {
    let dates = DateNormalizer::new().expect("normalizer builds");
    assert_eq!(dates.normalize("07/07/10").to_string(), "2010-07-07");
    assert_eq!(dates.normalize("9/28/2023"), ymd(2023, 9, 28));
    assert_eq!(dates.normalize("September 28, 2023"), ymd(2023, 9, 28));
    assert_eq!(dates.normalize("2024-03-12"), ymd(2024, 3, 12));
}

#[test]
fn date_normalizer_maps_impossible_dates_to_unknown() {
    let dates = DateNormalizer::new().expect("normalizer builds");
    assert_eq!(dates.normalize("13/40/99").to_string(), "UNKNOWN");
    assert_eq!(dates.normalize("02/30/2023"), TocDate::Unknown);
    assert_eq!(dates.normalize("not a date"), TocDate::Unknown);
}

#[test]
fn toc_date_serializes_as_iso_or_unknown() {
    let known = serde_json::to_string(&ymd(2025, 10, 6)).expect("serialize");
    assert_eq!(known, "\"2025-10-06\"");
    let unknown = serde_json::to_string(&TocDate::Unknown).expect("serialize");
    assert_eq!(unknown, "\"UNKNOWN\"");

    let parsed: TocDate = serde_json::from_str("\"UNKNOWN\"").expect("deserialize");
    assert!(parsed.is_unknown());
    assert!(serde_json::from_str::<TocDate>("\"2025-13-01\"").is_err());
}

#[test]
fn truncate_at_word_boundary_cuts_before_partial_word() {
    let text = "Parveen Ahmed MD Office Visit";
    assert_eq!(truncate_at_word_boundary(text, 17), "Parveen Ahmed MD");
    assert_eq!(truncate_at_word_boundary(text, 16), "Parveen Ahmed MD");
    assert_eq!(truncate_at_word_boundary(text, 100), text);
}

#[test]
fn vendor_parser_reads_basic_entries() {
    let text = "TABLE OF CONTENTS\n\
                09/28/23\n\
                20-22\n\
                Parveen, Ahmed MD\n\
                Office visit\n\
                10/02/23\n\
                23,\n\
                25-26\n\
                Smith Radiology\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].date, ymd(2023, 9, 28));
    assert_eq!(entries[0].date_str, "09/28/23");
    assert_eq!(entries[0].pages, vec![20, 21, 22]);
    assert_eq!(entries[0].header, "Parveen, Ahmed MD Office visit");
    assert_eq!(entries[1].pages, vec![23, 25, 26]);
    assert_eq!(entries[1].header, "Smith Radiology");
}

#[test]
fn vendor_parser_drops_entries_whose_pages_exceed_the_bound() {
    let entries = source_parser().parse_text("08/15/22\n98940\nAdjustment\n");
    assert!(entries.is_empty());
}

#[test]
fn vendor_parser_page_bound_is_configurable() {
    let config = SourceParserConfig {
        max_page_number: 100_000,
        ..SourceParserConfig::default()
    };
    let parser = SourceTocParser::new(config).expect("parser builds");
    let entries = parser.parse_text("08/15/22\n98940\nAdjustment\n");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].pages, vec![98940]);
}

#[test]
fn vendor_parser_ignores_dates_embedded_in_excerpts() {
    let entries =
        source_parser().parse_text("09/28/23\n20-22\nDenial for period 01/02/23 to 08/13/23\n");

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].pages, vec![20, 21, 22]);
    assert!(!entries[0].pages.contains(&1));
    assert!(entries[0].header.starts_with("Denial for period"));
}

#[test]
fn vendor_parser_folds_unconfirmed_date_into_previous_header() {
    let text = "09/28/23\n\
                20-22\n\
                Parveen MD\n\
                09/28/23\n\
                Office visit note\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].pages, vec![20, 21, 22]);
    assert_eq!(entries[0].header, "Parveen MD 09/28/23 Office visit note");
}

#[test]
fn vendor_parser_date_followed_by_date_is_not_a_boundary() {
    let text = "09/28/23\n\
                20-22\n\
                Parveen MD\n\
                09/28/23\n\
                10/01/23\n\
                30-31\n\
                Smith DO\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].header, "Parveen MD 09/28/23");
    assert_eq!(entries[1].date, ymd(2023, 10, 1));
    assert_eq!(entries[1].pages, vec![30, 31]);
}

#[test]
fn vendor_parser_stops_reading_pages_after_header() {
    let text = "03/12/24\n209-210\nValley Clinic\n555-1212\n99213\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].pages, vec![209, 210]);
    assert_eq!(entries[0].header, "Valley Clinic 555-1212 99213");
}

#[test]
fn vendor_parser_splits_pages_glued_to_header() {
    let text = "11/04/23\n230,\n235-240Parveen Ahmed MD\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].pages, vec![230, 235, 236, 237, 238, 239, 240]);
    assert_eq!(entries[0].header, "Parveen Ahmed MD");
}

#[test]
fn vendor_parser_rejoins_ranges_broken_across_lines() {
    let entries = source_parser().parse_text("01/05/24\n253-\n257,\n260\nOrtho Group\n");
    assert_eq!(entries[0].pages, vec![253, 254, 255, 256, 257, 260]);
}

#[test]
fn vendor_parser_stops_at_medical_content() {
    let text = "05/01/23\n\
                40-41\n\
                Valley Clinic\n\
                HISTORY OF PRESENT ILLNESS\n\
                05/01/23\n\
                12\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].header, "Valley Clinic");
    assert_eq!(entries[1].pages, vec![12]);
}

#[test]
fn vendor_parser_patient_sentence_ends_collection() {
    let text = "05/01/23\n40\nValley Clinic\nPatient presents with neck pain\n";
    let entries = source_parser().parse_text(text);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].header, "Valley Clinic");
}

#[test]
fn vendor_parser_reads_undated_entries() {
    let text = "Undated\n77-78\nPharmacy printout\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 1);
    assert!(entries[0].date.is_unknown());
    assert_eq!(entries[0].pages, vec![77, 78]);
}

#[test]
fn vendor_parser_undated_marker_closes_the_open_entry() {
    let text = "09/28/23\n20-22\nValley Clinic\nUndated\n77-78\nPharmacy printout\n";
    let entries = source_parser().parse_text(text);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].date, ymd(2023, 9, 28));
    assert_eq!(entries[0].pages, vec![20, 21, 22]);
    assert_eq!(entries[0].header, "Valley Clinic");
    assert!(entries[1].date.is_unknown());
    assert_eq!(entries[1].date_str, "Undated");
    assert_eq!(entries[1].pages, vec![77, 78]);
    assert_eq!(entries[1].header, "Pharmacy printout");
}

#[test]
fn vendor_parser_reads_only_leading_pages() {
    let config = SourceParserConfig {
        max_toc_pages: 1,
        ..SourceParserConfig::default()
    };
    let parser = SourceTocParser::new(config).expect("parser builds");
    let text = "09/28/23\n20\nClinic A\n\u{000C}10/02/23\n30\nClinic B\n";
    let entries = parser.parse_text(text);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].header, "Clinic A");
}

#[test]
fn vendor_parser_truncates_long_headers() {
    let long_line = "word ".repeat(60);
    let text = format!("09/28/23\n20\n{long_line}\n");
    let entries = source_parser().parse_text(&text);

    assert!(entries[0].header.chars().count() <= 150);
    assert!(entries[0].header.ends_with("word"));
}

#[test]
fn reviewer_parser_reads_inline_dates() {
    let text = "\
+------------+---+---------------------+---------+
| Date       |   | Description         | Pages   |
+============+===+=====================+=========+
| 10/06/2025 |   | Cover Letter        | 1-3     |
+------------+---+---------------------+---------+
| September  |   | Parveen MD          | 20-22   |
| 28, 2023   |   |                     |         |
+------------+---+---------------------+---------+
";
    let entries = target_parser().parse_text(text);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].date, ymd(2025, 10, 6));
    assert_eq!(entries[0].pages, vec![1, 2, 3]);
    assert_eq!(entries[0].header, "Cover Letter");
    assert_eq!(entries[1].date, ymd(2023, 9, 28));
    assert_eq!(entries[1].pages, vec![20, 21, 22]);
}

#[test]
fn reviewer_parser_reassembles_numeric_fragments() {
    let text = "\
| 09/28 |   | Parveen MD Office   | 20-22 |
| /2023 |   | visit               |       |
+-------+---+---------------------+-------+
| 10/   |   | Smith Radiology     | 30,   |
| 02    |   |                     | 31    |
| /2023 |   |                     |       |
+-------+---+---------------------+-------+
";
    let entries = target_parser().parse_text(text);

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].date, ymd(2023, 9, 28));
    assert_eq!(entries[0].header, "Parveen MD Office visit");
    assert_eq!(entries[1].date, ymd(2023, 10, 2));
    assert_eq!(entries[1].pages, vec![30, 31]);
}

#[test]
fn reviewer_parser_reassembles_split_month_names() {
    let text = "\
| Sept  |   | Parveen MD | 20-22 |
| ember |   |            |       |
| 28,   |   |            |       |
| 2023  |   |            |       |
+-------+---+------------+-------+
";
    let entries = target_parser().parse_text(text);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].date, ymd(2023, 9, 28));
    assert_eq!(entries[0].date.to_string(), "2023-09-28");
}

#[test]
fn reviewer_parser_reads_wrapped_iso_dates() {
    let text = "\
| 2024- |   | Valley Clinic | 209,  |
| 03-12 |   |               | 210   |
+-------+---+---------------+-------+
";
    let entries = target_parser().parse_text(text);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].date, ymd(2024, 3, 12));
    assert_eq!(entries[0].pages, vec![209, 210]);
}

#[test]
fn reviewer_parser_handles_unknown_markers() {
    let text = "\
| Un    |   | Pharmacy list | 77-78 |
| known |   |               |       |
+-------+---+---------------+-------+
| Unknown |   | Blank fax   |       |
+-------+---+---------------+-------+
| 01/02/2024 |   | Intake   |       |
+-------+---+---------------+-------+
";
    let entries = target_parser().parse_text(text);

    assert_eq!(entries.len(), 2);
    assert!(entries[0].date.is_unknown());
    assert_eq!(entries[0].pages, vec![77, 78]);
    assert_eq!(entries[1].date, ymd(2024, 1, 2));
    assert!(entries[1].pages.is_empty());
}

#[test]
fn reviewer_parser_ends_entry_at_next_date_without_separator() {
    let text = "\
| Date       |   | Description | Pages |
|------------|---|-------------|-------|
| 03/12/2024 |   | Clinic A    | 5     |
| 03/13/2024 |   | Clinic B    | 6     |
| 03/13/2024 |   | Clinic B    | 6     |
";
    let entries = target_parser().parse_text(text);

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].pages, vec![5]);
    assert_eq!(entries[1].header, "Clinic B");
    assert_eq!(entries[2].pages, vec![6]);
}

#[test]
fn reviewer_parser_keeps_one_copy_of_repeated_description_cells() {
    let text = "\
| 03/12/2024 |   | Clinic A | 5 |
|            |   | Clinic A | 6 |
+------------+---+----------+---+
";
    let entries = target_parser().parse_text(text);

    assert_eq!(entries[0].header, "Clinic A");
    assert_eq!(entries[0].pages, vec![5, 6]);
}

#[test]
fn reviewer_parser_does_not_bound_page_numbers() {
    let text = "| 03/12/2024 |   | Billing | 998-1001 |\n";
    let entries = target_parser().parse_text(text);
    assert_eq!(entries[0].pages, vec![998, 999, 1000, 1001]);
}

#[test]
fn reviewer_parser_invalid_calendar_date_becomes_unknown() {
    let text = "| 02/30/2024 |   | Clinic | 4 |\n";
    let entries = target_parser().parse_text(text);
    assert!(entries[0].date.is_unknown());
    assert_eq!(entries[0].date_str, "02/30/2024");
}
