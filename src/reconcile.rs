use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ReconciliationResult, SameDateMatch, UnmatchedEntry};
use crate::toc::{TocDate, TocEntry};

pub fn reconcile(yours: &[TocEntry], theirs: &[TocEntry]) -> ReconciliationResult {
    let your_groups = group_by_date(yours);
    let their_groups = group_by_date(theirs);

    let dates = your_groups
        .keys()
        .chain(their_groups.keys())
        .copied()
        .collect::<BTreeSet<TocDate>>();

    let mut result = ReconciliationResult::default();
    let empty = Vec::new();

    for date in dates {
        let your_entries = your_groups.get(&date).unwrap_or(&empty);
        let their_entries = their_groups.get(&date).unwrap_or(&empty);

        let mut your_matched = vec![false; your_entries.len()];
        let mut their_matched = vec![false; their_entries.len()];

        for (your_index, your_entry) in your_entries.iter().enumerate() {
            for (their_index, their_entry) in their_entries.iter().enumerate() {
                if !pages_intersect(&your_entry.pages, &their_entry.pages) {
                    continue;
                }

                your_matched[your_index] = true;
                their_matched[their_index] = true;
                result.same_dates.push(SameDateMatch {
                    date,
                    your_pages: your_entry.pages.clone(),
                    their_pages: their_entry.pages.clone(),
                    your_header: your_entry.header.clone(),
                    their_header: their_entry.header.clone(),
                });
            }
        }

        result.yours_only.extend(
            your_entries
                .iter()
                .zip(&your_matched)
                .filter(|(_, matched)| !**matched)
                .map(|(entry, _)| UnmatchedEntry::from(*entry)),
        );
        result.theirs_only.extend(
            their_entries
                .iter()
                .zip(&their_matched)
                .filter(|(_, matched)| !**matched)
                .map(|(entry, _)| UnmatchedEntry::from(*entry)),
        );
    }

    result
}

fn group_by_date(entries: &[TocEntry]) -> BTreeMap<TocDate, Vec<&TocEntry>> {
    let mut groups = BTreeMap::<TocDate, Vec<&TocEntry>>::new();
    for entry in entries.iter().filter(|entry| entry.has_pages()) {
        groups.entry(entry.date).or_default().push(entry);
    }
    groups
}

fn pages_intersect(left: &[u32], right: &[u32]) -> bool {
    let (mut i, mut j) = (0usize, 0usize);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return true,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn entry(date: &str, pages: &[u32], header: &str) -> TocEntry {
        TocEntry {
            date: TocDate::parse_iso(date).expect("valid test date"),
            date_str: date.to_string(),
            pages: pages.to_vec(),
            header: header.to_string(),
        }
    }

    #[test]
    fn reviewer_only_date_lands_in_yours_only() {
        let yours = vec![entry("2025-10-06", &[1, 2, 3], "Cover Letter")];
        let result = reconcile(&yours, &[]);

        assert_eq!(result.yours_only.len(), 1);
        assert_eq!(
            result.yours_only[0],
            UnmatchedEntry {
                date: TocDate::Known(NaiveDate::from_ymd_opt(2025, 10, 6).expect("date")),
                pages: vec![1, 2, 3],
                header: "Cover Letter".to_string(),
            }
        );
        assert!(result.theirs_only.is_empty());
        assert!(result.same_dates.is_empty());
    }

    #[test]
    fn partial_page_overlap_counts_as_same_date_match() {
        let yours = vec![entry("2024-03-12", &[209, 210], "Valley Clinic")];
        let theirs = vec![entry("2024-03-12", &[209, 210, 300], "VALLEY CLINIC PT")];
        let result = reconcile(&yours, &theirs);

        assert_eq!(result.same_dates.len(), 1);
        let record = &result.same_dates[0];
        assert_eq!(record.your_pages, vec![209, 210]);
        assert_eq!(record.their_pages, vec![209, 210, 300]);
        assert_eq!(record.your_header, "Valley Clinic");
        assert_eq!(record.their_header, "VALLEY CLINIC PT");
        assert!(result.yours_only.is_empty());
        assert!(result.theirs_only.is_empty());
    }

    #[test]
    fn same_date_without_overlap_splits_into_only_buckets() {
        let yours = vec![entry("2024-03-12", &[1], "A")];
        let theirs = vec![entry("2024-03-12", &[2], "B")];
        let result = reconcile(&yours, &theirs);

        assert!(result.same_dates.is_empty());
        assert_eq!(result.yours_only.len(), 1);
        assert_eq!(result.theirs_only.len(), 1);
    }

    #[test]
    fn all_overlapping_pairs_are_recorded() {
        let yours = vec![entry("2024-01-01", &[1, 2, 3, 4], "Combined")];
        let theirs = vec![
            entry("2024-01-01", &[1, 2], "First"),
            entry("2024-01-01", &[4], "Second"),
            entry("2024-01-01", &[9], "Elsewhere"),
        ];
        let result = reconcile(&yours, &theirs);

        assert_eq!(result.same_dates.len(), 2);
        assert_eq!(result.theirs_only.len(), 1);
        assert_eq!(result.theirs_only[0].header, "Elsewhere");
        assert!(result.yours_only.is_empty());
    }

    #[test]
    fn identical_entries_are_tracked_separately() {
        let yours = vec![
            entry("2024-01-01", &[5], "Dup"),
            entry("2024-01-01", &[5], "Dup"),
        ];
        let theirs = vec![entry("2024-01-01", &[6], "Other")];
        let result = reconcile(&yours, &theirs);

        assert_eq!(result.yours_only.len(), 2);
    }

    #[test]
    fn entries_without_pages_are_left_out() {
        let yours = vec![entry("2024-01-01", &[], "Empty")];
        let result = reconcile(&yours, &[]);
        assert_eq!(result, ReconciliationResult::default());
    }

    #[test]
    fn unknown_dates_reconcile_against_each_other() {
        let yours = vec![entry("UNKNOWN", &[77, 78], "Pharmacy")];
        let theirs = vec![entry("UNKNOWN", &[78], "Rx list")];
        let result = reconcile(&yours, &theirs);

        assert_eq!(result.same_dates.len(), 1);
        assert!(result.same_dates[0].date.is_unknown());
    }

    #[test]
    fn every_input_entry_is_accounted_for() {
        let yours = vec![
            entry("2024-01-01", &[1, 2], "A"),
            entry("2024-01-02", &[3], "B"),
            entry("2024-01-03", &[4], "C"),
        ];
        let theirs = vec![
            entry("2024-01-01", &[2], "A'"),
            entry("2024-01-03", &[40], "C'"),
            entry("2024-02-01", &[7], "D"),
        ];
        let result = reconcile(&yours, &theirs);

        let mut your_seen = result
            .yours_only
            .iter()
            .map(|entry| entry.header.clone())
            .chain(result.same_dates.iter().map(|m| m.your_header.clone()))
            .collect::<Vec<String>>();
        your_seen.sort();
        your_seen.dedup();
        assert_eq!(your_seen, vec!["A", "B", "C"]);

        let mut their_seen = result
            .theirs_only
            .iter()
            .map(|entry| entry.header.clone())
            .chain(result.same_dates.iter().map(|m| m.their_header.clone()))
            .collect::<Vec<String>>();
        their_seen.sort();
        their_seen.dedup();
        assert_eq!(their_seen, vec!["A'", "C'", "D"]);
    }

    #[test]
    fn reconciliation_round_trips_through_json() {
        let yours = vec![
            entry("2024-03-12", &[209, 210], "Valley Clinic"),
            entry("UNKNOWN", &[5], "Loose page"),
        ];
        let theirs = vec![
            entry("2024-03-12", &[209], "Valley"),
            entry("2023-01-01", &[1], "Intake"),
        ];
        let result = reconcile(&yours, &theirs);

        let json = serde_json::to_string_pretty(&result).expect("serialize");
        let restored: ReconciliationResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, result);
        assert!(json.contains("\"yours_only\""));
        assert!(json.contains("\"UNKNOWN\""));
    }
}
