//! Batch summaries grouped by an identifier key.
//!
//! Profile exports are named after the cartridge row they were taken from.
//! The first standalone three-digit number in the name carries the row, and
//! its first digit (1 to 4) identifies the group (`"Row 312 Profile.txt"` →
//! group `"3"`). Digits inside words or longer numbers do not count.

use crate::error::ProfileError;
use crate::pipeline::BatchEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key assigned to ids that do not match the grouping rule.
pub const UNGROUPED: &str = "ungrouped";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// First digit of the first standalone three-digit number in the id.
    #[default]
    FirstDigit,
    /// One group holding every profile.
    None,
}

/// Leading digits of the rows that form groups.
const GROUP_DIGITS: std::ops::RangeInclusive<char> = '1'..='4';

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// First run of exactly three ASCII digits bounded by non-word characters.
fn standalone_triplet(id: &str) -> Option<[char; 3]> {
    let chars: Vec<char> = id.chars().collect();
    (0..chars.len().saturating_sub(2)).find_map(|i| {
        let digits = [chars[i], chars[i + 1], chars[i + 2]];
        let bounded_left = i == 0 || !is_word_char(chars[i - 1]);
        let bounded_right = chars.get(i + 3).map_or(true, |&c| !is_word_char(c));
        (digits.iter().all(char::is_ascii_digit) && bounded_left && bounded_right)
            .then_some(digits)
    })
}

pub fn group_key(id: &str, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::None => "all".to_string(),
        GroupBy::FirstDigit => standalone_triplet(id)
            .map(|[first, ..]| first)
            .filter(|first| GROUP_DIGITS.contains(first))
            .map_or_else(|| UNGROUPED.to_string(), |first| first.to_string()),
    }
}

/// Means over the successful profiles of one group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub profiles: usize,
    pub failures: usize,
    pub mean_ratio: Option<f64>,
    pub mean_inner_distance: Option<f64>,
    pub mean_outer_distance: Option<f64>,
    /// Mean over the profiles that carry a positioning offset.
    pub mean_positioning_offset: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchReport {
    pub groups: Vec<GroupSummary>,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ProfileError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (e.id.as_str(), err)))
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Group `entries` and compute per-group means; groups are sorted by key.
pub fn summarize(entries: Vec<BatchEntry>, group_by: GroupBy) -> BatchReport {
    let mut grouped: BTreeMap<String, Vec<&BatchEntry>> = BTreeMap::new();
    for entry in &entries {
        grouped
            .entry(group_key(&entry.id, group_by))
            .or_default()
            .push(entry);
    }

    let groups = grouped
        .into_iter()
        .map(|(key, members)| {
            let ok: Vec<_> = members
                .iter()
                .filter_map(|e| e.result.as_ref().ok())
                .collect();
            GroupSummary {
                key,
                profiles: members.len(),
                failures: members.len() - ok.len(),
                mean_ratio: mean(ok.iter().map(|r| r.ratio)),
                mean_inner_distance: mean(ok.iter().map(|r| r.inner_distance)),
                mean_outer_distance: mean(ok.iter().map(|r| r.outer_distance)),
                mean_positioning_offset: mean(
                    ok.iter().filter_map(|r| r.placement.positioning_offset),
                ),
            }
        })
        .collect();

    BatchReport { groups, entries }
}
