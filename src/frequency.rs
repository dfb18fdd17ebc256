use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One entry of a ranked breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCount {
    pub label: String,
    pub count: f64,
    pub percentage: f64,
}

/// Weighted tally that remembers the order labels were first seen in.
#[derive(Debug, Clone, Default)]
pub struct FrequencyCounter {
    order: Vec<String>,
    counts: HashMap<String, f64>,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, label: &str) {
        self.add(label, 1.0);
    }

    pub fn add(&mut self, label: &str, weight: f64) {
        match self.counts.get_mut(label) {
            Some(count) => *count += weight,
            None => {
                self.order.push(label.to_string());
                self.counts.insert(label.to_string(), weight);
            }
        }
    }

    pub fn get(&self, label: &str) -> f64 {
        self.counts.get(label).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.order.iter().map(|label| self.get(label)).sum()
    }

    pub fn distinct(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every label, highest count first; equal counts keep first-seen order.
    pub fn ranked(&self) -> Vec<RankedCount> {
        let total = self.total();
        self.order
            .iter()
            .map(|label| {
                let count = self.get(label);
                RankedCount {
                    label: label.clone(),
                    count,
                    percentage: percentage(count, total),
                }
            })
            .sorted_by(|a, b| b.count.total_cmp(&a.count))
            .collect()
    }

    /// The first `limit` entries of [`ranked`](Self::ranked); zero keeps all.
    pub fn top(&self, limit: usize) -> Vec<RankedCount> {
        let mut ranked = self.ranked();
        if limit > 0 && ranked.len() > limit {
            ranked.truncate(limit);
        }
        ranked
    }
}

/// `part / whole * 100`, with an empty whole giving 0 rather than NaN.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Encodes a breakdown as `label=count` pairs joined by `;`.
///
/// Backslashes, `;` and `=` inside a label are escaped with a backslash.
pub fn encode_breakdown(entries: &[RankedCount]) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{}={}",
                escape_label(&entry.label),
                crate::data::format_number(entry.count)
            )
        })
        .join(";")
}

/// Inverse of [`encode_breakdown`]; percentages are recomputed from the counts.
pub fn decode_breakdown(encoded: &str) -> Vec<RankedCount> {
    let pairs = split_unescaped(encoded, ';')
        .into_iter()
        .filter(|pair| !pair.trim().is_empty())
        .filter_map(|pair| {
            let fields = split_unescaped(pair, '=');
            let (count, label) = fields.split_last()?;
            if label.is_empty() {
                return None;
            }
            // An unescaped `=` inside a label splits it; the count is always last.
            let label = label.iter().map(|field| unescape(field)).join("=");
            Some((label, crate::data::parse_number(count)?))
        })
        .collect::<Vec<_>>();
    let total = pairs.iter().map(|(_, count)| count).sum::<f64>();
    pairs
        .into_iter()
        .map(|(label, count)| RankedCount {
            percentage: percentage(count, total),
            label,
            count,
        })
        .collect()
}

fn escape_label(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        if matches!(c, '\\' | ';' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Splits on `separator` where it is not preceded by an escaping backslash.
/// Escapes are left in the parts.
fn split_unescaped(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&text[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

fn unescape(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut escaped = false;
    for c in text.chars() {
        if !escaped && c == '\\' {
            escaped = true;
            continue;
        }
        escaped = false;
        plain.push(c);
    }
    plain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_breaks_ties_by_first_seen_order() {
        let mut counter = FrequencyCounter::new();
        for label in ["b", "a", "c", "a", "c", "d"] {
            counter.increment(label);
        }
        let labels = counter
            .ranked()
            .into_iter()
            .map(|entry| entry.label)
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["a", "c", "b", "d"]);
        assert_eq!(counter.top(2).len(), 2);
        assert_eq!(counter.top(0).len(), 4);
        assert_eq!(counter.distinct(), 4);
    }

    #[test]
    fn weighted_counts_and_percentages() {
        let mut counter = FrequencyCounter::new();
        counter.add("Stylists", 3.0);
        counter.add("Sound", 1.0);
        counter.add("Stylists", 0.0);
        let ranked = counter.ranked();
        assert_eq!(ranked[0].count, 3.0);
        assert_eq!(ranked[0].percentage, 75.0);
        assert_eq!(ranked[1].percentage, 25.0);
    }

    #[test]
    fn percentage_of_nothing_is_zero() {
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert!(FrequencyCounter::new().ranked().is_empty());
    }

    #[test]
    fn breakdown_encoding_survives_labels_with_equals() {
        let mut counter = FrequencyCounter::new();
        counter.add("Film & TV", 2.0);
        counter.add("a=b", 1.5);
        let encoded = encode_breakdown(&counter.ranked());
        assert_eq!(encoded, r"Film & TV=2;a\=b=1.5");
        let decoded = decode_breakdown(&encoded);
        assert_eq!(decoded, counter.ranked());
        assert!(decode_breakdown("").is_empty());
    }

    #[test]
    fn breakdown_encoding_escapes_separators_in_free_text_labels() {
        let mut counter = FrequencyCounter::new();
        counter.add("Film; TV", 2.0);
        counter.add("Music", 1.0);
        counter.add(r"C:\media=raw;", 1.0);
        let encoded = encode_breakdown(&counter.ranked());
        assert_eq!(encoded, r"Film\; TV=2;Music=1;C:\\media\=raw\;=1");
        assert_eq!(decode_breakdown(&encoded), counter.ranked());
    }

    #[test]
    fn unescaped_equals_in_a_label_still_decodes() {
        let decoded = decode_breakdown("a=b=1.5;Music=1");
        assert_eq!(decoded[0].label, "a=b");
        assert_eq!(decoded[0].count, 1.5);
        assert_eq!(decoded[1].label, "Music");
    }
}
