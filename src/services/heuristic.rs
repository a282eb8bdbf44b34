//! Offline keyword expansion.
//!
//! Variants are built from a fixed set of modifier templates and given
//! estimated metrics from their word count alone. Nothing here is random, so
//! the same topic and count always produce the same output.
//!
//! Estimates:
//!
//! - base volume by topic word count: 1 word 12 000, 2 words 5 000,
//!   3 words 2 000, longer 800
//! - variant volume: `base * 100 / (100 + 60 * extra_words)`, at least 100
//! - difficulty: `20 + min(volume / 100, 60) - 4 * (words - 1)`, clamped to 5..=80

use std::collections::HashSet;

use crate::models::{KeywordMetrics, Source, Topic};

pub const PREFIXES: [&str; 5] = ["best", "how to", "what is", "guide to", "tips for"];
pub const SUFFIXES: [&str; 5] = ["guide", "tips", "for beginners", "explained", "examples"];

pub const MIN_VOLUME: u64 = 100;
pub const MAX_VOLUME: u64 = 12_000;
pub const MIN_DIFFICULTY: u8 = 5;
pub const MAX_DIFFICULTY: u8 = 80;

pub const RELATED_PER_CANDIDATE: usize = 4;
const MIN_RELATED: usize = 3;
const MAX_RELATED: usize = 5;

/// Template expansions of `topic`, bare topic first, at least `min_len` long.
#[must_use]
pub fn variations(topic: &Topic, min_len: usize) -> Vec<String> {
    let t = topic.as_str();
    let usable = |modifier: &str| !contains_phrase(t, modifier);

    let mut ordered = vec![t.to_string()];
    ordered.extend(
        PREFIXES
            .iter()
            .filter(|p| usable(p))
            .map(|p| format!("{p} {t}")),
    );
    ordered.extend(
        SUFFIXES
            .iter()
            .filter(|s| usable(s))
            .map(|s| format!("{t} {s}")),
    );
    if usable("best") && usable("tips") {
        ordered.push(format!("best {t} tips"));
    }
    for prefix in PREFIXES.iter().filter(|p| usable(p)) {
        for suffix in SUFFIXES.iter().filter(|s| usable(s)) {
            ordered.push(format!("{prefix} {t} {suffix}"));
        }
    }

    let mut seen = HashSet::new();
    let mut out: Vec<String> = ordered
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect();

    let mut n = 1;
    while out.len() < min_len {
        let synthetic = format!("{t} idea {n}");
        if seen.insert(synthetic.clone()) {
            out.push(synthetic);
        }
        n += 1;
    }

    out
}

fn contains_phrase(haystack: &str, needle: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {needle} "))
}

#[must_use]
pub fn estimate_volume(topic: &Topic, phrase: &str) -> u64 {
    let topic_words = topic.word_count();
    let base: u64 = match topic_words {
        1 => 12_000,
        2 => 5_000,
        3 => 2_000,
        _ => 800,
    };

    let extra = word_count(phrase).saturating_sub(topic_words) as u64;
    (base * 100 / (100 + 60 * extra)).clamp(MIN_VOLUME, MAX_VOLUME)
}

#[must_use]
pub fn estimate_difficulty(volume: u64, phrase: &str) -> u8 {
    let volume_part = i64::try_from((volume / 100).min(60)).unwrap_or(60);
    let length_part = 4 * i64::try_from(word_count(phrase).saturating_sub(1)).unwrap_or(0);
    let raw = (20 + volume_part - length_part).clamp(
        i64::from(MIN_DIFFICULTY),
        i64::from(MAX_DIFFICULTY),
    );
    u8::try_from(raw).unwrap_or(MAX_DIFFICULTY)
}

fn word_count(phrase: &str) -> usize {
    phrase.split_whitespace().count()
}

/// Exactly `count` heuristic keywords for `topic`.
#[must_use]
pub fn generate(topic: &Topic, count: usize) -> Vec<KeywordMetrics> {
    let mut metrics: Vec<KeywordMetrics> = variations(topic, count)
        .into_iter()
        .take(count)
        .map(|phrase| {
            let search_volume = estimate_volume(topic, &phrase);
            KeywordMetrics {
                difficulty: estimate_difficulty(search_volume, &phrase),
                search_volume,
                phrase,
                relevance: None,
                related: Vec::new(),
                source: Source::Heuristic,
            }
        })
        .collect();

    fill_related(topic, &mut metrics);
    metrics
}

/// Tops up `related` on every entry that has fewer than three hints, drawing
/// on variants that are not themselves in the batch.
pub fn fill_related(topic: &Topic, batch: &mut [KeywordMetrics]) {
    let taken: HashSet<String> = batch.iter().map(|m| m.phrase.clone()).collect();
    let unused: Vec<String> = variations(topic, batch.len() + RELATED_PER_CANDIDATE)
        .into_iter()
        .filter(|v| !taken.contains(v))
        .collect();

    if unused.is_empty() {
        return;
    }

    for (i, entry) in batch.iter_mut().enumerate() {
        entry.related.truncate(MAX_RELATED);
        if entry.related.len() >= MIN_RELATED {
            continue;
        }

        let start = (i * RELATED_PER_CANDIDATE) % unused.len();
        for hint in unused.iter().cycle().skip(start).take(unused.len()) {
            if entry.related.len() >= RELATED_PER_CANDIDATE {
                break;
            }
            if !entry.related.contains(hint) {
                entry.related.push(hint.clone());
            }
        }
    }
}
