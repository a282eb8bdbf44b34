//! Relevance scoring and result ordering.
//!
//! `relevance = 0.6 * overlap + 0.2 * volume_band + 0.2 * (100 - difficulty)`,
//! rounded, where `overlap` is the word-set Jaccard index between candidate
//! and topic scaled to 0-100. The volume band favours moderate volumes:
//!
//! | volume            | band |
//! |-------------------|-----:|
//! | 0                 |    0 |
//! | 1 - 99            |   30 |
//! | 100 - 999         |   60 |
//! | 1 000 - 10 000    |  100 |
//! | 10 001 - 100 000  |   70 |
//! | above 100 000     |   40 |

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::keyword::normalize;
use crate::models::{KeywordCandidate, KeywordMetrics, Topic};

pub const OVERLAP_WEIGHT: f64 = 0.6;
pub const VOLUME_WEIGHT: f64 = 0.2;
pub const EASE_WEIGHT: f64 = 0.2;

/// Word-set Jaccard index in `0.0..=1.0`.
#[must_use]
pub fn lexical_overlap(phrase: &str, topic: &Topic) -> f64 {
    let normalized = normalize(phrase);
    let words: HashSet<&str> = normalized.split_whitespace().collect();
    let topic_words = topic.words();

    let union = words.union(&topic_words).count();
    if union == 0 {
        return 0.0;
    }
    let shared = words.intersection(&topic_words).count();

    #[allow(clippy::cast_precision_loss)]
    let ratio = shared as f64 / union as f64;
    ratio
}

#[must_use]
pub const fn volume_band(volume: u64) -> u8 {
    match volume {
        0 => 0,
        1..=99 => 30,
        100..=999 => 60,
        1_000..=10_000 => 100,
        10_001..=100_000 => 70,
        _ => 40,
    }
}

#[must_use]
pub fn relevance(phrase: &str, search_volume: u64, difficulty: u8, topic: &Topic) -> u8 {
    let overlap = lexical_overlap(phrase, topic) * 100.0;
    let band = f64::from(volume_band(search_volume));
    let ease = f64::from(100 - difficulty.min(100));

    let score = (OVERLAP_WEIGHT * overlap + VOLUME_WEIGHT * band + EASE_WEIGHT * ease)
        .round()
        .clamp(0.0, 100.0);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = score as u8;
    score
}

/// Descending relevance, then descending volume, then ascending difficulty.
/// Phrase order settles anything left so the output is total.
#[must_use]
pub fn rank_order(a: &KeywordCandidate, b: &KeywordCandidate) -> Ordering {
    b.relevance
        .cmp(&a.relevance)
        .then_with(|| b.search_volume.cmp(&a.search_volume))
        .then_with(|| a.difficulty.cmp(&b.difficulty))
        .then_with(|| a.phrase.cmp(&b.phrase))
}

/// Scores anything without an explicit relevance, drops repeated phrases
/// (first occurrence wins) and sorts by [`rank_order`].
#[must_use]
pub fn score_and_rank(batch: Vec<KeywordMetrics>, topic: &Topic) -> Vec<KeywordCandidate> {
    let mut seen = HashSet::new();

    let mut ranked: Vec<KeywordCandidate> = batch
        .into_iter()
        .filter(|m| seen.insert(normalize(&m.phrase)))
        .map(|m| {
            let difficulty = m.difficulty.min(100);
            let relevance = m.relevance.map_or_else(
                || relevance(&m.phrase, m.search_volume, difficulty, topic),
                |r| r.min(100),
            );
            KeywordCandidate {
                phrase: m.phrase,
                search_volume: m.search_volume,
                difficulty,
                relevance,
                related: m.related,
                source: m.source,
            }
        })
        .collect();

    ranked.sort_by(rank_order);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use crate::services::heuristic;

    fn topic(raw: &str) -> Topic {
        Topic::parse(raw).unwrap()
    }

    fn metrics(phrase: &str, volume: u64, difficulty: u8, relevance: Option<u8>) -> KeywordMetrics {
        KeywordMetrics {
            phrase: phrase.to_string(),
            search_volume: volume,
            difficulty,
            relevance,
            related: Vec::new(),
            source: Source::Provider,
        }
    }

    fn assert_ordered(ranked: &[KeywordCandidate]) {
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.relevance >= b.relevance);
            if a.relevance == b.relevance {
                assert!(a.search_volume >= b.search_volume);
                if a.search_volume == b.search_volume {
                    assert!(a.difficulty <= b.difficulty);
                }
            }
        }
    }

    #[test]
    fn test_lexical_overlap() {
        let t = topic("email marketing");
        assert!((lexical_overlap("Email Marketing", &t) - 1.0).abs() < f64::EPSILON);
        assert!((lexical_overlap("best email marketing", &t) - 2.0 / 3.0).abs() < 1e-9);
        assert!(lexical_overlap("cold outreach", &t).abs() < f64::EPSILON);
    }

    #[test]
    fn test_volume_band_prefers_moderate() {
        assert_eq!(volume_band(0), 0);
        assert_eq!(volume_band(50), 30);
        assert_eq!(volume_band(500), 60);
        assert_eq!(volume_band(5_000), 100);
        assert_eq!(volume_band(50_000), 70);
        assert_eq!(volume_band(5_000_000), 40);
    }

    #[test]
    fn test_documented_relevance_values() {
        let t = topic("email marketing");
        // 0.6 * 100 + 0.2 * 100 + 0.2 * 34
        assert_eq!(relevance("email marketing", 5_000, 66, &t), 87);
        // 0.6 * 66.7 + 0.2 * 100 + 0.2 * 57
        assert_eq!(relevance("best email marketing", 3_125, 43, &t), 71);
        // 0.6 * 50 + 0.2 * 100 + 0.2 * 70
        assert_eq!(relevance("how to email marketing", 2_272, 30, &t), 64);
        assert_eq!(relevance("unrelated", 0, 100, &t), 0);
    }

    #[test]
    fn test_difficulty_lowers_relevance() {
        let t = topic("seo");
        assert!(relevance("seo", 5_000, 20, &t) > relevance("seo", 5_000, 90, &t));
    }

    #[test]
    fn test_explicit_relevance_is_kept() {
        let ranked = score_and_rank(vec![metrics("seo", 10, 99, Some(150))], &topic("seo"));
        assert_eq!(ranked[0].relevance, 100);
    }

    #[test]
    fn test_tie_breaks() {
        let t = topic("seo");
        let ranked = score_and_rank(
            vec![
                metrics("c", 100, 50, Some(70)),
                metrics("b", 500, 60, Some(70)),
                metrics("a", 500, 40, Some(70)),
                metrics("d", 1, 1, Some(90)),
            ],
            &t,
        );

        let order: Vec<_> = ranked.iter().map(|c| c.phrase.as_str()).collect();
        assert_eq!(order, vec!["d", "a", "b", "c"]);
        assert_ordered(&ranked);
    }

    #[test]
    fn test_duplicate_phrases_are_dropped() {
        let ranked = score_and_rank(
            vec![
                metrics("seo tools", 900, 30, None),
                metrics("SEO  Tools", 100, 10, None),
            ],
            &topic("seo"),
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].search_volume, 900);
    }

    #[test]
    fn test_heuristic_batch_puts_bare_topic_first() {
        for raw in ["email marketing", "seo", "healthy boundaries for empaths"] {
            let t = topic(raw);
            let ranked = score_and_rank(heuristic::generate(&t, 15), &t);
            assert_eq!(ranked[0].phrase, t.as_str());
            assert_ordered(&ranked);
        }
    }
}
