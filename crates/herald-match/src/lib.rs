//! Tag-overlap matching between news events and subscriber interests.
//!
//! A subscriber carries two independent tag sets. General tags express
//! broad interest and must cover most of an event's tags; specific tags
//! express narrow interest and need only cover a small share. Scores are
//! always measured against the event's tag count.
//!
//! Duplicates are never removed. A subscriber listing the same tag twice
//! counts it twice, and duplicate event tags enlarge the denominator.

use std::collections::HashSet;

/// Minimum general-tag overlap, in percent, for a match.
pub const GENERAL_THRESHOLD: f64 = 70.0;

/// Minimum specific-tag overlap, in percent, for a match.
pub const SPECIFIC_THRESHOLD: f64 = 20.0;

/// Percentage of `event_tags` covered by `user_tags`.
///
/// Computed as `100 * matched / event_tags.len()`, where `matched` counts
/// every entry of `user_tags` (with multiplicity) whose lowercase form
/// occurs among the lowercased event tags. Returns 0 for an empty event tag
/// list.
pub fn overlap_percent(event_tags: &[String], user_tags: &[String]) -> f64 {
    if event_tags.is_empty() {
        return 0.0;
    }

    let event_set: HashSet<String> = event_tags.iter().map(|t| t.to_lowercase()).collect();
    let matched = user_tags
        .iter()
        .filter(|t| event_set.contains(&t.to_lowercase()))
        .count();

    100.0 * matched as f64 / event_tags.len() as f64
}

/// Whether an event should be delivered to a subscriber.
///
/// True when general overlap reaches [`GENERAL_THRESHOLD`] or specific
/// overlap reaches [`SPECIFIC_THRESHOLD`]. An event without tags never
/// matches.
pub fn matches(event_tags: &[String], general_tags: &[String], specific_tags: &[String]) -> bool {
    if event_tags.is_empty() {
        return false;
    }

    overlap_percent(event_tags, general_tags) >= GENERAL_THRESHOLD
        || overlap_percent(event_tags, specific_tags) >= SPECIFIC_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// `n` distinct event tags named `t0..tn`.
    fn numbered(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("t{i}")).collect()
    }

    #[test]
    fn empty_event_tags_score_zero() {
        assert_eq!(overlap_percent(&[], &tags(&["a"])), 0.0);
    }

    #[test]
    fn empty_user_tags_score_zero() {
        assert_eq!(overlap_percent(&tags(&["a"]), &[]), 0.0);
    }

    #[test]
    fn overlap_is_case_insensitive() {
        let event = tags(&["Stocks", "FINANCE"]);
        assert_eq!(overlap_percent(&event, &tags(&["stocks", "Finance"])), 100.0);
    }

    #[test]
    fn overlap_does_not_trim() {
        assert_eq!(overlap_percent(&tags(&["stocks"]), &tags(&[" stocks"])), 0.0);
    }

    #[test]
    fn denominator_is_event_tag_count() {
        let event = tags(&["a", "b", "c", "d"]);
        // One of four event tags covered, regardless of how many user tags exist.
        assert_eq!(overlap_percent(&event, &tags(&["a", "x", "y", "z", "w"])), 25.0);
    }

    #[test]
    fn duplicate_user_tags_inflate_the_score() {
        // Intentional: duplicates are counted, so this exceeds 100%.
        let event = tags(&["a", "b"]);
        assert_eq!(overlap_percent(&event, &tags(&["a", "a", "A", "b"])), 200.0);
    }

    #[test]
    fn duplicate_event_tags_deflate_the_score() {
        // Intentional: the denominator keeps duplicates.
        let event = tags(&["a", "a", "a", "b"]);
        assert_eq!(overlap_percent(&event, &tags(&["b"])), 25.0);
    }

    #[test]
    fn empty_event_never_matches() {
        let everything = tags(&["a", "b"]);
        assert!(!matches(&[], &everything, &everything));
    }

    #[test]
    fn general_threshold_boundary() {
        let event = numbered(100);
        let none: Vec<String> = vec![];
        assert_eq!(overlap_percent(&event, &event[..70]), 70.0);
        assert!(matches(&event, &event[..70], &none));
        assert_eq!(overlap_percent(&event, &event[..69]), 69.0);
        assert!(!matches(&event, &event[..69], &none));
    }

    #[test]
    fn specific_threshold_boundary() {
        let event = numbered(100);
        let none: Vec<String> = vec![];
        assert!(matches(&event, &none, &event[..20]));
        assert!(!matches(&event, &none, &event[..19]));
    }

    #[test]
    fn small_list_boundaries() {
        let event = numbered(10);
        assert!(matches(&event, &event[..7], &[]));
        assert!(!matches(&event, &event[..6], &[]));

        let event = numbered(5);
        assert!(matches(&event, &[], &event[..1]));
    }

    #[test]
    fn either_set_is_sufficient() {
        let event = tags(&["stocks", "finance"]);
        assert!(matches(&event, &tags(&["stocks", "finance"]), &[]));
        assert!(matches(&event, &[], &tags(&["finance"])));
        assert!(!matches(&event, &tags(&["sports"]), &tags(&["sports"])));
    }

    #[test]
    fn general_overlap_below_threshold_can_still_match_specific() {
        let event = tags(&["a", "b", "c"]);
        // General: 33%. Specific: 33%.
        assert!(matches(&event, &tags(&["a"]), &tags(&["b"])));
    }
}
