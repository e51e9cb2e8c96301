//! Inline layer-name tags.
//!
//! Animatic panels take their initial length and blend mode from the name of
//! their source layer:
//! - `(500ms)`: a duration in milliseconds. Spaces are allowed around the number
//!   and the unit is case-insensitive. The first valid tag in the name wins.
//! - `(combine)` / `(replace)`: whether the panel is drawn over the previous
//!   one. The tag must close the name and is case-sensitive.

use crate::config::DEFAULT_PANEL_DURATION;

const COMBINE_TAG: &str = "(combine)";

/// Frame count for a layer name at the given framerate.
/// Names without a duration tag get the default panel length.
pub fn parse_ms_tag(name: &str, framerate: f64) -> usize {
    let bytes = name.as_bytes();
    (0..bytes.len())
        .find_map(|start| ms_tag_at(&bytes[start..]))
        .map(|ms| (framerate * ms as f64 / 1000.0).round().max(0.0) as usize)
        .unwrap_or(DEFAULT_PANEL_DURATION)
}

/// Whether a layer name asks its panel to be combined with the previous one.
/// Only a trailing `(combine)` counts; `(replace)` is never inspected, it is
/// simply the absence of that suffix.
pub fn parse_combine_tag(name: &str) -> bool {
    name.ends_with(COMBINE_TAG)
}

/// Milliseconds of a duration tag starting exactly at the beginning of `s`.
fn ms_tag_at(s: &[u8]) -> Option<u64> {
    let mut i = 0;
    if s.first() != Some(&b'(') {
        return None;
    }
    i += 1;
    i += count_spaces(&s[i..]);

    let digits = s[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let ms = s[i..i + digits].iter().fold(0u64, |acc, d| {
        acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
    });
    i += digits;
    i += count_spaces(&s[i..]);

    if !s[i..].get(..2)?.eq_ignore_ascii_case(b"ms") {
        return None;
    }
    i += 2;
    i += count_spaces(&s[i..]);

    (s.get(i) == Some(&b')')).then_some(ms)
}

#[inline]
fn count_spaces(s: &[u8]) -> usize {
    s.iter().take_while(|b| **b == b' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_tag_converts_at_framerate() {
        assert_eq!(parse_ms_tag("Background (2000ms)", 24.0), 48);
        assert_eq!(parse_ms_tag("A (500ms)", 24.0), 12);
        assert_eq!(parse_ms_tag("x( 250 MS )", 24.0), 6);
        assert_eq!(parse_ms_tag("x(250Ms)", 10.0), 3);
    }

    #[test]
    fn duration_rounds_to_nearest_frame() {
        // 24 * 0.1 = 2.4, 24 * 0.15 = 3.6
        assert_eq!(parse_ms_tag("(100ms)", 24.0), 2);
        assert_eq!(parse_ms_tag("(150ms)", 24.0), 4);
    }

    #[test]
    fn first_valid_duration_tag_wins() {
        assert_eq!(parse_ms_tag("(1000ms) (2000ms)", 24.0), 24);
        assert_eq!(parse_ms_tag("(ms) (x1ms) (1000ms)", 24.0), 24);
    }

    #[test]
    fn malformed_duration_tags_fall_back() {
        for name in ["Layer", "(ms)", "(12)", "(12 m s)", "(12ms", "12ms)", "(1 2ms)", ""] {
            assert_eq!(
                parse_ms_tag(name, 24.0),
                DEFAULT_PANEL_DURATION,
                "name {name:?}"
            );
        }
    }

    #[test]
    fn combine_tag_must_close_the_name() {
        assert!(parse_combine_tag("(combine)"));
        assert!(parse_combine_tag("B(combine)"));
        assert!(!parse_combine_tag("B(replace)"));
        assert!(!parse_combine_tag("(combine)(replace)"));
        assert!(!parse_combine_tag("(combine) B"));
        assert!(!parse_combine_tag("B(Combine)"));
        assert!(!parse_combine_tag("C"));
    }

    #[test]
    fn tags_coexist() {
        let name = "Panel (500ms)(combine)";
        assert_eq!(parse_ms_tag(name, 24.0), 12);
        assert!(parse_combine_tag(name));
    }
}
