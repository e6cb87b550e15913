//! Quality score heuristic.
//!
//! Starts from the strategy's confidence and nudges it by content size:
//! long artifacts up, very short ones down. Cache hits get a small bonus
//! on top of the stored score. Scores are clamped to `[0, 1]` and rounded
//! to two decimals. The adjustment is monotonic in both confidence and
//! content length.

/// Content longer than this (bytes) earns [`LONG_CONTENT_BONUS`].
pub const LONG_CONTENT_THRESHOLD: usize = 1000;
/// Content shorter than this (bytes) pays [`SHORT_CONTENT_PENALTY`].
pub const SHORT_CONTENT_THRESHOLD: usize = 100;
pub const LONG_CONTENT_BONUS: f64 = 0.1;
pub const SHORT_CONTENT_PENALTY: f64 = 0.2;
pub const CACHE_HIT_BONUS: f64 = 0.1;

/// Score a freshly generated artifact.
pub fn score(confidence: f64, content_len: usize) -> f64 {
    let adjustment = if content_len > LONG_CONTENT_THRESHOLD {
        LONG_CONTENT_BONUS
    } else if content_len < SHORT_CONTENT_THRESHOLD {
        -SHORT_CONTENT_PENALTY
    } else {
        0.0
    };
    finish(confidence + adjustment)
}

/// Apply the cache-hit bonus to a stored score.
pub fn with_cache_bonus(stored: f64) -> f64 {
    finish(stored + CACHE_HIT_BONUS)
}

fn finish(raw: f64) -> f64 {
    (raw.clamp(0.0, 1.0) * 100.0).round() / 100.0
}
