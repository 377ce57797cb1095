use serde::{Deserialize, Serialize};

/// A gap in the monitor's own liveness, inferred from a stale heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interruption {
    pub from_ms: i64,
    pub to_ms: i64,
    pub duration_ms: i64,
}

impl Interruption {
    /// Returns an interruption when the gap strictly exceeds `threshold_ms`.
    pub fn detect(last_seen_ms: i64, now_ms: i64, threshold_ms: i64) -> Option<Self> {
        let gap = now_ms - last_seen_ms;
        if gap > threshold_ms {
            Some(Self {
                from_ms: last_seen_ms,
                to_ms: now_ms,
                duration_ms: gap,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MINUTES_MS: i64 = 5 * 60 * 1000;

    #[test]
    fn gap_above_threshold_is_an_interruption() {
        let last_seen = 1_700_000_000_000;

        let interruption = Interruption::detect(last_seen, last_seen + 301_000, FIVE_MINUTES_MS);

        assert_eq!(
            interruption,
            Some(Interruption {
                from_ms: last_seen,
                to_ms: last_seen + 301_000,
                duration_ms: 301_000,
            })
        );
    }

    #[test]
    fn gap_below_threshold_is_ignored() {
        let last_seen = 1_700_000_000_000;

        assert!(Interruption::detect(last_seen, last_seen + 299_000, FIVE_MINUTES_MS).is_none());
    }

    #[test]
    fn gap_equal_to_threshold_is_ignored() {
        assert!(Interruption::detect(0, FIVE_MINUTES_MS, FIVE_MINUTES_MS).is_none());
    }
}
