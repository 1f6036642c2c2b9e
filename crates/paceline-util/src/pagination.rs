use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Query parameters for backward message pagination: a time cursor plus a
/// window size. `before` filters to strictly-earlier messages.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl HistoryParams {
    /// Effective window size: default 50, clamped to 1..=100.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(HistoryParams::default().limit(), 50);
        let high = HistoryParams {
            before: None,
            limit: Some(500),
        };
        assert_eq!(high.limit(), 100);
        let low = HistoryParams {
            before: None,
            limit: Some(0),
        };
        assert_eq!(low.limit(), 1);
        let neg = HistoryParams {
            before: None,
            limit: Some(-3),
        };
        assert_eq!(neg.limit(), 1);
    }
}
