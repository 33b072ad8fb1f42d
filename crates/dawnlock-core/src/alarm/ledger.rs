use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record of the last alarm cycle, read back on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmLedger {
    #[serde(default)]
    pub last_fired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_disabled_at: Option<DateTime<Utc>>,
    /// Pending re-ring of a snoozed cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<DateTime<Utc>>,
}

impl AlarmLedger {
    /// A fire with no disable after it: the process died mid-cycle.
    pub fn unfinished_fire(&self) -> Option<DateTime<Utc>> {
        let fired = self.last_fired_at?;
        match self.last_disabled_at {
            Some(disabled) if disabled >= fired => None,
            _ => Some(fired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn unfinished_fire_needs_no_later_disable() {
        let fired = Utc::now();
        let mut ledger = AlarmLedger {
            last_fired_at: Some(fired),
            ..Default::default()
        };
        assert_eq!(ledger.unfinished_fire(), Some(fired));

        ledger.last_disabled_at = Some(fired - Duration::days(1));
        assert_eq!(ledger.unfinished_fire(), Some(fired));

        ledger.last_disabled_at = Some(fired + Duration::minutes(2));
        assert_eq!(ledger.unfinished_fire(), None);

        assert_eq!(AlarmLedger::default().unfinished_fire(), None);
    }
}
