//! Per-actor and per-gang cooldown tracking.
//!
//! Actor cooldowns live in a fixed enum-keyed table on the member record. The
//! raid cooldown is gang-wide and reads `base.last_raid_at` instead.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::clock::Timestamp;
use crate::constants::{
    KIDNAP_COOLDOWN_SECS, RAID_COOLDOWN_SECS, REPAIR_COOLDOWN_SECS, ROB_COOLDOWN_SECS,
};

/// Repeatable actions gated by a cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Raid,
    Rob,
    Kidnap,
    Repair,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raid => "raid",
            Self::Rob => "rob",
            Self::Kidnap => "kidnap",
            Self::Repair => "repair",
        }
    }

    /// Window length in seconds.
    #[must_use]
    pub const fn window_secs(self) -> i64 {
        match self {
            Self::Raid => RAID_COOLDOWN_SECS,
            Self::Rob => ROB_COOLDOWN_SECS,
            Self::Kidnap => KIDNAP_COOLDOWN_SECS,
            Self::Repair => REPAIR_COOLDOWN_SECS,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seconds left before `action` may run again, if it is still blocked.
#[must_use]
pub fn remaining(action: Action, last: Option<Timestamp>, now: Timestamp) -> Option<i64> {
    let last = last?;
    let elapsed = now.saturating_sub(last);
    let window = action.window_secs();
    (elapsed < window).then(|| window - elapsed)
}

/// Last-use timestamps for the per-actor actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownTable {
    #[serde(default)]
    pub rob: Option<Timestamp>,
    #[serde(default)]
    pub kidnap: Option<Timestamp>,
    #[serde(default)]
    pub repair: Option<Timestamp>,
}

impl CooldownTable {
    #[must_use]
    pub const fn last(&self, action: Action) -> Option<Timestamp> {
        match action {
            Action::Rob => self.rob,
            Action::Kidnap => self.kidnap,
            Action::Repair => self.repair,
            Action::Raid => None,
        }
    }

    /// Record a use. Raid is gang-scoped and ignored here.
    pub const fn stamp(&mut self, action: Action, now: Timestamp) {
        match action {
            Action::Rob => self.rob = Some(now),
            Action::Kidnap => self.kidnap = Some(now),
            Action::Repair => self.repair = Some(now),
            Action::Raid => {}
        }
    }

    #[must_use]
    pub fn remaining(&self, action: Action, now: Timestamp) -> Option<i64> {
        remaining(action, self.last(action), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_action_is_ready() {
        let table = CooldownTable::default();
        assert_eq!(table.remaining(Action::Rob, 100), None);
    }

    #[test]
    fn window_blocks_until_elapsed() {
        let mut table = CooldownTable::default();
        table.stamp(Action::Rob, 1_000);
        assert_eq!(table.remaining(Action::Rob, 1_000), Some(30));
        assert_eq!(table.remaining(Action::Rob, 1_029), Some(1));
        assert_eq!(table.remaining(Action::Rob, 1_030), None);
        assert_eq!(table.remaining(Action::Kidnap, 1_000), None);
    }

    #[test]
    fn kidnap_and_repair_windows_differ() {
        let mut table = CooldownTable::default();
        table.stamp(Action::Kidnap, 0);
        table.stamp(Action::Repair, 0);
        assert_eq!(table.remaining(Action::Kidnap, 299), Some(1));
        assert_eq!(table.remaining(Action::Repair, 299), Some(301));
    }

    #[test]
    fn raid_is_not_tracked_per_actor() {
        let mut table = CooldownTable::default();
        table.stamp(Action::Raid, 10);
        assert_eq!(table.last(Action::Raid), None);
        assert_eq!(remaining(Action::Raid, Some(10), 40), Some(30));
        assert_eq!(remaining(Action::Raid, Some(10), 70), None);
    }
}
