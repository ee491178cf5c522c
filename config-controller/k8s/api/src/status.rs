use crate::{Condition, Time};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only condition recorded on a config resource.
pub const SYNCED: &str = "Synced";

/// Reports whether a resource's last reconciliation reached the remote store.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_time: Option<Time>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

// === impl ConfigStatus ===

impl ConfigStatus {
    pub fn synced(&self) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == SYNCED)
    }

    /// The status of the synced condition, unknown until one is recorded.
    pub fn synced_status(&self) -> ConditionStatus {
        self.synced()
            .map(|c| ConditionStatus::parse(&c.status))
            .unwrap_or(ConditionStatus::Unknown)
    }

    /// Replaces the synced condition.
    pub fn set_synced(
        &mut self,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: Time,
    ) {
        self.conditions = vec![Condition {
            type_: SYNCED.to_string(),
            status: status.to_string(),
            reason: reason.into(),
            message: message.into(),
            observed_generation: None,
            last_transition_time: now,
        }];
    }
}

// === impl ConditionStatus ===

impl ConditionStatus {
    fn parse(s: &str) -> Self {
        match s {
            "True" => Self::True,
            "False" => Self::False,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(ts: &str) -> Time {
        serde_json::from_value(serde_json::json!(ts)).unwrap()
    }

    #[test]
    fn absent_condition_is_unknown() {
        assert_eq!(
            ConfigStatus::default().synced_status(),
            ConditionStatus::Unknown
        );
    }

    #[test]
    fn set_synced_replaces_the_condition() {
        let mut status = ConfigStatus::default();
        status.set_synced(
            ConditionStatus::False,
            "ConsulAgentError",
            "boom",
            time("2024-01-01T00:00:00Z"),
        );
        status.set_synced(
            ConditionStatus::True,
            "",
            "",
            time("2024-01-01T00:01:00Z"),
        );
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(status.synced_status(), ConditionStatus::True);
        let cond = status.synced().unwrap();
        assert_eq!(cond.reason, "");
        assert_eq!(cond.last_transition_time, time("2024-01-01T00:01:00Z"));
    }

    #[test]
    fn serializes_camel_case() {
        let mut status = ConfigStatus {
            last_synced_time: Some(time("2024-01-01T00:00:00Z")),
            ..ConfigStatus::default()
        };
        status.set_synced(
            ConditionStatus::Unknown,
            "",
            "",
            time("2024-01-01T00:00:00Z"),
        );
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["lastSyncedTime"], "2024-01-01T00:00:00Z");
        assert_eq!(json["conditions"][0]["type"], "Synced");
        assert_eq!(json["conditions"][0]["status"], "Unknown");
    }
}
