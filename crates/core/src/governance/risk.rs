use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::organization::OrganizationId;
use crate::domain::person::PersonId;

/// Identity of a risk flag, derived only from the rule and the implicated ids so
/// that two runs over equivalent data produce the same identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskId(pub String);

impl RiskId {
    pub fn for_rule(rule: &str, parts: &[&str]) -> Self {
        let mut id = rule.to_string();
        for part in parts {
            id.push(':');
            id.push_str(part);
        }
        Self(id)
    }
}

impl fmt::Display for RiskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskType {
    Control,
    ScheduleR,
    Conflict,
    Independence,
}

impl RiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "CONTROL",
            Self::ScheduleR => "SCHEDULE_R",
            Self::Conflict => "CONFLICT",
            Self::Independence => "INDEPENDENCE",
        }
    }
}

/// Ordered most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskSeverity {
    High,
    Medium,
    Low,
    Info,
}

impl RiskSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Info => "INFO",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlag {
    pub id: RiskId,
    pub risk_type: RiskType,
    pub severity: RiskSeverity,
    pub message: String,
    pub details: String,
    pub organization_ids: Vec<OrganizationId>,
    pub person_id: Option<PersonId>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl RiskSummary {
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = &'a RiskFlag>) -> Self {
        let mut summary = Self::default();
        for flag in flags {
            match flag.severity {
                RiskSeverity::High => summary.high += 1,
                RiskSeverity::Medium => summary.medium += 1,
                RiskSeverity::Low => summary.low += 1,
                RiskSeverity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Append-only collection that keeps the first flag recorded for each identifier.
#[derive(Debug, Default)]
pub struct RiskLedger {
    seen: BTreeSet<RiskId>,
    flags: Vec<RiskFlag>,
}

impl RiskLedger {
    pub fn push(&mut self, flag: RiskFlag) -> bool {
        if !self.seen.insert(flag.id.clone()) {
            return false;
        }
        self.flags.push(flag);
        true
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Most severe first, ties broken by identifier.
    pub fn into_ranked(mut self) -> Vec<RiskFlag> {
        self.flags.sort_by(|left, right| {
            left.severity.cmp(&right.severity).then_with(|| left.id.cmp(&right.id))
        });
        self.flags
    }
}
