use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::organization::OrganizationRef;
use crate::domain::person::Person;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatId(pub String);

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleCategory {
    #[default]
    Director,
    Trustee,
    Officer,
    KeyEmployee,
}

impl RoleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Director => "director",
            Self::Trustee => "trustee",
            Self::Officer => "officer",
            Self::KeyEmployee => "key_employee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "director" => Some(Self::Director),
            "trustee" => Some(Self::Trustee),
            "officer" => Some(Self::Officer),
            "key_employee" => Some(Self::KeyEmployee),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Director => "Director",
            Self::Trustee => "Trustee",
            Self::Officer => "Officer",
            Self::KeyEmployee => "Key Employee",
        }
    }

    pub fn is_board_member(&self) -> bool {
        matches!(self, Self::Director | Self::Trustee)
    }
}

/// Closed date interval; a missing start is the beginning of time, a missing end is open-ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenure {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Tenure {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, DomainError> {
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(DomainError::InvertedTenure { start, end });
            }
        }
        Ok(Self { start, end })
    }

    pub fn open_ended(start: NaiveDate) -> Self {
        Self { start: Some(start), end: None }
    }

    /// Intervals intersect iff max(start1, start2) <= min(end1, end2).
    pub fn overlaps(&self, other: &Tenure) -> bool {
        let latest_start = match (self.start, other.start) {
            (Some(left), Some(right)) => Some(left.max(right)),
            (left, right) => left.or(right),
        };
        let earliest_end = match (self.end, other.end) {
            (Some(left), Some(right)) => Some(left.min(right)),
            (left, right) => left.or(right),
        };

        match (latest_start, earliest_end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    pub fn is_current(&self, as_of: NaiveDate) -> bool {
        self.end.map_or(true, |end| end > as_of)
    }

    pub fn intersects_window(&self, window: &DateWindow) -> bool {
        self.overlaps(&Tenure { start: window.from, end: window.to })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, DomainError> {
        let window = Self { from, to };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(DomainError::InvertedWindow { from, to }),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSeat {
    pub id: SeatId,
    pub person: Person,
    pub organization: OrganizationRef,
    pub category: RoleCategory,
    pub title: String,
    pub tenure: Tenure,
    pub voting_rights: bool,
    pub compensated: bool,
}

impl BoardSeat {
    pub fn is_current(&self, as_of: NaiveDate) -> bool {
        self.tenure.is_current(as_of)
    }

    pub fn is_voting_board_member(&self) -> bool {
        self.voting_rights && self.category.is_board_member()
    }
}
