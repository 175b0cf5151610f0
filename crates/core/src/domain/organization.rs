use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::person::PersonId;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrganizationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Legal form of an organization, keyed by the tax treatment that drives disclosure rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    PublicCharity,
    PrivateFoundation,
    SocialWelfare,
    Political,
    TradeAssociation,
    ForProfit,
    Other,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicCharity => "public_charity",
            Self::PrivateFoundation => "private_foundation",
            Self::SocialWelfare => "social_welfare",
            Self::Political => "political",
            Self::TradeAssociation => "trade_association",
            Self::ForProfit => "for_profit",
            Self::Other => "other",
        }
    }

    /// Unknown labels map to `Other` rather than failing the record.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace(['-', ' ', '(', ')'], "_").as_str() {
            "public_charity" | "501c3" | "501_c__3_" | "charity" => Self::PublicCharity,
            "private_foundation" | "foundation" => Self::PrivateFoundation,
            "social_welfare" | "501c4" | "501_c__4_" => Self::SocialWelfare,
            "political" | "527" | "pac" => Self::Political,
            "trade_association" | "501c6" | "501_c__6_" => Self::TradeAssociation,
            "for_profit" | "forprofit" | "corporation" | "llc" => Self::ForProfit,
            _ => Self::Other,
        }
    }

    pub fn is_public_charity(&self) -> bool {
        matches!(self, Self::PublicCharity)
    }

    pub fn is_political_or_social_welfare(&self) -> bool {
        matches!(self, Self::SocialWelfare | Self::Political)
    }
}

/// Either an organization or a person; never both, never neither.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Owner {
    Organization(OrganizationId),
    Person(PersonId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipEdge {
    pub owner: Owner,
    pub percentage: Decimal,
    /// Display name of the owner, absent when the owner record could not be resolved.
    pub owner_name: Option<String>,
}

impl OwnershipEdge {
    pub fn is_majority(&self) -> bool {
        self.percentage > Decimal::from(50)
    }

    pub fn owner_label(&self) -> String {
        match (&self.owner_name, &self.owner) {
            (Some(name), _) => name.clone(),
            (None, Owner::Organization(id)) => id.0.clone(),
            (None, Owner::Person(id)) => id.0.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub id: OrganizationId,
    pub legal_name: String,
    pub entity_type: EntityType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub legal_name: String,
    pub entity_type: EntityType,
    pub parent_appoints_board: bool,
    /// Edges pointing from this organization to each of its owners.
    pub owners: Vec<OwnershipEdge>,
}

impl Organization {
    pub fn new(
        id: impl Into<String>,
        legal_name: impl Into<String>,
        entity_type: EntityType,
    ) -> Self {
        Self {
            id: OrganizationId(id.into()),
            legal_name: legal_name.into(),
            entity_type,
            parent_appoints_board: false,
            owners: Vec::new(),
        }
    }

    pub fn to_ref(&self) -> OrganizationRef {
        OrganizationRef {
            id: self.id.clone(),
            legal_name: self.legal_name.clone(),
            entity_type: self.entity_type,
        }
    }

    pub fn majority_owners(&self) -> impl Iterator<Item = &OwnershipEdge> {
        self.owners.iter().filter(|edge| edge.is_majority())
    }
}
