//! SQLite-backed governance store.
//!
//! Reads use LEFT JOINs so a seat or ownership edge whose referenced record is gone comes
//! back with the nested record absent instead of vanishing inside the join. Rows that cannot
//! be decoded are skipped with a warning; one bad row never fails the whole fetch.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use tracing::warn;

use boardwatch_core::domain::organization::{
    EntityType, Organization, OrganizationId, OrganizationRef, Owner, OwnershipEdge,
};
use boardwatch_core::domain::person::{Person, PersonId};
use boardwatch_core::domain::relationship::{PersonRelationship, RelationshipCategory};
use boardwatch_core::domain::seat::{RoleCategory, SeatId, Tenure};
use boardwatch_core::governance::source::{GovernanceSource, SeatRecord, SourceError};

use super::{relationship_key, GovernanceRepository, RepositoryError};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SEAT_SELECT: &str = r#"
    SELECT
        s.id, s.person_id, s.entity_id, s.role_category, s.title,
        s.start_date, s.end_date, s.voting_rights, s.compensated,
        p.id AS joined_person_id, p.first_name, p.last_name,
        o.id AS joined_entity_id, o.legal_name, o.entity_type
    FROM board_seat s
    LEFT JOIN person p ON p.id = s.person_id
    LEFT JOIN organization o ON o.id = s.entity_id
"#;

const ORGANIZATION_SELECT: &str =
    "SELECT id, legal_name, entity_type, parent_appoints_board FROM organization";

const OWNER_SELECT: &str = r#"
    SELECT
        eo.id, eo.entity_id, eo.owner_entity_id, eo.owner_person_id, eo.percentage,
        oe.legal_name AS owner_entity_name,
        op.id AS joined_owner_person_id,
        op.first_name AS owner_first_name,
        op.last_name AS owner_last_name
    FROM entity_owner eo
    LEFT JOIN organization oe ON oe.id = eo.owner_entity_id
    LEFT JOIN person op ON op.id = eo.owner_person_id
"#;

pub struct SqlGovernanceRepository {
    pool: DbPool,
}

impl SqlGovernanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn list_seats(&self) -> Result<Vec<SeatRecord>, RepositoryError> {
        let rows = sqlx::query(&format!("{SEAT_SELECT} ORDER BY s.id"))
            .fetch_all(&self.pool)
            .await?;

        collect_decoded("board_seat", rows, seat_from_row)
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>, RepositoryError> {
        let rows = sqlx::query(&format!("{ORGANIZATION_SELECT} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        let owner_rows = sqlx::query(&format!("{OWNER_SELECT} ORDER BY eo.entity_id, eo.id"))
            .fetch_all(&self.pool)
            .await?;

        let mut owners_by_entity: HashMap<String, Vec<OwnershipEdge>> = HashMap::new();
        for (entity_id, edge) in collect_decoded("entity_owner", owner_rows, owner_from_row)?
            .into_iter()
            .flatten()
        {
            owners_by_entity.entry(entity_id).or_default().push(edge);
        }

        let mut organizations = collect_decoded("organization", rows, organization_from_row)?;
        for organization in &mut organizations {
            organization.owners = owners_by_entity.remove(&organization.id.0).unwrap_or_default();
        }
        Ok(organizations)
    }

    pub async fn list_relationships(&self) -> Result<Vec<PersonRelationship>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, person1_id, person2_id, category, details
             FROM person_relationship
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        collect_decoded("person_relationship", rows, relationship_from_row)
    }

    pub async fn find_person(&self, id: &PersonId) -> Result<Option<Person>, RepositoryError> {
        let row = sqlx::query("SELECT id, first_name, last_name FROM person WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| person_from_row(&row)).transpose()
    }

    pub async fn find_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query(&format!("{ORGANIZATION_SELECT} WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut organization = organization_from_row(&row)?;
        let owner_rows =
            sqlx::query(&format!("{OWNER_SELECT} WHERE eo.entity_id = ? ORDER BY eo.id"))
                .bind(&id.0)
                .fetch_all(&self.pool)
                .await?;
        organization.owners = collect_decoded("entity_owner", owner_rows, owner_from_row)?
            .into_iter()
            .flatten()
            .map(|(_, edge)| edge)
            .collect();

        Ok(Some(organization))
    }
}

#[async_trait]
impl GovernanceSource for SqlGovernanceRepository {
    async fn fetch_all_seats(&self) -> Result<Vec<SeatRecord>, SourceError> {
        Ok(self.list_seats().await?)
    }

    async fn fetch_all_organizations(&self) -> Result<Vec<Organization>, SourceError> {
        Ok(self.list_organizations().await?)
    }

    async fn fetch_all_relationships(&self) -> Result<Vec<PersonRelationship>, SourceError> {
        Ok(self.list_relationships().await?)
    }

    async fn fetch_person_by_id(&self, id: &PersonId) -> Result<Option<Person>, SourceError> {
        Ok(self.find_person(id).await?)
    }

    async fn fetch_organization_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, SourceError> {
        Ok(self.find_organization(id).await?)
    }
}

#[async_trait]
impl GovernanceRepository for SqlGovernanceRepository {
    async fn save_person(&self, person: Person) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO person (id, first_name, last_name)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name
            "#,
        )
        .bind(&person.id.0)
        .bind(&person.first_name)
        .bind(&person.last_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_organization(&self, organization: Organization) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO organization (id, legal_name, entity_type, parent_appoints_board)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                legal_name = excluded.legal_name,
                entity_type = excluded.entity_type,
                parent_appoints_board = excluded.parent_appoints_board
            "#,
        )
        .bind(&organization.id.0)
        .bind(&organization.legal_name)
        .bind(organization.entity_type.as_str())
        .bind(i64::from(organization.parent_appoints_board))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM entity_owner WHERE entity_id = ?")
            .bind(&organization.id.0)
            .execute(&mut *tx)
            .await?;

        for edge in &organization.owners {
            let (owner_entity_id, owner_person_id) = match &edge.owner {
                Owner::Organization(id) => (Some(id.0.as_str()), None),
                Owner::Person(id) => (None, Some(id.0.as_str())),
            };
            sqlx::query(
                r#"
                INSERT INTO entity_owner
                    (id, entity_id, owner_entity_id, owner_person_id, percentage)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(owner_row_id(&organization.id, &edge.owner))
            .bind(&organization.id.0)
            .bind(owner_entity_id)
            .bind(owner_person_id)
            .bind(edge.percentage.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_seat(&self, seat: SeatRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO board_seat (
                id, person_id, entity_id, role_category, title,
                start_date, end_date, voting_rights, compensated
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                person_id = excluded.person_id,
                entity_id = excluded.entity_id,
                role_category = excluded.role_category,
                title = excluded.title,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                voting_rights = excluded.voting_rights,
                compensated = excluded.compensated
            "#,
        )
        .bind(&seat.id.0)
        .bind(&seat.person_id.0)
        .bind(&seat.organization_id.0)
        .bind(seat.category.as_str())
        .bind(&seat.title)
        .bind(seat.tenure.start.map(format_date))
        .bind(seat.tenure.end.map(format_date))
        .bind(i64::from(seat.voting_rights))
        .bind(i64::from(seat.compensated))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_relationship(
        &self,
        relationship: PersonRelationship,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO person_relationship (id, person1_id, person2_id, category, details)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET details = excluded.details
            "#,
        )
        .bind(relationship_key(&relationship))
        .bind(&relationship.person1_id.0)
        .bind(&relationship.person2_id.0)
        .bind(relationship.category.as_str())
        .bind(&relationship.details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub(crate) fn owner_row_id(entity_id: &OrganizationId, owner: &Owner) -> String {
    match owner {
        Owner::Organization(id) => format!("{entity_id}:entity:{id}"),
        Owner::Person(id) => format!("{entity_id}:person:{id}"),
    }
}

/// Decodes every row, skipping the ones that fail with a decode error.
fn collect_decoded<T>(
    table: &'static str,
    rows: Vec<SqliteRow>,
    decode: impl Fn(&SqliteRow) -> Result<T, RepositoryError>,
) -> Result<Vec<T>, RepositoryError> {
    let mut decoded = Vec::with_capacity(rows.len());
    for row in &rows {
        match decode(row) {
            Ok(value) => decoded.push(value),
            Err(RepositoryError::Decode(reason)) => {
                let row_id = row.try_get::<String, _>("id").unwrap_or_default();
                warn!(
                    event_name = "governance.store.row_skipped",
                    table,
                    row_id = %row_id,
                    reason = %reason,
                    "skipping undecodable governance row"
                );
            }
            Err(error) => return Err(error),
        }
    }
    Ok(decoded)
}

fn person_from_row(row: &SqliteRow) -> Result<Person, RepositoryError> {
    Ok(Person {
        id: PersonId(row.try_get("id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
    })
}

fn organization_from_row(row: &SqliteRow) -> Result<Organization, RepositoryError> {
    Ok(Organization {
        id: OrganizationId(row.try_get("id")?),
        legal_name: row.try_get("legal_name")?,
        entity_type: EntityType::parse(&row.try_get::<String, _>("entity_type")?),
        parent_appoints_board: row.try_get::<i64, _>("parent_appoints_board")? != 0,
        owners: Vec::new(),
    })
}

fn seat_from_row(row: &SqliteRow) -> Result<SeatRecord, RepositoryError> {
    let category_raw = row.try_get::<String, _>("role_category")?;
    let category = RoleCategory::parse(&category_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown role category `{category_raw}`")))?;

    let person = match row.try_get::<Option<String>, _>("joined_person_id")? {
        Some(id) => Some(Person {
            id: PersonId(id),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
        }),
        None => None,
    };
    let organization = match row.try_get::<Option<String>, _>("joined_entity_id")? {
        Some(id) => Some(OrganizationRef {
            id: OrganizationId(id),
            legal_name: row.try_get("legal_name")?,
            entity_type: EntityType::parse(&row.try_get::<String, _>("entity_type")?),
        }),
        None => None,
    };

    Ok(SeatRecord {
        id: SeatId(row.try_get("id")?),
        person_id: PersonId(row.try_get("person_id")?),
        organization_id: OrganizationId(row.try_get("entity_id")?),
        category,
        title: row.try_get("title")?,
        tenure: Tenure {
            start: parse_date("start_date", row.try_get("start_date")?)?,
            end: parse_date("end_date", row.try_get("end_date")?)?,
        },
        voting_rights: row.try_get::<i64, _>("voting_rights")? != 0,
        compensated: row.try_get::<i64, _>("compensated")? != 0,
        person,
        organization,
    })
}

/// Returns `None` for an edge whose owner record no longer exists.
fn owner_from_row(row: &SqliteRow) -> Result<Option<(String, OwnershipEdge)>, RepositoryError> {
    let entity_id: String = row.try_get("entity_id")?;
    let owner_entity_id: Option<String> = row.try_get("owner_entity_id")?;
    let owner_person_id: Option<String> = row.try_get("owner_person_id")?;

    let (owner, owner_name) = match (owner_entity_id, owner_person_id) {
        (Some(id), None) => {
            let Some(name) = row.try_get::<Option<String>, _>("owner_entity_name")? else {
                return Ok(None);
            };
            (Owner::Organization(OrganizationId(id)), name)
        }
        (None, Some(id)) => {
            if row.try_get::<Option<String>, _>("joined_owner_person_id")?.is_none() {
                return Ok(None);
            }
            let first_name: Option<String> = row.try_get("owner_first_name")?;
            let last_name: Option<String> = row.try_get("owner_last_name")?;
            let name = Person::new(
                id.clone(),
                first_name.unwrap_or_default(),
                last_name.unwrap_or_default(),
            )
            .full_name();
            (Owner::Person(PersonId(id)), name)
        }
        _ => {
            return Err(RepositoryError::Decode(
                "ownership edge must name exactly one owner".to_string(),
            ))
        }
    };

    let percentage = parse_percentage(&row.try_get::<String, _>("percentage")?)?;
    Ok(Some((entity_id, OwnershipEdge { owner, percentage, owner_name: Some(owner_name) })))
}

fn relationship_from_row(row: &SqliteRow) -> Result<PersonRelationship, RepositoryError> {
    let category_raw = row.try_get::<String, _>("category")?;
    let category = RelationshipCategory::parse(&category_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown relationship category `{category_raw}`"))
    })?;

    Ok(PersonRelationship {
        person1_id: PersonId(row.try_get("person1_id")?),
        person2_id: PersonId(row.try_get("person2_id")?),
        category,
        details: row.try_get("details")?,
    })
}

fn parse_date(column: &str, value: Option<String>) -> Result<Option<NaiveDate>, RepositoryError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT).map(Some).map_err(|error| {
            RepositoryError::Decode(format!("invalid date for `{column}`: `{raw}` ({error})"))
        }),
    }
}

fn parse_percentage(raw: &str) -> Result<Decimal, RepositoryError> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|error| RepositoryError::Decode(format!("invalid percentage `{raw}`: {error}")))?;
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(RepositoryError::Decode(format!("percentage out of range: {value}")));
    }
    Ok(value)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
