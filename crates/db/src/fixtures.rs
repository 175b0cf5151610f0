use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_PERSON_IDS: &[&str] = &[
    "person-ada",
    "person-lena",
    "person-maya",
    "person-omar",
    "person-raj",
    "person-sofia",
    "person-tom",
];

const SEED_ORGANIZATIONS: &[SeedOrganizationContract] = &[
    SeedOrganizationContract {
        id: "org-alder-action",
        entity_type: "social_welfare",
        parent_appoints_board: false,
    },
    SeedOrganizationContract {
        id: "org-alder-fund",
        entity_type: "public_charity",
        parent_appoints_board: false,
    },
    SeedOrganizationContract {
        id: "org-birch-holdings",
        entity_type: "for_profit",
        parent_appoints_board: false,
    },
    SeedOrganizationContract {
        id: "org-birch-ventures",
        entity_type: "for_profit",
        parent_appoints_board: false,
    },
    SeedOrganizationContract {
        id: "org-cedar-labs",
        entity_type: "for_profit",
        parent_appoints_board: false,
    },
    SeedOrganizationContract {
        id: "org-elm-partners",
        entity_type: "for_profit",
        parent_appoints_board: false,
    },
    SeedOrganizationContract {
        id: "org-fir-chapter",
        entity_type: "public_charity",
        parent_appoints_board: true,
    },
];

const SEED_OWNER_IDS: &[&str] = &[
    "org-birch-holdings:person:person-maya",
    "org-birch-ventures:entity:org-birch-holdings",
    "org-cedar-labs:entity:org-birch-ventures",
    "org-elm-partners:person:person-omar",
];

const SEED_SEAT_IDS: &[&str] = &[
    "seat-af-maya",
    "seat-af-lena",
    "seat-af-raj",
    "seat-af-sofia",
    "seat-af-tom",
    "seat-aa-maya",
    "seat-aa-lena",
    "seat-aa-ada",
    "seat-bh-maya",
    "seat-bh-omar",
    "seat-cl-raj",
    "seat-fc-ada",
    "seat-fc-sofia",
];

const SEED_RELATIONSHIP_IDS: &[&str] = &[
    "person-maya:person-omar:FAMILY",
    "person-lena:person-tom:BUSINESS",
    "person-raj:person-sofia:OTHER",
    "person-ada:person-sofia:FAMILY",
];

/// Demo governance dataset: a charity and its social-welfare affiliate with shared
/// directors, a three-level for-profit ownership chain, a family-attributed sibling
/// company, and a parent-appointed chapter whose trustees are spouses.
pub struct GovernanceSeedDataset;

impl GovernanceSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/governance_seed.sql");

    /// Reference date the dataset's expected risks are computed against.
    pub const AS_OF: &str = "2024-06-30";

    /// Loads the dataset. Rows that already exist are left untouched.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            people: SEED_PERSON_IDS.len(),
            organizations: SEED_ORGANIZATIONS.len(),
            ownership_edges: SEED_OWNER_IDS.len(),
            seats: SEED_SEAT_IDS.len(),
            relationships: SEED_RELATIONSHIP_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        checks.push(("people", count_present(pool, "person", SEED_PERSON_IDS).await?));
        checks.push((
            "ownership-edges",
            count_present(pool, "entity_owner", SEED_OWNER_IDS).await?,
        ));
        checks.push(("board-seats", count_present(pool, "board_seat", SEED_SEAT_IDS).await?));
        checks.push((
            "relationships",
            count_present(pool, "person_relationship", SEED_RELATIONSHIP_IDS).await?,
        ));

        for organization in SEED_ORGANIZATIONS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM organization
                    WHERE id = ?1 AND entity_type = ?2 AND parent_appoints_board = ?3
                )",
            )
            .bind(organization.id)
            .bind(organization.entity_type)
            .bind(i64::from(organization.parent_appoints_board))
            .fetch_one(pool)
            .await?;
            checks.push((organization.id, exists == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_relationships = sql_array_from_ids(SEED_RELATIONSHIP_IDS);
        let quoted_seats = sql_array_from_ids(SEED_SEAT_IDS);
        let quoted_owners = sql_array_from_ids(SEED_OWNER_IDS);
        let organization_ids = SEED_ORGANIZATIONS.iter().map(|org| org.id).collect::<Vec<_>>();
        let quoted_organizations = sql_array_from_ids(&organization_ids);
        let quoted_people = sql_array_from_ids(SEED_PERSON_IDS);

        sqlx::query(&format!("DELETE FROM person_relationship WHERE id IN {quoted_relationships}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM board_seat WHERE id IN {quoted_seats}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM entity_owner WHERE id IN {quoted_owners}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM organization WHERE id IN {quoted_organizations}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM person WHERE id IN {quoted_people}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedOrganizationContract {
    id: &'static str,
    entity_type: &'static str,
    parent_appoints_board: bool,
}

async fn count_present(
    pool: &DbPool,
    table: &str,
    ids: &[&str],
) -> Result<bool, RepositoryError> {
    let quoted = sql_array_from_ids(ids);
    let count: i64 =
        sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id IN {quoted}"))
            .fetch_one(pool)
            .await?;
    Ok(count == ids.len() as i64)
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub people: usize,
    pub organizations: usize,
    pub ownership_edges: usize,
    pub seats: usize,
    pub relationships: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!GovernanceSeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        let first = GovernanceSeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification =
            GovernanceSeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.seats, 13);

        let second = GovernanceSeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            GovernanceSeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(first, second);
        assert_eq!(first_verification.checks, second_verification.checks);

        let seat_total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM board_seat")
            .fetch_one(&pool)
            .await
            .expect("count seats");
        assert_eq!(seat_total, 13);
    }

    #[tokio::test]
    async fn clean_removes_every_seeded_row() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        GovernanceSeedDataset::load(&pool).await.expect("load seed fixtures");

        GovernanceSeedDataset::clean(&pool).await.expect("clean seed fixtures");

        let verification = GovernanceSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        assert!(verification.checks.iter().all(|(_, ok)| !ok));
    }

    #[test]
    fn seed_contract_json_matches_rust_seed_constants() {
        let contract: Value = serde_json::from_str(include_str!(
            "../../../config/fixtures/governance_seed_contract.json"
        ))
        .expect("governance seed contract JSON must parse");

        assert_eq!(contract["as_of"].as_str(), Some(GovernanceSeedDataset::AS_OF));
        assert_eq!(
            contract["people"]
                .as_array()
                .expect("people should be an array")
                .iter()
                .map(|value| value.as_str().unwrap_or_default())
                .collect::<Vec<_>>(),
            SEED_PERSON_IDS
        );
        assert_eq!(contract["seat_count"].as_u64(), Some(SEED_SEAT_IDS.len() as u64));
        assert_eq!(contract["ownership_edge_count"].as_u64(), Some(SEED_OWNER_IDS.len() as u64));
        assert_eq!(
            contract["relationship_count"].as_u64(),
            Some(SEED_RELATIONSHIP_IDS.len() as u64)
        );

        let contract_organizations =
            contract["organizations"].as_array().expect("organizations should be an array");
        assert_eq!(contract_organizations.len(), SEED_ORGANIZATIONS.len());
        for organization in SEED_ORGANIZATIONS {
            let entry = contract_organizations
                .iter()
                .find(|candidate| candidate["id"].as_str() == Some(organization.id))
                .expect("contract should list every seeded organization");
            assert_eq!(entry["entity_type"].as_str(), Some(organization.entity_type));
            assert_eq!(
                entry["parent_appoints_board"].as_bool(),
                Some(organization.parent_appoints_board)
            );
        }
    }

    #[test]
    fn seed_sql_mentions_every_contract_id() {
        let ids = SEED_PERSON_IDS
            .iter()
            .chain(SEED_OWNER_IDS)
            .chain(SEED_SEAT_IDS)
            .chain(SEED_RELATIONSHIP_IDS)
            .chain(SEED_ORGANIZATIONS.iter().map(|org| &org.id));

        for id in ids {
            assert!(
                GovernanceSeedDataset::SQL.contains(&format!("'{id}'")),
                "seed SQL should insert {id}"
            );
        }
    }
}
