//! LeadStore implementation for PgStorage.

use super::*;

use crate::traits::LeadStore;
use crate::types::{LeadInsert, LeadMerge};
use async_trait::async_trait;
use leadflow_core::LeadFacts;

async fn write_mapping<'e, E>(
    executor: E,
    phone_e164: &str,
    lead_id: &str,
    display_name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), StorageError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO phone_mappings (phone_e164, lead_id, display_name, last_updated)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (phone_e164) DO UPDATE SET
           lead_id = EXCLUDED.lead_id,
           display_name = EXCLUDED.display_name,
           last_updated = EXCLUDED.last_updated",
    )
    .bind(phone_e164)
    .bind(lead_id)
    .bind(display_name)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl LeadStore for PgStorage {
    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, StorageError> {
        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_lead(&r)).transpose()
    }

    async fn get_lead_by_phone(&self, phone_e164: &str) -> Result<Option<Lead>, StorageError> {
        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE phone_e164 = $1"))
            .bind(phone_e164)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_lead(&r)).transpose()
    }

    async fn get_phone_mapping(
        &self,
        phone_e164: &str,
    ) -> Result<Option<PhoneMapping>, StorageError> {
        let row = sqlx::query(
            "SELECT phone_e164, lead_id, display_name, last_updated
             FROM phone_mappings WHERE phone_e164 = $1",
        )
        .bind(phone_e164)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_mapping(&r)).transpose()
    }

    async fn upsert_phone_mapping(&self, mapping: &PhoneMapping) -> Result<(), StorageError> {
        write_mapping(
            &self.pool,
            &mapping.phone_e164,
            &mapping.lead_id,
            mapping.display_name.as_deref(),
            mapping.last_updated,
        )
        .await
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<LeadInsert, StorageError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO leads ({LEAD_COLUMNS})
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
             ON CONFLICT (phone_e164) DO NOTHING
             RETURNING id"
        ))
        .bind(&lead.id)
        .bind(&lead.phone_e164)
        .bind(&lead.phone_raw)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(&lead.notes)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match (inserted, lead.phone_e164.as_deref()) {
            (None, Some(phone)) => {
                let row =
                    sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE phone_e164 = $1"))
                        .bind(phone)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| StorageError::NotFound {
                            entity: "lead",
                            id: phone.to_owned(),
                        })?;
                let existing = row_to_lead(&row)?;
                sqlx::query(
                    "INSERT INTO phone_mappings (phone_e164, lead_id, display_name, last_updated)
                     VALUES ($1, $2, $3, $4)
                     ON CONFLICT (phone_e164) DO NOTHING",
                )
                .bind(phone)
                .bind(&existing.id)
                .bind(existing.display_name())
                .bind(existing.updated_at)
                .execute(&mut *tx)
                .await?;
                tracing::debug!(phone_e164 = phone, lead_id = %existing.id, "Lead insert lost phone race");
                LeadInsert::Conflict(existing)
            },
            (_, Some(phone)) => {
                write_mapping(
                    &mut *tx,
                    phone,
                    &lead.id,
                    lead.display_name().as_deref(),
                    lead.updated_at,
                )
                .await?;
                LeadInsert::Applied(lead.clone())
            },
            (_, None) => LeadInsert::Applied(lead.clone()),
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn merge_lead_facts(
        &self,
        id: &str,
        facts: &LeadFacts,
        now: DateTime<Utc>,
    ) -> Result<Option<LeadMerge>, StorageError> {
        let mut tx = self.pool.begin().await?;

        let row =
            sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut lead = row_to_lead(&row)?;
        let patch = facts.patch_for(&lead);
        if patch.is_empty() {
            return Ok(Some(LeadMerge::Unchanged(lead)));
        }
        patch.apply(&mut lead, now);

        sqlx::query(
            "UPDATE leads SET phone_raw = $2, first_name = $3, last_name = $4, email = $5,
                              notes = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(&lead.id)
        .bind(&lead.phone_raw)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.notes)
        .bind(lead.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(phone) = lead.phone_e164.as_deref()
            && patch.changes_display_name()
        {
            write_mapping(&mut *tx, phone, &lead.id, lead.display_name().as_deref(), now).await?;
        }

        tx.commit().await?;
        Ok(Some(LeadMerge::Updated(lead)))
    }

    async fn count_leads(&self) -> Result<usize, StorageError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leads").fetch_one(&self.pool).await?;
        Ok(usize_from_count(count))
    }

    async fn count_phone_mappings(&self) -> Result<usize, StorageError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM phone_mappings").fetch_one(&self.pool).await?;
        Ok(usize_from_count(count))
    }
}
