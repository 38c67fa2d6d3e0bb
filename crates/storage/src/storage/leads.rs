use chrono::{DateTime, Utc};
use leadflow_core::{Lead, LeadFacts, PhoneMapping};
use rusqlite::{params, Connection, OptionalExtension as _, TransactionBehavior};

use super::{get_conn, parse_enum, parse_ts, to_rfc3339, Storage};
use crate::error::StorageError;
use crate::types::{LeadInsert, LeadMerge};

const LEAD_COLUMNS: &str = "id, phone_e164, phone_raw, first_name, last_name, email, source, \
                            status, notes, created_at, updated_at";

fn row_to_lead(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        phone_e164: row.get(1)?,
        phone_raw: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        source: row.get(6)?,
        status: parse_enum(7, &row.get::<_, String>(7)?)?,
        notes: row.get(8)?,
        created_at: parse_ts(9, &row.get::<_, String>(9)?)?,
        updated_at: parse_ts(10, &row.get::<_, String>(10)?)?,
    })
}

fn row_to_mapping(row: &rusqlite::Row<'_>) -> rusqlite::Result<PhoneMapping> {
    Ok(PhoneMapping {
        phone_e164: row.get(0)?,
        lead_id: row.get(1)?,
        display_name: row.get(2)?,
        last_updated: parse_ts(3, &row.get::<_, String>(3)?)?,
    })
}

fn select_lead_by(conn: &Connection, column: &str, value: &str) -> rusqlite::Result<Option<Lead>> {
    conn.query_row(
        &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE {column} = ?1"),
        params![value],
        row_to_lead,
    )
    .optional()
}

/// Point the mapping for `phone_e164` at `lead_id`, refreshing its display name.
fn write_mapping(
    conn: &Connection,
    phone_e164: &str,
    lead_id: &str,
    display_name: Option<&str>,
    now: DateTime<Utc>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO phone_mappings (phone_e164, lead_id, display_name, last_updated)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(phone_e164) DO UPDATE SET
             lead_id = excluded.lead_id,
             display_name = excluded.display_name,
             last_updated = excluded.last_updated",
        params![phone_e164, lead_id, display_name, to_rfc3339(now)],
    )?;
    Ok(())
}

impl Storage {
    /// Get lead by ID.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn get_lead(&self, id: &str) -> Result<Option<Lead>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(select_lead_by(&conn, "id", id)?)
    }

    /// Get the lead owning a canonical phone.
    ///
    /// # Errors
    /// Returns error if database query fails.
    pub fn get_lead_by_phone(&self, phone_e164: &str) -> Result<Option<Lead>, StorageError> {
        let conn = get_conn(&self.pool)?;
        Ok(select_lead_by(&conn, "phone_e164", phone_e164)?)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn get_phone_mapping(&self, phone_e164: &str) -> Result<Option<PhoneMapping>, StorageError> {
        let conn = get_conn(&self.pool)?;
        let mapping = conn
            .query_row(
                "SELECT phone_e164, lead_id, display_name, last_updated
                   FROM phone_mappings WHERE phone_e164 = ?1",
                params![phone_e164],
                row_to_mapping,
            )
            .optional()?;
        Ok(mapping)
    }

    /// # Errors
    /// Returns error if database write fails (including a missing lead).
    pub fn upsert_phone_mapping(&self, mapping: &PhoneMapping) -> Result<(), StorageError> {
        let conn = get_conn(&self.pool)?;
        write_mapping(
            &conn,
            &mapping.phone_e164,
            &mapping.lead_id,
            mapping.display_name.as_deref(),
            mapping.last_updated,
        )?;
        Ok(())
    }

    /// Insert a lead guarded by the unique phone constraint.
    ///
    /// # Errors
    /// Returns error if database write fails.
    pub fn insert_lead(&self, lead: &Lead) -> Result<LeadInsert, StorageError> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            &format!(
                "INSERT INTO leads ({LEAD_COLUMNS})
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                   ON CONFLICT(phone_e164) DO NOTHING"
            ),
            params![
                lead.id,
                lead.phone_e164,
                lead.phone_raw,
                lead.first_name,
                lead.last_name,
                lead.email,
                lead.source,
                lead.status.as_str(),
                lead.notes,
                to_rfc3339(lead.created_at),
                to_rfc3339(lead.updated_at),
            ],
        )?;

        let outcome = match (inserted, lead.phone_e164.as_deref()) {
            (0, Some(phone)) => {
                let existing = select_lead_by(&tx, "phone_e164", phone)?.ok_or_else(|| {
                    StorageError::NotFound { entity: "lead", id: phone.to_owned() }
                })?;
                // The winner may have crashed between its lead and mapping writes.
                tx.execute(
                    "INSERT INTO phone_mappings (phone_e164, lead_id, display_name, last_updated)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(phone_e164) DO NOTHING",
                    params![
                        phone,
                        existing.id,
                        existing.display_name(),
                        to_rfc3339(existing.updated_at)
                    ],
                )?;
                tracing::debug!(phone_e164 = phone, lead_id = %existing.id, "Lead insert lost phone race");
                LeadInsert::Conflict(existing)
            },
            (_, Some(phone)) => {
                write_mapping(
                    &tx,
                    phone,
                    &lead.id,
                    lead.display_name().as_deref(),
                    lead.updated_at,
                )?;
                LeadInsert::Applied(lead.clone())
            },
            (_, None) => LeadInsert::Applied(lead.clone()),
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Merge `facts` into the lead under the write lock.
    ///
    /// # Errors
    /// Returns error if database write fails.
    pub fn merge_lead_facts(
        &self,
        id: &str,
        facts: &LeadFacts,
        now: DateTime<Utc>,
    ) -> Result<Option<LeadMerge>, StorageError> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut lead) = select_lead_by(&tx, "id", id)? else {
            return Ok(None);
        };
        let patch = facts.patch_for(&lead);
        if patch.is_empty() {
            return Ok(Some(LeadMerge::Unchanged(lead)));
        }
        patch.apply(&mut lead, now);

        tx.execute(
            "UPDATE leads SET phone_raw = ?2, first_name = ?3, last_name = ?4, email = ?5,
                              notes = ?6, updated_at = ?7
               WHERE id = ?1",
            params![
                lead.id,
                lead.phone_raw,
                lead.first_name,
                lead.last_name,
                lead.email,
                lead.notes,
                to_rfc3339(lead.updated_at),
            ],
        )?;
        if let Some(phone) = lead.phone_e164.as_deref()
            && patch.changes_display_name()
        {
            write_mapping(&tx, phone, &lead.id, lead.display_name().as_deref(), now)?;
        }

        tx.commit()?;
        Ok(Some(LeadMerge::Updated(lead)))
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn count_leads(&self) -> Result<usize, StorageError> {
        let conn = get_conn(&self.pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// # Errors
    /// Returns error if database query fails.
    pub fn count_phone_mappings(&self) -> Result<usize, StorageError> {
        let conn = get_conn(&self.pool)?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM phone_mappings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
