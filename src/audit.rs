// src/audit.rs
//
// Append-only audit trail. Entries are written inside the caller's database
// transaction so they commit or roll back together with the change they
// describe.

use serde::Serialize;
use sqlx::{Postgres, Transaction};

use crate::error::AppError;

pub async fn log(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    action: &str,
    entity: &str,
    entity_id: Option<i64>,
    data: &impl Serialize,
) -> Result<(), AppError> {
    let payload = serde_json::to_value(data)
        .map_err(|err| AppError::internal(format!("Failed to serialize audit data: {err}")))?;

    sqlx::query(
        "INSERT INTO audit_logs (user_id, action, entity, entity_id, data)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(payload)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
