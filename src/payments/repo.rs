use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::groups::repo::GroupMember;

/// Append-only record of one member's payment against a bill.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillHistory {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub amount: f64,
    pub paid_by: String,
    pub paid_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// The group fields the settlement transition needs, as returned by the
/// atomic paid-amount increment.
#[derive(Debug, Clone, FromRow)]
pub struct SettlementView {
    pub paid_amount: f64,
    pub total_amount: f64,
    pub bill_id: Option<Uuid>,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct PendingRow {
    pub group_id: Uuid,
    pub group_name: String,
    pub bill_id: Uuid,
    pub amount: f64,
}

/// Lock the membership row for the whole settlement transaction.
pub async fn find_member_for_update(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<GroupMember>> {
    let member = sqlx::query_as::<_, GroupMember>(
        r#"
        SELECT id, group_id, user_id, has_paid, split_amount, remarks,
               created_at, updated_at
        FROM group_members
        WHERE group_id = $1 AND user_id = $2
        FOR UPDATE
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(member)
}

pub async fn mark_member_paid(
    tx: &mut Transaction<'_, Postgres>,
    member_id: Uuid,
    remarks: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE group_members SET has_paid = TRUE, remarks = $1, updated_at = now() \
         WHERE id = $2",
    )
    .bind(remarks)
    .bind(member_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Add the share to the group's paid amount in the store itself; callers
/// never read-modify-write this field.
pub async fn increment_paid_amount(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
    amount: f64,
) -> anyhow::Result<Option<SettlementView>> {
    let view = sqlx::query_as::<_, SettlementView>(
        r#"
        UPDATE groups
        SET paid_amount = paid_amount + $1, updated_at = now()
        WHERE id = $2 AND deleted_at IS NULL
        RETURNING paid_amount, total_amount, bill_id, status
        "#,
    )
    .bind(amount)
    .bind(group_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(view)
}

pub async fn complete_bill(
    tx: &mut Transaction<'_, Postgres>,
    bill_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE bills SET completed = TRUE WHERE id = $1")
        .bind(bill_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_group_done(
    tx: &mut Transaction<'_, Postgres>,
    group_id: Uuid,
    status: &str,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE groups SET status = $1, updated_at = now() WHERE id = $2")
        .bind(status)
        .bind(group_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn payer_name(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> anyhow::Result<Option<String>> {
    let row = sqlx::query_as::<_, (String,)>("SELECT name FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(|(name,)| name))
}

pub async fn insert_history(
    tx: &mut Transaction<'_, Postgres>,
    bill_id: Uuid,
    amount: f64,
    paid_by: &str,
    paid_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO bill_history (bill_id, amount, paid_by, paid_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(bill_id)
    .bind(amount)
    .bind(paid_by)
    .bind(paid_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn list_history_by_bill(db: &PgPool, bill_id: Uuid) -> anyhow::Result<Vec<BillHistory>> {
    let rows = sqlx::query_as::<_, BillHistory>(
        r#"
        SELECT id, bill_id, amount, paid_by, paid_at, created_at
        FROM bill_history
        WHERE bill_id = $1
        ORDER BY paid_at ASC
        "#,
    )
    .bind(bill_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Everything the user still owes: unpaid memberships joined to their group
/// and bill. Soft-deleted groups are skipped.
pub async fn list_pending_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PendingRow>> {
    let rows = sqlx::query_as::<_, PendingRow>(
        r#"
        SELECT g.id AS group_id, g.name AS group_name, b.id AS bill_id, b.amount
        FROM group_members m
        JOIN groups g ON g.id = m.group_id
        JOIN bills b ON b.id = g.bill_id
        WHERE m.user_id = $1 AND m.has_paid = FALSE AND g.deleted_at IS NULL
        ORDER BY m.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
