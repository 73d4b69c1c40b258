use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct OwnerGroupSummaryRow {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub total_amount: f64,
    pub per_user_split_amount: f64,
    pub paid_amount: f64,
    pub member_count: i64,
    pub bill_amount: Option<f64>,
    pub bill_completed: Option<bool>,
    pub bill_date: Option<OffsetDateTime>,
}

/// Per-group aggregate for the owner summary: bill joined in, members
/// counted, limited to groups created in the date range.
pub async fn owner_group_summaries(
    db: &PgPool,
    owner: Uuid,
    from: OffsetDateTime,
    to: OffsetDateTime,
) -> anyhow::Result<Vec<OwnerGroupSummaryRow>> {
    let rows = sqlx::query_as::<_, OwnerGroupSummaryRow>(
        r#"
        SELECT g.id, g.name, g.status, g.total_amount, g.per_user_split_amount,
               g.paid_amount,
               COUNT(m.id) AS member_count,
               b.amount AS bill_amount,
               b.completed AS bill_completed,
               b.created_at AS bill_date
        FROM groups g
        LEFT JOIN bills b ON b.group_id = g.id
        LEFT JOIN group_members m ON m.group_id = g.id
        WHERE g.created_by = $1
          AND g.deleted_at IS NULL
          AND g.created_at >= $2 AND g.created_at < $3
        GROUP BY g.id, b.id
        ORDER BY g.created_at ASC
        "#,
    )
    .bind(owner)
    .bind(from)
    .bind(to)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Display names for a set of users, for resolving roster/history entries.
pub async fn user_names(db: &PgPool, user_ids: &[Uuid]) -> anyhow::Result<Vec<(Uuid, String)>> {
    let rows = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, name FROM users WHERE id = ANY($1)",
    )
    .bind(user_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
