use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

/// Group lifecycle status. Stored as TEXT; `Pending` until the full bill
/// amount has been paid, then `Done` (one-way).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Pending,
    Done,
}

impl GroupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupStatus::Pending => "PENDING",
            GroupStatus::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(GroupStatus::Pending),
            "DONE" => Some(GroupStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub bill_id: Option<Uuid>,
    pub total_amount: f64,
    pub per_user_split_amount: f64,
    pub paid_amount: f64,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub has_paid: bool,
    pub split_amount: f64,
    pub remarks: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bill {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    pub group_id: Uuid,
    pub completed: bool,
    pub created_at: OffsetDateTime,
}

const GROUP_COLUMNS: &str = "id, name, created_by, bill_id, total_amount, \
     per_user_split_amount, paid_amount, status, created_at, updated_at";

impl Group {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        created_by: Uuid,
    ) -> anyhow::Result<Group> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "INSERT INTO groups (name, created_by) VALUES ($1, $2) RETURNING {GROUP_COLUMNS}"
        ))
        .bind(name)
        .bind(created_by)
        .fetch_one(&mut **tx)
        .await?;
        Ok(group)
    }

    pub async fn link_bill(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        bill_id: Uuid,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE groups SET bill_id = $1, updated_at = now() WHERE id = $2")
            .bind(bill_id)
            .bind(group_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Owner-scoped lookup with a row lock. Returns `None` both when the
    /// group does not exist and when the requester is not its creator.
    pub async fn find_owned_for_update(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        owner: Uuid,
    ) -> anyhow::Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups \
             WHERE id = $1 AND created_by = $2 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(group_id)
        .bind(owner)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(group)
    }

    pub async fn find_owned(
        db: &PgPool,
        group_id: Uuid,
        owner: Uuid,
    ) -> anyhow::Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups \
             WHERE id = $1 AND created_by = $2 AND deleted_at IS NULL"
        ))
        .bind(group_id)
        .bind(owner)
        .fetch_optional(db)
        .await?;
        Ok(group)
    }

    pub async fn set_split(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        total_amount: f64,
        per_user_split_amount: f64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE groups SET total_amount = $1, per_user_split_amount = $2, \
             updated_at = now() WHERE id = $3",
        )
        .bind(total_amount)
        .bind(per_user_split_amount)
        .bind(group_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Soft delete: the row stays for members/history, listings skip it.
    pub async fn soft_delete(db: &PgPool, group_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE groups SET deleted_at = now() WHERE id = $1")
            .bind(group_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn list_owned_by(db: &PgPool, owner: Uuid) -> anyhow::Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups \
             WHERE created_by = $1 AND deleted_at IS NULL ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(db)
        .await?;
        Ok(groups)
    }

    pub async fn list_for_member(
        db: &PgPool,
        user_id: Uuid,
        status: Option<GroupStatus>,
    ) -> anyhow::Result<Vec<Group>> {
        const BASE: &str = "SELECT g.id, g.name, g.created_by, g.bill_id, g.total_amount, \
             g.per_user_split_amount, g.paid_amount, g.status, g.created_at, g.updated_at \
             FROM groups g \
             JOIN group_members m ON g.id = m.group_id \
             WHERE m.user_id = $1 AND g.deleted_at IS NULL";
        let groups = match status {
            Some(status) => {
                sqlx::query_as::<_, Group>(&format!(
                    "{BASE} AND g.status = $2 ORDER BY g.created_at DESC"
                ))
                .bind(user_id)
                .bind(status.as_str())
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Group>(&format!("{BASE} ORDER BY g.created_at DESC"))
                    .bind(user_id)
                    .fetch_all(db)
                    .await?
            }
        };
        Ok(groups)
    }
}

impl GroupMember {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<GroupMember> {
        let member = sqlx::query_as::<_, GroupMember>(
            r#"
            INSERT INTO group_members (group_id, user_id)
            VALUES ($1, $2)
            RETURNING id, group_id, user_id, has_paid, split_amount, remarks,
                      created_at, updated_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(member)
    }

    pub async fn list_by_group_tx(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
    ) -> anyhow::Result<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT id, group_id, user_id, has_paid, split_amount, remarks,
                   created_at, updated_at
            FROM group_members
            WHERE group_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(members)
    }

    pub async fn list_by_group(db: &PgPool, group_id: Uuid) -> anyhow::Result<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT id, group_id, user_id, has_paid, split_amount, remarks,
                   created_at, updated_at
            FROM group_members
            WHERE group_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(db)
        .await?;
        Ok(members)
    }

    /// Batched roster fetch for the group listings.
    pub async fn list_by_groups(
        db: &PgPool,
        group_ids: &[Uuid],
    ) -> anyhow::Result<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(
            r#"
            SELECT id, group_id, user_id, has_paid, split_amount, remarks,
                   created_at, updated_at
            FROM group_members
            WHERE group_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(group_ids)
        .fetch_all(db)
        .await?;
        Ok(members)
    }

    /// Which of the given users are already members of the group.
    pub async fn existing_user_ids(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> anyhow::Result<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            "SELECT user_id FROM group_members WHERE group_id = $1 AND user_id = ANY($2)",
        )
        .bind(group_id)
        .bind(user_ids)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Rewrite the split amount on every member of the group in one statement.
    pub async fn set_split_for_group(
        tx: &mut Transaction<'_, Postgres>,
        group_id: Uuid,
        split_amount: f64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE group_members SET split_amount = $1, updated_at = now() WHERE group_id = $2",
        )
        .bind(split_amount)
        .bind(group_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

impl Bill {
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        amount: f64,
        group_id: Uuid,
    ) -> anyhow::Result<Bill> {
        let bill = sqlx::query_as::<_, Bill>(
            r#"
            INSERT INTO bills (name, amount, group_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, amount, group_id, completed, created_at
            "#,
        )
        .bind(name)
        .bind(amount)
        .bind(group_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(bill)
    }

    pub async fn find_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> anyhow::Result<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(
            "SELECT id, name, amount, group_id, completed, created_at FROM bills WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(bill)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(
            "SELECT id, name, amount, group_id, completed, created_at FROM bills WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        assert_eq!(GroupStatus::parse("PENDING"), Some(GroupStatus::Pending));
        assert_eq!(GroupStatus::parse("DONE"), Some(GroupStatus::Done));
        assert_eq!(GroupStatus::parse("pending"), None);
        assert_eq!(GroupStatus::parse(""), None);
        assert_eq!(GroupStatus::Done.as_str(), "DONE");
    }
}
