use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::repo::User;
use crate::error::ApiError;
use crate::groups::repo::{Bill, Group, GroupMember};

/// Equal-split share for one member.
///
/// Plain f64 division, no rounding or remainder redistribution: with amounts
/// that do not divide evenly the shares may not sum back to the exact total.
/// That drift is an accepted limitation, not something this function hides.
pub fn split_share(total_amount: f64, member_count: usize) -> f64 {
    if member_count == 0 {
        return 0.0;
    }
    total_amount / member_count as f64
}

/// Outcome of matching requested emails against resolved accounts and the
/// current roster. Pure bookkeeping so the all-or-nothing validation of
/// `add_members` can be checked without a database.
#[derive(Debug, Default, PartialEq)]
pub struct MemberPartition {
    pub to_add: Vec<(String, Uuid)>,
    pub missing: Vec<String>,
    pub duplicates: Vec<String>,
}

pub fn partition_members(
    requested: &[String],
    resolved: &[(String, Uuid)],
    existing_user_ids: &[Uuid],
) -> MemberPartition {
    let mut out = MemberPartition::default();
    for email in requested {
        match resolved.iter().find(|(e, _)| e == email) {
            None => out.missing.push(email.clone()),
            Some((_, user_id)) => {
                if existing_user_ids.contains(user_id) {
                    out.duplicates.push(email.clone());
                } else {
                    out.to_add.push((email.clone(), *user_id));
                }
            }
        }
    }
    out
}

fn normalize_emails(emails: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(emails.len());
    for email in emails {
        let email = email.trim().to_lowercase();
        if !out.contains(&email) {
            out.push(email);
        }
    }
    out
}

/// Create a group, enroll the creator as its first member, create the bill
/// and link it. Split amounts stay zero until members are added.
pub async fn create_group_with_bill(
    db: &PgPool,
    owner: Uuid,
    group_name: &str,
    bill_name: &str,
    bill_amount: f64,
) -> Result<(Uuid, Uuid), ApiError> {
    if group_name.trim().is_empty() {
        return Err(ApiError::Validation("Group name is required".into()));
    }
    if bill_name.trim().is_empty() {
        return Err(ApiError::Validation("Bill name is required".into()));
    }
    if !(bill_amount > 0.0) {
        return Err(ApiError::Validation("Bill amount must be positive".into()));
    }

    let mut tx = db.begin().await?;
    let group = Group::insert(&mut tx, group_name.trim(), owner)
        .await
        .map_err(ApiError::Internal)?;
    GroupMember::insert(&mut tx, group.id, owner)
        .await
        .map_err(ApiError::Internal)?;
    let bill = Bill::insert(&mut tx, bill_name.trim(), bill_amount, group.id)
        .await
        .map_err(ApiError::Internal)?;
    Group::link_bill(&mut tx, group.id, bill.id)
        .await
        .map_err(ApiError::Internal)?;
    tx.commit().await?;

    info!(group_id = %group.id, bill_id = %bill.id, owner = %owner, "group created");
    Ok((group.id, bill.id))
}

/// Add members to an owned group, then rewrite every member's share.
///
/// Validation is all-or-nothing: unknown emails fail the whole call with the
/// missing set, already-enrolled emails fail it with the duplicate set, and
/// in both cases nothing is inserted. The group row is locked for the whole
/// operation so the split rewrite cannot interleave with a payment.
pub async fn add_members(
    db: &PgPool,
    group_id: Uuid,
    requester: Uuid,
    emails: &[String],
) -> Result<(), ApiError> {
    let emails = normalize_emails(emails);
    if emails.is_empty() {
        return Err(ApiError::Validation("user_emails must be non-empty".into()));
    }

    let mut tx = db.begin().await?;

    let group = Group::find_owned_for_update(&mut tx, group_id, requester)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::GroupNotFound)?;

    let resolved: Vec<(String, Uuid)> = User::find_by_emails(db, &emails)
        .await
        .map_err(ApiError::Internal)?
        .into_iter()
        .map(|u| (u.email, u.id))
        .collect();
    let resolved_ids: Vec<Uuid> = resolved.iter().map(|(_, id)| *id).collect();
    let existing = GroupMember::existing_user_ids(&mut tx, group.id, &resolved_ids)
        .await
        .map_err(ApiError::Internal)?;

    let partition = partition_members(&emails, &resolved, &existing);
    if !partition.missing.is_empty() {
        warn!(group_id = %group.id, missing = ?partition.missing, "unknown emails");
        return Err(ApiError::UsersNotFound(partition.missing));
    }
    if !partition.duplicates.is_empty() {
        warn!(group_id = %group.id, duplicates = ?partition.duplicates, "already members");
        return Err(ApiError::UsersAlreadyInGroup(partition.duplicates));
    }

    for (_, user_id) in &partition.to_add {
        GroupMember::insert(&mut tx, group.id, *user_id)
            .await
            .map_err(ApiError::Internal)?;
    }

    let bill_id = group
        .bill_id
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("group has no bill")))?;
    let bill = Bill::find_tx(&mut tx, bill_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("bill missing for group")))?;

    let members = GroupMember::list_by_group_tx(&mut tx, group.id)
        .await
        .map_err(ApiError::Internal)?;
    let share = split_share(bill.amount, members.len());

    Group::set_split(&mut tx, group.id, bill.amount, share)
        .await
        .map_err(|e| {
            error!(error = %e, group_id = %group.id, "failed to update group split amounts");
            ApiError::GroupUpdateFailed
        })?;
    GroupMember::set_split_for_group(&mut tx, group.id, share)
        .await
        .map_err(|e| {
            error!(error = %e, group_id = %group.id, "failed to update member split amounts");
            ApiError::GroupUpdateFailed
        })?;

    tx.commit().await?;

    info!(
        group_id = %group.id,
        added = partition.to_add.len(),
        members = members.len(),
        share,
        "members added, split recomputed"
    );
    Ok(())
}

#[cfg(test)]
mod split_tests {
    use super::*;

    #[test]
    fn splits_evenly_across_members() {
        // 100 across 4 members: 25 each
        assert_eq!(split_share(100.0, 4), 25.0);
        assert_eq!(split_share(90.0, 3), 30.0);
    }

    #[test]
    fn zero_members_means_zero_share() {
        assert_eq!(split_share(100.0, 0), 0.0);
        assert_eq!(split_share(0.0, 0), 0.0);
    }

    #[test]
    fn division_is_exact_not_rounded() {
        assert_eq!(split_share(100.0, 3), 100.0 / 3.0);
        assert_eq!(split_share(0.0, 5), 0.0);
    }

    #[test]
    fn shares_sum_back_to_total_within_tolerance() {
        let total = 99.99;
        let n = 7;
        let share = split_share(total, n);
        let sum = share * n as f64;
        assert!((sum - total).abs() < 1e-9);
    }
}

#[cfg(test)]
mod partition_tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn unknown_email_goes_to_missing() {
        let known = Uuid::new_v4();
        let requested = vec!["known@x.com".to_string(), "ghost@x.com".to_string()];
        let resolved = vec![("known@x.com".to_string(), known)];

        let p = partition_members(&requested, &resolved, &[]);
        assert_eq!(p.missing, vec!["ghost@x.com".to_string()]);
        assert_eq!(p.to_add, vec![("known@x.com".to_string(), known)]);
        assert!(p.duplicates.is_empty());
    }

    #[test]
    fn existing_member_goes_to_duplicates() {
        let member = Uuid::new_v4();
        let newcomer = Uuid::new_v4();
        let requested = vec!["old@x.com".to_string(), "new@x.com".to_string()];
        let resolved = vec![
            ("old@x.com".to_string(), member),
            ("new@x.com".to_string(), newcomer),
        ];

        let p = partition_members(&requested, &resolved, &[member]);
        assert_eq!(p.duplicates, vec!["old@x.com".to_string()]);
        assert_eq!(p.to_add, vec![("new@x.com".to_string(), newcomer)]);
        assert!(p.missing.is_empty());
    }

    #[test]
    fn all_new_members_land_in_to_add() {
        let users = ids(3);
        let requested: Vec<String> = (0..3).map(|i| format!("u{i}@x.com")).collect();
        let resolved: Vec<(String, Uuid)> = requested
            .iter()
            .cloned()
            .zip(users.iter().copied())
            .collect();

        let p = partition_members(&requested, &resolved, &[]);
        assert_eq!(p.to_add.len(), 3);
        assert!(p.missing.is_empty());
        assert!(p.duplicates.is_empty());
    }

    #[test]
    fn normalize_trims_lowercases_and_dedupes() {
        let input = vec![
            " A@X.com ".to_string(),
            "a@x.com".to_string(),
            "b@x.com".to_string(),
        ];
        assert_eq!(
            normalize_emails(&input),
            vec!["a@x.com".to_string(), "b@x.com".to_string()]
        );
    }
}
