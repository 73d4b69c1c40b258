use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::groups::repo::GroupStatus;
use crate::payments::dto::{PendingPayment, PendingPaymentsResponse};
use crate::payments::repo;

/// The settlement threshold: a group is settled once the paid amount has
/// reached the total. At least one member must exist for this to be
/// reachable; the payment path guarantees that, since the payer is one.
pub fn group_settled(paid_amount: f64, total_amount: f64) -> bool {
    paid_amount >= total_amount
}

/// Record one member's payment and advance group/bill state.
///
/// The whole operation is a single transaction: the member row is locked
/// first, the paid-amount increment happens in the store, and the history
/// append commits with the payment or not at all. Each stage keeps its own
/// failure code so callers can tell where a persistence failure happened.
pub async fn mark_payment(
    db: &PgPool,
    group_id: Uuid,
    user_id: Uuid,
    remarks: &str,
) -> Result<(), ApiError> {
    let mut tx = db.begin().await?;

    // Member absence is reported as a missing group: outsiders cannot probe
    // which groups exist.
    let member = repo::find_member_for_update(&mut tx, group_id, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::GroupNotFound)?;

    if member.has_paid {
        warn!(group_id = %group_id, user_id = %user_id, "payment already made");
        return Err(ApiError::PaymentAlreadyMade);
    }

    repo::mark_member_paid(&mut tx, member.id, remarks)
        .await
        .map_err(|e| {
            error!(error = %e, group_id = %group_id, "failed to update payment status");
            ApiError::PaymentFailed
        })?;

    let view = repo::increment_paid_amount(&mut tx, group_id, member.split_amount)
        .await
        .map_err(|e| {
            error!(error = %e, group_id = %group_id, "failed to update group paid amount");
            ApiError::GroupUpdateFailed
        })?
        .ok_or(ApiError::GroupNotFound)?;

    if group_settled(view.paid_amount, view.total_amount) {
        if let Some(bill_id) = view.bill_id {
            repo::complete_bill(&mut tx, bill_id).await.map_err(|e| {
                error!(error = %e, bill_id = %bill_id, "failed to mark bill as completed");
                ApiError::BillCompletionFailed
            })?;
        }
        repo::mark_group_done(&mut tx, group_id, GroupStatus::Done.as_str())
            .await
            .map_err(|e| {
                error!(error = %e, group_id = %group_id, "failed to update group status");
                ApiError::GroupUpdateFailed
            })?;
        info!(group_id = %group_id, paid = view.paid_amount, "group settled");
    }

    let paid_by = repo::payer_name(&mut tx, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::UserNotFound)?;

    let bill_id = view
        .bill_id
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("group has no bill")))?;
    // History commits with the payment or not at all.
    repo::insert_history(
        &mut tx,
        bill_id,
        member.split_amount,
        &paid_by,
        OffsetDateTime::now_utc(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, bill_id = %bill_id, "failed to record bill history");
        ApiError::HistoryAppendFailed
    })?;

    tx.commit().await?;

    info!(
        group_id = %group_id,
        user_id = %user_id,
        amount = member.split_amount,
        "payment marked"
    );
    Ok(())
}

/// All pending payments for a user with a running total. Never an error
/// when there is nothing to pay.
pub async fn pending_payments(
    db: &PgPool,
    user_id: Uuid,
) -> Result<PendingPaymentsResponse, ApiError> {
    let rows = repo::list_pending_for_user(db, user_id)
        .await
        .map_err(ApiError::Internal)?;

    let mut total_amount = 0.0;
    let pending_payments: Vec<PendingPayment> = rows
        .into_iter()
        .map(|row| {
            total_amount += row.amount;
            PendingPayment {
                group_id: row.group_id,
                group_name: row.group_name,
                bill_id: row.bill_id,
                amount: row.amount,
            }
        })
        .collect();

    let message = if pending_payments.is_empty() {
        Some("No pending payments found".to_string())
    } else {
        None
    };

    Ok(PendingPaymentsResponse {
        pending_payments,
        total_amount,
        message,
    })
}

#[cfg(test)]
mod settlement_tests {
    use super::*;

    #[test]
    fn not_settled_while_short_of_total() {
        assert!(!group_settled(60.0, 90.0));
        assert!(!group_settled(0.0, 0.1));
    }

    #[test]
    fn settled_at_exact_total() {
        // last of three 30-shares against a 90 total
        assert!(group_settled(60.0 + 30.0, 90.0));
    }

    #[test]
    fn settled_when_overpaid() {
        assert!(group_settled(100.0, 90.0));
    }

    #[test]
    fn nth_payment_settles_equal_split() {
        // N members, equal shares, no remainder: exactly the N-th distinct
        // payment crosses the threshold.
        let total = 100.0;
        let n = 4;
        let share = total / n as f64;
        let mut paid = 0.0;
        for i in 1..=n {
            paid += share;
            if i < n {
                assert!(!group_settled(paid, total), "settled after {i} payments");
            } else {
                assert!(group_settled(paid, total));
            }
        }
    }
}
