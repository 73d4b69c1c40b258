use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use time::{macros::format_description, Date, Duration, OffsetDateTime};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{repo::User, AuthUser},
    error::ApiError,
    groups::repo::{Bill, Group, GroupMember},
    payments::repo as payments_repo,
    reports::{
        dto::{
            GroupDetailReport, MemberDetail, OwnerGroupSummary, OwnerSummaryReport, ReportQuery,
        },
        repo,
    },
    state::AppState,
};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/groups", get(owner_summary))
        .route("/reports/groups/:id", get(group_detail))
}

fn parse_report_date(value: &str, field: &str) -> Result<Date, ApiError> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(value, &fmt)
        .map_err(|_| ApiError::Validation(format!("invalid {field} date format")))
}

/// Summary of the caller's groups created in `[from, to]` (defaults: the
/// last seven days).
#[instrument(skip(state))]
pub async fn owner_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<OwnerSummaryReport>, ApiError> {
    let owner = User::find_by_id(&state.db, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::UserNotFound)?;

    let today = OffsetDateTime::now_utc().date();
    let from = match &query.from {
        Some(s) => parse_report_date(s, "from")?,
        None => today - Duration::days(7),
    };
    let to = match &query.to {
        Some(s) => parse_report_date(s, "to")?,
        None => today,
    };

    // Half-open range: the whole of the `to` day is included.
    let rows = repo::owner_group_summaries(
        &state.db,
        user_id,
        from.midnight().assume_utc(),
        (to + Duration::days(1)).midnight().assume_utc(),
    )
    .await
    .map_err(ApiError::Internal)?;

    if rows.is_empty() {
        warn!(user_id = %user_id, "no groups in range");
        return Err(ApiError::GroupNotFound);
    }

    let groups = rows
        .into_iter()
        .map(|row| OwnerGroupSummary {
            id: row.id,
            name: row.name,
            status: row.status,
            total_amount: row.total_amount,
            per_user_split_amount: row.per_user_split_amount,
            paid_amount: row.paid_amount,
            member_count: row.member_count,
            bill_amount: row.bill_amount,
            bill_completed: row.bill_completed,
            bill_date: row.bill_date,
        })
        .collect();

    Ok(Json(OwnerSummaryReport {
        owner: owner.name,
        from: from.to_string(),
        to: to.to_string(),
        groups,
    }))
}

/// Full picture of one owned group: bill, roster with resolved names,
/// payment history.
#[instrument(skip(state))]
pub async fn group_detail(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupDetailReport>, ApiError> {
    let group = Group::find_owned(&state.db, group_id, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::GroupNotFound)?;

    let bill_id = group
        .bill_id
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("group has no bill")))?;
    let bill = Bill::find(&state.db, bill_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("bill missing for group")))?;

    let members = GroupMember::list_by_group(&state.db, group.id)
        .await
        .map_err(ApiError::Internal)?;
    let history = payments_repo::list_history_by_bill(&state.db, bill.id)
        .await
        .map_err(ApiError::Internal)?;

    let member_ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
    let names: HashMap<Uuid, String> = repo::user_names(&state.db, &member_ids)
        .await
        .map_err(ApiError::Internal)?
        .into_iter()
        .collect();

    let members = members
        .into_iter()
        .map(|m| MemberDetail {
            name: names.get(&m.user_id).cloned().unwrap_or_default(),
            user_id: m.user_id,
            has_paid: m.has_paid,
            split_amount: m.split_amount,
            remarks: m.remarks,
        })
        .collect();

    Ok(Json(GroupDetailReport {
        group,
        bill,
        members,
        history,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        let d = parse_report_date("2026-08-01", "from").unwrap();
        assert_eq!(d.to_string(), "2026-08-01");
    }

    #[test]
    fn rejects_malformed_dates() {
        let err = parse_report_date("01/08/2026", "from").unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
        assert!(err.to_string().contains("from"));
    }
}
