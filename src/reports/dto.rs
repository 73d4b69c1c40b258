use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::groups::repo::{Bill, Group};
use crate::payments::repo::BillHistory;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// One group line of the owner summary.
#[derive(Debug, Serialize)]
pub struct OwnerGroupSummary {
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

/// Owner summary across groups in a date range; the external renderer turns
/// this into the report document.
#[derive(Debug, Serialize)]
pub struct OwnerSummaryReport {
    pub owner: String,
    pub from: String,
    pub to: String,
    pub groups: Vec<OwnerGroupSummary>,
}

#[derive(Debug, Serialize)]
pub struct MemberDetail {
    pub user_id: Uuid,
    pub name: String,
    pub has_paid: bool,
    pub split_amount: f64,
    pub remarks: String,
}

/// Single-group detail: roster plus full payment history.
#[derive(Debug, Serialize)]
pub struct GroupDetailReport {
    pub group: Group,
    pub bill: Bill,
    pub members: Vec<MemberDetail>,
    pub history: Vec<BillHistory>,
}
