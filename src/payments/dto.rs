use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct MarkPaymentRequest {
    pub group_id: Uuid,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Serialize)]
pub struct MarkPaymentResponse {
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PendingPayment {
    pub group_id: Uuid,
    pub group_name: String,
    pub bill_id: Uuid,
    pub amount: f64,
}

/// Listing of everything the user still owes. An empty list is a normal
/// answer, not an error.
#[derive(Debug, Serialize)]
pub struct PendingPaymentsResponse {
    pub pending_payments: Vec<PendingPayment>,
    pub total_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_payment_request_defaults_remarks() {
        let req: MarkPaymentRequest = serde_json::from_str(&format!(
            r#"{{"group_id":"{}"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(req.remarks, "");
    }

    #[test]
    fn empty_pending_listing_serializes_message() {
        let res = PendingPaymentsResponse {
            pending_payments: vec![],
            total_amount: 0.0,
            message: Some("No pending payments found".into()),
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("No pending payments found"));
        assert!(json.contains("\"total_amount\":0"));
    }

    #[test]
    fn non_empty_pending_listing_omits_message() {
        let res = PendingPaymentsResponse {
            pending_payments: vec![PendingPayment {
                group_id: Uuid::new_v4(),
                group_name: "Trip".into(),
                bill_id: Uuid::new_v4(),
                amount: 120.0,
            }],
            total_amount: 120.0,
            message: None,
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(!json.contains("message"));
        assert!(json.contains("Trip"));
    }
}
