use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::groups::repo::{Group, GroupMember};

#[derive(Debug, Deserialize)]
pub struct BillInput {
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub group_name: String,
    pub bill: BillInput,
}

#[derive(Debug, Serialize)]
pub struct CreateGroupResponse {
    pub group_id: Uuid,
    pub bill_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMembersRequest {
    pub user_emails: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddMembersResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteGroupResponse {
    pub message: String,
}

/// A group together with its member roster, as returned by the listings.
#[derive(Debug, Serialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_group_request_deserializes() {
        let req: CreateGroupRequest = serde_json::from_str(
            r#"{"group_name":"Trip","bill":{"name":"Hotel","amount":240.0}}"#,
        )
        .unwrap();
        assert_eq!(req.group_name, "Trip");
        assert_eq!(req.bill.amount, 240.0);
    }

    #[test]
    fn add_members_request_deserializes() {
        let req: AddMembersRequest =
            serde_json::from_str(r#"{"user_emails":["a@x.com","b@x.com"]}"#).unwrap();
        assert_eq!(req.user_emails.len(), 2);
    }
}
