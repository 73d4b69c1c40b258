use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::ApiError,
    groups::{
        dto::{
            AddMembersRequest, AddMembersResponse, CreateGroupRequest, CreateGroupResponse,
            DeleteGroupResponse, GroupWithMembers, StatusQuery,
        },
        repo::{Group, GroupMember, GroupStatus},
        services,
    },
    state::AppState,
};

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", post(create_group))
        .route("/groups/:id", delete(delete_group))
        .route("/groups/:id/members", post(add_members))
        .route("/groups/owned", get(list_owned_groups))
        .route("/groups/member-groups", get(list_member_groups))
}

#[instrument(skip(state, payload))]
pub async fn create_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<Json<CreateGroupResponse>, ApiError> {
    let (group_id, bill_id) = services::create_group_with_bill(
        &state.db,
        user_id,
        &payload.group_name,
        &payload.bill.name,
        payload.bill.amount,
    )
    .await?;

    Ok(Json(CreateGroupResponse {
        group_id,
        bill_id,
        message: "Group and bill created successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn add_members(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<AddMembersRequest>,
) -> Result<Json<AddMembersResponse>, ApiError> {
    services::add_members(&state.db, group_id, user_id, &payload.user_emails).await?;
    Ok(Json(AddMembersResponse {
        message: "Users added to group successfully".into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<DeleteGroupResponse>, ApiError> {
    // Absence and foreign ownership get the same answer.
    let group = Group::find_owned(&state.db, group_id, user_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::GroupNotFound)?;

    Group::soft_delete(&state.db, group.id).await.map_err(|e| {
        error!(error = %e, group_id = %group.id, "soft delete failed");
        ApiError::Internal(e)
    })?;

    Ok(Json(DeleteGroupResponse {
        message: "Group deleted".into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_owned_groups(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<GroupWithMembers>>, ApiError> {
    let groups = Group::list_owned_by(&state.db, user_id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(with_rosters(&state, groups).await?))
}

#[instrument(skip(state))]
pub async fn list_member_groups(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<GroupWithMembers>>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => match GroupStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                warn!(status = %s, "invalid status filter");
                return Err(ApiError::InvalidQueryParameter(
                    "Invalid status for query parameter (status)".into(),
                ));
            }
        },
    };

    let groups = Group::list_for_member(&state.db, user_id, status)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(with_rosters(&state, groups).await?))
}

/// Attach member rosters to a list of groups with one batched query.
async fn with_rosters(
    state: &AppState,
    groups: Vec<Group>,
) -> Result<Vec<GroupWithMembers>, ApiError> {
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
    let members = GroupMember::list_by_groups(&state.db, &ids)
        .await
        .map_err(ApiError::Internal)?;

    let mut by_group: HashMap<Uuid, Vec<GroupMember>> = HashMap::new();
    for member in members {
        by_group.entry(member.group_id).or_default().push(member);
    }

    Ok(groups
        .into_iter()
        .map(|group| {
            let members = by_group.remove(&group.id).unwrap_or_default();
            GroupWithMembers { group, members }
        })
        .collect())
}
