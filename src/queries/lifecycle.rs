//! The sole authority for mutating a query's status and its companion
//! fields.
//!
//! Every transition is applied as a status-guarded conditional UPDATE so
//! that concurrent conflicting requests are serialized by the database:
//! exactly one read-modify-write wins, and the loser re-reads the row to
//! learn why the guard refused. Notification dispatch runs strictly after
//! the mutation is persisted; a dispatch failure is logged and never rolls
//! the transition back.

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{Actor, Role, User};
use crate::error::ApiError;
use crate::notifications::{Notification, NotificationKind};
use crate::queries::repo::{Query, QueryStatus, COLUMNS};
use crate::state::AppState;

pub(crate) const TITLE_MAX: usize = 200;
pub(crate) const DESCRIPTION_MAX: usize = 2000;
pub(crate) const ANSWER_MAX: usize = 2000;
pub(crate) const REASON_MAX: usize = 500;

/// The five write operations on an existing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Request,
    Assign,
    Reassign,
    Answer,
    Dismantle,
}

impl Transition {
    /// Statuses the operation may start from. RESOLVED and DISMANTLED are
    /// terminal: no transition accepts them.
    pub fn allowed_from(self) -> &'static [QueryStatus] {
        use QueryStatus::*;
        match self {
            Transition::Request | Transition::Assign => &[Unassigned, Requested],
            Transition::Reassign | Transition::Answer => &[Assigned],
            Transition::Dismantle => &[Unassigned, Requested, Assigned],
        }
    }
}

pub fn check_status(transition: Transition, current: QueryStatus) -> Result<(), ApiError> {
    if transition.allowed_from().contains(&current) {
        return Ok(());
    }
    Err(ApiError::InvalidTransition {
        current,
        allowed: transition.allowed_from(),
    })
}

/// Answer/dismantle access rule: an admin may act on any query, a team head
/// only on one assigned to them, regardless of the query's status.
pub fn check_moderator(actor: &Actor, query: &Query) -> Result<(), ApiError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::TeamHead if query.assigned_to == Some(actor.id) => Ok(()),
        Role::TeamHead => Err(ApiError::Forbidden("query is not assigned to you".into())),
        Role::Participant => Err(ApiError::Forbidden(format!(
            "role '{}' is not authorized for this action",
            Role::Participant
        ))),
    }
}

/// Participants may only read queries they created; staff see all.
pub fn check_read_access(actor: &Actor, query: &Query) -> Result<(), ApiError> {
    if actor.role == Role::Participant && query.created_by != actor.id {
        return Err(ApiError::Forbidden(
            "not authorized to view this query".into(),
        ));
    }
    Ok(())
}

fn sql_guard(transition: Transition) -> String {
    transition
        .allowed_from()
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn required_text(field: &str, value: Option<&str>, max: usize) -> Result<String, ApiError> {
    let trimmed = value.unwrap_or_default().trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("please provide {field}")));
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::Validation(format!(
            "{field} cannot exceed {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Explains a guarded UPDATE that matched no row, by the query's state at
/// re-read time.
fn classify_guard_failure(
    transition: Transition,
    query: &Query,
    required_assignee: Option<Uuid>,
) -> ApiError {
    if !transition.allowed_from().contains(&query.status) {
        return ApiError::InvalidTransition {
            current: query.status,
            allowed: transition.allowed_from(),
        };
    }
    if let Some(assignee) = required_assignee {
        if query.assigned_to != Some(assignee) {
            return ApiError::Forbidden("query is not assigned to you".into());
        }
    }
    ApiError::Conflict("query changed concurrently; please retry".into())
}

async fn guard_failure(
    db: &PgPool,
    id: Uuid,
    transition: Transition,
    required_assignee: Option<Uuid>,
) -> ApiError {
    match Query::find(db, id).await {
        Err(e) => e.into(),
        Ok(None) => ApiError::NotFound("query"),
        Ok(Some(query)) => classify_guard_failure(transition, &query, required_assignee),
    }
}

async fn load_team_head(db: &PgPool, id: Uuid) -> Result<User, ApiError> {
    let user = User::find(db, id)
        .await?
        .ok_or(ApiError::NotFound("team head"))?;
    if user.role != Role::TeamHead {
        return Err(ApiError::Validation("user is not a team head".into()));
    }
    Ok(user)
}

pub async fn create(
    state: &AppState,
    actor: &Actor,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<Query, ApiError> {
    actor.require(&[Role::Participant])?;
    let title = required_text("title", title, TITLE_MAX)?;
    let description = required_text("description", description, DESCRIPTION_MAX)?;

    let query = Query::insert(&state.db, &title, &description, actor.id).await?;
    info!(query_id = %query.id, created_by = %actor.id, "query created");
    Ok(query)
}

/// A team head claims an open query for themselves.
pub async fn request(state: &AppState, actor: &Actor, id: Uuid) -> Result<Query, ApiError> {
    actor.require(&[Role::TeamHead])?;

    let sql = format!(
        "UPDATE queries SET assigned_to = $2, status = 'ASSIGNED', updated_at = now() \
         WHERE id = $1 AND status IN ({}) \
         RETURNING {COLUMNS}",
        sql_guard(Transition::Request)
    );
    let updated = sqlx::query_as::<_, Query>(&sql)
        .bind(id)
        .bind(actor.id)
        .fetch_optional(&state.db)
        .await?;

    let Some(query) = updated else {
        return Err(guard_failure(&state.db, id, Transition::Request, None).await);
    };

    info!(query_id = %query.id, team_head = %actor.id, "query claimed");
    if let Err(e) = dispatch_assignment(state, &query).await {
        warn!(error = %e, query_id = %query.id, "assignment notice dispatch failed");
    }
    Ok(query)
}

pub async fn assign(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    team_head_id: Option<Uuid>,
) -> Result<Query, ApiError> {
    actor.require(&[Role::Admin])?;
    let team_head_id =
        team_head_id.ok_or_else(|| ApiError::Validation("please provide teamHeadId".into()))?;
    let head = load_team_head(&state.db, team_head_id).await?;

    let sql = format!(
        "UPDATE queries SET assigned_to = $2, status = 'ASSIGNED', updated_at = now() \
         WHERE id = $1 AND status IN ({}) \
         RETURNING {COLUMNS}",
        sql_guard(Transition::Assign)
    );
    let updated = sqlx::query_as::<_, Query>(&sql)
        .bind(id)
        .bind(head.id)
        .fetch_optional(&state.db)
        .await?;

    let Some(query) = updated else {
        return Err(guard_failure(&state.db, id, Transition::Assign, None).await);
    };

    info!(query_id = %query.id, team_head = %head.id, assigned_by = %actor.id, "query assigned");
    if let Err(e) = dispatch_assignment(state, &query).await {
        warn!(error = %e, query_id = %query.id, "assignment notice dispatch failed");
    }
    Ok(query)
}

/// Moves an ASSIGNED query to a different team head; the status does not
/// change.
pub async fn reassign(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    team_head_id: Option<Uuid>,
) -> Result<Query, ApiError> {
    actor.require(&[Role::Admin])?;
    let team_head_id =
        team_head_id.ok_or_else(|| ApiError::Validation("please provide teamHeadId".into()))?;
    let head = load_team_head(&state.db, team_head_id).await?;

    let sql = format!(
        "UPDATE queries SET assigned_to = $2, updated_at = now() \
         WHERE id = $1 AND status IN ({}) \
         RETURNING {COLUMNS}",
        sql_guard(Transition::Reassign)
    );
    let updated = sqlx::query_as::<_, Query>(&sql)
        .bind(id)
        .bind(head.id)
        .fetch_optional(&state.db)
        .await?;

    let Some(query) = updated else {
        return Err(guard_failure(&state.db, id, Transition::Reassign, None).await);
    };

    info!(query_id = %query.id, team_head = %head.id, reassigned_by = %actor.id, "query reassigned");
    if let Err(e) = dispatch_assignment(state, &query).await {
        warn!(error = %e, query_id = %query.id, "assignment notice dispatch failed");
    }
    Ok(query)
}

pub async fn answer(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    answer: Option<&str>,
) -> Result<Query, ApiError> {
    actor.require(&[Role::Admin, Role::TeamHead])?;
    let answer = required_text("answer", answer, ANSWER_MAX)?;

    let current = Query::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("query"))?;
    check_moderator(actor, &current)?;
    check_status(Transition::Answer, current.status)?;

    // The ownership clause is re-checked inside the guard: a concurrent
    // reassign between the read above and this write must not let the old
    // assignee resolve the query.
    let required_assignee = (actor.role == Role::TeamHead).then_some(actor.id);
    let mut sql = format!(
        "UPDATE queries SET answer = $2, resolved_by = $3, status = 'RESOLVED', \
         updated_at = now() \
         WHERE id = $1 AND status IN ({})",
        sql_guard(Transition::Answer)
    );
    if required_assignee.is_some() {
        sql.push_str(" AND assigned_to = $3");
    }
    sql.push_str(&format!(" RETURNING {COLUMNS}"));

    let updated = sqlx::query_as::<_, Query>(&sql)
        .bind(id)
        .bind(&answer)
        .bind(actor.id)
        .fetch_optional(&state.db)
        .await?;

    let Some(query) = updated else {
        return Err(guard_failure(&state.db, id, Transition::Answer, required_assignee).await);
    };

    info!(query_id = %query.id, resolved_by = %actor.id, "query resolved");
    if let Err(e) = dispatch_resolution(state, &query).await {
        warn!(error = %e, query_id = %query.id, "resolution notice dispatch failed");
    }
    Ok(query)
}

pub async fn dismantle(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    reason: Option<&str>,
) -> Result<Query, ApiError> {
    actor.require(&[Role::Admin, Role::TeamHead])?;
    let reason = required_text("reason", reason, REASON_MAX)?;

    let current = Query::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("query"))?;
    check_moderator(actor, &current)?;
    check_status(Transition::Dismantle, current.status)?;

    let required_assignee = (actor.role == Role::TeamHead).then_some(actor.id);
    let mut sql = format!(
        "UPDATE queries SET dismantled_reason = $2, status = 'DISMANTLED', updated_at = now() \
         WHERE id = $1 AND status IN ({})",
        sql_guard(Transition::Dismantle)
    );
    if required_assignee.is_some() {
        sql.push_str(" AND assigned_to = $3");
    }
    sql.push_str(&format!(" RETURNING {COLUMNS}"));

    let mut update = sqlx::query_as::<_, Query>(&sql).bind(id).bind(&reason);
    if let Some(assignee) = required_assignee {
        update = update.bind(assignee);
    }
    let updated = update.fetch_optional(&state.db).await?;

    let Some(query) = updated else {
        return Err(guard_failure(&state.db, id, Transition::Dismantle, required_assignee).await);
    };

    info!(query_id = %query.id, dismantled_by = %actor.id, "query dismantled");
    if let Err(e) = dispatch_dismantle(state, &query, actor.id).await {
        warn!(error = %e, query_id = %query.id, "dismantle notice dispatch failed");
    }
    Ok(query)
}

// Post-commit side effects. Failures propagate to the caller only to be
// logged; the state change stays authoritative.

async fn dispatch_assignment(state: &AppState, query: &Query) -> anyhow::Result<()> {
    let head_id = query
        .assigned_to
        .context("assigned query without assignee")?;
    let head = User::find(&state.db, head_id)
        .await
        .context("load assignee")?
        .context("assignee not found")?;
    Notification::insert(
        &state.db,
        head.id,
        &format!("Query \"{}\" has been assigned to you", query.title),
        NotificationKind::QueryAssigned,
        query.id,
    )
    .await
    .context("persist assignment notification")?;
    state.notifier.send_assignment_notice(query, &head).await
}

async fn dispatch_resolution(state: &AppState, query: &Query) -> anyhow::Result<()> {
    let creator = User::find(&state.db, query.created_by)
        .await
        .context("load query creator")?
        .context("query creator not found")?;
    Notification::insert(
        &state.db,
        creator.id,
        &format!("Your query \"{}\" has been resolved", query.title),
        NotificationKind::QueryResolved,
        query.id,
    )
    .await
    .context("persist resolution notification")?;
    state.notifier.send_resolution_notice(query, &creator).await
}

async fn dispatch_dismantle(
    state: &AppState,
    query: &Query,
    actor_id: Uuid,
) -> anyhow::Result<()> {
    let creator = User::find(&state.db, query.created_by)
        .await
        .context("load query creator")?
        .context("query creator not found")?;
    let actor = User::find(&state.db, actor_id)
        .await
        .context("load dismantling user")?
        .context("dismantling user not found")?;
    Notification::insert(
        &state.db,
        creator.id,
        &format!("Your query \"{}\" has been dismantled", query.title),
        NotificationKind::QueryDismantled,
        query.id,
    )
    .await
    .context("persist dismantle notification")?;
    state
        .notifier
        .send_dismantle_notice(query, &creator, &actor)
        .await
}
