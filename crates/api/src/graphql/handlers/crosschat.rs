// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::graphql_object;
use uuid::Uuid;

use crate::db::models::{JoinMessage, JoinRequest, NewJoinMessage, Team, User};
use crate::error::ApiError;
use crate::graphql::handlers::teams;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

/// Access predicate for a cross-chat thread: the joining user, or any
/// *current* member of the inviting team. Membership is evaluated at call
/// time, so a former member loses access the moment they leave.
pub(crate) fn can_participate(joiner: Uuid, team_roster: &[Uuid], viewer: Uuid) -> bool {
    viewer == joiner || team_roster.contains(&viewer)
}

async fn ensure_can_participate(
    ctx: &crate::graphql::Context,
    request: &JoinRequest,
) -> Result<crate::graphql::AuthenticatedUser, ApiError> {
    let viewer = ctx.require_authentication()?;
    let mut conn = ctx.get_db_conn().await;
    let roster = teams::member_ids(&mut conn, request.team_id).await?;
    if !can_participate(request.user_id, &roster, viewer.user_id) {
        return Err(ApiError::Unauthorized(
            "viewer may not access this cross chat".to_string(),
        ));
    }
    Ok(viewer)
}

/// One cross-chat inbox entry: the pending request, the inviting team and
/// the prospective joiner.
pub struct CrossChat {
    pub join_request: JoinRequest,
    pub team: Team,
    pub joiner: User,
}

#[graphql_object]
#[graphql(context = crate::graphql::Context)]
impl CrossChat {
    pub fn join_request(&self) -> &JoinRequest {
        &self.join_request
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn joiner(&self) -> &User {
        &self.joiner
    }
}

/// Cross chats where the caller is the prospective joiner.
pub async fn list_for_user(
    ctx: &crate::graphql::Context,
    competition_id_input: String,
) -> Result<Vec<CrossChat>, ApiError> {
    let current_user = ctx.require_authentication()?;
    let competition_id_val = Uuid::parse_str(&competition_id_input)?;
    let mut conn = ctx.get_db_conn().await;

    let joiner: User = {
        use crate::db::schema::users::dsl::*;
        users
            .find(current_user.user_id)
            .select(User::as_select())
            .first(&mut conn)
            .await?
    };

    let rows: Vec<(JoinRequest, Team)> = {
        use crate::db::schema::{join_requests, teams};
        join_requests::table
            .inner_join(teams::table)
            .filter(join_requests::user_id.eq(current_user.user_id))
            .filter(teams::competition_id.eq(competition_id_val))
            .order(join_requests::created_at.asc())
            .select((JoinRequest::as_select(), Team::as_select()))
            .load(&mut conn)
            .await?
    };

    Ok(rows
        .into_iter()
        .map(|(join_request, team)| CrossChat {
            join_request,
            team,
            joiner: joiner.clone(),
        })
        .collect())
}

/// Cross chats of the caller's own team in one competition.
pub async fn list_for_team(
    ctx: &crate::graphql::Context,
    competition_id_input: String,
) -> Result<Vec<CrossChat>, ApiError> {
    let current_user = ctx.require_authentication()?;
    let competition_id_val = Uuid::parse_str(&competition_id_input)?;
    let mut conn = ctx.get_db_conn().await;

    let team = teams::find_team_of_user(&mut conn, current_user.user_id, competition_id_val)
        .await?
        .ok_or_else(|| {
            ApiError::Unauthorized("user has no team in this competition".to_string())
        })?;

    let rows: Vec<(JoinRequest, User)> = {
        use crate::db::schema::{join_requests, users};
        join_requests::table
            .inner_join(users::table)
            .filter(join_requests::team_id.eq(team.id))
            .order(join_requests::created_at.asc())
            .select((JoinRequest::as_select(), User::as_select()))
            .load(&mut conn)
            .await?
    };

    Ok(rows
        .into_iter()
        .map(|(join_request, joiner)| CrossChat {
            join_request,
            team: team.clone(),
            joiner,
        })
        .collect())
}

#[graphql_object]
impl JoinMessage {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn sent_at(&self) -> f64 {
        self.sent_at.timestamp() as f64
    }

    pub async fn sender(&self, ctx: &crate::graphql::Context) -> Result<User, ApiError> {
        use crate::db::schema::users::dsl::*;
        Ok(users
            .find(self.sender_id)
            .select(User::as_select())
            .first(&mut ctx.get_db_conn().await)
            .await?)
    }
}

pub(crate) async fn get_cross_chat_messages_for(
    ctx: &crate::graphql::Context,
    request: &JoinRequest,
) -> Result<Vec<JoinMessage>, ApiError> {
    ensure_can_participate(ctx, request).await?;
    use crate::db::schema::join_messages::dsl::*;
    Ok(join_messages
        .filter(join_request_id.eq(request.id))
        .order(sent_at.asc())
        .select(JoinMessage::as_select())
        .load(&mut ctx.get_db_conn().await)
        .await?)
}

pub async fn get_cross_chat_messages(
    ctx: &crate::graphql::Context,
    join_request_id_input: String,
) -> Result<Vec<JoinMessage>, ApiError> {
    let request = load_join_request(ctx, &join_request_id_input).await?;
    get_cross_chat_messages_for(ctx, &request).await
}

pub async fn send_cross_chat_message(
    ctx: &crate::graphql::Context,
    join_request_id_input: String,
    body_input: String,
) -> Result<JoinMessage, ApiError> {
    let request = load_join_request(ctx, &join_request_id_input).await?;
    let sender = ensure_can_participate(ctx, &request).await?;

    use crate::db::schema::join_messages::dsl::*;
    Ok(diesel::insert_into(join_messages)
        .values(&NewJoinMessage {
            join_request_id: request.id,
            sender_id: sender.user_id,
            body: body_input,
        })
        .returning(JoinMessage::as_returning())
        .get_result(&mut ctx.get_db_conn().await)
        .await?)
}

async fn load_join_request(
    ctx: &crate::graphql::Context,
    join_request_id_input: &str,
) -> Result<JoinRequest, ApiError> {
    let join_request_id_val = Uuid::parse_str(join_request_id_input)?;
    use crate::db::schema::join_requests::dsl::*;
    join_requests
        .find(join_request_id_val)
        .select(JoinRequest::as_select())
        .first(&mut ctx.get_db_conn().await)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("join request does not exist".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joiner_can_participate() {
        let joiner = Uuid::now_v7();
        let roster = vec![Uuid::now_v7(), Uuid::now_v7()];
        assert!(can_participate(joiner, &roster, joiner));
    }

    #[test]
    fn team_members_can_participate() {
        let joiner = Uuid::now_v7();
        let member = Uuid::now_v7();
        let roster = vec![member, Uuid::now_v7()];
        assert!(can_participate(joiner, &roster, member));
    }

    #[test]
    fn outsiders_cannot_participate() {
        let joiner = Uuid::now_v7();
        let roster = vec![Uuid::now_v7()];
        assert!(!can_participate(joiner, &roster, Uuid::now_v7()));
    }

    #[test]
    fn former_members_lose_access() {
        let joiner = Uuid::now_v7();
        let former_member = Uuid::now_v7();
        // The roster is resolved at call time; someone who already left is
        // simply not on it any more.
        let roster = vec![Uuid::now_v7()];
        assert!(!can_participate(joiner, &roster, former_member));
    }
}
