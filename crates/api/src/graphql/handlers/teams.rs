// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::graphql_object;
use uuid::Uuid;

use crate::db::models::{
    NewParticipant, NewTeam, NewTeamMessage, Participant, Team, TeamMessage, User,
};
use crate::error::ApiError;

use diesel::prelude::*;
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl, scoped_futures::ScopedFutureExt,
};

#[graphql_object]
impl Team {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn competition_id(&self) -> String {
        self.competition_id.to_string()
    }

    pub async fn competition(
        &self,
        ctx: &crate::graphql::Context,
    ) -> Result<crate::db::models::Competition, ApiError> {
        use crate::db::schema::competitions::dsl::*;
        Ok(competitions
            .find(self.competition_id)
            .select(crate::db::models::Competition::as_select())
            .first(&mut ctx.get_db_conn().await)
            .await?)
    }

    /// Current roster, in participant insertion order.
    pub async fn members(&self, ctx: &crate::graphql::Context) -> Result<Vec<User>, ApiError> {
        use crate::db::schema::participants;
        use crate::db::schema::users;
        let member_records = participants::table
            .inner_join(users::table)
            .filter(participants::team_id.eq(self.id))
            .order(participants::created_at.asc())
            .select(User::as_select())
            .load::<User>(&mut ctx.get_db_conn().await)
            .await?;
        Ok(member_records)
    }

    pub async fn member_count(&self, ctx: &crate::graphql::Context) -> Result<i32, ApiError> {
        use crate::db::schema::participants::dsl::*;
        let count: i64 = participants
            .filter(team_id.eq(self.id))
            .count()
            .get_result(&mut ctx.get_db_conn().await)
            .await?;
        Ok(count as i32)
    }

    /// Outstanding join requests; visible to team members and admins only.
    pub async fn join_requests(
        &self,
        ctx: &crate::graphql::Context,
    ) -> Result<Vec<crate::db::models::JoinRequest>, ApiError> {
        let viewer = ctx.require_authentication()?;
        let mut conn = ctx.get_db_conn().await;
        let roster = member_ids(&mut conn, self.id).await?;
        if !roster.contains(&viewer.user_id)
            && viewer.role != crate::db::models::UserRole::Admin
        {
            return Err(ApiError::Unauthorized(
                "Permission denied to view join requests".to_string(),
            ));
        }
        use crate::db::schema::join_requests::dsl::*;
        Ok(join_requests
            .filter(team_id.eq(self.id))
            .order(created_at.asc())
            .select(crate::db::models::JoinRequest::as_select())
            .load(&mut conn)
            .await?)
    }
}

/// Team Directory lookup: the team must exist.
pub async fn verify_team(conn: &mut AsyncPgConnection, team: Uuid) -> Result<Team, ApiError> {
    use crate::db::schema::teams::dsl::*;
    teams
        .find(team)
        .select(Team::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("team does not exist".to_string()))
}

/// Roster of a team as user ids, in participant insertion order.
pub async fn member_ids(conn: &mut AsyncPgConnection, team: Uuid) -> Result<Vec<Uuid>, ApiError> {
    use crate::db::schema::participants::dsl::*;
    Ok(participants
        .filter(team_id.eq(team))
        .order(created_at.asc())
        .select(user_id)
        .load::<Uuid>(conn)
        .await?)
}

/// The user's team within one competition, if they participate in it.
pub async fn find_team_of_user(
    conn: &mut AsyncPgConnection,
    user: Uuid,
    competition: Uuid,
) -> Result<Option<Team>, ApiError> {
    use crate::db::schema::participants::dsl::*;
    let membership: Option<Participant> = participants
        .filter(user_id.eq(user))
        .filter(competition_id.eq(competition))
        .select(Participant::as_select())
        .first(conn)
        .await
        .optional()?;
    match membership {
        Some(membership) => Ok(Some(verify_team(conn, membership.team_id).await?)),
        None => Ok(None),
    }
}

pub async fn create_team(
    ctx: &crate::graphql::Context,
    competition_id_input: String,
    name: String,
) -> Result<Team, ApiError> {
    let current_user = ctx.require_authentication()?;
    let competition_id_val = Uuid::parse_str(&competition_id_input)?;

    let mut conn = ctx.get_db_conn().await;
    conn.transaction::<_, ApiError, _>(|conn| {
        async move {
            let competition = {
                use crate::db::schema::competitions::dsl::*;
                competitions
                    .find(competition_id_val)
                    .select(crate::db::models::Competition::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| {
                        ApiError::NotFound("competition does not exist".to_string())
                    })?
            };

            if chrono::Utc::now() > competition.ends_at {
                return Err(ApiError::InvalidTransition(
                    "competition has already ended".to_string(),
                ));
            }

            let existing =
                find_team_of_user(conn, current_user.user_id, competition.id).await?;
            if existing.is_some() {
                return Err(ApiError::InvalidTransition(
                    "user already has a team in this competition".to_string(),
                ));
            }

            let team_name = name;
            let inserted_team = {
                use crate::db::schema::teams::dsl::*;
                diesel::insert_into(teams)
                    .values(&NewTeam {
                        competition_id: competition.id,
                        name: team_name,
                    })
                    .returning(Team::as_returning())
                    .get_result(conn)
                    .await?
            };

            {
                use crate::db::schema::participants::dsl::*;
                diesel::insert_into(participants)
                    .values(&NewParticipant {
                        user_id: current_user.user_id,
                        team_id: inserted_team.id,
                        competition_id: competition.id,
                    })
                    .execute(conn)
                    .await?;
            }

            Ok(inserted_team)
        }
        .scope_boxed()
    })
    .await
}

pub async fn get_my_team(
    ctx: &crate::graphql::Context,
    competition_id_input: String,
) -> Result<Option<Team>, ApiError> {
    let current_user = ctx.require_authentication()?;
    let competition_id_val = Uuid::parse_str(&competition_id_input)?;
    let mut conn = ctx.get_db_conn().await;
    find_team_of_user(&mut conn, current_user.user_id, competition_id_val).await
}

pub async fn get_team_by_id(
    ctx: &crate::graphql::Context,
    team_id_input: String,
) -> Result<Team, ApiError> {
    let team_id_val = Uuid::parse_str(&team_id_input)?;
    let mut conn = ctx.get_db_conn().await;
    verify_team(&mut conn, team_id_val).await
}

pub async fn get_competition_teams(
    ctx: &crate::graphql::Context,
    competition_id_input: String,
) -> Result<Vec<Team>, ApiError> {
    let competition_id_val = Uuid::parse_str(&competition_id_input)?;
    use crate::db::schema::teams::dsl::*;
    Ok(teams
        .filter(competition_id.eq(competition_id_val))
        .order(created_at.asc())
        .select(Team::as_select())
        .load(&mut ctx.get_db_conn().await)
        .await?)
}

#[graphql_object]
impl TeamMessage {
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

pub async fn send_team_message(
    ctx: &crate::graphql::Context,
    team_id_input: String,
    body_input: String,
) -> Result<TeamMessage, ApiError> {
    let current_user = ctx.require_authentication()?;
    let team_id_val = Uuid::parse_str(&team_id_input)?;
    let mut conn = ctx.get_db_conn().await;

    let team = verify_team(&mut conn, team_id_val).await?;
    let roster = member_ids(&mut conn, team.id).await?;
    if !roster.contains(&current_user.user_id) {
        return Err(ApiError::Unauthorized(
            "only team members may post to the team chat".to_string(),
        ));
    }

    use crate::db::schema::team_messages::dsl::*;
    Ok(diesel::insert_into(team_messages)
        .values(&NewTeamMessage {
            team_id: team.id,
            sender_id: current_user.user_id,
            body: body_input,
        })
        .returning(TeamMessage::as_returning())
        .get_result(&mut conn)
        .await?)
}

pub async fn get_team_messages(
    ctx: &crate::graphql::Context,
    team_id_input: String,
) -> Result<Vec<TeamMessage>, ApiError> {
    let current_user = ctx.require_authentication()?;
    let team_id_val = Uuid::parse_str(&team_id_input)?;
    let mut conn = ctx.get_db_conn().await;

    let roster = member_ids(&mut conn, team_id_val).await?;
    if !roster.contains(&current_user.user_id)
        && current_user.role != crate::db::models::UserRole::Admin
    {
        return Err(ApiError::Unauthorized(
            "only team members may read the team chat".to_string(),
        ));
    }

    use crate::db::schema::team_messages::dsl::*;
    Ok(team_messages
        .filter(team_id.eq(team_id_val))
        .order(sent_at.asc())
        .select(TeamMessage::as_select())
        .load(&mut conn)
        .await?)
}
