// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::{GraphQLEnum, graphql_object};
use uuid::Uuid;

use crate::db::models::{JoinRequest, NewJoinMessage, NewJoinRequest, Participant, Team, User};
use crate::error::ApiError;
use crate::graphql::handlers::{crosschat, teams};

use diesel::prelude::*;
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl, scoped_futures::ScopedFutureExt,
};

/// Hard roster cap per team.
pub const MAX_TEAM_SIZE: usize = 4;

/// Semantic state of a potential join between a user and a team.
///
/// These are normal values, not errors: the UI decides how to render each
/// one. Only the mutations below turn the illegal states into failures.
#[derive(GraphQLEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestValidity {
    /// No request exists yet; creating one is legal.
    Valid,
    /// The joiner is already a member of the inviting team.
    Backwards,
    /// The inviting team is at the roster cap.
    Full,
    /// The joiner's own team has other members depending on them.
    Committed,
    /// Both consent flags set; the membership move may be applied.
    Accepted,
    /// The team is waiting on the user's consent.
    Invited,
    /// The user is waiting on the team's consent.
    Requested,
}

/// Everything the classifier needs, loaded up front.
pub(crate) struct JoinSnapshot {
    /// Member ids of the inviting team.
    pub inviting_roster: Vec<Uuid>,
    /// Size of the joiner's own team in the same competition; `None` if the
    /// joiner has no participation there.
    pub own_team_size: Option<i64>,
    /// Consent flags (team, user) of an existing request between the pair.
    pub existing_request: Option<(bool, bool)>,
}

/// Decision function of the join-request state machine. First match wins;
/// a joiner without a participation in the competition is a hard
/// authorization failure, not a classification outcome.
pub(crate) fn classify_snapshot(
    joiner: Uuid,
    snapshot: &JoinSnapshot,
) -> Result<RequestValidity, ApiError> {
    if snapshot.inviting_roster.contains(&joiner) {
        return Ok(RequestValidity::Backwards);
    }
    if snapshot.inviting_roster.len() >= MAX_TEAM_SIZE {
        return Ok(RequestValidity::Full);
    }
    let own_team_size = snapshot.own_team_size.ok_or_else(|| {
        ApiError::Unauthorized("user is not participating in this competition".to_string())
    })?;
    if own_team_size > 1 {
        // Solo teams may be abandoned freely; teams with other members may not.
        return Ok(RequestValidity::Committed);
    }
    Ok(match snapshot.existing_request {
        Some((true, true)) => RequestValidity::Accepted,
        Some((true, false)) => RequestValidity::Invited,
        Some((false, true)) => RequestValidity::Requested,
        // A row with neither consent should not occur; treat it as absent.
        Some((false, false)) | None => RequestValidity::Valid,
    })
}

pub async fn classify(
    conn: &mut AsyncPgConnection,
    inviting_team: &Team,
    joiner: Uuid,
) -> Result<RequestValidity, ApiError> {
    let inviting_roster = teams::member_ids(conn, inviting_team.id).await?;

    let own_team_size = {
        use crate::db::schema::participants::dsl::*;
        let membership: Option<Participant> = participants
            .filter(user_id.eq(joiner))
            .filter(competition_id.eq(inviting_team.competition_id))
            .select(Participant::as_select())
            .first(conn)
            .await
            .optional()?;
        match membership {
            Some(membership) => Some(
                participants
                    .filter(team_id.eq(membership.team_id))
                    .count()
                    .get_result::<i64>(conn)
                    .await?,
            ),
            None => None,
        }
    };

    let existing_request = {
        use crate::db::schema::join_requests::dsl::*;
        join_requests
            .filter(team_id.eq(inviting_team.id))
            .filter(user_id.eq(joiner))
            .select(JoinRequest::as_select())
            .first(conn)
            .await
            .optional()?
    };

    classify_snapshot(
        joiner,
        &JoinSnapshot {
            inviting_roster,
            own_team_size,
            existing_request: existing_request.map(|r| (r.team_consent, r.user_consent)),
        },
    )
}

/// Creates the join-request row plus the opening cross-chat message. The
/// initiating side's consent is implicit; callers must have classified the
/// pair as VALID first, this does not re-check for an existing row.
pub async fn record_join_request(
    conn: &mut AsyncPgConnection,
    inviting_team: &Team,
    joiner: Uuid,
    sender: Uuid,
    pitch: &str,
    with_team_consent: bool,
) -> Result<Uuid, ApiError> {
    let request: JoinRequest = {
        use crate::db::schema::join_requests::dsl::*;
        diesel::insert_into(join_requests)
            .values(&NewJoinRequest {
                team_id: inviting_team.id,
                user_id: joiner,
                team_consent: with_team_consent,
                user_consent: !with_team_consent,
            })
            .returning(JoinRequest::as_returning())
            .get_result(conn)
            .await?
    };

    {
        use crate::db::schema::join_messages::dsl::*;
        diesel::insert_into(join_messages)
            .values(&NewJoinMessage {
                join_request_id: request.id,
                sender_id: sender,
                body: pitch.to_string(),
            })
            .execute(conn)
            .await?;
    }

    Ok(request.id)
}

/// Whether moving the last member out of a team leaves it empty, requiring
/// deletion of the team row (a team row never exists with zero members).
pub(crate) fn origin_team_abandoned(prior_roster_size: i64) -> bool {
    prior_roster_size <= 1
}

/// Applies an accepted join. Runs within the caller's transaction; callers
/// are responsible for having established the ACCEPTED state first.
pub async fn add_user_to_team(
    conn: &mut AsyncPgConnection,
    user: Uuid,
    inviting_team: &Team,
) -> Result<(), ApiError> {
    {
        use crate::db::schema::join_requests::dsl::*;
        diesel::delete(
            join_requests
                .filter(team_id.eq(inviting_team.id))
                .filter(user_id.eq(user)),
        )
        .execute(conn)
        .await?;
    }

    let current_team = teams::find_team_of_user(conn, user, inviting_team.competition_id)
        .await?
        .ok_or_else(|| {
            ApiError::Unauthorized("user is not participating in this competition".to_string())
        })?;

    use crate::db::schema::participants::dsl::*;
    let membership: Option<Participant> = participants
        .filter(user_id.eq(user))
        .filter(team_id.eq(current_team.id))
        .select(Participant::as_select())
        .first(conn)
        .await
        .optional()?;
    // Unreachable if the lookup above succeeded, barring a torn write.
    let membership = membership.ok_or_else(|| {
        ApiError::InvariantViolation(
            "participation row missing for the user's current team".to_string(),
        )
    })?;

    let prior_roster_size: i64 = participants
        .filter(team_id.eq(current_team.id))
        .count()
        .get_result(conn)
        .await?;

    diesel::update(participants.filter(id.eq(membership.id)))
        .set(team_id.eq(inviting_team.id))
        .execute(conn)
        .await?;

    if origin_team_abandoned(prior_roster_size) {
        use crate::db::schema::teams::dsl as teams_dsl;
        diesel::delete(teams_dsl::teams.filter(teams_dsl::id.eq(current_team.id)))
            .execute(conn)
            .await?;
        tracing::debug!("deleted empty team {}", current_team.id);
    }

    Ok(())
}

/// User-initiated side of the state machine (`team_consent = false`).
/// Classification and the resulting write share one transaction, so the
/// capacity check cannot be outrun by a concurrent join.
pub async fn request_join(
    ctx: &crate::graphql::Context,
    team_id_input: String,
    pitch: String,
) -> Result<RequestValidity, ApiError> {
    let current_user = ctx.require_authentication()?;
    let team_id_val = Uuid::parse_str(&team_id_input)?;

    let mut conn = ctx.get_db_conn().await;
    conn.transaction::<_, ApiError, _>(|conn| {
        async move {
            let team = teams::verify_team(conn, team_id_val).await?;
            match classify(conn, &team, current_user.user_id).await? {
                RequestValidity::Valid => {
                    record_join_request(
                        conn,
                        &team,
                        current_user.user_id,
                        current_user.user_id,
                        &pitch,
                        false,
                    )
                    .await?;
                    Ok(RequestValidity::Requested)
                }
                RequestValidity::Invited => {
                    // The team already asked; this request is the user's consent.
                    use crate::db::schema::join_requests::dsl::*;
                    diesel::update(
                        join_requests
                            .filter(team_id.eq(team.id))
                            .filter(user_id.eq(current_user.user_id)),
                    )
                    .set(user_consent.eq(true))
                    .execute(conn)
                    .await?;
                    add_user_to_team(conn, current_user.user_id, &team).await?;
                    Ok(RequestValidity::Accepted)
                }
                RequestValidity::Accepted => {
                    add_user_to_team(conn, current_user.user_id, &team).await?;
                    Ok(RequestValidity::Accepted)
                }
                RequestValidity::Requested => Err(ApiError::InvalidTransition(
                    "a join request for this team is already pending".to_string(),
                )),
                RequestValidity::Backwards => Err(ApiError::InvalidTransition(
                    "user is already a member of this team".to_string(),
                )),
                RequestValidity::Full => Err(ApiError::CapacityExceeded(
                    "team is already at the roster cap".to_string(),
                )),
                RequestValidity::Committed => Err(ApiError::InvalidTransition(
                    "user's current team still has other members".to_string(),
                )),
            }
        }
        .scope_boxed()
    })
    .await
}

/// Team-initiated side (`team_consent = true`). The inviting team is the
/// caller's own team in the given competition.
pub async fn invite_to_team(
    ctx: &crate::graphql::Context,
    joiner_id_input: String,
    competition_id_input: String,
    pitch: String,
) -> Result<RequestValidity, ApiError> {
    let current_user = ctx.require_authentication()?;
    let joiner_id_val = Uuid::parse_str(&joiner_id_input)?;
    let competition_id_val = Uuid::parse_str(&competition_id_input)?;

    let mut conn = ctx.get_db_conn().await;
    conn.transaction::<_, ApiError, _>(|conn| {
        async move {
            let inviting_team =
                teams::find_team_of_user(conn, current_user.user_id, competition_id_val)
                    .await?
                    .ok_or_else(|| {
                        ApiError::Unauthorized(
                            "inviter has no team in this competition".to_string(),
                        )
                    })?;

            let joiner: User = {
                use crate::db::schema::users::dsl::*;
                users
                    .find(joiner_id_val)
                    .select(User::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| ApiError::NotFound("user does not exist".to_string()))?
            };

            match classify(conn, &inviting_team, joiner.id).await? {
                RequestValidity::Valid => {
                    record_join_request(
                        conn,
                        &inviting_team,
                        joiner.id,
                        current_user.user_id,
                        &pitch,
                        true,
                    )
                    .await?;
                    Ok(RequestValidity::Invited)
                }
                RequestValidity::Requested => {
                    // The user already asked; the invitation is the team's consent.
                    use crate::db::schema::join_requests::dsl::*;
                    diesel::update(
                        join_requests
                            .filter(team_id.eq(inviting_team.id))
                            .filter(user_id.eq(joiner.id)),
                    )
                    .set(team_consent.eq(true))
                    .execute(conn)
                    .await?;
                    add_user_to_team(conn, joiner.id, &inviting_team).await?;
                    Ok(RequestValidity::Accepted)
                }
                RequestValidity::Accepted => {
                    add_user_to_team(conn, joiner.id, &inviting_team).await?;
                    Ok(RequestValidity::Accepted)
                }
                RequestValidity::Invited => Err(ApiError::InvalidTransition(
                    "this user has already been invited".to_string(),
                )),
                RequestValidity::Backwards => Err(ApiError::InvalidTransition(
                    "user is already a member of this team".to_string(),
                )),
                RequestValidity::Full => Err(ApiError::CapacityExceeded(
                    "team is already at the roster cap".to_string(),
                )),
                RequestValidity::Committed => Err(ApiError::InvalidTransition(
                    "user's current team still has other members".to_string(),
                )),
            }
        }
        .scope_boxed()
    })
    .await
}

/// Either side withdraws; the row and its thread (cascade) go away.
pub async fn cancel_join_request(
    ctx: &crate::graphql::Context,
    join_request_id_input: String,
) -> Result<bool, ApiError> {
    let current_user = ctx.require_authentication()?;
    let join_request_id_val = Uuid::parse_str(&join_request_id_input)?;

    let mut conn = ctx.get_db_conn().await;
    let request: JoinRequest = {
        use crate::db::schema::join_requests::dsl::*;
        join_requests
            .find(join_request_id_val)
            .select(JoinRequest::as_select())
            .first(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("join request does not exist".to_string()))?
    };

    let roster = teams::member_ids(&mut conn, request.team_id).await?;
    if !crosschat::can_participate(request.user_id, &roster, current_user.user_id) {
        return Err(ApiError::Unauthorized(
            "only the joiner or the team may cancel this request".to_string(),
        ));
    }

    {
        use crate::db::schema::join_requests::dsl::*;
        diesel::delete(join_requests.filter(id.eq(request.id)))
            .execute(&mut conn)
            .await?;
    }

    Ok(true)
}

/// Validator exposed to the UI as a plain value.
pub async fn get_join_validity(
    ctx: &crate::graphql::Context,
    team_id_input: String,
) -> Result<RequestValidity, ApiError> {
    let current_user = ctx.require_authentication()?;
    let team_id_val = Uuid::parse_str(&team_id_input)?;
    let mut conn = ctx.get_db_conn().await;
    let team = teams::verify_team(&mut conn, team_id_val).await?;
    classify(&mut conn, &team, current_user.user_id).await
}

#[graphql_object]
impl JoinRequest {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn team_consent(&self) -> bool {
        self.team_consent
    }

    pub fn user_consent(&self) -> bool {
        self.user_consent
    }

    pub fn created_at(&self) -> f64 {
        self.created_at.timestamp() as f64
    }

    pub async fn team(&self, ctx: &crate::graphql::Context) -> Result<Team, ApiError> {
        let mut conn = ctx.get_db_conn().await;
        teams::verify_team(&mut conn, self.team_id).await
    }

    pub async fn user(&self, ctx: &crate::graphql::Context) -> Result<User, ApiError> {
        use crate::db::schema::users::dsl::*;
        Ok(users
            .find(self.user_id)
            .select(User::as_select())
            .first(&mut ctx.get_db_conn().await)
            .await?)
    }

    /// Cross-chat thread; readable by the joiner and current team members.
    pub async fn messages(
        &self,
        ctx: &crate::graphql::Context,
    ) -> Result<Vec<crate::db::models::JoinMessage>, ApiError> {
        crosschat::get_cross_chat_messages_for(ctx, self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Uuid {
        Uuid::now_v7()
    }

    fn snapshot(
        inviting_roster: Vec<Uuid>,
        own_team_size: Option<i64>,
        existing_request: Option<(bool, bool)>,
    ) -> JoinSnapshot {
        JoinSnapshot {
            inviting_roster,
            own_team_size,
            existing_request,
        }
    }

    #[test]
    fn member_of_inviting_team_is_backwards() {
        let joiner = user();
        let snap = snapshot(vec![user(), joiner], Some(1), None);
        assert_eq!(
            classify_snapshot(joiner, &snap).unwrap(),
            RequestValidity::Backwards
        );
    }

    #[test]
    fn full_team_wins_over_existing_request() {
        let joiner = user();
        let roster = vec![user(), user(), user(), user()];
        // Even a fully consented request does not beat the cap check.
        let snap = snapshot(roster, Some(1), Some((true, true)));
        assert_eq!(
            classify_snapshot(joiner, &snap).unwrap(),
            RequestValidity::Full
        );
    }

    #[test]
    fn missing_participation_is_an_authorization_error() {
        let joiner = user();
        let snap = snapshot(vec![user()], None, None);
        assert!(matches!(
            classify_snapshot(joiner, &snap),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn multi_member_origin_team_is_committed() {
        let joiner = user();
        let snap = snapshot(vec![user()], Some(2), None);
        assert_eq!(
            classify_snapshot(joiner, &snap).unwrap(),
            RequestValidity::Committed
        );
    }

    #[test]
    fn consent_flags_map_to_states() {
        let joiner = user();
        let roster = vec![user(), user()];
        let cases = [
            (Some((true, true)), RequestValidity::Accepted),
            (Some((true, false)), RequestValidity::Invited),
            (Some((false, true)), RequestValidity::Requested),
            (Some((false, false)), RequestValidity::Valid),
            (None, RequestValidity::Valid),
        ];
        for (existing, expected) in cases {
            let snap = snapshot(roster.clone(), Some(1), existing);
            assert_eq!(classify_snapshot(joiner, &snap).unwrap(), expected);
        }
    }

    #[test]
    fn solo_origin_team_is_abandoned_after_departure() {
        assert!(origin_team_abandoned(1));
        assert!(!origin_team_abandoned(2));
    }
}
