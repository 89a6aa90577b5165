// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::graphql_object;

use crate::error::ApiError;

use super::Context;

pub struct Query;

#[graphql_object]
#[graphql(context = Context)]
impl Query {
    fn is_authenticated(context: &Context) -> bool {
        context.is_authenticated()
    }

    async fn me(context: &Context) -> Result<Option<crate::db::models::User>, ApiError> {
        crate::graphql::handlers::users::get_current_user(context).await
    }

    async fn user_by_id(
        context: &Context,
        user_id: String,
    ) -> Result<Option<crate::db::models::User>, ApiError> {
        let user_id = uuid::Uuid::parse_str(&user_id)?;
        crate::graphql::handlers::users::get_user_by_id(user_id, context).await
    }

    async fn user_by_username(
        context: &Context,
        username: String,
    ) -> Result<Option<crate::db::models::User>, ApiError> {
        crate::graphql::handlers::users::get_user_by_username(username, context).await
    }

    async fn competitions(
        context: &Context,
    ) -> Result<Vec<crate::db::models::Competition>, ApiError> {
        crate::graphql::handlers::competitions::get_competitions(context).await
    }

    async fn competition_teams(
        context: &Context,
        competition_id: String,
    ) -> Result<Vec<crate::db::models::Team>, ApiError> {
        crate::graphql::handlers::teams::get_competition_teams(context, competition_id).await
    }

    async fn team_by_id(
        context: &Context,
        team_id: String,
    ) -> Result<crate::db::models::Team, ApiError> {
        crate::graphql::handlers::teams::get_team_by_id(context, team_id).await
    }

    /// The caller's team in one competition, if any.
    async fn my_team(
        context: &Context,
        competition_id: String,
    ) -> Result<Option<crate::db::models::Team>, ApiError> {
        crate::graphql::handlers::teams::get_my_team(context, competition_id).await
    }

    async fn my_participations(
        context: &Context,
    ) -> Result<Vec<crate::graphql::handlers::participations::Participation>, ApiError> {
        crate::graphql::handlers::participations::list_own_participations(context).await
    }

    /// State of a potential join between the caller and a team.
    async fn join_validity(
        context: &Context,
        team_id: String,
    ) -> Result<crate::graphql::handlers::join_requests::RequestValidity, ApiError> {
        crate::graphql::handlers::join_requests::get_join_validity(context, team_id).await
    }

    async fn cross_chats_for_user(
        context: &Context,
        competition_id: String,
    ) -> Result<Vec<crate::graphql::handlers::crosschat::CrossChat>, ApiError> {
        crate::graphql::handlers::crosschat::list_for_user(context, competition_id).await
    }

    async fn cross_chats_for_team(
        context: &Context,
        competition_id: String,
    ) -> Result<Vec<crate::graphql::handlers::crosschat::CrossChat>, ApiError> {
        crate::graphql::handlers::crosschat::list_for_team(context, competition_id).await
    }

    async fn cross_chat_messages(
        context: &Context,
        join_request_id: String,
    ) -> Result<Vec<crate::db::models::JoinMessage>, ApiError> {
        crate::graphql::handlers::crosschat::get_cross_chat_messages(context, join_request_id).await
    }

    async fn team_messages(
        context: &Context,
        team_id: String,
    ) -> Result<Vec<crate::db::models::TeamMessage>, ApiError> {
        crate::graphql::handlers::teams::get_team_messages(context, team_id).await
    }
}
