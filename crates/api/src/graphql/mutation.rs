// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::graphql_object;

use crate::error::ApiError;
use crate::graphql::handlers::{self, join_requests::RequestValidity, sessions::SessionCredentials};

use super::Context;

pub struct Mutation;

#[graphql_object]
#[graphql(
    context = Context,
)]
impl Mutation {
    async fn login(
        context: &Context,
        username: String,
        password: String,
    ) -> Result<SessionCredentials, ApiError> {
        handlers::users::login_user(username, password, context).await
    }

    async fn create_user(
        context: &Context,
        username: String,
        email: String,
        password: String,
    ) -> Result<bool, ApiError> {
        handlers::users::create_user(username, email, password, context).await
    }

    async fn refresh_session(
        context: &Context,
        refresh_token: String,
    ) -> Result<SessionCredentials, ApiError> {
        handlers::sessions::refresh_session(context, refresh_token).await
    }

    async fn end_session(context: &Context, refresh_token: String) -> Result<bool, ApiError> {
        handlers::sessions::end_session(context, refresh_token).await
    }

    async fn create_competition(
        context: &Context,
        name: String,
        starts_at: f64,
        ends_at: f64,
        prize_pool: Option<String>,
    ) -> Result<crate::db::models::Competition, ApiError> {
        handlers::competitions::create_competition(context, name, starts_at, ends_at, prize_pool)
            .await
    }

    async fn create_team(
        context: &Context,
        competition_id: String,
        name: String,
    ) -> Result<crate::db::models::Team, ApiError> {
        handlers::teams::create_team(context, competition_id, name).await
    }

    /// Ask to join a team. If the team already invited the caller, this
    /// doubles as acceptance and moves the caller onto the team.
    async fn request_join(
        context: &Context,
        team_id: String,
        pitch: String,
    ) -> Result<RequestValidity, ApiError> {
        handlers::join_requests::request_join(context, team_id, pitch).await
    }

    /// Invite a user onto the caller's team. If the user already asked to
    /// join, this doubles as acceptance.
    async fn invite_to_team(
        context: &Context,
        joiner_id: String,
        competition_id: String,
        pitch: String,
    ) -> Result<RequestValidity, ApiError> {
        handlers::join_requests::invite_to_team(context, joiner_id, competition_id, pitch).await
    }

    async fn cancel_join_request(
        context: &Context,
        join_request_id: String,
    ) -> Result<bool, ApiError> {
        handlers::join_requests::cancel_join_request(context, join_request_id).await
    }

    async fn send_team_message(
        context: &Context,
        team_id: String,
        body: String,
    ) -> Result<crate::db::models::TeamMessage, ApiError> {
        handlers::teams::send_team_message(context, team_id, body).await
    }

    async fn send_cross_chat_message(
        context: &Context,
        join_request_id: String,
        body: String,
    ) -> Result<crate::db::models::JoinMessage, ApiError> {
        handlers::crosschat::send_cross_chat_message(context, join_request_id, body).await
    }
}
