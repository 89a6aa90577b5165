// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::IpAddr;

use juniper::EmptySubscription;
pub use mutation::Mutation;
pub use query::Query;

use crate::db::models::UserRole;
use crate::error::ApiError;

pub mod auth;
mod handlers;
mod mutation;
mod query;

#[derive(Clone)]
pub struct BaseContext {
    pub db_pool: diesel_async::pooled_connection::bb8::Pool<diesel_async::AsyncPgConnection>,
    pub keypair: ed25519_dalek::SigningKey,
}

pub struct Context {
    base: BaseContext,
    ip: IpAddr,
    user_agent: String,
    pub user: Option<AuthenticatedUser>,
}

impl juniper::Context for Context {}

/// Identity resolved from the request's Bearer token. All mutations start
/// from this; an absent identity fails with Unauthorized.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: uuid::Uuid,
    pub role: UserRole,
    pub username: String,
}

impl Context {
    pub fn new(
        base: BaseContext,
        ip: IpAddr,
        user_agent: String,
        user_details: Option<AuthenticatedUser>,
    ) -> Self {
        Self {
            base,
            ip,
            user_agent,
            user: user_details,
        }
    }

    pub async fn get_db_conn(
        &self,
    ) -> diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>
    {
        self.base
            .db_pool
            .get()
            .await
            .expect("Failed to get DB connection")
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn role(&self) -> Option<UserRole> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn require_role_min(&self, required_role: UserRole) -> Result<(), ApiError> {
        match &self.role() {
            Some(user_role) if user_role >= &required_role => Ok(()),
            _ => Err(ApiError::Unauthorized(
                "Insufficient permissions".to_string(),
            )),
        }
    }

    pub fn require_authentication(&self) -> Result<AuthenticatedUser, ApiError> {
        if let Some(user) = &self.user {
            Ok(user.clone())
        } else {
            Err(ApiError::Unauthorized(
                "Authentication required".to_string(),
            ))
        }
    }

    pub fn get_ip(&self) -> &IpAddr {
        &self.ip
    }

    pub fn get_user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn get_signing_key(&self) -> &ed25519_dalek::SigningKey {
        &self.base.keypair
    }
}

pub type Schema = juniper::RootNode<Query, Mutation, EmptySubscription<Context>>;
