// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{
    db::{
        models::{NewUser, User, UserRole},
        schema::users,
    },
    error::ApiError,
    graphql::{Context, handlers::sessions::SessionCredentials},
};
use argon2::{
    Argon2, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use juniper::graphql_object;
use rand_core::OsRng;

#[graphql_object]
impl User {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn email(&self, ctx: &Context) -> Result<String, ApiError> {
        if ctx
            .user
            .as_ref()
            .is_some_and(|u| u.user_id == self.id || u.role == UserRole::Admin)
        {
            Ok(self.email.clone())
        } else {
            Err(ApiError::Unauthorized(
                "Permission denied to view email".to_string(),
            ))
        }
    }
}

pub async fn create_user(
    username: String,
    email: String,
    password: String,
    context: &Context,
) -> Result<bool, ApiError> {
    // The very first account becomes the admin.
    let mut role = UserRole::Player;
    let user_count = users::table
        .count()
        .get_result::<i64>(&mut context.get_db_conn().await)
        .await?;
    if user_count == 0 {
        role = UserRole::Admin;
    }

    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let new_user = NewUser {
        username: username.clone(),
        display_name: username,
        password_hash: argon2
            .hash_password(password.as_bytes(), &salt)?
            .to_string(),
        email,
        role,
        avatar_url: None,
        is_active: true,
    };

    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(&mut context.get_db_conn().await)
        .await?;

    Ok(true)
}

pub async fn login_user(
    username: String,
    password: String,
    context: &Context,
) -> Result<SessionCredentials, ApiError> {
    let user = users::table
        .filter(users::username.eq(&username))
        .select(User::as_select())
        .first(&mut context.get_db_conn().await)
        .await
        .optional()?;
    match user {
        Some(user) => {
            let parsed_hash = argon2::PasswordHash::new(&user.password_hash)?;
            if Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
            {
                let signing_key = context.get_signing_key().clone();
                crate::graphql::handlers::sessions::create_session(
                    context,
                    user.id,
                    user.role,
                    user.username,
                    &signing_key,
                )
                .await
            } else {
                Err(ApiError::Unauthorized(
                    "Invalid username or password".to_string(),
                ))
            }
        }
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}

pub async fn get_current_user(context: &Context) -> Result<Option<User>, ApiError> {
    let Some(authenticated) = &context.user else {
        return Ok(None);
    };
    Ok(users::table
        .find(authenticated.user_id)
        .select(User::as_select())
        .first(&mut context.get_db_conn().await)
        .await
        .optional()?)
}

pub async fn get_user_by_id(
    user_id: uuid::Uuid,
    context: &Context,
) -> Result<Option<User>, ApiError> {
    Ok(users::table
        .find(user_id)
        .select(User::as_select())
        .first(&mut context.get_db_conn().await)
        .await
        .optional()?)
}

pub async fn get_user_by_username(
    username: String,
    context: &Context,
) -> Result<Option<User>, ApiError> {
    Ok(users::table
        .filter(users::username.eq(&username))
        .select(User::as_select())
        .first(&mut context.get_db_conn().await)
        .await
        .optional()?)
}
