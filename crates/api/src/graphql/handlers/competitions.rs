// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::graphql_object;
use slugify::slugify;

use crate::db::models::{Competition, NewCompetition, UserRole};
use crate::error::ApiError;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

#[graphql_object]
impl Competition {
    pub fn id(&self) -> String {
        self.id.to_string()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    // GraphQL has no 64-bit integers, so timestamps go out as floats.
    pub fn starts_at(&self) -> f64 {
        self.starts_at.timestamp() as f64
    }

    pub fn ends_at(&self) -> f64 {
        self.ends_at.timestamp() as f64
    }

    pub fn prize_pool(&self) -> Option<&str> {
        self.prize_pool.as_deref()
    }

    pub async fn team_count(&self, ctx: &crate::graphql::Context) -> Result<i32, ApiError> {
        use crate::db::schema::teams::dsl::*;
        let count: i64 = teams
            .filter(competition_id.eq(self.id))
            .count()
            .get_result(&mut ctx.get_db_conn().await)
            .await?;
        Ok(count as i32)
    }
}

pub async fn get_competitions(
    ctx: &crate::graphql::Context,
) -> Result<Vec<Competition>, ApiError> {
    use crate::db::schema::competitions::dsl::*;
    Ok(competitions
        .order(starts_at.asc())
        .select(Competition::as_select())
        .load(&mut ctx.get_db_conn().await)
        .await?)
}

pub async fn create_competition(
    ctx: &crate::graphql::Context,
    name_input: String,
    starts_at_input: f64,
    ends_at_input: f64,
    prize_pool_input: Option<String>,
) -> Result<Competition, ApiError> {
    ctx.require_role_min(UserRole::Admin)?;

    let starts_at_val = chrono::DateTime::from_timestamp(starts_at_input as i64, 0)
        .ok_or_else(|| ApiError::InvalidTransition("invalid start timestamp".to_string()))?;
    let ends_at_val = chrono::DateTime::from_timestamp(ends_at_input as i64, 0)
        .ok_or_else(|| ApiError::InvalidTransition("invalid end timestamp".to_string()))?;
    if ends_at_val <= starts_at_val {
        return Err(ApiError::InvalidTransition(
            "competition must end after it starts".to_string(),
        ));
    }

    let new_competition = NewCompetition {
        slug: slugify!(&name_input),
        name: name_input,
        starts_at: starts_at_val,
        ends_at: ends_at_val,
        prize_pool: prize_pool_input,
    };

    use crate::db::schema::competitions::dsl::*;
    Ok(diesel::insert_into(competitions)
        .values(&new_competition)
        .returning(Competition::as_returning())
        .get_result(&mut ctx.get_db_conn().await)
        .await?)
}
