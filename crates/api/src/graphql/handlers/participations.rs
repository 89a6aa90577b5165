// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use juniper::graphql_object;

use crate::db::models::{Competition, Participant, Team};
use crate::error::ApiError;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

/// A user's membership in one competition, with the referenced rows resolved.
pub struct Participation {
    pub participant: Participant,
    pub team: Team,
    pub competition: Competition,
}

#[graphql_object]
#[graphql(context = crate::graphql::Context)]
impl Participation {
    pub fn id(&self) -> String {
        self.participant.id.to_string()
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn competition(&self) -> &Competition {
        &self.competition
    }

    pub fn joined_at(&self) -> f64 {
        self.participant.created_at.timestamp() as f64
    }
}

/// All participations of the calling user, across competitions.
///
/// Rows whose team or competition no longer exists are skipped rather than
/// failing the whole listing.
pub async fn list_own_participations(
    ctx: &crate::graphql::Context,
) -> Result<Vec<Participation>, ApiError> {
    let current_user = ctx.require_authentication()?;
    let mut conn = ctx.get_db_conn().await;

    let rows: Vec<Participant> = {
        use crate::db::schema::participants::dsl::*;
        participants
            .filter(user_id.eq(current_user.user_id))
            .select(Participant::as_select())
            .load(&mut conn)
            .await?
    };

    let mut out = Vec::with_capacity(rows.len());
    for participant in rows {
        let team: Option<Team> = {
            use crate::db::schema::teams::dsl::*;
            teams
                .find(participant.team_id)
                .select(Team::as_select())
                .first(&mut conn)
                .await
                .optional()?
        };
        let Some(team) = team else {
            tracing::debug!(
                "skipping participation {} with dangling team reference",
                participant.id
            );
            continue;
        };
        let competition: Option<Competition> = {
            use crate::db::schema::competitions::dsl::*;
            competitions
                .find(participant.competition_id)
                .select(Competition::as_select())
                .first(&mut conn)
                .await
                .optional()?
        };
        let Some(competition) = competition else {
            tracing::debug!(
                "skipping participation {} with dangling competition reference",
                participant.id
            );
            continue;
        };
        out.push(Participation {
            participant,
            team,
            competition,
        });
    }

    Ok(out)
}
