// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use diesel::associations::Identifiable;
use diesel::prelude::*;
use juniper::GraphQLEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::*;

#[derive(
    diesel_derive_enum::DbEnum,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    Ord,
    PartialOrd,
    GraphQLEnum,
)]
#[DbValueStyle = "UPPERCASE"]
#[ExistingTypePath = "crate::db::schema::sql_types::UserRole"]
pub enum UserRole {
    Player,
    Admin,
}

/* =========================
 * USERS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub email: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub email: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub is_active: bool,
}

/* =========================
 * SESSIONS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Associations, Debug)]
#[diesel(table_name = sessions)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<ipnet::IpNet>,
    pub session_token: String,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub user_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<ipnet::IpNet>,
    pub session_token: String,
}

/* =========================
 * COMPETITIONS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Debug)]
#[diesel(table_name = competitions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Competition {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub prize_pool: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = competitions)]
pub struct NewCompetition {
    pub name: String,
    pub slug: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub prize_pool: Option<String>,
}

/* =========================
 * TEAMS
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = teams)]
#[diesel(belongs_to(Competition))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Team {
    pub id: Uuid,
    pub competition_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = teams)]
pub struct NewTeam {
    pub competition_id: Uuid,
    pub name: String,
}

/* =========================
 * PARTICIPANTS
 * ========================= */

// One row per (user, competition); the team pointer is reassigned when a
// join request is accepted.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug)]
#[diesel(table_name = participants)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Team))]
#[diesel(belongs_to(Competition))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Participant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub competition_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = participants)]
pub struct NewParticipant {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub competition_id: Uuid,
}

/* =========================
 * JOIN REQUESTS
 * ========================= */

// Mutual-consent proposal to move a user onto a team. The side that created
// the row has its consent flag set; the row becomes actionable once both
// flags are true.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug)]
#[diesel(table_name = join_requests)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Team))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JoinRequest {
    pub id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub team_consent: bool,
    pub user_consent: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = join_requests)]
pub struct NewJoinRequest {
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub team_consent: bool,
    pub user_consent: bool,
}

/* =========================
 * JOIN MESSAGES (cross chat)
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Associations, Debug)]
#[diesel(table_name = join_messages)]
#[diesel(belongs_to(JoinRequest))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JoinMessage {
    pub id: Uuid,
    pub join_request_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = join_messages)]
pub struct NewJoinMessage {
    pub join_request_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
}

/* =========================
 * TEAM MESSAGES
 * ========================= */

#[derive(Queryable, Selectable, Identifiable, Associations, Debug)]
#[diesel(table_name = team_messages)]
#[diesel(belongs_to(Team))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TeamMessage {
    pub id: Uuid,
    pub team_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = team_messages)]
pub struct NewTeamMessage {
    pub team_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
}
