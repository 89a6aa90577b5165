// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod competitions;
pub mod crosschat;
pub mod join_requests;
pub mod participations;
pub mod sessions;
pub mod teams;
pub mod users;
