// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Google Cloud helpers for Rust services.
//!
//! ## Modules
//!
//! - `auth` - Bearer-token gate for Google service account identity tokens
//! - `s2s` - Outbound client that authenticates with metadata server tokens
//! - `spanner` - Database path, row and timestamp helpers
//! - `api` - HTTP surface of the `gcloud-gate` server (Axum)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod s2s;
pub mod spanner;
pub mod state;
