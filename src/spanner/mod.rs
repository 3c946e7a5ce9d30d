// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Helpers for code reading from a Cloud Spanner database.
//!
//! Data shapes only: no client, no query execution.

pub mod path;
pub mod rows;
pub mod time;

pub use path::database_path;
pub use rows::{collect_rows, first_raw, first_row, RowError};
pub use time::{NullTime, Time};
