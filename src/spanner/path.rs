// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

/// Fully qualified database name, as expected by Spanner clients.
pub fn database_path(project: &str, instance: &str, database: &str) -> String {
    format!("projects/{project}/instances/{instance}/databases/{database}")
}
