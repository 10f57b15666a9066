//! SQLite schema for the cleanup job database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};
use anyhow::Result;
use rusqlite::Connection;

// =============================================================================
// Version 1 - Active job and run history
// =============================================================================

/// Active cleanup job. `slot` is always 1, so the UNIQUE constraint allows at
/// most one row.
const CLEANUP_JOBS_TABLE_V1: Table = Table {
    name: "cleanup_jobs",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("slot", &SqlType::Integer, non_null = true, is_unique = true),
        sqlite_column!("due_at", &SqlType::Text, non_null = true),
        sqlite_column!("state", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("started_at", &SqlType::Text),
    ],
    indices: &[],
};

/// Finished cleanup jobs.
const CLEANUP_RUNS_TABLE_V1: Table = Table {
    name: "cleanup_runs",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("job_id", &SqlType::Text, non_null = true),
        sqlite_column!("due_at", &SqlType::Text, non_null = true),
        sqlite_column!("started_at", &SqlType::Text),
        sqlite_column!("finished_at", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("error_message", &SqlType::Text),
        sqlite_column!("deleted_count", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_cleanup_runs_finished_at", "finished_at")],
};

// =============================================================================
// Version 2 - Deferred flag on the active job
// =============================================================================

/// A deferred job only runs while the batch window is open.
const CLEANUP_JOBS_TABLE_V2: Table = Table {
    name: "cleanup_jobs",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("slot", &SqlType::Integer, non_null = true, is_unique = true),
        sqlite_column!("due_at", &SqlType::Text, non_null = true),
        sqlite_column!("state", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("started_at", &SqlType::Text),
        sqlite_column!("deferred", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

// Jobs created before version 2 keep running as soon as they are due.
fn add_deferred_column(conn: &Connection) -> Result<()> {
    conn.execute(
        "ALTER TABLE cleanup_jobs ADD COLUMN deferred INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    Ok(())
}

pub const CLEANUP_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[CLEANUP_JOBS_TABLE_V1, CLEANUP_RUNS_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[CLEANUP_JOBS_TABLE_V2, CLEANUP_RUNS_TABLE_V1],
        migration: Some(add_deferred_column),
    },
];
