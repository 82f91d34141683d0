//! Relational layout of the core store.

use super::versioned_schema::{
    ForeignKey, ForeignKeyOnChange, Index, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use crate::sqlite_column;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_active",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

const USER_PASSWORD_CREDENTIALS_TABLE_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[],
};

const SESSIONS_TABLE_V_0: Table = Table {
    name: "sessions",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("token", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer, non_null = true),
        sqlite_column!("device_class", &SqlType::Text, non_null = true),
    ],
    indices: &[
        Index {
            name: "idx_sessions_user_id",
            columns: &["user_id"],
            unique: false,
            predicate: None,
        },
        Index {
            name: "idx_sessions_expires_at",
            columns: &["expires_at"],
            unique: false,
            predicate: None,
        },
    ],
};

const RESUMES_TABLE_V_0: Table = Table {
    name: "resumes",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("file_name", &SqlType::Text, non_null = true),
        sqlite_column!("file_path", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("uploaded_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        Index {
            name: "idx_resumes_one_active_per_user",
            columns: &["user_id"],
            unique: true,
            predicate: Some("status IN ('PENDING', 'IN_REVIEW')"),
        },
        Index {
            name: "idx_resumes_status_uploaded_at",
            columns: &["status", "uploaded_at"],
            unique: false,
            predicate: None,
        },
    ],
};

const RESUME_REVIEWS_TABLE_V_0: Table = Table {
    name: "resume_reviews",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "resume_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "resumes",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "reviewer_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Restrict,
            })
        ),
        sqlite_column!("comments", &SqlType::Text, non_null = true),
        sqlite_column!("reviewed_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[Index {
        name: "idx_resume_reviews_resume_id",
        columns: &["resume_id"],
        unique: false,
        predicate: None,
    }],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_TABLE_V_0,
        SESSIONS_TABLE_V_0,
        RESUMES_TABLE_V_0,
        RESUME_REVIEWS_TABLE_V_0,
    ],
    migration: None,
}];
