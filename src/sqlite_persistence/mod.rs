mod schema;
mod sqlite_store;
mod versioned_schema;

pub use sqlite_store::SqliteStore;
pub use versioned_schema::{
    Column, ForeignKey, ForeignKeyOnChange, Index, SqlType, Table, VersionedSchema,
    BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};
