mod versioned_schema;

pub use versioned_schema::{
    create_or_migrate, Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
};
