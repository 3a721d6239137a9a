//! Database migrations - embedded SQL files
//!
//! Each migration is a (filename, sql) tuple, applied in order.
//! New migrations get the next NNN_description.sql name and an entry here.

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
