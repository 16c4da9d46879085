pub mod jti_entries;

pub use jti_entries::PgJtiStore;
