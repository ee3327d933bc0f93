mod core;
mod dml;
mod guard;
mod select;
mod tx;

pub(crate) use self::core::run_blocking;
pub use self::core::SqliteEngine;
