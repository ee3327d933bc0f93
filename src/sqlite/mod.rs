// SQLite adapter for the engine primitive.
//
// - connection: the owned rusqlite connection, its blocking bridge and control statements
// - params: conversion between `SqlValue` and rusqlite values
// - query: row materialization

pub mod connection;
pub mod params;
pub mod query;

use async_trait::async_trait;

use crate::engine::{Control, RunOutcome, SqlEngine};
use crate::error::WebSqlError;
use crate::results::Row;
use crate::types::SqlValue;

pub use connection::SqliteEngine;

#[async_trait]
impl SqlEngine for SqliteEngine {
    async fn exec(&self, control: Control) -> Result<(), WebSqlError> {
        self.control(control).await
    }

    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, WebSqlError> {
        self.select(sql, params).await
    }

    async fn run(&self, sql: &str, params: &[SqlValue]) -> Result<RunOutcome, WebSqlError> {
        self.dml(sql, params).await
    }
}
