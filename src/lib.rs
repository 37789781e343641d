//! txt2sql - natural-language questions answered from a PostgreSQL database.
//!
//! This library exposes the core modules for use by the binary and the
//! integration tests.

pub mod agent;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod safety;
