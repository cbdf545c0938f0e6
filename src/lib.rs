//! Stagetrack - client stage and task progress tracking
//!
//! This library provides the core functionality for Stagetrack, including:
//! - Database operations and migrations
//! - Data models for client stages, tasks, and templates
//! - Repository layer for data access
//! - Working-day deadline calculation
//! - Board controller with command dispatch, selection, and reordering
//! - Stage copy/paste through an in-memory and system clipboard chain
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use stagetrack::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod badge;
pub mod board;
pub mod cli;
pub mod clipboard;
pub mod db;
pub mod error;
pub mod models;
pub mod progress;
pub mod reorder;
pub mod repo;
pub mod store;
pub mod templates;
pub mod workdays;
