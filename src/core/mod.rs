//! Core library components.
//!
//! This module contains the workflow engine and the pieces it sequences:
//! credentials, variable merging, provider mirror setup, command execution,
//! locking, and plan artifacts.

pub mod confirm;
pub mod constants;
pub mod credentials;
pub mod environment;
pub mod lock;
pub mod merge;
pub mod mirror;
pub mod plan;
pub mod runner;
pub mod settings;
pub mod target;
pub mod tool;
pub mod variables;
pub mod workflow;
