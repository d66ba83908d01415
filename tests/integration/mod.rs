//! Integration tests for a full monitoring day
//!
//! These tests drive the orchestrator end to end against temporary folders,
//! with windows opened a second ago and closing a few seconds from now.

pub mod helpers;
pub mod scenarios;
