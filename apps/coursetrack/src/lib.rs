//! # coursetrack
//!
//! Service layer over `coursetrack-core`: configuration, date rendering and
//! the HTTP API. The `coursetrack` binary adds the CLI on top.

pub mod api;
pub mod config;
pub mod dates;
