//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and scalar helpers
//! - Progress reporting for long-running loads
//! - Logging utilities

pub mod logging;
pub mod math;
pub mod progress;
