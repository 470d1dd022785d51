//! Registry services.
//!
//! # Responsibility
//! - Orchestrate repository calls into registry operations.
//! - Run every uniqueness/existence check and its write in one unit of work.
//! - Keep request layers decoupled from storage details.

pub mod cohort_service;
pub mod consistency;
pub mod error;
pub mod identity_service;
pub mod member_service;
