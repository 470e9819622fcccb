//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate access checks and repository calls into use-case APIs.
//! - Keep outer layers (HTTP, importers, schedulers) decoupled from
//!   storage and decision details.
//!
//! # Invariants
//! - Authorization is evaluated before any mutation is attempted.
//! - Services never bypass repository validation/persistence contracts.

pub mod board_service;
pub mod enrollment_service;
pub mod identity_service;
