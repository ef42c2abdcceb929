//! Droplink Core - Shared types and pure logic.
//!
//! This crate provides the domain model and the pure parts of the Droplink
//! service, used by the other workspace components:
//! - `server` - Public pages, creator API, provider webhooks
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows
//! it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Plan tiers, themes, profiles, products, event types
//! - [`sanitize`] - The public-boundary sanitization layer
//! - [`inventory`] - Derived product availability and drop timers
//! - [`validate`] - Plan-quota validation for profile payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod inventory;
pub mod sanitize;
pub mod types;
pub mod validate;

pub use types::*;
