//! Saffron Core - Shared types library.
//!
//! This crate provides the primitive types used across all Saffron
//! components:
//! - `storefront` - Client library and CLI for the Saffron commerce backend
//! - `integration-tests` - End-to-end tests against stub collaborators
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no
//! persistence. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, amounts, emails, and
//!   statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
