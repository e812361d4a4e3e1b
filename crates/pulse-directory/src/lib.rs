//! # pulse-directory
//!
//! Credential validation for the pulse relay:
//!
//! - [`CredentialDirectory`] is the seam to the external key directory,
//!   with an HTTP-backed implementation and an in-memory one for tests
//!   and local development
//! - [`CredentialGate`] runs the full admission check (key presence,
//!   directory lookup, production-mode origin comparison) once per
//!   connection, before any registry mutation
//!
//! The gate only reads; it never mutates directory or registry state.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod gate;
pub mod origin;

pub use client::{CredentialDirectory, CredentialRecord, HttpDirectory, StaticDirectory};
pub use errors::{DirectoryError, RejectReason};
pub use gate::CredentialGate;
