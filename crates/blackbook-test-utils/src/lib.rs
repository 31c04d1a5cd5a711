//! Shared test utilities for the blackbook workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only and is never published.
//!
//! # Modules
//!
//! - [`env`]: [`TestEnv`](env::TestEnv) sandbox with a source repo, config
//!   directory, cache directory and fake home

pub mod env;

pub use env::TestEnv;
