//! Filesystem primitives for Blackbook
//!
//! Provides path-spec resolution, crash-safe atomic writes, cross-process
//! locking, content fingerprints and format-agnostic config I/O. Every other
//! crate mutates persisted state exclusively through this crate.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod lock;
pub mod path;
pub mod tree;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use lock::{LockGuard, LockPolicy, with_lock, with_lock_policy};
pub use path::{NormalizedPath, expand_home, is_glob, is_url, resolve};
