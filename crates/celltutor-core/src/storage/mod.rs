//! Persistent Storage Layer — SQLite WAL
//!
//! Append-only registry for cell-agent manifests and quiz attempts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Registry                    │
//! ├──────────────────────────────────────────────┤
//! │   cell_agents            │   attempts        │
//! │   (manifest JSON by id)  │   (quiz results)  │
//! └──────────────────────────────────────────────┘
//!      ↓ one connection per operation, WAL mode
//! ```
//!
//! # Example
//!
//! ```no_run
//! use celltutor_core::storage::Registry;
//!
//! # fn example() -> celltutor_core::Result<()> {
//! let registry = Registry::open("celltutor.db")?;
//! let missing = registry.get_manifest("no-such-id")?;
//! assert!(missing.is_none());
//! # Ok(())
//! # }
//! ```

pub mod registry;

pub use registry::{ManifestSummary, Registry, RegistryStats};
