//! Command-line driver for the dcfsim valuation engine
//!
//! Loads a YAML variable registry, runs it through [`dcfsim_core`] against a
//! demo discounted-cash-flow model and renders the results:
//! - Registry files in YAML (`storage`)
//! - The DCF valuation function (`dcf`)
//! - Text reports and JSON export (`report`, `export`)
//! - Logging to stderr or a size-capped file (`logging`)

// ============================================================================
// Driver modules
// ============================================================================

pub mod cli;
pub mod commands;
pub mod dcf;
pub mod export;
pub mod logging;
pub mod report;
pub mod storage;
pub mod util;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use commands::execute;
pub use dcf::{DcfAssumptions, DcfModel};
pub use logging::init_logging;
pub use storage::{StorageError, load_registry, parse_registry, save_registry};
