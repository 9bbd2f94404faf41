//! Report renderers for compatibility results.
//!
//! - [`terminal`]: colored summary box and tables; respects `--verbose` / `--quiet`.
//! - [`export`]: JSON document with the module tree, dependency licenses and issues.

pub mod export;
pub mod terminal;
