//! Incremental build-and-run tool for single-file programs.
//!
//! Given one entry source file, `gorun` discovers the local packages it
//! imports, works out which compiled objects are stale, drives the external
//! compiler, linker, and archiver to rebuild only those, and then runs (or
//! debugs) the resulting binary.
//!
//! The pipeline is split into small layers:
//!
//! - [`source`] parses the package clause and imports of a file.
//! - [`env`] memoises those records for one invocation.
//! - [`target`] resolves the dependency graph and builds it in order.
//! - [`script`] strips `#!` headers so scripts can be compiled.
//! - [`runner`] ties everything to the command line and spawns processes.

pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod fs;
pub mod runner;
pub mod script;
pub mod source;
pub mod target;
