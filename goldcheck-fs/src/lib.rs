//! Filesystem abstraction for goldcheck.
//!
//! This crate provides:
//! - `Filesystem` trait for reads, atomic writes, recursive listing and lock files
//! - `RealFilesystem` backed by `std::fs`
//! - `MockFilesystem`, an in-memory implementation for deterministic tests

pub mod filesystem;

pub use filesystem::{Filesystem, FsError, MockFilesystem, RealFilesystem};
