//! Kin benchmarking suite
//!
//! Benchmarks for peer-dependency resolution and for parsing the formats kin
//! reads: versions, ranges, `package.json` and `kin.toml`.

pub mod common;

pub use common::*;
