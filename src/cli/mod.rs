//! # CLI Module
//!
//! Command-line front-end for the compiler.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Preprocess a spec, build the generation models and write them out, one file
//! per model under `<output>/<package>/`:
//!
//! ```bash
//! swaggerc generate --spec swagger.yaml --output generated
//! ```
//!
//! With `--dump-only` nothing is written; the whole model set is printed to
//! stdout instead.
//!
//! ### `validate`
//!
//! Report every structural problem of a spec. Exits non-zero on errors:
//!
//! ```bash
//! swaggerc validate --spec swagger.yaml
//! ```
//!
//! ### `flatten`
//!
//! Print the preprocessed document:
//!
//! ```bash
//! swaggerc flatten --spec swagger.yaml --flatten full --format yaml
//! ```
//!
//! ## Option Layering
//!
//! `generate` options come from, in increasing priority: built-in defaults,
//! `swaggerc.toml` (from `--config` or next to the spec), `SWAGGERC_*`
//! environment variables, then flags.

mod commands;


pub use commands::{generation_options, run_cli, Cli, Commands, FlattenArgs, GenerateArgs};
