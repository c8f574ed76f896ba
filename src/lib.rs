//! # swaggerc
//!
//! **swaggerc** is the front-end of a Swagger 2.0 code generator. It loads a spec,
//! validates and flattens it, then resolves every schema into a language-neutral
//! generation model that a renderer turns into source files.
//!
//! ## Architecture
//!
//! - **[`spec`]** - loading, order annotation, validation and flattening
//! - **[`typemap`]** - the table of primitive types and string formats
//! - **[`resolver`]** - schema → [`resolver::ResolvedType`], external type overrides
//!   and the registry of known definitions
//! - **[`generator`]** - definition and operation models, renderers and dumps
//! - **[`config`]** - generation options and their layering
//! - **[`cli`]** - the `swaggerc` command line
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Pipeline
//!
//! ```mermaid
//! sequenceDiagram
//!     participant CLI as CLI<br/>(swaggerc)
//!     participant Pre as spec::preprocess
//!     participant Reg as resolver::KnownDefinitions
//!     participant Gen as generator::build_models
//!     participant R as Renderer
//!
//!     CLI->>Pre: load, annotate order, validate
//!     Pre->>Pre: flatten (minimal | full | expand)
//!     Pre-->>CLI: Preprocessed
//!     CLI->>Reg: register every definition
//!     CLI->>Gen: resolve definitions and operations
//!     Gen-->>CLI: GenerationOutput
//!     CLI->>R: render or dump
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use swaggerc::config::GenOpts;
//! use swaggerc::generator::{run, DirectoryRenderer};
//!
//! let opts = GenOpts { spec: Some("swagger.yaml".into()), ..GenOpts::default() };
//! let mut renderer = DirectoryRenderer::new("generated", opts.dump_format);
//! let output = run(&opts, &mut renderer)?;
//! println!("{} definitions, {} operations", output.definitions.len(), output.operations.len());
//! ```
//!
//! ## Errors
//!
//! Library operations return [`error::GenError`]. Validation collects every issue
//! before failing, and model building wraps failures with the definition or
//! operation being built.

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod naming;
pub mod resolver;
pub mod spec;
pub mod typemap;

pub use config::GenOpts;
pub use error::{GenError, Result};
