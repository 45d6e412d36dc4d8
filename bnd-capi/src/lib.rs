//! bnd-capi: C++ class → C API binding generator.
//!
//! Parses C++ headers via libclang and emits an ABI-stable C header of opaque
//! handles and free functions, plus the C++ source that forwards each function
//! to the wrapped class.
//!
//! # Quick start
//!
//! Generate `cwrapper.h` / `cwrapper.cpp` from a config (suitable for `build.rs`):
//!
//! ```no_run
//! use std::path::Path;
//!
//! // Reads config TOML, parses headers, writes both files next to the config.
//! bnd_capi::run(Path::new("bnd-capi.toml"), None).unwrap();
//! ```
//!
//! Or get the rendered text without writing to disk:
//!
//! ```no_run
//! use std::path::Path;
//!
//! let output = bnd_capi::generate(Path::new("bnd-capi.toml")).unwrap();
//! println!("{}", output.header);
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

pub mod allow_list;
pub mod config;
pub mod convert;
pub mod custom;
pub mod descriptor;
pub mod driver;
pub mod emit;
pub mod extract;
pub mod model;

pub use emit::{GeneratedFiles, Output};

/// Run the full pipeline: load config, parse the C++ headers, generate the
/// bindings, and write both output files.
///
/// `out_dir` overrides the directory the files are written to; by default
/// the output paths in the config are resolved against the config's parent
/// directory.
pub fn run(config_path: &Path, out_dir: Option<&Path>) -> Result<GeneratedFiles> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let output = generate_from_config(&cfg, base_dir)?;

    let dir = out_dir.unwrap_or(base_dir);
    emit::write_outputs(
        &output,
        &dir.join(&cfg.output.header),
        &dir.join(&cfg.output.source),
    )
}

/// Parse a `bnd-capi.toml` config file and return the rendered header and
/// source without writing to disk.
pub fn generate(config_path: &Path) -> Result<Output> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    generate_from_config(&cfg, base_dir)
}

/// Generate bindings from an already-loaded [`config::Config`].
///
/// `base_dir` is the directory relative to which header and allow-list paths
/// in the config are resolved (typically the parent directory of the TOML
/// file).
pub fn generate_from_config(cfg: &config::Config, base_dir: &Path) -> Result<Output> {
    let allow_list = cfg.allow_list(base_dir)?;
    let handlers = cfg.handlers();
    info!(
        headers = cfg.headers.len(),
        classes = allow_list.len(),
        handlers = handlers.len(),
        "loaded configuration"
    );

    let clang =
        clang::Clang::new().map_err(|e| anyhow::anyhow!("failed to initialize libclang: {e}"))?;
    let index = clang::Index::new(&clang, false, false);

    let program = extract::extract_program(&index, cfg, base_dir)?;
    let bindings = driver::generate_bindings(&program, &allow_list, &handlers);

    let headers = cfg.resolved_headers(base_dir);
    let guard = headers
        .first()
        .map(|h| emit::guard_name(h))
        .unwrap_or_else(|| emit::guard_name(&cfg.output.header));

    let mut includes: Vec<String> = headers.iter().map(|h| h.display().to_string()).collect();
    includes.extend(cfg.output.includes.iter().cloned());

    let header_name = cfg
        .output
        .header
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cfg.output.header.display().to_string());

    let output = Output {
        header: emit::render_header(&bindings, &guard),
        source: emit::render_source(&bindings, &header_name, &includes),
    };

    info!(
        converted = bindings.stats.converted,
        dropped = bindings.stats.dropped,
        header_bytes = output.header.len(),
        source_bytes = output.source.len(),
        "generated bindings"
    );

    Ok(output)
}
