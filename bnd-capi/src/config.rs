//! Configuration types for `bnd-capi.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::allow_list::AllowList;
use crate::custom::{HandlerRegistry, SharedHandle};

/// Root configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    /// C++ headers to parse, in traversal order.
    pub headers: Vec<PathBuf>,
    /// File listing the classes to wrap, one name per line.
    #[serde(default)]
    pub allow_list: Option<PathBuf>,
    /// Classes to wrap, appended after the ones read from `allow_list`.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Additional directories to search when resolving header paths.  Each
    /// entry is tried in order after `base_dir` (the TOML file's parent
    /// directory).  Also injected as `-I` flags for clang.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    #[serde(default = "default_clang_args")]
    pub clang_args: Vec<String>,
    /// Extra reference-counted wrapper templates, handled like
    /// `std::shared_ptr`.
    ///
    /// ```toml
    /// [[shared_handle]]
    /// namespace = "android"
    /// name = "sp"
    /// ```
    #[serde(default)]
    pub shared_handle: Vec<SharedHandleConfig>,
}

/// Output file names, relative to the output directory.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_header")]
    pub header: PathBuf,
    #[serde(default = "default_source")]
    pub source: PathBuf,
    /// Extra `#include` lines for the generated source, after the parsed
    /// headers.
    #[serde(default)]
    pub includes: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            source: default_source(),
            includes: Vec::new(),
        }
    }
}

fn default_header() -> PathBuf {
    PathBuf::from("cwrapper.h")
}

fn default_source() -> PathBuf {
    PathBuf::from("cwrapper.cpp")
}

fn default_clang_args() -> Vec<String> {
    ["-x", "c++", "-std=c++17"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct SharedHandleConfig {
    /// Enclosing namespace, `::`-separated; empty for global templates.
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl Config {
    /// Header paths resolved against `base_dir` and the include paths.
    pub fn resolved_headers(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.headers
            .iter()
            .map(|h| resolve_header(h, base_dir, &self.include_paths))
            .collect()
    }

    /// Merge the allow-list file (if any) with the inline `classes`.
    pub fn allow_list(&self, base_dir: &Path) -> Result<AllowList> {
        let mut list = match &self.allow_list {
            Some(path) => AllowList::load(&base_dir.join(path))?,
            None => AllowList::default(),
        };
        list.extend(self.classes.iter());
        if list.is_empty() {
            bail!("no classes to wrap: set `allow_list` or `classes`");
        }
        Ok(list)
    }

    /// Built-in handlers followed by the configured shared wrappers.
    pub fn handlers(&self) -> HandlerRegistry {
        let mut registry = HandlerRegistry::with_defaults();
        for sh in &self.shared_handle {
            registry.register(Box::new(SharedHandle::new(&sh.namespace, &sh.name)));
        }
        registry
    }
}

/// Resolve a header path by searching `base_dir` first, then each
/// `include_paths` entry.  Absolute paths are returned as-is.  If the
/// file is not found anywhere, falls back to `base_dir.join(path)` so
/// that the caller gets a meaningful error from clang.
pub fn resolve_header(path: &Path, base_dir: &Path, include_paths: &[PathBuf]) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let candidate = base_dir.join(path);
    if candidate.exists() {
        return candidate;
    }
    include_paths
        .iter()
        .map(|inc| inc.join(path))
        .find(|c| c.exists())
        .unwrap_or(candidate)
}

/// Load and parse a `bnd-capi.toml` configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("failed to parse config file {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}
