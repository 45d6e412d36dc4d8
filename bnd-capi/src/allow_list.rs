//! The set of classes the generator is permitted to wrap.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

/// Ordered, de-duplicated class names. Read once at start-up.
#[derive(Debug, Default, Clone)]
pub struct AllowList {
    names: Vec<String>,
    index: HashSet<String>,
}

impl AllowList {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        list.extend(names);
        list
    }

    /// Load a plain-text allow list: one class name per line, blank lines and
    /// `#` comments ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading allow list {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        Self::from_names(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if self.index.insert(name.clone()) {
                self.names.push(name);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
