//! Template loaders used to resolve `include` paths.
//!
//! A loader maps a path, plus the name of the template doing the including, to
//! source text. Both loaders here use the same naming rules:
//!
//! - names are `/`-separated and relative to the loader's root
//! - a path starting with `./` or `../` is relative to the directory of the
//!   including template; any other path is relative to the root
//! - a path that climbs above the root does not exist
//!
//! # Example
//!
//! ```rust
//! use tessera::MemoryLoader;
//!
//! let loader = MemoryLoader::new()
//!     .add("pages/index.html", "{{ include \"./nav.html\" current = \"home\" }}")
//!     .add("pages/nav.html", "[{{ current }}]");
//!
//! let template = loader.get("pages/index.html").unwrap();
//! assert_eq!(template.render(&()).unwrap(), "[home]");
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::options::Options;
use crate::template::Template;

/// Source text returned by a loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Normalized name, used to resolve the template's own relative includes.
    pub name: String,
    pub text: String,
}

/// Resolves include paths to template sources.
pub trait Loader: Send + Sync {
    /// Loads `path`, as written in an `include` inside the template named
    /// `relative_to` (`None` for a template that was not loaded by name).
    fn resolve(&self, path: &str, relative_to: Option<&str>) -> Result<Source>;
}

/// Computes the normalized name of `path`.
///
/// Returns `None` when the path climbs above the root.
pub fn resolve_name(path: &str, relative_to: Option<&str>) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();

    let is_relative = path.starts_with("./") || path.starts_with("../");
    if is_relative {
        if let Some(parent) = relative_to {
            parts.extend(parent.split('/').filter(|p| !p.is_empty()));
            // drop the including template's own file name
            parts.pop();
        }
    }

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Loads templates from files under a base directory.
#[derive(Debug, Clone)]
pub struct FileLoader {
    basedir: PathBuf,
    options: Options,
}

impl FileLoader {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            options: Options::default(),
        }
    }

    /// Options for templates compiled by [`FileLoader::get`].
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn basedir(&self) -> &std::path::Path {
        &self.basedir
    }

    /// Loads and compiles `path` as a top-level template bound to this loader.
    pub fn get(&self, path: &str) -> Result<Template> {
        let source = self.resolve(path, None)?;
        Template::load(source, self.options.clone(), Arc::new(self.clone()))
    }
}

impl Loader for FileLoader {
    fn resolve(&self, path: &str, relative_to: Option<&str>) -> Result<Source> {
        let name = resolve_name(path, relative_to).ok_or_else(|| Error::TemplateNotFound {
            path: path.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "path leaves the template directory"),
        })?;
        let file = self.basedir.join(&name);
        debug!(path, file = %file.display(), "loading template file");

        let text = fs::read_to_string(&file).map_err(|source| Error::TemplateNotFound {
            path: path.to_string(),
            source,
        })?;
        Ok(Source { name, text })
    }
}

/// Loads templates from an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
    options: Options,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template. The name is normalized like an include path.
    pub fn add(mut self, name: &str, source: impl Into<String>) -> Self {
        let name = resolve_name(name, None).unwrap_or_else(|| name.to_string());
        self.templates.insert(name, source.into());
        self
    }

    /// Options for templates compiled by [`MemoryLoader::get`].
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Compiles `path` as a top-level template bound to this loader.
    pub fn get(&self, path: &str) -> Result<Template> {
        let source = self.resolve(path, None)?;
        Template::load(source, self.options.clone(), Arc::new(self.clone()))
    }
}

impl Loader for MemoryLoader {
    fn resolve(&self, path: &str, relative_to: Option<&str>) -> Result<Source> {
        let found = resolve_name(path, relative_to)
            .and_then(|name| self.templates.get(&name).map(|text| (name, text)));
        match found {
            Some((name, text)) => Ok(Source {
                name,
                text: text.clone(),
            }),
            None => Err(Error::not_found(path)),
        }
    }
}
