//! Tessera - a small embeddable template engine.
//!
//! Templates are plain text with `{{ ... }}` directives. A source is compiled
//! once into a [`Template`] and rendered any number of times with different
//! values.
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//!
//! let page = tessera::compile(r#"
//! <h1>{{ title | capitalize }}</h1>
//! {{ for item in items }}
//! <li>{{ item.name }}{{ if item.done }} (done){{ end }}</li>
//! {{ end }}
//! "#).unwrap();
//!
//! let out = page.render(&json!({
//!     "title": "todo",
//!     "items": [
//!         {"name": "write <docs>", "done": true},
//!         {"name": "ship", "done": false},
//!     ],
//! })).unwrap();
//!
//! assert_eq!(out, "\n<h1>Todo</h1>\n<li>write &lt;docs&gt; (done)</li>\n<li>ship</li>\n");
//! ```
//!
//! # Syntax
//!
//! | Directive | Meaning |
//! |-----------|---------|
//! | `{{ expr }}` | output, HTML-escaped unless disabled |
//! | `{{ set name = expr }}` | bind `name` in the innermost scope |
//! | `{{ if c }}...{{ elif c }}...{{ else }}...{{ end }}` | conditional |
//! | `{{ for x in xs }}...{{ end }}` | loop, one fresh scope per iteration |
//! | `{{ include "path" key = expr }}` | render another template with only `key` bound |
//! | `{{# comment #}}` | dropped |
//!
//! Expressions support literals (`1`, `2.5`, `"text"`, `true`, `none`,
//! `[a, b]`), attribute access (`a.b`, `a.0`, `a[key]`), filters
//! (`value | filter: arg`), comparisons and `and`/`or`. The grammar itself
//! lives in [`tessera_syntax`].
//!
//! # Escaping
//!
//! With [`Options::autoescape`] on (the default) every output is HTML-escaped.
//! Values marked safe, with the `noescape` filter or [`Value::safe`], are
//! written as they are.
//!
//! # Filters
//!
//! Filters live in a process-wide registry. Register custom filters before
//! rendering; see [`register_filter`] and the [`filters`] module for the
//! built-in set.
//!
//! # Includes
//!
//! A template needs a [`Loader`] to render `include`. Use
//! [`FileLoader`] for a directory of files or [`MemoryLoader`] for templates
//! held in memory.

mod context;
mod error;
mod escape;
mod eval;
pub mod filters;
mod loader;
mod options;
mod template;
mod value;

pub use context::{Context, Scope};
pub use error::{Error, ErrorKind, Result};
pub use escape::{escape_html, EscapePolicy};
pub use filters::{apply_filter, filter_names, register_filter, unregister_filter, Filter};
pub use loader::{resolve_name, FileLoader, Loader, MemoryLoader, Source};
pub use options::{Options, DEFAULT_MAX_INCLUDE_DEPTH};
pub use template::Template;
pub use value::{Object, Value};

pub use tessera_syntax::{Position, SyntaxError};

use serde::Serialize;

/// Compiles a template with default options.
pub fn compile(source: &str) -> Result<Template> {
    Template::new(source)
}

pub fn compile_with(source: &str, options: Options) -> Result<Template> {
    Template::with_options(source, options)
}

/// Compiles and renders `source` once.
///
/// ```rust
/// let out = tessera::render("{{ 1 | add: 2 }}", &()).unwrap();
/// assert_eq!(out, "3");
/// ```
pub fn render<S: Serialize + ?Sized>(source: &str, values: &S) -> Result<String> {
    compile(source)?.render(values)
}
