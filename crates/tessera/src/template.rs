//! Compiled templates.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use tessera_syntax::{parse, Node};
use tracing::debug;

use crate::context::{Context, Scope};
use crate::error::{Error, Result};
use crate::eval::Renderer;
use crate::loader::{Loader, Source};
use crate::options::Options;
use crate::value::Value;

/// A compiled template.
///
/// Compilation happens once; the template can then be rendered any number of
/// times, from any number of threads, each render with its own context.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use tessera::Template;
///
/// let template = Template::new("{{ for n in numbers }}{{ n }};{{ end }}").unwrap();
/// assert_eq!(template.render(&json!({"numbers": [1, 2, 3]})).unwrap(), "1;2;3;");
/// assert_eq!(template.render(&json!({"numbers": []})).unwrap(), "");
/// ```
pub struct Template {
    name: Option<String>,
    root: Node,
    options: Options,
    loader: Option<Arc<dyn Loader>>,
    /// Compiled includes, keyed by the path written in this template.
    includes: RwLock<HashMap<String, Arc<Template>>>,
}

impl Template {
    /// Compiles `source` with default options.
    pub fn new(source: &str) -> Result<Self> {
        Self::with_options(source, Options::default())
    }

    pub fn with_options(source: &str, options: Options) -> Result<Self> {
        Self::compile(None, source, options, None)
    }

    /// Compiles `source` with a loader for its `include` directives.
    pub fn with_loader(source: &str, options: Options, loader: Arc<dyn Loader>) -> Result<Self> {
        Self::compile(None, source, options, Some(loader))
    }

    pub(crate) fn load(source: Source, options: Options, loader: Arc<dyn Loader>) -> Result<Self> {
        Self::compile(Some(source.name), &source.text, options, Some(loader))
    }

    fn compile(
        name: Option<String>,
        source: &str,
        options: Options,
        loader: Option<Arc<dyn Loader>>,
    ) -> Result<Self> {
        debug!(
            name = name.as_deref().unwrap_or("<inline>"),
            bytes = source.len(),
            "compiling template"
        );
        let root = parse(source, options.parse_options())?;
        Ok(Self {
            name,
            root,
            options,
            loader,
            includes: RwLock::new(HashMap::new()),
        })
    }

    /// Sets the name that `./` include paths are resolved against.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Renders with values taken from any serializable map-like value.
    ///
    /// `()` and `None` render with no values.
    pub fn render<S: Serialize + ?Sized>(&self, values: &S) -> Result<String> {
        let scope = match Value::from_serialize(values)? {
            Value::Map(map) => map.into_iter().collect(),
            Value::None => Scope::new(),
            other => {
                return Err(Error::invalid(format!(
                    "render values must be a map, got {}",
                    other.kind()
                )))
            }
        };
        self.render_scope(scope, 0)
    }

    /// Renders with values given directly, which may include [`Value::Object`]s.
    pub fn render_values<I, K>(&self, values: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let scope = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.render_scope(scope, 0)
    }

    /// Renders with `values` above this template's locals.
    pub(crate) fn render_scope(&self, values: Scope, depth: usize) -> Result<String> {
        let locals: Scope = self
            .options
            .locals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut ctx = Context::new(locals);
        ctx.push(values);
        Renderer::new(self, ctx, depth).render(&self.root)
    }

    /// Returns the compiled template for an `include` path, compiling it on first use.
    pub(crate) fn include(&self, path: &str) -> Result<Arc<Template>> {
        let cached = self
            .includes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned();
        if let Some(child) = cached {
            return Ok(child);
        }

        let loader = self
            .loader
            .clone()
            .ok_or_else(|| Error::NoLoader(path.to_string()))?;
        let source = loader.resolve(path, self.name())?;
        debug!(
            path,
            resolved = %source.name,
            parent = self.name().unwrap_or("<inline>"),
            "compiling include"
        );
        let child = Arc::new(Template::load(
            source,
            self.options.for_include(),
            loader,
        )?);

        self.includes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), child.clone());
        Ok(child)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use serde_json::json;

    #[test]
    fn renders_serializable_values() {
        let template = Template::new("Hello {{ name }}!").unwrap();
        assert_eq!(template.render(&json!({"name": "World"})).unwrap(), "Hello World!");
    }

    #[test]
    fn unit_means_no_values() {
        let template = Template::new("plain").unwrap();
        assert_eq!(template.render(&()).unwrap(), "plain");
    }

    #[test]
    fn non_map_values_are_rejected() {
        let template = Template::new("x").unwrap();
        let err = template.render(&json!([1, 2])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid operation: render values must be a map, got list"
        );
    }

    #[test]
    fn render_values_shadow_locals() {
        let options = Options::new().local("who", "locals").local("site", "x.org");
        let template = Template::with_options("{{ who }}@{{ site }}", options).unwrap();
        assert_eq!(template.render(&()).unwrap(), "locals@x.org");
        assert_eq!(
            template.render_values([("who", Value::from("values"))]).unwrap(),
            "values@x.org"
        );
    }

    #[test]
    fn compile_errors_are_returned() {
        assert!(Template::new("{{ if x }}").is_err());
    }

    #[test]
    fn includes_are_compiled_once() {
        let loader = Arc::new(MemoryLoader::new().add("part.txt", "<{{ n }}>"));
        let template = Template::with_loader(
            "{{ for i in [1, 2] }}{{ include \"part.txt\" n = i }}{{ end }}",
            Options::default(),
            loader,
        )
        .unwrap();

        assert_eq!(template.render(&()).unwrap(), "<1><2>");
        assert_eq!(template.includes.read().unwrap().len(), 1);
    }

    #[test]
    fn include_without_loader() {
        let template = Template::new("{{ include \"x.txt\" }}").unwrap();
        assert!(matches!(
            template.render(&()),
            Err(Error::NoLoader(path)) if path == "x.txt"
        ));
    }

    #[test]
    fn debug_output_names_template() {
        let template = Template::new("").unwrap().named("page.html");
        assert!(format!("{:?}", template).contains("page.html"));
        assert_eq!(template.name(), Some("page.html"));
    }
}
