use std::collections::HashMap;
use std::sync::Arc;

use origin_cache::Disk;
use origin_conf::Settings;
use origin_templates::Engine;
use origin_templates::NullEngine;
use origin_templates::OriginEngine;
use origin_templates::TemplateSource;

use crate::error::ViewError;
use crate::loaders::FileLoader;
use crate::loaders::Loader;
use crate::sandbox::LocaleProvider;
use crate::sandbox::ResourceRouter;
use crate::sandbox::Sandbox;

/// View wrapper.
///
/// Binds the disk cache, the template engines and the template loaders
/// together and drives the sandbox on the caller's behalf. Configure one by
/// hand:
///
/// ```ignore
/// let mut view = View::new();
/// view.set_cache(Some(Disk::new("/var/cache/app/views", Some("ovs"))));
/// view.add_loader(FileLoader::new(vec!["templates".into()]));
/// view.add_engine("origin", OriginEngine::new());
/// view.add_engine("html", NullEngine);
/// view.set_variable("thing", "value");
///
/// let rendered = view.render("static_pages.index")?;
/// ```
///
/// or from layered configuration with [`View::from_settings`].
pub struct View {
    cache: Option<Disk>,
    engines: HashMap<String, Box<dyn Engine>>,
    loaders: Vec<Box<dyn Loader>>,
    variables: HashMap<String, String>,
    locale: Option<Arc<dyn LocaleProvider>>,
    router: Option<Arc<dyn ResourceRouter>>,
}

impl View {
    #[must_use]
    pub fn new() -> Self {
        View {
            cache: None,
            engines: HashMap::new(),
            loaders: Vec::new(),
            variables: HashMap::new(),
            locale: None,
            router: None,
        }
    }

    /// A view wired up from settings: a file loader over the configured
    /// template directories, the disk cache if one is configured, and the
    /// stock engines (`origin` for template compilation, `html` passing
    /// static content through).
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut view = Self::new();

        view.add_loader(FileLoader::new(settings.templates.directories.clone()));
        if let Some(directory) = &settings.cache.directory {
            let extension = match settings.cache.file_extension.as_str() {
                "" => None,
                extension => Some(extension),
            };
            view.set_cache(Some(Disk::with_modes(
                directory.clone(),
                extension,
                settings.cache.directory_mode,
                settings.cache.file_mode,
            )));
        }
        view.add_engine("origin", OriginEngine::new());
        view.add_engine("html", NullEngine);

        view
    }

    /// Register a view engine under the name loaders refer to it by (the
    /// file extension, for file-based loaders).
    pub fn add_engine(&mut self, name: impl Into<String>, engine: impl Engine + 'static) {
        self.engines.insert(name.into(), Box::new(engine));
    }

    /// Register a view loader. Loaders are consulted in registration order.
    pub fn add_loader(&mut self, loader: impl Loader + 'static) {
        self.loaders.push(Box::new(loader));
    }

    /// Set the disk cache, or `None` to disable caching.
    pub fn set_cache(&mut self, cache: Option<Disk>) {
        self.cache = cache;
    }

    #[must_use]
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Bind a variable for the templates rendered by this view. Template
    /// code runs inside a sandbox, not the surrounding program scope, so
    /// only names bound here are readable from templates.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn set_locale(&mut self, locale: Arc<dyn LocaleProvider>) {
        self.locale = Some(locale);
    }

    pub fn set_router(&mut self, router: Arc<dyn ResourceRouter>) {
        self.router = Some(router);
    }

    /// The raw contents of a template plus the engine names that apply to
    /// it, from the first loader that can resolve the name.
    pub fn raw_template(&self, qualified_name: &str) -> Result<(String, Vec<String>), ViewError> {
        for loader in &self.loaders {
            if let Some(loaded) = loader.load(qualified_name)? {
                return Ok(loaded);
            }
        }

        Err(ViewError::NoMatchingTemplate(qualified_name.to_string()))
    }

    /// Compile a template to executable script source by passing its raw
    /// contents through each applicable engine in order.
    pub fn compile(&self, qualified_name: &str) -> Result<String, ViewError> {
        let (mut contents, engine_names) = self.raw_template(qualified_name)?;

        for name in engine_names {
            let engine = self
                .engines
                .get(&name)
                .ok_or_else(|| ViewError::NoSuchEngine(name.clone()))?;
            contents = engine.compile(self, qualified_name, &contents)?;
        }

        Ok(contents)
    }

    /// Render a view.
    ///
    /// Tries the cache first, compiling and writing back on a miss.
    /// Cache-layer failures degrade to uncached compile-and-execute;
    /// compilation and execution errors always propagate — they indicate a
    /// broken template and must not be swallowed.
    pub fn render(&self, qualified_name: &str) -> Result<String, ViewError> {
        let Some(cache) = &self.cache else {
            let contents = self.compile(qualified_name)?;
            return self.execute(&contents);
        };

        let mut sandbox = self.sandbox();
        match sandbox.load_compiled(cache, qualified_name) {
            Ok(()) => {
                tracing::debug!("rendered '{qualified_name}' from cache");
                Ok(sandbox.contents().to_string())
            }
            Err(ViewError::CacheMiss(_)) => {
                tracing::debug!("cache miss for '{qualified_name}'; compiling");
                let contents = self.compile(qualified_name)?;

                match cache.put(qualified_name, &contents) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!("cache write for '{qualified_name}' skipped: entry locked");
                    }
                    Err(error) => {
                        tracing::warn!("cache write for '{qualified_name}' failed: {error}");
                    }
                }

                self.execute(&contents)
            }
            Err(error) => Err(error),
        }
    }

    fn execute(&self, contents: &str) -> Result<String, ViewError> {
        let mut sandbox = self.sandbox();
        sandbox.load_source(contents)?;
        Ok(sandbox.contents().to_string())
    }

    fn sandbox(&self) -> Sandbox {
        let mut sandbox = Sandbox::new();
        sandbox.set_variables(self.variables.clone());
        if let Some(locale) = &self.locale {
            sandbox.set_locale(Arc::clone(locale));
        }
        if let Some(router) = &self.router {
            sandbox.set_router(Arc::clone(router));
        }
        sandbox
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

/// The parser reaches back through the view to source parent and partial
/// templates while compiling (`extend`, `form`).
impl TemplateSource for View {
    fn raw_template(&self, qualified_name: &str) -> anyhow::Result<String> {
        let (contents, _engines) =
            View::raw_template(self, qualified_name).map_err(anyhow::Error::new)?;
        Ok(contents)
    }
}
