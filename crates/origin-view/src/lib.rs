//! View orchestration for the Origin template engine.
//!
//! The view layer binds together the pieces a render needs:
//!
//! - [`View`]: the entry point. Resolves a qualified template name through
//!   its registered [`Loader`]s, drives the applicable engines to compile
//!   the raw content, and executes the result — consulting the disk cache
//!   on the way in and writing compiled output back on the way out.
//! - [`Sandbox`]: the isolated execution context. Compiled template code
//!   can only read the variables and collaborators explicitly bound to it.
//! - [`FileLoader`]: sources templates from directories on disk, mapping
//!   file extensions to engine names.
//! - [`LocaleProvider`] and [`ResourceRouter`]: the external collaborators
//!   `translate` and `resource_path` constructs call at render time.
//!
//! Cache failures are treated as transient: a locked or unwritable cache
//! degrades a render to uncached compilation and execution rather than
//! failing it. Broken templates, on the other hand, always surface to the
//! caller.

mod error;
mod loaders;
mod sandbox;
mod view;

pub use error::ViewError;
pub use loaders::FileLoader;
pub use loaders::Loader;
pub use sandbox::LocaleProvider;
pub use sandbox::ResourceRouter;
pub use sandbox::Sandbox;
pub use view::View;
