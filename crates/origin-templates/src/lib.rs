//! Origin template compilation.
//!
//! This crate turns the raw text of an Origin template into executable
//! script source through a multi-stage pipeline:
//!
//! 1. **Lexing**: raw text is split into `{% ... %}` block, `{{ ... }}`
//!    variable and literal text tokens.
//! 2. **Parsing**: the token stream is consumed left to right into a node
//!    list, dispatching block commands through a registry. Template
//!    inheritance is resolved here: `extend` splices the parent template's
//!    tokens into the stream, and `block`/`yield` meet through the parser's
//!    block store.
//! 3. **Rendering**: each node appends statements to a [`ScriptFile`],
//!    producing the compiled source a sandbox executes against a bound
//!    variable scope.
//!
//! ## Key components
//!
//! - [`Lexer`] and [`Token`]: tokenization
//! - [`Parser`], [`CommandRegistry`] and [`CommandKind`]: parsing and
//!   command dispatch
//! - [`Node`], [`NodeList`] and [`ScriptFile`]: code generation
//! - [`Engine`], [`OriginEngine`] and [`NullEngine`]: the pluggable
//!   transformer seam the view layer drives
//! - [`TemplateSource`]: where the parser sources other templates during
//!   compilation
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//!
//! use origin_templates::Engine;
//! use origin_templates::OriginEngine;
//!
//! let templates: HashMap<String, String> = HashMap::new();
//! let engine = OriginEngine::new();
//! let script = engine
//!     .compile(&templates, "pages.home", "Hello, {{ name }}!")
//!     .unwrap();
//! assert!(script.contains("echo vars[\"name\"]"));
//! ```

mod codegen;
mod commands;
mod engine;
mod error;
mod lexer;
mod nodes;
mod parser;
mod tokens;

pub use codegen::Literal;
pub use codegen::ScriptFile;
pub use codegen::SCRIPT_MARKER;
pub use commands::CommandKind;
pub use commands::CommandRegistry;
pub use engine::Engine;
pub use engine::NullEngine;
pub use engine::OriginEngine;
pub use engine::TemplateSource;
pub use error::TemplateError;
pub use lexer::Lexer;
pub use nodes::Node;
pub use nodes::NodeList;
pub use parser::Parser;
pub use tokens::Token;
