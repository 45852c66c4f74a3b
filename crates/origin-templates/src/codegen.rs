use std::fmt;

/// First line of every generated script.
///
/// This is what distinguishes executable script source from plain content:
/// a sandbox treats input without this marker as literal text to emit
/// verbatim, the way static templates flow through untouched.
pub const SCRIPT_MARKER: &str = "# Origin template.";

/// Leading content prepended to every generated script.
///
/// Each line must survive execution unchanged, so all commentary stays
/// behind `#` markers the sandbox skips.
const HEADER: &str = "\
# Origin template.
#
# This file is compiled automatically from the application's views. Any
# changes made here will be overwritten the next time the views are
# recompiled.";

/// A source-level literal in the generated script.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    /// Render the literal as it appears in generated source: strings are
    /// double-quoted with `\\`, `\"`, `\n`, `\r` and `\t` escapes, booleans
    /// and numbers appear as-is.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Literal::Str(value) => {
                let mut out = String::with_capacity(value.len() + 2);
                out.push('"');
                for ch in value.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        _ => out.push(ch),
                    }
                }
                out.push('"');
                out
            }
            Literal::Bool(value) => value.to_string(),
            Literal::Int(value) => value.to_string(),
            Literal::Float(value) => value.to_string(),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

/// Generated-source accumulator.
///
/// A vastly oversimplified interface to generating executable script source
/// from within view engines: helpers for argument lists, function calls and
/// statements, and an append-only content buffer. The generated source is
/// intended to be stored in a disk cache or executed immediately in a
/// sandbox.
#[derive(Clone, Debug)]
pub struct ScriptFile {
    content: String,
}

impl ScriptFile {
    /// Set up an empty file containing the standard header.
    #[must_use]
    pub fn new() -> Self {
        ScriptFile {
            content: HEADER.to_string(),
        }
    }

    /// Append arbitrary content on a new line.
    pub fn add_content(&mut self, content: &str) {
        self.content.push('\n');
        self.content.push_str(content);
    }

    /// Append a statement built from a name and a pre-formatted expression.
    pub fn add_statement(&mut self, name: &str, expression: &str) {
        self.add_content(&Self::statement(name, expression));
    }

    /// Append a call to the given function.
    pub fn add_function_call(&mut self, callee: &str, arguments: &[Literal]) {
        self.add_content(&Self::function_call(callee, arguments));
    }

    /// Assemble an argument list from a slice of literals, joined by `, `.
    #[must_use]
    pub fn argument_list(arguments: &[Literal]) -> String {
        arguments
            .iter()
            .map(Literal::render)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The syntax of a call to `callee` with the given arguments.
    #[must_use]
    pub fn function_call(callee: &str, arguments: &[Literal]) -> String {
        format!("{callee}({})", Self::argument_list(arguments))
    }

    /// The syntax of a statement: the name alone, or the name followed by
    /// its expression.
    #[must_use]
    pub fn statement(name: &str, expression: &str) -> String {
        if expression.is_empty() {
            name.to_string()
        } else {
            format!("{name} {expression}")
        }
    }

    /// The syntax of a lookup against the sandbox's bound variable scope.
    ///
    /// Templates can only read names explicitly bound by the caller; this
    /// is the isolation boundary, so nodes must never emit any other form
    /// of variable access.
    #[must_use]
    pub fn variable_reference(name: &str) -> String {
        format!("vars[{}]", Literal::from(name).render())
    }

    /// The raw generated source for this instance.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn into_source(self) -> String {
        self.content
    }
}

impl Default for ScriptFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScriptFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}
