use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::sync::Arc;

use origin_cache::Disk;
use origin_templates::SCRIPT_MARKER;

use crate::error::ViewError;

/// Locale collaborator consulted by `translate` statements at render time.
pub trait LocaleProvider {
    fn translate(&self, key: &str) -> String;
}

/// Router collaborator consulted by `resource_path` statements at render
/// time.
pub trait ResourceRouter {
    fn resource_path_for(&self, resource: &str, action: &str) -> String;
}

/// Execution harness for compiled template code.
///
/// The sandbox interprets the line-oriented script the engine generates,
/// capturing the text it produces. As a means of containment, script code
/// can only read variables explicitly bound with [`set_variables`] and the
/// collaborators bound with [`set_locale`]/[`set_router`] — never anything
/// from the surrounding program.
///
/// Bind variables before loading; construct one sandbox per render.
///
/// [`set_variables`]: Sandbox::set_variables
/// [`set_locale`]: Sandbox::set_locale
/// [`set_router`]: Sandbox::set_router
#[derive(Default)]
pub struct Sandbox {
    contents: String,
    variables: HashMap<String, String>,
    locale: Option<Arc<dyn LocaleProvider>>,
    router: Option<Arc<dyn ResourceRouter>>,
}

impl Sandbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the variables available within the template.
    pub fn set_variables(&mut self, variables: HashMap<String, String>) {
        self.variables = variables;
    }

    pub fn set_locale(&mut self, locale: Arc<dyn LocaleProvider>) {
        self.locale = Some(locale);
    }

    pub fn set_router(&mut self, router: Arc<dyn ResourceRouter>) {
        self.router = Some(router);
    }

    /// The rendered contents of the template.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Execute a cached, pre-compiled script sourced from the disk cache.
    ///
    /// Failing to read the entry is a [`ViewError::CacheMiss`], which tells
    /// the view layer to compile the template instead. Faults raised while
    /// executing a successfully read entry propagate as themselves — a bad
    /// cached script is not a miss.
    pub fn load_compiled(&mut self, cache: &Disk, index: &str) -> Result<(), ViewError> {
        let filename = cache.filename(index);
        let Ok(source) = fs::read_to_string(filename.as_std_path()) else {
            return Err(ViewError::CacheMiss(index.to_string()));
        };

        self.execute(&source)
    }

    /// Execute raw script source directly.
    ///
    /// Considerably slower than sourcing pre-compiled content from the
    /// cache, but needed when the cache is disabled and as the fallback
    /// when a cache entry cannot be written — for instance when another
    /// writer holds the lock, or the cache directory is not writable.
    pub fn load_source(&mut self, source: &str) -> Result<(), ViewError> {
        self.execute(source)
    }

    fn execute(&mut self, source: &str) -> Result<(), ViewError> {
        // Content that doesn't open with the script marker is not code:
        // it flowed through an identity engine (static markup, say) and is
        // emitted exactly as-is.
        if !source.starts_with(SCRIPT_MARKER) {
            self.contents = source.to_string();
            return Ok(());
        }

        let mut output = String::new();

        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some(rest) = line.strip_prefix("echo") else {
                return Err(ViewError::Script(format!("unrecognized statement: {line}")));
            };
            if !rest.starts_with(char::is_whitespace) {
                return Err(ViewError::Script(format!("unrecognized statement: {line}")));
            }

            output.push_str(&self.eval(rest.trim())?);
        }

        self.contents = output;
        Ok(())
    }

    fn eval(&self, expression: &str) -> Result<String, ViewError> {
        if expression.starts_with('"') {
            let (value, rest) = parse_string_literal(expression)?;
            expect_exhausted(rest, expression)?;
            return Ok(value);
        }

        if let Some(rest) = expression.strip_prefix("vars[") {
            let (name, rest) = parse_string_literal(rest.trim_start())?;
            if rest.trim() != "]" {
                return Err(ViewError::Script(format!(
                    "malformed variable reference: {expression}"
                )));
            }
            return self
                .variables
                .get(&name)
                .cloned()
                .ok_or(ViewError::MissingVariable(name));
        }

        if let Some(arguments) = call_arguments(expression, "locale.translate")? {
            let [key] = take_arguments(arguments, expression)?;
            let locale = self
                .locale
                .as_ref()
                .ok_or(ViewError::MissingBinding("locale"))?;
            return Ok(locale.translate(&key));
        }

        if let Some(arguments) = call_arguments(expression, "router.resource_path")? {
            let [resource, action] = take_arguments(arguments, expression)?;
            let router = self
                .router
                .as_ref()
                .ok_or(ViewError::MissingBinding("router"))?;
            return Ok(router.resource_path_for(&resource, &action));
        }

        Err(ViewError::Script(format!(
            "unrecognized expression: {expression}"
        )))
    }
}

impl fmt::Display for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.contents)
    }
}

/// Parse the argument list of `callee(...)`, or `None` when the expression
/// is not a call to `callee`.
fn call_arguments(expression: &str, callee: &str) -> Result<Option<Vec<String>>, ViewError> {
    let Some(rest) = expression.strip_prefix(callee) else {
        return Ok(None);
    };
    let Some(rest) = rest.trim_start().strip_prefix('(') else {
        return Ok(None);
    };

    let mut arguments = Vec::new();
    let mut rest = rest.trim_start();
    if let Some(after) = rest.strip_prefix(')') {
        expect_exhausted(after, expression)?;
        return Ok(Some(arguments));
    }

    loop {
        let (value, remainder) = parse_string_literal(rest)?;
        arguments.push(value);

        rest = remainder.trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
        } else if let Some(after) = rest.strip_prefix(')') {
            expect_exhausted(after, expression)?;
            return Ok(Some(arguments));
        } else {
            return Err(ViewError::Script(format!(
                "malformed argument list: {expression}"
            )));
        }
    }
}

fn take_arguments<const N: usize>(
    arguments: Vec<String>,
    expression: &str,
) -> Result<[String; N], ViewError> {
    <[String; N]>::try_from(arguments)
        .map_err(|_| ViewError::Script(format!("wrong number of arguments: {expression}")))
}

/// Parse a leading double-quoted string literal, returning its unescaped
/// value and the remainder of the input.
fn parse_string_literal(input: &str) -> Result<(String, &str), ViewError> {
    let mut chars = input.char_indices();
    if chars.next().map(|(_, ch)| ch) != Some('"') {
        return Err(ViewError::Script(format!("expected string literal: {input}")));
    }

    let mut value = String::new();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => return Ok((value, &input[index + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, 't')) => value.push('\t'),
                Some((_, other)) => {
                    return Err(ViewError::Script(format!("unknown escape '\\{other}'")));
                }
                None => break,
            },
            _ => value.push(ch),
        }
    }

    Err(ViewError::Script(format!(
        "unterminated string literal: {input}"
    )))
}

fn expect_exhausted(rest: &str, expression: &str) -> Result<(), ViewError> {
    if rest.trim().is_empty() {
        Ok(())
    } else {
        Err(ViewError::Script(format!(
            "trailing content after expression: {expression}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UpperLocale;

    impl LocaleProvider for UpperLocale {
        fn translate(&self, key: &str) -> String {
            key.to_uppercase()
        }
    }

    struct JoinRouter;

    impl ResourceRouter for JoinRouter {
        fn resource_path_for(&self, resource: &str, action: &str) -> String {
            format!("/{resource}/{action}")
        }
    }

    fn variables(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    /// Prefix statements with the marker so they execute as script.
    fn script(body: &str) -> String {
        format!("{SCRIPT_MARKER}\n{body}")
    }

    #[test]
    fn echoes_string_literals() {
        let mut sandbox = Sandbox::new();
        sandbox.load_source(&script("echo \"it works\"")).unwrap();
        assert_eq!(sandbox.contents(), "it works");
    }

    #[test]
    fn unmarked_content_is_emitted_verbatim() {
        let mut sandbox = Sandbox::new();
        sandbox.load_source("<p>echo \"not code\"</p>\n").unwrap();
        assert_eq!(sandbox.contents(), "<p>echo \"not code\"</p>\n");
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let mut sandbox = Sandbox::new();
        sandbox
            .load_source(&script("\n   # indented comment\necho \"x\""))
            .unwrap();
        assert_eq!(sandbox.contents(), "x");
    }

    #[test]
    fn unescapes_string_literals() {
        let mut sandbox = Sandbox::new();
        sandbox
            .load_source(&script("echo \"a \\\"b\\\"\\n\\\\c\""))
            .unwrap();
        assert_eq!(sandbox.contents(), "a \"b\"\n\\c");
    }

    #[test]
    fn resolves_bound_variables() {
        let mut sandbox = Sandbox::new();
        sandbox.set_variables(variables(&[("output", "some text")]));
        sandbox.load_source(&script("echo vars[\"output\"]")).unwrap();
        assert_eq!(sandbox.contents(), "some text");
    }

    #[test]
    fn unbound_variable_is_fatal() {
        let mut sandbox = Sandbox::new();
        let error = sandbox.load_source(&script("echo vars[\"x\"]")).unwrap_err();
        assert!(matches!(error, ViewError::MissingVariable(name) if name == "x"));
        assert_eq!(sandbox.contents(), "");
    }

    #[test]
    fn dispatches_locale_calls() {
        let mut sandbox = Sandbox::new();
        sandbox.set_locale(Arc::new(UpperLocale));
        sandbox
            .load_source(&script("echo locale.translate(\"greeting\")"))
            .unwrap();
        assert_eq!(sandbox.contents(), "GREETING");
    }

    #[test]
    fn dispatches_router_calls() {
        let mut sandbox = Sandbox::new();
        sandbox.set_router(Arc::new(JoinRouter));
        sandbox
            .load_source(&script("echo router.resource_path(\"pages\", \"home\")"))
            .unwrap();
        assert_eq!(sandbox.contents(), "/pages/home");
    }

    #[test]
    fn missing_locale_binding_is_reported() {
        let mut sandbox = Sandbox::new();
        let error = sandbox
            .load_source(&script("echo locale.translate(\"greeting\")"))
            .unwrap_err();
        assert!(matches!(error, ViewError::MissingBinding("locale")));
    }

    #[test]
    fn malformed_statements_are_rejected() {
        let mut sandbox = Sandbox::new();
        for body in [
            "print \"x\"",
            "echoed",
            "echo vars[\"x\"",
            "echo \"unterminated",
            "echo locale.translate(\"a\", \"b\")",
            "echo widget.render(\"x\")",
        ] {
            let error = sandbox.load_source(&script(body)).unwrap_err();
            assert!(
                matches!(error, ViewError::Script(_)),
                "expected a script error for {body:?}"
            );
        }
    }

    #[test]
    fn failed_execution_produces_no_partial_output() {
        let mut sandbox = Sandbox::new();
        let result = sandbox.load_source(&script("echo \"partial\"\necho vars[\"missing\"]"));
        assert!(result.is_err());
        assert_eq!(sandbox.contents(), "");
    }

    #[test]
    fn load_compiled_misses_on_an_absent_entry() {
        let dir = tempfile::tempdir().unwrap();
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let cache = Disk::new(root, Some("ovs"));

        let mut sandbox = Sandbox::new();
        let error = sandbox.load_compiled(&cache, "nonexistent").unwrap_err();
        assert!(matches!(error, ViewError::CacheMiss(index) if index == "nonexistent"));
    }

    #[test]
    fn load_compiled_executes_a_cached_entry() {
        let dir = tempfile::tempdir().unwrap();
        let root = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let cache = Disk::new(root, Some("ovs"));
        cache.put("existent", &script("echo \"it works\"")).unwrap();

        let mut sandbox = Sandbox::new();
        sandbox.load_compiled(&cache, "existent").unwrap();
        assert_eq!(sandbox.to_string(), "it works");
    }
}
