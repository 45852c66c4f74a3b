use serde::Serialize;

/// A lexed, unparsed fragment of a template's raw structure.
///
/// Every token records the qualified name of the template it was sourced
/// from (`origin`) for error messages and inheritance bookkeeping, and the
/// raw fragment of source it covers, so that concatenating the raw text of
/// a token stream reconstructs the input exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Token {
    /// Syntactically meaningless text between constructs.
    Text { origin: String, contents: String },
    /// A `{{ name }}` variable reference.
    Variable {
        origin: String,
        name: String,
        raw: String,
    },
    /// A `{% command argument %}` directive.
    Block {
        origin: String,
        command: String,
        argument: String,
        raw: String,
    },
}

impl Token {
    #[must_use]
    pub fn text(origin: &str, contents: &str) -> Self {
        Token::Text {
            origin: origin.to_string(),
            contents: contents.to_string(),
        }
    }

    #[must_use]
    pub fn variable(origin: &str, raw: &str, interior: &str) -> Self {
        Token::Variable {
            origin: origin.to_string(),
            name: interior.trim().to_string(),
            raw: raw.to_string(),
        }
    }

    /// Build a block token, splitting the interior on the first whitespace
    /// run into a command name and a trimmed argument string. The argument
    /// may be empty.
    #[must_use]
    pub fn block(origin: &str, raw: &str, interior: &str) -> Self {
        let interior = interior.trim();
        let (command, argument) = match interior.split_once(char::is_whitespace) {
            Some((command, rest)) => (command.to_string(), rest.trim().to_string()),
            None => (interior.to_string(), String::new()),
        };

        Token::Block {
            origin: origin.to_string(),
            command,
            argument,
            raw: raw.to_string(),
        }
    }

    /// The qualified name of the template this token was sourced from.
    #[must_use]
    pub fn origin(&self) -> &str {
        match self {
            Token::Text { origin, .. }
            | Token::Variable { origin, .. }
            | Token::Block { origin, .. } => origin,
        }
    }

    /// The raw source fragment this token covers, delimiters included.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Token::Text { contents, .. } => contents,
            Token::Variable { raw, .. } | Token::Block { raw, .. } => raw,
        }
    }
}
