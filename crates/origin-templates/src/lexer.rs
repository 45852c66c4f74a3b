use crate::tokens::Token;

const BLOCK_OPEN: &str = "{%";
const BLOCK_CLOSE: &str = "%}";
const VARIABLE_OPEN: &str = "{{";
const VARIABLE_CLOSE: &str = "}}";

/// Splits raw template text into a flat token stream.
///
/// The two delimiter pairs are matched non-greedily, leftmost first; text
/// between constructs is preserved verbatim. An opening delimiter with no
/// matching close is not an error at this stage, it simply lexes as literal
/// text. Unrecognized commands surface later, when the parser dispatches
/// them.
pub struct Lexer<'src> {
    origin: &'src str,
    source: &'src str,
    current: usize,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(origin_template: &'src str, source: &'src str) -> Self {
        Lexer {
            origin: origin_template,
            source,
            current: 0,
        }
    }

    #[must_use]
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            let token = self
                .lex_construct(BLOCK_OPEN, BLOCK_CLOSE, Token::block)
                .or_else(|| self.lex_construct(VARIABLE_OPEN, VARIABLE_CLOSE, Token::variable))
                .unwrap_or_else(|| self.lex_text());
            tokens.push(token);
        }

        tokens
    }

    fn lex_construct(
        &mut self,
        open: &str,
        close: &str,
        token_fn: impl FnOnce(&str, &str, &str) -> Token,
    ) -> Option<Token> {
        let rest = &self.source[self.current..];
        if !rest.starts_with(open) {
            return None;
        }

        let interior_len = rest[open.len()..].find(close)?;
        let raw_len = open.len() + interior_len + close.len();
        let raw = &rest[..raw_len];
        let interior = &rest[open.len()..open.len() + interior_len];

        self.current += raw_len;
        Some(token_fn(self.origin, raw, interior))
    }

    fn lex_text(&mut self) -> Token {
        let start = self.current;

        // Always take at least one character so an unmatched delimiter
        // cannot stall the scan.
        self.consume();
        while !self.is_at_end() && !self.at_construct() {
            self.consume();
        }

        Token::text(self.origin, &self.source[start..self.current])
    }

    fn at_construct(&self) -> bool {
        let rest = &self.source[self.current..];
        (rest.starts_with(BLOCK_OPEN) && rest[BLOCK_OPEN.len()..].contains(BLOCK_CLOSE))
            || (rest.starts_with(VARIABLE_OPEN) && rest[VARIABLE_OPEN.len()..].contains(VARIABLE_CLOSE))
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    fn consume(&mut self) {
        if let Some(ch) = self.source[self.current..].chars().next() {
            self.current += ch.len_utf8();
        }
    }
}
