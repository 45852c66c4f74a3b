use std::collections::HashMap;

use crate::commands;
use crate::commands::CommandRegistry;
use crate::engine::TemplateSource;
use crate::error::TemplateError;
use crate::lexer::Lexer;
use crate::nodes::Node;
use crate::nodes::NodeList;
use crate::tokens::Token;

/// The template parser.
///
/// Consumes a token stream left to right and produces a node list. The
/// parser carries the mutable state one compile pass threads through its
/// commands:
///
/// - `blocks`: named block bodies, shared between `block` definitions and
///   `yield` emission sites. The first definition of a name in a pass wins,
///   which is what lets a child template override its parent (the child's
///   tokens run first).
/// - `context_stacks`: named stacks tracking nested same-named constructs;
///   `block` uses one to know which block an unterminated parse died in.
/// - `parents`: child template -> parent template, recorded by `extend`.
///
/// The token stream is an explicit cursor over a vector; "putting back" a
/// halt token is a cursor decrement, and template splicing (`extend`,
/// `form`) appends to or inserts into the vector.
pub struct Parser<'a> {
    source: &'a dyn TemplateSource,
    registry: &'a CommandRegistry,
    template: String,
    tokens: Vec<Token>,
    current: usize,
    blocks: HashMap<String, NodeList>,
    context_stacks: HashMap<String, Vec<String>>,
    parents: HashMap<String, String>,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(
        source: &'a dyn TemplateSource,
        registry: &'a CommandRegistry,
        template: &str,
        raw_content: &str,
    ) -> Self {
        Parser {
            source,
            registry,
            template: template.to_string(),
            tokens: Lexer::new(template, raw_content).tokenize(),
            current: 0,
            blocks: HashMap::new(),
            context_stacks: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    /// Parse the remaining tokens into a node list.
    ///
    /// When `halt_on` is given, the parse stops in front of the first block
    /// token whose command is in the set, leaving that token for the caller
    /// to consume explicitly; exhausting the stream without meeting one is
    /// an [`TemplateError::UnterminatedBlock`] error. Commands may decline
    /// to return a node (`block`, `extend` and `form` mutate parser state
    /// instead).
    pub fn parse(&mut self, halt_on: Option<&[&str]>) -> Result<NodeList, TemplateError> {
        let mut nodes = NodeList::new();
        let mut halted = false;

        while let Some(token) = self.token_shift() {
            let node = match token {
                Token::Text { contents, .. } => Some(Node::Text { contents }),
                Token::Variable { name, .. } => Some(Node::Variable { name }),
                Token::Block {
                    origin,
                    command,
                    argument,
                    ..
                } => {
                    if halt_on.is_some_and(|halts| halts.contains(&command.as_str())) {
                        self.token_unshift();
                        halted = true;
                        break;
                    }

                    let kind = self.registry.get(&command).ok_or_else(|| {
                        TemplateError::NoSuchCommand {
                            command: command.clone(),
                            template: origin.clone(),
                        }
                    })?;
                    commands::dispatch(self, kind, &origin, &argument)?
                }
            };

            if let Some(node) = node {
                nodes.push(node);
            }
        }

        if let Some(expected) = halt_on {
            if !halted {
                return Err(TemplateError::UnterminatedBlock {
                    block: self
                        .context_stack_top("block")
                        .cloned()
                        .unwrap_or_default(),
                    expected: expected.join(", "),
                    template: self.template.clone(),
                });
            }
        }

        Ok(nodes)
    }

    /// Drop the front token from the stream and return it.
    ///
    /// Commands that parse up to their own terminator use this to discard
    /// the terminator before resuming the caller's parse.
    pub(crate) fn token_shift(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.current).cloned();
        if token.is_some() {
            self.current += 1;
        }
        token
    }

    fn token_unshift(&mut self) {
        debug_assert!(self.current > 0, "nothing to put back");
        self.current -= 1;
    }

    /// Append the tokens of a named template to this parser's stream.
    pub(crate) fn append_template(&mut self, qualified_name: &str) -> Result<(), TemplateError> {
        let tokens = self.tokens_for_template(qualified_name)?;
        self.tokens.extend(tokens);
        Ok(())
    }

    /// Splice the tokens of a named template in at the cursor, so they are
    /// consumed next.
    pub(crate) fn prepend_template(&mut self, qualified_name: &str) -> Result<(), TemplateError> {
        let tokens = self.tokens_for_template(qualified_name)?;
        self.tokens.splice(self.current..self.current, tokens);
        Ok(())
    }

    fn tokens_for_template(&self, qualified_name: &str) -> Result<Vec<Token>, TemplateError> {
        let raw_content =
            self.source
                .raw_template(qualified_name)
                .map_err(|source| TemplateError::Source {
                    template: qualified_name.to_string(),
                    source,
                })?;
        Ok(Lexer::new(qualified_name, &raw_content).tokenize())
    }

    pub(crate) fn context_stack_push(&mut self, stack: &str, value: &str) {
        self.context_stacks
            .entry(stack.to_string())
            .or_default()
            .push(value.to_string());
    }

    pub(crate) fn context_stack_pop(&mut self, stack: &str) -> Option<String> {
        self.context_stacks.get_mut(stack).and_then(Vec::pop)
    }

    fn context_stack_top(&self, stack: &str) -> Option<&String> {
        self.context_stacks.get(stack).and_then(|values| values.last())
    }

    /// Store a block body under `name` unless one is already present; the
    /// first definition in a compile pass wins.
    pub(crate) fn define_block(&mut self, name: &str, nodes: NodeList) {
        self.blocks.entry(name.to_string()).or_insert(nodes);
    }

    pub(crate) fn block_nodes(&self, name: &str) -> Option<&NodeList> {
        self.blocks.get(name)
    }

    /// Record that `child` extends `parent`.
    pub(crate) fn set_parent(&mut self, child: &str, parent: &str) {
        self.parents
            .insert(child.to_string(), parent.to_string());
    }

    pub(crate) fn parent_of(&self, child: &str) -> Option<&str> {
        self.parents.get(child).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::TemplateError;

    fn registry() -> CommandRegistry {
        CommandRegistry::default()
    }

    fn parse(templates: &HashMap<String, String>, root: &str) -> Result<NodeList, TemplateError> {
        let registry = registry();
        let raw = templates
            .get(root)
            .unwrap_or_else(|| panic!("missing test template {root}"))
            .clone();
        let mut parser = Parser::new(templates, &registry, root, &raw);
        parser.parse(None)
    }

    fn templates(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, raw)| ((*name).to_string(), (*raw).to_string()))
            .collect()
    }

    #[test]
    fn text_and_variables_parse_to_matching_nodes() {
        let templates = templates(&[("t", "Hello, {{ name }}!")]);
        let nodes = parse(&templates, "t").unwrap();

        let collected: Vec<&Node> = nodes.iter().collect();
        assert_eq!(
            collected,
            vec![
                &Node::Text {
                    contents: "Hello, ".to_string()
                },
                &Node::Variable {
                    name: "name".to_string()
                },
                &Node::Text {
                    contents: "!".to_string()
                },
            ]
        );
    }

    #[test]
    fn standalone_block_renders_inline() {
        let templates = templates(&[("t", "{% block title %}Default{% endblock %}")]);
        let nodes = parse(&templates, "t").unwrap();

        let collected: Vec<&Node> = nodes.iter().collect();
        let Node::Sequence(body) = collected[0] else {
            panic!("expected the block body inline");
        };
        assert_eq!(
            body.iter().collect::<Vec<_>>(),
            vec![&Node::Text {
                contents: "Default".to_string()
            }]
        );
    }

    #[test]
    fn child_block_overrides_parent_block() {
        let templates = templates(&[
            ("parent", "{% block title %}Default{% endblock %}"),
            ("child", "{% extend parent %}{% block title %}Override{% endblock %}"),
        ]);
        let nodes = parse(&templates, "child").unwrap();

        // The child's definition emits nothing; the parent's structural
        // site emits the stored (child) body.
        let collected: Vec<&Node> = nodes.iter().collect();
        assert_eq!(collected.len(), 1);
        let Node::Sequence(body) = collected[0] else {
            panic!("expected the resolved block body");
        };
        assert_eq!(
            body.iter().collect::<Vec<_>>(),
            vec![&Node::Text {
                contents: "Override".to_string()
            }]
        );
    }

    #[test]
    fn yield_emits_a_clone_of_the_stored_block() {
        let templates = templates(&[(
            "t",
            "{% block a %}body{% endblock %}{% yield a %}{% yield a %}",
        )]);
        let nodes = parse(&templates, "t").unwrap();

        // Inline emission plus two yields.
        assert_eq!(nodes.len(), 3);
        let collected: Vec<&Node> = nodes.iter().collect();
        assert_eq!(collected[1], collected[2]);
    }

    #[test]
    fn yield_of_undefined_block_fails() {
        let templates = templates(&[("t", "{% yield nonexistent %}")]);
        let error = parse(&templates, "t").unwrap_err();
        assert!(matches!(
            error,
            TemplateError::NoSuchBlock { name, template }
                if name == "nonexistent" && template == "t"
        ));
    }

    #[test]
    fn missing_endblock_fails_with_the_open_block_name() {
        let templates = templates(&[("t", "{% block sidebar %}no terminator")]);
        let error = parse(&templates, "t").unwrap_err();
        assert!(matches!(
            error,
            TemplateError::UnterminatedBlock { block, expected, .. }
                if block == "sidebar" && expected == "endblock"
        ));
    }

    #[test]
    fn unknown_command_fails() {
        let templates = templates(&[("t", "{% frobnicate x %}")]);
        let error = parse(&templates, "t").unwrap_err();
        assert!(matches!(
            error,
            TemplateError::NoSuchCommand { command, template }
                if command == "frobnicate" && template == "t"
        ));
    }

    #[test]
    fn stray_endblock_is_an_unknown_command() {
        let templates = templates(&[("t", "{% endblock %}")]);
        let error = parse(&templates, "t").unwrap_err();
        assert!(matches!(
            error,
            TemplateError::NoSuchCommand { command, .. } if command == "endblock"
        ));
    }

    #[test]
    fn nested_blocks_consume_their_own_terminators() {
        let templates = templates(&[(
            "t",
            "{% block outer %}a{% block inner %}b{% endblock %}c{% endblock %}",
        )]);
        let nodes = parse(&templates, "t").unwrap();

        // Outer emits inline; inner also emits inline within the outer
        // body, and is separately stored.
        assert_eq!(nodes.len(), 1);
        let Node::Sequence(outer) = nodes.iter().next().unwrap() else {
            panic!("expected outer block body");
        };
        assert_eq!(outer.len(), 3);
    }

    #[test]
    fn extend_of_unknown_template_reports_the_source_failure() {
        let templates = templates(&[("child", "{% extend missing %}")]);
        let error = parse(&templates, "child").unwrap_err();
        assert!(matches!(
            error,
            TemplateError::Source { template, .. } if template == "missing"
        ));
    }

    #[test]
    fn form_splices_the_named_template_inline() {
        let templates = templates(&[
            ("t", "a{% form partials.field %}c"),
            ("partials.field", "b"),
        ]);
        let nodes = parse(&templates, "t").unwrap();

        let collected: Vec<&Node> = nodes.iter().collect();
        assert_eq!(
            collected,
            vec![
                &Node::Text {
                    contents: "a".to_string()
                },
                &Node::Text {
                    contents: "b".to_string()
                },
                &Node::Text {
                    contents: "c".to_string()
                },
            ]
        );
    }

    #[test]
    fn resource_path_splits_resource_and_action() {
        let templates = templates(&[("t", "{% resource_path pages.home %}")]);
        let nodes = parse(&templates, "t").unwrap();
        assert_eq!(
            nodes.iter().collect::<Vec<_>>(),
            vec![&Node::ResourcePath {
                resource: "pages".to_string(),
                action: "home".to_string(),
            }]
        );
    }

    #[test]
    fn resource_path_without_action_fails() {
        let templates = templates(&[("t", "{% resource_path pages %}")]);
        let error = parse(&templates, "t").unwrap_err();
        assert!(matches!(
            error,
            TemplateError::BadArgument { command, .. } if command == "resource_path"
        ));
    }

    #[test]
    fn block_without_a_name_fails() {
        let templates = templates(&[("t", "{% block %}x{% endblock %}")]);
        let error = parse(&templates, "t").unwrap_err();
        assert!(matches!(
            error,
            TemplateError::MissingArgument { command, .. } if command == "block"
        ));
    }
}
