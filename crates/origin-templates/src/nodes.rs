use serde::Serialize;

use crate::codegen::Literal;
use crate::codegen::ScriptFile;

/// A parsed, renderable unit of a template's structure.
///
/// Nodes are immutable values: `yield` hands out clones of stored block
/// bodies, so no two emission sites can alias mutable state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Node {
    /// A literal text fragment, echoed verbatim.
    Text { contents: String },
    /// A reference to a variable bound into the sandbox by the caller.
    Variable { name: String },
    /// A router lookup emitted as a call against the bound router.
    ResourcePath { resource: String, action: String },
    /// A locale lookup emitted as a call against the bound locale.
    Translate { key: String },
    /// Opaque pass-through for commands with no specialized node. Renders
    /// as a script comment so the generated source stays executable.
    Block { command: String, arguments: String },
    /// An ordered sequence of nodes rendered in place.
    Sequence(NodeList),
}

impl Node {
    /// Render this node into the generated source buffer. Rendering has no
    /// effect beyond appending to `file`.
    pub fn render(&self, file: &mut ScriptFile) {
        match self {
            Node::Text { contents } => {
                file.add_statement("echo", &Literal::from(contents.as_str()).render());
            }
            Node::Variable { name } => {
                file.add_statement("echo", &ScriptFile::variable_reference(name));
            }
            Node::ResourcePath { resource, action } => {
                let call = ScriptFile::function_call(
                    "router.resource_path",
                    &[
                        Literal::from(resource.as_str()),
                        Literal::from(action.as_str()),
                    ],
                );
                file.add_statement("echo", &call);
            }
            Node::Translate { key } => {
                let call =
                    ScriptFile::function_call("locale.translate", &[Literal::from(key.as_str())]);
                file.add_statement("echo", &call);
            }
            Node::Block { command, arguments } => {
                if arguments.is_empty() {
                    file.add_content(&format!("# {command}"));
                } else {
                    file.add_content(&format!("# {command} {arguments}"));
                }
            }
            Node::Sequence(nodes) => nodes.render(file),
        }
    }
}

/// An ordered list of nodes; what the parser returns.
///
/// Renders deterministically by concatenating each child's rendering in
/// order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NodeList {
    nodes: Vec<Node>,
}

impl NodeList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn render(&self, file: &mut ScriptFile) {
        for node in &self.nodes {
            node.render(file);
        }
    }

    /// Render the whole list into a fresh script, ready for caching or
    /// immediate execution.
    #[must_use]
    pub fn to_script(&self) -> String {
        let mut file = ScriptFile::new();
        self.render(&mut file);
        file.into_source()
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_node_echoes_a_quoted_literal() {
        let mut file = ScriptFile::new();
        Node::Text {
            contents: "hello\nworld".to_string(),
        }
        .render(&mut file);
        assert!(file.source().ends_with("\necho \"hello\\nworld\""));
    }

    #[test]
    fn variable_node_echoes_a_scope_lookup() {
        let mut file = ScriptFile::new();
        Node::Variable {
            name: "user".to_string(),
        }
        .render(&mut file);
        assert!(file.source().ends_with("\necho vars[\"user\"]"));
    }

    #[test]
    fn translate_node_calls_the_bound_locale() {
        let mut file = ScriptFile::new();
        Node::Translate {
            key: "greeting".to_string(),
        }
        .render(&mut file);
        assert!(file
            .source()
            .ends_with("\necho locale.translate(\"greeting\")"));
    }

    #[test]
    fn resource_path_node_calls_the_bound_router() {
        let mut file = ScriptFile::new();
        Node::ResourcePath {
            resource: "pages".to_string(),
            action: "home".to_string(),
        }
        .render(&mut file);
        assert!(file
            .source()
            .ends_with("\necho router.resource_path(\"pages\", \"home\")"));
    }

    #[test]
    fn opaque_block_node_renders_as_a_comment() {
        let mut file = ScriptFile::new();
        Node::Block {
            command: "widget".to_string(),
            arguments: "sidebar".to_string(),
        }
        .render(&mut file);
        assert!(file.source().ends_with("\n# widget sidebar"));
    }

    #[test]
    fn sequence_renders_children_in_order() {
        let mut inner = NodeList::new();
        inner.push(Node::Text {
            contents: "a".to_string(),
        });
        inner.push(Node::Text {
            contents: "b".to_string(),
        });

        let script = inner.to_script();
        let statements: Vec<&str> = script.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(statements, vec!["echo \"a\"", "echo \"b\""]);
    }
}
