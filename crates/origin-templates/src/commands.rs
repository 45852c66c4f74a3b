use std::collections::HashMap;

use crate::error::TemplateError;
use crate::nodes::Node;
use crate::parser::Parser;

/// The terminator consumed by `block`; deliberately never registered as a
/// command, so a stray `{% endblock %}` fails dispatch.
const END_BLOCK: &str = "endblock";

/// The typed handler a block command dispatches to.
///
/// Each kind turns one block token's contents into at most one node, given
/// access to parser state; commands like `block` and `extend` work entirely
/// through that state and return nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// `{% block name %}...{% endblock %}` — define a named, overridable
    /// region.
    Block,
    /// `{% extend template %}` — inherit from a parent template.
    Extend,
    /// `{% yield name %}` — emit a previously defined block.
    Yield,
    /// `{% translate key %}` — emit a locale lookup.
    Translate,
    /// `{% resource_path resource.action %}` — emit a router lookup.
    ResourcePath,
    /// `{% form template %}` — splice a partial template inline.
    Form,
}

/// Name -> handler table for block commands.
///
/// Validated at registration time: registering a name twice is an error,
/// so a bad wiring surfaces at startup rather than mid-parse.
#[derive(Clone, Debug)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandKind>,
}

impl CommandRegistry {
    /// A registry with no commands at all.
    #[must_use]
    pub fn empty() -> Self {
        CommandRegistry {
            commands: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: CommandKind,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(TemplateError::DuplicateCommand { command: name });
        }
        self.commands.insert(name, kind);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<CommandKind> {
        self.commands.get(name).copied()
    }
}

impl Default for CommandRegistry {
    /// The built-in command set.
    fn default() -> Self {
        let mut registry = Self::empty();
        for (name, kind) in [
            ("block", CommandKind::Block),
            ("extend", CommandKind::Extend),
            ("yield", CommandKind::Yield),
            ("translate", CommandKind::Translate),
            ("resource_path", CommandKind::ResourcePath),
            ("form", CommandKind::Form),
        ] {
            registry.commands.insert(name.to_string(), kind);
        }
        registry
    }
}

pub(crate) fn dispatch(
    parser: &mut Parser<'_>,
    kind: CommandKind,
    origin: &str,
    argument: &str,
) -> Result<Option<Node>, TemplateError> {
    match kind {
        CommandKind::Block => block(parser, origin, argument),
        CommandKind::Extend => extend(parser, origin, argument),
        CommandKind::Yield => yield_block(parser, origin, argument),
        CommandKind::Translate => translate(parser, origin, argument),
        CommandKind::ResourcePath => resource_path(parser, origin, argument),
        CommandKind::Form => form(parser, origin, argument),
    }
}

/// Define a named block.
///
/// The body is parsed up to the matching `endblock`, which is then
/// discarded. The first definition of a name within a compile pass wins;
/// because a child's tokens run before the parent's spliced-in tokens, a
/// child template's definition overrides its parent's.
///
/// A block in a template that extends a parent is definition-only. In any
/// other template the block is structural: its site emits the stored body
/// inline, so a standalone template renders its own defaults without an
/// explicit `yield`.
fn block(
    parser: &mut Parser<'_>,
    origin: &str,
    argument: &str,
) -> Result<Option<Node>, TemplateError> {
    let name = require_argument("block", origin, argument)?;

    parser.context_stack_push("block", name);
    let body = parser.parse(Some(&[END_BLOCK]))?;
    parser.token_shift();
    parser.context_stack_pop("block");

    parser.define_block(name, body);

    if parser.parent_of(origin).is_some() {
        Ok(None)
    } else {
        Ok(parser.block_nodes(name).cloned().map(Node::Sequence))
    }
}

/// Inherit from a parent template.
///
/// Records the parent relationship, then splices the parent's freshly lexed
/// tokens onto the end of the stream: the child's remaining content runs
/// first (defining its blocks), after which the parent's structure renders.
fn extend(
    parser: &mut Parser<'_>,
    origin: &str,
    argument: &str,
) -> Result<Option<Node>, TemplateError> {
    let parent = require_argument("extend", origin, argument)?;

    parser.set_parent(origin, parent);
    parser.append_template(parent)?;
    Ok(None)
}

/// Emit a previously defined block.
///
/// Returns a clone of the stored body, so multiple yields of one block
/// never alias.
fn yield_block(
    parser: &mut Parser<'_>,
    origin: &str,
    argument: &str,
) -> Result<Option<Node>, TemplateError> {
    let name = require_argument("yield", origin, argument)?;

    match parser.block_nodes(name) {
        Some(body) => Ok(Some(Node::Sequence(body.clone()))),
        None => Err(TemplateError::NoSuchBlock {
            name: name.to_string(),
            template: origin.to_string(),
        }),
    }
}

fn translate(
    _parser: &mut Parser<'_>,
    origin: &str,
    argument: &str,
) -> Result<Option<Node>, TemplateError> {
    let key = require_argument("translate", origin, argument)?;

    Ok(Some(Node::Translate {
        key: key.to_string(),
    }))
}

/// Emit a router lookup from a dotted `resource.action` argument.
fn resource_path(
    _parser: &mut Parser<'_>,
    origin: &str,
    argument: &str,
) -> Result<Option<Node>, TemplateError> {
    let argument = require_argument("resource_path", origin, argument)?;

    let bad_argument = || TemplateError::BadArgument {
        command: "resource_path".to_string(),
        argument: argument.to_string(),
        template: origin.to_string(),
    };

    let (resource, action) = argument.split_once('.').ok_or_else(bad_argument)?;
    if resource.is_empty() || action.is_empty() {
        return Err(bad_argument());
    }

    Ok(Some(Node::ResourcePath {
        resource: resource.to_string(),
        action: action.to_string(),
    }))
}

/// Splice a partial template inline at the command's site.
fn form(
    parser: &mut Parser<'_>,
    origin: &str,
    argument: &str,
) -> Result<Option<Node>, TemplateError> {
    let partial = require_argument("form", origin, argument)?;

    parser.prepend_template(partial)?;
    Ok(None)
}

fn require_argument<'arg>(
    command: &str,
    origin: &str,
    argument: &'arg str,
) -> Result<&'arg str, TemplateError> {
    if argument.is_empty() {
        return Err(TemplateError::MissingArgument {
            command: command.to_string(),
            template: origin.to_string(),
        });
    }
    Ok(argument)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_the_builtin_commands() {
        let registry = CommandRegistry::default();
        for name in ["block", "extend", "yield", "translate", "resource_path", "form"] {
            assert!(registry.get(name).is_some(), "missing builtin {name}");
        }
        assert_eq!(registry.get(END_BLOCK), None);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = CommandRegistry::default();
        let error = registry.register("block", CommandKind::Block).unwrap_err();
        assert!(matches!(
            error,
            TemplateError::DuplicateCommand { command } if command == "block"
        ));
    }

    #[test]
    fn custom_commands_can_be_registered() {
        let mut registry = CommandRegistry::empty();
        registry.register("include", CommandKind::Form).unwrap();
        assert_eq!(registry.get("include"), Some(CommandKind::Form));
    }
}
