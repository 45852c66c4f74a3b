use thiserror::Error;

/// Failures raised while compiling a template to executable source.
///
/// Every variant names the template the failure occurred in so callers can
/// point a developer at the offending view, and, where one exists, the
/// command or block involved.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no such command '{command}' in template '{template}'")]
    NoSuchCommand { command: String, template: String },

    #[error("template '{template}' yields block '{name}', which was never defined")]
    NoSuchBlock { name: String, template: String },

    #[error("unterminated block '{block}' in template '{template}': expected '{expected}'")]
    UnterminatedBlock {
        block: String,
        expected: String,
        template: String,
    },

    #[error("command '{command}' in template '{template}' requires an argument")]
    MissingArgument { command: String, template: String },

    #[error("malformed argument '{argument}' to '{command}' in template '{template}'")]
    BadArgument {
        command: String,
        argument: String,
        template: String,
    },

    #[error("command '{command}' is already registered")]
    DuplicateCommand { command: String },

    #[error("failed to load template '{template}'")]
    Source {
        template: String,
        #[source]
        source: anyhow::Error,
    },
}
