use std::fs;

use camino::Utf8PathBuf;

use crate::error::ViewError;

/// Sources the contents of templates for the view layer.
///
/// A loader resolves a qualified (dot-namespaced) name to the template's
/// raw content plus the ordered engine names to process it with, or reports
/// that it has no match so the next registered loader can be consulted.
pub trait Loader {
    fn load(&self, qualified_name: &str) -> Result<Option<(String, Vec<String>)>, ViewError>;
}

/// File template loader.
///
/// Sources templates from a configured list of template directories. A name
/// like `pages.home` maps to `{dir}/pages/home.*`; the candidate file's
/// extensions, in order, name the engines its content passes through, so
/// `home.origin.html` compiles with the `origin` engine and then the `html`
/// engine.
pub struct FileLoader {
    template_directories: Vec<Utf8PathBuf>,
}

impl FileLoader {
    #[must_use]
    pub fn new(template_directories: Vec<Utf8PathBuf>) -> Self {
        FileLoader {
            template_directories,
        }
    }

    pub fn add_template_directory(&mut self, template_directory: impl Into<Utf8PathBuf>) {
        self.template_directories.push(template_directory.into());
    }
}

impl Loader for FileLoader {
    fn load(&self, qualified_name: &str) -> Result<Option<(String, Vec<String>)>, ViewError> {
        let relative = qualified_name.replace('.', "/");

        for directory in &self.template_directories {
            let qualified_base = directory.join(&relative);
            let Some(parent) = qualified_base.parent() else {
                continue;
            };
            let Some(stem) = qualified_base.file_name() else {
                continue;
            };
            if !parent.is_dir() {
                continue;
            }

            let prefix = format!("{stem}.");
            let mut candidates = Vec::new();
            let entries = parent
                .read_dir_utf8()
                .map_err(|source| ViewError::Read {
                    path: parent.to_owned(),
                    source,
                })?;
            for entry in entries {
                let entry = entry.map_err(|source| ViewError::Read {
                    path: parent.to_owned(),
                    source,
                })?;
                if entry.file_name().starts_with(&prefix) {
                    candidates.push(entry.path().to_owned());
                }
            }

            match candidates.as_slice() {
                [] => {}
                [path] => {
                    let engines = path
                        .file_name()
                        .unwrap_or_default()
                        .strip_prefix(&prefix)
                        .unwrap_or_default()
                        .split('.')
                        .map(ToString::to_string)
                        .collect();
                    let contents = fs::read_to_string(path.as_std_path()).map_err(|source| {
                        ViewError::Read {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    return Ok(Some((contents, engines)));
                }
                _ => return Err(ViewError::AmbiguousMatch(qualified_name.to_string())),
            }
        }

        Ok(None)
    }
}
