//! Layered configuration for the view framework.
//!
//! Settings merge from, in increasing priority: a user-level
//! `origin.toml` (under the platform config directory), the project's
//! `.origin.toml`, and the project's `origin.toml`.

use std::path::Path;

use camino::Utf8PathBuf;
use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
}

/// The platform directories for this application, if the system can name a
/// home for them.
#[must_use]
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "origin")
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    pub templates: TemplateSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directories to search for templates, in order.
    pub directories: Vec<Utf8PathBuf>,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// Root directory for compiled templates; caching is disabled when
    /// unset.
    pub directory: Option<Utf8PathBuf>,
    /// Extension for cache files, without the dot. Empty disables the
    /// extension entirely.
    pub file_extension: String,
    /// Mode for directories created in the cache, as an integer
    /// (`0o750` = 488).
    pub directory_mode: u32,
    /// Mode for files created in the cache, as an integer (`0o640` = 416).
    pub file_mode: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            directory: None,
            file_extension: "ovs".to_string(),
            directory_mode: 0o750,
            file_mode: 0o640,
        }
    }
}

impl Settings {
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file =
            project_dirs().map(|project_dirs| project_dirs.config_dir().join("origin.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join(".origin.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join("origin.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    mod defaults {
        use super::*;

        #[test]
        fn load_no_files() {
            let dir = tempdir().unwrap();
            let settings = Settings::new(dir.path()).unwrap();
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.cache.file_extension, "ovs");
            assert_eq!(settings.cache.directory_mode, 0o750);
        }
    }

    mod project_files {
        use super::*;

        #[test]
        fn load_origin_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(
                dir.path().join("origin.toml"),
                "debug = true\n[templates]\ndirectories = [\"views\"]\n",
            )
            .unwrap();

            let settings = Settings::new(dir.path()).unwrap();
            assert!(settings.debug);
            assert_eq!(
                settings.templates.directories,
                vec![Utf8PathBuf::from("views")]
            );
        }

        #[test]
        fn load_cache_table() {
            let dir = tempdir().unwrap();
            fs::write(
                dir.path().join("origin.toml"),
                "[cache]\ndirectory = \"/var/cache/app\"\nfile_extension = \"compiled\"\n",
            )
            .unwrap();

            let settings = Settings::new(dir.path()).unwrap();
            assert_eq!(
                settings.cache.directory,
                Some(Utf8PathBuf::from("/var/cache/app"))
            );
            assert_eq!(settings.cache.file_extension, "compiled");
            // Unspecified fields keep their defaults.
            assert_eq!(settings.cache.file_mode, 0o640);
        }
    }

    mod priority {
        use super::*;

        #[test]
        fn origin_toml_overrides_dot_origin_toml() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".origin.toml"), "debug = false").unwrap();
            fs::write(dir.path().join("origin.toml"), "debug = true").unwrap();

            let settings = Settings::new(dir.path()).unwrap();
            assert!(settings.debug);
        }

        #[test]
        fn project_overrides_user() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("origin.toml");
            fs::write(&user_conf_path, "debug = true").unwrap();
            fs::write(project_dir.path().join("origin.toml"), "debug = false").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path)).unwrap();
            assert!(!settings.debug);
        }

        #[test]
        fn user_config_applies_when_project_is_silent() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("origin.toml");
            fs::write(&user_conf_path, "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path)).unwrap();
            assert!(settings.debug);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn invalid_toml_content() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("origin.toml"), "debug = not_a_boolean").unwrap();

            let result = Settings::new(dir.path());
            assert!(matches!(result, Err(ConfigError::Config(_))));
        }
    }
}
