use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use super::env::load_env_vars;
use super::{ConfigError, Settings};

/// A configuration source in the loading pipeline.
#[derive(Debug)]
enum ConfigSource {
    File { path: PathBuf, required: bool },
    Inline { name: String, text: String },
    Env { prefix: String, separator: String },
}

/// Builder for layering loader settings from TOML files, inline TOML and
/// environment variables.
///
/// Sources are merged in registration order, later ones overriding earlier
/// ones. Nested tables are merged recursively; other values (including
/// arrays such as `classes.active`) are replaced entirely.
///
/// ## Example
///
/// ```no_run
/// use nav_include::Config;
///
/// let settings = Config::builder()
///     .with_file("site/nav.toml", false)
///     .with_env("NAV", "__")
///     .build_settings()?;
/// # Ok::<(), nav_include::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct Config {
    sources: Vec<ConfigSource>,
}

impl Config {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Adds a TOML file. Missing optional files are skipped; a missing
    /// required file fails the build.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.sources.push(ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds TOML text that did not come from a file, such as settings
    /// embedded in the page. `name` only appears in error messages.
    pub fn with_toml(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.push(ConfigSource::Inline {
            name: name.into(),
            text: text.into(),
        });
        self
    }

    /// Overlays environment variables named `<prefix><separator><path>`.
    ///
    /// ```no_run
    /// # use nav_include::Config;
    /// // NAV__MENU__TOGGLE_ID=menu-button NAV__MOBILE_NAV_DELAY_MS=50
    /// let settings = Config::builder()
    ///     .with_env("NAV", "__")
    ///     .build_settings()?;
    /// # Ok::<(), nav_include::ConfigError>(())
    /// ```
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.sources.push(ConfigSource::Env {
            prefix: prefix.into(),
            separator: separator.into(),
        });
        self
    }

    /// Loads and merges every source, then deserializes the result once.
    pub fn build<T: DeserializeOwned>(self) -> Result<T, ConfigError> {
        let mut merged = toml::Table::new();

        for source in self.sources {
            match source {
                ConfigSource::File { path, required } => {
                    if let Some(table) = load_config_file(&path, required)? {
                        deep_merge(&mut merged, table);
                    }
                }
                ConfigSource::Inline { name, text } => {
                    let table = toml::from_str(&text)
                        .map_err(|source| ConfigError::Syntax { name, source })?;
                    deep_merge(&mut merged, table);
                }
                ConfigSource::Env { prefix, separator } => {
                    load_env_vars(&mut merged, &prefix, &separator);
                }
            }
        }

        let value = toml::Value::Table(merged);
        value.try_into().map_err(ConfigError::Shape)
    }

    /// [`build`](Self::build) into [`Settings`] and validate them.
    pub fn build_settings(self) -> Result<Settings, ConfigError> {
        let settings: Settings = self.build()?;
        settings.validate()?;
        tracing::debug!(fragment_path = %settings.fragment_path(), root = ?settings.root, "loaded nav settings");
        Ok(settings)
    }
}

/// An optional file that is absent contributes nothing.
fn load_config_file(path: &Path, required: bool) -> Result<Option<toml::Table>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::MissingFile(path.to_path_buf()))
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Syntax {
            name: path.display().to_string(),
            source,
        })
}

fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
