use serde::{Deserialize, Deserializer};

use super::ConfigError;

/// Everything the loader and wiring read from configuration.
///
/// Every field has a default matching the stock navigation fragment, so an
/// embedder that loads no configuration at all uses [`Settings::default`].
///
/// ```toml
/// fragment_path = "partials/nav.html"
/// mobile_nav_delay_ms = 50
///
/// [root]
/// mode = "fixed"
/// path = "/docs"
///
/// [classes]
/// active = ["is-active"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Fragment location relative to a site root.
    #[serde(deserialize_with = "scalar_string")]
    pub fragment_path: String,
    pub root: RootPolicy,
    pub attributes: Attributes,
    pub menu: MenuIds,
    pub classes: Classes,
    /// Delay before a mobile link navigates, in milliseconds.
    pub mobile_nav_delay_ms: u64,
}

/// How fragment-internal link targets find their base.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RootPolicy {
    /// Derive the site root from the URL that served the fragment.
    #[default]
    Discovered,
    /// Use a configured root; nav-link matching also accepts path suffixes.
    /// An empty path resolves targets root-relative.
    Fixed {
        #[serde(default, deserialize_with = "scalar_string")]
        path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Attributes {
    #[serde(deserialize_with = "scalar_string")]
    pub link_target: String,
    #[serde(deserialize_with = "scalar_string")]
    pub resolved_target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuIds {
    #[serde(deserialize_with = "scalar_string")]
    pub toggle_id: String,
    #[serde(deserialize_with = "scalar_string")]
    pub panel_id: String,
    #[serde(deserialize_with = "scalar_string")]
    pub hidden_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Classes {
    #[serde(deserialize_with = "scalar_string")]
    pub call_to_action: String,
    #[serde(deserialize_with = "scalar_string")]
    pub mobile_link: String,
    #[serde(deserialize_with = "scalar_string")]
    pub nav_link: String,
    pub active: Vec<String>,
}

/// Text settings also accept numbers and booleans, which is what env
/// coercion produces for values such as `NAV__MENU__TOGGLE_ID=2`.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Float(f64),
        Boolean(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Integer(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Boolean(b) => b.to_string(),
    })
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fragment_path: "includes/nav.html".into(),
            root: RootPolicy::default(),
            attributes: Attributes::default(),
            menu: MenuIds::default(),
            classes: Classes::default(),
            mobile_nav_delay_ms: 30,
        }
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            link_target: "data-href".into(),
            resolved_target: "data-resolved-href".into(),
        }
    }
}

impl Default for MenuIds {
    fn default() -> Self {
        Self {
            toggle_id: "nav-toggle".into(),
            panel_id: "nav-menu".into(),
            hidden_class: "hidden".into(),
        }
    }
}

impl Default for Classes {
    fn default() -> Self {
        Self {
            call_to_action: "cta-btn".into(),
            mobile_link: "mobile-link".into(),
            nav_link: "nav-link".into(),
            active: vec!["text-primary".into(), "font-bold".into()],
        }
    }
}

impl Settings {
    /// Fragment path with any leading `./` or `/` removed.
    pub fn fragment_path(&self) -> &str {
        self.fragment_path
            .trim_start_matches("./")
            .trim_start_matches('/')
    }

    pub fn mobile_nav_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.mobile_nav_delay_ms)
    }

    /// Rejects values the wiring cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("fragment_path", self.fragment_path()),
            ("attributes.link_target", self.attributes.link_target.as_str()),
            ("attributes.resolved_target", self.attributes.resolved_target.as_str()),
            ("menu.toggle_id", self.menu.toggle_id.as_str()),
            ("menu.panel_id", self.menu.panel_id.as_str()),
            ("menu.hidden_class", self.menu.hidden_class.as_str()),
            ("classes.call_to_action", self.classes.call_to_action.as_str()),
            ("classes.mobile_link", self.classes.mobile_link.as_str()),
            ("classes.nav_link", self.classes.nav_link.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    reason: "must not be empty".into(),
                });
            }
        }

        if let RootPolicy::Fixed { path } = &self.root {
            let usable = path.is_empty()
                || path.starts_with('/')
                || crate::links::is_absolute_url(path);
            if !usable {
                return Err(ConfigError::InvalidValue {
                    key: "root.path".into(),
                    reason: format!("'{path}' is neither root-relative nor an absolute URL"),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_fragment() {
        let settings = Settings::default();
        assert_eq!(settings.fragment_path(), "includes/nav.html");
        assert_eq!(settings.root, RootPolicy::Discovered);
        assert_eq!(settings.attributes.link_target, "data-href");
        assert_eq!(settings.menu.toggle_id, "nav-toggle");
        assert_eq!(settings.classes.active, ["text-primary", "font-bold"]);
        assert_eq!(settings.mobile_nav_delay().as_millis(), 30);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            fragment_path = "./partials/nav.html"

            [root]
            mode = "fixed"
            path = "/docs"

            [menu]
            toggle_id = "menu-button"
            "#,
        )
        .unwrap();

        assert_eq!(settings.fragment_path(), "partials/nav.html");
        assert_eq!(settings.root, RootPolicy::Fixed { path: "/docs".into() });
        assert_eq!(settings.menu.toggle_id, "menu-button");
        assert_eq!(settings.menu.panel_id, "nav-menu");
    }

    #[test]
    fn test_numeric_text_values_become_strings() {
        let settings: Settings = toml::from_str("[menu]\ntoggle_id = 2\nhidden_class = true").unwrap();
        assert_eq!(settings.menu.toggle_id, "2");
        assert_eq!(settings.menu.hidden_class, "true");
        assert_eq!(settings.menu.panel_id, "nav-menu");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<Settings, _> = toml::from_str("fragment = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        let mut settings = Settings::default();
        settings.attributes.link_target = " ".into();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "attributes.link_target"
        ));
    }

    #[test]
    fn test_validate_rejects_relative_fixed_root() {
        let settings = Settings {
            root: RootPolicy::Fixed { path: "docs".into() },
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            root: RootPolicy::Fixed { path: "https://example.org/docs".into() },
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
    }
}
