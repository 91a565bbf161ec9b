use toml::{Table, Value};

/// Overlays `PREFIX<sep>SECTION<sep>KEY=value` variables onto `table`.
///
/// `NAV__MENU__TOGGLE_ID=menu-button` becomes `menu.toggle_id`. Path
/// segments are lowercased; values are coerced by [`coerce_value`].
pub(super) fn load_env_vars(table: &mut Table, prefix: &str, separator: &str) {
    let vars: Vec<(String, String)> = std::env::vars().collect();
    apply_env_vars(table, prefix, separator, vars);
}

pub(super) fn apply_env_vars(
    table: &mut Table,
    prefix: &str,
    separator: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) {
    if separator.is_empty() {
        return;
    }
    let prefix_with_sep = format!("{prefix}{separator}");

    for (key, value) in vars {
        let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        let path: Vec<String> = path_str
            .split(separator)
            .map(str::to_lowercase)
            .collect();
        if path.iter().any(String::is_empty) {
            continue;
        }
        insert_at_path(table, &path, coerce_value(&value));
    }
}

fn insert_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        table.insert(first.clone(), value);
        return;
    }
    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }
    if let Some(Value::Table(nested)) = table.get_mut(first) {
        insert_at_path(nested, rest, value);
    }
}

/// Coerces an env string to boolean, integer, float, or string, in that order.
fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-')) {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_nested_paths_are_lowercased() {
        let mut table = Table::new();
        apply_env_vars(
            &mut table,
            "NAV",
            "__",
            vars(&[
                ("NAV__MENU__TOGGLE_ID", "menu-button"),
                ("NAV__MOBILE_NAV_DELAY_MS", "45"),
                ("OTHER__MENU__PANEL_ID", "ignored"),
            ]),
        );

        assert_eq!(table["menu"]["toggle_id"].as_str(), Some("menu-button"));
        assert_eq!(table["mobile_nav_delay_ms"].as_integer(), Some(45));
        assert!(table["menu"].get("panel_id").is_none());
    }

    #[test]
    fn test_paths_and_file_names_stay_strings() {
        assert_eq!(coerce_value("includes/nav.html"), Value::String("includes/nav.html".into()));
        assert_eq!(coerce_value("nav.html"), Value::String("nav.html".into()));
        assert_eq!(coerce_value("TRUE"), Value::Boolean(true));
        assert_eq!(coerce_value("-3"), Value::Integer(-3));
        assert_eq!(coerce_value("1.5"), Value::Float(1.5));
    }

    #[test]
    fn test_empty_segments_skipped() {
        let mut table = Table::new();
        apply_env_vars(&mut table, "NAV", "__", vars(&[("NAV__", "x"), ("NAV____A", "y")]));
        assert!(table.is_empty());
    }
}
