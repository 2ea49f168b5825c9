use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Basemap theme to use for each layer color tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeMap {
    pub default: String,
    pub by_color: HashMap<String, String>,
}

impl Default for ThemeMap {
    fn default() -> Self {
        Self {
            default: "light".to_string(),
            by_color: HashMap::new(),
        }
    }
}

impl ThemeMap {
    pub fn with_theme(mut self, color_tag: impl Into<String>, theme: impl Into<String>) -> Self {
        self.by_color.insert(color_tag.into(), theme.into());
        self
    }

    pub fn theme_for(&self, color_tag: &str) -> &str {
        self.by_color
            .get(color_tag)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default() {
        let themes = ThemeMap::default().with_theme("neon", "dark");
        assert_eq!(themes.theme_for("neon"), "dark");
        assert_eq!(themes.theme_for("blue"), "light");
    }

    #[test]
    fn reads_partial_json() {
        let themes: ThemeMap = serde_json::from_str(r#"{"byColor": {"gold": "toner"}}"#).unwrap();
        assert_eq!(themes.default, "light");
        assert_eq!(themes.theme_for("gold"), "toner");
    }
}
