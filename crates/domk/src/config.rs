//! Host configuration

use serde::Deserialize;

/// Class names and stylesheet settings used by the binding engine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Class marking list templates; removed from instantiated clones
    pub template_class: String,
    /// Class toggled by the `visible` binding
    pub hidden_class: String,
    /// `id` of the injected stylesheet element
    pub style_element_id: String,
    /// Insert the stylesheet hiding templates and hidden nodes
    pub inject_styles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_class: "domk-template".to_string(),
            hidden_class: "domk-hide".to_string(),
            style_element_id: "domk-styles".to_string(),
            inject_styles: true,
        }
    }
}

impl Config {
    /// Stylesheet text for the injected `<style>` element
    pub fn stylesheet(&self) -> String {
        format!(
            ".{} {{ display: none !important; }} .{} {{ display: none !important; }}",
            self.template_class, self.hidden_class
        )
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde::de::value::{Error, MapDeserializer};

    use super::*;

    #[test]
    fn test_default_stylesheet() {
        let config = Config::default();
        assert_eq!(
            config.stylesheet(),
            ".domk-template { display: none !important; } .domk-hide { display: none !important; }"
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let pairs = [("hidden_class", "gone"), ("style_element_id", "app-styles")];
        let config = Config::deserialize(MapDeserializer::<_, Error>::new(pairs.into_iter())).unwrap();
        assert_eq!(config.hidden_class, "gone");
        assert_eq!(config.style_element_id, "app-styles");
        assert_eq!(config.template_class, "domk-template");
        assert!(config.inject_styles);

        let config = Config::deserialize(MapDeserializer::<_, Error>::new([("inject_styles", false)].into_iter())).unwrap();
        assert_eq!(config, Config { inject_styles: false, ..Config::default() });
    }

    #[test]
    fn test_mistyped_config_is_rejected() {
        let pairs = [("inject_styles", "sometimes")];
        assert!(Config::deserialize(MapDeserializer::<_, Error>::new(pairs.into_iter())).is_err());
    }
}
