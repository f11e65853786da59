use std::collections::HashMap;

use crate::domain::Provider;
use crate::settings::FormDefaults;
use crate::utils::parse_flag;

/// Tags the title may be wrapped in; anything else falls back to `h3`
const TITLE_TAGS: [&str; 9] = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "div", "span"];

/// Label next to the privacy checkbox
#[derive(Debug, Clone, PartialEq)]
pub enum PrivacyLabel {
    /// Saved by the operator through the admin API; rendered as markup
    Stored(String),
    /// Passed with the request; rendered as escaped text
    Attribute(String),
}

/// How one form should look, and where it subscribes to
#[derive(Debug, Clone, PartialEq)]
pub struct FormDisplayParams {
    pub title: String,
    pub text: String,
    pub bg_image: String,
    /// `default` (or empty) means the stored default list of the provider
    pub list_id: String,
    pub form_type: String,
    pub display_name: bool,
    pub service: Provider,
    pub privacy: Option<PrivacyLabel>,
    pub title_tag: String,
}

impl FormDisplayParams {
    /// Attributes of an embedded (shortcode) form. Missing attributes take
    /// their defaults; the service and privacy text default to the stored
    /// settings.
    pub fn from_shortcode(
        attrs: &HashMap<String, String>,
        defaults: &FormDefaults,
    ) -> Self {
        Self::from_attrs(attrs, defaults, "", "block")
    }

    /// Settings of a sidebar widget
    pub fn from_widget(
        instance: &HashMap<String, String>,
        defaults: &FormDefaults,
    ) -> Self {
        Self::from_attrs(instance, defaults, "Subscription Form", "widget")
    }

    fn from_attrs(
        attrs: &HashMap<String, String>,
        defaults: &FormDefaults,
        title: &str,
        form_type: &str,
    ) -> Self {
        let attr = |k: &str, default: &str| {
            attrs
                .get(k)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| default.to_string())
        };
        let title_tag = attr("title_tag", "h3").to_lowercase();
        Self {
            title: attr("title", title),
            text: attr("text", ""),
            bg_image: attr("bg_image", ""),
            list_id: attr("list_id", "default"),
            form_type: attr("type", form_type),
            display_name: attrs.get("display_name").is_some_and(|v| parse_flag(v)),
            service: match attrs.get("service") {
                Some(s) => Provider::resolve(Some(s)),
                None => defaults.active_provider,
            },
            privacy: match attrs.get("privacy").map(|v| v.trim()) {
                Some("") => None,
                Some(label) => Some(PrivacyLabel::Attribute(label.to_string())),
                None => defaults
                    .privacy_text
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .map(PrivacyLabel::Stored),
            },
            title_tag: match TITLE_TAGS.contains(&title_tag.as_str()) {
                true => title_tag,
                false => "h3".to_string(),
            },
        }
    }

    pub fn wrap_class(&self) -> String {
        let mut class = format!("pk-subscribe-form-{}", self.form_type);
        if !self.bg_image.is_empty() {
            class.push_str(" pk-subscribe-with-bg");
        }
        if self.display_name {
            class.push_str(" pk-subscribe-with-name");
        }
        class
    }

    /// The list override, unless it defers to the stored default
    pub fn list_override(&self) -> Option<&str> {
        match self.list_id.as_str() {
            "" | "default" => None,
            list => Some(list),
        }
    }
}
