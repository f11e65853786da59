use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// The mailing-list services a form can forward subscribers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    MailChimp,
    Kit,
    MailerLite,
    /// The browser posts straight to an operator-configured endpoint; there
    /// is no server-side call for this one.
    Custom,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::MailChimp,
        Provider::Kit,
        Provider::MailerLite,
        Provider::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::MailChimp => "mailchimp",
            Provider::Kit => "kit",
            Provider::MailerLite => "mailerlite",
            Provider::Custom => "custom",
        }
    }

    /// Human readable name, as shown in configuration warnings.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::MailChimp => "MailChimp",
            Provider::Kit => "Kit.com",
            Provider::MailerLite => "MailerLite",
            Provider::Custom => "Custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mailchimp" => Some(Provider::MailChimp),
            "kit" => Some(Provider::Kit),
            "mailerlite" => Some(Provider::MailerLite),
            "custom" => Some(Provider::Custom),
            _ => None,
        }
    }

    /// Resolve a submitted or stored `service` value. Anything unrecognised
    /// (including a missing value) falls back to MailChimp, which was the
    /// only service forms knew about before the others were added.
    pub fn resolve(value: Option<&str>) -> Self {
        match value.map(|v| (v, Self::parse(v))) {
            Some((_, Some(p))) => p,
            Some((v, None)) => {
                tracing::warn!(service = %v, "unrecognised service, falling back to mailchimp");
                Provider::MailChimp
            }
            None => Provider::MailChimp,
        }
    }

    /// `false` for `Custom`, which never talks to a remote API.
    pub fn is_remote(&self) -> bool { !matches!(self, Provider::Custom) }
}

impl Display for Provider {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
