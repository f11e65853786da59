//! HTML for the subscription forms, rendered with `tera`. Templates are
//! compiled into the binary.

use tera::Context;
use tera::Tera;

use crate::csrf::NonceAction;
use crate::csrf::NonceIssuer;
use crate::domain::Provider;
use crate::settings::FormDefaults;

mod params;

pub use params::FormDisplayParams;
pub use params::PrivacyLabel;

/// Where hosted forms post to
const SUBMIT_URL: &str = "/subscriptions";

pub struct FormRenderer {
    tera: Tera,
    nonces: NonceIssuer,
    settings_page_url: String,
}

impl FormRenderer {
    pub fn new(
        nonces: NonceIssuer,
        settings_page_url: String,
    ) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        // `.html` names turn autoescaping on
        tera.add_raw_templates(vec![
            ("forms/base.html", include_str!("templates/forms/base.html")),
            (
                "forms/hosted_fields.html",
                include_str!("templates/forms/hosted_fields.html"),
            ),
            (
                "forms/mailchimp.html",
                include_str!("templates/forms/mailchimp.html"),
            ),
            ("forms/kit.html", include_str!("templates/forms/kit.html")),
            (
                "forms/mailerlite.html",
                include_str!("templates/forms/mailerlite.html"),
            ),
            ("forms/custom.html", include_str!("templates/forms/custom.html")),
            ("forms/alert.html", include_str!("templates/forms/alert.html")),
        ])?;
        Ok(Self {
            tera,
            nonces,
            settings_page_url,
        })
    }

    /// Render a form, or a warning pointing at the settings page if the
    /// chosen provider is not fully configured.
    pub fn render(
        &self,
        params: &FormDisplayParams,
        defaults: &FormDefaults,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("wrap_class", &params.wrap_class());
        context.insert("service", params.service.as_str());
        context.insert("title", &params.title);
        context.insert("title_tag", &params.title_tag);
        context.insert("text", &params.text);
        context.insert("bg_image", &params.bg_image);
        context.insert("form_type", &params.form_type);
        context.insert("display_name", &params.display_name);
        let (privacy_markup, privacy_text) = match &params.privacy {
            Some(PrivacyLabel::Stored(markup)) => (markup.as_str(), ""),
            Some(PrivacyLabel::Attribute(text)) => ("", text.as_str()),
            None => ("", ""),
        };
        context.insert("privacy_markup", privacy_markup);
        context.insert("privacy_text", privacy_text);

        if params.service == Provider::Custom {
            if defaults.custom.action.is_none() {
                return self.warning("Please set a form action URL");
            }
            context.insert("custom", &defaults.custom);
            return self.tera.render("forms/custom.html", &context);
        }

        let stored = defaults.for_provider(params.service);
        if !stored.has_credential {
            return self.warning(&format!(
                "Please add your {} Token",
                params.service.label()
            ));
        }
        let list = params
            .list_override()
            .map(str::to_string)
            .or(stored.list);
        let Some(list) = list else {
            return self.warning(missing_list_message(params.service));
        };

        context.insert("list_id", &list);
        context.insert("nonce", &self.nonces.create(NonceAction::Subscribe));
        context.insert("submit_url", SUBMIT_URL);
        let template = format!("forms/{}.html", params.service.as_str());
        self.tera.render(&template, &context)
    }

    fn warning(
        &self,
        message: &str,
    ) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("message", message);
        context.insert("settings_page_url", &self.settings_page_url);
        self.tera.render("forms/alert.html", &context)
    }
}

fn missing_list_message(provider: Provider) -> &'static str {
    match provider {
        Provider::MailChimp => r#"Please select the "List" for your subscription form"#,
        Provider::Kit => "Please select the Kit.com Form",
        Provider::MailerLite => "Please select the MailerLite Group ID",
        Provider::Custom => "Please set a form action URL",
    }
}
