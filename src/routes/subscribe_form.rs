use std::collections::HashMap;

use actix_web::http::header::ContentType;
use actix_web::web;
use actix_web::HttpResponse;

use crate::renderer::FormDisplayParams;
use crate::renderer::FormRenderer;
use crate::settings::FormDefaults;
use crate::settings::SettingsStore;
use crate::utils::error_500;

async fn render_with(
    settings: &SettingsStore,
    renderer: &FormRenderer,
    params: impl FnOnce(&FormDefaults) -> FormDisplayParams,
) -> Result<HttpResponse, actix_web::Error> {
    let defaults = settings.form_defaults().await.map_err(error_500)?;
    let html = renderer
        .render(&params(&defaults), &defaults)
        .map_err(error_500)?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(html))
}

/// `GET /subscribe-form?title=...&list_id=...`
///
/// Embedded form; query parameters are the shortcode attributes.
pub async fn subscribe_form(
    query: web::Query<HashMap<String, String>>,
    settings: web::Data<SettingsStore>,
    renderer: web::Data<FormRenderer>,
) -> Result<HttpResponse, actix_web::Error> {
    render_with(&settings, &renderer, |defaults| {
        FormDisplayParams::from_shortcode(&query, defaults)
    })
    .await
}

/// `GET /widgets/subscribe`
pub async fn subscribe_widget(
    query: web::Query<HashMap<String, String>>,
    settings: web::Data<SettingsStore>,
    renderer: web::Data<FormRenderer>,
) -> Result<HttpResponse, actix_web::Error> {
    render_with(&settings, &renderer, |defaults| {
        FormDisplayParams::from_widget(&query, defaults)
    })
    .await
}
