//! Opt-in subscription forms: visitors subscribe through hosted forms, which
//! are forwarded to MailChimp, Kit.com or MailerLite; operators configure
//! the active service through a small admin API.

pub mod authentication;
pub mod configuration;
pub mod csrf;
pub mod dispatcher;
pub mod domain;
pub mod providers;
pub mod renderer;
pub mod routes;
pub mod settings;
pub mod startup;
pub mod telemetry;
pub mod utils;
