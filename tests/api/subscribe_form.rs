use serde_json::json;
use serde_json::Value;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::hidden_input;
use crate::helpers::spawn_app;
use crate::helpers::spawn_app_with;

#[tokio::test]
async fn unconfigured_form_shows_a_warning() {
    let app = spawn_app().await;

    let resp = app.get_subscribe_form(&[]).await;
    assert_eq!(resp.status().as_u16(), 200);
    assert!(resp
        .headers()
        .get("Content-Type")
        .is_some_and(|v| v.to_str().unwrap().starts_with("text/html")));

    let html = resp.text().await.unwrap();
    assert!(html.contains("Please add your MailChimp Token in"));
    assert!(html.contains("Opt-In Forms Settings"));
    assert!(!html.contains("<form"));
}

#[tokio::test]
async fn missing_list_shows_a_provider_specific_warning() {
    let app = spawn_app_with(&[
        ("subscription_service", "kit"),
        ("kit_token", "kit-key"),
    ])
    .await;

    let html = app.get_subscribe_form(&[]).await.text().await.unwrap();
    assert!(html.contains("Please select the Kit.com Form"));
}

#[tokio::test]
async fn configured_form_posts_back_to_subscriptions() {
    let app = spawn_app_with(&[
        ("mailchimp_token", "key-us1"),
        ("mailchimp_list", "abc"),
    ])
    .await;

    let html = app
        .get_subscribe_form(&[("title", "Join us"), ("display_name", "true")])
        .await
        .text()
        .await
        .unwrap();
    assert!(html.contains("Join us"));
    assert!(html.contains(r#"name="USER""#));
    assert!(html.contains(r#"name="EMAIL""#));
    assert_eq!(hidden_input(&html, "service").as_deref(), Some("mailchimp"));
    assert_eq!(hidden_input(&html, "list_id").as_deref(), Some("abc"));

    // the embedded nonce is accepted by the submission endpoint
    let nonce = hidden_input(&html, "_nonce").unwrap();
    Mock::given(method("POST"))
        .and(path("/mailchimp/lists/abc/members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "subscribed" })))
        .expect(1)
        .mount(&app.provider_server)
        .await;

    let resp = app
        .post_subscriptions(&[
            ("service", "mailchimp"),
            ("list_id", "abc"),
            ("EMAIL", "ursula_le_guin@gmail.com"),
            ("_nonce", nonce.as_str()),
        ])
        .await;
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn list_id_attribute_overrides_the_stored_list() {
    let app = spawn_app_with(&[
        ("mailerlite_token", "ml-key"),
        ("mailerlite_group", "42"),
    ])
    .await;

    let html = app
        .get_subscribe_form(&[("service", "mailerlite"), ("list_id", "99")])
        .await
        .text()
        .await
        .unwrap();
    assert_eq!(hidden_input(&html, "list_id").as_deref(), Some("99"));

    let html = app
        .get_subscribe_form(&[("service", "mailerlite"), ("list_id", "default")])
        .await
        .text()
        .await
        .unwrap();
    assert_eq!(hidden_input(&html, "list_id").as_deref(), Some("42"));
}

#[tokio::test]
async fn custom_form_posts_to_the_configured_action() {
    let app = spawn_app_with(&[
        ("subscription_service", "custom"),
        ("custom_form_action", "https://lists.example.com/join"),
        ("custom_email_name", "subscriber_email"),
        ("custom_hidden_fields", "source=blog\n\n=orphan\n"),
    ])
    .await;

    let html = app.get_subscribe_form(&[]).await.text().await.unwrap();
    assert!(html.contains(r#"target="_blank""#));
    assert!(html.contains("lists.example.com"));
    assert!(html.contains(r#"name="subscriber_email""#));
    assert_eq!(hidden_input(&html, "source").as_deref(), Some("blog"));
    assert!(!html.contains("orphan"));
    // no nonce: the form never reaches this server
    assert_eq!(hidden_input(&html, "_nonce"), None);
}

#[tokio::test]
async fn widget_uses_its_own_title() {
    let app = spawn_app_with(&[
        ("mailchimp_token", "key-us1"),
        ("mailchimp_list", "abc"),
    ])
    .await;

    let html = app.get_subscribe_widget().await.text().await.unwrap();
    assert!(html.contains("Subscription Form"));
    assert!(html.contains("pk-subscribe-form-widget"));
}

#[tokio::test]
async fn privacy_attribute_is_escaped() {
    let app = spawn_app_with(&[
        ("mailchimp_token", "key-us1"),
        ("mailchimp_list", "abc"),
    ])
    .await;

    let html = app
        .get_subscribe_form(&[("privacy", "<script>alert(document.cookie)</script>")])
        .await
        .text()
        .await
        .unwrap();
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(document.cookie)&lt;&#x2F;script&gt;"));
}

#[tokio::test]
async fn stored_privacy_text_keeps_its_markup() {
    let app = spawn_app_with(&[
        ("mailchimp_token", "key-us1"),
        ("mailchimp_list", "abc"),
        ("privacy_text", r#"I accept the <a href="/privacy">policy</a>"#),
    ])
    .await;

    let html = app.get_subscribe_widget().await.text().await.unwrap();
    assert!(html.contains(r#"<a href="/privacy">policy</a>"#));
}
