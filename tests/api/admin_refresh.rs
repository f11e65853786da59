use serde_json::json;
use serde_json::Value;
use wiremock::matchers::any;
use wiremock::matchers::basic_auth;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::spawn_app;
use crate::helpers::spawn_app_with;

#[tokio::test]
async fn refresh_lists_with_probe_key_and_keeps_stored_key() {
    let app = spawn_app_with(&[("mailchimp_token", "stored-key")]).await;

    Mock::given(method("GET"))
        .and(path("/mailchimp/lists"))
        .and(basic_auth("apikey", "probe-key"))
        .and(query_param("count", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [
                { "id": "abc", "name": "Newsletter" },
                { "id": "def", "name": "Launch" },
            ],
        })))
        .expect(1)
        .mount(&app.provider_server)
        .await;

    let resp = app
        .post_refresh(
            "mailchimp",
            &[
                ("api_key", "probe-key"),
                ("_nonce", app.admin_nonce().as_str()),
            ],
        )
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(
        json,
        json!({
            "success": true,
            "data": [
                { "id": "abc", "name": "Newsletter" },
                { "id": "def", "name": "Launch" },
            ],
        })
    );
    assert_eq!(
        app.get_option("mailchimp_token").await.as_deref(),
        Some("stored-key")
    );
}

#[tokio::test]
async fn refresh_without_stored_key_leaves_none_behind() {
    let app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path("/kit/forms"))
        .and(query_param("api_key", "probe-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "forms": [{ "id": 123, "name": "Sidebar" }],
        })))
        .expect(1)
        .mount(&app.provider_server)
        .await;

    let resp = app
        .post_refresh(
            "kit",
            &[
                ("api_key", " probe-key "),
                ("_nonce", app.admin_nonce().as_str()),
            ],
        )
        .await;
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"], json!([{ "id": "123", "name": "Sidebar" }]));
    assert_eq!(app.get_option("kit_token").await, None);
}

#[tokio::test]
async fn provider_rejection_is_reported_and_stored_key_restored() {
    let app = spawn_app_with(&[("mailerlite_token", "stored-key")]).await;

    Mock::given(method("GET"))
        .and(path("/mailerlite/groups"))
        .and(header("X-MailerLite-ApiKey", "probe-key"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": 1, "message": "Unauthorized" },
        })))
        .expect(1)
        .mount(&app.provider_server)
        .await;

    let resp = app
        .post_refresh(
            "mailerlite",
            &[
                ("api_key", "probe-key"),
                ("_nonce", app.admin_nonce().as_str()),
            ],
        )
        .await;
    assert_eq!(resp.status().as_u16(), 502);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json, json!({ "success": false, "data": "Unauthorized" }));
    assert_eq!(
        app.get_option("mailerlite_token").await.as_deref(),
        Some("stored-key")
    );
}

#[tokio::test]
async fn mailchimp_problem_details_are_reported() {
    let app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path("/mailchimp/lists"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "https://mailchimp.com/developer/marketing/docs/errors/",
            "title": "API Key Invalid",
            "status": 401,
            "detail": "Your API key may be invalid.",
        })))
        .expect(1)
        .mount(&app.provider_server)
        .await;

    let resp = app
        .post_refresh(
            "mailchimp",
            &[
                ("api_key", "bad-key"),
                ("_nonce", app.admin_nonce().as_str()),
            ],
        )
        .await;
    assert_eq!(resp.status().as_u16(), 502);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(
        json["data"],
        "https://mailchimp.com/developer/marketing/docs/errors/: API Key Invalid - Your API key may be invalid."
    );
}

#[tokio::test]
async fn bad_refresh_requests_never_reach_a_provider() {
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.provider_server)
        .await;

    let admin_nonce = app.admin_nonce();
    let subscribe_nonce = app.subscribe_nonce();
    let cases = [
        (
            "aweber",
            vec![("api_key", "k"), ("_nonce", admin_nonce.as_str())],
            404,
        ),
        (
            "custom",
            vec![("api_key", "k"), ("_nonce", admin_nonce.as_str())],
            404,
        ),
        (
            "kit",
            vec![("api_key", "k"), ("_nonce", subscribe_nonce.as_str())],
            403,
        ),
        ("kit", vec![("api_key", "k")], 403),
        ("kit", vec![("_nonce", admin_nonce.as_str())], 400),
        (
            "kit",
            vec![("api_key", "   "), ("_nonce", admin_nonce.as_str())],
            400,
        ),
    ];

    for (provider, body, status) in cases {
        let resp = app.post_refresh(provider, &body).await;
        assert_eq!(resp.status().as_u16(), status, "{provider} {body:?}");

        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["success"], false);
    }
}
