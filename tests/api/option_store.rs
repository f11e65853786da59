use std::sync::Arc;

use claims::assert_err;
use claims::assert_ok;
use opt_in_forms::providers::KitClient;
use opt_in_forms::settings::OptionStore;
use opt_in_forms::settings::PgOptionStore;
use opt_in_forms::settings::SettingsStore;
use secrecy::Secret;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

use crate::helpers::configure_database;
use crate::helpers::isolated_database;

async fn pg_store() -> PgOptionStore {
    let pool = configure_database(&isolated_database()).await;
    PgOptionStore::new(pool)
}

#[tokio::test]
async fn options_are_written_overwritten_and_deleted() {
    let store = pg_store().await;

    assert_eq!(store.get("kit_token").await.unwrap(), None);

    assert_ok!(store.set("kit_token", "first").await);
    assert_eq!(store.get("kit_token").await.unwrap().as_deref(), Some("first"));

    assert_ok!(store.set("kit_token", "second").await);
    assert_eq!(store.get("kit_token").await.unwrap().as_deref(), Some("second"));

    // empty is a value, not a deletion
    assert_ok!(store.set("kit_form", "").await);
    assert_eq!(store.get("kit_form").await.unwrap().as_deref(), Some(""));

    assert_ok!(store.delete("kit_token").await);
    assert_eq!(store.get("kit_token").await.unwrap(), None);
    // deleting twice is fine
    assert_ok!(store.delete("kit_token").await);
    assert_eq!(store.get("kit_form").await.unwrap().as_deref(), Some(""));
}

async fn kit_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forms"))
        .and(query_param("api_key", "fresh-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "forms": [{ "id": 5, "name": "Footer" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forms"))
        .and(query_param("api_key", "bad-key"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "Authorization Failed",
        })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn refresh_puts_the_stored_key_back_in_postgres() {
    let options = Arc::new(pg_store().await);
    options.set("kit_token", "stored-key").await.unwrap();
    let settings = SettingsStore::new(options.clone());
    let server = kit_server().await;
    let client = KitClient::new(reqwest::Client::new(), server.uri());

    let forms = settings
        .refresh_list(&client, Secret::new("fresh-key".to_string()))
        .await
        .unwrap();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].id, "5");
    assert_eq!(
        options.get("kit_token").await.unwrap().as_deref(),
        Some("stored-key")
    );

    assert_err!(
        settings
            .refresh_list(&client, Secret::new("bad-key".to_string()))
            .await
    );
    assert_eq!(
        options.get("kit_token").await.unwrap().as_deref(),
        Some("stored-key")
    );
}

#[tokio::test]
async fn refresh_without_stored_key_deletes_the_row() {
    let options = Arc::new(pg_store().await);
    let settings = SettingsStore::new(options.clone());
    let server = kit_server().await;
    let client = KitClient::new(reqwest::Client::new(), server.uri());

    assert_ok!(
        settings
            .refresh_list(&client, Secret::new("fresh-key".to_string()))
            .await
    );
    assert_eq!(options.get("kit_token").await.unwrap(), None);

    assert_err!(
        settings
            .refresh_list(&client, Secret::new("bad-key".to_string()))
            .await
    );
    assert_eq!(options.get("kit_token").await.unwrap(), None);
}
