use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};
use tessera_auth::oauth::pkce;
use tessera_auth::prelude::*;
use tessera_auth::types::{DataScope, DataScopeType, NewAuthorizationCode};
use tessera_server::config::{BootstrapApp, BootstrapClient};
use tessera_server::{AppConfig, AppState, build_state, router};
use tessera_webhooks::WebhookEvent;
use time::{Duration, OffsetDateTime};
use tokio::task::JoinHandle;
use wiremock::matchers::{header_exists, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BACKEND_SECRET: &str = "cs_backend_integration_secret";

fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.issuer = "https://id.tessera.test".into();
    cfg.auth.signing.private_key_pem = Some(include_str!("fixtures/signing_key.pem").into());
    cfg.auth.signing.key_id = Some("integration".into());
    cfg.auth.vault.encryption_key = Some("integration-vault-key".into());
    cfg.bootstrap.apps.push(BootstrapApp {
        id: "app-crm".into(),
        slug: "crm".into(),
        name: "CRM".into(),
        permissions: BTreeMap::from([(
            "admin".into(),
            vec!["contacts:read".into(), "contacts:write".into()],
        )]),
    });
    for (client_id, secret) in [("crm-web", None), ("crm-backend", Some(BACKEND_SECRET))] {
        cfg.bootstrap.clients.push(BootstrapClient {
            client_id: client_id.into(),
            app_id: "app-crm".into(),
            name: client_id.into(),
            secret: secret.map(str::to_string),
            redirect_uris: vec!["https://crm.example.com/cb".into()],
            grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
            scopes: vec![],
            access_token_lifetime: None,
            refresh_token_lifetime: None,
        });
    }
    cfg
}

async fn seed_directory(state: &AppState) {
    let stores = &state.stores;
    stores
        .users
        .save(&User {
            id: "user-1".into(),
            name: Some("Alice Doe".into()),
            email: Some("alice@acme.test".into()),
            email_verified: true,
            picture: None,
            active: true,
        })
        .await
        .unwrap();
    stores
        .entities
        .save(&Entity {
            id: "ent-1".into(),
            name: "Acme".into(),
            slug: "acme".into(),
        })
        .await
        .unwrap();
    stores
        .memberships
        .save(&Membership {
            id: "m-1".into(),
            user_id: "user-1".into(),
            entity_id: "ent-1".into(),
            role: "admin".into(),
            data_scopes: BTreeMap::from([(
                "crm".into(),
                DataScope {
                    scope_type: DataScopeType::Entity,
                    value: Value::Null,
                },
            )]),
            created_at: OffsetDateTime::now_utc() - Duration::days(10),
        })
        .await
        .unwrap();
    stores
        .licenses
        .save(&License {
            id: "lic-1".into(),
            entity_id: "ent-1".into(),
            app_id: "app-crm".into(),
            status: LicenseStatus::Active,
            expires_at: None,
        })
        .await
        .unwrap();
}

async fn start_server() -> (String, AppState, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let state = build_state(&config()).await.expect("build state");
    seed_directory(&state).await;
    let app = router(&state);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), state, tx, server)
}

async fn issue_code(state: &AppState, client_id: &str, challenge: Option<String>) -> String {
    let client = state
        .stores
        .clients
        .find_by_client_id(client_id)
        .await
        .unwrap()
        .unwrap();
    state
        .tokens
        .authorization_codes()
        .issue(
            &client,
            NewAuthorizationCode {
                client_id: String::new(),
                user_id: "user-1".into(),
                redirect_uri: "https://crm.example.com/cb".into(),
                scope: "openid profile email organization".into(),
                code_challenge_method: challenge.as_ref().map(|_| "S256".to_string()),
                code_challenge: challenge,
                nonce: Some("n-0S6_WzA2Mj".into()),
                impersonator: None,
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn public_client_full_lifecycle() {
    let (base, state, shutdown_tx, handle) = start_server().await;
    let http = reqwest::Client::new();

    let verifier = pkce::generate_verifier();
    let code = issue_code(&state, "crm-web", Some(pkce::challenge_from_verifier(&verifier))).await;

    let resp = http
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", "https://crm.example.com/cb"),
            ("code_verifier", verifier.as_str()),
            ("client_id", "crm-web"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["cache-control"], "no-store");
    let tokens: Value = resp.json().await.unwrap();
    assert_eq!(tokens["token_type"], "Bearer");
    assert_eq!(tokens["expires_in"], 3600);
    assert_eq!(tokens["scope"], "openid profile email organization");

    let access = tokens["access_token"].as_str().unwrap();
    let verified = state.tokens.keys().verify::<AccessClaims>(access).unwrap();
    assert_eq!(verified.iss, "https://id.tessera.test");
    assert_eq!(verified.sub, "user-1");
    assert_eq!(verified.aud, "app-crm");
    assert_eq!(verified.claims.entity_slug.as_deref(), Some("acme"));
    assert_eq!(verified.claims.role.as_deref(), Some("admin"));
    assert_eq!(
        verified.claims.permissions,
        ["contacts:read", "contacts:write"]
    );
    assert_eq!(verified.claims.licensed_apps, ["crm"]);

    let id_token = tokens["id_token"].as_str().unwrap();
    let id = state.tokens.keys().verify::<IdTokenClaims>(id_token).unwrap();
    assert_eq!(id.aud, "crm-web");
    assert_eq!(id.claims.nonce.as_deref(), Some("n-0S6_WzA2Mj"));

    // userinfo, both verbs
    let info: Value = http
        .get(format!("{base}/oauth/userinfo"))
        .bearer_auth(access)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["sub"], "user-1");
    assert_eq!(info["email"], "alice@acme.test");
    assert_eq!(info["entity_name"], "Acme");
    let resp = http
        .post(format!("{base}/oauth/userinfo"))
        .bearer_auth(access)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // code replay burns the refresh token issued from it
    let resp = http
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", "https://crm.example.com/cb"),
            ("code_verifier", verifier.as_str()),
            ("client_id", "crm-web"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_grant");

    let refresh = tokens["refresh_token"].as_str().unwrap();
    let resp = http
        .post(format!("{base}/oauth/token"))
        .json(&json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh,
            "client_id": "crm-web",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_grant");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn confidential_client_refresh_revoke_and_introspect() {
    let (base, state, shutdown_tx, handle) = start_server().await;
    let http = reqwest::Client::new();

    let code = issue_code(&state, "crm-backend", None).await;
    let resp = http
        .post(format!("{base}/oauth/token"))
        .basic_auth("crm-backend", Some(BACKEND_SECRET))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", "https://crm.example.com/cb"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let tokens: Value = resp.json().await.unwrap();
    let first_refresh = tokens["refresh_token"].as_str().unwrap().to_string();

    // rotation: new token works, old one is spent
    let resp = http
        .post(format!("{base}/oauth/token"))
        .basic_auth("crm-backend", Some(BACKEND_SECRET))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", first_refresh.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let rotated: Value = resp.json().await.unwrap();
    let second_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(first_refresh, second_refresh);

    let introspect = |token: String| {
        let http = http.clone();
        let base = base.clone();
        async move {
            http.post(format!("{base}/oauth/introspect"))
                .basic_auth("crm-backend", Some(BACKEND_SECRET))
                .form(&[("token", token)])
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    };

    assert_eq!(introspect(first_refresh.clone()).await, json!({"active": false}));
    let active = introspect(second_refresh.clone()).await;
    assert_eq!(active["active"], true);
    assert_eq!(active["token_type"], "refresh_token");
    assert_eq!(active["client_id"], "crm-backend");

    let access = rotated["access_token"].as_str().unwrap().to_string();
    let active = introspect(access).await;
    assert_eq!(active["active"], true);
    assert_eq!(active["sub"], "user-1");
    assert_eq!(active["entity_id"], "ent-1");

    // wrong secret on introspect is a client failure
    let resp = http
        .post(format!("{base}/oauth/introspect"))
        .basic_auth("crm-backend", Some("wrong"))
        .form(&[("token", second_refresh.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // revoke is idempotent
    for _ in 0..2 {
        let resp = http
            .post(format!("{base}/oauth/revoke"))
            .basic_auth("crm-backend", Some(BACKEND_SECRET))
            .form(&[
                ("token", second_refresh.as_str()),
                ("token_type_hint", "refresh_token"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert!(resp.text().await.unwrap().is_empty());
    }

    let resp = http
        .post(format!("{base}/oauth/token"))
        .basic_auth("crm-backend", Some(BACKEND_SECRET))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", second_refresh.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_grant");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn discovery_health_and_error_shapes() {
    let (base, state, shutdown_tx, handle) = start_server().await;
    let http = reqwest::Client::new();

    let health: Value = http
        .get(format!("{base}/healthz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"status": "ok"}));

    let discovery: Value = http
        .get(format!("{base}/.well-known/openid-configuration"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(discovery["issuer"], "https://id.tessera.test");
    assert_eq!(
        discovery["token_endpoint"],
        "https://id.tessera.test/oauth/token"
    );
    assert_eq!(discovery["code_challenge_methods_supported"], json!(["S256", "plain"]));

    let resp = http
        .get(format!("{base}/.well-known/jwks.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["cache-control"], "public, max-age=3600");
    let jwks: Value = resp.json().await.unwrap();
    assert_eq!(jwks["keys"][0]["kid"], state.tokens.keys().kid());
    assert_eq!(jwks["keys"][0]["alg"], "RS256");

    let resp = http
        .post(format!("{base}/oauth/token"))
        .form(&[("grant_type", "password"), ("client_id", "crm-web")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers()["pragma"], "no-cache");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unsupported_grant_type");

    let resp = http
        .post(format!("{base}/oauth/token"))
        .basic_auth("crm-backend", Some("wrong"))
        .form(&[("grant_type", "refresh_token"), ("refresh_token", "rt_x")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().contains_key("www-authenticate"));

    let resp = http
        .post(format!("{base}/oauth/token"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", "rt_x"),
            ("client_id", "crm-backend"),
            ("client_secret", "wrong"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(!resp.headers().contains_key("www-authenticate"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_client");

    let resp = http
        .get(format!("{base}/oauth/userinfo"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert_eq!(
        resp.headers()["www-authenticate"],
        r#"Bearer error="invalid_token""#
    );

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn entity_events_reach_licensed_app_webhooks() {
    let state = build_state(&config()).await.unwrap();
    seed_directory(&state).await;

    let receiver = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("x-tessera-signature"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&receiver)
        .await;

    let (webhook, secret) = state
        .webhooks
        .register(
            "app-crm",
            &receiver.uri(),
            BTreeSet::from([WebhookEvent::MembershipUpdated]),
        )
        .await
        .unwrap();
    // unlicensed app never hears about the entity
    state
        .webhooks
        .register(
            "app-unlicensed",
            &receiver.uri(),
            BTreeSet::from([WebhookEvent::MembershipUpdated]),
        )
        .await
        .unwrap();

    let reports = state
        .webhooks
        .dispatch_to_entity_apps(
            "ent-1",
            WebhookEvent::MembershipUpdated,
            json!({"membershipId": "m-1", "role": "admin"}),
        )
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].app_id, "app-crm");
    let report = reports[0].outcome.as_ref().unwrap();
    assert_eq!(report.results[0].webhook_id, webhook.id);
    assert!(report.results[0].success);

    let requests = receiver.received_requests().await.unwrap();
    let request = &requests[0];
    let signature = request.headers["x-tessera-signature"].to_str().unwrap();
    assert!(tessera_auth::vault::verify_signature(
        &request.body,
        signature,
        &secret
    ));
    let body: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["data"]["entityId"], "ent-1");
    assert_eq!(body["appId"], "app-crm");
}
