//! End-to-end client behavior against a mocked backend

use std::sync::Arc;

use liftwatch_core::config::ClientConfig;
use liftwatch_core::status::{self, ElevatorStatus};
use liftwatch_core::{
    ApiClient, ApiError, AuthService, ClientEvent, Credentials, ElevatorApi, Route, Session, TokenStore, User,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, tokens: &Arc<TokenStore>) -> ApiClient {
    let config = ClientConfig {
        api_base_url: format!("{}/api", server.uri()),
        ..ClientConfig::default()
    };
    ApiClient::new(&config, Arc::clone(tokens)).unwrap()
}

fn operator() -> User {
    User {
        id: 7,
        username: "operator".to_string(),
        role: "user".to_string(),
    }
}

fn login_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "message": "login ok",
        "data": {"token": "tok-123", "user": {"id": 7, "username": "operator", "role": "user"}},
        "timestamp": "2024-06-01T08:00:00+00:00"
    }))
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "success": false,
        "message": "token invalid or expired",
        "data": null
    }))
}

#[tokio::test]
async fn login_persists_session_and_attaches_bearer() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let auth = AuthService::new(client_for(&server, &tokens));

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"username": "operator", "password": "pw", "role": "user"})))
        .respond_with(login_ok())
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"user": {"id": 7, "username": "operator", "role": "user"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = auth.login(&Credentials::new("operator", "pw", "user")).await.unwrap();
    assert!(response.success);

    assert_eq!(tokens.get().unwrap().as_deref(), Some("tok-123"));
    assert_eq!(tokens.get_user().unwrap(), Some(operator()));
    assert!(auth.is_logged_in().unwrap());
    assert_eq!(auth.current_user().unwrap(), Some(operator()));

    let verified = auth.verify_token().await.unwrap();
    assert_eq!(verified.into_data().unwrap().user, operator());
}

#[tokio::test]
async fn anonymous_requests_carry_no_authorization_header() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let elevators = ElevatorApi::new(client_for(&server, &tokens));

    Mock::given(method("GET"))
        .and(path("/api/elevators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
        .mount(&server)
        .await;

    let response = elevators.list().await.unwrap();
    assert_eq!(response.into_data().unwrap().len(), 0);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn register_has_no_session_side_effects() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let auth = AuthService::new(client_for(&server, &tokens));

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true, "message": "registered", "data": null
        })))
        .mount(&server)
        .await;

    let response = auth.register(&Credentials::new("new", "pw", "user")).await.unwrap();
    assert!(response.success);
    assert_eq!(tokens.get().unwrap(), None);
    assert!(!auth.is_logged_in().unwrap());
}

#[tokio::test]
async fn conflict_is_normalized_with_server_message() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let auth = AuthService::new(client_for(&server, &tokens));

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "success": false, "message": "username already exists", "data": null
        })))
        .mount(&server)
        .await;

    let err = auth.register(&Credentials::new("dup", "pw", "user")).await.unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.message(), "username already exists");
    assert_eq!(err.data().unwrap()["success"], json!(false));
}

#[tokio::test]
async fn unauthorized_response_clears_store_and_redirects_session() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let api = client_for(&server, &tokens);
    let mut events = api.subscribe();
    let mut session = Session::new(api.clone());
    let elevators = ElevatorApi::new(api);

    session.login(operator(), "tok-123".to_string()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/elevators"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;

    let err = elevators.list().await.unwrap_err();
    assert!(err.is_unauthenticated());
    assert_eq!(err.message(), "token invalid or expired");

    // Store cleared by the HTTP layer itself
    assert_eq!(tokens.get().unwrap(), None);
    assert_eq!(tokens.get_user().unwrap(), None);
    assert_eq!(events.try_recv().unwrap(), ClientEvent::Unauthenticated);

    // Session catches up and asks for the sign-in view
    assert!(session.state().is_authenticated());
    assert_eq!(session.poll_events(), Some(Route::SignIn));
    assert!(!session.state().is_authenticated());
    assert_eq!(session.poll_events(), None);
}

#[tokio::test]
async fn session_sign_in_and_logout() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let session = Session::new(client_for(&server, &tokens));

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(login_ok())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let user = session.sign_in(&Credentials::new("operator", "pw", "user")).await.unwrap();
    assert_eq!(user, operator());
    assert_eq!(session.state().username(), "operator");
    assert!(session.auth().is_logged_in().unwrap());

    session.logout().await;
    assert!(!session.state().is_authenticated());
    assert!(session.state().token.is_none());
    assert!(!session.auth().is_logged_in().unwrap());
}

#[tokio::test]
async fn logout_server_error_still_clears_locally() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let auth = AuthService::new(client_for(&server, &tokens));

    tokens.set("tok-123").unwrap();
    tokens.set_user(Some(&operator())).unwrap();

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"success": false, "message": "boom"})))
        .mount(&server)
        .await;

    let err = auth.logout().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(!auth.is_logged_in().unwrap());
}

#[tokio::test]
async fn sign_in_rejected_envelope() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let session = Session::new(client_for(&server, &tokens));

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false, "message": "account disabled"
        })))
        .mount(&server)
        .await;

    let err = session.sign_in(&Credentials::new("operator", "pw", "user")).await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { ref message } if message == "account disabled"));
    assert!(!session.state().is_authenticated());
    assert_eq!(tokens.get().unwrap(), None);
}

#[tokio::test]
async fn verify_refreshes_user() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let session = Session::new(client_for(&server, &tokens));
    session.login(operator(), "tok-123".to_string()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"user": {"id": 7, "username": "operator", "role": "admin"}}
        })))
        .mount(&server)
        .await;

    assert!(session.check_auth_status().await);

    let state = session.state();
    assert!(state.is_authenticated());
    assert!(state.is_admin());
    assert!(!state.loading);
    assert_eq!(tokens.get_user().unwrap().unwrap().role, "admin");
}

#[tokio::test]
async fn verify_unsuccessful_envelope_signs_out() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let session = Session::new(client_for(&server, &tokens));
    session.login(operator(), "tok-123".to_string()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "revoked"})))
        .mount(&server)
        .await;

    assert!(!session.verify_token().await);
    let state = session.state();
    assert!(!state.is_authenticated());
    assert!(state.user.is_none());
    assert!(!state.loading);
    assert_eq!(tokens.get().unwrap(), None);
}

#[tokio::test]
async fn anonymous_status_check_makes_no_request() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let session = Session::new(client_for(&server, &tokens));

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!session.check_auth_status().await);
    assert!(!session.verify_token().await);
}

#[tokio::test]
async fn restore_verifies_by_default() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    tokens.set("tok-123").unwrap();
    tokens.set_user(Some(&operator())).unwrap();
    let session = Session::new(client_for(&server, &tokens));

    Mock::given(method("GET"))
        .and(path("/api/auth/verify"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;

    assert!(!session.restore().await.unwrap());
    assert!(!session.state().is_authenticated());
    assert!(!session.auth().is_logged_in().unwrap());
}

#[tokio::test]
async fn elevator_not_found_messages() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let elevators = ElevatorApi::new(client_for(&server, &tokens));

    Mock::given(method("GET"))
        .and(path("/api/elevators/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"success": false, "message": "missing"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/elevators/99/sensors"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/elevators/5/sensors"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"success": false, "message": "db down"})))
        .mount(&server)
        .await;

    let err = elevators.get(99).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(ref m) if m == "elevator not found"));

    let err = elevators.sensors(99).await.unwrap_err();
    assert_eq!(err.message(), "sensor data not found");
    assert_eq!(err.status(), Some(404));

    let err = elevators.sensors(5).await.unwrap_err();
    assert_eq!(err.message(), "db down");
}

#[tokio::test]
async fn fetched_elevators_classify_by_id() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let elevators = ElevatorApi::new(client_for(&server, &tokens));

    Mock::given(method("GET"))
        .and(path("/api/elevators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {"id": 4, "name": "E4", "location": "Library",
                 "sensor": {"acceleration": 13, "speed": 50, "position": 130}},
                {"id": 1, "name": "E1", "location": "Building A",
                 "sensor": {"acceleration": 3, "speed": 12, "position": 10}},
                {"id": 2, "name": "E2", "location": "Building B",
                 "sensor": {"acceleration": 0, "speed": 20, "position": 99}},
                {"id": 9, "name": "E9", "location": "Annex", "status": "running",
                 "last_maintenance": "2024-01-01"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/elevators/1/sensors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"id": 1, "type": "speed", "value": 12.0, "is_abnormal": false, "timestamp": "2024-06-01T08:00:00"}]
        })))
        .mount(&server)
        .await;

    let list = elevators.list().await.unwrap().into_data().unwrap();
    let by_id = status::statuses_by_id(&list);
    assert_eq!(by_id[&4], ElevatorStatus::Fault);
    assert_eq!(by_id[&1], ElevatorStatus::Normal);
    assert_eq!(by_id[&2], ElevatorStatus::Warning);

    // Never measured: no status at all rather than a default "normal"
    assert_eq!(list[3].derived_status(), None);
    assert!(!by_id.contains_key(&9));

    let readings = elevators.sensors(1).await.unwrap().into_data().unwrap();
    assert_eq!(readings[0].kind, "speed");
    assert!(!readings[0].is_abnormal);
}

#[tokio::test]
async fn undecodable_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::in_memory());
    let elevators = ElevatorApi::new(client_for(&server, &tokens));

    Mock::given(method("GET"))
        .and(path("/api/elevators"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy page</html>"))
        .mount(&server)
        .await;

    let err = elevators.list().await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}
