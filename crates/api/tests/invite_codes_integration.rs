//! Integration tests for the invite code endpoints on the local backend.

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use common::{
    body_bytes, consume_as_new_client, create_code, create_test_app,
    create_unconnected_remote_app, get_request, get_request_as_client, issued_cookie,
    json_request, json_request_with_auth, parse_response_body, request_with_auth, send,
    setup_admin,
};
use serde_json::json;

#[tokio::test]
async fn test_health_reports_local_backend() {
    let app = create_test_app();
    let response = send(&app, get_request("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "local");
    assert!(body.get("database").is_none());
}

#[tokio::test]
async fn test_health_unhealthy_when_remote_unconnected() {
    let app = create_unconnected_remote_app();
    let response = send(&app, get_request("/api/health")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = parse_response_body(response).await;
    assert_eq!(body["backend"], "remote");
    assert_eq!(body["database"]["connected"], false);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/invite-codes/validate",
            json!({ "code": "ANY" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_single_use_code_lifecycle() {
    let app = create_test_app();
    let token = setup_admin(&app).await;
    let invite = create_code(&app, &token, json!({ "type": "single" })).await;
    let code = invite["code"].as_str().unwrap();

    assert_eq!(invite["maxUses"], 1);
    assert_eq!(invite["status"], "active");
    assert_eq!(invite["createdBy"], common::ADMIN_USERNAME);
    assert_eq!(code.len(), 12);

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/invite-codes/validate", json!({ "code": code })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["valid"], true);

    let consume = |session: &'static str| {
        json_request(
            Method::POST,
            "/api/v1/invite-codes/consume",
            json!({ "code": code, "sessionId": session }),
        )
    };

    let response = send(&app, consume("session-1")).await;
    assert_eq!(parse_response_body(response).await["success"], true);

    let response = send(&app, consume("session-2")).await;
    assert_eq!(parse_response_body(response).await["success"], false);

    let response = send(
        &app,
        json_request(Method::POST, "/api/v1/invite-codes/validate", json!({ "code": code })),
    )
    .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "code inactive");
    assert_eq!(body["code"]["status"], "used");
    assert_eq!(body["code"]["usedCount"], 1);
}

#[tokio::test]
async fn test_consumption_records_client_and_remembers_code() {
    let app = create_test_app();
    let token = setup_admin(&app).await;
    let invite = create_code(&app, &token, json!({ "type": "multiple", "maxUses": 3 })).await;
    let code = invite["code"].as_str().unwrap();
    let id = invite["id"].as_str().unwrap();

    let mut request = json_request(
        Method::POST,
        "/api/v1/invite-codes/consume",
        json!({ "code": code, "sessionId": "quiz-42" }),
    );
    request
        .headers_mut()
        .insert(header::USER_AGENT, "TestBrowser/1.0".parse().unwrap());
    request
        .headers_mut()
        .insert("X-Forwarded-For", "203.0.113.9, 10.0.0.1".parse().unwrap());
    let response = send(&app, request).await;
    let cookie = issued_cookie(&response);
    assert!(response.headers().contains_key("x-client-id"));
    assert_eq!(parse_response_body(response).await["success"], true);

    let response = send(
        &app,
        request_with_auth(
            Method::GET,
            &format!("/api/v1/admin/invite-codes/{}/usages", id),
            &token,
        ),
    )
    .await;
    let usages = parse_response_body(response).await;
    assert_eq!(usages.as_array().unwrap().len(), 1);
    assert_eq!(usages[0]["sessionId"], "quiz-42");
    assert_eq!(usages[0]["userAgent"], "TestBrowser/1.0");
    assert_eq!(usages[0]["ipAddress"], "203.0.113.9");

    let response = send(&app, get_request_as_client("/api/v1/invite-codes/mine", &cookie)).await;
    let body = parse_response_body(response).await;
    assert_eq!(body["code"], code);
    assert_eq!(body["valid"], true);
}

#[tokio::test]
async fn test_clients_do_not_see_each_others_code() {
    let app = create_test_app();
    let token = setup_admin(&app).await;
    let first = create_code(&app, &token, json!({ "type": "single" })).await;
    let second = create_code(&app, &token, json!({ "type": "single" })).await;

    let (body, alice) = consume_as_new_client(&app, first["code"].as_str().unwrap(), "a-1").await;
    assert_eq!(body["success"], true);
    let (body, bob) = consume_as_new_client(&app, second["code"].as_str().unwrap(), "b-1").await;
    assert_eq!(body["success"], true);
    let (alice, bob) = (alice.unwrap(), bob.unwrap());
    assert_ne!(alice, bob);

    let response = send(&app, get_request_as_client("/api/v1/invite-codes/mine", &alice)).await;
    assert_eq!(parse_response_body(response).await["code"], first["code"]);
    let response = send(&app, get_request_as_client("/api/v1/invite-codes/mine", &bob)).await;
    assert_eq!(parse_response_body(response).await["code"], second["code"]);

    // A client that never consumed anything sees nothing.
    let response = send(&app, get_request("/api/v1/invite-codes/mine")).await;
    let body = parse_response_body(response).await;
    assert!(body["code"].is_null());
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_known_client_keeps_its_id() {
    let app = create_test_app();
    let token = setup_admin(&app).await;
    let invite = create_code(&app, &token, json!({ "type": "multiple", "maxUses": 2 })).await;
    let code = invite["code"].as_str().unwrap();

    let (_, cookie) = consume_as_new_client(&app, code, "s-1").await;
    let cookie = cookie.unwrap();

    let mut request = json_request(
        Method::POST,
        "/api/v1/invite-codes/consume",
        json!({ "code": code, "sessionId": "s-2" }),
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn test_failed_consumption_issues_no_client_id() {
    let app = create_test_app();
    let (body, cookie) = consume_as_new_client(&app, "MISSING", "s-1").await;
    assert_eq!(body["success"], false);
    assert!(cookie.is_none());
}

#[tokio::test]
async fn test_session_id_length_limit() {
    let app = create_test_app();
    let token = setup_admin(&app).await;
    let invite = create_code(&app, &token, json!({ "type": "unlimited" })).await;
    let code = invite["code"].as_str().unwrap();

    let consume = |session_id: String| {
        json_request(
            Method::POST,
            "/api/v1/invite-codes/consume",
            json!({ "code": code, "sessionId": session_id }),
        )
    };
    let response = send(&app, consume("s".repeat(255))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["success"], true);

    let response = send(&app, consume("s".repeat(256))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_code_reports_expired_twice() {
    let app = create_test_app();
    let token = setup_admin(&app).await;
    let expires_at = Utc::now() - Duration::seconds(1);
    let invite = create_code(
        &app,
        &token,
        json!({ "type": "single", "expiresAt": expires_at }),
    )
    .await;
    let code = invite["code"].as_str().unwrap();

    for _ in 0..2 {
        let response = send(
            &app,
            json_request(Method::POST, "/api/v1/invite-codes/validate", json!({ "code": code })),
        )
        .await;
        let body = parse_response_body(response).await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["reason"], "expired");
        assert_eq!(body["code"]["status"], "expired");
    }
}

#[tokio::test]
async fn test_unknown_code() {
    let app = create_test_app();
    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/invite-codes/validate",
            json!({ "code": "NOPE" }),
        ),
    )
    .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["reason"], "code does not exist");
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = create_test_app();
    let response = send(&app, get_request("/api/v1/admin/invite-codes")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        request_with_auth(Method::GET, "/api/v1/admin/invite-codes", "not-a-token"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_listing_stats_and_overrides() {
    let app = create_test_app();
    let token = setup_admin(&app).await;

    let first = create_code(&app, &token, json!({ "type": "single", "note": "first" })).await;
    let second = create_code(&app, &token, json!({ "type": "unlimited", "maxUses": 5 })).await;
    assert_eq!(second["maxUses"], -1);

    let response = send(
        &app,
        request_with_auth(Method::GET, "/api/v1/admin/invite-codes", &token),
    )
    .await;
    let list = parse_response_body(response).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(list[0]["id"], second["id"]);

    let first_id = first["id"].as_str().unwrap();
    let response = send(
        &app,
        json_request_with_auth(
            Method::PATCH,
            &format!("/api/v1/admin/invite-codes/{}/status", first_id),
            json!({ "status": "disabled" }),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["status"], "disabled");

    let response = send(
        &app,
        request_with_auth(Method::GET, "/api/v1/admin/invite-codes/stats", &token),
    )
    .await;
    let stats = parse_response_body(response).await;
    assert_eq!(stats["totalCodes"], 2);
    assert_eq!(stats["activeCodes"], 1);
    assert_eq!(stats["disabledCodes"], 1);
    assert_eq!(stats["totalUsages"], 0);

    let response = send(
        &app,
        request_with_auth(
            Method::DELETE,
            &format!("/api/v1/admin/invite-codes/{}", first_id),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        request_with_auth(
            Method::GET,
            &format!("/api/v1/admin/invite-codes/{}", first_id),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        request_with_auth(
            Method::DELETE,
            &format!("/api/v1/admin/invite-codes/{}", first_id),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_create_respects_limit() {
    let app = create_test_app();
    let token = setup_admin(&app).await;

    let response = send(
        &app,
        json_request_with_auth(
            Method::POST,
            "/api/v1/admin/invite-codes/batch",
            json!({ "count": 4, "type": "multiple", "prefix": "GRP-", "length": 6 }),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["created"], 4);
    for invite in body["codes"].as_array().unwrap() {
        let code = invite["code"].as_str().unwrap();
        assert!(code.starts_with("GRP-"));
        assert_eq!(code.len(), 10);
        assert_eq!(invite["maxUses"], 10);
    }

    let response = send(
        &app,
        json_request_with_auth(
            Method::POST,
            "/api/v1/admin/invite-codes/batch",
            json!({ "count": 11, "type": "single" }),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_options_are_rejected() {
    let app = create_test_app();
    let token = setup_admin(&app).await;

    let response = send(
        &app,
        json_request_with_auth(
            Method::POST,
            "/api/v1/admin/invite-codes",
            json!({ "type": "single", "length": 0 }),
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_created_by_length_limit() {
    let app = create_test_app();
    let token = setup_admin(&app).await;

    let invite = create_code(
        &app,
        &token,
        json!({ "type": "single", "createdBy": "c".repeat(64) }),
    )
    .await;
    assert_eq!(invite["createdBy"], "c".repeat(64));

    for (uri, body) in [
        (
            "/api/v1/admin/invite-codes",
            json!({ "type": "single", "createdBy": "c".repeat(65) }),
        ),
        (
            "/api/v1/admin/invite-codes/batch",
            json!({ "count": 2, "type": "single", "createdBy": "c".repeat(65) }),
        ),
    ] {
        let response = send(&app, json_request_with_auth(Method::POST, uri, body, &token)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_response_body(response).await;
        assert!(body["message"].as_str().unwrap().contains("createdBy"));
    }
}

#[tokio::test]
async fn test_generate_preview_stores_nothing() {
    let app = create_test_app();
    let token = setup_admin(&app).await;

    let response = send(
        &app,
        request_with_auth(
            Method::GET,
            "/api/v1/admin/invite-codes/generate?length=8&prefix=PRE-",
            &token,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let code = parse_response_body(response).await["code"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(code.starts_with("PRE-"));
    assert!(code[4..]
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(code.len(), 12);

    let response = send(
        &app,
        request_with_auth(Method::GET, "/api/v1/admin/invite-codes", &token),
    )
    .await;
    assert!(parse_response_body(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_csv_export() {
    let app = create_test_app();
    let token = setup_admin(&app).await;
    create_code(&app, &token, json!({ "type": "single", "note": "say \"hi\"" })).await;

    let response = send(
        &app,
        request_with_auth(Method::GET, "/api/v1/admin/invite-codes/export", &token),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"invite-codes-"));
    assert!(disposition.ends_with(".csv\""));

    let csv = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(csv.starts_with('\u{feff}'));
    let lines: Vec<&str> = csv.trim_end().lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("\"single-use\",\"1\",\"0\",\"active\""));
    assert!(lines[1].ends_with("\"never\",\"say \"\"hi\"\"\""));
}
