//! Integration tests for the HTTP API, run against the in-memory store, the
//! bundled CRF model and a scripted language model.

mod common;

use axum::http::StatusCode;
use common::{test_app, test_app_without_model, EXAMPLE};
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Service endpoints
// =============================================================================

#[tokio::test]
async fn root_and_health_need_no_auth() {
    let app = test_app(Vec::new());

    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

// =============================================================================
// Users and sessions
// =============================================================================

#[tokio::test]
async fn registering_the_same_email_twice_conflicts() {
    let app = test_app(Vec::new());
    let (status, body) = app.register("ana").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["full_name"], "Usuaria de Prueba");
    assert!(body.get("hashed_password").is_none());

    let (status, _) = app
        .send(
            "POST",
            "/api/users/register",
            None,
            Some(json!({ "email": "ANA@example.com", "username": "otra", "password": "secreto123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(
            "POST",
            "/api/users/register",
            None,
            Some(json!({ "email": "nueva@example.com", "username": "ana", "password": "secreto123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_validates_input() {
    let app = test_app(Vec::new());
    let (status, _) = app
        .send(
            "POST",
            "/api/users/register",
            None,
            Some(json!({ "email": "luis@example.com", "username": "luis", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_accepts_email_and_rejects_wrong_password() {
    let app = test_app(Vec::new());
    app.register("marta").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/users/login",
            None,
            Some(json!({ "email": "marta@example.com", "password": "secreto123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["username"], "marta");

    let (status, _) = app
        .send(
            "POST",
            "/api/users/login",
            None,
            Some(json!({ "username": "marta", "password": "incorrecta" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = test_app(Vec::new());
    let (status, _) = app.send("GET", "/api/conversations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/api/users/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = test_app(Vec::new());
    let (token, _) = app.login_new_user("pablo").await;

    let (status, body) = app.send("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "pablo");

    let (status, _) = app.send("POST", "/api/users/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_updates_and_foreign_accounts() {
    let app = test_app(Vec::new());
    let (token, user_id) = app.login_new_user("sofia").await;
    let (_, other_id) = app.login_new_user("diego").await;

    let (status, body) = app
        .send(
            "PUT",
            "/api/users/me",
            Some(&token),
            Some(json!({ "country": "Chile", "bio": "Docente" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "Chile");
    assert_eq!(body["full_name"], "Usuaria de Prueba");

    let (status, _) = app
        .send("GET", &format!("/api/users/{}", user_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    for (method, uri) in [
        ("GET", format!("/api/users/{}", other_id)),
        ("GET", format!("/api/users/{}/conversations", other_id)),
        ("DELETE", format!("/api/users/{}", other_id)),
    ] {
        let (status, _) = app.send(method, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn deleting_an_account_invalidates_its_token() {
    let app = test_app(Vec::new());
    let (token, user_id) = app.login_new_user("elena").await;

    let (status, _) = app
        .send("DELETE", &format!("/api/users/{}", user_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Conversations and messages
// =============================================================================

#[tokio::test]
async fn conversation_crud_and_messages() {
    let app = test_app(Vec::new());
    let (token, _) = app.login_new_user("carla").await;

    let (status, conversation) = app
        .send("POST", "/api/conversations", Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(conversation["title"], "Nueva Conversación");
    let id = conversation["id"].as_str().unwrap().to_string();

    let (status, renamed) = app
        .send(
            "PUT",
            &format!("/api/conversations/{}", id),
            Some(&token),
            Some(json!({ "title": "Ensayo sobre educación" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Ensayo sobre educación");

    for content in ["Primera idea.", "Segunda idea."] {
        let (status, _) = app
            .send(
                "POST",
                &format!("/api/conversations/{}/messages", id),
                Some(&token),
                Some(json!({ "content": content })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = app
        .send(
            "POST",
            &format!("/api/conversations/{}/messages", id),
            Some(&token),
            Some(json!({ "role": "robot", "content": "hola" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, detail) = app
        .send("GET", &format!("/api/conversations/{}", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let messages = detail["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "Primera idea.");
    assert_eq!(messages[1]["role"], "user");

    let (status, list) = app.send("GET", "/api/conversations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn conversations_are_private() {
    let app = test_app(Vec::new());
    let (owner, _) = app.login_new_user("owner").await;
    let (intruder, _) = app.login_new_user("intruder").await;

    let (_, conversation) = app
        .send("POST", "/api/conversations", Some(&owner), Some(json!({ "title": "Privada" })))
        .await;
    let uri = format!("/api/conversations/{}", conversation["id"].as_str().unwrap());

    let (status, _) = app.send("GET", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("DELETE", &uri, Some(&intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.send("GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Argument analysis
// =============================================================================

#[tokio::test]
async fn analyzes_the_example_text() {
    let app = test_app(Vec::new());
    let (token, _) = app.login_new_user("lucia").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/arguments/analyze",
            Some(&token),
            Some(json!({ "text": EXAMPLE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let components = body["components"].as_array().unwrap();
    assert_eq!(components.len(), 2);
    assert_eq!(components[0]["component_type"], "premise");
    assert_eq!(components[0]["text"], "La educación es fundamental para el desarrollo");
    assert_eq!(components[0]["start_char"], 0);
    assert_eq!(components[0]["end_char"], 46);
    assert_eq!(components[1]["component_type"], "conclusion");
    assert_eq!(components[1]["text"], "debemos invertir más en escuelas");
    assert_eq!(components[1]["start_char"], 62);
    assert_eq!(components[1]["end_char"], 94);

    assert_eq!(body["suggestions_status"], "not_requested");
    assert!(body["llm_suggestions"].as_array().unwrap().is_empty());
    assert_eq!(body["paragraphs"][0]["premises_count"], 1);
    assert_eq!(app.completion.calls(), 0);

    // The conversation was created for the request and holds the text as a message.
    let (_, history) = app.send("GET", "/api/arguments/history", Some(&token), None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["title"], "Análisis: La educación es fundamental pa...");
    assert_eq!(history[0]["id"], body["conversation_id"]);

    let (_, messages) = app
        .send(
            "GET",
            &format!("/api/conversations/{}/messages", body["conversation_id"].as_str().unwrap()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(messages[0]["content"], EXAMPLE);
    assert_eq!(messages[0]["id"], body["message_id"]);
}

#[tokio::test]
async fn repeated_analysis_is_deterministic() {
    let app = test_app(Vec::new());
    let (token, _) = app.login_new_user("tomas").await;
    let spans = |body: &serde_json::Value| {
        body["components"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| (c["text"].clone(), c["start_char"].clone(), c["end_char"].clone()))
            .collect::<Vec<_>>()
    };

    let (_, first) = app
        .send("POST", "/api/arguments/analyze", Some(&token), Some(json!({ "text": EXAMPLE })))
        .await;
    let conversation_id = first["conversation_id"].clone();
    let (_, second) = app
        .send(
            "POST",
            "/api/arguments/analyze",
            Some(&token),
            Some(json!({ "text": EXAMPLE, "conversation_id": conversation_id })),
        )
        .await;
    assert_eq!(second["conversation_id"], conversation_id);
    assert_eq!(spans(&first), spans(&second));

    let (_, analyses) = app
        .send(
            "GET",
            &format!("/api/conversations/{}/analyses", conversation_id.as_str().unwrap()),
            Some(&token),
            None,
        )
        .await;
    let analyses = analyses.as_array().unwrap();
    assert_eq!(analyses.len(), 2);
    assert_eq!(analyses[0]["id"], second["id"]);
}

#[tokio::test]
async fn recommendations_attach_suggestions_to_components() {
    let app = test_app(vec![Ok(
        "2 | improvement | Indica cuánto invertir.\n\nGLOBAL | praise | El conector es claro.".into(),
    )]);
    let (token, _) = app.login_new_user("ines").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/arguments/recommendations",
            Some(&token),
            Some(json!({ "text": EXAMPLE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions_status"], "ok");
    let suggestions = body["llm_suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    assert_eq!(suggestions[0]["component_id"], body["components"][1]["id"]);
    assert_eq!(suggestions[0]["suggestion_type"], "improvement");
    assert!(suggestions[1]["component_id"].is_null());

    let (_, history) = app.send("GET", "/api/arguments/history", Some(&token), None).await;
    assert!(history[0]["title"].as_str().unwrap().starts_with("Recomendaciones: "));
}

#[tokio::test]
async fn unreachable_llm_degrades_to_components_only() {
    let app = test_app(Vec::new());
    let (token, _) = app.login_new_user("raul").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/arguments/analyze",
            Some(&token),
            Some(json!({ "text": EXAMPLE, "include_recommendations": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["components"].as_array().unwrap().len(), 2);
    assert!(body["llm_suggestions"].as_array().unwrap().is_empty());
    assert_eq!(body["suggestions_status"], "unavailable");
    // One call and one retry.
    assert_eq!(app.completion.calls(), 2);
}

#[tokio::test]
async fn malformed_llm_answer_is_flagged() {
    let app = test_app(vec![Ok("Me parece un buen argumento.".into())]);
    let (token, _) = app.login_new_user("nora").await;

    let (status, body) = app
        .send("POST", "/api/arguments/recommendations", Some(&token), Some(json!({ "text": EXAMPLE })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions_status"], "malformed");
    assert!(body["llm_suggestions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_analysis_requests_are_rejected() {
    let app = test_app(Vec::new());
    let (token, _) = app.login_new_user("hugo").await;

    let (status, _) = app
        .send("POST", "/api/arguments/analyze", Some(&token), Some(json!({ "text": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long = "palabra ".repeat(300);
    let (status, _) = app
        .send("POST", "/api/arguments/analyze", Some(&token), Some(json!({ "text": long })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/arguments/analyze",
            Some(&token),
            Some(json!({ "text": EXAMPLE, "conversation_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Rejected requests leave no auto-created conversations behind.
    let (_, history) = app.send("GET", "/api/arguments/history", Some(&token), None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_model_fails_analysis_only() {
    let app = test_app_without_model();
    let (token, _) = app.login_new_user("olga").await;

    let (_, conversation) = app
        .send("POST", "/api/conversations", Some(&token), Some(json!({})))
        .await;
    let (status, _) = app
        .send(
            "POST",
            "/api/arguments/analyze",
            Some(&token),
            Some(json!({ "text": EXAMPLE, "conversation_id": conversation["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    for uri in ["/api/arguments/analyze", "/api/arguments/recommendations"] {
        let (status, _) = app
            .send("POST", uri, Some(&token), Some(json!({ "text": EXAMPLE })))
            .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
    }
    // Only the conversation created explicitly above exists.
    let (_, history) = app.send("GET", "/api/arguments/history", Some(&token), None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], conversation["id"]);
    assert_eq!(app.completion.calls(), 0);

    let (status, _) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("GET", "/api/conversations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_conversation_removes_its_analyses() {
    let app = test_app(Vec::new());
    let (token, _) = app.login_new_user("bruno").await;

    let (_, body) = app
        .send("POST", "/api/arguments/analyze", Some(&token), Some(json!({ "text": EXAMPLE })))
        .await;
    let conversation_id: Uuid = body["conversation_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(app.db.rows_for_conversation(conversation_id), 2);

    let uri = format!("/api/conversations/{}", conversation_id);
    let (status, _) = app.send("DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send("GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.db.rows_for_conversation(conversation_id), 0);
}
