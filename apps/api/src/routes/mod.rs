pub mod admin;
pub mod feedback;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::conversation::handlers as conversation;
use crate::search::handlers as search;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Search
        .route("/api/search", post(search::handle_search))
        .route("/api/feedback", post(feedback::handle_feedback))
        // Conversation flow
        .route(
            "/api/conversation/welcome",
            get(conversation::handle_welcome),
        )
        .route(
            "/api/conversation/category",
            post(conversation::handle_select_category),
        )
        .route(
            "/api/conversation/faq",
            post(conversation::handle_select_faq),
        )
        .route(
            "/api/conversation/inquiry/open",
            post(conversation::handle_open_inquiry),
        )
        .route(
            "/api/conversation/inquiry",
            post(conversation::handle_submit_inquiry),
        )
        // Data source and admin
        .route(
            "/api/data-source/status",
            get(admin::handle_data_source_status),
        )
        .route("/api/data-source/refresh", post(admin::handle_refresh))
        .route("/api/admin/cache/clear", post(admin::handle_cache_clear))
        .route("/api/admin/categories", get(admin::handle_categories))
        .route("/api/admin/records", get(admin::handle_records))
        .route(
            "/api/admin/conversations/:id",
            get(admin::handle_conversation),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use crate::state::tests::test_state;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_route_returns_answer() {
        let (state, _) = test_state(vec![record("料金プランについて教えて", "月額制です", "pricing")]);
        let (status, body) = call(
            build_router(state),
            post("/api/search", json!({"question": "料金プランについて教えて", "topic": "pricing"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "月額制です");
        assert_eq!(body["topic"], "pricing");
        assert_eq!(body["provenance"], "category");
    }

    #[tokio::test]
    async fn test_no_match_is_404_with_error_body() {
        let (state, _) = test_state(vec![record("料金プランについて教えて", "月額制です", "pricing")]);
        let (status, body) = call(
            build_router(state),
            post("/api/search", json!({"question": "zzzz"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NO_MATCH_FOUND");
    }

    #[tokio::test]
    async fn test_invalid_inquiry_lists_fields() {
        let (state, _) = test_state(Vec::new());
        let (status, body) = call(
            build_router(state),
            post(
                "/api/conversation/inquiry",
                json!({"conversation_id": "c1", "form_data": {"name": "山田", "email": "nope"}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["fields"], json!(["company", "email", "message"]));
    }

    #[tokio::test]
    async fn test_welcome_route() {
        let (state, _) = test_state(Vec::new());
        let request = Request::get("/api/conversation/welcome?conversation_id=c1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(build_router(state), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "category_selection");
        assert_eq!(body["categories"].as_array().unwrap().len(), 5);
    }
}
