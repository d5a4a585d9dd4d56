use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{Page, PageQuery, PaginatedResponse};
use crate::api::validation::{
    clean_tags, require_text, validate_http_url, JsonBody, MAX_RESOURCE_TEXT_CHARS,
};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::ResourceType;
use crate::repositories;
use crate::repositories::resources::UpdateResource;
use crate::schemas::resource::{ResourceCreate, ResourceResponse, ResourceUpdate};
use crate::services::ai::UNCATEGORIZED;
use crate::services::text::{non_blank, truncate_chars};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_resources).post(create_resource))
        .route("/:resource_id", get(get_resource).patch(update_resource).delete(delete_resource))
}

async fn list_resources(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<ResourceResponse>>, ApiError> {
    let page = Page::from(query);

    let resources =
        repositories::resources::list_for_user(state.db(), &user.id, page.skip, page.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list resources"))?;
    let total = repositories::resources::count_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count resources"))?;

    let items = resources.into_iter().map(ResourceResponse::from_db).collect();
    Ok(Json(PaginatedResponse::new(items, total, page)))
}

async fn create_resource(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<ResourceCreate>,
) -> Result<(StatusCode, Json<ResourceResponse>), ApiError> {
    let title = non_blank(payload.title.as_deref());

    let (content_ref, topics) = match payload.kind {
        ResourceType::Text => {
            let content = require_text(payload.content.as_deref(), "content")?;
            let content = truncate_chars(&content, MAX_RESOURCE_TEXT_CHARS).to_string();
            let topics = state.ai().extract_topics(&content).await;
            (content, topics)
        }
        ResourceType::Pdf | ResourceType::Image => {
            let content_ref = require_text(payload.content_ref.as_deref(), "content_ref")?;
            validate_http_url(&content_ref)?;
            let topics = match title.as_deref() {
                Some(title) => state.ai().extract_topics(title).await,
                None => vec![UNCATEGORIZED.to_string()],
            };
            (content_ref, topics)
        }
    };

    let thumbnail_ref = non_blank(payload.thumbnail_ref.as_deref());
    let resource = repositories::resources::create(
        state.db(),
        repositories::resources::CreateResource {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            kind: payload.kind,
            title: title.as_deref(),
            content_ref: &content_ref,
            thumbnail_ref: thumbnail_ref.as_deref(),
            extracted_topics: &topics,
            now: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create resource"))?;

    tracing::info!(user_id = %user.id, resource_id = %resource.id, kind = ?resource.kind, "Resource created");
    Ok((StatusCode::CREATED, Json(ResourceResponse::from_db(resource))))
}

async fn get_resource(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(resource_id): Path<String>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let resource = repositories::resources::find_owned(state.db(), &resource_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch resource"))?
        .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    Ok(Json(ResourceResponse::from_db(resource)))
}

async fn update_resource(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(resource_id): Path<String>,
    JsonBody(payload): JsonBody<ResourceUpdate>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let update = to_update(payload);
    if update.is_empty() {
        return Err(ApiError::BadRequest("No updatable fields provided".to_string()));
    }

    let resource = repositories::resources::update_owned(
        state.db(),
        &resource_id,
        &user.id,
        update,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update resource"))?
    .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    Ok(Json(ResourceResponse::from_db(resource)))
}

async fn delete_resource(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(resource_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::resources::delete_owned(state.db(), &resource_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete resource"))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Resource not found".to_string()))
    }
}

/// Blank strings clear a field just like `null` does.
fn to_update(payload: ResourceUpdate) -> UpdateResource {
    let clear_blank = |value: Option<Option<String>>| value.map(|inner| non_blank(inner.as_deref()));
    UpdateResource {
        title: clear_blank(payload.title),
        notes: clear_blank(payload.notes),
        learning_category: clear_blank(payload.learning_category),
        tags: payload.tags.map(|tags| clean_tags(tags.unwrap_or_default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::test_support;

    async fn send(app: &Router, method: Method, uri: &str, token: &str, body: Option<Value>) -> StatusCode {
        app.clone()
            .oneshot(test_support::json_request(method, uri, Some(token), body))
            .await
            .expect("response")
            .status()
    }

    #[test]
    fn update_mapping_keeps_presence() {
        let payload: ResourceUpdate =
            serde_json::from_str(r#"{"title": "  ", "tags": [" a ", ""], "notes": "n"}"#).unwrap();
        let update = to_update(payload);
        assert_eq!(update.title, Some(None));
        assert_eq!(update.notes, Some(Some("n".to_string())));
        assert_eq!(update.learning_category, None);
        assert_eq!(update.tags, Some(vec!["a".to_string()]));

        assert!(to_update(ResourceUpdate::default()).is_empty());
    }

    #[tokio::test]
    #[ignore = "requires postgres and redis"]
    async fn patch_clears_blank_fields_and_cleans_tags() {
        let ctx = test_support::setup_test_context().await;
        let user = test_support::insert_user(ctx.state.db(), "library@example.com").await;
        let token = test_support::bearer_token(&user.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/resources",
                Some(&token),
                Some(json!({"type": "pdf", "content_ref": "https://files.test/notes.pdf"})),
            ))
            .await
            .expect("create resource");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = test_support::read_json(response).await;
        assert_eq!(created["extracted_topics"], json!(["Uncategorized"]));
        let uri = format!("/api/resources/{}", created["id"].as_str().expect("resource id"));

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &uri,
                Some(&token),
                Some(json!({"title": "Week 1", "notes": "Read twice", "tags": ["rust"]})),
            ))
            .await
            .expect("fill resource");
        assert_eq!(response.status(), StatusCode::OK);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::PATCH,
                &uri,
                Some(&token),
                Some(json!({"title": "  ", "notes": null, "tags": [" a ", ""]})),
            ))
            .await
            .expect("clear resource");
        assert_eq!(response.status(), StatusCode::OK);
        let cleared = test_support::read_json(response).await;
        assert_eq!(cleared["title"], Value::Null);
        assert_eq!(cleared["notes"], Value::Null);
        assert_eq!(cleared["tags"], json!(["a"]));

        assert_eq!(send(&ctx.app, Method::PATCH, &uri, &token, Some(json!({}))).await, StatusCode::BAD_REQUEST);
        assert_eq!(send(&ctx.app, Method::DELETE, &uri, &token, None).await, StatusCode::NO_CONTENT);
        assert_eq!(send(&ctx.app, Method::GET, &uri, &token, None).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[ignore = "requires postgres and redis"]
    async fn other_learners_resources_are_not_found() {
        let ctx = test_support::setup_test_context().await;
        let owner = test_support::insert_user(ctx.state.db(), "keeper@example.com").await;
        let stranger = test_support::insert_user(ctx.state.db(), "visitor@example.com").await;
        let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
        let token = test_support::bearer_token(&stranger.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/resources",
                Some(&owner_token),
                Some(json!({"type": "image", "content_ref": "https://files.test/diagram.png"})),
            ))
            .await
            .expect("create resource");
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = test_support::read_json(response).await;
        let uri = format!("/api/resources/{}", created["id"].as_str().expect("resource id"));

        assert_eq!(send(&ctx.app, Method::GET, &uri, &token, None).await, StatusCode::NOT_FOUND);
        assert_eq!(
            send(&ctx.app, Method::PATCH, &uri, &token, Some(json!({"title": "Taken"}))).await,
            StatusCode::NOT_FOUND
        );
        assert_eq!(send(&ctx.app, Method::DELETE, &uri, &token, None).await, StatusCode::NOT_FOUND);
        assert_eq!(send(&ctx.app, Method::GET, &uri, &owner_token, None).await, StatusCode::OK);
    }
}
