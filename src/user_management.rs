// src/user_management.rs

use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use mongodb::bson::doc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::auth::resolve_identity;
use crate::errors::ApiError;
use crate::models::task::Task;
use crate::models::user::{Role, User};
use crate::response::ApiResponse;

/// Profile payload for the authenticated user. The posted/applied lists
/// are not stored on the user document; they are recomputed here from the
/// task collection, which is the single source of truth.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub bio: String,
    pub profile_photo: String,
    pub tasks_posted: Vec<String>,
    pub tasks_applied: Vec<String>,
}

/// Public view of another user: enough for a profile card, nothing else.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub name: String,
    pub profile_photo: String,
    pub bio: String,
}

async fn task_ids(
    data: &web::Data<AppState>,
    filter: mongodb::bson::Document,
) -> Result<Vec<String>, ApiError> {
    let tasks_coll = data.mongodb.db.collection::<Task>("tasks");
    let mut cursor = tasks_coll.find(filter).sort(doc! { "created_at": -1 }).await?;
    let mut ids = Vec::new();
    while let Some(task) = cursor.next().await {
        ids.push(task?.task_id);
    }
    Ok(ids)
}

/// GET /api/users/me
pub async fn get_me(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let identity = resolve_identity(&req, &data).await?;

    let users_coll = data.mongodb.db.collection::<User>("users");
    let user = users_coll
        .find_one(doc! { "_id": &identity.id })
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    // Derived views: a task appears in tasks_posted when this user posted
    // it, and in tasks_applied when the applicant array contains them.
    let tasks_posted = task_ids(&data, doc! { "posted_by": &identity.id }).await?;
    let tasks_applied = task_ids(&data, doc! { "applicants": &identity.id }).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(MeResponse {
        user_id: user.user_id,
        name: user.name,
        email: user.email,
        roles: user.roles,
        bio: user.bio,
        profile_photo: user.profile_photo,
        tasks_posted,
        tasks_applied,
    })))
}

/// GET /api/users/{id}
pub async fn get_user_by_id(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let users_coll = data.mongodb.db.collection::<User>("users");
    let user = users_coll
        .find_one(doc! { "_id": &user_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PublicProfile {
        user_id: user.user_id,
        name: user.name,
        profile_photo: user.profile_photo,
        bio: user.bio,
    })))
}
