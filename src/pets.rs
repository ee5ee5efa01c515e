// src/pets.rs

use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::info;
use mongodb::bson::doc;

use crate::app_state::AppState;
use crate::auth::{require_role, resolve_identity};
use crate::errors::ApiError;
use crate::models::pet::{CreatePetRequest, Pet};
use crate::models::user::Role;
use crate::response::ApiResponse;

/// POST /api/pets
/// Owner only; the caller becomes the pet's owner.
pub async fn create_pet(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreatePetRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = resolve_identity(&req, &data).await?;
    require_role(&user, &[Role::Owner])?;

    let pet = Pet::create(&user.id, payload.into_inner())?;
    let pets_coll = data.mongodb.db.collection::<Pet>("pets");
    pets_coll.insert_one(&pet).await?;
    info!("Pet created: {} by {}", pet.pet_id, user.id);

    Ok(HttpResponse::Created().json(ApiResponse::ok(pet)))
}

/// GET /api/pets/my
pub async fn get_my_pets(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let user = resolve_identity(&req, &data).await?;

    let pets_coll = data.mongodb.db.collection::<Pet>("pets");
    let mut cursor = pets_coll.find(doc! { "owner": &user.id }).await?;

    let mut pets = Vec::new();
    while let Some(pet) = cursor.next().await {
        pets.push(pet?);
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok(pets)))
}

/// GET /api/pets/{id}
pub async fn get_pet(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    resolve_identity(&req, &data).await?;

    let pet_id = path.into_inner();
    let pets_coll = data.mongodb.db.collection::<Pet>("pets");
    let pet = pets_coll
        .find_one(doc! { "_id": &pet_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Pet not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(pet)))
}
