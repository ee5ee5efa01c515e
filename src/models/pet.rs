use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;

/// Stored pet document. Owner-scoped: the lifecycle engine only ever reads
/// a pet to check that it belongs to the caller at task creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    #[serde(rename = "_id")]
    pub pet_id: String,
    pub name: String,
    /// e.g. "dog" or "cat"
    #[serde(rename = "type")]
    pub pet_type: String,
    #[serde(default)]
    pub breed: String,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    #[serde(default)]
    pub temperament: String,
    #[serde(default)]
    pub photos: Vec<String>,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot embedded in enriched task reads.
#[derive(Debug, Clone, Serialize)]
pub struct PetSummary {
    #[serde(rename = "_id")]
    pub pet_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: String,
    pub photos: Vec<String>,
}

impl From<&Pet> for PetSummary {
    fn from(pet: &Pet) -> Self {
        PetSummary {
            pet_id: pet.pet_id.clone(),
            name: pet.name.clone(),
            pet_type: pet.pet_type.clone(),
            photos: pet.photos.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePetRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub pet_type: Option<String>,
    pub breed: Option<String>,
    pub height: Option<i64>,
    pub weight: Option<i64>,
    pub temperament: Option<String>,
    pub photos: Option<Vec<String>>,
}

impl Pet {
    pub fn create(owner_id: &str, req: CreatePetRequest) -> Result<Pet, ApiError> {
        let name = req
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let pet_type = req
            .pet_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let (name, pet_type) = match (name, pet_type) {
            (Some(name), Some(pet_type)) => (name, pet_type),
            _ => {
                return Err(ApiError::Validation(
                    "Name and type are required".to_string(),
                ))
            }
        };

        Ok(Pet {
            pet_id: Uuid::new_v4().to_string(),
            name,
            pet_type,
            breed: req.breed.unwrap_or_default(),
            height: req.height,
            weight: req.weight,
            temperament: req.temperament.unwrap_or_default(),
            photos: req.photos.unwrap_or_default(),
            owner: owner_id.to_string(),
            created_at: Utc::now(),
        })
    }
}
