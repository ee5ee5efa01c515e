use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::info;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::errors::ApiError;
use crate::models::user::{Role, User, UserProfile};
use crate::response::ApiResponse;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The caller's resolved identity: a stable id plus the static role set.
/// Ownership checks against a specific task are not done here; the
/// lifecycle guards handle those because they need the loaded document.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub roles: Vec<Role>,
}

// JWT creation
pub fn create_jwt(user_id: &str, secret: &str) -> Result<String, ApiError> {
    let expiration = Utc::now() + Duration::hours(24);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| ApiError::Internal(format!("jwt encode error: {}", e)))
}

// JWT validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Resolves the caller's identity from the user id the `Authentication`
/// middleware stashed in the request extensions.
///
/// A missing extension, and a subject that no longer resolves to a user,
/// both come back as the same `Unauthenticated` error so the caller cannot
/// tell which check failed.
pub async fn resolve_identity(
    req: &HttpRequest,
    data: &web::Data<AppState>,
) -> Result<AuthUser, ApiError> {
    let user_id = req
        .extensions()
        .get::<String>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)?;

    let users = data.mongodb.db.collection::<User>("users");
    let user = users
        .find_one(doc! { "_id": &user_id })
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    Ok(AuthUser {
        id: user.user_id,
        email: user.email,
        roles: user.roles,
    })
}

/// Role gate: permits when the identity's role set intersects the allowed
/// set. Denies with `Forbidden`, which is distinct from unauthenticated.
pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), ApiError> {
    if user.roles.iter().any(|role| allowed.contains(role)) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Access denied. Insufficient permissions.".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<Role>>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

/// POST /api/auth/register
pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let password = payload.password.filter(|p| !p.is_empty());

    let (name, email, password) = match (name, email, password) {
        (Some(name), Some(email), Some(password)) => (name, email, password),
        _ => {
            return Err(ApiError::Validation(
                "Name, email and password are required".to_string(),
            ))
        }
    };

    let roles = payload.roles.unwrap_or_default();
    if roles.is_empty() {
        return Err(ApiError::Validation(
            "Please select at least one role".to_string(),
        ));
    }

    let users = data.mongodb.db.collection::<User>("users");
    if users.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(ApiError::Validation(
            "An account with this email already exists".to_string(),
        ));
    }

    let hashed = hash(&password, DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("bcrypt error: {}", e)))?;

    let user = User {
        user_id: Uuid::new_v4().to_string(),
        name,
        email,
        password: hashed,
        roles,
        bio: String::new(),
        profile_photo: String::new(),
        created_at: Utc::now(),
    };
    users.insert_one(&user).await?;
    info!("User registered: {}", user.user_id);

    let token = create_jwt(&user.user_id, &data.config.jwt_secret)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(AuthResponse {
        user: UserProfile::from(&user),
        token,
    })))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password are indistinguishable on the wire.
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let password = payload.password.filter(|p| !p.is_empty());

    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::Validation(
                "Email and password are required".to_string(),
            ))
        }
    };

    let users = data.mongodb.db.collection::<User>("users");
    let user = users
        .find_one(doc! { "email": &email })
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !verify(&password, &user.password).unwrap_or(false) {
        return Err(ApiError::Unauthenticated);
    }

    let token = create_jwt(&user.user_id, &data.config.jwt_secret)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(AuthResponse {
        user: UserProfile::from(&user),
        token,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MongoDB;
    use actix_web::test::TestRequest;
    use std::sync::Arc;

    const SECRET: &str = "test-secret";

    fn auth_user(roles: Vec<Role>) -> AuthUser {
        AuthUser {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            roles,
        }
    }

    #[test]
    fn require_role_permits_on_intersection() {
        let owner = auth_user(vec![Role::Owner]);
        assert!(require_role(&owner, &[Role::Owner]).is_ok());

        let both = auth_user(vec![Role::Owner, Role::Helper]);
        assert!(require_role(&both, &[Role::Helper]).is_ok());
        assert!(require_role(&both, &[Role::Owner]).is_ok());
    }

    #[test]
    fn require_role_denies_without_intersection() {
        // A helper-only account cannot pass an owner gate: task creation is
        // rejected before anything touches the store.
        let helper = auth_user(vec![Role::Helper]);
        let err = require_role(&helper, &[Role::Owner]).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let nobody = auth_user(vec![]);
        let err = require_role(&nobody, &[Role::Owner, Role::Helper]).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn jwt_round_trip_preserves_the_subject() {
        let token = create_jwt("user-42", SECRET).unwrap();
        let claims = validate_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user-42");
    }

    #[test]
    fn jwt_with_wrong_secret_is_rejected() {
        let token = create_jwt("user-42", SECRET).unwrap();
        assert!(validate_jwt(&token, "another-secret").is_err());
    }

    #[test]
    fn tampered_jwt_is_rejected() {
        let token = create_jwt("user-42", SECRET).unwrap();
        let tampered = format!("{}x", token);
        assert!(validate_jwt(&tampered, SECRET).is_err());
    }

    #[test]
    fn expired_jwt_is_rejected() {
        let expired = Claims {
            sub: "user-42".to_string(),
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(SECRET.as_ref()),
        )
        .unwrap();
        assert!(validate_jwt(&token, SECRET).is_err());
    }

    #[actix_web::test]
    async fn missing_credential_resolves_to_unauthenticated() {
        // The driver connects lazily, so no MongoDB needs to be running:
        // the extension check fails before any storage access.
        let state = web::Data::new(AppState {
            mongodb: Arc::new(MongoDB::init("mongodb://127.0.0.1:27017", "test").await),
            config: Config {
                mongo_uri: "mongodb://127.0.0.1:27017".to_string(),
                database_name: "test".to_string(),
                jwt_secret: SECRET.to_string(),
                frontend_origin: String::new(),
                bind_addr: String::new(),
            },
        });
        let req = TestRequest::default().to_http_request();
        let err = resolve_identity(&req, &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
    }
}
