// src/main.rs

mod app_state;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod pets;
mod response;
mod tasks;
mod user_management;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::{InternalError, JsonPayloadError},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpRequest, HttpResponse, HttpServer,
};
use env_logger::Env;
use futures_util::future::{ok, Ready};

use crate::app_state::AppState;
use crate::auth::{login, register};
use crate::pets::{create_pet, get_my_pets, get_pet};
use crate::response::ApiResponse;
use crate::tasks::{
    apply_to_task, assign_helper, complete_task, create_task, get_task, list_tasks,
};
use crate::user_management::{get_me, get_user_by_id};

/// Bearer-token middleware. A valid token stashes the subject user id in
/// the request extensions for `resolve_identity` to pick up; an invalid or
/// expired one is answered on the spot with the uniform unauthenticated
/// envelope. Requests without a token pass through so public reads work.
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Extract "Bearer <token>" from the Authorization header if present
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if auth_str.starts_with("Bearer ") {
                    let token = auth_str.trim_start_matches("Bearer ").trim().to_string();
                    let secret = req
                        .app_data::<web::Data<AppState>>()
                        .map(|state| state.config.jwt_secret.clone())
                        .unwrap_or_default();
                    match auth::validate_jwt(&token, &secret) {
                        Ok(claims) => {
                            req.extensions_mut().insert(claims.sub);
                        }
                        Err(_) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = HttpResponse::Unauthorized()
                                .json(ApiResponse::failure("Not authorized"));
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

/// Malformed JSON bodies get the same `{ success, message }` envelope as
/// every other validation failure.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    let message = err.to_string();
    InternalError::from_response(
        err,
        HttpResponse::BadRequest().json(ApiResponse::failure(message)),
    )
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = Arc::new(db::MongoDB::init(&config.mongo_uri, &config.database_name).await);

    let bind_addr = config.bind_addr.clone();
    let frontend_origin = config.frontend_origin.clone();

    println!("Server running at http://{}", bind_addr);
    println!("Allowed CORS Origin: {}", frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(web::Data::new(AppState {
                mongodb: mongodb.clone(),
                config: config.clone(),
            }))
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(
                web::scope("/api")
                    // AUTH
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login)),
                    )
                    // TASKS
                    .service(
                        web::scope("/tasks")
                            .route("", web::get().to(list_tasks))
                            .route("", web::post().to(create_task))
                            // Specific routes before the parameterized one.
                            .route("/{id}/apply", web::post().to(apply_to_task))
                            .route("/{id}/assign", web::post().to(assign_helper))
                            .route("/{id}/complete", web::post().to(complete_task))
                            .route("/{id}", web::get().to(get_task)),
                    )
                    // PETS
                    .service(
                        web::scope("/pets")
                            .route("", web::post().to(create_pet))
                            .route("/my", web::get().to(get_my_pets))
                            .route("/{id}", web::get().to(get_pet)),
                    )
                    // USERS
                    .service(
                        web::scope("/users")
                            .route("/me", web::get().to(get_me))
                            .route("/{id}", web::get().to(get_user_by_id)),
                    ),
            )
    })
    .bind(&bind_addr)?
    .run()
    .await
}
