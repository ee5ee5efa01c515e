// src/tasks.rs

use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::info;
use mongodb::bson::doc;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::auth::{require_role, resolve_identity};
use crate::errors::ApiError;
use crate::models::pet::{Pet, PetSummary};
use crate::models::task::{CreateTaskRequest, Task, TaskCategory, TaskStatus};
use crate::models::user::{Role, User, UserSummary};
use crate::response::ApiResponse;

const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Read projection of a task: the raw user/pet references are replaced with
/// denormalized snapshots (id, display name, avatar) looked up at read time.
#[derive(Debug, Serialize)]
pub struct TaskView {
    #[serde(rename = "_id")]
    pub task_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub category: TaskCategory,
    pub location: String,
    pub budget: i64,
    pub reward: String,
    pub date: DateTime<Utc>,
    pub time: String,
    pub due_date: Option<DateTime<Utc>>,
    pub image: String,
    pub status: TaskStatus,
    pub posted_by: Option<UserSummary>,
    pub assigned_to: Option<UserSummary>,
    pub pet: Option<PetSummary>,
    pub applicants: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    fn build(
        task: Task,
        users: &HashMap<String, UserSummary>,
        pets: &HashMap<String, PetSummary>,
    ) -> Self {
        let posted_by = users.get(&task.posted_by).cloned();
        let assigned_to = task
            .assigned_to
            .as_deref()
            .and_then(|id| users.get(id).cloned());
        let pet = pets.get(&task.pet).cloned();
        let applicants = task
            .applicants
            .iter()
            .filter_map(|id| users.get(id).cloned())
            .collect();

        TaskView {
            task_id: task.task_id,
            title: task.title,
            description: task.description,
            category: task.category,
            location: task.location,
            budget: task.budget,
            reward: task.reward,
            date: task.date,
            time: task.time,
            due_date: task.due_date,
            image: task.image,
            status: task.status,
            posted_by,
            assigned_to,
            pet,
            applicants,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

fn collect_refs(tasks: &[Task]) -> (Vec<String>, Vec<String>) {
    let mut user_ids: Vec<String> = Vec::new();
    let mut pet_ids: Vec<String> = Vec::new();
    for task in tasks {
        for id in std::iter::once(&task.posted_by)
            .chain(task.assigned_to.iter())
            .chain(task.applicants.iter())
        {
            if !user_ids.contains(id) {
                user_ids.push(id.clone());
            }
        }
        if !pet_ids.contains(&task.pet) {
            pet_ids.push(task.pet.clone());
        }
    }
    (user_ids, pet_ids)
}

async fn user_summaries(
    db: &Database,
    ids: Vec<String>,
) -> Result<HashMap<String, UserSummary>, ApiError> {
    let mut map = HashMap::new();
    if ids.is_empty() {
        return Ok(map);
    }
    let users = db.collection::<User>("users");
    let mut cursor = users.find(doc! { "_id": { "$in": ids } }).await?;
    while let Some(user) = cursor.next().await {
        let user = user?;
        map.insert(user.user_id.clone(), UserSummary::from(&user));
    }
    Ok(map)
}

async fn pet_summaries(
    db: &Database,
    ids: Vec<String>,
) -> Result<HashMap<String, PetSummary>, ApiError> {
    let mut map = HashMap::new();
    if ids.is_empty() {
        return Ok(map);
    }
    let pets = db.collection::<Pet>("pets");
    let mut cursor = pets.find(doc! { "_id": { "$in": ids } }).await?;
    while let Some(pet) = cursor.next().await {
        let pet = pet?;
        map.insert(pet.pet_id.clone(), PetSummary::from(&pet));
    }
    Ok(map)
}

/// Enrich a batch of tasks with one `$in` lookup per collection.
async fn enrich_tasks(db: &Database, tasks: Vec<Task>) -> Result<Vec<TaskView>, ApiError> {
    let (user_ids, pet_ids) = collect_refs(&tasks);
    let users = user_summaries(db, user_ids).await?;
    let pets = pet_summaries(db, pet_ids).await?;
    Ok(tasks
        .into_iter()
        .map(|task| TaskView::build(task, &users, &pets))
        .collect())
}

async fn enrich_task(db: &Database, task: Task) -> Result<TaskView, ApiError> {
    let (user_ids, pet_ids) = collect_refs(std::slice::from_ref(&task));
    let users = user_summaries(db, user_ids).await?;
    let pets = pet_summaries(db, pet_ids).await?;
    Ok(TaskView::build(task, &users, &pets))
}

/// Read-modify-write with an optimistic version check, so two mutations of
/// the same task never interleave. The replace filter pins the version the
/// read saw; a concurrent writer bumps it, the replace matches nothing and
/// the operation restarts from a fresh read. Guard failures abort before
/// any write, so a failed operation leaves no partial state behind.
async fn mutate_task<F>(
    data: &web::Data<AppState>,
    task_id: &str,
    mutate: F,
) -> Result<Task, ApiError>
where
    F: Fn(&mut Task) -> Result<(), ApiError>,
{
    let tasks = data.mongodb.db.collection::<Task>("tasks");
    for _ in 0..MAX_WRITE_ATTEMPTS {
        let mut task = tasks
            .find_one(doc! { "_id": task_id })
            .await?
            .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

        let read_version = task.version;
        mutate(&mut task)?;
        task.version = read_version + 1;
        task.updated_at = Utc::now();

        let result = tasks
            .replace_one(doc! { "_id": task_id, "version": read_version }, &task)
            .await?;
        if result.matched_count == 1 {
            return Ok(task);
        }
        // Lost the version race; take a fresh read and re-run the guards.
    }
    Err(ApiError::Internal(format!(
        "task {} kept losing the version race",
        task_id
    )))
}

/// GET /api/tasks
/// All tasks, newest first, enriched. Public.
pub async fn list_tasks(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let tasks_coll = data.mongodb.db.collection::<Task>("tasks");
    let mut cursor = tasks_coll
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await?;

    let mut tasks = Vec::new();
    while let Some(task) = cursor.next().await {
        tasks.push(task?);
    }

    let views = enrich_tasks(&data.mongodb.db, tasks).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(views)))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path.into_inner();
    let tasks_coll = data.mongodb.db.collection::<Task>("tasks");
    let task = tasks_coll
        .find_one(doc! { "_id": &task_id })
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let view = enrich_task(&data.mongodb.db, task).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}

/// POST /api/tasks
/// Owner only; the referenced pet must exist and belong to the caller.
pub async fn create_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = resolve_identity(&req, &data).await?;
    require_role(&user, &[Role::Owner])?;

    let task = Task::create(&user.id, payload.into_inner())?;

    let pets = data.mongodb.db.collection::<Pet>("pets");
    let pet = pets
        .find_one(doc! { "_id": &task.pet })
        .await?
        .ok_or_else(|| ApiError::NotFound("Pet not found".to_string()))?;
    if pet.owner != user.id {
        return Err(ApiError::Forbidden(
            "You can only create tasks for your own pets".to_string(),
        ));
    }

    let tasks_coll = data.mongodb.db.collection::<Task>("tasks");
    tasks_coll.insert_one(&task).await?;
    info!("Task created: {} by {}", task.task_id, user.id);

    let view = enrich_task(&data.mongodb.db, task).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(view)))
}

/// POST /api/tasks/{id}/apply
/// Helper only. The task stays open; duplicates and self-application are
/// rejected by the lifecycle guard.
pub async fn apply_to_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path.into_inner();
    let user = resolve_identity(&req, &data).await?;
    require_role(&user, &[Role::Helper])?;

    let task = mutate_task(&data, &task_id, |task| task.apply(&user.id)).await?;
    info!("Application recorded: task {} helper {}", task_id, user.id);

    let view = enrich_task(&data.mongodb.db, task).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(rename = "helperId")]
    pub helper_id: Option<String>,
}

/// POST /api/tasks/{id}/assign
/// Owner only; the chosen helper must already be an applicant.
pub async fn assign_helper(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<AssignRequest>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path.into_inner();
    let user = resolve_identity(&req, &data).await?;
    require_role(&user, &[Role::Owner])?;

    let helper_id = payload
        .into_inner()
        .helper_id
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ApiError::Validation("helperId is required".to_string()))?;

    let task = mutate_task(&data, &task_id, |task| task.assign(&user.id, &helper_id)).await?;
    info!("Task {} assigned to {}", task_id, helper_id);

    let view = enrich_task(&data.mongodb.db, task).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}

/// POST /api/tasks/{id}/complete
pub async fn complete_task(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let task_id = path.into_inner();
    let user = resolve_identity(&req, &data).await?;
    require_role(&user, &[Role::Owner])?;

    let task = mutate_task(&data, &task_id, |task| task.complete(&user.id)).await?;
    info!("Task {} completed", task_id);

    let view = enrich_task(&data.mongodb.db, task).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view)))
}
