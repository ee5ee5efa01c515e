use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;

/// Task lifecycle status. Transitions are monotonic along
/// open -> in_progress -> completed; there is no path back.
///
/// `cancelled` is part of the stored enum but no handler transitions into
/// it. Cancellation is an administrative path that has not been wired up
/// to the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

/// The fixed set of pet-care task categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Walk,
    Feed,
    Boarding,
    Sitting,
    Grooming,
}

/// Stored task document.
///
/// `posted_by` and `pet` are fixed at creation. `assigned_to` is set exactly
/// once, during assignment, and must reference an applicant. `applicants`
/// is insertion-ordered with no duplicates and never contains the owner.
/// `version` is the optimistic-concurrency stamp: every successful mutation
/// bumps it, and writers pin the version they read (see tasks.rs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub category: TaskCategory,
    pub location: String,

    pub budget: i64,
    /// Display string like "$25"; derived from `budget` when not supplied.
    pub reward: String,

    pub date: DateTime<Utc>,
    /// Free-text time of day, e.g. "Morning (8-10am)".
    #[serde(default)]
    pub time: String,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image: String,

    pub posted_by: String,
    pub pet: String,
    pub assigned_to: Option<String>,
    pub applicants: Vec<String>,
    pub status: TaskStatus,

    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload. Required fields are Options so that missing and empty
/// values fail the same validation with the same message.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<TaskCategory>,
    pub location: Option<String>,
    pub budget: Option<i64>,
    pub reward: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub time: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub pet: Option<String>,
}

impl Task {
    /// Validates the creation payload and builds an open task with an empty
    /// applicant set. Pet existence and pet ownership are checked by the
    /// handler, which has the store.
    pub fn create(owner_id: &str, req: CreateTaskRequest) -> Result<Task, ApiError> {
        let title = req
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let location = req
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let pet = req
            .pet
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let (title, category, location, pet) = match (title, req.category, location, pet) {
            (Some(title), Some(category), Some(location), Some(pet)) => {
                (title, category, location, pet)
            }
            _ => {
                return Err(ApiError::Validation(
                    "Title, type (category), location, and pet are required".to_string(),
                ))
            }
        };

        if let Some(budget) = req.budget {
            if budget < 0 {
                return Err(ApiError::Validation(
                    "Budget must not be negative".to_string(),
                ));
            }
        }

        let budget = req.budget.unwrap_or(0);
        let reward = req.reward.filter(|r| !r.trim().is_empty());
        if budget == 0 && reward.is_none() {
            return Err(ApiError::Validation(
                "Either budget or reward is required".to_string(),
            ));
        }
        let reward = reward.unwrap_or_else(|| format!("${}", budget));

        let now = Utc::now();
        Ok(Task {
            task_id: Uuid::new_v4().to_string(),
            title,
            description: req.description.unwrap_or_default(),
            category,
            location,
            budget,
            reward,
            date: req.date.unwrap_or(now),
            time: req.time.unwrap_or_default(),
            due_date: req.due_date,
            image: req.image.unwrap_or_default(),
            posted_by: owner_id.to_string(),
            pet,
            assigned_to: None,
            applicants: Vec::new(),
            status: TaskStatus::Open,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// A helper requests the task. The task stays open; the applicant list
    /// keeps insertion order and rejects duplicates and the owner.
    pub fn apply(&mut self, helper_id: &str) -> Result<(), ApiError> {
        if self.status != TaskStatus::Open {
            return Err(ApiError::InvalidState(
                "Task is not open for applications".to_string(),
            ));
        }
        if self.applicants.iter().any(|a| a == helper_id) {
            return Err(ApiError::InvalidState(
                "You have already applied to this task".to_string(),
            ));
        }
        if self.posted_by == helper_id {
            return Err(ApiError::Forbidden(
                "You cannot apply to your own task".to_string(),
            ));
        }
        self.applicants.push(helper_id.to_string());
        Ok(())
    }

    /// The owner picks one applicant. Only legal while the task is still
    /// open, which also keeps the status walk monotonic: there is no way
    /// back into in_progress from a later state, and no un-assign.
    pub fn assign(&mut self, caller_id: &str, helper_id: &str) -> Result<(), ApiError> {
        if self.posted_by != caller_id {
            return Err(ApiError::Forbidden(
                "Only the task owner can assign a helper".to_string(),
            ));
        }
        if self.status != TaskStatus::Open {
            return Err(ApiError::InvalidState(
                "Task is no longer open for assignment".to_string(),
            ));
        }
        if !self.applicants.iter().any(|a| a == helper_id) {
            return Err(ApiError::InvalidState(
                "Helper must have applied to the task first".to_string(),
            ));
        }
        self.assigned_to = Some(helper_id.to_string());
        self.status = TaskStatus::InProgress;
        Ok(())
    }

    /// The owner marks the assigned work done. Terminal: nothing mutates a
    /// completed task afterwards.
    pub fn complete(&mut self, caller_id: &str) -> Result<(), ApiError> {
        if self.posted_by != caller_id {
            return Err(ApiError::Forbidden(
                "Only the task owner can complete a task".to_string(),
            ));
        }
        if self.status != TaskStatus::InProgress {
            return Err(ApiError::InvalidState(
                "Task must be in progress to be completed".to_string(),
            ));
        }
        self.status = TaskStatus::Completed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "owner-1";
    const HELPER: &str = "helper-1";
    const HELPER_2: &str = "helper-2";

    fn create_request() -> CreateTaskRequest {
        CreateTaskRequest {
            title: Some("Walk".to_string()),
            description: None,
            category: Some(TaskCategory::Walk),
            location: Some("Park".to_string()),
            budget: Some(20),
            reward: None,
            date: None,
            time: None,
            due_date: None,
            image: None,
            pet: Some("pet-1".to_string()),
        }
    }

    fn open_task() -> Task {
        Task::create(OWNER, create_request()).unwrap()
    }

    fn task_with_status(status: TaskStatus) -> Task {
        let mut task = open_task();
        if status != TaskStatus::Open {
            task.apply(HELPER).unwrap();
        }
        match status {
            TaskStatus::Open => {}
            TaskStatus::InProgress => {
                task.assign(OWNER, HELPER).unwrap();
            }
            TaskStatus::Completed => {
                task.assign(OWNER, HELPER).unwrap();
                task.complete(OWNER).unwrap();
            }
            TaskStatus::Cancelled => {
                // No operation reaches cancelled; force it for guard tests.
                task.status = TaskStatus::Cancelled;
            }
        }
        task
    }

    // -- creation ----------------------------------------------------------

    #[test]
    fn create_builds_an_open_task_with_derived_reward() {
        let task = open_task();
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.reward, "$20");
        assert_eq!(task.budget, 20);
        assert!(task.applicants.is_empty());
        assert!(task.assigned_to.is_none());
        assert_eq!(task.posted_by, OWNER);
        assert_eq!(task.version, 0);
    }

    #[test]
    fn create_keeps_an_explicit_reward() {
        let mut req = create_request();
        req.reward = Some("Dinner on me".to_string());
        let task = Task::create(OWNER, req).unwrap();
        assert_eq!(task.reward, "Dinner on me");
    }

    #[test]
    fn create_accepts_reward_without_budget() {
        let mut req = create_request();
        req.budget = None;
        req.reward = Some("$15".to_string());
        let task = Task::create(OWNER, req).unwrap();
        assert_eq!(task.budget, 0);
        assert_eq!(task.reward, "$15");
    }

    #[test]
    fn create_rejects_missing_required_fields() {
        for field in ["title", "category", "location", "pet"] {
            let mut req = create_request();
            match field {
                "title" => req.title = None,
                "category" => req.category = None,
                "location" => req.location = Some("   ".to_string()),
                "pet" => req.pet = Some(String::new()),
                _ => unreachable!(),
            }
            let err = Task::create(OWNER, req).unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "field: {}", field);
        }
    }

    #[test]
    fn create_rejects_missing_compensation() {
        let mut req = create_request();
        req.budget = None;
        req.reward = None;
        let err = Task::create(OWNER, req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // A zero budget alone does not count as compensation.
        let mut req = create_request();
        req.budget = Some(0);
        req.reward = None;
        let err = Task::create(OWNER, req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn create_rejects_negative_budget() {
        let mut req = create_request();
        req.budget = Some(-5);
        let err = Task::create(OWNER, req).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn create_defaults_date_to_creation_time() {
        let task = open_task();
        assert_eq!(task.date, task.created_at);
    }

    // -- apply -------------------------------------------------------------

    #[test]
    fn apply_adds_applicant_and_keeps_task_open() {
        let mut task = open_task();
        task.apply(HELPER).unwrap();
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.applicants, vec![HELPER.to_string()]);
    }

    #[test]
    fn apply_preserves_insertion_order() {
        let mut task = open_task();
        task.apply(HELPER).unwrap();
        task.apply(HELPER_2).unwrap();
        assert_eq!(
            task.applicants,
            vec![HELPER.to_string(), HELPER_2.to_string()]
        );
    }

    #[test]
    fn apply_twice_fails_and_adds_exactly_one_applicant() {
        let mut task = open_task();
        task.apply(HELPER).unwrap();
        let err = task.apply(HELPER).unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
        assert_eq!(task.applicants.len(), 1);
    }

    #[test]
    fn apply_to_own_task_is_forbidden() {
        let mut task = open_task();
        let err = task.apply(OWNER).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(task.applicants.is_empty());
    }

    #[test]
    fn apply_is_rejected_in_every_non_open_state() {
        for status in [
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            let mut task = task_with_status(status);
            let before = task.applicants.len();
            let err = task.apply(HELPER_2).unwrap_err();
            assert!(matches!(err, ApiError::InvalidState(_)), "status: {:?}", status);
            assert_eq!(task.applicants.len(), before);
        }
    }

    // -- assign ------------------------------------------------------------

    #[test]
    fn assign_sets_helper_and_moves_to_in_progress() {
        let mut task = open_task();
        task.apply(HELPER).unwrap();
        task.assign(OWNER, HELPER).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.assigned_to.as_deref(), Some(HELPER));
    }

    #[test]
    fn assign_by_non_owner_is_forbidden() {
        let mut task = open_task();
        task.apply(HELPER).unwrap();
        let err = task.assign(HELPER, HELPER).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(task.status, TaskStatus::Open);
        assert!(task.assigned_to.is_none());
    }

    #[test]
    fn assign_requires_the_helper_to_have_applied() {
        let mut task = open_task();
        task.apply(HELPER).unwrap();
        let err = task.assign(OWNER, HELPER_2).unwrap_err();
        assert!(matches!(err, ApiError::InvalidState(_)));
        assert!(task.assigned_to.is_none());
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn assign_is_rejected_in_every_non_open_state() {
        for status in [
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            let mut task = task_with_status(status);
            let err = task.assign(OWNER, HELPER).unwrap_err();
            assert!(matches!(err, ApiError::InvalidState(_)), "status: {:?}", status);
        }
    }

    #[test]
    fn assigned_helper_is_always_an_applicant() {
        let mut task = open_task();
        task.apply(HELPER).unwrap();
        task.apply(HELPER_2).unwrap();
        task.assign(OWNER, HELPER_2).unwrap();
        let assigned = task.assigned_to.clone().unwrap();
        assert!(task.applicants.contains(&assigned));
    }

    // -- complete ----------------------------------------------------------

    #[test]
    fn complete_moves_in_progress_to_completed() {
        let mut task = task_with_status(TaskStatus::InProgress);
        task.complete(OWNER).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn complete_by_non_owner_is_forbidden() {
        let mut task = task_with_status(TaskStatus::InProgress);
        let err = task.complete(HELPER).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn complete_is_rejected_outside_in_progress() {
        for status in [TaskStatus::Open, TaskStatus::Completed, TaskStatus::Cancelled] {
            let mut task = task_with_status(status);
            let err = task.complete(OWNER).unwrap_err();
            assert!(matches!(err, ApiError::InvalidState(_)), "status: {:?}", status);
            assert_eq!(task.status, status);
        }
    }

    // -- terminal state ----------------------------------------------------

    #[test]
    fn completed_task_rejects_every_operation() {
        let mut task = task_with_status(TaskStatus::Completed);
        assert!(task.apply(HELPER_2).is_err());
        assert!(task.assign(OWNER, HELPER).is_err());
        assert!(task.complete(OWNER).is_err());
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn owner_never_ends_up_in_applicants() {
        // Exhaust every reachable state; the owner is rejected in all of them.
        for status in [
            TaskStatus::Open,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            let mut task = task_with_status(status);
            let _ = task.apply(OWNER);
            assert!(!task.applicants.contains(&OWNER.to_string()));
        }
    }

    #[test]
    fn status_serializes_to_the_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(serde_json::to_string(&TaskStatus::Open).unwrap(), "\"open\"");
        assert_eq!(
            serde_json::to_string(&TaskCategory::Grooming).unwrap(),
            "\"grooming\""
        );
    }
}
