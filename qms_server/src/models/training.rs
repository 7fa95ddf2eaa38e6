//! qms.course + qms.training.record: competence tracking per user.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::user::UserView;
use super::vocab::TrainingStatus;
use crate::compliance::rag::Rag;
use crate::schema::{qms_courses, qms_training_records};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_courses)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub validity_months: Option<i32>,
    pub active: bool,
    #[serde(skip)]
    pub create_uid: Option<i64>,
    #[serde(rename = "createdAt")]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub write_uid: Option<i64>,
    #[serde(rename = "updatedAt")]
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_courses)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub validity_months: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = qms_training_records)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub document_url: Option<String>,
    pub document_name: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    #[serde(skip)]
    pub create_uid: Option<i64>,
    #[serde(rename = "createdAt")]
    pub create_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub write_uid: Option<i64>,
    #[serde(rename = "updatedAt")]
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = qms_training_records)]
pub struct NewTrainingRecord {
    pub user_id: i64,
    pub course_id: i64,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub document_url: Option<String>,
    pub document_name: Option<String>,
    pub notes: Option<String>,
    pub create_uid: Option<i64>,
}

/// Full replacement of the mutable fields; absent values clear the column.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = qms_training_records, treat_none_as_null = true)]
pub struct TrainingRecordChanges {
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub document_url: Option<String>,
    pub document_name: Option<String>,
    pub notes: Option<String>,
    pub write_uid: Option<i64>,
    pub write_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrainingRequest {
    pub user_id: i64,
    pub course_id: i64,
    #[serde(default = "default_training_status")]
    pub status: TrainingStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub document_url: Option<String>,
    pub document_name: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTrainingRequest {
    pub status: TrainingStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub document_url: Option<String>,
    pub document_name: Option<String>,
    pub notes: Option<String>,
}

fn default_training_status() -> TrainingStatus {
    TrainingStatus::NotStarted
}

fn validate_score(score: Option<i32>, errors: &mut Vec<String>) {
    if let Some(score) = score {
        if !(0..=100).contains(&score) {
            errors.push("score must be between 0 and 100".to_string());
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CreateTrainingRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        validate_score(self.score, &mut errors);
        errors
    }

    pub fn into_new(self, create_uid: i64) -> NewTrainingRecord {
        NewTrainingRecord {
            user_id: self.user_id,
            course_id: self.course_id,
            status: self.status.as_str().to_string(),
            due_date: self.due_date,
            completed: self.completed,
            score: self.score,
            document_url: blank_to_none(self.document_url),
            document_name: blank_to_none(self.document_name),
            notes: blank_to_none(self.notes),
            create_uid: Some(create_uid),
        }
    }
}

impl UpdateTrainingRequest {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        validate_score(self.score, &mut errors);
        errors
    }

    pub fn into_changes(self, write_uid: i64) -> TrainingRecordChanges {
        TrainingRecordChanges {
            status: self.status.as_str().to_string(),
            due_date: self.due_date,
            completed: self.completed,
            score: self.score,
            document_url: blank_to_none(self.document_url),
            document_name: blank_to_none(self.document_name),
            notes: blank_to_none(self.notes),
            write_uid: Some(write_uid),
            write_date: Some(Utc::now()),
        }
    }
}

/// A training record with its user, course and due-date RAG.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecordView {
    #[serde(flatten)]
    pub record: TrainingRecord,
    pub user: Option<UserView>,
    pub course: Option<Course>,
    pub rag: Rag,
    pub rag_label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TrainingOverview {
    pub users: Vec<UserView>,
    pub courses: Vec<Course>,
    pub records: Vec<TrainingRecordView>,
}

/// Completion summary for one course.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseCompliance {
    pub course_id: i64,
    pub code: String,
    pub title: String,
    pub total: i64,
    pub complete: i64,
    pub overdue: i64,
    /// Percentage of records complete, rounded; 0 when the course has none.
    pub compliance: i64,
    pub green: i64,
    pub amber: i64,
    pub red: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_defaults_to_not_started() {
        let req: CreateTrainingRequest =
            serde_json::from_str(r#"{"userId":1,"courseId":2}"#).unwrap();
        assert_eq!(req.status, TrainingStatus::NotStarted);
        assert!(req.validate().is_empty());
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let req: CreateTrainingRequest =
            serde_json::from_str(r#"{"userId":1,"courseId":2,"score":140}"#).unwrap();
        assert_eq!(req.validate(), vec!["score must be between 0 and 100"]);
    }

    #[test]
    fn blank_strings_are_cleared() {
        let req: UpdateTrainingRequest =
            serde_json::from_str(r#"{"status":"COMPLETE","notes":"  "}"#).unwrap();
        let changes = req.into_changes(3);
        assert_eq!(changes.notes, None);
        assert_eq!(changes.status, "COMPLETE");
    }
}
