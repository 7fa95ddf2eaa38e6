//! Training records, the competence overview and the per-course matrix.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::compliance::rag::{training_rag, Rag, RagThresholds};
use crate::error::Rejection;
use crate::models::training::{
    Course, CourseCompliance, NewTrainingRecord, TrainingOverview, TrainingRecord,
    TrainingRecordChanges, TrainingRecordView,
};
use crate::models::user::{QmsUser, UserView};
use crate::schema::{qms_courses, qms_training_records, qms_users};

pub const DUPLICATE_RECORD: &str = "Training record already exists for this user and course";

fn not_found() -> anyhow::Error {
    Rejection::NotFound("Training record not found".to_string()).into()
}

async fn load_users(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<UserView>> {
    let users: Vec<QmsUser> = qms_users::table
        .filter(qms_users::active.eq(true))
        .order(qms_users::name.asc())
        .select(QmsUser::as_select())
        .load(conn)
        .await?;
    Ok(users.into_iter().map(UserView::from).collect())
}

async fn load_courses(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<Course>> {
    let courses = qms_courses::table
        .order(qms_courses::code.asc())
        .select(Course::as_select())
        .load(conn)
        .await?;
    Ok(courses)
}

fn view(
    record: TrainingRecord,
    users: &HashMap<i64, &UserView>,
    courses: &HashMap<i64, &Course>,
    now: DateTime<Utc>,
    thresholds: RagThresholds,
) -> TrainingRecordView {
    let rag = training_rag(&record.status, record.due_date, now, thresholds);
    TrainingRecordView {
        user: users.get(&record.user_id).map(|u| (*u).clone()),
        course: courses.get(&record.course_id).map(|c| (*c).clone()),
        rag,
        rag_label: rag.label(),
        record,
    }
}

/// Users by name, courses by code and every record with its RAG.
pub async fn overview(
    conn: &mut AsyncPgConnection,
    thresholds: RagThresholds,
) -> anyhow::Result<TrainingOverview> {
    let users = load_users(conn).await?;
    let courses = load_courses(conn).await?;
    let records: Vec<TrainingRecord> = qms_training_records::table
        .order((qms_training_records::due_date.asc(), qms_training_records::id.asc()))
        .select(TrainingRecord::as_select())
        .load(conn)
        .await?;

    let now = Utc::now();
    let user_index: HashMap<i64, &UserView> = users.iter().map(|u| (u.id, u)).collect();
    let course_index: HashMap<i64, &Course> = courses.iter().map(|c| (c.id, c)).collect();
    let records = records
        .into_iter()
        .map(|r| view(r, &user_index, &course_index, now, thresholds))
        .collect();

    Ok(TrainingOverview {
        users,
        courses,
        records,
    })
}

pub async fn find(conn: &mut AsyncPgConnection, record_id: i64) -> anyhow::Result<TrainingRecord> {
    qms_training_records::table
        .find(record_id)
        .select(TrainingRecord::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(not_found)
}

/// Create a record; one record per (user, course).
pub async fn create(
    conn: &mut AsyncPgConnection,
    new_record: NewTrainingRecord,
) -> anyhow::Result<TrainingRecord> {
    let existing: i64 = qms_training_records::table
        .filter(qms_training_records::user_id.eq(new_record.user_id))
        .filter(qms_training_records::course_id.eq(new_record.course_id))
        .count()
        .get_result(conn)
        .await?;
    if existing > 0 {
        return Err(Rejection::Invalid(DUPLICATE_RECORD.to_string()).into());
    }

    let record: TrainingRecord = diesel::insert_into(qms_training_records::table)
        .values(&new_record)
        .returning(TrainingRecord::as_returning())
        .get_result(conn)
        .await?;
    crate::metrics::record_created("training_record");
    tracing::info!(
        record_id = record.id,
        user_id = record.user_id,
        course_id = record.course_id,
        "Training record created"
    );
    Ok(record)
}

pub async fn update(
    conn: &mut AsyncPgConnection,
    record_id: i64,
    changes: TrainingRecordChanges,
) -> anyhow::Result<TrainingRecord> {
    let record: TrainingRecord = diesel::update(qms_training_records::table.find(record_id))
        .set(&changes)
        .returning(TrainingRecord::as_returning())
        .get_result(conn)
        .await
        .optional()?
        .ok_or_else(not_found)?;
    crate::metrics::status_changed("training_record", &record.status);
    tracing::info!(record_id, status = %record.status, "Training record updated");
    Ok(record)
}

pub async fn delete(conn: &mut AsyncPgConnection, record_id: i64) -> anyhow::Result<()> {
    let deleted = diesel::delete(qms_training_records::table.find(record_id))
        .execute(conn)
        .await?;
    if deleted == 0 {
        return Err(not_found());
    }
    tracing::info!(record_id, "Training record deleted");
    Ok(())
}

/// Summarise completion per course. Overdue means a red RAG.
pub fn course_compliance(
    courses: &[Course],
    records: &[TrainingRecord],
    now: DateTime<Utc>,
    thresholds: RagThresholds,
) -> Vec<CourseCompliance> {
    courses
        .iter()
        .map(|course| {
            let mut row = CourseCompliance {
                course_id: course.id,
                code: course.code.clone(),
                title: course.title.clone(),
                total: 0,
                complete: 0,
                overdue: 0,
                compliance: 0,
                green: 0,
                amber: 0,
                red: 0,
            };
            for record in records.iter().filter(|r| r.course_id == course.id) {
                row.total += 1;
                if record.status == "COMPLETE" {
                    row.complete += 1;
                }
                match training_rag(&record.status, record.due_date, now, thresholds) {
                    Rag::Green => row.green += 1,
                    Rag::Amber => row.amber += 1,
                    Rag::Red => {
                        row.red += 1;
                        row.overdue += 1;
                    }
                }
            }
            if row.total > 0 {
                row.compliance = (row.complete as f64 * 100.0 / row.total as f64).round() as i64;
            }
            row
        })
        .collect()
}

pub async fn matrix(
    conn: &mut AsyncPgConnection,
    thresholds: RagThresholds,
) -> anyhow::Result<Vec<CourseCompliance>> {
    let courses = load_courses(conn).await?;
    let records: Vec<TrainingRecord> = qms_training_records::table
        .select(TrainingRecord::as_select())
        .load(conn)
        .await?;
    Ok(course_compliance(&courses, &records, Utc::now(), thresholds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn course(id: i64, code: &str) -> Course {
        Course {
            id,
            code: code.to_string(),
            title: format!("{code} course"),
            description: None,
            validity_months: Some(12),
            active: true,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        }
    }

    fn record(id: i64, course_id: i64, status: &str, due: Option<DateTime<Utc>>) -> TrainingRecord {
        TrainingRecord {
            id,
            user_id: id,
            course_id,
            status: status.to_string(),
            due_date: due,
            completed: None,
            score: None,
            document_url: None,
            document_name: None,
            notes: None,
            active: true,
            create_uid: None,
            create_date: None,
            write_uid: None,
            write_date: None,
        }
    }

    #[test]
    fn compliance_per_course() {
        let now: DateTime<Utc> = "2025-04-01T00:00:00Z".parse().unwrap();
        let courses = vec![course(1, "FIRE"), course(2, "ISO")];
        let records = vec![
            record(1, 1, "COMPLETE", None),
            record(2, 1, "COMPLETE", Some(now + Duration::days(100))),
            record(3, 1, "NOT_STARTED", Some(now - Duration::days(2))),
            record(4, 1, "IN_PROGRESS", Some(now + Duration::days(10))),
        ];
        let rows = course_compliance(&courses, &records, now, RagThresholds::default());

        assert_eq!(rows[0].total, 4);
        assert_eq!(rows[0].complete, 2);
        assert_eq!(rows[0].compliance, 50);
        assert_eq!(rows[0].overdue, 1);
        assert_eq!((rows[0].green, rows[0].amber, rows[0].red), (2, 1, 1));

        assert_eq!(rows[1].total, 0);
        assert_eq!(rows[1].compliance, 0);
    }

    #[test]
    fn compliance_rounds() {
        let now = Utc::now();
        let courses = vec![course(1, "A")];
        let records = vec![
            record(1, 1, "COMPLETE", None),
            record(2, 1, "COMPLETE", None),
            record(3, 1, "EXPIRED", None),
        ];
        let rows = course_compliance(&courses, &records, now, RagThresholds::default());
        assert_eq!(rows[0].compliance, 67);
        assert_eq!(rows[0].red, 1);
    }
}
