use chrono::Utc;
use common::{LetterGrade, RegistrationStatus, Role};
use sea_orm::{
    TransactionSession,
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
    sea_query::{Expr, LockType, OnConflict},
};
use tracing::{info, instrument};

use super::EngineError;
use super::enrollment::find_student_by_number;
use crate::entity::{course, course_result, registration, user};

/// One grade entry submitted by a lecturer.
#[derive(Debug, Clone)]
pub struct GradeSubmission {
    pub student_id: i32,
    pub course_id: i32,
    pub marks: f64,
    pub remarks: Option<String>,
}

/// Results per (student, course) and their release to students.
///
/// A result moves `GRADED -> RELEASED`. Regrading always returns it to
/// `GRADED`, hiding it from the student until it is released again.
pub struct GradingService<'a, C: ConnectionTrait + TransactionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait + TransactionTrait> GradingService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Record or overwrite the result of an enrolled student.
    #[instrument(skip(self, submission), fields(student_id = submission.student_id, course_id = submission.course_id))]
    pub async fn submit_grade(
        &self,
        lecturer_id: i32,
        submission: GradeSubmission,
    ) -> Result<course_result::Model, EngineError> {
        let grade = LetterGrade::from_marks(submission.marks)?;

        let txn = self.conn.begin().await?;

        let lecturer = user::Entity::find_by_id(lecturer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::NotFound("Lecturer not found".into()))?;
        if lecturer.role != Role::Lecturer {
            return Err(EngineError::InvalidState(
                "Only lecturers can submit grades".into(),
            ));
        }

        let course = course::Entity::find_by_id(submission.course_id)
            .one(&txn)
            .await?
            .ok_or_else(|| EngineError::NotFound("Course not found".into()))?;

        // FOR SHARE holds off a concurrent drop until this grade commits, and
        // re-evaluates the status filter if the drop committed first.
        let enrolled = registration::Entity::find()
            .filter(registration::Column::StudentId.eq(submission.student_id))
            .filter(registration::Column::CourseId.eq(submission.course_id))
            .filter(registration::Column::Status.eq(RegistrationStatus::Active))
            .lock(LockType::Share)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                EngineError::InvalidState(format!(
                    "Student is not enrolled in {}",
                    course.code
                ))
            })?;

        let now = Utc::now();
        let model = course_result::ActiveModel {
            student_id: Set(submission.student_id),
            course_id: Set(submission.course_id),
            lecturer_id: Set(lecturer_id),
            student_number: Set(enrolled.student_number),
            course_code: Set(course.code.clone()),
            course_title: Set(course.title.clone()),
            marks: Set(submission.marks),
            grade: Set(grade),
            remarks: Set(submission.remarks),
            graded_at: Set(now),
            released: Set(false),
            released_at: Set(None),
            ..Default::default()
        };

        course_result::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    course_result::Column::StudentId,
                    course_result::Column::CourseId,
                ])
                .update_columns([
                    course_result::Column::LecturerId,
                    course_result::Column::StudentNumber,
                    course_result::Column::CourseCode,
                    course_result::Column::CourseTitle,
                    course_result::Column::Marks,
                    course_result::Column::Grade,
                    course_result::Column::Remarks,
                    course_result::Column::GradedAt,
                    course_result::Column::Released,
                    course_result::Column::ReleasedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let stored = course_result::Entity::find()
            .filter(course_result::Column::StudentId.eq(submission.student_id))
            .filter(course_result::Column::CourseId.eq(submission.course_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                EngineError::Database(sea_orm::DbErr::RecordNotFound(
                    "course_result missing after upsert".into(),
                ))
            })?;
        txn.commit().await?;

        info!(
            result_id = stored.id,
            code = %course.code,
            marks = stored.marks,
            grade = %stored.grade,
            "Grade recorded"
        );
        Ok(stored)
    }

    /// Release every still-hidden result this lecturer recorded for the course.
    ///
    /// Returns the number of results released by this call; rows already
    /// released keep their original `released_at`.
    #[instrument(skip(self))]
    pub async fn release_results(&self, lecturer_id: i32, course_id: i32) -> Result<u64, EngineError> {
        let course = course::Entity::find_by_id(course_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::NotFound("Course not found".into()))?;

        let result = course_result::Entity::update_many()
            .col_expr(course_result::Column::Released, Expr::value(true))
            .col_expr(course_result::Column::ReleasedAt, Expr::value(Utc::now()))
            .filter(course_result::Column::CourseId.eq(course_id))
            .filter(course_result::Column::LecturerId.eq(lecturer_id))
            .filter(course_result::Column::Released.eq(false))
            .exec(self.conn)
            .await?;

        info!(
            code = %course.code,
            released = result.rows_affected,
            "Results released"
        );
        Ok(result.rows_affected)
    }

    /// Results this lecturer recorded for the course, released or not.
    pub async fn course_results(
        &self,
        lecturer_id: i32,
        course_id: i32,
    ) -> Result<Vec<course_result::Model>, EngineError> {
        course::Entity::find_by_id(course_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::NotFound("Course not found".into()))?;

        Ok(course_result::Entity::find()
            .filter(course_result::Column::CourseId.eq(course_id))
            .filter(course_result::Column::LecturerId.eq(lecturer_id))
            .order_by_asc(course_result::Column::StudentNumber)
            .all(self.conn)
            .await?)
    }

    /// Released results of a student. Unreleased results never appear here.
    pub async fn student_view(
        &self,
        student_id: i32,
    ) -> Result<Vec<course_result::Model>, EngineError> {
        Ok(course_result::Entity::find()
            .filter(course_result::Column::StudentId.eq(student_id))
            .filter(course_result::Column::Released.eq(true))
            .order_by_asc(course_result::Column::CourseCode)
            .all(self.conn)
            .await?)
    }

    pub async fn student_view_by_number(
        &self,
        student_number: &str,
    ) -> Result<Vec<course_result::Model>, EngineError> {
        let student = find_student_by_number(self.conn, student_number).await?;
        self.student_view(student.id).await
    }

    /// Active courses with at least one student holding a seat.
    pub async fn gradable_courses(&self) -> Result<Vec<course::Model>, EngineError> {
        Ok(course::Entity::find()
            .filter(course::Column::Active.eq(true))
            .filter(course::Column::CurrentEnrollments.gt(0))
            .order_by_asc(course::Column::Code)
            .all(self.conn)
            .await?)
    }
}
