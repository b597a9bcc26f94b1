use std::collections::HashMap;

use chrono::Utc;
use common::{RegistrationStatus, Role};
use sea_orm::{
    TransactionSession,
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info, instrument, warn};

use super::EngineError;
use super::catalog::{count_active, find_course_for_update};
use crate::entity::{course, course_result, registration, user};

/// A student holding an active seat in a course, as seen by the grading lecturer.
#[derive(Debug, Clone)]
pub struct EnrolledStudent {
    pub registration: registration::Model,
    pub student: Option<user::Model>,
    pub result: Option<course_result::Model>,
}

/// Registration records and the per-course seat counter derived from them.
///
/// Every write locks the course row first, so admissions and drops on the
/// same course are serialised while other courses proceed in parallel.
pub struct EnrollmentService<'a, C: ConnectionTrait + TransactionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait + TransactionTrait> EnrollmentService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Admit a student into a course if it is open, not already joined, and not full.
    #[instrument(skip(self))]
    pub async fn register(
        &self,
        student_id: i32,
        course_id: i32,
    ) -> Result<registration::Model, EngineError> {
        let txn = self.conn.begin().await?;
        let course = find_course_for_update(&txn, course_id).await?;
        if !course.active {
            return Err(EngineError::InvalidState(format!(
                "Course {} is not open for registration",
                course.code
            )));
        }

        let student = find_student(&txn, student_id).await?;

        if find_active(&txn, student_id, course_id).await?.is_some() {
            debug!(code = %course.code, "Duplicate registration rejected");
            return Err(EngineError::Conflict(format!(
                "Already registered for {}",
                course.code
            )));
        }

        let taken = count_active(&txn, course_id).await?;
        if let Some(max) = course.max_enrollments {
            if taken >= max {
                warn!(code = %course.code, taken, max, "Registration rejected, course full");
                return Err(EngineError::CapacityExceeded(format!(
                    "Course {} is full ({taken}/{max} seats taken)",
                    course.code
                )));
            }
        }

        let model = registration::ActiveModel {
            student_id: Set(student_id),
            course_id: Set(course_id),
            student_number: Set(student.student_number.clone().unwrap_or_default()),
            course_code: Set(course.code.clone()),
            course_title: Set(course.title.clone()),
            status: Set(RegistrationStatus::Active),
            registered_at: Set(Utc::now()),
            dropped_at: Set(None),
            ..Default::default()
        };
        let created = model.insert(&txn).await.map_err(|e| {
            EngineError::from_insert(e, format!("Already registered for {}", course.code))
        })?;

        let seats = sync_seat_counter(&txn, course_id).await?;
        txn.commit().await?;

        info!(
            registration_id = created.id,
            code = %course.code,
            seats,
            capacity = ?course.max_enrollments,
            "Registration admitted"
        );
        Ok(created)
    }

    /// Drop the student's active registration and release the seat.
    #[instrument(skip(self))]
    pub async fn unregister(
        &self,
        student_id: i32,
        course_id: i32,
    ) -> Result<registration::Model, EngineError> {
        let txn = self.conn.begin().await?;
        let course = find_course_for_update(&txn, course_id).await?;

        let existing = find_active(&txn, student_id, course_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("No active registration for {}", course.code))
            })?;

        let mut active: registration::ActiveModel = existing.into();
        active.status = Set(RegistrationStatus::Dropped);
        active.dropped_at = Set(Some(Utc::now()));
        let dropped = active.update(&txn).await?;

        let seats = sync_seat_counter(&txn, course_id).await?;
        txn.commit().await?;

        info!(
            registration_id = dropped.id,
            code = %course.code,
            seats,
            "Registration dropped"
        );
        Ok(dropped)
    }

    pub async fn is_registered(&self, student_id: i32, course_id: i32) -> Result<bool, EngineError> {
        Ok(find_active(self.conn, student_id, course_id).await?.is_some())
    }

    /// Active registrations of a student, oldest first.
    pub async fn list_active_by_student(
        &self,
        student_id: i32,
    ) -> Result<Vec<registration::Model>, EngineError> {
        Ok(registration::Entity::find()
            .filter(registration::Column::StudentId.eq(student_id))
            .filter(registration::Column::Status.eq(RegistrationStatus::Active))
            .order_by_asc(registration::Column::RegisteredAt)
            .order_by_asc(registration::Column::Id)
            .all(self.conn)
            .await?)
    }

    pub async fn list_active_by_student_number(
        &self,
        student_number: &str,
    ) -> Result<Vec<registration::Model>, EngineError> {
        let student = find_student_by_number(self.conn, student_number).await?;
        self.list_active_by_student(student.id).await
    }

    /// Students currently holding a seat in the course, with any result already recorded.
    pub async fn list_enrolled_students(
        &self,
        course_id: i32,
    ) -> Result<Vec<EnrolledStudent>, EngineError> {
        course::Entity::find_by_id(course_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| EngineError::NotFound("Course not found".into()))?;

        let rows = registration::Entity::find()
            .filter(registration::Column::CourseId.eq(course_id))
            .filter(registration::Column::Status.eq(RegistrationStatus::Active))
            .order_by_asc(registration::Column::StudentNumber)
            .find_also_related(user::Entity)
            .all(self.conn)
            .await?;

        let mut results: HashMap<i32, course_result::Model> = course_result::Entity::find()
            .filter(course_result::Column::CourseId.eq(course_id))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|r| (r.student_id, r))
            .collect();

        Ok(rows
            .into_iter()
            .map(|(registration, student)| EnrolledStudent {
                result: results.remove(&registration.student_id),
                registration,
                student,
            })
            .collect())
    }
}

async fn find_active<C: ConnectionTrait>(
    conn: &C,
    student_id: i32,
    course_id: i32,
) -> Result<Option<registration::Model>, EngineError> {
    Ok(registration::Entity::find()
        .filter(registration::Column::StudentId.eq(student_id))
        .filter(registration::Column::CourseId.eq(course_id))
        .filter(registration::Column::Status.eq(RegistrationStatus::Active))
        .one(conn)
        .await?)
}

async fn find_student<C: ConnectionTrait>(
    conn: &C,
    student_id: i32,
) -> Result<user::Model, EngineError> {
    let user = user::Entity::find_by_id(student_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound("Student not found".into()))?;
    if user.role != Role::Student {
        return Err(EngineError::InvalidState(
            "Only students can hold course registrations".into(),
        ));
    }
    Ok(user)
}

pub(super) async fn find_student_by_number<C: ConnectionTrait>(
    conn: &C,
    student_number: &str,
) -> Result<user::Model, EngineError> {
    user::Entity::find()
        .filter(user::Column::StudentNumber.eq(student_number))
        .filter(user::Column::Role.eq(Role::Student))
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("Student {student_number} not found")))
}

/// Recompute the course's seat counter from the registration rows and store it.
async fn sync_seat_counter<C: ConnectionTrait>(
    conn: &C,
    course_id: i32,
) -> Result<i32, EngineError> {
    let seats = count_active(conn, course_id).await?;
    course::Entity::update_many()
        .col_expr(course::Column::CurrentEnrollments, Expr::value(seats))
        .filter(course::Column::Id.eq(course_id))
        .exec(conn)
        .await?;
    Ok(seats)
}
