use std::collections::HashMap;

use chrono::Utc;
use common::{PrerequisiteGraph, RegistrationStatus};
use sea_orm::{
    TransactionSession,
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use tracing::{debug, info, instrument};

use super::EngineError;
use crate::entity::{course, course_prerequisite, course_result, registration};

/// Transaction-scoped advisory lock key serialising prerequisite graph writes.
const GRAPH_LOCK_KEY: i64 = 0x5543_4d53;

/// Attributes of a course to be created.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub description: String,
    pub credits: i32,
    pub department: String,
    pub max_enrollments: Option<i32>,
    pub active: bool,
    pub prerequisite_codes: Vec<String>,
}

/// Partial update of a course. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CourseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub credits: Option<i32>,
    pub department: Option<String>,
    /// `Some(None)` removes the capacity limit.
    pub max_enrollments: Option<Option<i32>>,
    pub active: Option<bool>,
    /// Replaces the prerequisite set in the same transaction.
    pub prerequisite_codes: Option<Vec<String>>,
}

/// Courses and the prerequisite relation between them.
pub struct CatalogService<'a, C: ConnectionTrait + TransactionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait + TransactionTrait> CatalogService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Create a course, optionally with an initial prerequisite set.
    #[instrument(skip(self, new), fields(code = %new.code))]
    pub async fn add_course(&self, new: NewCourse) -> Result<course::Model, EngineError> {
        let code = normalize_code(&new.code);
        check_capacity(new.max_enrollments)?;

        let txn = self.conn.begin().await?;
        if !new.prerequisite_codes.is_empty() {
            lock_graph(&txn).await?;
        }

        if find_by_code(&txn, &code).await?.is_some() {
            debug!(code = %code, "Duplicate course code rejected");
            return Err(EngineError::Conflict(format!(
                "Course code {code} already exists"
            )));
        }

        let now = Utc::now();
        let model = course::ActiveModel {
            code: Set(code.clone()),
            title: Set(new.title),
            description: Set(new.description),
            credits: Set(new.credits),
            department: Set(new.department),
            max_enrollments: Set(new.max_enrollments),
            current_enrollments: Set(0),
            active: Set(new.active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = model
            .insert(&txn)
            .await
            .map_err(|e| EngineError::from_insert(e, format!("Course code {code} already exists")))?;

        let prerequisites = replace_prerequisites(&txn, &created, &new.prerequisite_codes).await?;
        txn.commit().await?;

        info!(
            course_id = created.id,
            code = %created.code,
            prerequisites = prerequisites.len(),
            "Course created"
        );
        Ok(created)
    }

    /// Edit course attributes and, when given, replace its prerequisites atomically.
    #[instrument(skip(self, changes))]
    pub async fn update_course(
        &self,
        course_id: i32,
        changes: CourseChanges,
    ) -> Result<course::Model, EngineError> {
        if let Some(max) = changes.max_enrollments {
            check_capacity(max)?;
        }

        let txn = self.conn.begin().await?;
        if changes.prerequisite_codes.is_some() {
            lock_graph(&txn).await?;
        }

        // The row lock orders this against concurrent registrations.
        let existing = find_course_for_update(&txn, course_id).await?;

        if let Some(Some(max)) = changes.max_enrollments {
            let registered = count_active(&txn, course_id).await?;
            if registered > max {
                return Err(EngineError::Conflict(format!(
                    "Cannot lower capacity of {} to {max}: {registered} students are registered",
                    existing.code
                )));
            }
        }

        let mut active: course::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(credits) = changes.credits {
            active.credits = Set(credits);
        }
        if let Some(department) = changes.department {
            active.department = Set(department);
        }
        if let Some(max) = changes.max_enrollments {
            active.max_enrollments = Set(max);
        }
        if let Some(flag) = changes.active {
            active.active = Set(flag);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        if let Some(codes) = changes.prerequisite_codes {
            replace_prerequisites(&txn, &updated, &codes).await?;
        }
        txn.commit().await?;

        info!(course_id, code = %updated.code, "Course updated");
        Ok(updated)
    }

    /// Replace the prerequisite set of a course.
    ///
    /// Every code must resolve to an existing course, and the new edges must
    /// not close a cycle. On any failure the stored graph is left as it was.
    #[instrument(skip(self, codes), fields(count = codes.len()))]
    pub async fn set_prerequisites(
        &self,
        course_id: i32,
        codes: &[String],
    ) -> Result<Vec<course::Model>, EngineError> {
        let txn = self.conn.begin().await?;
        lock_graph(&txn).await?;

        let course = find_course(&txn, course_id).await?;
        let prerequisites = replace_prerequisites(&txn, &course, codes).await?;
        txn.commit().await?;

        info!(
            course_id,
            code = %course.code,
            prerequisites = ?prerequisites.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(),
            "Prerequisites replaced"
        );
        Ok(prerequisites)
    }

    /// Delete a course that nothing depends on and that has no history.
    #[instrument(skip(self))]
    pub async fn remove_course(&self, course_id: i32) -> Result<(), EngineError> {
        let txn = self.conn.begin().await?;
        lock_graph(&txn).await?;

        let course = find_course_for_update(&txn, course_id).await?;

        let dependents = dependents_of(&txn, course_id).await?;
        if !dependents.is_empty() {
            let codes: Vec<&str> = dependents.iter().map(|c| c.code.as_str()).collect();
            return Err(EngineError::Conflict(format!(
                "Course {} is a prerequisite of: {}",
                course.code,
                codes.join(", ")
            )));
        }

        let registrations = registration::Entity::find()
            .filter(registration::Column::CourseId.eq(course_id))
            .count(&txn)
            .await?;
        let results = course_result::Entity::find()
            .filter(course_result::Column::CourseId.eq(course_id))
            .count(&txn)
            .await?;
        if registrations > 0 || results > 0 {
            return Err(EngineError::Conflict(format!(
                "Course {} has registration or result history; deactivate it instead",
                course.code
            )));
        }

        course_prerequisite::Entity::delete_many()
            .filter(course_prerequisite::Column::CourseId.eq(course_id))
            .exec(&txn)
            .await?;
        course::Entity::delete_by_id(course_id).exec(&txn).await?;
        txn.commit().await?;

        info!(course_id, code = %course.code, "Course removed");
        Ok(())
    }

    pub async fn get_course(&self, course_id: i32) -> Result<course::Model, EngineError> {
        find_course(self.conn, course_id).await
    }

    /// Look up a course by code, ignoring case.
    pub async fn get_course_by_code(&self, code: &str) -> Result<course::Model, EngineError> {
        let code = normalize_code(code);
        find_by_code(self.conn, &code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Course {code} not found")))
    }

    /// All courses, active or not, ordered by code.
    pub async fn list_courses(&self) -> Result<Vec<course::Model>, EngineError> {
        Ok(course::Entity::find()
            .order_by_asc(course::Column::Code)
            .all(self.conn)
            .await?)
    }

    /// Courses visible to students.
    pub async fn list_active_courses(&self) -> Result<Vec<course::Model>, EngineError> {
        Ok(course::Entity::find()
            .filter(course::Column::Active.eq(true))
            .order_by_asc(course::Column::Code)
            .all(self.conn)
            .await?)
    }

    pub async fn get_prerequisites(
        &self,
        course_id: i32,
    ) -> Result<Vec<course::Model>, EngineError> {
        find_course(self.conn, course_id).await?;
        let ids: Vec<i32> = course_prerequisite::Entity::find()
            .filter(course_prerequisite::Column::CourseId.eq(course_id))
            .all(self.conn)
            .await?
            .into_iter()
            .map(|edge| edge.prerequisite_id)
            .collect();
        courses_by_ids(self.conn, ids).await
    }

    pub async fn get_dependents(&self, course_id: i32) -> Result<Vec<course::Model>, EngineError> {
        find_course(self.conn, course_id).await?;
        dependents_of(self.conn, course_id).await
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn check_capacity(max_enrollments: Option<i32>) -> Result<(), EngineError> {
    match max_enrollments {
        Some(max) if max < 1 => Err(EngineError::InvalidInput(
            "Capacity must be at least 1 (omit it for unlimited)".into(),
        )),
        _ => Ok(()),
    }
}

async fn lock_graph<C: ConnectionTrait>(conn: &C) -> Result<(), EngineError> {
    if conn.get_database_backend() == DbBackend::Postgres {
        conn.execute_unprepared(&format!("SELECT pg_advisory_xact_lock({GRAPH_LOCK_KEY})"))
            .await?;
    }
    Ok(())
}

async fn find_course<C: ConnectionTrait>(
    conn: &C,
    course_id: i32,
) -> Result<course::Model, EngineError> {
    course::Entity::find_by_id(course_id)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound("Course not found".into()))
}

/// Lock the course row for the rest of the transaction.
///
/// `FOR NO KEY UPDATE` still conflicts with itself, but not with the
/// `FOR KEY SHARE` taken by foreign-key checks on rows referencing the course.
pub(super) async fn find_course_for_update<C: ConnectionTrait>(
    conn: &C,
    course_id: i32,
) -> Result<course::Model, EngineError> {
    course::Entity::find_by_id(course_id)
        .lock(LockType::NoKeyUpdate)
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::NotFound("Course not found".into()))
}

async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<course::Model>, EngineError> {
    Ok(course::Entity::find()
        .filter(course::Column::Code.eq(code))
        .one(conn)
        .await?)
}

pub(super) async fn count_active<C: ConnectionTrait>(
    conn: &C,
    course_id: i32,
) -> Result<i32, EngineError> {
    let count = registration::Entity::find()
        .filter(registration::Column::CourseId.eq(course_id))
        .filter(registration::Column::Status.eq(RegistrationStatus::Active))
        .count(conn)
        .await?;
    Ok(count as i32)
}

async fn courses_by_ids<C: ConnectionTrait>(
    conn: &C,
    ids: Vec<i32>,
) -> Result<Vec<course::Model>, EngineError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(course::Entity::find()
        .filter(course::Column::Id.is_in(ids))
        .order_by_asc(course::Column::Code)
        .all(conn)
        .await?)
}

async fn dependents_of<C: ConnectionTrait>(
    conn: &C,
    course_id: i32,
) -> Result<Vec<course::Model>, EngineError> {
    let ids: Vec<i32> = course_prerequisite::Entity::find()
        .filter(course_prerequisite::Column::PrerequisiteId.eq(course_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|edge| edge.course_id)
        .collect();
    courses_by_ids(conn, ids).await
}

/// Resolve `codes`, reject cycles against the current graph, then swap the
/// course's outgoing edges. Caller must hold the graph lock.
async fn replace_prerequisites<C: ConnectionTrait>(
    conn: &C,
    course: &course::Model,
    codes: &[String],
) -> Result<Vec<course::Model>, EngineError> {
    let mut resolved: Vec<course::Model> = Vec::with_capacity(codes.len());
    for raw in codes {
        let code = normalize_code(raw);
        if resolved.iter().any(|c| c.code == code) {
            continue;
        }
        let prerequisite = find_by_code(conn, &code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Prerequisite course {code} not found")))?;
        resolved.push(prerequisite);
    }

    let edges = course_prerequisite::Entity::find().all(conn).await?;
    let graph = PrerequisiteGraph::from_edges(
        edges
            .into_iter()
            .map(|edge| (edge.course_id, edge.prerequisite_id)),
    );
    let candidates: Vec<i32> = resolved.iter().map(|c| c.id).collect();
    debug!(
        course = %course.code,
        edges = graph.edge_count(),
        candidates = candidates.len(),
        "Checking prerequisite candidates"
    );
    if let Err(cycle) = graph.check_candidates(course.id, &candidates) {
        let codes: HashMap<i32, &str> = resolved.iter().map(|c| (c.id, c.code.as_str())).collect();
        let offending = codes.get(&cycle.prerequisite).copied().unwrap_or_default();
        debug!(course = %course.code, prerequisite = offending, "Prerequisite cycle rejected");
        return Err(EngineError::InvalidGraph(format!(
            "Making {offending} a prerequisite of {} would introduce a cycle",
            course.code
        )));
    }

    course_prerequisite::Entity::delete_many()
        .filter(course_prerequisite::Column::CourseId.eq(course.id))
        .exec(conn)
        .await?;

    if !resolved.is_empty() {
        let rows = resolved.iter().map(|prerequisite| course_prerequisite::ActiveModel {
            course_id: Set(course.id),
            prerequisite_id: Set(prerequisite.id),
        });
        course_prerequisite::Entity::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    resolved.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(resolved)
}
