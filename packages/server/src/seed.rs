use common::Role;
use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::BootstrapConfig;
use crate::entity::{course_prerequisite, registration, user};
use crate::utils::hash;

/// At most one active registration per (student, course). Dropped rows are kept
/// as history, so the constraint has to be partial.
const ACTIVE_REGISTRATION_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     uq_registration_active_student_course ON registration (student_id, course_id) \
     WHERE status = 'Active'";

/// Create indexes that schema-sync cannot express.
///
/// The partial unique index backs a correctness invariant, so failing to
/// create it is an error. The lookup indexes only warn.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.execute_unprepared(ACTIVE_REGISTRATION_INDEX).await?;
    info!("Ensured index uq_registration_active_student_course exists");

    // Reverse edge lookup for dependents:
    // SELECT course_id FROM course_prerequisite WHERE prerequisite_id = ?
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_course_prerequisite_prerequisite")
        .table(course_prerequisite::Entity)
        .col(course_prerequisite::Column::PrerequisiteId)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_course_prerequisite_prerequisite exists");
        }
        Err(e) => {
            tracing::warn!(
                "Failed to create index idx_course_prerequisite_prerequisite: {}",
                e
            );
        }
    }

    // Seat counting and per-student listings:
    // SELECT COUNT(*) FROM registration WHERE course_id = ? AND status = 'Active'
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_registration_course_status")
        .table(registration::Entity)
        .col(registration::Column::CourseId)
        .col(registration::Column::Status)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_registration_course_status exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_registration_course_status: {}", e);
        }
    }

    Ok(())
}

/// Create the configured administrator unless a user with that name exists.
pub async fn bootstrap_admin(
    db: &DatabaseConnection,
    bootstrap: &BootstrapConfig,
) -> Result<(), DbErr> {
    let hash = hash::hash_password(&bootstrap.admin_password)
        .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;

    let model = user::ActiveModel {
        username: Set(bootstrap.admin_username.clone()),
        email: Set(bootstrap.admin_email.trim().to_lowercase()),
        password: Set(hash),
        role: Set(Role::Admin),
        first_name: Set("System".into()),
        last_name: Set("Administrator".into()),
        student_number: Set(None),
        program: Set(None),
        year: Set(None),
        staff_number: Set(None),
        department: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = user::Entity::insert(model)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(0) | Err(DbErr::RecordNotInserted) => {}
        Ok(_) => info!(username = %bootstrap.admin_username, "Bootstrapped administrator"),
        Err(e) => return Err(e),
    }

    Ok(())
}
