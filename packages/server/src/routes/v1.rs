use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .merge(course_routes())
        .merge(registration_routes())
        .merge(grading_routes())
        .merge(result_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
        .routes(routes!(handlers::user::create_user))
}

fn course_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::course::list_courses,
            handlers::course::create_course
        ))
        .routes(routes!(
            handlers::course::get_course,
            handlers::course::update_course,
            handlers::course::delete_course
        ))
        .routes(routes!(handlers::course::get_course_by_code))
        .routes(routes!(
            handlers::course::get_prerequisites,
            handlers::course::set_prerequisites
        ))
        .routes(routes!(handlers::course::get_dependents))
        .routes(routes!(handlers::course::list_catalog))
}

fn registration_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::registration::register,
            handlers::registration::unregister,
            handlers::registration::check_registration
        ))
        .routes(routes!(handlers::registration::my_registrations))
        .routes(routes!(handlers::registration::student_registrations))
}

fn grading_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::grading::gradable_courses))
        .routes(routes!(handlers::grading::enrolled_students))
        .routes(routes!(handlers::grading::submit_grade))
        .routes(routes!(handlers::grading::course_results))
        .routes(routes!(handlers::grading::release_results))
}

fn result_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::results::my_results))
        .routes(routes!(handlers::results::student_results))
}
