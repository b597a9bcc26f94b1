use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use ucms_server::entity::course_result;

use crate::common::{TestApp, TestUser, routes};

/// A course with one lecturer and one registered student.
struct Classroom {
    app: TestApp,
    admin: TestUser,
    lecturer: TestUser,
    student: TestUser,
    course: i32,
}

async fn classroom() -> Classroom {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("admin").await;
    let lecturer = app.create_lecturer("lect").await;
    let student = app.create_student("alice", "S001").await;
    let course = app.create_course(&admin.token, "CS101", Some(30)).await;
    app.register(course, &student.token).await;
    Classroom {
        app,
        admin,
        lecturer,
        student,
        course,
    }
}

impl Classroom {
    async fn grade(&self, marks: f64) -> crate::common::TestResponse {
        self.app
            .post_with_token(
                &routes::grades(self.course),
                &json!({"student_id": self.student.id, "marks": marks}),
                &self.lecturer.token,
            )
            .await
    }

    async fn release(&self) -> crate::common::TestResponse {
        self.app
            .post_with_token(&routes::release(self.course), &json!({}), &self.lecturer.token)
            .await
    }
}

mod submit {
    use super::*;

    #[tokio::test]
    async fn grade_is_derived_from_marks() {
        let c = classroom().await;

        let res = c.grade(82.0).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["grade"], "A");
        assert_eq!(res.body["passed"], true);
        assert_eq!(res.body["released"], false);
        assert_eq!(res.body["course_code"], "CS101");
        assert_eq!(res.body["student_number"], "S001");
    }

    #[tokio::test]
    async fn band_edges() {
        let c = classroom().await;

        assert_eq!(c.grade(84.99).await.body["grade"], "A");
        assert_eq!(c.grade(85.0).await.body["grade"], "A+");
        assert_eq!(c.grade(39.99).await.body["grade"], "F");
        assert_eq!(c.grade(40.0).await.body["grade"], "D");
        assert_eq!(c.grade(0.0).await.body["grade"], "F");
        assert_eq!(c.grade(100.0).await.body["grade"], "A+");
    }

    #[tokio::test]
    async fn regrade_overwrites_in_place() {
        let c = classroom().await;

        let first = c.grade(82.0).await;
        let second = c.grade(85.0).await;

        assert_eq!(second.status, 200);
        assert_eq!(second.id(), first.id());
        assert_eq!(second.body["marks"], 85.0);
        assert_eq!(second.body["grade"], "A+");

        let rows = course_result::Entity::find()
            .filter(course_result::Column::CourseId.eq(c.course))
            .count(&c.app.db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn marks_out_of_range_are_rejected() {
        let c = classroom().await;

        for marks in [101.0, -0.5] {
            let res = c.grade(marks).await;
            assert_eq!(res.status, 400, "marks {marks}: {}", res.text);
            assert_eq!(res.body["code"], "INVALID_INPUT");
        }
    }

    #[tokio::test]
    async fn student_must_hold_a_seat() {
        let c = classroom().await;
        let outsider = c.app.create_student("bob", "S002").await;

        let res = c
            .app
            .post_with_token(
                &routes::grades(c.course),
                &json!({"student_id": outsider.id, "marks": 70.0}),
                &c.lecturer.token,
            )
            .await;

        assert_eq!(res.status, 422);
        assert_eq!(res.body["code"], "INVALID_STATE");
    }

    #[tokio::test]
    async fn dropped_student_cannot_be_graded() {
        let c = classroom().await;
        c.app
            .delete_with_token(&routes::registration(c.course), &c.student.token)
            .await;

        let res = c.grade(70.0).await;

        assert_eq!(res.status, 422);
    }

    #[tokio::test]
    async fn only_lecturers_submit_grades() {
        let c = classroom().await;

        for token in [&c.admin.token, &c.student.token] {
            let res = c
                .app
                .post_with_token(
                    &routes::grades(c.course),
                    &json!({"student_id": c.student.id, "marks": 70.0}),
                    token,
                )
                .await;
            assert_eq!(res.status, 403);
        }
    }

    #[tokio::test]
    async fn remarks_are_stored_trimmed() {
        let c = classroom().await;

        let res = c
            .app
            .post_with_token(
                &routes::grades(c.course),
                &json!({"student_id": c.student.id, "marks": 55.0, "remarks": "  Solid work  "}),
                &c.lecturer.token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["grade"], "C+");
        assert_eq!(res.body["remarks"], "Solid work");
    }

    #[tokio::test]
    async fn blank_remarks_are_stored_as_absent() {
        let c = classroom().await;

        let res = c
            .app
            .post_with_token(
                &routes::grades(c.course),
                &json!({"student_id": c.student.id, "marks": 55.0, "remarks": "   "}),
                &c.lecturer.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["remarks"].is_null());
    }
}

mod release {
    use super::*;

    #[tokio::test]
    async fn results_are_hidden_until_released() {
        let c = classroom().await;
        c.grade(82.0).await;

        let before = c.app.get_with_token(routes::MY_RESULTS, &c.student.token).await;
        assert_eq!(before.status, 200);
        assert_eq!(before.body.as_array().unwrap().len(), 0);

        let res = c.release().await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["released"], 1);

        let after = c.app.get_with_token(routes::MY_RESULTS, &c.student.token).await;
        let results = after.body.as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["grade"], "A");
        assert_eq!(results[0]["released"], true);
        assert!(results[0]["released_at"].is_string());
    }

    #[tokio::test]
    async fn releasing_twice_changes_nothing() {
        let c = classroom().await;
        c.grade(82.0).await;

        c.release().await;
        let first = course_result::Entity::find()
            .one(&c.app.db)
            .await
            .unwrap()
            .unwrap();

        let again = c.release().await;
        assert_eq!(again.body["released"], 0);

        let second = course_result::Entity::find()
            .one(&c.app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.released_at, second.released_at);
    }

    #[tokio::test]
    async fn regrade_after_release_hides_the_result_again() {
        let c = classroom().await;
        c.grade(82.0).await;
        c.release().await;

        let regraded = c.grade(90.0).await;
        assert_eq!(regraded.body["released"], false);
        assert!(regraded.body["released_at"].is_null());

        let hidden = c.app.get_with_token(routes::MY_RESULTS, &c.student.token).await;
        assert_eq!(hidden.body.as_array().unwrap().len(), 0);

        assert_eq!(c.release().await.body["released"], 1);
        let shown = c.app.get_with_token(routes::MY_RESULTS, &c.student.token).await;
        assert_eq!(shown.body[0]["grade"], "A+");
    }

    #[tokio::test]
    async fn release_only_touches_own_results() {
        let c = classroom().await;
        let other = c.app.create_lecturer("other").await;
        c.grade(82.0).await;

        let res = c
            .app
            .post_with_token(&routes::release(c.course), &json!({}), &other.token)
            .await;

        assert_eq!(res.body["released"], 0);
        let hidden = c.app.get_with_token(routes::MY_RESULTS, &c.student.token).await;
        assert_eq!(hidden.body.as_array().unwrap().len(), 0);
    }
}

mod lecturer_views {
    use super::*;

    #[tokio::test]
    async fn gradable_courses_need_a_registered_student() {
        let c = classroom().await;
        c.app.create_course(&c.admin.token, "EMPTY100", None).await;

        let res = c
            .app
            .get_with_token(routes::GRADABLE_COURSES, &c.lecturer.token)
            .await;

        assert_eq!(res.status, 200);
        let codes: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["CS101"]);
    }

    #[tokio::test]
    async fn enrolled_students_show_recorded_results() {
        let c = classroom().await;
        let bob = c.app.create_student("bob", "S002").await;
        c.app.register(c.course, &bob.token).await;
        c.grade(65.0).await;

        let res = c
            .app
            .get_with_token(&routes::enrolled_students(c.course), &c.lecturer.token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let students = res.body.as_array().unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0]["student_number"], "S001");
        assert_eq!(students[0]["has_result"], true);
        assert_eq!(students[0]["result"]["grade"], "B");
        assert_eq!(students[1]["student_number"], "S002");
        assert_eq!(students[1]["has_result"], false);
        assert!(students[1]["result"].is_null());
    }

    #[tokio::test]
    async fn course_results_include_unreleased() {
        let c = classroom().await;
        c.grade(45.0).await;

        let res = c
            .app
            .get_with_token(&routes::course_results(c.course), &c.lecturer.token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body[0]["grade"], "C-");
        assert_eq!(res.body[0]["released"], false);
    }

    #[tokio::test]
    async fn staff_see_only_released_results_by_student_number() {
        let c = classroom().await;
        c.grade(75.0).await;

        let before = c
            .app
            .get_with_token(&routes::student_results("S001"), &c.admin.token)
            .await;
        assert_eq!(before.status, 200);
        assert_eq!(before.body.as_array().unwrap().len(), 0);

        c.release().await;
        let after = c
            .app
            .get_with_token(&routes::student_results("S001"), &c.lecturer.token)
            .await;
        assert_eq!(after.body[0]["grade"], "A-");
    }
}

mod concurrency {
    use std::time::Duration;

    use ::common::{RegistrationStatus, Role};
    use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
    use ucms_server::entity::registration;
    use ucms_server::services::{EngineError, EnrollmentService, GradeSubmission, GradingService};

    use super::*;

    fn submission(student_id: i32, course_id: i32) -> GradeSubmission {
        GradeSubmission {
            student_id,
            course_id,
            marks: 70.0,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn grade_waits_for_an_uncommitted_drop_then_rejects() {
        let c = classroom().await;
        let row = registration::Entity::find()
            .filter(registration::Column::StudentId.eq(c.student.id))
            .one(&c.app.db)
            .await
            .unwrap()
            .unwrap();

        // Hold the drop open so its row lock is still taken.
        let txn = c.app.db.begin().await.unwrap();
        let mut dropped: registration::ActiveModel = row.into();
        dropped.status = Set(RegistrationStatus::Dropped);
        dropped.dropped_at = Set(Some(chrono::Utc::now()));
        dropped.update(&txn).await.unwrap();

        let db = c.app.db.clone();
        let (lecturer, student, course) = (c.lecturer.id, c.student.id, c.course);
        let grading = tokio::spawn(async move {
            GradingService::new(&db)
                .submit_grade(lecturer, submission(student, course))
                .await
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(
            !grading.is_finished(),
            "grading must wait for the pending drop"
        );
        txn.commit().await.unwrap();

        let outcome = grading.await.unwrap();
        assert!(
            matches!(outcome, Err(EngineError::InvalidState(_))),
            "{outcome:?}"
        );
        let results = course_result::Entity::find()
            .filter(course_result::Column::CourseId.eq(c.course))
            .count(&c.app.db)
            .await
            .unwrap();
        assert_eq!(results, 0);
    }

    #[tokio::test]
    async fn racing_grades_and_drops_leave_no_result_for_a_rejected_grade() {
        const STUDENTS: usize = 10;

        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let lecturer = app.insert_user("lect", Role::Lecturer, Some("L-1")).await;
        let course = app.create_course(&admin.token, "CS101", None).await;

        let mut students = Vec::with_capacity(STUDENTS);
        for i in 0..STUDENTS {
            let id = app
                .insert_user(&format!("s{i}"), Role::Student, Some(&format!("S{i:03}")))
                .await;
            EnrollmentService::new(&app.db)
                .register(id, course)
                .await
                .unwrap();
            students.push(id);
        }

        let mut handles = Vec::with_capacity(STUDENTS);
        for &student in &students {
            let grade_db = app.db.clone();
            let drop_db = app.db.clone();
            let grade = tokio::spawn(async move {
                GradingService::new(&grade_db)
                    .submit_grade(lecturer, submission(student, course))
                    .await
            });
            let dropping = tokio::spawn(async move {
                EnrollmentService::new(&drop_db)
                    .unregister(student, course)
                    .await
            });
            handles.push((student, grade, dropping));
        }

        for (student, grade, dropping) in handles {
            dropping.await.unwrap().expect("drop should always succeed");
            let stored = course_result::Entity::find()
                .filter(course_result::Column::StudentId.eq(student))
                .filter(course_result::Column::CourseId.eq(course))
                .one(&app.db)
                .await
                .unwrap();
            match grade.await.unwrap() {
                Ok(result) => assert_eq!(stored.map(|r| r.id), Some(result.id)),
                Err(EngineError::InvalidState(_)) => assert!(stored.is_none()),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(app.course_row(course).await.current_enrollments, 0);
    }
}
