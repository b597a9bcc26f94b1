use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use ucms_server::entity::registration;
use ucms_server::services::{EngineError, EnrollmentService};

use crate::common::{TestApp, routes};

mod register {
    use super::*;

    #[tokio::test]
    async fn student_takes_a_seat() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "S001").await;
        let course = app.create_course(&admin.token, "CS101", Some(10)).await;

        let res = app
            .post_with_token(&routes::registration(course), &json!({}), &student.token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["student_id"], student.id);
        assert_eq!(res.body["student_number"], "S001");
        assert_eq!(res.body["course_code"], "CS101");
        assert_eq!(res.body["status"], "ACTIVE");
        assert!(res.body["dropped_at"].is_null());
        assert_eq!(app.course_row(course).await.current_enrollments, 1);
    }

    #[tokio::test]
    async fn last_seat_goes_to_first_student() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let alice = app.create_student("alice", "S001").await;
        let bob = app.create_student("bob", "S002").await;
        let course = app.create_course(&admin.token, "CS101", Some(1)).await;

        app.register(course, &alice.token).await;
        let res = app
            .post_with_token(&routes::registration(course), &json!({}), &bob.token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CAPACITY_EXCEEDED");
        assert_eq!(app.course_row(course).await.current_enrollments, 1);
    }

    #[tokio::test]
    async fn unlimited_course_never_fills() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let course = app.create_course(&admin.token, "CS101", None).await;

        for i in 0..5 {
            let student = app
                .create_student(&format!("s{i}"), &format!("S00{i}"))
                .await;
            app.register(course, &student.token).await;
        }

        assert_eq!(app.course_row(course).await.current_enrollments, 5);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "S001").await;
        let course = app.create_course(&admin.token, "CS101", Some(10)).await;
        app.register(course, &student.token).await;

        let res = app
            .post_with_token(&routes::registration(course), &json!({}), &student.token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
        assert_eq!(app.course_row(course).await.current_enrollments, 1);
    }

    #[tokio::test]
    async fn inactive_course_is_closed() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "S001").await;
        let course = app.create_course(&admin.token, "CS101", None).await;
        app.patch_with_token(&routes::course(course), &json!({"active": false}), &admin.token)
            .await;

        let res = app
            .post_with_token(&routes::registration(course), &json!({}), &student.token)
            .await;

        assert_eq!(res.status, 422);
        assert_eq!(res.body["code"], "INVALID_STATE");
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let app = TestApp::spawn().await;
        let student = app.create_student("alice", "S001").await;

        let res = app
            .post_with_token(&routes::registration(4242), &json!({}), &student.token)
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn lecturers_cannot_register() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let lecturer = app.create_lecturer("lect").await;
        let course = app.create_course(&admin.token, "CS101", None).await;

        let res = app
            .post_with_token(&routes::registration(course), &json!({}), &lecturer.token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod unregister {
    use super::*;

    #[tokio::test]
    async fn drop_frees_the_seat() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let alice = app.create_student("alice", "S001").await;
        let bob = app.create_student("bob", "S002").await;
        let course = app.create_course(&admin.token, "CS101", Some(1)).await;
        app.register(course, &alice.token).await;

        let res = app
            .delete_with_token(&routes::registration(course), &alice.token)
            .await;
        assert_eq!(res.status, 204);
        assert_eq!(app.course_row(course).await.current_enrollments, 0);

        app.register(course, &bob.token).await;
        assert_eq!(app.course_row(course).await.current_enrollments, 1);
    }

    #[tokio::test]
    async fn dropping_without_registration_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "S001").await;
        let course = app.create_course(&admin.token, "CS101", None).await;

        let res = app
            .delete_with_token(&routes::registration(course), &student.token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn re_registering_after_drop_creates_a_new_record() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "S001").await;
        let course = app.create_course(&admin.token, "CS101", None).await;

        let first = app
            .post_with_token(&routes::registration(course), &json!({}), &student.token)
            .await;
        app.delete_with_token(&routes::registration(course), &student.token)
            .await;
        let second = app
            .post_with_token(&routes::registration(course), &json!({}), &student.token)
            .await;

        assert_eq!(second.status, 201, "{}", second.text);
        assert_ne!(first.id(), second.id());
        assert_eq!(app.course_row(course).await.current_enrollments, 1);
    }
}

mod queries {
    use super::*;

    #[tokio::test]
    async fn check_reflects_current_state() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "S001").await;
        let course = app.create_course(&admin.token, "CS101", None).await;

        let before = app
            .get_with_token(&routes::registration(course), &student.token)
            .await;
        assert_eq!(before.status, 200);
        assert_eq!(before.body["registered"], false);

        app.register(course, &student.token).await;
        let after = app
            .get_with_token(&routes::registration(course), &student.token)
            .await;
        assert_eq!(after.body["registered"], true);
        assert_eq!(after.body["course_id"], course);
    }

    #[tokio::test]
    async fn own_registrations_are_listed_oldest_first() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "S001").await;
        let math = app.create_course(&admin.token, "MATH100", None).await;
        let cs = app.create_course(&admin.token, "CS101", None).await;
        let phy = app.create_course(&admin.token, "PHY100", None).await;
        app.register(math, &student.token).await;
        app.register(cs, &student.token).await;
        app.register(phy, &student.token).await;
        app.delete_with_token(&routes::registration(cs), &student.token)
            .await;

        let res = app
            .get_with_token(routes::MY_REGISTRATIONS, &student.token)
            .await;

        assert_eq!(res.status, 200);
        let codes: Vec<&str> = res
            .body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["course_code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["MATH100", "PHY100"]);
    }

    #[tokio::test]
    async fn staff_look_up_registrations_by_student_number() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let student = app.create_student("alice", "SC2021001").await;
        let course = app.create_course(&admin.token, "CS101", None).await;
        app.register(course, &student.token).await;

        let res = app
            .get_with_token(&routes::student_registrations("SC2021001"), &admin.token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 1);

        let missing = app
            .get_with_token(&routes::student_registrations("NOPE"), &admin.token)
            .await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn students_cannot_look_up_others() {
        let app = TestApp::spawn().await;
        let alice = app.create_student("alice", "S001").await;
        app.create_student("bob", "S002").await;

        let res = app
            .get_with_token(&routes::student_registrations("S002"), &alice.token)
            .await;

        assert_eq!(res.status, 403);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn concurrent_registrations_never_overfill() {
        const CAPACITY: i32 = 3;
        const STUDENTS: usize = 12;

        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let course = app
            .create_course(&admin.token, "CS101", Some(CAPACITY))
            .await;

        let mut ids = Vec::with_capacity(STUDENTS);
        for i in 0..STUDENTS {
            let id = app
                .insert_user(
                    &format!("s{i}"),
                    ::common::Role::Student,
                    Some(&format!("S{i:03}")),
                )
                .await;
            ids.push(id);
        }

        let handles: Vec<_> = ids
            .into_iter()
            .map(|student_id| {
                let db = app.db.clone();
                tokio::spawn(async move {
                    EnrollmentService::new(&db).register(student_id, course).await
                })
            })
            .collect();

        let mut admitted = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(EngineError::CapacityExceeded(_)) => full += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(admitted, CAPACITY);
        assert_eq!(full, STUDENTS as i32 - CAPACITY);
        assert_eq!(app.course_row(course).await.current_enrollments, CAPACITY);
    }

    #[tokio::test]
    async fn concurrent_duplicate_registrations_admit_once() {
        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let course = app.create_course(&admin.token, "CS101", None).await;
        let student = app
            .insert_user("alice", ::common::Role::Student, Some("S001"))
            .await;

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let db = app.db.clone();
                tokio::spawn(async move {
                    EnrollmentService::new(&db).register(student, course).await
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(EngineError::Conflict(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(app.course_row(course).await.current_enrollments, 1);
    }

    #[tokio::test]
    async fn mixed_registrations_and_drops_keep_the_counter_exact() {
        const CAPACITY: i32 = 4;
        const NEWCOMERS: usize = 10;

        let app = TestApp::spawn().await;
        let admin = app.create_admin("admin").await;
        let course = app
            .create_course(&admin.token, "CS101", Some(CAPACITY))
            .await;

        let mut holders = Vec::new();
        for i in 0..CAPACITY {
            let id = app
                .insert_user(&format!("h{i}"), ::common::Role::Student, Some(&format!("H{i:03}")))
                .await;
            EnrollmentService::new(&app.db)
                .register(id, course)
                .await
                .unwrap();
            holders.push(id);
        }
        let mut newcomers = Vec::new();
        for i in 0..NEWCOMERS {
            let id = app
                .insert_user(&format!("n{i}"), ::common::Role::Student, Some(&format!("N{i:03}")))
                .await;
            newcomers.push(id);
        }

        let drops: Vec<_> = holders
            .iter()
            .map(|&student_id| {
                let db = app.db.clone();
                tokio::spawn(async move {
                    EnrollmentService::new(&db).unregister(student_id, course).await
                })
            })
            .collect();
        let joins: Vec<_> = newcomers
            .iter()
            .map(|&student_id| {
                let db = app.db.clone();
                tokio::spawn(async move {
                    EnrollmentService::new(&db).register(student_id, course).await
                })
            })
            .collect();

        for handle in drops {
            handle.await.unwrap().expect("holder drop should succeed");
        }
        let mut admitted = 0;
        for handle in joins {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(EngineError::CapacityExceeded(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let active = registration::Entity::find()
            .filter(registration::Column::CourseId.eq(course))
            .filter(registration::Column::Status.eq(::common::RegistrationStatus::Active))
            .count(&app.db)
            .await
            .unwrap() as i32;
        let counter = app.course_row(course).await.current_enrollments;

        assert_eq!(counter, active);
        assert_eq!(active, admitted);
        assert!(active <= CAPACITY, "{active} seats taken of {CAPACITY}");
    }
}
