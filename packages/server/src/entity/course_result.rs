use common::LetterGrade;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A lecturer's assessment of one student in one course. Regrading
/// overwrites this row; there is never more than one per (student, course).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "student_course")]
    pub student_id: i32,
    #[sea_orm(unique_key = "student_course")]
    pub course_id: i32,
    #[sea_orm(belongs_to, from = "course_id", to = "id")]
    pub course: HasOne<super::course::Entity>,

    pub lecturer_id: i32,

    pub student_number: String,
    pub course_code: String,
    pub course_title: String,

    pub marks: f64,
    pub grade: LetterGrade,
    #[sea_orm(column_type = "Text", nullable)]
    pub remarks: Option<String>,
    pub graded_at: DateTimeUtc,

    #[sea_orm(default_value = false)]
    pub released: bool,
    pub released_at: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
