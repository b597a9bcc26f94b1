use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Always stored uppercase.
    #[sea_orm(unique)]
    pub code: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub credits: i32,
    pub department: String,

    /// NULL means unlimited.
    pub max_enrollments: Option<i32>,
    /// Count of active registrations, recomputed in the same transaction as
    /// every registration write. Never updated anywhere else.
    #[sea_orm(default_value = 0)]
    pub current_enrollments: i32,
    #[sea_orm(default_value = true)]
    pub active: bool,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::registration::Entity>,

    #[sea_orm(has_many)]
    pub results: HasMany<super::course_result::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// True when the course can take at least one more registration.
    pub fn has_free_seat(&self) -> bool {
        match self.max_enrollments {
            Some(max) => self.current_enrollments < max,
            None => true,
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
