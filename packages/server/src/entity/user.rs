use common::{Identity, Role};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Identity record. Role-specific columns are NULL for other roles.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    pub role: Role,

    pub first_name: String,
    pub last_name: String,

    /// Students only.
    #[sea_orm(unique)]
    pub student_number: Option<String>,
    pub program: Option<String>,
    pub year: Option<i32>,

    /// Lecturers only.
    #[sea_orm(unique)]
    pub staff_number: Option<String>,
    pub department: Option<String>,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::registration::Entity>,

    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Collapse the role tag and its nullable columns into one tagged value.
    pub fn identity(&self) -> Identity {
        match self.role {
            Role::Admin => Identity::Admin,
            Role::Lecturer => Identity::Lecturer {
                staff_number: self.staff_number.clone().unwrap_or_default(),
                department: self.department.clone(),
            },
            Role::Student => Identity::Student {
                student_number: self.student_number.clone().unwrap_or_default(),
                program: self.program.clone(),
                year: self.year,
            },
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
