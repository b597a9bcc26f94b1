use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Forward edge `course_id -> prerequisite_id`. The only stored direction;
/// dependents are found through the index on `prerequisite_id`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_prerequisite")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub course_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub prerequisite_id: i32,
}

impl ActiveModelBehavior for ActiveModel {}
