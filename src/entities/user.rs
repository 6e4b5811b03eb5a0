use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Free-form in the table; see [`Role::from_name`].
    pub role: String,
    pub location: Option<String>,
    pub manager_id: Option<Uuid>,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Model {
    pub fn role(&self) -> Role {
        Role::from_name(&self.role)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    User,
}

impl Role {
    /// Any role string other than `admin` or `manager` gets plain user visibility.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            _ => Role::User,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
