use chrono::{DateTime, NaiveDateTime, Utc};
use rocket::http::Status;
use serde::Serialize;

use crate::models::UserProfile;

use super::{Permission, Role};

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub age: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub gender: Option<String>,
    pub bmi: Option<f64>,
    pub goal: Option<String>,
    pub fitness_level: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbUser> for User {
    fn from(user: DbUser) -> Self {
        let id = user.id.unwrap_or_default();
        let role = Role::from_str(&user.role.unwrap_or_default()).unwrap_or_else(|e| {
            tracing::warn!(user_id = id, error = %e, "Stored role unreadable, treating as member");
            Role::Member
        });

        Self {
            id,
            username: user.username.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            role,
            profile: UserProfile {
                age: user.age,
                height_cm: user.height_cm,
                weight_kg: user.weight_kg,
                gender: user.gender.and_then(|g| g.parse().ok()),
                bmi: user.bmi,
                goal: user.goal.and_then(|g| g.parse().ok()),
                fitness_level: user
                    .fitness_level
                    .and_then(|f| f.parse().ok())
                    .unwrap_or_default(),
            },
            created_at: user
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

impl User {
    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }
}
