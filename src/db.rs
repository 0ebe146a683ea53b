use crate::{
    auth::{DbUser, DbUserSession, Role, User, UserSession},
    error::AppError,
    models::{
        DbWorkoutDay, DbWorkoutLog, DbWorkoutPlan, ExerciseItem, NewWorkoutDay, NewWorkoutPlan,
        UserProfile, WorkoutDay, WorkoutLog, WorkoutPlan,
    },
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::types::Json;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

#[cfg(not(test))]
const PASSWORD_HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const PASSWORD_HASH_COST: u32 = 4;

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub profile: &'a UserProfile,
}

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, role, age, height_cm, weight_kg, gender, bmi, goal,
                fitness_level, created_at
         FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

/// Looks a user up by username or, failing that, by email.
#[instrument]
pub async fn find_user_by_identifier(
    pool: &Pool<Sqlite>,
    identifier: &str,
) -> Result<Option<User>, AppError> {
    info!("Finding user by username or email");
    let identifier = identifier.trim();
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, role, age, height_cm, weight_kg, gender, bmi, goal,
                fitness_level, created_at
         FROM users WHERE username = ? OR email = ?
         ORDER BY username = ? DESC
         LIMIT 1",
    )
    .bind(identifier)
    .bind(identifier.to_lowercase())
    .bind(identifier)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

#[instrument]
pub async fn username_or_email_taken(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
) -> Result<Option<&'static str>, AppError> {
    let username_row = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    if username_row.is_some() {
        return Ok(Some("username"));
    }

    let email_row = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if email_row.is_some() {
        return Ok(Some("email"));
    }

    Ok(None)
}

#[instrument(skip_all, fields(username = new_user.username, role = %new_user.role))]
pub async fn create_user(pool: &Pool<Sqlite>, new_user: NewUser<'_>) -> Result<i64, AppError> {
    info!("Creating new user");

    let username = new_user.username.trim();
    let email = new_user.email.trim().to_lowercase();
    if let Some(field) = username_or_email_taken(pool, username, &email).await? {
        return Err(AppError::Conflict(format!("{} already exists", field)));
    }

    let hashed_password = bcrypt::hash(new_user.password, PASSWORD_HASH_COST)?;
    let profile = new_user.profile;

    let res = sqlx::query(
        "INSERT INTO users
            (username, email, password, role, age, height_cm, weight_kg, gender, bmi, goal,
             fitness_level, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(hashed_password)
    .bind(new_user.role.as_str())
    .bind(profile.age)
    .bind(profile.height_cm)
    .bind(profile.weight_kg)
    .bind(profile.gender.map(|g| g.as_str()))
    .bind(profile.computed_bmi())
    .bind(profile.goal.map(|g| g.as_str()))
    .bind(profile.fitness_level.as_str())
    .bind(Utc::now().naive_utc())
    .execute(pool)
    .await
    .map_err(|e| conflict_on_unique(e, "username or email"))?;

    Ok(res.last_insert_rowid())
}

/// A concurrent insert can still trip the UNIQUE index after the lookup above.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("{} already exists", what))
        }
        _ => AppError::Database(err),
    }
}

#[instrument(skip_all, fields(identifier = %identifier))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    identifier: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let Some(user) = find_user_by_identifier(pool, identifier).await? else {
        return Ok(None);
    };

    let hash = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = ?")
        .bind(user.id)
        .fetch_one(pool)
        .await?;

    match bcrypt::verify(password, &hash) {
        Ok(true) => Ok(Some(user)),
        _ => Ok(None),
    }
}

#[instrument(skip(pool))]
pub async fn update_user_profile(
    pool: &Pool<Sqlite>,
    user_id: i64,
    profile: &UserProfile,
) -> Result<(), AppError> {
    info!("Updating user profile");
    let res = sqlx::query(
        "UPDATE users
         SET age = ?, height_cm = ?, weight_kg = ?, gender = ?, bmi = ?, goal = ?,
             fitness_level = ?
         WHERE id = ?",
    )
    .bind(profile.age)
    .bind(profile.height_cm)
    .bind(profile.weight_kg)
    .bind(profile.gender.map(|g| g.as_str()))
    .bind(profile.computed_bmi())
    .bind(profile.goal.map(|g| g.as_str()))
    .bind(profile.fitness_level.as_str())
    .bind(user_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    Ok(())
}

#[instrument]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    info!("Getting all users");
    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, role, age, height_cm, weight_kg, gender, bmi, goal,
                fitness_level, created_at
         FROM users ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(User::from).collect())
}

#[instrument(skip(pool, token))]
pub async fn create_user_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    token: &str,
    expires_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Creating user session");

    let res = sqlx::query(
        "INSERT INTO user_sessions (user_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(token)
    .bind(Utc::now().naive_utc())
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, token))]
pub async fn get_session_by_token(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<UserSession, AppError> {
    let session = sqlx::query_as::<_, DbUserSession>(
        "SELECT id, user_id, token, created_at, expires_at FROM user_sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match session {
        Some(session) => Ok(UserSession::from(session)),
        _ => Err(AppError::Authentication(
            "Invalid session token".to_string(),
        )),
    }
}

#[instrument(skip(pool, token))]
pub async fn invalidate_session(pool: &Pool<Sqlite>, token: &str) -> Result<(), AppError> {
    info!("Invalidating session");

    sqlx::query("DELETE FROM user_sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn clean_expired_sessions(pool: &Pool<Sqlite>) -> Result<u64, AppError> {
    info!("Cleaning expired sessions");

    let now = Utc::now().naive_utc();

    let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Writes a plan and all of its days in one transaction. Any failed insert
/// rolls the whole plan back.
#[instrument(skip(pool, days), fields(day_count = days.len()))]
pub async fn insert_plan_with_days(
    pool: &Pool<Sqlite>,
    plan: &NewWorkoutPlan,
    days: Vec<NewWorkoutDay>,
) -> Result<(WorkoutPlan, Vec<WorkoutDay>), AppError> {
    info!("Persisting workout plan");
    let created_at = Utc::now().naive_utc();

    let mut tx = pool.begin().await?;

    let plan_id = sqlx::query(
        "INSERT INTO workout_plans (user_id, goal, start_date, days, source, intensity, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(plan.user_id)
    .bind(plan.goal.as_str())
    .bind(plan.start_date)
    .bind(plan.days)
    .bind(plan.source.as_str())
    .bind(plan.intensity.as_str())
    .bind(created_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let mut stored = Vec::with_capacity(days.len());
    for day in days {
        let day_id = sqlx::query(
            "INSERT INTO workout_days (plan_id, day_index, date, items) VALUES (?, ?, ?, ?)",
        )
        .bind(plan_id)
        .bind(day.day_index)
        .bind(day.date)
        .bind(Json(&day.items))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        stored.push(WorkoutDay {
            id: day_id,
            plan_id,
            day_index: day.day_index,
            date: day.date,
            items: day.items,
        });
    }

    tx.commit().await?;

    let plan = WorkoutPlan {
        id: plan_id,
        user_id: plan.user_id,
        goal: plan.goal,
        start_date: plan.start_date,
        days: plan.days,
        source: plan.source,
        intensity: plan.intensity,
        created_at: DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc),
    };

    Ok((plan, stored))
}

/// The active plan: newest by creation time, ties broken by id.
#[instrument(skip(pool))]
pub async fn get_latest_plan_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Option<WorkoutPlan>, AppError> {
    let row = sqlx::query_as::<_, DbWorkoutPlan>(
        "SELECT id, user_id, goal, start_date, days, source, intensity, created_at
         FROM workout_plans
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(WorkoutPlan::try_from).transpose()
}

#[instrument(skip(pool))]
pub async fn list_plans_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<WorkoutPlan>, AppError> {
    let rows = sqlx::query_as::<_, DbWorkoutPlan>(
        "SELECT id, user_id, goal, start_date, days, source, intensity, created_at
         FROM workout_plans
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(WorkoutPlan::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn get_plan_days(pool: &Pool<Sqlite>, plan_id: i64) -> Result<Vec<WorkoutDay>, AppError> {
    let rows = sqlx::query_as::<_, DbWorkoutDay>(
        "SELECT id, plan_id, day_index, date, items
         FROM workout_days
         WHERE plan_id = ?
         ORDER BY day_index",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(WorkoutDay::try_from).collect()
}

#[instrument(skip(pool))]
pub async fn get_plan_day_by_index(
    pool: &Pool<Sqlite>,
    plan_id: i64,
    day_index: i64,
) -> Result<Option<WorkoutDay>, AppError> {
    let row = sqlx::query_as::<_, DbWorkoutDay>(
        "SELECT id, plan_id, day_index, date, items
         FROM workout_days
         WHERE plan_id = ? AND day_index = ?",
    )
    .bind(plan_id)
    .bind(day_index)
    .fetch_optional(pool)
    .await?;

    row.map(WorkoutDay::try_from).transpose()
}

#[derive(sqlx::FromRow)]
struct DbOwnedWorkoutDay {
    id: Option<i64>,
    plan_id: Option<i64>,
    day_index: Option<i64>,
    date: Option<NaiveDate>,
    items: Option<Json<Vec<ExerciseItem>>>,
    owner_id: Option<i64>,
}

/// A day together with the id of the user owning its plan.
#[instrument(skip(executor))]
pub async fn get_day_with_owner(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    day_id: i64,
) -> Result<Option<(WorkoutDay, i64)>, AppError> {
    let row = sqlx::query_as::<_, DbOwnedWorkoutDay>(
        "SELECT d.id, d.plan_id, d.day_index, d.date, d.items, p.user_id AS owner_id
         FROM workout_days d
         JOIN workout_plans p ON p.id = d.plan_id
         WHERE d.id = ?",
    )
    .bind(day_id)
    .fetch_optional(executor)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let owner_id = row.owner_id.unwrap_or_default();
    let day = WorkoutDay::try_from(DbWorkoutDay {
        id: row.id,
        plan_id: row.plan_id,
        day_index: row.day_index,
        date: row.date,
        items: row.items,
    })?;

    Ok(Some((day, owner_id)))
}

#[instrument(skip(executor, items))]
pub async fn update_day_items(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    day_id: i64,
    items: &[ExerciseItem],
) -> Result<(), AppError> {
    sqlx::query("UPDATE workout_days SET items = ? WHERE id = ?")
        .bind(Json(items))
        .bind(day_id)
        .execute(executor)
        .await?;

    Ok(())
}

#[instrument(skip(executor))]
pub async fn insert_workout_log(
    executor: impl sqlx::Executor<'_, Database = Sqlite>,
    user_id: i64,
    day_id: i64,
    item_index: i64,
    completed: bool,
) -> Result<i64, AppError> {
    let res = sqlx::query(
        "INSERT INTO workout_logs (user_id, day_id, item_index, completed, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(day_id)
    .bind(item_index)
    .bind(completed)
    .bind(Utc::now().naive_utc())
    .execute(executor)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool))]
pub async fn get_logs_for_user(
    pool: &Pool<Sqlite>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<WorkoutLog>, AppError> {
    let rows = sqlx::query_as::<_, DbWorkoutLog>(
        "SELECT id, user_id, day_id, item_index, completed, created_at
         FROM workout_logs
         WHERE user_id = ?
         ORDER BY created_at DESC, id DESC
         LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(WorkoutLog::from).collect())
}
