use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use serde_json::{Value, json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, Role, SESSION_COOKIE, User, UserSession};
use crate::catalog::{self, ExercisePools};
use crate::config::PlannerConfig;
use crate::dashboard::get_today;
use crate::db::{
    NewUser, authenticate_user, create_user, create_user_session, get_all_users, get_logs_for_user,
    get_plan_days, get_user, invalidate_session, list_plans_for_user, update_user_profile,
    username_or_email_taken,
};
use crate::error::AppError;
use crate::estimator::SharedEstimator;
use crate::models::{
    FitnessLevel, Gender, Goal, PlanSource, UserProfile, WorkoutDay, WorkoutLog, WorkoutPlan,
};
use crate::planner::{PlanRequest, generate_plan};
use crate::tracker::toggle_item;
use crate::validation::{
    ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt, ValidationResponse,
};

const HISTORY_LIMIT: i64 = 100;

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub profile: UserProfile,
    pub created_at: String,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role.to_string(),
            profile: user.profile,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    username: String,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 120, message = "Email must be at most 120 characters")
    )]
    email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be 6 to 128 characters"))]
    password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    confirm_password: String,
    #[validate(range(min = 12, max = 80, message = "Age must be between 12 and 80"))]
    age: Option<i64>,
    #[validate(range(min = 100.0, max = 230.0, message = "Height must be between 100 and 230 cm"))]
    height_cm: Option<f64>,
    #[validate(range(min = 30.0, max = 250.0, message = "Weight must be between 30 and 250 kg"))]
    weight_kg: Option<f64>,
    gender: Option<Gender>,
    goal: Option<Goal>,
    fitness_level: Option<FitnessLevel>,
}

#[post("/register", data = "<registration>")]
pub async fn api_register_user(
    registration: Json<RegisterRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<UserData>>, ApiError> {
    let mut registration = registration.into_inner();
    registration.username = registration.username.trim().to_string();
    registration.email = registration.email.trim().to_lowercase();
    let validated = Json(registration).validate_custom()?;

    if let Some(field) = username_or_email_taken(db, &validated.username, &validated.email)
        .await
        .validate_custom()?
    {
        return Err(Custom(
            Status::Conflict,
            Json(ValidationResponse::with_error(
                "conflict_error",
                field,
                &format!("{} already exists", field),
            )),
        ));
    }

    let profile = UserProfile {
        age: validated.age,
        height_cm: validated.height_cm,
        weight_kg: validated.weight_kg,
        gender: validated.gender,
        bmi: None,
        goal: validated.goal,
        fitness_level: validated.fitness_level.unwrap_or_default(),
    };

    let user_id = create_user(
        db,
        NewUser {
            username: &validated.username,
            email: &validated.email,
            password: &validated.password,
            role: Role::Member,
            profile: &profile,
        },
    )
    .await
    .validate_custom()?;

    let user = get_user(db, user_id).await.validate_custom()?;

    Ok(Custom(Status::Created, Json(UserData::from(user))))
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "username", alias = "email")]
    #[validate(length(min = 1, message = "Username or email is required"))]
    identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
    #[serde(default)]
    remember: bool,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<PlannerConfig>,
) -> Result<Json<LoginResponse>, ApiError> {
    let validated = login.validate_custom()?;

    match authenticate_user(db, &validated.identifier, &validated.password)
        .await
        .validate_custom()?
    {
        Some(user) => {
            let token = UserSession::generate_token();
            let hours = config.session_length_hours(validated.remember);
            let expires_at = Utc::now() + chrono::Duration::hours(hours);

            create_user_session(db, user.id, &token, expires_at.naive_utc())
                .await
                .validate_custom()?;

            let max_age = rocket::time::Duration::hours(hours);
            cookies.add_private(
                Cookie::build((SESSION_COOKIE, token))
                    .same_site(SameSite::Lax)
                    .http_only(true)
                    .max_age(max_age),
            );
            cookies.add_private(
                Cookie::build(("user_role", user.role.to_string()))
                    .same_site(SameSite::Lax)
                    .max_age(max_age),
            );

            Ok(Json(LoginResponse {
                success: true,
                user: Some(UserData::from(user)),
                error: None,
            }))
        }
        None => Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid username/email or password".to_string()),
        })),
    }
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> Json<Value> {
    let token = cookies
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string());

    if let Some(token) = token {
        if let Err(e) = invalidate_session(db, &token).await {
            e.log_and_record("Logout");
        }
    }

    cookies.remove_private(Cookie::build(SESSION_COOKIE));
    cookies.remove_private(Cookie::build("user_role"));

    Json(json!({ "success": true }))
}

#[get("/me")]
pub async fn api_me(user: User) -> Result<Json<UserData>, Status> {
    user.require_permission(Permission::ViewOwnProfile)?;
    Ok(Json(UserData::from(user)))
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

/// Fields left out keep their stored value.
#[derive(Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(range(min = 12, max = 80, message = "Age must be between 12 and 80"))]
    age: Option<i64>,
    #[validate(range(min = 100.0, max = 230.0, message = "Height must be between 100 and 230 cm"))]
    height_cm: Option<f64>,
    #[validate(range(min = 30.0, max = 250.0, message = "Weight must be between 30 and 250 kg"))]
    weight_kg: Option<f64>,
    gender: Option<Gender>,
    goal: Option<Goal>,
    fitness_level: Option<FitnessLevel>,
}

#[put("/profile", data = "<profile>")]
pub async fn api_update_profile(
    profile: Json<ProfileUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, ApiError> {
    user.require_permission(Permission::EditOwnProfile)
        .validate_custom()?;
    let update = profile.validate_custom()?;

    let current = user.profile;
    let merged = UserProfile {
        age: update.age.or(current.age),
        height_cm: update.height_cm.or(current.height_cm),
        weight_kg: update.weight_kg.or(current.weight_kg),
        gender: update.gender.or(current.gender),
        bmi: None,
        goal: update.goal.or(current.goal),
        fitness_level: update.fitness_level.unwrap_or(current.fitness_level),
    };

    update_user_profile(db, user.id, &merged)
        .await
        .validate_custom()?;

    let refreshed = get_user(db, user.id).await.validate_custom()?;
    Ok(Json(UserData::from(refreshed)))
}

#[derive(Deserialize, Validate)]
pub struct GeneratePlanRequest {
    goal: Option<String>,
    days: Option<i64>,
    source: Option<String>,
    intensity: Option<String>,
    start_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub plan: WorkoutPlan,
    pub days: Vec<WorkoutDay>,
}

#[post("/plans", data = "<request>")]
pub async fn api_generate_plan(
    request: Json<GeneratePlanRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
    estimator: &State<SharedEstimator>,
    config: &State<PlannerConfig>,
) -> Result<Custom<Json<PlanResponse>>, ApiError> {
    user.require_permission(Permission::GeneratePlans)
        .validate_custom()?;
    let request = request.validate_custom()?;

    let plan_request = build_plan_request(request, &user, config).validate_custom()?;

    let generated = generate_plan(
        db,
        estimator.inner().as_ref(),
        user.id,
        &user.profile,
        plan_request,
    )
    .await
    .validate_custom()?;

    Ok(Custom(
        Status::Created,
        Json(PlanResponse {
            plan: generated.plan,
            days: generated.days,
        }),
    ))
}

fn build_plan_request(
    request: GeneratePlanRequest,
    user: &User,
    config: &PlannerConfig,
) -> Result<PlanRequest, AppError> {
    let goal = match request.goal.as_deref() {
        Some(goal) => goal.parse()?,
        None => user.profile.goal.unwrap_or(Goal::WeightLoss),
    };

    let total_days = request.days.unwrap_or(config.default_plan_days);
    if total_days < 1 || total_days > config.max_plan_days {
        return Err(AppError::Validation(format!(
            "Plan length must be between 1 and {} days",
            config.max_plan_days
        )));
    }

    let source = match request.source.as_deref() {
        Some(source) => source.parse()?,
        None => PlanSource::Ai,
    };

    let intensity = request
        .intensity
        .as_deref()
        .map(str::parse)
        .transpose()?;

    Ok(PlanRequest {
        goal,
        total_days,
        source,
        intensity,
        start_date: request.start_date.unwrap_or_else(|| Utc::now().date_naive()),
    })
}

#[get("/plans")]
pub async fn api_list_plans(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<WorkoutPlan>>, ApiError> {
    let plans = list_plans_for_user(db, user.id).await.validate_custom()?;
    Ok(Json(plans))
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub plan: Option<WorkoutPlan>,
    pub days: Vec<WorkoutDay>,
    pub today: Option<WorkoutDay>,
    pub day_offset: Option<i64>,
    pub media_links: BTreeMap<String, String>,
}

#[get("/dashboard")]
pub async fn api_dashboard(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let today = get_today(db, user.id, Utc::now().date_naive())
        .await
        .validate_custom()?;

    let (days, media_links) = match &today.plan {
        Some(plan) => (
            get_plan_days(db, plan.id).await.validate_custom()?,
            catalog::media_links(plan.goal),
        ),
        None => (Vec::new(), BTreeMap::new()),
    };

    Ok(Json(DashboardResponse {
        plan: today.plan,
        days,
        today: today.day,
        day_offset: today.day_offset,
        media_links,
    }))
}

#[derive(Serialize, Deserialize)]
pub struct ToggleResponse {
    pub success: bool,
    pub completed: bool,
    pub day_complete: bool,
}

#[post("/days/<day_id>/items/<item_index>/toggle")]
pub async fn api_toggle_item(
    day_id: i64,
    item_index: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ToggleResponse>, ApiError> {
    user.require_permission(Permission::TrackProgress)
        .validate_custom()?;

    let outcome = toggle_item(db, day_id, item_index, user.id)
        .await
        .validate_custom()?;

    Ok(Json(ToggleResponse {
        success: true,
        completed: outcome.completed,
        day_complete: outcome.day_complete,
    }))
}

#[get("/history")]
pub async fn api_history(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<WorkoutLog>>, ApiError> {
    let logs = get_logs_for_user(db, user.id, HISTORY_LIMIT)
        .await
        .validate_custom()?;
    Ok(Json(logs))
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub goal: Goal,
    pub pools: &'static ExercisePools,
    pub media_links: BTreeMap<String, String>,
}

#[get("/catalog")]
pub fn api_catalog() -> Json<Vec<CatalogEntry>> {
    Json(
        Goal::ALL
            .into_iter()
            .map(|goal| CatalogEntry {
                goal,
                pools: catalog::pools(goal),
                media_links: catalog::media_links(goal),
            })
            .collect(),
    )
}

#[get("/admin/users")]
pub async fn api_get_all_users(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::ViewAllUsers)?;

    let users = get_all_users(db).await?;

    Ok(Json(users.into_iter().map(UserData::from).collect()))
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
