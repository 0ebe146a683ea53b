pub mod test_db {
    use crate::auth::Role;
    use crate::db::{NewUser, create_user, insert_plan_with_days};
    use crate::error::AppError;
    use crate::models::{Goal, Intensity, NewWorkoutPlan, PlanSource, UserProfile};
    use crate::planner::{build_plan_days, preset_volume};
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        plans: Vec<TestPlan>,
        database_file: Option<PathBuf>,
    }

    pub struct TestUser {
        pub username: String,
        pub role: Role,
        pub password: String,
        pub profile: UserProfile,
    }

    pub struct TestPlan {
        pub username: String,
        pub goal: Goal,
        pub days: i64,
        pub start_date: NaiveDate,
        pub intensity: Intensity,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn member(self, username: &str) -> Self {
            self.user_with_profile(username, Role::Member, UserProfile::default())
        }

        pub fn admin(self, username: &str) -> Self {
            self.user_with_profile(username, Role::Admin, UserProfile::default())
        }

        pub fn user_with_profile(mut self, username: &str, role: Role, profile: UserProfile) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                role,
                password: STANDARD_PASSWORD.to_string(),
                profile,
            });
            self
        }

        pub fn plan(mut self, username: &str, goal: Goal, days: i64, start_date: NaiveDate) -> Self {
            self.plans.push(TestPlan {
                username: username.to_string(),
                goal,
                days,
                start_date,
                intensity: Intensity::Medium,
            });
            self
        }

        /// Backs the pool with a database file so several connections share it.
        pub fn on_disk(mut self, path: PathBuf) -> Self {
            self.database_file = Some(path);
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            let pool = match &self.database_file {
                Some(path) => {
                    SqlitePoolOptions::new()
                        .max_connections(4)
                        .connect_with(
                            SqliteConnectOptions::new()
                                .filename(path)
                                .create_if_missing(true),
                        )
                        .await?
                }
                // Every connection to sqlite::memory: opens its own database.
                None => {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                        .connect("sqlite::memory:")
                        .await?
                }
            };

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut plan_id_map: HashMap<String, Vec<i64>> = HashMap::new();

            for user in &self.users {
                let email = format!("{}@example.com", user.username);
                let user_id = create_user(
                    &pool,
                    NewUser {
                        username: &user.username,
                        email: &email,
                        password: &user.password,
                        role: user.role.clone(),
                        profile: &user.profile,
                    },
                )
                .await?;

                user_id_map.insert(user.username.clone(), user_id);
            }

            let mut rng = StdRng::seed_from_u64(7);
            for plan in &self.plans {
                let user_id = user_id_map.get(&plan.username).copied().ok_or_else(|| {
                    AppError::NotFound(format!("Test user {} was not declared", plan.username))
                })?;

                let days = build_plan_days(
                    plan.goal,
                    plan.days,
                    plan.start_date,
                    preset_volume(plan.intensity),
                    &mut rng,
                )?;

                let new_plan = NewWorkoutPlan {
                    user_id,
                    goal: plan.goal,
                    start_date: plan.start_date,
                    days: plan.days,
                    source: PlanSource::Preset,
                    intensity: plan.intensity,
                };

                let (stored, _) = insert_plan_with_days(&pool, &new_plan, days).await?;
                plan_id_map
                    .entry(plan.username.clone())
                    .or_default()
                    .push(stored.id);
            }

            Ok(TestDb {
                pool,
                user_id_map,
                plan_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub plan_id_map: HashMap<String, Vec<i64>>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        /// Plan ids for a user in the order they were declared.
        pub fn plan_ids(&self, username: &str) -> Vec<i64> {
            self.plan_id_map.get(username).cloned().unwrap_or_default()
        }

        pub async fn day_id(&self, plan_id: i64, day_index: i64) -> Result<i64, sqlx::Error> {
            sqlx::query_scalar::<_, i64>(
                "SELECT id FROM workout_days WHERE plan_id = ? AND day_index = ?",
            )
            .bind(plan_id)
            .bind(day_index)
            .fetch_one(&self.pool)
            .await
        }

        pub async fn count_rows(&self, table: &str) -> Result<i64, sqlx::Error> {
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await
        }
    }
}

pub mod test_utils {
    use std::sync::Arc;

    use chrono::{Days, Utc};
    use rocket::http::{ContentType, Cookie, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder};
    use crate::auth::Role;
    use crate::estimator::ScoreTableEstimator;
    use crate::init_rocket;
    use crate::models::{Gender, Goal, UserProfile};

    pub fn athlete_profile() -> UserProfile {
        UserProfile {
            age: Some(30),
            height_cm: Some(180.0),
            weight_kg: Some(75.0),
            gender: Some(Gender::Male),
            bmi: None,
            goal: Some(Goal::MuscleGain),
            ..Default::default()
        }
    }

    /// `member_user` has an active Muscle Gain plan that started three days ago.
    pub async fn create_standard_test_db() -> TestDb {
        let start = Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(3))
            .expect("Valid start date");

        TestDbBuilder::new()
            .user_with_profile("member_user", Role::Member, athlete_profile())
            .member("other_user")
            .admin("admin_user")
            .plan("member_user", Goal::MuscleGain, 7, start)
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), Arc::new(ScoreTableEstimator));
        let client = Client::untracked(rocket)
            .await
            .expect("Valid rocket instance");
        (client, test_db)
    }

    pub async fn login_test_user(
        client: &Client,
        identifier: &str,
        password: &str,
    ) -> Vec<Cookie<'static>> {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "identifier": identifier,
                    "password": password
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);

        response
            .cookies()
            .iter()
            .map(|cookie| cookie.clone().into_owned())
            .collect()
    }

    pub async fn login_standard_user(client: &Client, username: &str) -> Vec<Cookie<'static>> {
        login_test_user(client, username, STANDARD_PASSWORD).await
    }
}
