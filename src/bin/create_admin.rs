use anyhow::{Context, Result, anyhow, bail};
use sqlx::SqlitePool;
use workout_planner::auth::Role;
use workout_planner::db::{NewUser, create_user};
use workout_planner::env::load_environment;
use workout_planner::models::UserProfile;

fn required_var(name: &str) -> Result<String> {
    let value = std::env::var(name).with_context(|| format!("{} must be set", name))?;
    if value.trim().is_empty() {
        bail!("{} must not be empty", name);
    }
    Ok(value)
}

#[rocket::main]
async fn main() -> Result<()> {
    load_environment().map_err(|e| anyhow!("Failed to load environment files: {}", e))?;

    let username = required_var("ADMIN_USERNAME")?.trim().to_string();
    if !(3..=50).contains(&username.chars().count()) {
        bail!("ADMIN_USERNAME must be 3 to 50 characters");
    }
    let email = required_var("ADMIN_EMAIL")?;
    let password = required_var("ADMIN_PASSWORD")?;
    if password.len() < 6 {
        bail!("ADMIN_PASSWORD must be at least 6 characters");
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://workouts.db?mode=rwc".into());

    let pool = SqlitePool::connect(&database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", database_url))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Database migration failed")?;

    let profile = UserProfile::default();
    let id = create_user(
        &pool,
        NewUser {
            username: &username,
            email: &email,
            password: &password,
            role: Role::Admin,
            profile: &profile,
        },
    )
    .await?;

    println!("Created admin user {} (id {})", username, id);
    Ok(())
}
