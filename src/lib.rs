#[macro_use]
extern crate rocket;

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod env;
pub mod error;
pub mod estimator;
pub mod models;
pub mod planner;
pub mod telemetry;
pub mod tracker;
pub mod validation;
#[cfg(test)]
mod test;

use api::{
    api_catalog, api_dashboard, api_generate_plan, api_get_all_users, api_history, api_list_plans,
    api_login, api_logout, api_me, api_me_unauthorized, api_register_user, api_toggle_item,
    api_update_profile, health,
};
use auth::{forbidden_api, unauthorized_api};
use config::PlannerConfig;
use estimator::SharedEstimator;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::TelemetryFairing;
use tracing::info;

pub fn init_rocket(pool: SqlitePool, estimator: SharedEstimator) -> Rocket<Build> {
    info!(estimator = estimator.name(), "Starting workout planner");

    rocket::build()
        .manage(pool)
        .manage(estimator)
        .attach(AdHoc::config::<PlannerConfig>())
        .mount(
            "/api",
            routes![
                api_register_user,
                api_login,
                api_logout,
                api_me,
                api_me_unauthorized,
                api_update_profile,
                api_generate_plan,
                api_list_plans,
                api_dashboard,
                api_toggle_item,
                api_history,
                api_catalog,
                api_get_all_users,
                health,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .attach(TelemetryFairing)
}
