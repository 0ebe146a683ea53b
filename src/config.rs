use serde::Deserialize;

fn default_session_hours() -> i64 {
    12
}

fn default_remember_days() -> i64 {
    30
}

fn default_plan_days() -> i64 {
    28
}

fn default_max_plan_days() -> i64 {
    365
}

/// Planner settings read from Rocket's figment (`Rocket.toml` or `ROCKET_*` env vars).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlannerConfig {
    #[serde(default = "default_session_hours")]
    pub session_hours: i64,
    /// Session length when the user asks to be remembered at login.
    #[serde(default = "default_remember_days")]
    pub remember_days: i64,
    #[serde(default = "default_plan_days")]
    pub default_plan_days: i64,
    #[serde(default = "default_max_plan_days")]
    pub max_plan_days: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            session_hours: default_session_hours(),
            remember_days: default_remember_days(),
            default_plan_days: default_plan_days(),
            max_plan_days: default_max_plan_days(),
        }
    }
}

impl PlannerConfig {
    pub fn session_length_hours(&self, remember: bool) -> i64 {
        if remember {
            self.remember_days.saturating_mul(24).max(self.session_hours)
        } else {
            self.session_hours
        }
    }
}
