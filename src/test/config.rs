#[cfg(test)]
mod tests {
    use rocket::figment::Figment;
    use rocket::figment::providers::Serialized;
    use serial_test::serial;

    use crate::config::PlannerConfig;
    use crate::env::load_environment;

    #[test]
    fn test_defaults_apply_when_unset() {
        let config: PlannerConfig = Figment::new().extract().unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.session_hours, 12);
        assert_eq!(config.remember_days, 30);
        assert_eq!(config.default_plan_days, 28);
        assert_eq!(config.max_plan_days, 365);
    }

    #[test]
    fn test_partial_override() {
        let config: PlannerConfig = Figment::from(Serialized::defaults(
            serde_json::json!({ "max_plan_days": 90 }),
        ))
        .extract()
        .unwrap();

        assert_eq!(config.max_plan_days, 90);
        assert_eq!(config.default_plan_days, 28);
    }

    #[test]
    fn test_remembered_sessions_last_longer() {
        let config = PlannerConfig::default();
        assert_eq!(config.session_length_hours(false), 12);
        assert_eq!(config.session_length_hours(true), 30 * 24);

        let config = PlannerConfig {
            session_hours: 48,
            remember_days: 1,
            ..PlannerConfig::default()
        };
        assert_eq!(config.session_length_hours(true), 48);
    }

    #[test]
    #[serial]
    fn test_rocket_env_overrides_planner_config() {
        temp_env::with_vars(
            [
                ("ROCKET_SESSION_HOURS", Some("2")),
                ("ROCKET_MAX_PLAN_DAYS", Some("30")),
            ],
            || {
                let config: PlannerConfig = rocket::Config::figment().extract().unwrap();
                assert_eq!(config.session_hours, 2);
                assert_eq!(config.max_plan_days, 30);
                assert_eq!(config.default_plan_days, 28);
            },
        );
    }

    #[test]
    #[serial]
    fn test_missing_env_files_are_skipped() {
        temp_env::with_var("ROCKET_PROFILE", Some("no-such-profile"), || {
            assert!(load_environment().is_ok());
        });
    }
}
