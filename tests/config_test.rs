// ==========================================
// 配置对报表结果的影响（集成测试）
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use logistics_reporting::config::config_keys;
use logistics_reporting::domain::StockLevel;
use logistics_reporting::engine::DateSpan;
use logistics_reporting::export::{ExportKind, ExportRequest};
use logistics_reporting::logging;
use test_helpers::{create_test_env, dt, TestEnv};

fn seeded_env() -> TestEnv {
    logging::init_test();
    let env = create_test_env().expect("Failed to create test env");
    seed_standard(&env.repos, &env.sms.contact_repo, dt(1, 0)).expect("Failed to seed");
    report_soh(&env.repos, "RIDGE", &[("jd", 0), ("mc", 300), ("al", 500)], dt(15, 9)).unwrap();
    report_soh(&env.repos, "KBTH", &[("jd", 200)], dt(10, 9)).unwrap();
    env
}

fn mc_level(env: &TestEnv) -> StockLevel {
    env.state
        .reporting_api
        .stock_on_hand_facility("RIDGE", dt(20, 12))
        .unwrap()
        .stocks
        .into_iter()
        .find(|s| s.product_code == "mc")
        .map(|s| s.level)
        .unwrap()
}

#[test]
fn test_stock_levels_follow_config() {
    let env = seeded_env();
    let config = &env.state.config_manager;
    // 300 / 600 = 0.5 个月
    assert_eq!(mc_level(&env), StockLevel::Low);

    config.set_value(config_keys::MONTHS_EMERGENCY, "0.6").unwrap();
    assert_eq!(mc_level(&env), StockLevel::Emergency);

    config.set_value(config_keys::MONTHS_MINIMUM, "0.25").unwrap();
    config.set_value(config_keys::MONTHS_EMERGENCY, "0.1").unwrap();
    assert_eq!(mc_level(&env), StockLevel::Adequate);

    let cutoffs = env.state.reporting_api.stock_cutoffs().unwrap();
    assert_eq!(cutoffs.months_minimum, 0.25);
}

#[test]
fn test_unordered_levels_use_defaults() {
    let env = seeded_env();
    let config = &env.state.config_manager;
    config.set_value(config_keys::MONTHS_MINIMUM, "5").unwrap();
    config.set_value(config_keys::MONTHS_MAXIMUM, "2").unwrap();

    assert_eq!(mc_level(&env), StockLevel::Low);
    let cutoffs = env.state.reporting_api.stock_cutoffs().unwrap();
    assert_eq!((cutoffs.months_minimum, cutoffs.months_maximum), (1.0, 3.0));
}

#[test]
fn test_grace_days_follow_config() {
    let env = seeded_env();
    let span = DateSpan::since(7, dt(20, 12));
    let api = &env.state.reporting_api;

    // KBTH 5-10 上报，窗口起点 5-13，默认宽限 5 天内
    let b = api.reporting_breakdown("ACC", span, None).unwrap().breakdown;
    assert!(b.on_time.contains(&"KBTH".to_string()));

    env.state
        .config_manager
        .set_value(config_keys::DAYS_FOR_LATE, "1")
        .unwrap();
    let b = api.reporting_breakdown("ACC", span, None).unwrap().breakdown;
    assert_eq!(b.late, vec!["KBTH"]);
}

#[test]
fn test_bad_anchor_weekday_falls_back() {
    let env = seeded_env();
    let today = chrono::NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
    let export = |env: &TestEnv| {
        env.state
            .export_api
            .export_to_bytes(
                ExportKind::PeriodicReporting,
                &ExportRequest::for_location("GH"),
                today,
            )
            .unwrap()
    };

    env.state
        .config_manager
        .set_value(config_keys::PERIODIC_EXPORT_WEEKS, "2")
        .unwrap();
    let default_anchor = export(&env);

    env.state
        .config_manager
        .set_value(config_keys::PERIODIC_ANCHOR_WEEKDAY, "9")
        .unwrap();
    assert_eq!(export(&env), default_anchor);
}

#[test]
fn test_config_snapshot_restores_values() {
    let env = seeded_env();
    let config = &env.state.config_manager;
    config.set_value(config_keys::DAYS_FOR_LATE, "2").unwrap();
    let snapshot = config.get_config_snapshot().unwrap();

    config.set_value(config_keys::DAYS_FOR_LATE, "9").unwrap();
    config.restore_config_from_snapshot(&snapshot).unwrap();
    assert_eq!(config.load_reporting_config().unwrap().days_for_late, 2);
}

#[tokio::test]
async fn test_ui_settings() {
    let env = seeded_env();
    env.state
        .config_manager
        .set_value(config_keys::EXCEL_EXPORT_ENABLED, "false")
        .unwrap();
    env.state
        .config_manager
        .set_value(config_keys::STOCKED_BY, "user")
        .unwrap();

    let settings = env.state.reporting_api.ui_settings().await.unwrap();
    assert!(!settings.excel_export);
    assert_eq!(settings.stocked_by, "user");
    assert_eq!(settings.navigation_mode, "param");
    let codes: Vec<&str> = settings.active_stocks.iter().map(|p| p.sms_code.as_str()).collect();
    assert_eq!(codes, vec!["al", "jd", "mc"]);
}
