// ==========================================
// 仪表盘告警集成测试
// ==========================================

mod helpers;

use chrono::Duration;
use helpers::test_data_builder::*;
use logistics_reporting::alerts::{Alert, AlertKind, AlertService};
use logistics_reporting::config::ReportingConfig;
use logistics_reporting::i18n::t_with_args;
use logistics_reporting::logging;
use test_helpers::{create_test_env, dt, TestEnv};

fn seeded_env() -> TestEnv {
    logging::init_test();
    let env = create_test_env().expect("Failed to create test env");
    seed_standard(&env.repos, &env.sms.contact_repo, dt(1, 0)).expect("Failed to seed");
    env
}

fn service(env: &TestEnv) -> AlertService {
    AlertService::new(env.repos.clone(), env.sms.contact_repo.clone())
}

fn targets(alerts: &[Alert]) -> Vec<&str> {
    let mut targets: Vec<&str> = alerts.iter().map(|a| a.target.as_str()).collect();
    targets.sort();
    targets
}

#[test]
fn test_non_reporting_alerts() {
    let env = seeded_env();
    let config = ReportingConfig::default();
    let now = dt(20, 12);

    // RIDGE 近期上报；TEMG 的上报早于告警期限；KBTH 和 KATH 从未上报
    report_soh(&env.repos, "RIDGE", &[("jd", 10)], dt(15, 9)).unwrap();
    report_soh(
        &env.repos,
        "TEMG",
        &[("jd", 10)],
        now - Duration::days(config.non_reporting_alert_days + 1),
    )
    .unwrap();

    let alerts = service(&env)
        .non_reporting_facilities("GH", now, &config)
        .unwrap()
        .expect("alerts expected");
    assert_eq!(alerts.len(), 3);
    assert!(alerts.iter().all(|a| a.kind == AlertKind::NonReporting));
    // 跳转目标为站点所在位置
    assert_eq!(targets(&alerts), vec!["ACC", "KUM", "TEM"]);

    let kath = alerts.iter().find(|a| a.target == "KUM").unwrap();
    assert_eq!(
        kath.text,
        t_with_args("alerts.non_reporting", &[("facility", "Komfo Anokye")])
    );
}

#[test]
fn test_non_reporting_alerts_empty_is_none() {
    let env = seeded_env();
    report_soh(&env.repos, "KATH", &[("al", 3)], dt(19, 9)).unwrap();

    let alerts = service(&env)
        .non_reporting_facilities("KUM", dt(20, 12), &ReportingConfig::default())
        .unwrap();
    assert!(alerts.is_none());
}

#[test]
fn test_reminder_and_reporter_alerts() {
    let env = seeded_env();
    let service = service(&env);

    let no_reminders = service.facilities_without_reminders("GH").unwrap().unwrap();
    assert_eq!(targets(&no_reminders), vec!["KATH", "KBTH"]);
    let kbth = no_reminders.iter().find(|a| a.target == "KBTH").unwrap();
    assert_eq!(kbth.text, t_with_args("alerts.no_reminders", &[("place", "Korle Bu")]));

    let no_reporters = service.facilities_without_reporters("GH").unwrap().unwrap();
    assert_eq!(targets(&no_reporters), vec!["KATH"]);
    assert_eq!(no_reporters[0].kind, AlertKind::NoReporters);

    assert!(service.facilities_without_reporters("GAR").unwrap().is_none());
    assert!(service.facilities_without_reminders("NOPE").is_err());
}

#[test]
fn test_dashboard_alerts_combine_all_kinds() {
    let env = seeded_env();
    report_soh(&env.repos, "RIDGE", &[("jd", 10)], dt(15, 9)).unwrap();

    let alerts = env
        .state
        .reporting_api
        .dashboard_alerts("GH", dt(20, 12))
        .unwrap();

    let count = |kind: AlertKind| alerts.iter().filter(|a| a.kind == kind).count();
    assert_eq!(count(AlertKind::NonReporting), 3);
    assert_eq!(count(AlertKind::NoReminders), 2);
    assert_eq!(count(AlertKind::NoReporters), 1);

    // 非活跃站点不参与告警
    env.repos.supply_point_repo.set_active("KATH", false).unwrap();
    let alerts = env
        .state
        .reporting_api
        .dashboard_alerts("GH", dt(20, 12))
        .unwrap();
    assert!(alerts.iter().all(|a| !a.text.contains("Komfo Anokye")));
    assert_eq!(alerts.len(), 3);
}
