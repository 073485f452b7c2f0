// ==========================================
// 短信上报流程集成测试
// ==========================================
// 测试目标: soh / rec / status 关键字与错误回复
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use logistics_reporting::domain::ReportType;
use logistics_reporting::i18n::{t, t_with_args};
use logistics_reporting::logging;
use logistics_reporting::repository::{MessageFilter, ReportFilter};
use logistics_reporting::ApiError;
use test_helpers::{create_test_env, dt, TestEnv};

fn seeded_env() -> TestEnv {
    logging::init_test();
    let env = create_test_env().expect("Failed to create test env");
    seed_standard(&env.repos, &env.sms.contact_repo, dt(1, 0)).expect("Failed to seed");
    env
}

fn quantity(env: &TestEnv, facility: &str, product: &str) -> Option<i64> {
    env.repos
        .product_stock_repo
        .find(facility, product)
        .unwrap()
        .and_then(|s| s.quantity)
}

#[test]
fn test_stock_on_hand_report() {
    let env = seeded_env();
    let response = env
        .state
        .sms_api
        .handle_incoming(RIDGE_PHONE, "soh jd 10 mc0 AL 20", dt(15, 9))
        .unwrap();

    let mut expected = t_with_args("sms.soh_confirm", &[("name", "Ama")]);
    expected.push(' ');
    expected.push_str(&t_with_args("sms.soh_stockouts", &[("products", "mc")]));
    assert_eq!(response.reply, expected);

    assert_eq!(quantity(&env, "RIDGE", "jd"), Some(10));
    assert_eq!(quantity(&env, "RIDGE", "mc"), Some(0));
    assert_eq!(quantity(&env, "RIDGE", "al"), Some(20));

    let ridge = env.repos.supply_point_repo.get_by_code("RIDGE").unwrap();
    assert_eq!(ridge.last_reported, Some(dt(15, 9)));

    // 来信与回复都写入短信日志
    let messages = env.sms.message_repo.list(&MessageFilter::default()).unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| m.id == response.incoming_id));
    assert!(messages.iter().any(|m| m.id == response.outgoing_id && m.text == expected));
}

#[test]
fn test_keyword_without_body_replies_help() {
    let env = seeded_env();
    let response = env
        .state
        .sms_api
        .handle_incoming(RIDGE_PHONE, "SOH", dt(15, 9))
        .unwrap();
    assert_eq!(response.reply, t("sms.soh_help"));
}

#[test]
fn test_parse_errors_are_replied() {
    let env = seeded_env();
    let api = &env.state.sms_api;

    let reply = api.handle_incoming(RIDGE_PHONE, "soh xx 10", dt(15, 9)).unwrap().reply;
    assert_eq!(reply, t_with_args("sms.error_unknown_product", &[("code", "xx")]));

    let reply = api.handle_incoming(RIDGE_PHONE, "soh jd", dt(15, 9)).unwrap().reply;
    assert_eq!(reply, t_with_args("sms.error_missing_quantity", &[("code", "jd")]));

    let reply = api.handle_incoming(RIDGE_PHONE, "soh jd ten", dt(15, 9)).unwrap().reply;
    assert_eq!(reply, t_with_args("sms.error_missing_quantity", &[("code", "jd")]));

    let reply = api.handle_incoming(RIDGE_PHONE, "soh jd -4", dt(15, 9)).unwrap().reply;
    assert_eq!(reply, t_with_args("sms.error_bad_quantity", &[("code", "jd")]));

    // 失败的短信不产生上报
    assert_eq!(quantity(&env, "RIDGE", "jd"), None);
}

#[test]
fn test_receipts_add_to_balance_and_record_supplier() {
    let env = seeded_env();
    let api = &env.state.sms_api;
    api.handle_incoming(RIDGE_PHONE, "soh jd 10 mc 5 al 5", dt(15, 9)).unwrap();

    let reply = api
        .handle_incoming(RIDGE_PHONE, "rec jd 5 mc 10 from Central Stores", dt(16, 9))
        .unwrap()
        .reply;
    assert_eq!(
        reply,
        t_with_args(
            "sms.receipt_from_confirm",
            &[("products", "jd mc"), ("supplier", "central stores")]
        )
    );
    assert_eq!(quantity(&env, "RIDGE", "jd"), Some(15));
    assert_eq!(quantity(&env, "RIDGE", "mc"), Some(15));

    let transfers = env.sms.transfer_repo.list_by_supply_point("RIDGE").unwrap();
    assert_eq!(transfers.len(), 2);
    assert!(transfers.iter().all(|tr| tr.supplier == "central stores"));

    let reply = api.handle_incoming(RIDGE_PHONE, "received al 1", dt(17, 9)).unwrap().reply;
    assert_eq!(reply, t_with_args("sms.receipt_confirm", &[("products", "al")]));
    assert_eq!(quantity(&env, "RIDGE", "al"), Some(6));
    assert_eq!(env.sms.transfer_repo.list_by_supply_point("RIDGE").unwrap().len(), 2);
}

fn report_count(env: &TestEnv, facility: &str) -> usize {
    env.repos
        .report_repo
        .list(&ReportFilter {
            supply_point_codes: Some(vec![facility.to_string()]),
            ..Default::default()
        })
        .unwrap()
        .len()
}

#[test]
fn test_failed_batch_is_rolled_back() {
    let env = seeded_env();
    report_soh(&env.repos, "RIDGE", &[("mc", 7)], dt(14, 9)).unwrap();
    assert_eq!(report_count(&env, "RIDGE"), 1);

    // zz 不是已登记产品，写入时外键失败
    let result = report(
        &env.repos,
        "RIDGE",
        ReportType::StockOnHand,
        &[("jd", 10), ("mc", 3), ("zz", 5)],
        dt(15, 9),
    );
    assert!(result.is_err());

    assert_eq!(report_count(&env, "RIDGE"), 1);
    assert_eq!(quantity(&env, "RIDGE", "jd"), None);
    assert_eq!(quantity(&env, "RIDGE", "mc"), Some(7));
    let txs = env
        .repos
        .transaction_repo
        .list_for_supply_points(&["RIDGE".to_string()], None)
        .unwrap();
    assert_eq!(txs.len(), 1);
    let ridge = env.repos.supply_point_repo.get_by_code("RIDGE").unwrap();
    assert_eq!(ridge.last_reported, Some(dt(14, 9)));
}

#[test]
fn test_receipt_overflowing_balance_is_rejected() {
    let env = seeded_env();
    let api = &env.state.sms_api;
    api.handle_incoming(RIDGE_PHONE, "soh jd 10", dt(15, 9)).unwrap();

    let reply = api
        .handle_incoming(RIDGE_PHONE, "rec mc 4 jd 9223372036854775807", dt(16, 9))
        .unwrap()
        .reply;
    assert_eq!(reply, t_with_args("sms.error_bad_quantity", &[("code", "jd")]));

    assert_eq!(quantity(&env, "RIDGE", "jd"), Some(10));
    assert_eq!(quantity(&env, "RIDGE", "mc"), None);
    assert_eq!(report_count(&env, "RIDGE"), 1);
    assert!(env.sms.transfer_repo.list_by_supply_point("RIDGE").unwrap().is_empty());
}

#[test]
fn test_status_for_reporter_and_supervisor() {
    let env = seeded_env();
    let api = &env.state.sms_api;

    let reply = api.handle_incoming(RIDGE_PHONE, "status", dt(14, 9)).unwrap().reply;
    assert_eq!(reply, t("sms.no_reports_contact"));
    let reply = api.handle_incoming(SUPERVISOR_PHONE, "sta", dt(14, 9)).unwrap().reply;
    assert_eq!(reply, t("sms.no_reports_facility"));

    api.handle_incoming(RIDGE_PHONE, "soh jd 10", dt(15, 9)).unwrap();

    let reply = api.handle_incoming(RIDGE_PHONE, "stat", dt(16, 9)).unwrap().reply;
    assert_eq!(
        reply,
        t_with_args("sms.last_report_contact", &[("report", "soh jd 10"), ("date", "May 15")])
    );

    let reply = api.handle_incoming(SUPERVISOR_PHONE, "status", dt(16, 9)).unwrap().reply;
    assert_eq!(
        reply,
        t_with_args("sms.last_report_facility", &[("report", "soh jd 10"), ("date", "May 15")])
    );
}

#[test]
fn test_status_for_web_entry() {
    let env = seeded_env();
    report_soh(&env.repos, "RIDGE", &[("jd", 12)], dt(15, 9)).unwrap();

    let reply = env
        .state
        .sms_api
        .handle_incoming(SUPERVISOR_PHONE, "status", dt(16, 9))
        .unwrap()
        .reply;
    assert_eq!(
        reply,
        t_with_args(
            "sms.last_report_web",
            &[
                ("quantity", "12"),
                ("product", "Jadelle"),
                ("type", "Stock on Hand"),
                ("facility", "Ridge Hospital"),
                ("date", "May 15"),
            ]
        )
    );
}

#[test]
fn test_unknown_keyword_and_unregistered_sender() {
    let env = seeded_env();
    let api = &env.state.sms_api;

    let reply = api.handle_incoming(RIDGE_PHONE, "hello there", dt(15, 9)).unwrap().reply;
    assert_eq!(reply, t("sms.unknown_keyword"));

    let response = api.handle_incoming("+233111111111", "soh jd 10", dt(15, 9)).unwrap();
    assert_eq!(response.reply, t("sms.register_message"));

    // 未注册号码的短信仍记录，但不关联联系人
    let incoming = env.sms.message_repo.find_by_id(response.incoming_id).unwrap().unwrap();
    assert_eq!(incoming.contact_id, None);
    assert_eq!(incoming.phone, "+233111111111");

    let err = api.handle_incoming("  ", "soh jd 10", dt(15, 9)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_contact_without_role_or_facility() {
    let env = seeded_env();
    env.sms
        .contact_repo
        .upsert(&ContactBuilder::new("Nobody", "+233200000099").build())
        .unwrap();
    env.sms
        .contact_repo
        .upsert(&ContactBuilder::new("Roaming", "+233200000098").reporter().build())
        .unwrap();
    let api = &env.state.sms_api;

    let reply = api.handle_incoming("+233200000099", "status", dt(15, 9)).unwrap().reply;
    assert_eq!(reply, t("sms.no_role"));

    let reply = api.handle_incoming("+233200000098", "soh jd 1", dt(15, 9)).unwrap().reply;
    assert_eq!(reply, t("sms.no_facility"));
}
