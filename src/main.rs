// ==========================================
// 物资供应链报表系统 - 命令行入口
// ==========================================
// 用法: logistics-reporting <db> <command> [args...]
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;

use logistics_reporting::app::{get_default_db_path, AppState};
use logistics_reporting::engine::DateSpan;
use logistics_reporting::export::{ExportKind, ExportRequest};

const USAGE: &str = "\
用法: logistics-reporting <db|-> <command> [args...]

命令:
  init                                  建表并打印 schema 版本
  import <kind> <file>                  导入主数据（location_types/locations/supply_points/products/contacts）
  sms <phone> <text...>                 处理一条上行短信并打印回复
  breakdown <location> [days]           最近 days 天（默认取配置）的上报及时性
  stock <facility>                      站点当前库存
  export <kind> <location> <out.csv>    导出（periodic_reporting/periodic_stock/reporting/messagelog）
  alerts <location>                     仪表盘告警
  settings                              界面参数

<db> 为 - 时使用默认数据库路径";

#[tokio::main]
async fn main() -> Result<()> {
    logistics_reporting::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let db_path = match args[0].as_str() {
        "-" => get_default_db_path(),
        path => path.to_string(),
    };
    tracing::info!(
        version = logistics_reporting::VERSION,
        db = %db_path,
        "{} 启动",
        logistics_reporting::APP_NAME
    );

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let command = args[1].as_str();
    let rest = &args[2..];
    let now = Utc::now().naive_utc();

    match command {
        "init" => {
            println!("数据库已就绪: {}", state.db_path);
        }
        "import" => {
            let [kind, file] = rest else {
                bail!("用法: import <kind> <file>");
            };
            let summary = state.import_api.import_file(kind, file, now)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "sms" => {
            let Some((phone, words)) = rest.split_first() else {
                bail!("用法: sms <phone> <text...>");
            };
            let response = state
                .sms_api
                .handle_incoming(phone, &words.join(" "), now)?;
            println!("{}", response.reply);
        }
        "breakdown" => {
            let Some(location) = rest.first() else {
                bail!("用法: breakdown <location> [days]");
            };
            let days = match rest.get(1) {
                Some(d) => d.parse::<i64>().context("days 必须是整数")?,
                None => {
                    state
                        .config_manager
                        .load_reporting_config()
                        .map_err(|e| anyhow!(e))?
                        .reporting_view_days
                }
            };
            let view = state
                .reporting_api
                .reporting_breakdown(location, DateSpan::since(days, now), None)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        "stock" => {
            let Some(facility) = rest.first() else {
                bail!("用法: stock <facility>");
            };
            let view = state.reporting_api.stock_on_hand_facility(facility, now)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        "export" => {
            let [kind, location, out] = rest else {
                bail!("用法: export <kind> <location> <out.csv>");
            };
            let kind: ExportKind = kind.parse()?;
            let download_id = state
                .export_api
                .start_export(kind, ExportRequest::for_location(location))
                .await?;
            let download = state
                .export_api
                .wait_download(&download_id)
                .await?
                .ok_or_else(|| anyhow!("下载已过期: {}", download_id))?;
            std::fs::write(out, &download.data).with_context(|| format!("无法写入 {}", out))?;
            println!("已导出 {} -> {}", download.filename, out);
        }
        "alerts" => {
            let Some(location) = rest.first() else {
                bail!("用法: alerts <location>");
            };
            for alert in state.reporting_api.dashboard_alerts(location, now)? {
                println!("[{}] {}", alert.target, alert.text);
            }
        }
        "settings" => {
            let settings = state.reporting_api.ui_settings().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        other => {
            eprintln!("未知命令: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
