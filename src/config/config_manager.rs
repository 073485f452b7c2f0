// ==========================================
// 物资供应链报表系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::reporting_config::{ReportingConfig, StockedBy};
use crate::config::reporting_config_trait::ReportingConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置层结果类型（可跨线程传递）
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 配置
    pub fn set_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置；缺失时返回默认值，格式错误时告警并返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置，返回写入的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    /// 加载报表参数快照
    ///
    /// 阈值不单调（emergency <= minimum <= maximum）时整体回退到默认阈值，
    /// 星期超出 0..=6 时回退到默认星期。
    pub fn load_reporting_config(&self) -> ConfigResult<ReportingConfig> {
        let d = ReportingConfig::default();

        let mut config = ReportingConfig {
            months_minimum: self.get_parsed_or_default(config_keys::MONTHS_MINIMUM, d.months_minimum)?,
            months_maximum: self.get_parsed_or_default(config_keys::MONTHS_MAXIMUM, d.months_maximum)?,
            months_emergency: self
                .get_parsed_or_default(config_keys::MONTHS_EMERGENCY, d.months_emergency)?,
            days_for_late: self.get_parsed_or_default(config_keys::DAYS_FOR_LATE, d.days_for_late)?,
            non_reporting_alert_days: self.get_parsed_or_default(
                config_keys::NON_REPORTING_ALERT_DAYS,
                d.non_reporting_alert_days,
            )?,
            reporting_view_days: self
                .get_parsed_or_default(config_keys::REPORTING_VIEW_DAYS, d.reporting_view_days)?,
            periodic_export_weeks: self
                .get_parsed_or_default(config_keys::PERIODIC_EXPORT_WEEKS, d.periodic_export_weeks)?,
            periodic_anchor_weekday: self.get_parsed_or_default(
                config_keys::PERIODIC_ANCHOR_WEEKDAY,
                d.periodic_anchor_weekday,
            )?,
            consumption_lookback_days: self.get_parsed_or_default(
                config_keys::CONSUMPTION_LOOKBACK_DAYS,
                d.consumption_lookback_days,
            )?,
            export_expiry_seconds: self
                .get_parsed_or_default(config_keys::EXPORT_EXPIRY_SECONDS, d.export_expiry_seconds)?,
            excel_export_enabled: self
                .get_parsed_or_default(config_keys::EXCEL_EXPORT_ENABLED, d.excel_export_enabled)?,
            stocked_by: d.stocked_by,
            navigation_mode: self
                .get_config_value(config_keys::NAVIGATION_MODE)?
                .unwrap_or_else(|| d.navigation_mode.clone()),
            locale: self
                .get_config_value(config_keys::LOCALE)?
                .unwrap_or_else(|| d.locale.clone()),
        };

        if let Some(raw) = self.get_config_value(config_keys::STOCKED_BY)? {
            match StockedBy::parse(&raw) {
                Some(v) => config.stocked_by = v,
                None => {
                    tracing::warn!(config_key = config_keys::STOCKED_BY, raw_value = %raw, "配置格式错误，使用默认值")
                }
            }
        }

        if !config.has_ordered_levels() {
            tracing::warn!(
                months_emergency = config.months_emergency,
                months_minimum = config.months_minimum,
                months_maximum = config.months_maximum,
                "库存阈值不单调，使用默认阈值"
            );
            config.months_emergency = d.months_emergency;
            config.months_minimum = d.months_minimum;
            config.months_maximum = d.months_maximum;
        }

        if config.periodic_anchor_weekday > 6 {
            tracing::warn!(
                weekday = config.periodic_anchor_weekday,
                "周期分界星期超出范围，使用默认值"
            );
            config.periodic_anchor_weekday = d.periodic_anchor_weekday;
        }

        Ok(config)
    }
}

// ==========================================
// ReportingConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ReportingConfigReader for ConfigManager {
    async fn read_reporting_config(&self) -> ConfigResult<ReportingConfig> {
        self.load_reporting_config()
    }

    async fn get_export_expiry_seconds(&self) -> ConfigResult<i64> {
        self.get_parsed_or_default(config_keys::EXPORT_EXPIRY_SECONDS, 36_000)
    }

    async fn is_excel_export_enabled(&self) -> ConfigResult<bool> {
        self.get_parsed_or_default(config_keys::EXCEL_EXPORT_ENABLED, true)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 库存水平（月数）
    pub const MONTHS_MINIMUM: &str = "months_minimum";
    pub const MONTHS_MAXIMUM: &str = "months_maximum";
    pub const MONTHS_EMERGENCY: &str = "months_emergency";

    // 上报窗口
    pub const DAYS_FOR_LATE: &str = "days_for_late";
    pub const NON_REPORTING_ALERT_DAYS: &str = "non_reporting_alert_days";
    pub const REPORTING_VIEW_DAYS: &str = "reporting_view_days";

    // 周期导出
    pub const PERIODIC_EXPORT_WEEKS: &str = "periodic_export_weeks";
    pub const PERIODIC_ANCHOR_WEEKDAY: &str = "periodic_anchor_weekday";

    // 月消耗估算
    pub const CONSUMPTION_LOOKBACK_DAYS: &str = "consumption_lookback_days";

    // 下载
    pub const EXPORT_EXPIRY_SECONDS: &str = "export_expiry_seconds";
    pub const EXCEL_EXPORT_ENABLED: &str = "excel_export_enabled";

    // 界面/短信
    pub const STOCKED_BY: &str = "stocked_by";
    pub const NAVIGATION_MODE: &str = "navigation_mode";
    pub const LOCALE: &str = "locale";
}
