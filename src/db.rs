// ==========================================
// 物资供应链报表系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 统一建表入口 init_schema（幂等），CLI 与测试共用
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间戳存储格式（naive UTC）
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 日期存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库并建表（测试/演示用）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 表结构:
/// - 位置树: location_type / location / supply_point
/// - 产品: product_type / product / product_stock
/// - 上报事实: product_report（不可变）/ stock_transaction（派生余额）
/// - 短信: contact / message / stock_transfer
/// - 配置: config_scope / config_kv
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    tracing::debug!(version = CURRENT_SCHEMA_VERSION, "schema 初始化完成");
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS location_type (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    display_order INTEGER
);

CREATE TABLE IF NOT EXISTS location (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    type_code TEXT NOT NULL REFERENCES location_type(code),
    parent_code TEXT REFERENCES location(code)
);
CREATE INDEX IF NOT EXISTS idx_location_parent ON location(parent_code);

CREATE TABLE IF NOT EXISTS supply_point (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    location_code TEXT NOT NULL REFERENCES location(code),
    active INTEGER NOT NULL DEFAULT 1,
    last_reported TEXT
);
CREATE INDEX IF NOT EXISTS idx_supply_point_location ON supply_point(location_code);

CREATE TABLE IF NOT EXISTS product_type (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product (
    sms_code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    type_code TEXT REFERENCES product_type(code),
    is_active INTEGER NOT NULL DEFAULT 1,
    units TEXT,
    average_monthly_consumption REAL
);

CREATE TABLE IF NOT EXISTS product_stock (
    supply_point_code TEXT NOT NULL REFERENCES supply_point(code) ON DELETE CASCADE,
    product_code TEXT NOT NULL REFERENCES product(sms_code) ON DELETE CASCADE,
    is_active INTEGER NOT NULL DEFAULT 1,
    quantity INTEGER,
    monthly_consumption REAL,
    last_modified TEXT NOT NULL,
    PRIMARY KEY (supply_point_code, product_code)
);

CREATE TABLE IF NOT EXISTS contact (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL UNIQUE,
    supply_point_code TEXT REFERENCES supply_point(code),
    role_code TEXT,
    responsibilities TEXT NOT NULL DEFAULT '[]',
    needs_reminders INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS message (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER REFERENCES contact(id),
    phone TEXT NOT NULL,
    text TEXT NOT NULL,
    direction TEXT NOT NULL,
    date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_message_date ON message(date);

CREATE TABLE IF NOT EXISTS product_report (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    supply_point_code TEXT NOT NULL REFERENCES supply_point(code),
    product_code TEXT NOT NULL REFERENCES product(sms_code),
    report_type TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    report_date TEXT NOT NULL,
    message_id INTEGER REFERENCES message(id)
);
CREATE INDEX IF NOT EXISTS idx_product_report_sp_date ON product_report(supply_point_code, report_date);

CREATE TABLE IF NOT EXISTS stock_transaction (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    supply_point_code TEXT NOT NULL REFERENCES supply_point(code),
    product_code TEXT NOT NULL REFERENCES product(sms_code),
    product_report_id INTEGER REFERENCES product_report(id),
    date TEXT NOT NULL,
    beginning_balance INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    ending_balance INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_stock_transaction_sp_product ON stock_transaction(supply_point_code, product_code, date);

CREATE TABLE IF NOT EXISTS stock_transfer (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    supply_point_code TEXT NOT NULL REFERENCES supply_point(code),
    supplier TEXT NOT NULL,
    product_code TEXT NOT NULL REFERENCES product(sms_code),
    quantity INTEGER NOT NULL,
    date TEXT NOT NULL,
    product_report_id INTEGER REFERENCES product_report(id)
);
"#;
