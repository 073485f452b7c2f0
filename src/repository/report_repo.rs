// ==========================================
// 物资供应链报表系统 - 上报/流水/调拨仓储
// ==========================================
// product_report 只增不改（不可变事实）
// stock_transaction 由上报派生，写入顺序与上报一致
// ==========================================

use crate::domain::report::{NewProductReport, ProductReport, StockTransaction, StockTransfer};
use crate::domain::types::ReportType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{format_datetime, get_datetime, SqlQueryBuilder};
use chrono::NaiveDateTime;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Transaction,
};
use std::sync::{Arc, Mutex};

const SELECT_REPORT: &str = r#"
    SELECT r.id, r.supply_point_code, r.product_code, r.report_type, r.quantity, r.report_date, r.message_id
    FROM product_report r
"#;

/// 上报查询过滤条件（各条件之间为 AND）
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// 站点范围（None 表示不限）
    pub supply_point_codes: Option<Vec<String>>,
    pub report_types: Vec<ReportType>,
    /// 时间下界（包含）
    pub since: Option<NaiveDateTime>,
    /// 时间上界（不包含）
    pub before: Option<NaiveDateTime>,
    pub product_code: Option<String>,
    pub product_type_code: Option<String>,
}

// ==========================================
// ProductReportRepository - 产品上报仓储
// ==========================================
pub struct ProductReportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductReportRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在单个事务内执行一组写入，闭包出错时整体回滚
    ///
    /// 闭包持有连接锁，内部只能使用接收 `&Connection` 的写入函数
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction().map_err(RepositoryError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok(out)
    }

    /// 站点最近一次上报（任意类型）
    pub fn find_latest_for_supply_point(
        &self,
        supply_point_code: &str,
    ) -> RepositoryResult<Option<ProductReport>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE r.supply_point_code = ?1 ORDER BY r.report_date DESC, r.id DESC LIMIT 1",
            SELECT_REPORT
        );
        let report = conn
            .query_row(&sql, params![supply_point_code], map_report)
            .optional()?;
        Ok(report)
    }

    /// 联系人最近一次通过短信提交的上报
    pub fn find_latest_for_contact(&self, contact_id: i64) -> RepositoryResult<Option<ProductReport>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            JOIN message m ON m.id = r.message_id
            WHERE m.contact_id = ?1
            ORDER BY r.report_date DESC, r.id DESC
            LIMIT 1"#,
            SELECT_REPORT
        );
        let report = conn
            .query_row(&sql, params![contact_id], map_report)
            .optional()?;
        Ok(report)
    }

    /// 按过滤条件查询上报（按时间升序）
    pub fn list(&self, filter: &ReportFilter) -> RepositoryResult<Vec<ProductReport>> {
        Ok(self
            .list_with_message_text(filter)?
            .into_iter()
            .map(|(report, _)| report)
            .collect())
    }

    /// 按过滤条件查询上报，并带出来源短信文本（导出用）
    pub fn list_with_message_text(
        &self,
        filter: &ReportFilter,
    ) -> RepositoryResult<Vec<(ProductReport, Option<String>)>> {
        let conn = self.get_conn()?;

        let select = r#"
            SELECT r.id, r.supply_point_code, r.product_code, r.report_type, r.quantity,
                   r.report_date, r.message_id, m.text
            FROM product_report r
            LEFT JOIN message m ON m.id = r.message_id
        "#;

        let mut q = SqlQueryBuilder::new(select);
        if let Some(codes) = &filter.supply_point_codes {
            q = q.where_in("r.supply_point_code", codes);
        }
        if !filter.report_types.is_empty() {
            let types: Vec<String> = filter
                .report_types
                .iter()
                .map(|t| t.to_db_str().to_string())
                .collect();
            q = q.where_in("r.report_type", &types);
        }
        let q = q
            .and_if_since("r.report_date", filter.since)
            .and_if_before("r.report_date", filter.before)
            .and_if_eq("r.product_code", filter.product_code.as_deref())
            .and_if(
                "r.product_code IN (SELECT sms_code FROM product WHERE type_code = ?)",
                filter.product_type_code.as_deref(),
            )
            .order_by("r.report_date ASC, r.id ASC");

        let mut stmt = conn.prepare(&q.sql())?;
        let rows = stmt
            .query_map(params_from_iter(q.params()), |row| {
                Ok((map_report(row)?, row.get::<_, Option<String>>(7)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

/// 写入上报（可在事务内调用）
pub fn insert_report(conn: &Connection, report: &NewProductReport) -> RepositoryResult<ProductReport> {
    conn.execute(
        r#"
        INSERT INTO product_report (
            supply_point_code, product_code, report_type, quantity, report_date, message_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            report.supply_point_code,
            report.product_code,
            report.report_type.to_db_str(),
            report.quantity,
            format_datetime(&report.report_date),
            report.message_id,
        ],
    )?;

    Ok(ProductReport {
        id: conn.last_insert_rowid(),
        supply_point_code: report.supply_point_code.clone(),
        product_code: report.product_code.clone(),
        report_type: report.report_type,
        quantity: report.quantity,
        report_date: report.report_date,
        message_id: report.message_id,
    })
}

fn map_report(row: &rusqlite::Row) -> SqliteResult<ProductReport> {
    let raw_type: String = row.get(3)?;
    let report_type = ReportType::from_db_str(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("未知上报类型: {}", raw_type).into(),
        )
    })?;
    Ok(ProductReport {
        id: row.get(0)?,
        supply_point_code: row.get(1)?,
        product_code: row.get(2)?,
        report_type,
        quantity: row.get(4)?,
        report_date: get_datetime(row, 5)?,
        message_id: row.get(6)?,
    })
}

// ==========================================
// StockTransactionRepository - 库存流水仓储
// ==========================================
pub struct StockTransactionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockTransactionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询一组站点的全部流水（按时间升序）
    pub fn list_for_supply_points(
        &self,
        supply_point_codes: &[String],
        before: Option<NaiveDateTime>,
    ) -> RepositoryResult<Vec<StockTransaction>> {
        let conn = self.get_conn()?;
        let q = SqlQueryBuilder::new(
            r#"
            SELECT id, supply_point_code, product_code, product_report_id, date,
                   beginning_balance, quantity, ending_balance
            FROM stock_transaction
            "#,
        )
        .where_in("supply_point_code", supply_point_codes)
        .and_if_before("date", before)
        .order_by("date ASC, id ASC");

        let mut stmt = conn.prepare(&q.sql())?;
        let txs = stmt
            .query_map(params_from_iter(q.params()), |row| {
                Ok(StockTransaction {
                    id: row.get(0)?,
                    supply_point_code: row.get(1)?,
                    product_code: row.get(2)?,
                    product_report_id: row.get(3)?,
                    date: get_datetime(row, 4)?,
                    beginning_balance: row.get(5)?,
                    quantity: row.get(6)?,
                    ending_balance: row.get(7)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(txs)
    }
}

pub fn insert_stock_transaction(conn: &Connection, tx: &StockTransaction) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO stock_transaction (
            supply_point_code, product_code, product_report_id, date,
            beginning_balance, quantity, ending_balance
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            tx.supply_point_code,
            tx.product_code,
            tx.product_report_id,
            format_datetime(&tx.date),
            tx.beginning_balance,
            tx.quantity,
            tx.ending_balance,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn latest_balance_at(
    conn: &Connection,
    supply_point_code: &str,
    product_code: &str,
    at: NaiveDateTime,
) -> RepositoryResult<Option<i64>> {
    let balance = conn
        .query_row(
            r#"
            SELECT ending_balance FROM stock_transaction
            WHERE supply_point_code = ?1 AND product_code = ?2 AND date <= ?3
            ORDER BY date DESC, id DESC
            LIMIT 1
            "#,
            params![supply_point_code, product_code, format_datetime(&at)],
            |row| row.get(0),
        )
        .optional()?;
    Ok(balance)
}

// ==========================================
// StockTransferRepository - 供应商调拨仓储
// ==========================================
pub struct StockTransferRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StockTransferRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, transfer: &StockTransfer) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO stock_transfer (
                supply_point_code, supplier, product_code, quantity, date, product_report_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                transfer.supply_point_code,
                transfer.supplier,
                transfer.product_code,
                transfer.quantity,
                format_datetime(&transfer.date),
                transfer.product_report_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_by_supply_point(
        &self,
        supply_point_code: &str,
    ) -> RepositoryResult<Vec<StockTransfer>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, supply_point_code, supplier, product_code, quantity, date, product_report_id
            FROM stock_transfer
            WHERE supply_point_code = ?1
            ORDER BY date ASC, id ASC
            "#,
        )?;
        let transfers = stmt
            .query_map(params![supply_point_code], |row| {
                Ok(StockTransfer {
                    id: row.get(0)?,
                    supply_point_code: row.get(1)?,
                    supplier: row.get(2)?,
                    product_code: row.get(3)?,
                    quantity: row.get(4)?,
                    date: get_datetime(row, 5)?,
                    product_report_id: row.get(6)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(transfers)
    }
}
