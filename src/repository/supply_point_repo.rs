// ==========================================
// 物资供应链报表系统 - 站点数据仓储
// ==========================================

use crate::domain::location::SupplyPoint;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{format_datetime, get_opt_datetime, SqlQueryBuilder};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const SELECT_SUPPLY_POINT: &str =
    "SELECT code, name, location_code, active, last_reported FROM supply_point";

// ==========================================
// SupplyPointRepository - 站点仓储
// ==========================================
pub struct SupplyPointRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SupplyPointRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或更新站点（不覆盖 last_reported）
    pub fn upsert(&self, supply_point: &SupplyPoint) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO supply_point (code, name, location_code, active, last_reported)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(code) DO UPDATE SET name = ?2, location_code = ?3, active = ?4
            "#,
            params![
                supply_point.code,
                supply_point.name,
                supply_point.location_code,
                supply_point.active as i32,
                supply_point.last_reported.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<SupplyPoint>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE code = ?1", SELECT_SUPPLY_POINT);
        let sp = conn
            .query_row(&sql, params![code], map_supply_point)
            .optional()?;
        Ok(sp)
    }

    pub fn get_by_code(&self, code: &str) -> RepositoryResult<SupplyPoint> {
        self.find_by_code(code)?
            .ok_or_else(|| RepositoryError::not_found("SupplyPoint", code))
    }

    /// 查询全部站点（按位置、名称排序，对应站点列表页）
    pub fn list_all(&self) -> RepositoryResult<Vec<SupplyPoint>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY location_code ASC, name ASC", SELECT_SUPPLY_POINT);
        let mut stmt = conn.prepare(&sql)?;
        let sps = stmt
            .query_map([], map_supply_point)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(sps)
    }

    /// 查询一组位置下直属的站点
    pub fn list_by_location_codes(
        &self,
        location_codes: &[String],
    ) -> RepositoryResult<Vec<SupplyPoint>> {
        let conn = self.get_conn()?;
        let q = SqlQueryBuilder::new(SELECT_SUPPLY_POINT)
            .where_in("location_code", location_codes)
            .order_by("name ASC");
        let mut stmt = conn.prepare(&q.sql())?;
        let sps = stmt
            .query_map(params_from_iter(q.params()), map_supply_point)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(sps)
    }

    /// 启用/停用站点
    pub fn set_active(&self, code: &str, active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE supply_point SET active = ?2 WHERE code = ?1",
            params![code, active as i32],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("SupplyPoint", code));
        }
        Ok(())
    }
}

/// 推进站点最近上报时间，只前进不后退
pub fn mark_reported(conn: &Connection, code: &str, at: NaiveDateTime) -> RepositoryResult<()> {
    let at = format_datetime(&at);
    conn.execute(
        r#"
        UPDATE supply_point
        SET last_reported = ?2
        WHERE code = ?1 AND (last_reported IS NULL OR last_reported < ?2)
        "#,
        params![code, at],
    )?;
    Ok(())
}

fn map_supply_point(row: &rusqlite::Row) -> SqliteResult<SupplyPoint> {
    Ok(SupplyPoint {
        code: row.get(0)?,
        name: row.get(1)?,
        location_code: row.get(2)?,
        active: row.get::<_, i32>(3)? != 0,
        last_reported: get_opt_datetime(row, 4)?,
    })
}
