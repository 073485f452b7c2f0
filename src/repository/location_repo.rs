// ==========================================
// 物资供应链报表系统 - 位置数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑（树遍历在 engine::location_tree）
// ==========================================

use crate::domain::location::{Location, LocationType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

// ==========================================
// LocationRepository - 位置/位置类型仓储
// ==========================================
pub struct LocationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LocationRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 位置类型 =====

    /// 新增或更新位置类型
    pub fn upsert_type(&self, location_type: &LocationType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO location_type (code, name, display_order) VALUES (?1, ?2, ?3)
            ON CONFLICT(code) DO UPDATE SET name = ?2, display_order = ?3
            "#,
            params![location_type.code, location_type.name, location_type.display_order],
        )?;
        Ok(())
    }

    /// 查询全部位置类型（按 display_order，空值排最后）
    pub fn list_types(&self) -> RepositoryResult<Vec<LocationType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT code, name, display_order
            FROM location_type
            ORDER BY display_order IS NULL, display_order ASC, code ASC
            "#,
        )?;
        let types = stmt
            .query_map([], |row| {
                Ok(LocationType {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    display_order: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(types)
    }

    // ===== 位置 =====

    /// 新增或更新位置
    pub fn upsert(&self, location: &Location) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO location (code, name, type_code, parent_code) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(code) DO UPDATE SET name = ?2, type_code = ?3, parent_code = ?4
            "#,
            params![
                location.code,
                location.name,
                location.type_code,
                location.parent_code
            ],
        )?;
        Ok(())
    }

    /// 按代码查询
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Location>> {
        let conn = self.get_conn()?;
        let location = conn
            .query_row(
                "SELECT code, name, type_code, parent_code FROM location WHERE code = ?1",
                params![code],
                map_location,
            )
            .optional()?;
        Ok(location)
    }

    /// 按代码查询（不存在时报 NotFound）
    pub fn get_by_code(&self, code: &str) -> RepositoryResult<Location> {
        self.find_by_code(code)?
            .ok_or_else(|| RepositoryError::not_found("Location", code))
    }

    /// 查询全部位置
    pub fn list_all(&self) -> RepositoryResult<Vec<Location>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT code, name, type_code, parent_code FROM location ORDER BY code ASC",
        )?;
        let locations = stmt
            .query_map([], map_location)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(locations)
    }

    /// 查询直接子位置
    pub fn list_children(&self, parent_code: &str) -> RepositoryResult<Vec<Location>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT code, name, type_code, parent_code
            FROM location
            WHERE parent_code = ?1
            ORDER BY name ASC
            "#,
        )?;
        let locations = stmt
            .query_map(params![parent_code], map_location)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(locations)
    }
}

fn map_location(row: &rusqlite::Row) -> SqliteResult<Location> {
    Ok(Location {
        code: row.get(0)?,
        name: row.get(1)?,
        type_code: row.get(2)?,
        parent_code: row.get(3)?,
    })
}
