// ==========================================
// 物资供应链报表系统 - 上报人与短信日志仓储
// ==========================================

use crate::domain::contact::{Contact, ContactRole, Message};
use crate::domain::types::MessageDirection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{format_datetime, get_datetime, SqlQueryBuilder};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const SELECT_CONTACT: &str = r#"
    SELECT id, name, phone, supply_point_code, role_code, responsibilities, needs_reminders, is_active
    FROM contact
"#;

// ==========================================
// ContactRepository - 上报人仓储
// ==========================================
pub struct ContactRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContactRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按手机号新增或更新上报人，返回 id
    pub fn upsert(&self, contact: &Contact) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let responsibilities = contact
            .role
            .as_ref()
            .map(|r| serde_json::to_string(&r.responsibilities))
            .transpose()
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?
            .unwrap_or_else(|| "[]".to_string());

        conn.execute(
            r#"
            INSERT INTO contact (
                name, phone, supply_point_code, role_code, responsibilities, needs_reminders, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(phone) DO UPDATE SET
                name = ?1, supply_point_code = ?3, role_code = ?4, responsibilities = ?5,
                needs_reminders = ?6, is_active = ?7
            "#,
            params![
                contact.name,
                contact.phone,
                contact.supply_point_code,
                contact.role.as_ref().map(|r| r.code.clone()),
                responsibilities,
                contact.needs_reminders as i32,
                contact.is_active as i32,
            ],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM contact WHERE phone = ?1",
            params![contact.phone],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn find_by_phone(&self, phone: &str) -> RepositoryResult<Option<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE phone = ?1", SELECT_CONTACT);
        let contact = conn.query_row(&sql, params![phone], map_contact).optional()?;
        Ok(contact)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Contact>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_CONTACT);
        let contact = conn.query_row(&sql, params![id], map_contact).optional()?;
        Ok(contact)
    }

    /// 查询一组站点的启用上报人
    pub fn list_by_supply_points(
        &self,
        supply_point_codes: &[String],
    ) -> RepositoryResult<Vec<Contact>> {
        let conn = self.get_conn()?;
        let q = SqlQueryBuilder::new(SELECT_CONTACT)
            .where_in("supply_point_code", supply_point_codes)
            .where_clause("is_active = 1")
            .order_by("name ASC");
        let mut stmt = conn.prepare(&q.sql())?;
        let contacts = stmt
            .query_map(params_from_iter(q.params()), map_contact)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(contacts)
    }
}

fn map_contact(row: &rusqlite::Row) -> SqliteResult<Contact> {
    let role_code: Option<String> = row.get(4)?;
    let responsibilities_json: String = row.get(5)?;
    let responsibilities: Vec<String> =
        serde_json::from_str(&responsibilities_json).unwrap_or_default();

    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        supply_point_code: row.get(3)?,
        role: role_code.map(|code| ContactRole {
            code,
            responsibilities,
        }),
        needs_reminders: row.get::<_, i32>(6)? != 0,
        is_active: row.get::<_, i32>(7)? != 0,
    })
}

/// 短信日志过滤条件
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub contact_id: Option<i64>,
    /// 上报人所属站点范围
    pub supply_point_codes: Option<Vec<String>>,
    pub since: Option<NaiveDateTime>,
    pub before: Option<NaiveDateTime>,
}

// ==========================================
// MessageRepository - 短信日志仓储
// ==========================================
pub struct MessageRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MessageRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 记录短信，返回 id
    pub fn insert(
        &self,
        contact_id: Option<i64>,
        phone: &str,
        text: &str,
        direction: MessageDirection,
        date: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO message (contact_id, phone, text, direction, date)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![contact_id, phone, text, direction.to_db_str(), format_datetime(&date)],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Message>> {
        let conn = self.get_conn()?;
        let message = conn
            .query_row(
                "SELECT id, contact_id, phone, text, direction, date FROM message WHERE id = ?1",
                params![id],
                map_message,
            )
            .optional()?;
        Ok(message)
    }

    /// 按条件查询短信（最新在前）
    pub fn list(&self, filter: &MessageFilter) -> RepositoryResult<Vec<Message>> {
        let conn = self.get_conn()?;
        let contact_id = filter.contact_id.map(|id| id.to_string());
        let mut q = SqlQueryBuilder::new(
            "SELECT id, contact_id, phone, text, direction, date FROM message",
        )
        .and_if("contact_id = CAST(? AS INTEGER)", contact_id.as_deref());
        if let Some(codes) = &filter.supply_point_codes {
            q = q.where_in_subquery(
                "contact_id IN (SELECT id FROM contact WHERE {in})",
                "supply_point_code",
                codes,
            );
        }
        let q = q
            .and_if_since("date", filter.since)
            .and_if_before("date", filter.before)
            .order_by("date DESC, id DESC");

        let mut stmt = conn.prepare(&q.sql())?;
        let messages = stmt
            .query_map(params_from_iter(q.params()), map_message)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(messages)
    }
}

fn map_message(row: &rusqlite::Row) -> SqliteResult<Message> {
    Ok(Message {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        phone: row.get(2)?,
        text: row.get(3)?,
        direction: MessageDirection::from_db_str(&row.get::<_, String>(4)?),
        date: get_datetime(row, 5)?,
    })
}
