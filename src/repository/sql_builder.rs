// ==========================================
// 物资供应链报表系统 - SQL 构建与行解析工具
// ==========================================
// 职责: 动态 WHERE 条件 + 参数绑定；时间字段的统一读写格式
// 约束: 只拼接占位符，值一律走参数绑定
// ==========================================

use crate::db::DATETIME_FORMAT;
use chrono::NaiveDateTime;
use rusqlite::types::{Type, Value};

/// 构建 IN 子句
///
/// ```
/// use logistics_reporting::repository::sql_builder::build_in_clause;
///
/// let clause = build_in_clause("code", &["a", "b"]);
/// assert_eq!(clause, "code IN (?, ?)");
///
/// // 空列表返回 FALSE 条件
/// let empty: Vec<String> = vec![];
/// assert_eq!(build_in_clause("code", &empty), "1 = 0");
/// ```
pub fn build_in_clause<T: AsRef<str>>(column_name: &str, values: &[T]) -> String {
    if values.is_empty() {
        // 空列表时返回永假条件，确保 SQL 语法正确
        return "1 = 0".to_string();
    }

    let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

/// SQL 查询构建器（流式 API，条件与参数同步累积）
///
/// ```
/// use logistics_reporting::repository::sql_builder::SqlQueryBuilder;
///
/// let q = SqlQueryBuilder::new("SELECT * FROM product_report")
///     .where_in("supply_point_code", &["SP1".to_string(), "SP2".to_string()])
///     .and_if_eq("product_code", Some("jd"))
///     .order_by("report_date ASC");
///
/// assert_eq!(
///     q.sql(),
///     "SELECT * FROM product_report WHERE supply_point_code IN (?, ?) AND product_code = ? ORDER BY report_date ASC"
/// );
/// assert_eq!(q.params().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    select_clause: String,
    where_clauses: Vec<String>,
    params: Vec<Value>,
    order_by_clause: Option<String>,
    limit_clause: Option<usize>,
}

impl SqlQueryBuilder {
    /// 创建新的 SQL 查询构建器
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_clause: None,
            limit_clause: None,
        }
    }

    /// 添加固定条件（不含参数）
    pub fn where_clause(mut self, condition: &str) -> Self {
        self.where_clauses.push(condition.to_string());
        self
    }

    /// 添加 `column IN (...)` 条件
    pub fn where_in(mut self, column: &str, values: &[String]) -> Self {
        self.where_clauses.push(build_in_clause(column, values));
        self.params
            .extend(values.iter().map(|v| Value::Text(v.clone())));
        self
    }

    /// 在子查询模板中嵌入 IN 条件（模板中 `{in}` 替换为 `column IN (...)`）
    pub fn where_in_subquery(mut self, template: &str, column: &str, values: &[String]) -> Self {
        self.where_clauses
            .push(template.replace("{in}", &build_in_clause(column, values)));
        self.params
            .extend(values.iter().map(|v| Value::Text(v.clone())));
        self
    }

    /// 条件添加 `column = ?`
    pub fn and_if_eq(mut self, column: &str, value: Option<&str>) -> Self {
        if let Some(v) = value {
            self.where_clauses.push(format!("{} = ?", column));
            self.params.push(Value::Text(v.to_string()));
        }
        self
    }

    /// 条件添加任意单参数条件（condition 中含一个 `?`）
    pub fn and_if(mut self, condition: &str, value: Option<&str>) -> Self {
        if let Some(v) = value {
            self.where_clauses.push(condition.to_string());
            self.params.push(Value::Text(v.to_string()));
        }
        self
    }

    /// 条件添加 `column >= ?`（时间下界，包含）
    pub fn and_if_since(mut self, column: &str, start: Option<NaiveDateTime>) -> Self {
        if let Some(s) = start {
            self.where_clauses.push(format!("{} >= ?", column));
            self.params.push(Value::Text(format_datetime(&s)));
        }
        self
    }

    /// 条件添加 `column < ?`（时间上界，不包含）
    pub fn and_if_before(mut self, column: &str, end: Option<NaiveDateTime>) -> Self {
        if let Some(e) = end {
            self.where_clauses.push(format!("{} < ?", column));
            self.params.push(Value::Text(format_datetime(&e)));
        }
        self
    }

    /// 添加 ORDER BY 子句
    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by_clause = Some(order.to_string());
        self
    }

    /// 添加 LIMIT 子句
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_clause = Some(n);
        self
    }

    /// 构建最终的 SQL 语句
    pub fn sql(&self) -> String {
        let mut sql = self.select_clause.clone();

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(order) = &self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        if let Some(limit) = self.limit_clause {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    /// 绑定参数（与 sql() 中占位符顺序一致）
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

// ==========================================
// 时间字段读写
// ==========================================

/// 统一写入格式
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// 解析时间列（兼容 'T' 分隔与小数秒）
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// 在 row mapper 中读取必填时间列
pub fn get_datetime(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("无法解析时间: {}", raw).into(),
        )
    })
}

/// 在 row mapper 中读取可空时间列（无法解析时视为空）
pub fn get_opt_datetime(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().and_then(parse_datetime))
}
