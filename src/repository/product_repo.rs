// ==========================================
// 物资供应链报表系统 - 产品与站点库存仓储
// ==========================================

use crate::domain::product::{normalize_sms_code, Product, ProductStock, ProductType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{format_datetime, get_datetime, SqlQueryBuilder};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

const SELECT_PRODUCT: &str = r#"
    SELECT sms_code, name, type_code, is_active, units, average_monthly_consumption
    FROM product
"#;

const SELECT_PRODUCT_STOCK: &str = r#"
    SELECT supply_point_code, product_code, is_active, quantity, monthly_consumption, last_modified
    FROM product_stock
"#;

// ==========================================
// ProductRepository - 产品/产品类别仓储
// ==========================================
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 产品类别 =====

    pub fn upsert_type(&self, product_type: &ProductType) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_type (code, name) VALUES (?1, ?2)
            ON CONFLICT(code) DO UPDATE SET name = ?2
            "#,
            params![product_type.code, product_type.name],
        )?;
        Ok(())
    }

    pub fn find_type(&self, code: &str) -> RepositoryResult<Option<ProductType>> {
        let conn = self.get_conn()?;
        let t = conn
            .query_row(
                "SELECT code, name FROM product_type WHERE code = ?1",
                params![code],
                |row| {
                    Ok(ProductType {
                        code: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(t)
    }

    pub fn list_types(&self) -> RepositoryResult<Vec<ProductType>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT code, name FROM product_type ORDER BY name ASC")?;
        let types = stmt
            .query_map([], |row| {
                Ok(ProductType {
                    code: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(types)
    }

    // ===== 产品 =====

    /// 新增或更新产品
    pub fn upsert(&self, product: &Product) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product (sms_code, name, type_code, is_active, units, average_monthly_consumption)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(sms_code) DO UPDATE SET
                name = ?2, type_code = ?3, is_active = ?4, units = ?5, average_monthly_consumption = ?6
            "#,
            params![
                normalize_sms_code(&product.sms_code),
                product.name,
                product.type_code,
                product.is_active as i32,
                product.units,
                product.average_monthly_consumption,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_code(&self, sms_code: &str) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE sms_code = ?1", SELECT_PRODUCT);
        let product = conn
            .query_row(&sql, params![normalize_sms_code(sms_code)], map_product)
            .optional()?;
        Ok(product)
    }

    /// 查询全部产品（按名称，对应产品列表页）
    pub fn list_all(&self) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY name ASC", SELECT_PRODUCT);
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map([], map_product)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(products)
    }

    /// 查询启用产品，可按类别过滤
    pub fn list_active(&self, type_code: Option<&str>) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        let q = SqlQueryBuilder::new(SELECT_PRODUCT)
            .where_clause("is_active = 1")
            .and_if_eq("type_code", type_code)
            .order_by("name ASC");
        let mut stmt = conn.prepare(&q.sql())?;
        let products = stmt
            .query_map(params_from_iter(q.params()), map_product)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(products)
    }

    /// 启用/停用产品
    pub fn set_active(&self, sms_code: &str, active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE product SET is_active = ?2 WHERE sms_code = ?1",
            params![normalize_sms_code(sms_code), active as i32],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Product", sms_code));
        }
        Ok(())
    }
}

fn map_product(row: &rusqlite::Row) -> SqliteResult<Product> {
    Ok(Product {
        sms_code: row.get(0)?,
        name: row.get(1)?,
        type_code: row.get(2)?,
        is_active: row.get::<_, i32>(3)? != 0,
        units: row.get(4)?,
        average_monthly_consumption: row.get(5)?,
    })
}

// ==========================================
// ProductStockRepository - 站点产品库存仓储
// ==========================================
pub struct ProductStockRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductStockRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或更新站点库存行
    pub fn upsert(&self, stock: &ProductStock) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_stock (
                supply_point_code, product_code, is_active, quantity, monthly_consumption, last_modified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(supply_point_code, product_code) DO UPDATE SET
                is_active = ?3, quantity = ?4, monthly_consumption = ?5, last_modified = ?6
            "#,
            params![
                stock.supply_point_code,
                stock.product_code,
                stock.is_active as i32,
                stock.quantity,
                stock.monthly_consumption,
                format_datetime(&stock.last_modified),
            ],
        )?;
        Ok(())
    }

    pub fn find(
        &self,
        supply_point_code: &str,
        product_code: &str,
    ) -> RepositoryResult<Option<ProductStock>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE supply_point_code = ?1 AND product_code = ?2",
            SELECT_PRODUCT_STOCK
        );
        let stock = conn
            .query_row(&sql, params![supply_point_code, product_code], map_product_stock)
            .optional()?;
        Ok(stock)
    }

    /// 查询站点的全部库存行（按产品排序）
    pub fn list_by_supply_point(
        &self,
        supply_point_code: &str,
    ) -> RepositoryResult<Vec<ProductStock>> {
        self.list_by_supply_points(&[supply_point_code.to_string()])
    }

    /// 查询一组站点的库存行
    pub fn list_by_supply_points(
        &self,
        supply_point_codes: &[String],
    ) -> RepositoryResult<Vec<ProductStock>> {
        let conn = self.get_conn()?;
        let q = SqlQueryBuilder::new(SELECT_PRODUCT_STOCK)
            .where_in("supply_point_code", supply_point_codes)
            .order_by("supply_point_code ASC, product_code ASC");
        let mut stmt = conn.prepare(&q.sql())?;
        let stocks = stmt
            .query_map(params_from_iter(q.params()), map_product_stock)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(stocks)
    }

    /// 站点启用/停用某产品（不存在时创建）
    pub fn set_active(
        &self,
        supply_point_code: &str,
        product_code: &str,
        active: bool,
        at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO product_stock (supply_point_code, product_code, is_active, last_modified)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(supply_point_code, product_code) DO UPDATE SET
                is_active = ?3, last_modified = ?4
            "#,
            params![supply_point_code, product_code, active as i32, format_datetime(&at)],
        )?;
        Ok(())
    }
}

/// 写入站点产品的最新库存（可在事务内调用）
pub fn set_stock_quantity(
    conn: &Connection,
    supply_point_code: &str,
    product_code: &str,
    quantity: i64,
    at: NaiveDateTime,
) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO product_stock (supply_point_code, product_code, is_active, quantity, last_modified)
        VALUES (?1, ?2, 1, ?3, ?4)
        ON CONFLICT(supply_point_code, product_code) DO UPDATE SET
            quantity = ?3, last_modified = ?4
        "#,
        params![supply_point_code, product_code, quantity, format_datetime(&at)],
    )?;
    Ok(())
}

fn map_product_stock(row: &rusqlite::Row) -> SqliteResult<ProductStock> {
    Ok(ProductStock {
        supply_point_code: row.get(0)?,
        product_code: row.get(1)?,
        is_active: row.get::<_, i32>(2)? != 0,
        quantity: row.get(3)?,
        monthly_consumption: row.get(4)?,
        last_modified: get_datetime(row, 5)?,
    })
}
