// ==========================================
// 物资供应链报表系统 - 字段映射器
// ==========================================
// 职责: 标准字段 → 源列名别名 + 类型转换
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRecord;

/// 标准字段可接受的列名（均已标准化为小写下划线）
fn aliases(field: &str) -> &'static [&'static str] {
    match field {
        "code" => &["code", "site_code", "facility_code", "编码"],
        "name" => &["name", "facility_name", "location_name", "名称"],
        "type" => &["type", "location_type", "type_code", "类型"],
        "parent" => &["parent", "parent_code", "parent_location", "上级"],
        "location" => &["location", "location_code", "district", "所属位置"],
        "display_order" => &["display_order", "order", "sort_order"],
        "active" => &["active", "is_active", "enabled"],
        "sms_code" => &["sms_code", "code", "product_code", "commodity_code"],
        "program" => &["program", "product_type", "type_code", "commodity_type"],
        "program_name" => &["program_name", "product_type_name"],
        "units" => &["units", "unit", "uom"],
        "monthly_consumption" => &[
            "average_monthly_consumption",
            "monthly_consumption",
            "amc",
        ],
        "products" => &["products", "commodities", "stocked_products"],
        "phone" => &["phone", "phone_number", "msisdn", "mobile"],
        "supply_point" => &["supply_point", "facility", "facility_code", "site"],
        "role" => &["role", "role_code"],
        "responsibilities" => &["responsibilities", "permissions"],
        "needs_reminders" => &["needs_reminders", "reminders"],
        _ => &[],
    }
}

pub struct FieldMapper;

impl FieldMapper {
    /// 提取字符串字段，空值视为缺失
    pub fn get_string(&self, record: &RawRecord, field: &str) -> Option<String> {
        let candidates = aliases(field);
        let candidates: &[&str] = if candidates.is_empty() {
            std::slice::from_ref(&field)
        } else {
            candidates
        };
        candidates
            .iter()
            .filter_map(|alias| record.fields.get(*alias))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    pub fn require_string(&self, record: &RawRecord, field: &str) -> ImportResult<String> {
        self.get_string(record, field)
            .ok_or_else(|| ImportError::MissingField {
                row: record.row_number,
                field: field.to_string(),
            })
    }

    pub fn parse_f64(&self, record: &RawRecord, field: &str) -> ImportResult<Option<f64>> {
        self.get_string(record, field)
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|e| self.conversion_error(record, field, e.to_string()))
            })
            .transpose()
    }

    pub fn parse_i32(&self, record: &RawRecord, field: &str) -> ImportResult<Option<i32>> {
        self.get_string(record, field)
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i32)
                    .ok_or_else(|| self.conversion_error(record, field, format!("非整数: {}", v)))
            })
            .transpose()
    }

    /// 布尔字段: 1/true/yes/y/是 为真，0/false/no/n/否 为假，缺失取默认
    pub fn parse_bool(&self, record: &RawRecord, field: &str, default: bool) -> ImportResult<bool> {
        let Some(v) = self.get_string(record, field) else {
            return Ok(default);
        };
        match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "是" => Ok(true),
            "0" | "false" | "no" | "n" | "否" => Ok(false),
            _ => Err(self.conversion_error(record, field, format!("无法识别的布尔值: {}", v))),
        }
    }

    /// 列表字段（空白、逗号或分号分隔）
    pub fn parse_list(&self, record: &RawRecord, field: &str) -> Vec<String> {
        self.get_string(record, field)
            .map(|v| {
                v.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn conversion_error(&self, record: &RawRecord, field: &str, message: String) -> ImportError {
        ImportError::TypeConversionError {
            row: record.row_number,
            field: field.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            row_number: 7,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_aliases_and_missing() {
        let mapper = FieldMapper;
        let r = record(&[("facility_name", "Ridge"), ("phone_number", " 233 ")]);
        assert_eq!(mapper.get_string(&r, "name"), Some("Ridge".to_string()));
        assert_eq!(mapper.get_string(&r, "phone"), Some("233".to_string()));
        let err = mapper.require_string(&r, "code").unwrap_err();
        assert_eq!(err.row(), Some(7));
    }

    #[test]
    fn test_typed_fields() {
        let mapper = FieldMapper;
        let r = record(&[
            ("amc", "12.5"),
            ("order", "2"),
            ("active", "否"),
            ("products", "jd, mc;dp"),
        ]);
        assert_eq!(mapper.parse_f64(&r, "monthly_consumption").unwrap(), Some(12.5));
        assert_eq!(mapper.parse_i32(&r, "display_order").unwrap(), Some(2));
        assert!(!mapper.parse_bool(&r, "active", true).unwrap());
        assert!(mapper.parse_bool(&r, "needs_reminders", true).unwrap());
        assert_eq!(mapper.parse_list(&r, "products"), vec!["jd", "mc", "dp"]);

        let bad = record(&[("order", "1.5")]);
        assert!(matches!(
            mapper.parse_i32(&bad, "display_order"),
            Err(ImportError::TypeConversionError { .. })
        ));
    }
}
