// ==========================================
// 物资供应链报表系统 - 短信关键字处理器
// ==========================================
// soh|stock                库存上报
// rec|receipts|received    收货上报（可带 "from <供应商>"）
// sta|stat|status          查询最近一次上报
// ==========================================

use crate::domain::contact::Contact;
use crate::domain::report::StockTransfer;
use crate::domain::types::ReportType;
use crate::i18n::{t, t_with_args};
use crate::sms::error::{SmsError, SmsResult};
use crate::sms::helper::ProductReportsHelper;
use crate::sms::SmsContext;
use chrono::NaiveDateTime;

/// 状态回复中的日期格式（如 "May 03"）
const SHORT_DATE_FORMAT: &str = "%b %d";

/// 一条已记录的来信
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub phone: String,
    pub contact: Option<Contact>,
    pub received_at: NaiveDateTime,
}

pub trait KeywordHandler: Send + Sync {
    fn keywords(&self) -> &'static [&'static str];

    fn help(&self) -> String;

    /// 关键字后无内容时是否直接回复帮助
    fn help_on_empty(&self) -> bool {
        true
    }

    fn handle(&self, ctx: &SmsContext, msg: &IncomingMessage, text: &str) -> SmsResult<String>;
}

/// 已注册且绑定站点的联系人
fn reporter(msg: &IncomingMessage) -> SmsResult<(&Contact, &str)> {
    let contact = msg.contact.as_ref().ok_or(SmsError::NotRegistered)?;
    let supply_point = contact
        .supply_point_code
        .as_deref()
        .ok_or(SmsError::NoFacility)?;
    Ok((contact, supply_point))
}

fn known_product(ctx: &SmsContext) -> impl Fn(&str) -> bool + '_ {
    move |code| matches!(ctx.repos.product_repo.find_by_code(code), Ok(Some(_)))
}

// ==========================================
// 库存上报
// ==========================================
pub struct StockOnHandHandler;

impl KeywordHandler for StockOnHandHandler {
    fn keywords(&self) -> &'static [&'static str] {
        &["soh", "stock"]
    }

    fn help(&self) -> String {
        t("sms.soh_help")
    }

    fn handle(&self, ctx: &SmsContext, msg: &IncomingMessage, text: &str) -> SmsResult<String> {
        let (contact, supply_point) = reporter(msg)?;

        let mut helper =
            ProductReportsHelper::new(supply_point, ReportType::StockOnHand, Some(msg.message_id));
        helper.parse(text, known_product(ctx))?;
        helper.save(&ctx.repos, msg.received_at)?;

        let mut stockouts: Vec<String> = ctx
            .repos
            .product_stock_repo
            .list_by_supply_point(supply_point)?
            .into_iter()
            .filter(|s| s.is_active && s.quantity == Some(0))
            .map(|s| s.product_code)
            .collect();
        stockouts.sort();

        let mut reply = t_with_args("sms.soh_confirm", &[("name", contact.name.as_str())]);
        if !stockouts.is_empty() {
            reply.push(' ');
            reply.push_str(&t_with_args(
                "sms.soh_stockouts",
                &[("products", stockouts.join(" ").as_str())],
            ));
        }
        Ok(reply)
    }
}

// ==========================================
// 收货上报
// ==========================================
pub struct ReceiptHandler;

/// 拆出结尾的 "from <supplier>"
fn split_supplier(text: &str) -> (String, Option<String>) {
    let words: Vec<String> = text.split_whitespace().map(|w| w.to_lowercase()).collect();
    match words.iter().position(|w| w == "from") {
        Some(i) => {
            let supplier = words[i + 1..].join(" ");
            (
                words[..i].join(" "),
                (!supplier.is_empty()).then_some(supplier),
            )
        }
        None => (words.join(" "), None),
    }
}

impl KeywordHandler for ReceiptHandler {
    fn keywords(&self) -> &'static [&'static str] {
        &["rec", "receipts", "received"]
    }

    fn help(&self) -> String {
        t("sms.receipt_help")
    }

    fn handle(&self, ctx: &SmsContext, msg: &IncomingMessage, text: &str) -> SmsResult<String> {
        let (_, supply_point) = reporter(msg)?;
        let (body, supplier) = split_supplier(text);

        let mut helper =
            ProductReportsHelper::new(supply_point, ReportType::Receipt, Some(msg.message_id));
        helper.parse(&body, known_product(ctx))?;
        let saved = helper.save(&ctx.repos, msg.received_at)?;
        let products = helper.reported_products().join(" ");

        let Some(supplier) = supplier else {
            return Ok(t_with_args("sms.receipt_confirm", &[("products", products.as_str())]));
        };

        for report in saved.iter().filter(|r| r.report_type == ReportType::Receipt) {
            ctx.transfer_repo.insert(&StockTransfer {
                id: 0,
                supply_point_code: supply_point.to_string(),
                supplier: supplier.clone(),
                product_code: report.product_code.clone(),
                quantity: report.quantity,
                date: report.report_date,
                product_report_id: Some(report.id),
            })?;
        }
        tracing::info!(supply_point, supplier = %supplier, "已记录供应商调拨");
        Ok(t_with_args(
            "sms.receipt_from_confirm",
            &[("products", products.as_str()), ("supplier", supplier.as_str())],
        ))
    }
}

// ==========================================
// 上报状态查询
// ==========================================
pub struct StatusHandler;

impl KeywordHandler for StatusHandler {
    fn keywords(&self) -> &'static [&'static str] {
        &["sta", "stat", "status"]
    }

    fn help(&self) -> String {
        t("sms.status_help")
    }

    fn help_on_empty(&self) -> bool {
        false
    }

    fn handle(&self, ctx: &SmsContext, msg: &IncomingMessage, _text: &str) -> SmsResult<String> {
        let contact = msg.contact.as_ref().ok_or(SmsError::NotRegistered)?;
        let role = contact.role.as_ref().ok_or(SmsError::NoRole)?;

        let supervisor = role.has_responsibility(crate::domain::REPORTEE_RESPONSIBILITY);
        let last_report = if supervisor {
            let supply_point = contact
                .supply_point_code
                .as_deref()
                .ok_or(SmsError::NoFacility)?;
            match ctx.repos.report_repo.find_latest_for_supply_point(supply_point)? {
                Some(r) => r,
                None => return Ok(t("sms.no_reports_facility")),
            }
        } else {
            match ctx.repos.report_repo.find_latest_for_contact(contact.id)? {
                Some(r) => r,
                None => return Ok(t("sms.no_reports_contact")),
            }
        };

        let date = last_report.report_date.format(SHORT_DATE_FORMAT).to_string();
        let message = match last_report.message_id {
            Some(id) => ctx.message_repo.find_by_id(id)?,
            None => None,
        };

        let Some(message) = message else {
            let product = ctx
                .repos
                .product_repo
                .find_by_code(&last_report.product_code)?
                .map(|p| p.name)
                .unwrap_or_else(|| last_report.product_code.clone());
            let facility = ctx
                .repos
                .supply_point_repo
                .find_by_code(&last_report.supply_point_code)?
                .map(|sp| sp.name)
                .unwrap_or_else(|| last_report.supply_point_code.clone());
            return Ok(t_with_args(
                "sms.last_report_web",
                &[
                    ("quantity", last_report.quantity.to_string().as_str()),
                    ("product", product.as_str()),
                    ("type", last_report.report_type.display_name()),
                    ("facility", facility.as_str()),
                    ("date", date.as_str()),
                ],
            ));
        };

        let key = if supervisor {
            "sms.last_report_facility"
        } else {
            "sms.last_report_contact"
        };
        Ok(t_with_args(key, &[("report", message.text.as_str()), ("date", date.as_str())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_supplier() {
        assert_eq!(
            split_supplier("jd 10 From Central Stores"),
            ("jd 10".to_string(), Some("central stores".to_string()))
        );
        assert_eq!(split_supplier("jd 10 mc 4"), ("jd 10 mc 4".to_string(), None));
        assert_eq!(split_supplier("jd 10 from"), ("jd 10".to_string(), None));
    }

    #[test]
    fn test_status_help_describes_keyword() {
        let help = StatusHandler.help();
        assert_eq!(help, t("sms.status_help"));
        assert_ne!(help, t("sms.no_reports_contact"));
        assert!(help.contains("status"));
        assert!(!StatusHandler.help_on_empty());
    }
}
