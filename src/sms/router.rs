// ==========================================
// 物资供应链报表系统 - 短信路由
// ==========================================
// 按首个单词分派关键字处理器；来信与回复都写入短信日志
// ==========================================

use crate::domain::types::MessageDirection;
use crate::i18n::t;
use crate::sms::error::{SmsError, SmsResult};
use crate::sms::handlers::{
    IncomingMessage, KeywordHandler, ReceiptHandler, StatusHandler, StockOnHandHandler,
};
use crate::sms::SmsContext;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 一次短信往来的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsResponse {
    pub incoming_id: i64,
    pub outgoing_id: i64,
    pub reply: String,
}

pub struct SmsRouter {
    ctx: SmsContext,
    handlers: Vec<Box<dyn KeywordHandler>>,
}

impl SmsRouter {
    /// 注册默认关键字处理器
    pub fn new(ctx: SmsContext) -> Self {
        Self {
            ctx,
            handlers: vec![
                Box::new(StockOnHandHandler),
                Box::new(ReceiptHandler),
                Box::new(StatusHandler),
            ],
        }
    }

    pub fn with_handler(mut self, handler: Box<dyn KeywordHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    fn find_handler(&self, keyword: &str) -> Option<&dyn KeywordHandler> {
        self.handlers
            .iter()
            .find(|h| h.keywords().contains(&keyword))
            .map(|h| h.as_ref())
    }

    /// 处理一条来信并返回回复
    #[instrument(skip(self, text))]
    pub fn handle(&self, phone: &str, text: &str, received_at: NaiveDateTime) -> SmsResult<SmsResponse> {
        let contact = self.ctx.contact_repo.find_by_phone(phone)?;
        let contact_id = contact.as_ref().map(|c| c.id);
        let incoming_id = self.ctx.message_repo.insert(
            contact_id,
            phone,
            text,
            MessageDirection::Incoming,
            received_at,
        )?;

        let msg = IncomingMessage {
            message_id: incoming_id,
            phone: phone.to_string(),
            contact,
            received_at,
        };

        let trimmed = text.trim();
        let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((k, r)) => (k.to_lowercase(), r.trim()),
            None => (trimmed.to_lowercase(), ""),
        };

        let reply = match self.find_handler(&keyword) {
            None => {
                tracing::info!(keyword = %keyword, "未识别的关键字");
                t("sms.unknown_keyword")
            }
            Some(handler) if rest.is_empty() && handler.help_on_empty() => handler.help(),
            Some(handler) => match handler.handle(&self.ctx, &msg, rest) {
                Ok(reply) => reply,
                Err(SmsError::Repository(e)) => {
                    tracing::error!(error = %e, keyword = %keyword, "短信处理失败");
                    SmsError::Repository(e).user_message()
                }
                Err(e) => {
                    tracing::info!(error = %e, keyword = %keyword, "短信内容被拒绝");
                    e.user_message()
                }
            },
        };

        let outgoing_id = self.ctx.message_repo.insert(
            contact_id,
            phone,
            &reply,
            MessageDirection::Outgoing,
            received_at,
        )?;

        Ok(SmsResponse {
            incoming_id,
            outgoing_id,
            reply,
        })
    }
}
