// ==========================================
// 物资供应链报表系统 - 短信 API
// ==========================================
// 职责: 接收短信，交给 SmsRouter 分派并返回回复
// ==========================================

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::api::error::{ApiError, ApiResult};
use crate::sms::{SmsResponse, SmsRouter};

pub struct SmsApi {
    router: Arc<SmsRouter>,
}

impl SmsApi {
    pub fn new(router: Arc<SmsRouter>) -> Self {
        Self { router }
    }

    /// 处理一条上行短信
    ///
    /// # 返回
    /// - Ok(SmsResponse): 含回复文本与收发消息 ID
    /// - Err(ApiError::InvalidInput): 号码为空
    pub fn handle_incoming(
        &self,
        phone: &str,
        text: &str,
        received_at: NaiveDateTime,
    ) -> ApiResult<SmsResponse> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(ApiError::InvalidInput("手机号不能为空".to_string()));
        }
        Ok(self.router.handle(phone, text, received_at)?)
    }
}
