// ==========================================
// 物资供应链报表系统 - 短信处理错误类型
// ==========================================

use crate::domain::BalanceOverflow;
use crate::i18n::{t, t_with_args};
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmsError {
    #[error("未知产品代码: {0}")]
    UnknownProduct(String),

    #[error("数量不是整数: {0}")]
    BadQuantity(String),

    #[error("缺少数量: {0}")]
    MissingQuantity(String),

    #[error("短信内容为空")]
    Empty,

    #[error("号码未注册")]
    NotRegistered,

    #[error("联系人未分配角色")]
    NoRole,

    #[error("联系人未绑定站点")]
    NoFacility,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SmsError {
    /// 回复给发送者的文本
    pub fn user_message(&self) -> String {
        match self {
            SmsError::UnknownProduct(code) => {
                t_with_args("sms.error_unknown_product", &[("code", code.as_str())])
            }
            SmsError::BadQuantity(code) => t_with_args("sms.error_bad_quantity", &[("code", code.as_str())]),
            SmsError::MissingQuantity(code) => {
                t_with_args("sms.error_missing_quantity", &[("code", code.as_str())])
            }
            SmsError::Empty => t("sms.error_empty"),
            SmsError::NotRegistered => t("sms.register_message"),
            SmsError::NoRole => t("sms.no_role"),
            SmsError::NoFacility => t("sms.no_facility"),
            SmsError::Repository(_) => t("sms.error_generic"),
        }
    }
}

impl From<BalanceOverflow> for SmsError {
    fn from(err: BalanceOverflow) -> Self {
        SmsError::BadQuantity(err.product_code)
    }
}

pub type SmsResult<T> = Result<T, SmsError>;
