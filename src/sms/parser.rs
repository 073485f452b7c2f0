// ==========================================
// 物资供应链报表系统 - 产品数量短信解析
// ==========================================
// 格式: <code> <qty> <code> <qty> ...
// 允许代码与数量粘连（jd10），不区分大小写
// ==========================================

use crate::domain::product::normalize_sms_code;
use crate::sms::error::{SmsError, SmsResult};

/// 拆分一个空白分隔的片段
///
/// 已知代码整体保留（代码本身可能含数字），否则在字母与数字交界处拆开
fn split_token<F>(token: &str, is_known: &F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    if is_known(token) {
        return vec![token.to_string()];
    }
    let boundary = token
        .char_indices()
        .find(|(i, c)| *i > 0 && c.is_ascii_digit())
        .map(|(i, _)| i);
    match boundary {
        Some(i) if token[..i].chars().all(|c| c.is_alphabetic()) => {
            vec![token[..i].to_string(), token[i..].to_string()]
        }
        _ => vec![token.to_string()],
    }
}

/// 解析为 (产品代码, 数量) 列表，保持短信中的顺序
pub fn parse_product_quantities<F>(text: &str, is_known: F) -> SmsResult<Vec<(String, i64)>>
where
    F: Fn(&str) -> bool,
{
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(normalize_sms_code)
        .flat_map(|t| split_token(&t, &is_known))
        .collect();

    if tokens.is_empty() {
        return Err(SmsError::Empty);
    }

    let mut entries = Vec::new();
    let mut iter = tokens.into_iter().peekable();
    while let Some(code) = iter.next() {
        if !is_known(&code) {
            return Err(SmsError::UnknownProduct(code));
        }
        let starts_with_letter = |s: &String| s.chars().next().is_some_and(|c| c.is_alphabetic());
        let quantity = match iter.peek() {
            None => return Err(SmsError::MissingQuantity(code)),
            Some(next) if starts_with_letter(next) => return Err(SmsError::MissingQuantity(code)),
            Some(next) => next
                .parse::<i64>()
                .ok()
                .filter(|q| *q >= 0)
                .ok_or_else(|| SmsError::BadQuantity(code.clone()))?,
        };
        iter.next();
        entries.push((code, quantity));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(code: &str) -> bool {
        matches!(code, "jd" | "mc" | "dp" | "b12")
    }

    #[test]
    fn test_parse_spaced_and_glued() {
        let parsed = parse_product_quantities("JD 10 mc20  dp 0", known).unwrap();
        assert_eq!(
            parsed,
            vec![("jd".to_string(), 10), ("mc".to_string(), 20), ("dp".to_string(), 0)]
        );
    }

    #[test]
    fn test_code_with_digits_is_not_split() {
        let parsed = parse_product_quantities("b12 5", known).unwrap();
        assert_eq!(parsed, vec![("b12".to_string(), 5)]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_product_quantities("   ", known), Err(SmsError::Empty)));
        assert!(matches!(
            parse_product_quantities("xx 10", known),
            Err(SmsError::UnknownProduct(c)) if c == "xx"
        ));
        assert!(matches!(
            parse_product_quantities("jd mc 10", known),
            Err(SmsError::MissingQuantity(c)) if c == "jd"
        ));
        assert!(matches!(
            parse_product_quantities("jd 10 mc", known),
            Err(SmsError::MissingQuantity(c)) if c == "mc"
        ));
        assert!(matches!(
            parse_product_quantities("jd 1.5", known),
            Err(SmsError::BadQuantity(c)) if c == "jd"
        ));
        assert!(matches!(
            parse_product_quantities("jd -3", known),
            Err(SmsError::BadQuantity(_))
        ));
    }
}
