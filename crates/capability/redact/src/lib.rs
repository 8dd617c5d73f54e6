//! 敏感字段脱敏。
//!
//! 访问日志中的请求体在离开进程内存之前必须经过脱敏：
//! - 凭证类字段（password、token、access、refresh、证件号）
//! - 携带 base64 内容的字段（file、image、attachment、logo）
//!
//! 命中的字段值整体替换为 [`REDACTION_MARKER`]，不做部分遮盖。

use serde_json::Value;
use std::sync::OnceLock;

/// 脱敏占位符。
pub const REDACTION_MARKER: &str = "***HIDDEN***";

/// 凭证与身份证件类字段。
pub const SENSITIVE_KEYS: &[&str] = &["password", "token", "access", "refresh", "pinfl", "passport"];

/// 可能携带 base64 大字段的键。
pub const BASE64_KEYS: &[&str] = &["file", "image", "attachment", "logo"];

/// 脱敏器。
///
/// 键名匹配忽略 ASCII 大小写。
#[derive(Debug, Clone)]
pub struct Redactor {
    keys: Vec<String>,
    marker: Value,
}

impl Default for Redactor {
    fn default() -> Self {
        let keys = SENSITIVE_KEYS
            .iter()
            .chain(BASE64_KEYS.iter())
            .map(|key| key.to_ascii_lowercase())
            .collect();
        Self {
            keys,
            marker: Value::String(REDACTION_MARKER.to_string()),
        }
    }
}

impl Redactor {
    /// 在默认键集合之外追加字段。
    pub fn with_extra_keys<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut redactor = Self::default();
        for key in extra {
            let key = key.as_ref().to_ascii_lowercase();
            if !redactor.keys.contains(&key) {
                redactor.keys.push(key);
            }
        }
        redactor
    }

    /// 返回脱敏后的副本，不修改输入。
    pub fn redact(&self, value: &Value) -> Value {
        let mut copy = value.clone();
        self.redact_in_place(&mut copy);
        copy
    }

    /// 原地脱敏。
    ///
    /// 递归处理对象与数组；命中键的值替换为字符串占位符后不再深入。
    pub fn redact_in_place(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, item) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *item = self.marker.clone();
                    } else {
                        self.redact_in_place(item);
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.redact_in_place(item);
                }
            }
            _ => {}
        }
    }

    fn is_sensitive(&self, key: &str) -> bool {
        self.keys.iter().any(|candidate| candidate.eq_ignore_ascii_case(key))
    }
}

static DEFAULT_REDACTOR: OnceLock<Redactor> = OnceLock::new();

/// 使用默认字段集合脱敏。
pub fn redact(value: &Value) -> Value {
    DEFAULT_REDACTOR.get_or_init(Redactor::default).redact(value)
}
