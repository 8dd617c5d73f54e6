use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// 请求体快照（已脱敏）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// 可解析的结构化请求体（JSON 或表单字段）。
    Json(serde_json::Value),
    /// 无法解析时的占位说明。
    Undecodable(String),
}

impl RequestBody {
    /// 转为可直接写入 jsonb 列的值。
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RequestBody::Json(value) => value.clone(),
            RequestBody::Undecodable(note) => serde_json::Value::String(note.clone()),
        }
    }
}

/// 服务端执行耗时，定点小数（秒，5 位小数，最多 8 位有效数字）。
///
/// 内部以 10 微秒为单位计数，超出上限时饱和到 `999.99999`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExecutionTime {
    ticks: u32,
}

impl ExecutionTime {
    /// 每秒对应的计数单位。
    pub const SCALE: u32 = 100_000;
    /// 8 位有效数字对应的上限。
    pub const MAX_TICKS: u32 = 99_999_999;

    pub fn from_ticks(ticks: u32) -> Self {
        Self {
            ticks: ticks.min(Self::MAX_TICKS),
        }
    }

    /// 由耗时换算，四舍五入到 10 微秒。
    pub fn from_duration(duration: Duration) -> Self {
        let ticks = (duration.as_nanos() + 5_000) / 10_000;
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        Self::from_ticks(ticks)
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn as_secs_f64(&self) -> f64 {
        f64::from(self.ticks) / f64::from(Self::SCALE)
    }
}

impl fmt::Display for ExecutionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:05}",
            self.ticks / Self::SCALE,
            self.ticks % Self::SCALE
        )
    }
}

impl Serialize for ExecutionTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// 单次请求/响应的访问日志记录。
///
/// `created_at` 由存储层在写入时分配，不在此结构中。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiLogRecord {
    pub path: String,
    pub user_id: Option<String>,
    pub body: RequestBody,
    pub method: String,
    pub ip_address: String,
    pub status_code: u16,
    pub execution_time: ExecutionTime,
}
