//! 应用运行配置加载。

use std::collections::{HashMap, HashSet};
use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 免记录的路由表：路由模板 -> HTTP 方法集合。
///
/// 环境变量格式：`/api/pages/:slug=GET,HEAD;/health=GET`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipRoutes {
    routes: HashMap<String, HashSet<String>>,
}

impl SkipRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条路由及其免记录方法（方法名统一转大写）。
    pub fn with_route<I, S>(mut self, route: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.routes.entry(route.into()).or_default();
        for method in methods {
            entry.insert(method.as_ref().trim().to_ascii_uppercase());
        }
        self
    }

    /// 路由与方法是否都在免记录表中。
    pub fn matches(&self, route: &str, method: &str) -> bool {
        self.routes
            .get(route)
            .is_some_and(|methods| methods.contains(&method.to_ascii_uppercase()))
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// 解析环境变量格式。
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut routes = Self::new();
        for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((route, methods)) = entry.rsplit_once('=') else {
                return Err(format!("expected route=METHODS, got {entry}"));
            };
            let route = route.trim();
            let methods: Vec<&str> = methods
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .collect();
            if route.is_empty() || methods.is_empty() {
                return Err(format!("expected route=METHODS, got {entry}"));
            }
            routes = routes.with_route(route, methods);
        }
        Ok(routes)
    }
}

/// 访问日志链路配置。
#[derive(Debug, Clone)]
pub struct ApiLogConfig {
    /// 缓冲区容量，达到即同步刷盘。
    pub max_buffer_size: usize,
    /// 后台刷盘周期。
    pub flush_interval: Duration,
    /// 单次批量写入超时。
    pub write_timeout: Duration,
    /// 全局开关（按请求检查）。
    pub logging_disabled: bool,
    pub media_path_prefix: String,
    pub admin_path_prefix: String,
    pub skip_routes: SkipRoutes,
    /// 超过该大小（按 Content-Length）的请求体不做捕获。
    pub body_capture_limit_bytes: usize,
}

impl Default for ApiLogConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 100,
            flush_interval: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
            logging_disabled: false,
            media_path_prefix: "/media/".to_string(),
            admin_path_prefix: "/admin/".to_string(),
            skip_routes: SkipRoutes::new(),
            body_capture_limit_bytes: 1024 * 1024,
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未配置时使用内存存储。
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_access_ttl_seconds: u64,
    pub api_log: ApiLogConfig,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（测试时不依赖进程环境）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret =
            read_optional(&lookup, "CIVIC_JWT_SECRET").ok_or_else(|| missing("CIVIC_JWT_SECRET"))?;
        let http_addr =
            read_optional(&lookup, "CIVIC_HTTP_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let database_url = read_optional(&lookup, "CIVIC_DATABASE_URL");
        let jwt_access_ttl_seconds =
            read_u64_with_default(&lookup, "CIVIC_JWT_ACCESS_TTL_SECONDS", 3600)?;
        let api_log = read_api_log(&lookup)?;

        Ok(Self {
            http_addr,
            database_url,
            jwt_secret,
            jwt_access_ttl_seconds,
            api_log,
        })
    }
}

fn read_api_log<F>(lookup: &F) -> Result<ApiLogConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = ApiLogConfig::default();
    let max_buffer_size = read_u64_with_default(
        lookup,
        "CIVIC_API_LOG_MAX_BUFFER_SIZE",
        defaults.max_buffer_size as u64,
    )?;
    if max_buffer_size == 0 {
        return Err(invalid("CIVIC_API_LOG_MAX_BUFFER_SIZE", "0"));
    }
    let flush_interval = read_seconds_with_default(
        lookup,
        "CIVIC_API_LOG_FLUSH_INTERVAL_SECONDS",
        defaults.flush_interval,
    )?;
    let write_timeout = read_seconds_with_default(
        lookup,
        "CIVIC_API_LOG_WRITE_TIMEOUT_SECONDS",
        defaults.write_timeout,
    )?;
    let logging_disabled = read_bool_with_default(lookup, "CIVIC_API_LOG_DISABLED", false);
    let media_path_prefix =
        read_optional(lookup, "CIVIC_MEDIA_PATH_PREFIX").unwrap_or(defaults.media_path_prefix);
    let admin_path_prefix =
        read_optional(lookup, "CIVIC_ADMIN_PATH_PREFIX").unwrap_or(defaults.admin_path_prefix);
    let skip_routes = match read_optional(lookup, "CIVIC_API_LOG_SKIP_ROUTES") {
        Some(raw) => SkipRoutes::parse(&raw)
            .map_err(|reason| invalid("CIVIC_API_LOG_SKIP_ROUTES", &reason))?,
        None => SkipRoutes::new(),
    };
    let body_capture_limit_bytes = read_u64_with_default(
        lookup,
        "CIVIC_API_LOG_BODY_LIMIT_BYTES",
        defaults.body_capture_limit_bytes as u64,
    )?;

    Ok(ApiLogConfig {
        max_buffer_size: usize::try_from(max_buffer_size)
            .map_err(|_| invalid("CIVIC_API_LOG_MAX_BUFFER_SIZE", &max_buffer_size.to_string()))?,
        flush_interval,
        write_timeout,
        logging_disabled,
        media_path_prefix,
        admin_path_prefix,
        skip_routes,
        body_capture_limit_bytes: usize::try_from(body_capture_limit_bytes).unwrap_or(usize::MAX),
    })
}

fn missing(key: &str) -> ConfigError {
    ConfigError::Missing(key.to_string())
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid(key.to_string(), value.to_string())
}

fn read_u64_with_default<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match read_optional(lookup, key) {
        Some(value) => value,
        None => return Ok(default),
    };
    value.parse::<u64>().map_err(|_| invalid(key, &value))
}

/// 读取秒数（允许小数），必须为正。
fn read_seconds_with_default<F>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match read_optional(lookup, key) {
        Some(value) => value,
        None => return Ok(default),
    };
    match value.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => {
            Duration::try_from_secs_f64(seconds).map_err(|_| invalid(key, &value))
        }
        _ => Err(invalid(key, &value)),
    }
}

fn read_optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        None => default,
    }
}
