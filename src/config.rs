//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TOSA__*` 覆盖（双下划线表示嵌套，如 `TOSA__SERVICE__BASE_URL=http://host:8000`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub session: SessionSection,
}

/// [app] 段：应用名、日志文件
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// TUI 占用终端，日志写入该文件
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("tos-analyzer.log")
}

/// 服务后端：http（远端分析服务）/ mock（离线演示）
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProvider {
    #[default]
    Http,
    Mock,
}

/// ingest 载荷形式
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadMode {
    /// multipart/form-data 上传原始文件
    #[default]
    Multipart,
    /// `{ "text": ... }` JSON
    Text,
}

/// [service] 段：分析服务地址与端点
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSection {
    #[serde(default)]
    pub provider: ServiceProvider,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ingest_path")]
    pub ingest_path: String,
    #[serde(default = "default_query_path")]
    pub query_path: String,
    /// multipart 中文件字段名
    #[serde(default = "default_upload_field")]
    pub upload_field: String,
    #[serde(default)]
    pub payload: PayloadMode,
    /// 单次请求超时（秒）；不设置则永不超时
    pub timeout_secs: Option<u64>,
    /// 固定的 query namespace；设置后覆盖服务端返回的 doc_id
    pub namespace: Option<String>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            provider: ServiceProvider::default(),
            base_url: default_base_url(),
            ingest_path: default_ingest_path(),
            query_path: default_query_path(),
            upload_field: default_upload_field(),
            payload: PayloadMode::default(),
            timeout_secs: None,
            namespace: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_ingest_path() -> String {
    "/ingest".to_string()
}

fn default_query_path() -> String {
    "/query".to_string()
}

fn default_upload_field() -> String {
    "file".to_string()
}

/// [session] 段：会话行为
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// 会话结束或重新分析后，丢弃旧请求的迟到响应
    #[serde(default = "default_discard_superseded")]
    pub discard_superseded: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            discard_superseded: default_discard_superseded(),
        }
    }
}

fn default_discard_superseded() -> bool {
    true
}

/// 从 config 目录加载配置，环境变量 TOSA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TOSA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TOSA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.service.provider, ServiceProvider::Http);
        assert_eq!(cfg.service.base_url, "http://localhost:8000");
        assert_eq!(cfg.service.ingest_path, "/ingest");
        assert_eq!(cfg.service.query_path, "/query");
        assert_eq!(cfg.service.upload_field, "file");
        assert_eq!(cfg.service.payload, PayloadMode::Multipart);
        assert!(cfg.service.timeout_secs.is_none());
        assert!(cfg.session.discard_superseded);
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[service]\nprovider = \"mock\"\nbase_url = \"http://10.0.0.2:9000\"\npayload = \"text\"\n\n[session]\ndiscard_superseded = false"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.service.provider, ServiceProvider::Mock);
        assert_eq!(cfg.service.base_url, "http://10.0.0.2:9000");
        assert_eq!(cfg.service.payload, PayloadMode::Text);
        assert_eq!(cfg.service.query_path, "/query");
        assert!(!cfg.session.discard_superseded);
    }
}
