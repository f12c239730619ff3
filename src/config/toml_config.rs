use crate::domain::endpoint::{DispatchMode, GatewayEndpoint, ServiceEndpoint};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{DispatchError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_OUTPUT_PATH: &str = "./output";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub console: Option<ConsoleSection>,
    #[serde(default)]
    pub dispatch: DispatchSection,
    pub gateway: Option<GatewaySection>,
    #[serde(default)]
    pub services: Vec<ServiceEndpoint>,
    pub export: Option<ExportSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchSection {
    #[serde(default)]
    pub mode: DispatchMode,
    /// 整次派送的上限（秒）
    pub timeout_seconds: Option<u64>,
    /// 單一呼叫的上限（秒）
    pub call_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySection {
    pub endpoint: String,
    pub tasks_endpoint: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    pub output_path: String,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DispatchError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DispatchError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DispatchError::ConfigError {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_dispatch(self)?;
        validation::validate_path("export.output_path", self.output_path())
    }

    pub fn console_name(&self) -> &str {
        self.console
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("doc-dispatch")
    }

    pub fn service_ids(&self) -> Vec<String> {
        self.services.iter().map(|s| s.id.clone()).collect()
    }
}

/// 任何 ConfigProvider 共用的檢查
pub fn validate_dispatch<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validation::validate_unique_ids(
        "services.id",
        config.service_endpoints().iter().map(|s| s.id.as_str()),
    )?;

    for service in config.service_endpoints() {
        validation::validate_url(&format!("services.{}.endpoint", service.id), &service.endpoint)?;
        if let Some(health) = &service.health {
            validation::validate_url(&format!("services.{}.health", service.id), health)?;
        }
    }

    match (config.dispatch_mode(), config.gateway()) {
        (DispatchMode::Gateway, None) => {
            return Err(DispatchError::MissingConfigError {
                field: "gateway.endpoint".to_string(),
            })
        }
        (_, Some(gateway)) => {
            validation::validate_url("gateway.endpoint", &gateway.endpoint)?;
            if let Some(tasks) = &gateway.tasks_endpoint {
                validation::validate_url("gateway.tasks_endpoint", tasks)?;
            }
        }
        (DispatchMode::Direct, None) => {}
    }

    if let Some(timeout) = config.dispatch_timeout() {
        validation::validate_positive_number("dispatch.timeout_seconds", timeout.as_secs(), 1)?;
    }
    if let Some(timeout) = config.call_timeout() {
        validation::validate_positive_number(
            "dispatch.call_timeout_seconds",
            timeout.as_secs(),
            1,
        )?;
    }

    Ok(())
}

impl ConfigProvider for TomlConfig {
    fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch.mode
    }

    fn service_endpoints(&self) -> &[ServiceEndpoint] {
        &self.services
    }

    fn gateway(&self) -> Option<GatewayEndpoint> {
        self.gateway.as_ref().map(|g| GatewayEndpoint {
            endpoint: g.endpoint.clone(),
            tasks_endpoint: g.tasks_endpoint.clone(),
            headers: g.headers.clone().unwrap_or_default(),
        })
    }

    fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch.timeout_seconds.map(Duration::from_secs)
    }

    fn call_timeout(&self) -> Option<Duration> {
        self.dispatch.call_timeout_seconds.map(Duration::from_secs)
    }

    fn output_path(&self) -> &str {
        self.export
            .as_ref()
            .map(|e| e.output_path.as_str())
            .unwrap_or(DEFAULT_OUTPUT_PATH)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::BodyMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[console]
name = "Contract review"
description = "Send a contract to every analysis service"

[dispatch]
mode = "direct"
timeout_seconds = 120
call_timeout_seconds = 60

[[services]]
id = "ai_legal"
endpoint = "http://localhost:8092/api/v1/analyze"
health = "http://localhost:8092/health"

[[services]]
id = "ai_econom"
endpoint = "http://localhost:8093/econom/analyze"
body = "json"
headers = { "X-Api-Key" = "secret" }

[export]
output_path = "./reports"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = TomlConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.console_name(), "Contract review");
        assert_eq!(config.dispatch_mode(), DispatchMode::Direct);
        assert_eq!(config.dispatch_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.service_ids(), vec!["ai_legal", "ai_econom"]);
        assert_eq!(config.services[0].body, BodyMode::Multipart);
        assert_eq!(config.services[1].body, BodyMode::Json);
        assert_eq!(
            config.services[1]
                .headers
                .as_ref()
                .and_then(|h| h.get("X-Api-Key"))
                .map(String::as_str),
            Some("secret")
        );
        assert_eq!(config.output_path(), "./reports");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config.dispatch_mode(), DispatchMode::Direct);
        assert!(config.service_endpoints().is_empty());
        assert!(config.gateway().is_none());
        assert_eq!(config.output_path(), DEFAULT_OUTPUT_PATH);
        assert_eq!(config.console_name(), "doc-dispatch");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("DOC_DISPATCH_TEST_GATEWAY", "http://gateway.local:8099");
        let content = r#"
[dispatch]
mode = "gateway"

[gateway]
endpoint = "${DOC_DISPATCH_TEST_GATEWAY}/upload"
tasks_endpoint = "${DOC_DISPATCH_TEST_UNSET_VAR}/tasks"
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        let gateway = config.gateway().unwrap();

        assert_eq!(gateway.endpoint, "http://gateway.local:8099/upload");
        assert_eq!(
            gateway.tasks_endpoint.as_deref(),
            Some("${DOC_DISPATCH_TEST_UNSET_VAR}/tasks")
        );
    }

    #[test]
    fn test_gateway_mode_requires_gateway_section() {
        let config = TomlConfig::from_toml_str("[dispatch]\nmode = \"gateway\"\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DispatchError::MissingConfigError { field } if field == "gateway.endpoint"));
    }

    #[test]
    fn test_duplicate_service_ids_rejected() {
        let content = r#"
[[services]]
id = "ai_sb"
endpoint = "http://localhost:8095/sb"

[[services]]
id = "ai_sb"
endpoint = "http://localhost:8096/sb"
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(DispatchError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config =
            TomlConfig::from_toml_str("[dispatch]\ncall_timeout_seconds = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[dispatch\nmode = ").unwrap_err();
        assert!(matches!(err, DispatchError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = TomlConfig::from_file(file.path()).unwrap();
        assert_eq!(config.services.len(), 2);
    }
}
