pub mod cli;
pub mod toml_config;

use crate::domain::endpoint::{DispatchMode, GatewayEndpoint, ServiceEndpoint};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::path::Path;
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_CONFIG_PATH: &str = "dispatch.toml";

/// 命令列對設定檔的覆蓋值
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub gateway: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub call_timeout_seconds: Option<u64>,
    pub output_path: Option<String>,
}

/// 合併後的最終設定
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub name: String,
    pub mode: DispatchMode,
    pub services: Vec<ServiceEndpoint>,
    pub gateway: Option<GatewayEndpoint>,
    pub dispatch_timeout: Option<Duration>,
    pub call_timeout: Option<Duration>,
    pub output_path: String,
}

impl ConsoleConfig {
    pub fn from_toml(config: &TomlConfig) -> Self {
        Self {
            name: config.console_name().to_string(),
            mode: config.dispatch_mode(),
            services: config.service_endpoints().to_vec(),
            gateway: config.gateway(),
            dispatch_timeout: config.dispatch_timeout(),
            call_timeout: config.call_timeout(),
            output_path: config.output_path().to_string(),
        }
    }

    /// 預設路徑的檔案不存在時使用空設定，其餘情況必須能讀取
    pub fn load(path: &str, overrides: &Overrides) -> Result<Self> {
        let file = if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
            tracing::warn!("⚠️ {} not found, using built-in defaults", path);
            TomlConfig::default()
        } else {
            tracing::info!("📁 Loading configuration from: {}", path);
            TomlConfig::from_file(path)?
        };

        Ok(Self::from_toml(&file).with_overrides(overrides))
    }

    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(endpoint) = &overrides.gateway {
            tracing::info!("🔧 Gateway overridden to: {}", endpoint);
            self.mode = DispatchMode::Gateway;
            self.gateway = Some(match self.gateway.take() {
                Some(existing) => GatewayEndpoint {
                    endpoint: endpoint.clone(),
                    ..existing
                },
                None => GatewayEndpoint::new(endpoint.clone()),
            });
        }
        if let Some(secs) = overrides.timeout_seconds {
            self.dispatch_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = overrides.call_timeout_seconds {
            self.call_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(path) = &overrides.output_path {
            self.output_path = path.clone();
        }
        self
    }

    pub fn service_ids(&self) -> Vec<String> {
        self.services.iter().map(|s| s.id.clone()).collect()
    }
}

impl ConfigProvider for ConsoleConfig {
    fn dispatch_mode(&self) -> DispatchMode {
        self.mode
    }

    fn service_endpoints(&self) -> &[ServiceEndpoint] {
        &self.services
    }

    fn gateway(&self) -> Option<GatewayEndpoint> {
        self.gateway.clone()
    }

    fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout
    }

    fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }
}

impl Validate for ConsoleConfig {
    fn validate(&self) -> Result<()> {
        toml_config::validate_dispatch(self)?;
        validation::validate_path("export.output_path", &self.output_path)
    }
}

#[cfg(feature = "cli")]
pub use args::{CliConfig, Command};

#[cfg(feature = "cli")]
mod args {
    use super::{Overrides, DEFAULT_CONFIG_PATH};
    use clap::{Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "doc-dispatch")]
    #[command(about = "Send one document to several analysis services and collect the results")]
    pub struct CliConfig {
        /// Path to TOML configuration file
        #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
        pub config: String,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        pub verbose: bool,

        /// Emit logs as JSON lines
        #[arg(long, global = true)]
        pub log_json: bool,

        /// Override export directory
        #[arg(long, global = true)]
        pub output_path: Option<String>,

        /// Dispatch through this gateway instead of calling services directly
        #[arg(long, global = true)]
        pub gateway: Option<String>,

        /// Whole-dispatch timeout in seconds
        #[arg(long, global = true)]
        pub timeout: Option<u64>,

        /// Per-call timeout in seconds
        #[arg(long, global = true)]
        pub call_timeout: Option<u64>,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Upload a document to the selected services
        Dispatch {
            /// Document to send
            file: PathBuf,

            /// Target service ids (defaults to every configured service)
            #[arg(short, long, value_delimiter = ',')]
            services: Vec<String>,

            /// Write a standalone HTML preview of this service's report
            #[arg(long)]
            preview: Option<String>,

            /// File name of the exported result JSON
            #[arg(long)]
            export_name: Option<String>,

            /// Skip writing `<service>_report.html` files
            #[arg(long)]
            no_reports: bool,
        },
        /// Check the health endpoint of each service
        Health {
            #[arg(short, long, value_delimiter = ',')]
            services: Vec<String>,
        },
        /// List known and configured services
        Services,
        /// Look up a gateway task by id
        Task { task_id: String },
        /// Send one request to a single endpoint
        Call {
            base_url: String,
            path: String,

            #[arg(short, long, default_value = "GET")]
            method: String,

            /// JSON request body
            #[arg(short, long)]
            body: Option<String>,
        },
    }

    impl CliConfig {
        pub fn overrides(&self) -> Overrides {
            Overrides {
                gateway: self.gateway.clone(),
                timeout_seconds: self.timeout,
                call_timeout_seconds: self.call_timeout,
                output_path: self.output_path.clone(),
            }
        }
    }
}
