use clap::Parser;
use doc_dispatch::config::{Command, ConsoleConfig};
use doc_dispatch::core::probe::call_endpoint;
use doc_dispatch::domain::catalog;
use doc_dispatch::utils::error::{DispatchError, ErrorSeverity};
use doc_dispatch::utils::{logger, validation::Validate};
use doc_dispatch::{
    cancel_pair, Artifact, CliConfig, ConsoleEngine, DispatchOptions, DispatchRequest, Dispatcher,
    ExportPlan, LocalStorage,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting doc-dispatch");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ doc-dispatch failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: CliConfig) -> doc_dispatch::Result<()> {
    let config = ConsoleConfig::load(&cli.config, &cli.overrides())?;

    // 驗證配置
    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated: {}", config.name);

    match cli.command {
        Command::Dispatch {
            file,
            services,
            preview,
            export_name,
            no_reports,
        } => {
            let artifact = read_artifact(&file).await?;
            let service_ids = if services.is_empty() {
                config.service_ids()
            } else {
                services
            };
            let request = DispatchRequest::new(artifact, service_ids)?;

            let storage = LocalStorage::new(config.output_path.clone());
            let engine = ConsoleEngine::new(Dispatcher::from_config(&config)?, storage);

            // Ctrl-C 取消尚未完成的呼叫，已到達的結果仍會輸出
            let (handle, signal) = cancel_pair();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("🛑 Interrupted, cancelling outstanding calls");
                    handle.cancel();
                }
            });

            let mut plan = ExportPlan {
                reports: !no_reports,
                preview,
                ..Default::default()
            };
            if let Some(name) = export_name {
                plan.result_name = name;
            }

            let session = engine
                .run(&request, DispatchOptions::default().with_cancel(signal), &plan)
                .await?;

            println!("{}", session.summary);
            println!("📁 Result saved to: {}", session.result_path);
            for path in &session.report_paths {
                println!("📄 Report: {}", path);
            }
            if let Some(path) = &session.preview_path {
                println!("🔍 Preview: {}", path);
            }
        }
        Command::Health { services } => {
            let service_ids = if services.is_empty() {
                config.service_ids()
            } else {
                services
            };
            let dispatcher = Dispatcher::from_config(&config)?;
            let result = dispatcher.check_health(&service_ids).await;

            for outcome in result.iter() {
                let name = catalog::display_name(&outcome.service_id);
                match outcome.error_message() {
                    None => println!("✅ {:<20} {:>7} ms", name, outcome.elapsed_ms),
                    Some(message) => println!("❌ {:<20} {}", name, message),
                }
            }
        }
        Command::Services => {
            for descriptor in catalog::CATALOG {
                let endpoint = config
                    .services
                    .iter()
                    .find(|s| s.id == descriptor.key)
                    .map(|s| s.endpoint.as_str())
                    .unwrap_or("-");
                println!(
                    "{:<20} {:<20} {}\n{:<20} {}",
                    descriptor.key, descriptor.name, endpoint, "", descriptor.summary
                );
            }
            for service in config
                .services
                .iter()
                .filter(|s| catalog::lookup(&s.id).is_none())
            {
                println!("{:<20} {:<20} {}", service.id, service.id, service.endpoint);
            }
        }
        Command::Task { task_id } => {
            let dispatcher = Dispatcher::from_config(&config)?;
            let result = dispatcher.task_status(&task_id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Call {
            base_url,
            path,
            method,
            body,
        } => {
            let method = method.to_uppercase().parse::<reqwest::Method>().map_err(|_| {
                DispatchError::InvalidRequest {
                    message: format!("unsupported HTTP method '{}'", method),
                }
            })?;
            let body = body
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?;

            let client = reqwest::Client::new();
            let response = call_endpoint(&client, &base_url, method, &path, body.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

async fn read_artifact(path: &Path) -> doc_dispatch::Result<Artifact> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| DispatchError::InvalidRequest {
            message: format!("'{}' is not a file", path.display()),
        })?;
    Ok(Artifact::new(file_name, bytes))
}
