//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use tootbridge_domain::usecases::read_snapshot;

use crate::args::DoctorArgs;
use crate::commands::build_store;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    store: CheckResult,
    mastodon: CheckResult,
    chat: CheckResult,
    scheduler: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        store: CheckResult::error("Not checked"),
        mastodon: CheckResult::error("Not checked"),
        chat: CheckResult::error("Not checked"),
        scheduler: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.store = check_store(config).await;
        report.mastodon = check_mastodon(config);
        report.chat = check_chat(config);
        report.scheduler = check_scheduler(config);
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.store,
        &report.mastodon,
        &report.chat,
        &report.scheduler,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_store(config: &AppConfig) -> CheckResult {
    let store = match build_store(config, false).await {
        Ok(s) => s,
        Err(e) => return CheckResult::error(format!("{:#}", e)),
    };

    match read_snapshot(store.as_ref()).await {
        Ok(snapshot) => {
            let ready = snapshot.posts.iter().filter(|p| p.is_ready()).count();
            CheckResult::ok(format!(
                "Backend: {}, Path: {}, {} pending ({} ready), {} archived",
                config.store.backend,
                config.store.path.display(),
                snapshot.posts.len(),
                ready,
                snapshot.archived.len()
            ))
            .with_details(serde_json::json!({
                "pending": snapshot.posts.len(),
                "ready": ready,
                "archived": snapshot.archived.len(),
            }))
        }
        Err(e) => CheckResult::error(format!(
            "Failed to read store at {}: {}",
            config.store.path.display(),
            e
        )),
    }
}

fn check_mastodon(config: &AppConfig) -> CheckResult {
    let host_env = &config.mastodon.host_env;
    let token_env = &config.mastodon.access_token_env;

    if host_env.is_empty() || token_env.is_empty() {
        return CheckResult::error("Mastodon host or token env var not configured");
    }

    let host_set = env_is_set(host_env);
    let token_set = env_is_set(token_env);

    if host_set && token_set {
        CheckResult::ok(format!(
            "Host: {} (set), Token: {} (set)",
            host_env, token_env
        ))
    } else {
        CheckResult::warn(format!(
            "Host: {} ({}), Token: {} ({})",
            host_env,
            set_label(host_set),
            token_env,
            set_label(token_set)
        ))
    }
}

fn check_chat(config: &AppConfig) -> CheckResult {
    match config.chat.transport.trim() {
        "console" => CheckResult::ok("Transport: console (stdin/stdout)"),
        "slack" => {
            let env_var = &config.slack.bot_token_env;
            let channels = &config.slack.channels;

            if env_var.is_empty() {
                return CheckResult::error("No Slack bot token env var configured");
            }

            if channels.is_empty() {
                return CheckResult::warn("No Slack channels configured");
            }

            if env_is_set(env_var) {
                CheckResult::ok(format!(
                    "Transport: slack, Bot token: {} (set), Channels: {}",
                    env_var,
                    channels.join(", ")
                ))
            } else {
                CheckResult::warn(format!(
                    "Transport: slack, Bot token: {} (not set), Channels: {}",
                    env_var,
                    channels.join(", ")
                ))
            }
        }
        other => CheckResult::error(format!("Unknown chat transport: {}", other)),
    }
}

fn check_scheduler(config: &AppConfig) -> CheckResult {
    if !config.scheduler.enabled {
        return CheckResult::warn("Scheduler disabled; ready posts publish only on request");
    }

    if config.scheduler.interval_secs == 0 {
        return CheckResult::error("Scheduler interval must be greater than zero");
    }

    CheckResult::ok(format!(
        "Publishing ready posts every {}s",
        config.scheduler.interval_secs
    ))
}

fn env_is_set(env_var: &str) -> bool {
    matches!(std::env::var(env_var), Ok(val) if !val.trim().is_empty())
}

fn set_label(set: bool) -> &'static str {
    if set { "set" } else { "not set" }
}

fn print_report(report: &DoctorReport) {
    println!("tootbridge Doctor Report");
    println!("========================");
    println!();

    print_check("Config", &report.config);
    print_check("Store", &report.store);
    print_check("Mastodon", &report.mastodon);
    print_check("Chat", &report.chat);
    print_check("Scheduler", &report.scheduler);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: tootbridge run --console --no-scheduler");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
