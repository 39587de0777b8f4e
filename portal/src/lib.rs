// Document Request Portal
// Main library entry point

pub mod account;
pub mod backend;
pub mod config;
pub mod directory;
pub mod models;
pub mod smoke;
pub mod tui;
pub mod utils;
pub mod wizard;
pub mod workflow;

use log::{error, info};
use std::path::Path;

use crate::backend::AuthUser;
use crate::config::PortalConfig;
use crate::models::request::DocumentType;

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(
    with_stdout: bool,
    log_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder(log_dir)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");
    let json_log_file = log_dir.join(format!("portal-{}.log", timestamp));
    let txt_log_file = log_dir.join(format!("portal-{}.txt", timestamp));

    // stdout stays off for the TUI so the alternate screen is not corrupted
    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Debug);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                        None,
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

/// Config from `portal.toml` and `PORTAL_*`, falling back to defaults so a
/// broken file never blocks the smoke runners.
fn load_config() -> PortalConfig {
    match PortalConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration, using defaults: {:#}", e);
            PortalConfig::default()
        }
    }
}

/// The resident signed in for a local terminal session.
fn local_user() -> AuthUser {
    let name = std::env::var("USER")
        .ok()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| "resident".to_string());
    AuthUser {
        uid: format!("local-{}", name),
        email: format!("{}@localhost", name),
    }
}

/// Interactive terminal wizard.
pub fn run_tui() {
    let config = load_config();
    if let Err(e) = init_logging(false, config.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Portal TUI starting at {} (storage={:?})",
        chrono::Utc::now(),
        config.storage
    );

    let result = config.build_services().and_then(|(services, auth)| {
        tui::runtime()?.block_on(auth.sign_in(local_user()));
        tui::run(tui::PortalSession {
            services,
            collections: config.collections.clone(),
            copies: config.default_copies,
        })
    });

    if let Err(e) = result {
        error!("[PHASE: tui] [STEP: fatal] TUI exited with error: {:?}", e);
        eprintln!("Portal error: {}", e);
        std::process::exit(1);
    }
}

/// Non-interactive TUI smoke mode (for automated checks).
/// Renders a single frame and exits.
pub fn run_tui_smoke(target: Option<String>) {
    let config = load_config();
    if let Err(e) = init_logging(false, config.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] TUI smoke starting at {}",
        chrono::Utc::now()
    );

    let target = target.as_deref().unwrap_or("picker");
    if let Err(e) = tui::smoke(target) {
        error!(
            "[PHASE: tui] [STEP: smoke] TUI smoke exited with error: {:?}",
            e
        );
        eprintln!("Portal error: {}", e);
        std::process::exit(1);
    }
}

/// Non-interactive submission smoke on in-memory services.
/// Writes `submit_smoke_transcript.log` under the log folder and exits 0/1.
pub fn run_submit_smoke(document: Option<String>) {
    let config = load_config();
    if let Err(e) = init_logging(false, config.log_dir.as_deref()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] Submission smoke starting at {}",
        chrono::Utc::now()
    );

    let document_type = match document.as_deref().unwrap_or("residency").parse::<DocumentType>() {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Portal error: {}", e);
            std::process::exit(2);
        }
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();
    let result = match rt {
        Ok(rt) => {
            let (services, auth) = backend::Services::in_memory();
            rt.block_on(smoke::submission_smoke(
                services,
                auth,
                config.collections.clone(),
                document_type,
            ))
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to create async runtime for submission smoke: {}",
            e
        )),
    };

    let mut lines = vec![format!("document: {}", document_type)];
    let ok = match &result {
        Ok(transcript) => {
            lines.extend(transcript.iter().cloned());
            lines.push("result: ok".to_string());
            true
        }
        Err(e) => {
            lines.push(format!("result: failed: {:#}", e));
            false
        }
    };

    match utils::path_resolver::resolve_log_folder(config.log_dir.as_deref()) {
        Ok(dir) => {
            let path = dir.join("submit_smoke_transcript.log");
            if let Err(e) = std::fs::write(&path, lines.join("\n") + "\n") {
                eprintln!("Failed to write transcript {:?}: {}", path, e);
            }
        }
        Err(e) => eprintln!("Failed to resolve log folder: {}", e),
    }
    for line in &lines {
        println!("{}", line);
    }

    if !ok {
        error!("[PHASE: smoke] [STEP: submission] Smoke failed");
        std::process::exit(1);
    }
}

/// Print the effective configuration as TOML.
pub fn print_config() {
    let config = match PortalConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Portal error: {:#}", e);
            std::process::exit(2);
        }
    };
    match config.to_toml() {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("Portal error: {:#}", e);
            std::process::exit(1);
        }
    }
}
