use std::path::PathBuf;
use sysinfo::System;

const LOG_TARGET_STARTUP: &str = "five_pin_lane::startup";

/// Directory holding the rolling log files.
///
/// - Linux: ~/.config/FivePinLane/logs/
/// - macOS: ~/Library/Application Support/FivePinLane/logs/
pub fn log_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("FivePinLane").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize tracing with daily file rotation.
///
/// Files are named `<app_name>.YYYY-MM-DD.log`. Debug builds also log to the
/// console. The filter comes from `RUST_LOG`, `info` by default.
pub fn initialize_tracing(app_name: &str) {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, format!("{app_name}.log"));

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true);

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .try_init();
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = tracing_subscriber::registry().with(filter).with(file_layer).try_init();
    }

    tracing::info!(target: LOG_TARGET_STARTUP, "Log directory: {}", log_dir.display());
}

pub fn log_runtime_environment(app_name: &str) {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());
    let host = System::host_name().unwrap_or_else(|| "unknown host".to_string());

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting {} v{} on {} ({})",
        app_name,
        version,
        host,
        std::env::consts::ARCH
    );
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);

    let mut system = System::new();
    system.refresh_cpu();
    system.refresh_memory();
    tracing::debug!(
        target: LOG_TARGET_STARTUP,
        "{} CPUs, {} MiB memory",
        system.cpus().len(),
        system.total_memory() / (1024 * 1024)
    );
}
