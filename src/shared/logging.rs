use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SERVICE_NAME: &str = "wa";

/// Keeps the file writer alive; dropping it flushes pending log lines.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Maps the number of `-v` flags to a default filter level.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn init_logging(verbosity: u8, log_dir: Option<&Path>) -> Result<LoggingGuard, anyhow::Error> {
    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let _ = rotate_logs_on_startup(dir, SERVICE_NAME);

            let file_appender = rolling::never(dir, format!("{SERVICE_NAME}.log"));
            let (non_blocking_file, guard) = non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false) // No colors in file logs
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Console output goes to stderr so stdout carries only script output.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false);

    // RUST_LOG wins over the verbosity flags
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Some(dir) = log_dir {
        info!("Logging initialized - logs will be written to {}/{SERVICE_NAME}.log", dir.display());
    }

    Ok(LoggingGuard { _file: file_guard })
}

pub fn rotate_logs_on_startup(log_dir: &Path, service_name: &str) -> Result<(), anyhow::Error> {
    let log_path = log_dir.join(format!("{service_name}.log"));

    if log_path.exists() {
        // Create backup with timestamp
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_path = log_dir.join(format!("{service_name}.{timestamp}.log"));

        std::fs::rename(&log_path, &backup_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(7), "debug");
    }

    #[test]
    fn test_rotate_moves_previous_log_aside() {
        let dir = TempDir::new().unwrap();
        {
            let mut appender = rolling::never(dir.path(), format!("{SERVICE_NAME}.log"));
            appender.write_all(b"old run\n").unwrap();
            appender.flush().unwrap();
        }
        assert!(dir.path().join("wa.log").exists());

        rotate_logs_on_startup(dir.path(), SERVICE_NAME).unwrap();

        assert!(!dir.path().join("wa.log").exists());
        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("wa.") && backups[0].ends_with(".log"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(&backups[0])).unwrap(),
            "old run\n"
        );
    }

    #[test]
    fn test_rotate_without_previous_log() {
        let dir = TempDir::new().unwrap();
        rotate_logs_on_startup(dir.path(), "wa").unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
