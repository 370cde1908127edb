use std::path::{Path, PathBuf};

pub const LOG_FILE_BASENAME: &str = "vectora";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 30;

pub const LOG_SPEC_ENV: &str = "VECTORA_LOG";
/// `1`/`true` mirrors log lines to stdout in release builds too.
pub const LOG_STDOUT_ENV: &str = "VECTORA_LOG_STDOUT";

/// Everything the planner logger needs, resolved up front so hosts can inspect or tweak it
/// before [`init_logging`] installs the global logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSetup {
    pub directory: PathBuf,
    pub spec: String,
    pub echo_to_stdout: bool,
}

impl LogSetup {
    pub fn from_env(directory: &Path) -> Self {
        Self::resolve(
            directory,
            std::env::var(LOG_SPEC_ENV).ok(),
            std::env::var("RUST_LOG").ok(),
            std::env::var(LOG_STDOUT_ENV).ok(),
        )
    }

    fn resolve(
        directory: &Path,
        spec: Option<String>,
        rust_log: Option<String>,
        stdout: Option<String>,
    ) -> Self {
        let echo_to_stdout = match stdout.as_deref().map(str::trim) {
            Some("1") | Some("true") => true,
            Some("0") | Some("false") => false,
            _ => cfg!(debug_assertions),
        };
        Self {
            directory: directory.to_path_buf(),
            spec: resolve_log_spec(spec, rust_log),
            echo_to_stdout,
        }
    }

    /// Path of the active log file; rotated files get a numeric infix.
    pub fn log_file(&self) -> PathBuf {
        self.directory
            .join(format!("{LOG_FILE_BASENAME}.{LOG_FILE_SUFFIX}"))
    }
}

fn default_log_spec() -> &'static str {
    if cfg!(debug_assertions) {
        "warn,vectora_planner=debug"
    } else {
        "warn,vectora_planner=info"
    }
}

/// Picks the first non-blank spec: `VECTORA_LOG`, then `RUST_LOG`, then the crate default.
pub fn resolve_log_spec(primary: Option<String>, fallback: Option<String>) -> String {
    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    non_blank(primary)
        .or_else(|| non_blank(fallback))
        .unwrap_or_else(|| default_log_spec().to_string())
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(setup: &LogSetup) -> Result<(), flexi_logger::FlexiLoggerError> {
    use flexi_logger::{
        detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming, WriteMode,
    };

    std::fs::create_dir_all(&setup.directory)?;

    Logger::try_with_str(&setup.spec)?
        .log_to_file(
            FileSpec::default()
                .directory(&setup.directory)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .duplicate_to_stdout(if setup.echo_to_stdout {
            Duplicate::Info
        } else {
            Duplicate::None
        })
        .start()?;

    install_panic_hook();

    log::info!(
        "planner {} logging file={} spec={}",
        env!("CARGO_PKG_VERSION"),
        setup.log_file().display(),
        setup.spec
    );
    Ok(())
}

/// Without the `app` feature the host owns the `log` backend.
#[cfg(any(not(feature = "app"), test))]
pub fn init_logging(_setup: &LogSetup) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = panic_message(info.payload());
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let thread = std::thread::current();
        let backtrace = std::backtrace::Backtrace::force_capture();
        log::error!(
            "planner panic thread={} at={location}: {payload}\n{backtrace}",
            thread.name().unwrap_or("<unnamed>")
        );
        default_hook(info);
    }));
}

#[cfg_attr(any(not(feature = "app"), test), allow(dead_code))]
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
