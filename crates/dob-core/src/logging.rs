use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{fmt, fmt::writer::MakeWriterExt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize tracing for the bot: stdout plus an append-only log file.
///
/// Default filter is `info`; `RUST_LOG` overrides it.
pub fn init(service_name: &str, log_file: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    let file = Arc::new(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,dob=info,dob_core=info,dob_telegram=info,{service_name}=info"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stdout.and(file))
        .with_target(true)
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install tracing subscriber: {e}")))?;

    Ok(())
}
