//! Tracing targets and subscriber setup.

/// Target receiving the page's real console output (the developer console).
pub const DEVCONSOLE_TARGET: &str = "jsplayground::devconsole";

/// Target receiving interceptor faults and other playground-internal events.
pub const DIAGNOSTICS_TARGET: &str = "jsplayground::diagnostics";

/// Install a formatting subscriber for hosts that embed the playground.
///
/// Honors `RUST_LOG`; without it only warnings and the developer console are
/// shown. Returns an error if a global subscriber is already installed.
pub fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into())
        .add_directive(format!("{DEVCONSOLE_TARGET}=info").parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
