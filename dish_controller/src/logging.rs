use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt as _,
};

/// Console plus a daily-rolling JSON file under `logs/`.
///
/// The returned guard flushes the file writer; `main` holds it for the
/// lifetime of the process.
pub fn init() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily("logs", "dish_controller.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(fmt::Layer::new().json().with_writer(file_writer))
        .with(EnvFilter::from_default_env());

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global subscriber");

    guard
}
