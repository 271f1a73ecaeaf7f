// The binary uses the library, not duplicate modules
use epoch_atlas::{Settings, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    let _guard = logging::setup_logging(settings.trace.as_deref());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(epoch_atlas::run(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
