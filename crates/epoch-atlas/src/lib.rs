//! Epoch Atlas - Command-line front end
//!
//! Loads the map datasets behind one async barrier, builds the immutable engine
//! snapshot and answers a single query as JSON on stdout.

pub mod commands;
pub mod error;
pub mod load;
pub mod logging;
pub mod runtime;
pub mod settings;

pub use error::{AppError, Result};
pub use settings::{Command, Settings};

use epoch_atlas_lib::Atlas;
use std::io::Write;
use std::sync::Arc;

/// Load, build the snapshot, answer the query and print it
pub async fn run(settings: Settings) -> Result<()> {
    let config = settings.engine_config()?;
    let (datasets, report) = load::load_datasets(&settings.data_paths()).await;
    let atlas = Arc::new(Atlas::new(config, datasets));

    let answer = commands::execute(&settings.command, atlas, &report).await?;

    let rendered = if settings.pretty {
        serde_json::to_string_pretty(&answer)?
    } else {
        serde_json::to_string(&answer)?
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
