#![warn(missing_docs)]
//! # crossway binary
//!
//! Operator shell for the lane-video upload workflow on a single-threaded
//! runtime. See [`crossway_app::Shell`] for the event loop.

use crossway_app::{AppError, ClientConfig, Shell, app_version, init_logging};
use log::{error, info};
use tokio::io::BufReader;

/// CLI entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    init_logging();

    if let Err(error) = run().await {
        error!("shell stopped: {error}");
        eprintln!("crossway failed: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = ClientConfig::from_env()?;
    let client = config.build_client()?;
    info!(
        "crossway {} targeting {} (timeout {:?})",
        app_version(),
        client.upload_endpoint(),
        config.upload_timeout
    );

    let mut shell = Shell::new(client);
    let mut stdout = std::io::stdout();
    shell
        .run(BufReader::new(tokio::io::stdin()), &mut stdout)
        .await?;

    info!("shell closed");
    Ok(())
}
