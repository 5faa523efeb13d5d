//! netwarden — Network Scan Job Engine & Scheduler CLI

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = netwarden::logging::init_logging() {
        eprintln!("warning: logging setup failed: {e}");
    }

    netwarden::run(std::env::args().skip(1)).await
}
