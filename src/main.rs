use anyhow::Result;
use mailcal::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
