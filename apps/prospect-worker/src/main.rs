use clap::Parser;

use prospect_worker::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	prospect_worker::run(Args::parse()).await
}
