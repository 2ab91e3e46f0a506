use clap::Parser;

use labtrack_client::AppContext;
use labtrack_client::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    labtrack_observability::init_with_format(config.log_format);

    let ctx = AppContext::bootstrap(config)?;
    tracing::debug!(api_url = ctx.api.base_url(), authenticated = ctx.session.is_authenticated(), "client ready");

    cli::run(cli, ctx, &mut std::io::stdout()).await
}
