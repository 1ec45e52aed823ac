use anyhow::Result;
use colored::Colorize;
use ordersync_config::AppConfig;
use ordersync_reconcile::wait::wait_until_ready;

use crate::cli::OrderArgs;
use crate::commands::{Remote, cancel_on_ctrl_c};
use crate::output::print_success;

pub async fn wait(cfg: &AppConfig, args: &OrderArgs) -> Result<()> {
    let remote = Remote::connect(cfg, &args.order)?;
    let options = cfg.wait_options();
    let cancel = cancel_on_ctrl_c();

    let handle = wait_until_ready(&remote.order, &options, &cancel).await?;
    print_success(&format!(
        "Order {} is {}",
        handle.order_id.cyan(),
        handle.state.as_str()
    ));
    Ok(())
}
