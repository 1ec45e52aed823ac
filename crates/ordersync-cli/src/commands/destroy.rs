use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ordersync_config::AppConfig;
use ordersync_reconcile::{Disposition, Reconciler};

use crate::cli::DestroyArgs;
use crate::commands::Remote;
use crate::output::{print_outcome, print_success};

pub async fn destroy(cfg: &AppConfig, args: &DestroyArgs) -> Result<()> {
    let remote = Remote::connect(cfg, &args.order)?;
    let reconciler =
        Reconciler::new(remote.provider.clone(), args.kind).with_retry(cfg.retry_policy());

    let report = reconciler.delete(&remote.order).await;
    print_outcome(&report.outcome);

    match report.disposition {
        Disposition::Deleted | Disposition::Gone => {
            if let Some(state) = &args.state {
                if Path::new(state).exists() {
                    fs::remove_file(state)
                        .with_context(|| format!("Failed to remove state: {state}"))?;
                }
            }
            print_success(&format!("Order {} removed", args.order));
            Ok(())
        }
        Disposition::Aborted | Disposition::Persisted(_) => {
            anyhow::bail!("Order {} was not deleted", args.order)
        }
    }
}
