use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use ordersync_config::AppConfig;
use ordersync_reconcile::{Disposition, Reconciler};

use crate::cli::ApplyArgs;
use crate::commands::{Remote, cancel_on_ctrl_c};
use crate::output::{print_outcome, print_success, print_warning};
use crate::snapshot;

pub async fn apply(cfg: &AppConfig, args: &ApplyArgs) -> Result<()> {
    let old = snapshot::load(&args.old)?;
    let new = snapshot::load(&args.new)?;
    let remote = Remote::connect(cfg, &args.order)?;

    let reconciler = Reconciler::new(remote.provider.clone(), args.kind)
        .with_retry(cfg.retry_policy())
        .with_cancellation(cancel_on_ctrl_c());
    let wait = reconciler.policy().wait_ready.then(|| cfg.wait_options());
    let reconciler = reconciler.with_wait(wait);

    let report = reconciler
        .update(&remote.order, &remote.reference, &old, &new)
        .await;
    print_outcome(&report.outcome);

    let state_path = args.state_out.as_deref().unwrap_or(&args.old);
    match report.disposition {
        Disposition::Persisted(snapshot) => {
            snapshot::save(state_path, &snapshot)?;
            print_success(&format!(
                "Order {} reconciled, state written to {}",
                args.order.cyan(),
                state_path
            ));
            Ok(())
        }
        Disposition::Gone | Disposition::Deleted => {
            if Path::new(state_path).exists() {
                fs::remove_file(state_path)
                    .with_context(|| format!("Failed to remove state: {state_path}"))?;
            }
            print_warning(&format!(
                "Order {} no longer exists, state of record dropped",
                args.order
            ));
            Ok(())
        }
        Disposition::Aborted => {
            anyhow::bail!(
                "Pass for order {} aborted with {} failure(s); state of record left unchanged",
                args.order,
                report.outcome.errors().count()
            )
        }
    }
}
