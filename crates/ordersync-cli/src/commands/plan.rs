use anyhow::Result;
use ordersync_core::ProviderContext;
use ordersync_reconcile::Reconciler;

use crate::cli::PlanArgs;
use crate::output::plan_table;
use crate::snapshot;

/// Prints the changed flag of every attribute group. No remote calls.
pub fn plan(provider: ProviderContext, args: &PlanArgs) -> Result<()> {
    let old = snapshot::load(&args.old)?;
    let new = snapshot::load(&args.new)?;
    let changes = Reconciler::new(provider, args.kind).plan(&old, &new);

    println!("{}", plan_table(&changes));
    let pending = changes.iter().filter(|c| c.changed).count();
    if pending == 0 {
        println!("No changes.");
    } else {
        println!("{pending} group(s) to reconcile for {}", args.kind.as_str());
    }
    Ok(())
}
