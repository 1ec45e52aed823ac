use clap::{Parser, Subcommand};
use ordersync_reconcile::ResourceKind;

#[derive(Parser)]
#[command(name = "ordersync")]
#[command(about = "Reconcile declared resources against the remote order service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./ordersync.toml when present)
    #[arg(short, long, global = true, env = "ORDERSYNC_CONFIG")]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which attribute groups would change, without remote calls
    Plan(PlanArgs),
    /// Run one update pass and write the resulting state of record
    Apply(ApplyArgs),
    /// Delete an order if the remote side allows it
    Destroy(DestroyArgs),
    /// Block until an order reports active (Ctrl-C cancels)
    Wait(OrderArgs),
}

#[derive(clap::Args)]
pub struct PlanArgs {
    /// Resource kind
    #[arg(short, long)]
    pub kind: ResourceKind,
    /// Prior state snapshot (JSON or TOML)
    #[arg(long)]
    pub old: String,
    /// Desired state snapshot (JSON or TOML)
    #[arg(long)]
    pub new: String,
}

#[derive(clap::Args)]
pub struct ApplyArgs {
    /// Resource kind
    #[arg(short, long)]
    pub kind: ResourceKind,
    /// Order id
    #[arg(short, long)]
    pub order: String,
    /// Prior state snapshot (JSON or TOML)
    #[arg(long)]
    pub old: String,
    /// Desired state snapshot (JSON or TOML)
    #[arg(long)]
    pub new: String,
    /// Where to write the new state of record (defaults to --old)
    #[arg(long)]
    pub state_out: Option<String>,
}

#[derive(clap::Args)]
pub struct DestroyArgs {
    /// Resource kind
    #[arg(short, long)]
    pub kind: ResourceKind,
    /// Order id
    #[arg(short, long)]
    pub order: String,
    /// State of record to remove once the order is gone
    #[arg(long)]
    pub state: Option<String>,
}

#[derive(clap::Args)]
pub struct OrderArgs {
    /// Order id
    #[arg(short, long)]
    pub order: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "ordersync",
            "--config",
            "prod.toml",
            "apply",
            "--kind",
            "managed-cluster",
            "--order",
            "ord-1",
            "--old",
            "state.json",
            "--new",
            "plan.toml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("prod.toml"));
        match cli.command {
            Commands::Apply(args) => {
                assert_eq!(args.kind, ResourceKind::ManagedCluster);
                assert_eq!(args.order, "ord-1");
                assert_eq!(args.state_out, None);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Cli::try_parse_from([
            "ordersync", "plan", "--kind", "mainframe", "--old", "a", "--new", "b",
        ])
        .err()
        .unwrap();
        assert!(err.to_string().contains("compute-instance"));
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["ordersync", "wait", "-o", "ord-9", "-c", "x.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
        assert!(matches!(cli.command, Commands::Wait(OrderArgs { ref order }) if order == "ord-9"));
    }
}
