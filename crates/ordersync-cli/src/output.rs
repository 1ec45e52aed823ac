use colored::Colorize;
use ordersync_core::ReconciliationOutcome;
use ordersync_reconcile::GroupChange;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn plan_table(changes: &[GroupChange]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Group", "Changed"]);
    for change in changes {
        builder.push_record([change.name, if change.changed { "yes" } else { "-" }]);
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn steps_table(outcome: &ReconciliationOutcome) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Attribute", "Action", "Result"]);
    for step in outcome.steps() {
        let result = match &step.result {
            Ok(()) => "ok".to_string(),
            Err(e) => e.to_string(),
        };
        builder.push_record([step.attribute.clone(), step.action.clone(), result]);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Prints a pass outcome. Warnings and failures go to stderr, apart from each
/// other, so advisory noise never hides a failure.
pub fn print_outcome(outcome: &ReconciliationOutcome) {
    if outcome.attempted() > 0 {
        println!("{}", steps_table(outcome));
    }
    for warning in outcome.warnings() {
        print_warning(&warning.to_string());
    }
    for failure in outcome.errors() {
        print_error(&failure.to_string());
    }
}
