use vault_ops_common::logger;
use vault_ops_types::{RunReport, StepStatus};

fn address_or_dash(address: Option<ethers::types::Address>) -> String {
    address.map_or_else(|| "-".to_string(), |a| format!("{a:#x}"))
}

/// Renders the run summary: one line per created address, then step outcomes.
pub fn render(report: &RunReport) -> String {
    let mut lines = vec![
        format!(
            "Network:  {}",
            report.network.as_ref().map_or("-", |n| n.name())
        ),
        format!("Deployer: {:#x}", report.deployer),
        format!("Vault:    {}", address_or_dash(report.vault)),
        format!("Strategy: {}", address_or_dash(report.strategy)),
        format!("Want:     {}", address_or_dash(report.want)),
        format!("Pool:     {}", report.pool.as_deref().unwrap_or("-")),
    ];
    for step in &report.steps {
        let status = match &step.status {
            StepStatus::Applied => "applied".to_string(),
            StepStatus::Unchanged => "unchanged".to_string(),
            StepStatus::NotApplicable => "not applicable".to_string(),
            StepStatus::Failed { reason } => format!("FAILED: {reason}"),
        };
        lines.push(format!("Step {}: {status}", step.step));
        for contract in &step.registered {
            lines.push(format!("  registered {contract:#x}"));
        }
    }
    if let Some(vault) = report.orphaned_vault {
        lines.push(format!("Orphaned vault: {vault:#x}"));
    }
    lines.push(format!(
        "State: {} ({})",
        report.phase,
        if report.complete { "complete" } else { "incomplete" }
    ));
    lines.join("\n")
}

pub fn print(report: &RunReport) {
    logger::note("Run report", render(report));
}

#[cfg(test)]
mod tests {
    use ethers::types::Address;
    use vault_ops_types::{ConfigurationStep, Network, StepReport};

    use super::*;

    #[test]
    fn aborted_run_still_names_created_vault() {
        let mut report = RunReport::new(Some(Network::Bsc), Address::repeat_byte(1));
        report.vault = Some(Address::repeat_byte(0xaa));
        report.abort("timed out");

        let text = render(&report);
        assert!(text.contains(&format!("Vault:    {:#x}", Address::repeat_byte(0xaa))));
        assert!(text.contains("Strategy: -"));
        assert!(text.contains("Orphaned vault"));
    }

    #[test]
    fn failed_steps_are_listed() {
        let mut report = RunReport::new(Some(Network::Polygon), Address::repeat_byte(1));
        report.steps.push(StepReport::new(
            ConfigurationStep::CallFee,
            StepStatus::Failed {
                reason: "reverted".into(),
            },
        ));
        report.finish();
        let text = render(&report);
        assert!(text.contains("Step call-fee: FAILED: reverted"));
        assert!(text.contains("incomplete"));
    }
}
