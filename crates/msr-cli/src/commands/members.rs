//! Team membership sync command.

use anyhow::{bail, Context, Result};
use clap::Args;
use msr_client::reconcile::MembershipPlan;
use msr_client::{CallContext, ConvergenceStrategy, MembershipReport, TeamMember};

use super::ConnectionArgs;

/// Arguments for the sync-members command.
#[derive(Args)]
pub struct MembersArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Organization owning the team
    #[arg(long)]
    pub org: String,

    /// Team name or id
    #[arg(long)]
    pub team: String,

    /// replace-all removes and re-adds everyone; diff only touches changes
    #[arg(long, default_value = "replace-all")]
    pub strategy: StrategyArg,

    /// Print the planned calls without making them
    #[arg(long)]
    pub dry_run: bool,

    /// Desired member account ids. None empties the team.
    pub members: Vec<String>,
}

/// Convergence strategy as spelled on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StrategyArg {
    #[default]
    ReplaceAll,
    Diff,
}

impl From<StrategyArg> for ConvergenceStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::ReplaceAll => Self::ReplaceAll,
            StrategyArg::Diff => Self::Diff,
        }
    }
}

/// Runs the sync-members command.
pub async fn run(ctx: &CallContext, args: &MembersArgs) -> Result<String> {
    let client = args.connection.client()?;
    let team = format!("{}/{}", args.org, args.team);
    let strategy = ConvergenceStrategy::from(args.strategy);

    if args.dry_run {
        let current = client
            .list_team_members(ctx, &args.org, &args.team)
            .await
            .with_context(|| format!("Failed to list members of {team}"))?;
        let current: Vec<&str> = current.iter().map(TeamMember::account_id).collect();
        let plan = MembershipPlan::new(&current, &args.members, strategy);
        return Ok(render_plan(&team, &plan));
    }

    let report = client
        .converge_team_members(ctx, &args.org, &args.team, &args.members, strategy)
        .await
        .with_context(|| format!("Failed to sync members of {team}"))?;

    if !report.is_complete() {
        bail!("{}", render_failures(&team, &report));
    }
    Ok(format!(
        "Synced {team}: removed {}, added {}",
        report.removed.len(),
        report.added.len()
    ))
}

fn render_plan(team: &str, plan: &MembershipPlan) -> String {
    if plan.is_empty() {
        return format!("{team} is already in sync");
    }
    let mut out = format!("Would update {team}:");
    for id in &plan.remove {
        out.push_str(&format!("\n  - {id}"));
    }
    for id in &plan.add {
        out.push_str(&format!("\n  + {id}"));
    }
    out
}

fn render_failures(team: &str, report: &MembershipReport) -> String {
    let mut out = format!(
        "Could not add {} of {} members to {team}:",
        report.failed.len(),
        report.added.len() + report.failed.len()
    );
    for failure in &report.failed {
        out.push_str(&format!("\n  {}: {}", failure.account_id, failure.error.root()));
    }
    out
}
