//! Pruning policy ensure command.

use anyhow::{Context, Result};
use clap::Args;
use msr_client::{
    CallContext, CreatePruningPolicy, ErrorKind, MatchCount, MsrError, MultisetEquality,
    PolicyEquivalence, PruningPolicyRule,
};

use super::ConnectionArgs;

/// Arguments for the ensure-pruning-policy command.
#[derive(Args)]
pub struct PruningArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Organization owning the repository
    #[arg(long)]
    pub org: String,

    /// Repository name
    #[arg(long)]
    pub repo: String,

    /// Rule as field:operator:value[,value...], e.g. tag:matches:^dev-
    #[arg(long = "rule", required = true, value_parser = parse_rule)]
    pub rules: Vec<PruningPolicyRule>,

    /// Create the policy disabled
    #[arg(long)]
    pub disabled: bool,

    /// Treat policies as equivalent only when their rule multisets match
    #[arg(long)]
    pub strict: bool,
}

/// Parses `field:operator:v1,v2`. The value part may itself contain `:`.
pub fn parse_rule(raw: &str) -> Result<PruningPolicyRule, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(field), Some(operator), Some(values)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected field:operator:value, got '{raw}'"));
    };

    let values: Vec<&str> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    if field.trim().is_empty() || operator.trim().is_empty() || values.is_empty() {
        return Err(format!("rule '{raw}' needs a field, an operator and a value"));
    }

    Ok(PruningPolicyRule::new(field.trim(), operator.trim(), values))
}

/// Runs the ensure-pruning-policy command.
pub async fn run(ctx: &CallContext, args: &PruningArgs) -> Result<String> {
    let client = args.connection.client()?;
    let policy = CreatePruningPolicy {
        enabled: !args.disabled,
        rules: args.rules.clone(),
    };
    let equivalence: &(dyn PolicyEquivalence + Sync) = if args.strict {
        &MultisetEquality
    } else {
        &MatchCount
    };

    match client
        .ensure_pruning_policy_with(ctx, &args.org, &args.repo, &policy, equivalence)
        .await
    {
        Ok(created) => Ok(format!(
            "Created pruning policy {} on {}/{}",
            created.id, args.org, args.repo
        )),
        Err(err) if err.kind() == ErrorKind::PolicyConflict => {
            let existing = match err.root() {
                MsrError::PolicyConflict { existing_id, .. } => existing_id.as_str(),
                _ => "",
            };
            Ok(format!(
                "Equivalent pruning policy {existing} already exists on {}/{}",
                args.org, args.repo
            ))
        }
        Err(err) => Err(err).with_context(|| {
            format!("Failed to ensure pruning policy on {}/{}", args.org, args.repo)
        }),
    }
}
