//! Team membership convergence.
//!
//! Convergence runs in two phases. Removals come first and the first failed
//! removal aborts the run. Additions are best effort: a failed add is
//! recorded in the [`MembershipReport`] and the run moves on, unless the
//! failure came from the caller cancelling the work.

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use crate::client::MsrClient;
use crate::context::CallContext;
use crate::error::{MsrError, Result, ResultExt};
use crate::team::TeamMember;

/// How to get from the current membership to the desired one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConvergenceStrategy {
    /// Remove every current member, then add every desired member.
    ///
    /// Costs more calls than [`ConvergenceStrategy::Diff`] but produces the
    /// full remove/add churn existing MSR automation expects.
    #[default]
    ReplaceAll,

    /// Remove `current - desired`, then add `desired - current`.
    Diff,
}

/// Calls a convergence will make, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    /// Account ids to remove.
    pub remove: Vec<String>,
    /// Account ids to add.
    pub add: Vec<String>,
}

impl MembershipPlan {
    /// Plans the calls for `strategy`.
    ///
    /// Removals follow the order of `current` and additions the order of
    /// `desired`, with duplicate desired ids dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use msr_client::reconcile::{ConvergenceStrategy, MembershipPlan};
    ///
    /// let plan = MembershipPlan::new(&["a", "b"], &["b", "c"], ConvergenceStrategy::Diff);
    /// assert_eq!(plan.remove, ["a"]);
    /// assert_eq!(plan.add, ["c"]);
    /// ```
    #[must_use]
    pub fn new<C, D>(current: &[C], desired: &[D], strategy: ConvergenceStrategy) -> Self
    where
        C: AsRef<str>,
        D: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let desired: Vec<&str> = desired
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| seen.insert(*id))
            .collect();

        match strategy {
            ConvergenceStrategy::ReplaceAll => Self {
                remove: current.iter().map(|id| id.as_ref().to_string()).collect(),
                add: desired.iter().map(ToString::to_string).collect(),
            },
            ConvergenceStrategy::Diff => {
                let current: Vec<&str> = current.iter().map(AsRef::as_ref).collect();
                let current_set: HashSet<&str> = current.iter().copied().collect();
                let desired_set: HashSet<&str> = desired.iter().copied().collect();
                Self {
                    remove: current
                        .iter()
                        .filter(|id| !desired_set.contains(*id))
                        .map(ToString::to_string)
                        .collect(),
                    add: desired
                        .iter()
                        .filter(|id| !current_set.contains(*id))
                        .map(ToString::to_string)
                        .collect(),
                }
            }
        }
    }

    /// Returns true when no call is needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

/// An account that could not be added.
#[derive(Debug)]
pub struct MemberFailure {
    /// Account id.
    pub account_id: String,
    /// Why the add failed.
    pub error: MsrError,
}

/// Outcome of a convergence run.
#[derive(Debug, Default)]
pub struct MembershipReport {
    /// Account ids removed from the team.
    pub removed: Vec<String>,
    /// Account ids added to the team.
    pub added: Vec<String>,
    /// Additions that failed.
    pub failed: Vec<MemberFailure>,
}

impl MembershipReport {
    /// Returns true when every planned addition succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl MsrClient {
    /// Converges the members of a team to `desired` account ids.
    ///
    /// New members are added without admin rights.
    ///
    /// # Errors
    ///
    /// Returns an error if the current members cannot be listed, if any
    /// removal fails, or if the context fires. Other add failures are
    /// reported in [`MembershipReport::failed`] instead.
    #[instrument(
        skip(self, ctx, desired),
        fields(desired = desired.len())
    )]
    pub async fn converge_team_members<S>(
        &self,
        ctx: &CallContext,
        org: &str,
        team: &str,
        desired: &[S],
        strategy: ConvergenceStrategy,
    ) -> Result<MembershipReport>
    where
        S: AsRef<str> + Sync,
    {
        let current = self
            .list_team_members(ctx, org, team)
            .await
            .context_with(|| format!("updating members of team {org}/{team}"))?;
        let current_ids: Vec<&str> = current.iter().map(TeamMember::account_id).collect();
        let plan = MembershipPlan::new(&current_ids, desired, strategy);

        let mut report = MembershipReport::default();
        for account_id in plan.remove {
            self.remove_team_member(ctx, org, team, &account_id)
                .await
                .context_with(|| format!("updating members of team {org}/{team}"))?;
            info!(%account_id, "Removed team member");
            report.removed.push(account_id);
        }

        for account_id in plan.add {
            match self.add_team_member(ctx, org, team, &account_id, false).await {
                Ok(()) => {
                    info!(%account_id, "Added team member");
                    report.added.push(account_id);
                }
                Err(err) if err.is_interruption() => {
                    return Err(err.context(format!("updating members of team {org}/{team}")));
                }
                Err(error) => {
                    warn!(%account_id, %error, "Failed to add team member, continuing");
                    report.failed.push(MemberFailure { account_id, error });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_all_removes_everyone() {
        let plan = MembershipPlan::new(&["A", "B"], &["B", "C"], ConvergenceStrategy::ReplaceAll);
        assert_eq!(plan.remove, ["A", "B"]);
        assert_eq!(plan.add, ["B", "C"]);
    }

    #[test]
    fn test_diff_computes_minimal_changes() {
        let plan = MembershipPlan::new(&["A", "B"], &["B", "C"], ConvergenceStrategy::Diff);
        assert_eq!(plan.remove, ["A"]);
        assert_eq!(plan.add, ["C"]);
    }

    #[test]
    fn test_diff_already_converged() {
        let plan = MembershipPlan::new(&["A", "B"], &["B", "A"], ConvergenceStrategy::Diff);
        assert!(plan.is_empty());
        let plan = MembershipPlan::new(&["A", "B"], &["B", "A"], ConvergenceStrategy::ReplaceAll);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_desired_duplicates_dropped() {
        let plan = MembershipPlan::new::<&str, _>(&[], &["C", "C", "D", "C"], ConvergenceStrategy::ReplaceAll);
        assert_eq!(plan.add, ["C", "D"]);
    }

    #[test]
    fn test_empty_desired_clears_team() {
        for strategy in [ConvergenceStrategy::ReplaceAll, ConvergenceStrategy::Diff] {
            let plan = MembershipPlan::new::<_, &str>(&["A"], &[], strategy);
            assert_eq!(plan.remove, ["A"]);
            assert!(plan.add.is_empty());
        }
    }

    #[test]
    fn test_default_strategy_is_replace_all() {
        assert_eq!(ConvergenceStrategy::default(), ConvergenceStrategy::ReplaceAll);
    }

    #[test]
    fn test_report_completeness() {
        let mut report = MembershipReport::default();
        assert!(report.is_complete());
        report.failed.push(MemberFailure {
            account_id: "x".to_string(),
            error: MsrError::Api {
                status: 404,
                message: "no such account".to_string(),
            },
        });
        assert!(!report.is_complete());
    }
}
