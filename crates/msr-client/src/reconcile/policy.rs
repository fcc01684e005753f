//! Pruning policy equivalence.
//!
//! Before creating a policy the existing policies of the repository are
//! scanned for one that already expresses the same rules, so repeated runs
//! do not pile up duplicates.

use tracing::{info, instrument};

use crate::client::{ensure_not_empty, MsrClient};
use crate::context::CallContext;
use crate::error::{MsrError, Result, ResultExt};
use crate::pruning::{CreatePruningPolicy, PruningPolicy, PruningPolicyRule};

/// Decides whether an existing policy is equivalent to a desired one.
pub trait PolicyEquivalence {
    /// Returns the first policy in `existing` equivalent to `desired`, in
    /// the order given.
    fn find_equivalent<'a>(
        &self,
        desired: &CreatePruningPolicy,
        existing: &'a [PruningPolicy],
    ) -> Option<&'a PruningPolicy>;
}

/// Count-based matcher compatible with MSR tooling already in the field.
///
/// A candidate with a different number of rules is skipped. Otherwise every
/// candidate rule is compared with every desired rule sharing its field and
/// operator, and each candidate value found among the desired values counts
/// one match. The candidate is equivalent when the total equals its number
/// of rules.
///
/// The count approximates "every rule has a counterpart". A rule with
/// several values contributes several matches, and duplicate
/// `(field, operator)` pairs are compared crosswise, so the result can be
/// wrong both ways. Use [`MultisetEquality`] where that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchCount;

impl MatchCount {
    fn matches(candidate: &PruningPolicy, desired: &CreatePruningPolicy) -> usize {
        candidate
            .rules
            .iter()
            .flat_map(|existing| {
                desired
                    .rules
                    .iter()
                    .filter(move |wanted| {
                        existing.field == wanted.field && existing.operator == wanted.operator
                    })
                    .map(move |wanted| {
                        existing
                            .values
                            .iter()
                            .filter(|value| wanted.values.contains(*value))
                            .count()
                    })
            })
            .sum()
    }
}

impl PolicyEquivalence for MatchCount {
    fn find_equivalent<'a>(
        &self,
        desired: &CreatePruningPolicy,
        existing: &'a [PruningPolicy],
    ) -> Option<&'a PruningPolicy> {
        existing.iter().find(|candidate| {
            candidate.rules.len() == desired.rules.len()
                && Self::matches(candidate, desired) == candidate.rules.len()
        })
    }
}

/// Strict matcher: the rule lists must be equal as multisets, with the
/// values of each rule compared as sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultisetEquality;

impl MultisetEquality {
    fn normalize(rules: &[PruningPolicyRule]) -> Vec<(&str, &str, Vec<&str>)> {
        let mut normalized: Vec<_> = rules
            .iter()
            .map(|rule| {
                let mut values: Vec<&str> = rule.values.iter().map(String::as_str).collect();
                values.sort_unstable();
                values.dedup();
                (rule.field.as_str(), rule.operator.as_str(), values)
            })
            .collect();
        normalized.sort_unstable();
        normalized
    }
}

impl PolicyEquivalence for MultisetEquality {
    fn find_equivalent<'a>(
        &self,
        desired: &CreatePruningPolicy,
        existing: &'a [PruningPolicy],
    ) -> Option<&'a PruningPolicy> {
        let wanted = Self::normalize(&desired.rules);
        existing
            .iter()
            .filter(|candidate| candidate.rules.len() == desired.rules.len())
            .find(|candidate| Self::normalize(&candidate.rules) == wanted)
    }
}

/// Finds an equivalent policy with [`MatchCount`].
#[must_use]
pub fn find_equivalent<'a>(
    desired: &CreatePruningPolicy,
    existing: &'a [PruningPolicy],
) -> Option<&'a PruningPolicy> {
    MatchCount.find_equivalent(desired, existing)
}

impl MsrClient {
    /// Creates a pruning policy unless an equivalent one already exists,
    /// judged by [`MatchCount`].
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::PolicyConflict`] carrying the existing policy's id
    /// if one is equivalent, otherwise any error from listing or creating.
    pub async fn ensure_pruning_policy(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
        policy: &CreatePruningPolicy,
    ) -> Result<PruningPolicy> {
        self.ensure_pruning_policy_with(ctx, org, repo, policy, &MatchCount)
            .await
    }

    /// Like [`MsrClient::ensure_pruning_policy`] with a chosen matcher.
    ///
    /// # Errors
    ///
    /// Same as [`MsrClient::ensure_pruning_policy`].
    #[instrument(skip(self, ctx, policy, equivalence), fields(rules = policy.rules.len()))]
    pub async fn ensure_pruning_policy_with<E>(
        &self,
        ctx: &CallContext,
        org: &str,
        repo: &str,
        policy: &CreatePruningPolicy,
        equivalence: &E,
    ) -> Result<PruningPolicy>
    where
        E: PolicyEquivalence + Sync + ?Sized,
    {
        ensure_not_empty(policy, "CreatePruningPolicy")
            .context_with(|| format!("creating pruning policy for {org}/{repo}"))?;

        let existing = self.list_pruning_policies(ctx, org, repo).await?;
        if let Some(found) = equivalence.find_equivalent(policy, &existing) {
            info!(existing_id = %found.id, "Equivalent pruning policy already exists");
            return Err(MsrError::PolicyConflict {
                org: org.to_string(),
                repo: repo.to_string(),
                existing_id: found.id.clone(),
            });
        }

        self.create_pruning_policy(ctx, org, repo, policy).await
    }
}
