//! Reconciliation of desired state against MSR.
//!
//! - [`policy`]: equivalence matching for pruning policies and the
//!   create-if-absent operation built on it.
//! - [`membership`]: team membership convergence.
//!
//! None of these operations are transactional. Two runs against the same
//! team or repository at the same time can interleave their calls.

pub mod membership;
pub mod policy;

pub use membership::{ConvergenceStrategy, MemberFailure, MembershipPlan, MembershipReport};
pub use policy::{find_equivalent, MatchCount, MultisetEquality, PolicyEquivalence};
