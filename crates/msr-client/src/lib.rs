//! # MSR Client
//!
//! Reconciliation client for the Mirantis Secure Registry (MSR) management
//! APIs.
//!
//! This crate manages MSR accounts, organizations, teams, repositories and
//! tag pruning policies over MSR's REST+JSON API, and converges remote state
//! towards a declared desired state.
//!
//! ## Features
//!
//! - **Transport**: basic auth on every request, a typed error for every
//!   failure class, and per-call deadlines and cancellation
//! - **Resource operations**: create/read/update/delete for each resource
//!   kind, filtered account listing, team member management
//! - **Composite ids**: `org/child` identifiers for resources MSR keys by
//!   a pair
//! - **Reconciliation**: create-if-absent for pruning policies and team
//!   membership convergence
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use msr_client::{CallContext, ConvergenceStrategy, MsrClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MsrClient::new("https://msr.example.com", "admin", "secret")?;
//!     let ctx = CallContext::background();
//!
//!     let info = client.verify(&ctx).await?;
//!     println!("MSR {}", info.version);
//!
//!     let report = client
//!         .converge_team_members(&ctx, "acme", "devs", &["alice", "bob"], ConvergenceStrategy::Diff)
//!         .await?;
//!     println!("added {:?}, removed {:?}", report.added, report.removed);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Reconciliation                        │
//! │        (policy equivalence, membership convergence)         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Resource operations                     │
//! │  ┌──────────┐  ┌──────────┐  ┌────────────┐  ┌──────────┐   │
//! │  │ Accounts │  │  Teams   │  │Repositories│  │ Pruning  │   │
//! │  └──────────┘  └──────────┘  └────────────┘  └──────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          MsrClient                          │
//! │   (basic auth, CallContext guard, response classification)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod account;
mod client;
mod config;
mod context;
mod error;
mod health;
pub mod ids;
mod password;
mod pruning;
pub mod reconcile;
mod repository;
mod team;

pub use account::{Account, AccountFilter, CreateAccount, UpdateAccount};
pub use client::{classify_response, ApiErrorDetail, ErrorEnvelope, MsrClient};
pub use config::{ClientConfig, Credentials, TlsMode, DEFAULT_TIMEOUT};
pub use context::{CallContext, CancelHandle};
pub use error::{ErrorKind, MsrError, Result, TransportCause};
pub use health::{HealthStatus, ServerInfo};
pub use ids::{decode_resource_id, encode_resource_id, ResourceId, ID_DELIMITER};
pub use password::generate_password;
pub use pruning::{CreatePruningPolicy, PruningPolicy, PruningPolicyRule};
pub use reconcile::{
    ConvergenceStrategy, MatchCount, MembershipReport, MultisetEquality, PolicyEquivalence,
};
pub use repository::{CreateRepository, Repository, UpdateRepository, Visibility};
pub use team::{CreateTeam, Team, TeamMember, UpdateTeam};
