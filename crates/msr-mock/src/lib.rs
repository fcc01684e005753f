//! # MSR Mock
//!
//! In-memory stand-in for the MSR registry and identity APIs.
//!
//! The mock serves the same REST+JSON surface as MSR for accounts, teams,
//! team members, repositories and pruning policies, enforces basic auth, and
//! answers failures with MSR's `{"errors": [...]}` envelope (401 has an empty
//! body). Every request is journaled, and canned failures can be queued for
//! a given method and path.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use msr_mock::{Fault, MockHandle};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mock = MockHandle::start().await?;
//!     mock.registry().add_organization("acme").ok();
//!     mock.inject_fault(Fault::new("GET", "/health", 503, r#"{"errors":[]}"#));
//!
//!     println!("serving on {}", mock.url());
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
pub mod model;
mod routes;
mod state;

use std::net::SocketAddr;

use parking_lot::MutexGuard;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use error::{ErrorDetail, ErrorEnvelope, MockError};
pub use routes::app;
pub use state::{Fault, MockConfig, MockState, RecordedRequest, Registry};

/// Serves the mock on `listener` until the task is dropped.
///
/// # Errors
///
/// Returns an error if the server stops with an I/O failure.
pub async fn run(listener: TcpListener, config: &MockConfig) -> std::io::Result<()> {
    axum::serve(listener, app(MockState::new(config))).await
}

/// A mock running on an ephemeral local port. Stops when dropped.
pub struct MockHandle {
    addr: SocketAddr,
    state: MockState,
    task: JoinHandle<()>,
}

impl MockHandle {
    /// Starts a mock accepting `admin` / `password`.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(MockConfig::default()).await
    }

    /// Starts a mock with `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start_with(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = MockState::new(&config);
        let router = app(state.clone());

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });

        Ok(Self { addr, state, task })
    }

    /// Listening address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:40123`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Shared state.
    #[must_use]
    pub const fn state(&self) -> &MockState {
        &self.state
    }

    /// Locks the registry contents for seeding or inspection.
    ///
    /// Do not hold the guard while the client under test is running.
    #[must_use]
    pub fn registry(&self) -> MutexGuard<'_, Registry> {
        self.state.registry()
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests()
    }

    /// `METHOD path` of every request received so far.
    #[must_use]
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }

    /// Empties the journal.
    pub fn clear_requests(&self) {
        self.state.clear_requests();
    }

    /// Queues a canned response.
    pub fn inject_fault(&self, fault: Fault) {
        self.state.inject_fault(fault);
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
