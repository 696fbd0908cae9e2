//! Periodic session validation for Sessionward.
//!
//! [`SessionMonitor`] runs an actor that watches the session and, while a
//! session is live, asks the auth service every few seconds whether the
//! token is still accepted:
//!
//! ```text
//!            session starts         token confirmed durable
//!   Idle ─────────────────▶ Starting ───────────────────▶ Checking ◀─┐
//!    ▲                         │ mismatch                  │ no      │ retry
//!    └─────────────────────────┘                           ▼ network │
//!                                                   ConnectionError ─┘
//!   any state ── session ends / token rejected ──▶ Stopped
//! ```
//!
//! All timers live in one [`CheckScheduler`] owned by the actor, so a
//! session change cancels them in the same step that observes it.
//!
//! # Integration
//!
//! ```ignore
//! let monitor = SessionMonitor::spawn(bundle.clone(), auth, MonitorConfig::default());
//! let mut banner = monitor.banner();
//! while banner.changed().await.is_ok() {
//!     let b = *banner.borrow();
//!     if b.active { show(b.title(), &b.message()) } else { hide() }
//! }
//! ```

mod banner;
mod config;
mod error;
mod monitor;
mod scheduler;

pub use banner::{ConnectionBanner, MonitorPhase};
pub use config::MonitorConfig;
pub use error::MonitorError;
pub use monitor::SessionMonitor;
pub use scheduler::{CheckScheduler, Due};
