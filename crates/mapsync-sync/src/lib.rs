//! MapSync Sync — delta reconciliation and subscription lifecycle.
//!
//! The reconciler turns a freshly fetched record list into the minimal
//! add/remove calls against what is already rendered. The lifecycle manager
//! owns every subscription made during an enable period and tears all of them
//! down exactly once when the overlay is disabled. `OverlaySession` bundles
//! both with the enable-period generation used to drop stale passes.

pub mod lifecycle;
pub mod reconcile;
pub mod session;

pub use lifecycle::{LifecycleManager, OverlayState, TeardownReport};
pub use reconcile::{reconcile, Reconciliation, RenderedSet};
pub use session::OverlaySession;
