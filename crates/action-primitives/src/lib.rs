//! Action primitives - the atomic browser operations a scene is built from
//!
//! Every primitive:
//! - checks its [`ExecCtx`] for cancellation and deadline before touching the page
//! - bounds each driver call by the remaining deadline
//! - returns an [`ActionReport`] or an [`ActionError`], never panics past its boundary
//!
//! Readiness polling ([`Readiness`], [`WaitStrategy`]) is kept separate from the
//! presentation delay ([`ActionPrimitives::present`]), which is pure pacing.

pub mod errors;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
