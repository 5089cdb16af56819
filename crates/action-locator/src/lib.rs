//! Target resolution - ordered fallback chain for locating UI elements
//!
//! The target applications are not under our control and their markup drifts,
//! so a named target carries several ways to find it:
//! - specific selectors observed for that UI
//! - generic element-type selectors
//! - a case-insensitive text scan
//! - an authenticated REST lookup producing a deep link
//! - an explicit, opt-in "first match" substitute
//!
//! Strategies run strictly in that order and stop at the first hit.

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
