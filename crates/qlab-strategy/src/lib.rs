//! qlab-strategy
//!
//! Parameter holder + abstract strategy contract.
//!
//! Contract:
//! - A strategy owns a free-form parameter set (name -> arbitrary value).
//! - Parameters change only through `add_parameter` / `remove_parameter`.
//!   No validation; last write wins; removing an absent name is a no-op.
//! - `simulate` / `eval` are extension points. No concrete strategy ships here.

mod holder;
mod types;

pub use holder::*;
pub use types::*;
