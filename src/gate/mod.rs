//! Authorization decision engine
//!
//! Turns a raw request path and an optional token into a [`Verdict`]. Knows
//! nothing about HTTP; the routes layer renders the verdict.

mod decision;
mod path;

#[cfg(test)]
mod tests;

pub use decision::{DenyReason, Gate, Verdict};
pub use path::{normalize, AssetPath};
