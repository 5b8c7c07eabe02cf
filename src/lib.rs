//! # Streamquant
//!
//! Constant-memory quantile estimation for streams of numbers.
//!
//! Streamquant implements the P² ("P-square") algorithm: a single target
//! quantile (median, p95, ...) is estimated from an unbounded stream
//! without storing any observation. Five tracked marker points
//! approximate the cumulative distribution and are adjusted
//! incrementally as each value arrives.
//!
//! ## Features
//!
//! - **Constant Memory**: five markers and a counter, no allocation
//! - **O(1) Updates**: a fixed, small amount of arithmetic per value
//! - **Exact Extremes**: the outer markers track the true min and max
//! - **Deterministic**: identical inputs produce bit-identical state
//!
//! ## Quick Start
//!
//! ```rust
//! use streamquant::prelude::*;
//!
//! // Track the 95th percentile of a latency stream
//! let mut p95 = PSquare::new(0.95);
//! for sample in [12.0, 8.4, 9.1, 30.2, 11.7, 10.3, 9.8, 41.0] {
//!     p95.add(sample);
//! }
//!
//! let estimate = p95.quantile().unwrap();
//! assert!(estimate >= 8.4 && estimate <= 41.0);
//! ```
//!
//! ## Tracking Several Quantiles
//!
//! One estimator tracks one quantile. Run several side by side for a
//! percentile spread:
//!
//! ```rust
//! use streamquant::prelude::*;
//!
//! let mut p50 = PSquare::new(0.5);
//! let mut p99 = PSquare::new(0.99);
//!
//! for i in 1..=1000 {
//!     p50.add(i as f64);
//!     p99.add(i as f64);
//! }
//!
//! assert!(p50.quantile().unwrap() < p99.quantile().unwrap());
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support
//! - `serde`: Enable serialization of estimator state

#![cfg_attr(not(feature = "std"), no_std)]

// Core traits always available
pub mod traits;

pub mod quantiles;

pub mod prelude {
    pub use crate::traits::*;

    pub use crate::quantiles::PSquare;
}

pub use quantiles::PSquare;
