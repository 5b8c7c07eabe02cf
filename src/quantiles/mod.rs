//! Quantile estimation algorithms
//!
//! This module provides estimators for tracking quantiles (percentiles)
//! of a data stream in constant memory.
//!
//! # Algorithms
//!
//! - [`PSquare`]: a single fixed quantile via the P² marker algorithm
//!
//! # Example
//!
//! ```
//! use streamquant::quantiles::PSquare;
//! use streamquant::traits::QuantileEstimator;
//!
//! let mut median = PSquare::new(0.5);
//!
//! for value in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0] {
//!     median.add(value);
//! }
//!
//! println!("Median: {:?}", median.quantile());
//! ```

mod psquare;

pub use psquare::{Marker, PSquare};
