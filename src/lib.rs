//! Reverse-mode automatic differentiation over scalar values.
//!
//! Operations build a graph of [`Value`] nodes eagerly, and
//! [`Value::backward`] fills in the gradient of every node reachable from the
//! output.
//!
//! ```
//! use valuegrad::{mul, tanh, Value};
//!
//! let x = Value::new(0.5);
//! let w = Value::new(-2.);
//! let y = tanh(mul([&x, &w]));
//! y.backward();
//! assert_eq!(x.grad(), (1. - y.data().powi(2)) * w.data());
//! ```

mod backward;
pub mod error;
mod ops;
mod value;

pub use ops::{add, div, mul, neg, pow, relu, sub, tanh};
pub use value::{Op, Value};

#[cfg(feature = "macro")]
pub use valuegrad_macro::valuegrad;
