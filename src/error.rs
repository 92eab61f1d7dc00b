use thiserror::Error;

use crate::Op;

/// The first non-finite number found by [`Value::backward_checked`](crate::Value::backward_checked).
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum NonFiniteError {
    #[error("non-finite value {data} computed by `{op}` in the forward pass")]
    Forward { op: Op, data: f64 },

    #[error("non-finite gradient {grad} accumulated into `{op}` node by the `{by}` rule")]
    Backward { op: Op, by: Op, grad: f64 },
}
