//! Graph-building operations. Each one computes its result eagerly and records
//! its operands, so that [`propagate`] can later apply the chain rule.

use crate::value::{Op, Value};

fn collect<I>(operands: I) -> Vec<Value>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    operands.into_iter().map(Into::into).collect()
}

/// Sum of all operands. An empty operand list yields 0.
pub fn add<I>(operands: I) -> Value
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let operands = collect(operands);
    let data = operands.iter().fold(0., |acc, v| acc + v.data());
    Value::new_payload(data, Op::Add, operands)
}

pub fn sub(lhs: impl Into<Value>, rhs: impl Into<Value>) -> Value {
    let (lhs, rhs) = (lhs.into(), rhs.into());
    Value::new_payload(lhs.data() - rhs.data(), Op::Sub, vec![lhs, rhs])
}

/// Product of all operands. An empty operand list yields 1.
///
/// The backward rule divides the product by each operand instead of
/// multiplying the others together, so an operand equal to zero gets a NaN or
/// infinite gradient.
pub fn mul<I>(operands: I) -> Value
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let operands = collect(operands);
    let data = operands.iter().fold(1., |acc, v| acc * v.data());
    Value::new_payload(data, Op::Mul, operands)
}

pub fn div(lhs: impl Into<Value>, rhs: impl Into<Value>) -> Value {
    let (lhs, rhs) = (lhs.into(), rhs.into());
    Value::new_payload(lhs.data() / rhs.data(), Op::Div, vec![lhs, rhs])
}

/// `base` raised to a real `exp`. The gradient with respect to the exponent
/// takes `ln(base)`, which is NaN for negative bases.
pub fn pow(base: impl Into<Value>, exp: impl Into<Value>) -> Value {
    let (base, exp) = (base.into(), exp.into());
    Value::new_payload(base.data().powf(exp.data()), Op::Pow, vec![base, exp])
}

pub fn neg(term: impl Into<Value>) -> Value {
    let term = term.into();
    Value::new_payload(-term.data(), Op::Neg, vec![term])
}

pub fn relu(term: impl Into<Value>) -> Value {
    let term = term.into();
    // NaN passes through unchanged
    let data = if term.data() < 0. { 0. } else { term.data() };
    Value::new_payload(data, Op::Relu, vec![term])
}

pub fn tanh(term: impl Into<Value>) -> Value {
    let term = term.into();
    Value::new_payload(term.data().tanh(), Op::Tanh, vec![term])
}

/// Adds the contribution of `out`'s current gradient to each of its
/// predecessors' gradients.
pub(crate) fn propagate(out: &Value) {
    use Op::*;
    let grad = out.grad();
    match (out.op(), out.predecessors()) {
        (Add, terms) => {
            for term in terms {
                term.accum_grad(1. * grad);
            }
        }
        (Sub, [lhs, rhs]) => {
            lhs.accum_grad(grad);
            rhs.accum_grad(-grad);
        }
        (Mul, terms) => {
            for term in terms {
                term.accum_grad(grad * out.data() / term.data());
            }
        }
        (Div, [lhs, rhs]) => {
            lhs.accum_grad(1. / rhs.data() * grad);
            rhs.accum_grad(-lhs.data() / rhs.data().powi(2) * grad);
        }
        (Pow, [base, exp]) => {
            let (b, e) = (base.data(), exp.data());
            base.accum_grad(e * b.powf(e - 1.) * grad);
            exp.accum_grad(b.ln() * b.powf(e) * grad);
        }
        (Neg, [term]) => term.accum_grad(-1. * grad),
        (Relu, [term]) => {
            let local = if out.data() > 0. { 1. } else { 0. };
            term.accum_grad(local * grad);
        }
        (Tanh, [term]) => term.accum_grad((1. - out.data().powi(2)) * grad),
        // Leaves have no rule. Constructors fix the arity of the others.
        _ => (),
    }
}

impl Value {
    pub fn pow(&self, exp: impl Into<Value>) -> Value {
        pow(self, exp)
    }

    pub fn relu(&self) -> Value {
        relu(self)
    }

    pub fn tanh(&self) -> Value {
        tanh(self)
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $f:ident) => {
        impl std::ops::$trait<&Value> for &Value {
            type Output = Value;
            fn $method(self, rhs: &Value) -> Value {
                $f(self, rhs)
            }
        }

        impl std::ops::$trait<Value> for Value {
            type Output = Value;
            fn $method(self, rhs: Value) -> Value {
                $f(self, rhs)
            }
        }

        impl std::ops::$trait<&Value> for Value {
            type Output = Value;
            fn $method(self, rhs: &Value) -> Value {
                $f(self, rhs)
            }
        }

        impl std::ops::$trait<Value> for &Value {
            type Output = Value;
            fn $method(self, rhs: Value) -> Value {
                $f(self, rhs)
            }
        }

        impl std::ops::$trait<f64> for &Value {
            type Output = Value;
            fn $method(self, rhs: f64) -> Value {
                $f(self, rhs)
            }
        }

        impl std::ops::$trait<f64> for Value {
            type Output = Value;
            fn $method(self, rhs: f64) -> Value {
                $f(self, rhs)
            }
        }

        impl std::ops::$trait<&Value> for f64 {
            type Output = Value;
            fn $method(self, rhs: &Value) -> Value {
                $f(self, rhs)
            }
        }
    };
}

fn add2(lhs: impl Into<Value>, rhs: impl Into<Value>) -> Value {
    add([lhs.into(), rhs.into()])
}

fn mul2(lhs: impl Into<Value>, rhs: impl Into<Value>) -> Value {
    mul([lhs.into(), rhs.into()])
}

impl_binop!(Add, add, add2);
impl_binop!(Sub, sub, sub);
impl_binop!(Mul, mul, mul2);
impl_binop!(Div, div, div);

impl std::ops::Neg for &Value {
    type Output = Value;
    fn neg(self) -> Value {
        neg(self)
    }
}

impl std::ops::Neg for Value {
    type Output = Value;
    fn neg(self) -> Value {
        neg(self)
    }
}
