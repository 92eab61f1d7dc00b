//! Compares the gradients from `backward` against centered finite differences.

use valuegrad::{add, div, mul, neg, pow, relu, sub, tanh, Value};

const EPS: f64 = 1e-6;
const TOLERANCE: f64 = 1e-4;

fn check(inputs: &[f64], f: impl Fn(&[Value]) -> Value) {
    let leaves: Vec<Value> = inputs.iter().copied().map(Value::new).collect();
    let out = f(&leaves);
    out.backward();

    let eval = |x: &[f64]| {
        let leaves: Vec<Value> = x.iter().copied().map(Value::new).collect();
        f(&leaves).data()
    };

    for (i, leaf) in leaves.iter().enumerate() {
        let mut plus = inputs.to_vec();
        let mut minus = inputs.to_vec();
        plus[i] += EPS;
        minus[i] -= EPS;
        let numeric = (eval(&plus) - eval(&minus)) / (2. * EPS);
        let analytic = leaf.grad();
        assert!(
            (analytic - numeric).abs() < TOLERANCE * (1. + numeric.abs()),
            "input {i}: analytic {analytic}, numeric {numeric}"
        );
    }
}

#[test]
fn polynomial() {
    check(&[1.5, -0.7], |v| {
        let (x, y) = (&v[0], &v[1]);
        let cubic = pow(x, 3.);
        let cross = mul([Value::new(2.), x.clone(), y.clone()]);
        add([sub(&cubic, &cross), div(y, x)])
    });
}

#[test]
fn variable_exponent() {
    check(&[1.3, 2.2], |v| pow(&v[0], &v[1]));
    check(&[0.4, -1.5], |v| pow(&v[0], &v[1]));
}

#[test]
fn neuron() {
    check(&[0.5, -1.2, 0.8, 0.3, 0.1], |v| {
        let (x1, x2, w1, w2, b) = (&v[0], &v[1], &v[2], &v[3], &v[4]);
        let n = add([&(x1 * w1), &(x2 * w2), b]);
        tanh(&n)
    });
}

#[test]
fn relu_layer() {
    check(&[0.9, -0.4, 1.7], |v| {
        let h1 = relu(&v[0] * &v[2]);
        let h2 = relu(&v[1] * &v[2]);
        let h3 = relu(&v[0] - &v[1]);
        add([h1, h2, h3])
    });
}

#[test]
fn variadic_product() {
    check(&[1.1, -2.3, 0.7, 3.0], |v| mul(v));
}

#[test]
fn quotient_and_negation() {
    check(&[2.5, -0.6], |v| {
        let q = div(neg(&v[0]), &v[1]);
        tanh(&q / 4.) * &v[0]
    });
}

#[test]
fn shared_subexpressions() {
    check(&[0.3], |v| {
        let x = &v[0];
        let a = tanh(x);
        let b = &a * &a;
        let c = add([&b, &a, x]);
        pow(&c, 2.) - &b
    });
}
