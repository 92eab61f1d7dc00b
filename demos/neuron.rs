//! A single tanh neuron with two inputs.

use valuegrad::{add, tanh, Value};

fn main() {
    env_logger::init();

    let x1 = Value::new(2.);
    let x2 = Value::new(0.);
    let w1 = Value::new(-3.);
    let w2 = Value::new(1.);
    let b = Value::new(6.881_373_587_019_543);

    let n = add([&x1 * &w1, &x2 * &w2, b.clone()]);
    let o = tanh(&n);
    o.backward();

    println!("o: {o:?}");
    for (name, v) in [("x1", &x1), ("x2", &x2), ("w1", &w1), ("w2", &w2), ("b", &b)] {
        println!("{name}: data {}, grad {}", v.data(), v.grad());
    }
}
