//! Reverse-mode traversal over the graph reachable from a node.

use std::collections::HashSet;

use log::{debug, trace, warn};

use crate::{error::NonFiniteError, ops::propagate, value::Value};

impl Value {
    /// Linearizes every node reachable from `self` so that each node comes
    /// after all of its predecessors. `self` is always the last element.
    ///
    /// This is a depth-first post-order walk with an explicit stack, visiting
    /// predecessors in argument order, so that deep graphs do not overflow the
    /// call stack.
    pub fn topological_order(&self) -> Vec<Value> {
        let mut order = vec![];
        let mut visited = HashSet::new();
        visited.insert(self.id());
        let mut stack = vec![(self.clone(), 0)];
        while let Some((node, next)) = stack.last_mut() {
            match node.predecessors().get(*next).cloned() {
                Some(pred) => {
                    *next += 1;
                    if visited.insert(pred.id()) {
                        stack.push((pred, 0));
                    }
                }
                None => {
                    if let Some((node, _)) = stack.pop() {
                        order.push(node);
                    }
                }
            }
        }
        order
    }

    /// The entry point to backpropagation.
    ///
    /// Gradients are accumulated, not reset: calling this twice, or on two
    /// outputs sharing a subgraph, sums the contributions. Use
    /// [`Value::zero_grad`] to start over.
    pub fn backward(&self) {
        self.backward_cb(&|_| ());
    }

    /// Same as [`Value::backward`], calling `callback` on each node right
    /// before its backward rule runs.
    pub fn backward_cb(&self, callback: &dyn Fn(&Value)) {
        let order = self.topological_order();
        debug!(
            "backward from `{}` node over {} nodes",
            self.op(),
            order.len()
        );
        self.0.grad.set(1.);
        for node in order.iter().rev() {
            trace!("rule `{}` with grad {}", node.op(), node.grad());
            callback(node);
            propagate(node);
        }
    }

    /// Runs [`Value::backward`] and reports the first non-finite number met.
    ///
    /// Forward values are checked first, in topological order, then every
    /// gradient written by a backward rule in the order the rules run. The
    /// traversal always completes, so the gradients are the same as those of
    /// [`Value::backward`].
    pub fn backward_checked(&self) -> Result<(), NonFiniteError> {
        let order = self.topological_order();
        let mut first = order
            .iter()
            .find(|node| !node.data().is_finite())
            .map(|node| NonFiniteError::Forward {
                op: node.op(),
                data: node.data(),
            });

        self.0.grad.set(1.);
        for node in order.iter().rev() {
            propagate(node);
            if first.is_some() {
                continue;
            }
            first = node
                .predecessors()
                .iter()
                .find(|pred| !pred.grad().is_finite())
                .map(|pred| NonFiniteError::Backward {
                    op: pred.op(),
                    by: node.op(),
                    grad: pred.grad(),
                });
        }

        match first {
            Some(err) => {
                warn!("{err}");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Resets the gradient of every node reachable from `self` to zero.
    pub fn zero_grad(&self) {
        for node in self.topological_order() {
            node.0.grad.set(0.);
        }
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use crate::{add, mul, relu, tanh, Op, Value};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn order_is_post_order() {
        let a = Value::new(1.);
        let b = Value::new(2.);
        let ab = &a * &b;
        let c = add([&ab, &a, &b]);
        let order = c.topological_order();
        assert_eq!(order.len(), 4);
        assert!(order[0].ptr_eq(&a));
        assert!(order[1].ptr_eq(&b));
        assert!(order[2].ptr_eq(&ab));
        assert!(order[3].ptr_eq(&c));
    }

    #[test]
    fn leaf_backward() {
        init();
        let a = Value::new(5.);
        a.backward();
        assert_eq!(a.grad(), 1.);
    }

    #[test]
    fn self_addition() {
        init();
        let x = Value::new(3.);
        let y = add([&x, &x]);
        y.backward();
        assert_eq!(y.data(), 6.);
        assert_eq!(x.grad(), 2.);
    }

    #[test]
    fn rules_run_once_in_reverse_order() {
        init();
        let x = Value::new(0.5);
        let a = mul([&x, &x]);
        let b = tanh(&a);
        let c = add([&b, &a, &x]);
        let visits = RefCell::new(vec![]);
        c.backward_cb(&|node| visits.borrow_mut().push(node.clone()));
        let visits = visits.into_inner();
        let ops: Vec<Op> = visits.iter().map(Value::op).collect();
        assert_eq!(ops, [Op::Add, Op::Tanh, Op::Mul, Op::Leaf]);
        assert!(visits[3].ptr_eq(&x));
    }

    #[test]
    fn accumulates_across_calls() {
        init();
        let x = Value::new(2.);
        let y = relu(&x);
        y.backward();
        y.backward();
        assert_eq!(y.grad(), 1.);
        assert_eq!(x.grad(), 2.);
        y.zero_grad();
        assert_eq!(y.grad(), 0.);
        assert_eq!(x.grad(), 0.);
        y.backward();
        assert_eq!(x.grad(), 1.);
    }

    #[test]
    fn deep_chain() {
        let x = Value::new(1.);
        let mut y = x.clone();
        for _ in 0..100_000 {
            y = add([&y, &Value::new(0.)]);
        }
        y.backward();
        assert_eq!(x.grad(), 1.);
    }
}
