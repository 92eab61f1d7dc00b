use std::{cell::Cell, fmt, rc::Rc};

/// The operation that produced a node. It also selects the node's backward
/// rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Leaf,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Neg,
    Relu,
    Tanh,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        use Op::*;
        match self {
            Leaf => "leaf",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Pow => "**",
            Neg => "neg",
            Relu => "relu",
            Tanh => "tanh",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) struct ValuePayload {
    pub(crate) data: f64,
    pub(crate) grad: Cell<f64>,
    pub(crate) op: Op,
    pub(crate) predecessors: Vec<Value>,
}

impl Drop for ValuePayload {
    // Unlinks predecessors iteratively; the default drop glue recurses once per
    // level and overflows on long chains.
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.predecessors);
        while let Some(value) = stack.pop() {
            if let Ok(mut payload) = Rc::try_unwrap(value.0) {
                stack.append(&mut payload.predecessors);
            }
        }
    }
}

/// A handle to a scalar node in the computation graph.
///
/// Cloning a `Value` clones the handle, not the node: every clone refers to the
/// same data and the same gradient accumulator. A node lives as long as any
/// dependent or any outside handle still refers to it.
#[derive(Clone)]
pub struct Value(pub(crate) Rc<ValuePayload>);

impl Value {
    /// Creates a leaf node with no predecessors and a zero gradient.
    pub fn new(data: f64) -> Self {
        Self::new_payload(data, Op::Leaf, vec![])
    }

    pub(crate) fn new_payload(data: f64, op: Op, predecessors: Vec<Value>) -> Self {
        Self(Rc::new(ValuePayload {
            data,
            grad: Cell::new(0.),
            op,
            predecessors,
        }))
    }

    /// The value computed in the forward pass.
    pub fn data(&self) -> f64 {
        self.0.data
    }

    /// The gradient accumulated so far by backward passes.
    pub fn grad(&self) -> f64 {
        self.0.grad.get()
    }

    pub fn op(&self) -> Op {
        self.0.op
    }

    /// The operands this node was built from, in argument order. The same
    /// node may appear more than once.
    pub fn predecessors(&self) -> &[Value] {
        &self.0.predecessors
    }

    pub(crate) fn accum_grad(&self, grad: f64) {
        self.0.grad.set(self.0.grad.get() + grad);
    }

    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Whether both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<f64> for Value {
    fn from(data: f64) -> Self {
        Self::new(data)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("data", &self.data())
            .field("grad", &self.grad())
            .field("op", &self.op())
            .field("predecessors", &self.predecessors().len())
            .finish()
    }
}
