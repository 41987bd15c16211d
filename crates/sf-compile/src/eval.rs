//! Slot-indexed evaluation records.
//!
//! An `EvalOp` writes one flow slot from at most two operands; operands
//! read either the flow array (recomputed every pass) or the stock array
//! (advanced by the integrator). The records are immutable once built.

use sf_core::Real;
use sf_graph::OpKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SlotSource {
    Flow,
    Stock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Operand {
    pub slot: usize,
    pub source: SlotSource,
}

impl Operand {
    pub fn flow(slot: usize) -> Self {
        Self {
            slot,
            source: SlotSource::Flow,
        }
    }

    pub fn stock(slot: usize) -> Self {
        Self {
            slot,
            source: SlotSource::Stock,
        }
    }

    pub fn is_flow(self) -> bool {
        self.source == SlotSource::Flow
    }

    #[inline]
    pub fn fetch(self, flow: &[Real], stock: &[Real]) -> Real {
        match self.source {
            SlotSource::Flow => flow[self.slot],
            SlotSource::Stock => stock[self.slot],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EvalOpKind {
    /// Pass-through (wire into a variable's slot).
    Copy,
    Time,
    Neg,
    Sqrt,
    Exp,
    Ln,
    Sin,
    Cos,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl From<OpKind> for EvalOpKind {
    fn from(op: OpKind) -> Self {
        match op {
            OpKind::Time => EvalOpKind::Time,
            OpKind::Neg => EvalOpKind::Neg,
            OpKind::Sqrt => EvalOpKind::Sqrt,
            OpKind::Exp => EvalOpKind::Exp,
            OpKind::Ln => EvalOpKind::Ln,
            OpKind::Sin => EvalOpKind::Sin,
            OpKind::Cos => EvalOpKind::Cos,
            OpKind::Add => EvalOpKind::Add,
            OpKind::Sub => EvalOpKind::Sub,
            OpKind::Mul => EvalOpKind::Mul,
            OpKind::Div => EvalOpKind::Div,
            OpKind::Pow => EvalOpKind::Pow,
        }
    }
}

impl EvalOpKind {
    pub fn num_args(self) -> usize {
        match self {
            EvalOpKind::Time => 0,
            EvalOpKind::Copy
            | EvalOpKind::Neg
            | EvalOpKind::Sqrt
            | EvalOpKind::Exp
            | EvalOpKind::Ln
            | EvalOpKind::Sin
            | EvalOpKind::Cos => 1,
            EvalOpKind::Add
            | EvalOpKind::Sub
            | EvalOpKind::Mul
            | EvalOpKind::Div
            | EvalOpKind::Pow => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EvalOpKind::Copy => "copy",
            EvalOpKind::Time => "time",
            EvalOpKind::Neg => "neg",
            EvalOpKind::Sqrt => "sqrt",
            EvalOpKind::Exp => "exp",
            EvalOpKind::Ln => "ln",
            EvalOpKind::Sin => "sin",
            EvalOpKind::Cos => "cos",
            EvalOpKind::Add => "add",
            EvalOpKind::Sub => "subtract",
            EvalOpKind::Mul => "multiply",
            EvalOpKind::Div => "divide",
            EvalOpKind::Pow => "pow",
        }
    }
}

/// One compiled scalar evaluation step. Output is always a flow slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalOp {
    pub kind: EvalOpKind,
    pub out: usize,
    pub in1: Option<Operand>,
    pub in2: Option<Operand>,
}

impl EvalOp {
    #[inline]
    pub fn eval(&self, flow: &mut [Real], stock: &[Real], t: Real) {
        let a = self.in1.map_or(0.0, |o| o.fetch(flow, stock));
        let b = self.in2.map_or(0.0, |o| o.fetch(flow, stock));
        flow[self.out] = match self.kind {
            EvalOpKind::Copy => a,
            EvalOpKind::Time => t,
            EvalOpKind::Neg => -a,
            EvalOpKind::Sqrt => a.sqrt(),
            EvalOpKind::Exp => a.exp(),
            EvalOpKind::Ln => a.ln(),
            EvalOpKind::Sin => a.sin(),
            EvalOpKind::Cos => a.cos(),
            EvalOpKind::Add => a + b,
            EvalOpKind::Sub => a - b,
            EvalOpKind::Mul => a * b,
            EvalOpKind::Div => a / b,
            EvalOpKind::Pow => a.powf(b),
        };
    }
}

/// Maps a stock slot to the flow operand that is its time derivative.
/// Integrals are advanced by the integrator, never evaluated in sequence;
/// a missing input means the stock is undriven (derivative 0).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integral {
    pub stock: usize,
    pub input: Option<Operand>,
}
