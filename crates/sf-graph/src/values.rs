//! Variable value registry.
//!
//! `VariableValue`s are keyed by a canonical, scope-qualified value id
//! (`:name` at global scope, `group:name` inside a group). They are created
//! on first reference and garbage-collected once no item refers to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sf_core::Real;

use crate::error::{GraphError, GraphResult};

/// Canonical, scope-qualified variable key.
pub type ValueId = String;

/// Build a canonical value id from an optional scope and a bare name.
pub fn value_id(scope: Option<&str>, name: &str) -> ValueId {
    match scope {
        Some(s) => format!("{s}:{name}"),
        None => format!(":{name}"),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// Advanced by time integration.
    Stock,
    /// Recomputed on every evaluation pass.
    Flow,
    Parameter,
    Constant,
    /// The result of an integral item; stock-like.
    Integral,
    /// Compiler scratch value, never persisted.
    Temp,
}

impl VarKind {
    /// Stock-like values live in the stock array and are advanced by the
    /// integrator rather than the equation vector.
    pub fn is_stock_like(self) -> bool {
        matches!(self, VarKind::Stock | VarKind::Integral)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableValue {
    pub kind: VarKind,
    /// Numeric storage slot, assigned at compile time.
    pub slot: Option<usize>,
    /// Initial-value expression: a literal or a reference to another value id.
    pub init: String,
    /// Live value, updated after each evaluation pass / integration step.
    pub value: Real,
}

impl VariableValue {
    pub fn new(kind: VarKind) -> Self {
        Self {
            kind,
            slot: None,
            init: String::new(),
            value: 0.0,
        }
    }
}

/// Registry of all variable values in a model.
#[derive(Clone, Debug, Default)]
pub struct VariableValues {
    map: BTreeMap<ValueId, VariableValue>,
}

impl VariableValues {
    /// Look up a value, creating it with the given kind on first reference.
    pub fn ensure(&mut self, id: &str, kind: VarKind) -> &mut VariableValue {
        self.map
            .entry(id.to_string())
            .or_insert_with(|| VariableValue::new(kind))
    }

    pub fn get(&self, id: &str) -> Option<&VariableValue> {
        self.map.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut VariableValue> {
        self.map.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<VariableValue> {
        self.map.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ValueId, &VariableValue)> {
        self.map.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ValueId, &mut VariableValue)> {
        self.map.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Forget all compiled slot assignments (kept values survive a recompile).
    pub fn reset_slots(&mut self) {
        for v in self.map.values_mut() {
            v.slot = None;
        }
    }

    /// Evaluate an initial-value expression: a numeric literal, an empty
    /// string (0), or a reference to another value id, followed through a
    /// short chain.
    pub fn init_value(&self, id: &str) -> GraphResult<Real> {
        self.init_value_depth(id, 0)
    }

    fn init_value_depth(&self, id: &str, depth: usize) -> GraphResult<Real> {
        // bounded so mutually-referring initial conditions terminate
        if depth > 8 {
            return Err(GraphError::BadInit {
                value: id.to_string(),
                init: "initial condition reference chain too deep".to_string(),
            });
        }
        let v = self
            .map
            .get(id)
            .ok_or_else(|| GraphError::UnknownValue(id.to_string()))?;
        let init = v.init.trim();
        if init.is_empty() {
            return Ok(0.0);
        }
        if let Ok(x) = init.parse::<Real>() {
            return Ok(x);
        }
        let target = if init.contains(':') {
            init.to_string()
        } else {
            value_id(None, init)
        };
        if self.map.contains_key(&target) {
            self.init_value_depth(&target, depth + 1)
        } else {
            Err(GraphError::BadInit {
                value: id.to_string(),
                init: init.to_string(),
            })
        }
    }
}
