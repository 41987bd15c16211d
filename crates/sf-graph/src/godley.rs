//! Godley tables: double-entry stock/flow bookkeeping.
//!
//! A table defines one stock per column; each column accumulates a signed
//! set of flow variables. The compiler turns every column into an integral
//! whose derivative is the signed sum of its flows.

use serde::{Deserialize, Serialize};

use crate::values::ValueId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GodleyColumn {
    /// Stock variable owned by this column.
    pub stock: ValueId,
    /// Signed flow entries; `true` means the flow adds to the stock.
    pub flows: Vec<(bool, ValueId)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GodleyTable {
    pub columns: Vec<GodleyColumn>,
}

impl GodleyTable {
    /// Row balance check: every flow must appear with both signs across the
    /// table (each transaction is a transfer between columns).
    pub fn balanced(&self) -> bool {
        use std::collections::BTreeMap;
        let mut net: BTreeMap<&str, i64> = BTreeMap::new();
        for col in &self.columns {
            for (add, flow) in &col.flows {
                *net.entry(flow.as_str()).or_default() += if *add { 1 } else { -1 };
            }
        }
        net.values().all(|&n| n == 0)
    }
}
