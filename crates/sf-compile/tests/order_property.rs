//! Property: every acyclic graph compiles into an equation vector that
//! satisfies the ordering invariant.

use proptest::prelude::*;
use sf_compile::{check_equation_order, compile};
use sf_graph::{Graph, OpKind, VarKind};

const UNARY: [OpKind; 4] = [OpKind::Neg, OpKind::Exp, OpKind::Sin, OpKind::Cos];
const BINARY: [OpKind; 4] = [OpKind::Add, OpKind::Sub, OpKind::Mul, OpKind::Div];

/// Build a random feed-forward graph: each new operation wires only from
/// outputs created before it, so the result is acyclic by construction.
fn build(graph_ops: &[(u8, usize, usize)]) -> Graph {
    let mut g = Graph::new();
    let a = g.add_variable(":a", VarKind::Parameter, "1.5");
    let b = g.add_variable(":b", VarKind::Parameter, "0.5");
    let mut outputs = vec![
        g.item(a).unwrap().output_port().unwrap(),
        g.item(b).unwrap().output_port().unwrap(),
    ];

    for &(sel, i1, i2) in graph_ops {
        let src1 = outputs[i1 % outputs.len()];
        let src2 = outputs[i2 % outputs.len()];
        let item = if sel % 2 == 0 {
            let op = g.add_op(UNARY[(sel / 2) as usize % UNARY.len()]);
            let input = g.item(op).unwrap().input_ports()[0];
            g.add_wire(src1, input).unwrap();
            op
        } else {
            let op = g.add_op(BINARY[(sel / 2) as usize % BINARY.len()]);
            let inputs: Vec<_> = g.item(op).unwrap().input_ports().to_vec();
            g.add_wire(src1, inputs[0]).unwrap();
            g.add_wire(src2, inputs[1]).unwrap();
            op
        };
        outputs.push(g.item(item).unwrap().output_port().unwrap());
    }

    // consume the last output so the chain is part of the system
    let sink = g.add_variable(":sink", VarKind::Flow, "");
    let sink_in = g.item(sink).unwrap().input_ports()[0];
    g.add_wire(*outputs.last().unwrap(), sink_in).unwrap();
    g
}

proptest! {
    #[test]
    fn acyclic_graphs_compile_in_order(
        ops in prop::collection::vec((any::<u8>(), 0..64usize, 0..64usize), 1..25)
    ) {
        let mut g = build(&ops);
        prop_assert!(!sf_graph::has_cycle(&g));
        let sys = compile(&mut g).unwrap();
        prop_assert!(check_equation_order(&sys));
    }
}
