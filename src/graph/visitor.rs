//! Match-based node visitors.
//!
//! [`Node::accept`](crate::graph::Node::accept) dispatches to one method per node kind.
//! Every method defaults to [`NodeVisitor::visit_unknown`], so a visitor only implements
//! the kinds it cares about.

use std::{collections::HashSet, fmt::Write};

use crate::{
    graph::{Action, BlockLabel, Graph, Node, NodeId, NodeStore, Terminator, Value},
    Result,
};

/// A visitor over graph nodes, threading a parameter of type `P` and returning `R`.
pub trait NodeVisitor<P, R> {
    /// Fallback for node kinds the visitor does not handle specifically.
    fn visit_unknown(&mut self, param: &mut P, node: &Node) -> R;

    /// Visits a block entry marker.
    fn visit_entry(&mut self, param: &mut P, node: &Node, _label: &BlockLabel) -> R {
        self.visit_unknown(param, node)
    }

    /// Visits a value.
    fn visit_value(&mut self, param: &mut P, node: &Node, _value: &Value) -> R {
        self.visit_unknown(param, node)
    }

    /// Visits an action.
    fn visit_action(&mut self, param: &mut P, node: &Node, _action: &Action) -> R {
        self.visit_unknown(param, node)
    }

    /// Visits a terminator.
    fn visit_terminator(&mut self, param: &mut P, node: &Node, _terminator: &Terminator) -> R {
        self.visit_unknown(param, node)
    }
}

/// Output buffer and the id of the node being printed.
pub struct PrintState {
    out: String,
    current: NodeId,
}

/// Renders a graph as text, one block at a time.
///
/// Within a block, nodes are printed in dependency order starting from the terminator.
/// A value shared between blocks is printed in the first block that uses it.
#[derive(Debug, Default)]
pub struct GraphPrinter;

impl GraphPrinter {
    /// Prints every reachable block of `graph`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph refers to nodes missing from `store`.
    pub fn print(graph: &Graph, store: &NodeStore) -> Result<String> {
        let mut printer = GraphPrinter;
        let mut state = PrintState {
            out: String::new(),
            current: NodeId::new(0),
        };
        let mut printed = HashSet::new();
        let _ = writeln!(state.out, "{}", graph.element());

        for block_id in graph.reachable_blocks(store)? {
            let block = graph.block(block_id)?;
            let mut order = Vec::new();
            let mut stack = vec![(block.terminator(), false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    order.push(id);
                    continue;
                }
                if !printed.insert(id) {
                    continue;
                }
                stack.push((id, true));
                let node = store.get(id)?;
                for dep in node.value_dependencies().into_iter().rev() {
                    stack.push((dep, false));
                }
                if let Ok(dep) = node.ordering_dependency(0) {
                    stack.push((dep, false));
                }
            }

            let _ = writeln!(state.out, "{block_id}:");
            for id in order {
                state.current = id;
                store.get(id)?.accept(&mut printer, &mut state);
            }
        }
        Ok(state.out)
    }
}

impl NodeVisitor<PrintState, ()> for GraphPrinter {
    fn visit_unknown(&mut self, state: &mut PrintState, _node: &Node) {
        let _ = writeln!(state.out, "  {} = ?", state.current);
    }

    fn visit_entry(&mut self, state: &mut PrintState, _node: &Node, label: &BlockLabel) {
        let _ = writeln!(state.out, "  {} = entry L{}", state.current, label.serial());
    }

    fn visit_value(&mut self, state: &mut PrintState, _node: &Node, value: &Value) {
        let _ = writeln!(state.out, "  {} = {value}", state.current);
    }

    fn visit_action(&mut self, state: &mut PrintState, _node: &Node, action: &Action) {
        let _ = writeln!(state.out, "  {} = {action}", state.current);
    }

    fn visit_terminator(&mut self, state: &mut PrintState, _node: &Node, terminator: &Terminator) {
        let _ = writeln!(state.out, "  {terminator}");
    }
}
