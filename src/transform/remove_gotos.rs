//! Goto elimination.
//!
//! The algorithm is not written to be efficient (the simulation is re-run
//! from scratch for every rewrite attempt), and it does not need to be:
//! method bodies are small, and we care much more about the reconstruction
//! being obviously sound. For every goto we simulate where control actually
//! arrives under the structured semantics of the surrounding blocks, loops,
//! conditions, switches and try/catch blocks, and rewrite the goto into the
//! strongest structured equivalent:
//!
//! - a `nop`, when the goto jumps exactly where control would fall anyway
//!   (including a jump to an enclosing finally handler, which runs anyway);
//! - a `break` out of an enclosing loop or switch;
//! - a `continue` of an enclosing loop;
//! - an inlined `return`/`throw` of the jumped-to return sequence.
//!
//! Gotos with no structured equivalent are left alone. The sweep repeats
//! until it changes nothing, then [`remove_redundant_code`] deletes the dead
//! labels and nops left behind; if that exposes more opportunities the whole
//! pass runs again.
//!
//! The simulation works on a topology index (parent, next sibling and label
//! neighborhood of every node) built once per invocation, and threads a
//! visited set through `enter`/`exit` as the cycle-breaker: re-entering a
//! node means the simulated path loops forever, which is reported as "no
//! target".

use hashlink::LinkedHashSet;
use std::collections::HashMap;

use crate::ast::matching::*;
use crate::ast::*;
use crate::errors::AstError;
use crate::transform::remove_redundant_code::remove_redundant_code;

/// Nodes already considered during one `enter`/`exit` simulation. Insertion
/// order is kept so that traces stay deterministic.
type NodeSet = LinkedHashSet<NodeId::Id>;

/// Rewrite the residual gotos of `method` into structured jumps, in place.
///
/// Fails only on a malformed tree (a subtree linked from two parents) or on
/// a node kind the flow simulation has no rule for; a goto that cannot be
/// simplified is not an error.
pub fn remove_gotos(method: &mut MethodAst) -> Result<(), AstError> {
    trace!("removing gotos:\n{}", method.display(method.root()));

    loop {
        {
            let mut pass = GotoRemoval::new(method)?;
            pass.transform_leave_statements()?;

            loop {
                let mut modified = false;

                let gotos: Vec<NodeId::Id> = pass
                    .method
                    .expressions()
                    .filter(|&e| pass.method.expr(e).code == AstCode::Goto)
                    .collect();

                for g in gotos {
                    modified |= pass.try_simplify_goto(g)?;
                }

                if !modified {
                    break;
                }
            }
        }

        if !remove_redundant_code(method) {
            trace!("gotos removed:\n{}", method.display(method.root()));
            return Ok(());
        }

        // The deletions may expose new simplifications; rebuild everything
        // and run again.
        trace!("cleanup removed unreachable statements, repeating the pass");
    }
}

/// One invocation's working state: the topology index over the tree. All
/// maps are keyed by node id and die with the invocation.
struct GotoRemoval<'m> {
    method: &'m mut MethodAst,
    /// Structural parent. The method root maps to `None`.
    parent: HashMap<NodeId::Id, Option<NodeId::Id>>,
    /// Next child under the same parent. Last children are present with
    /// `None`, which is distinct from an absent key ("not indexed").
    next_sibling: HashMap<NodeId::Id, Option<NodeId::Id>>,
    /// The label immediately preceding a node among its siblings. Kept in
    /// sync with `node_after_label`; only the inverse direction is consulted
    /// by the rewrites.
    #[allow(dead_code)]
    label_before: HashMap<NodeId::Id, NodeId::Id>,
    /// The node immediately following a label among its siblings.
    node_after_label: HashMap<NodeId::Id, NodeId::Id>,
}

impl<'m> GotoRemoval<'m> {
    fn new(method: &'m mut MethodAst) -> Result<Self, AstError> {
        let mut pass = GotoRemoval {
            method,
            parent: HashMap::new(),
            next_sibling: HashMap::new(),
            label_before: HashMap::new(),
            node_after_label: HashMap::new(),
        };
        pass.index_topology()?;
        Ok(pass)
    }

    /// One pre-order descent to record, for every node, its parent, its next
    /// sibling, and the label that immediately precedes it.
    fn index_topology(&mut self) -> Result<(), AstError> {
        let root = self.method.root();
        self.parent.insert(root, None);

        let all: Vec<NodeId::Id> = self.method.self_and_children(root).collect();
        for node in all {
            let mut previous: Option<NodeId::Id> = None;

            for child in self.method.node(node).children() {
                if self.parent.contains_key(&child) {
                    return Err(AstError::ExpressionLinkedFromMultipleLocations(child));
                }
                self.parent.insert(child, Some(node));

                if let Some(prev) = previous {
                    if self.method.node(prev).is_label() {
                        self.label_before.insert(child, prev);
                        self.node_after_label.insert(prev, child);
                    }
                    self.next_sibling.insert(prev, Some(child));
                }

                previous = Some(child);
            }

            if let Some(last) = previous {
                self.next_sibling.insert(last, None);
            }
        }

        Ok(())
    }

    fn parent_of(&self, node: NodeId::Id) -> Option<NodeId::Id> {
        self.parent.get(&node).copied().flatten()
    }

    /// Strict ancestors of `node`, innermost first, lazily.
    fn ancestors(&self, node: NodeId::Id) -> impl Iterator<Item = NodeId::Id> + '_ {
        std::iter::successors(self.parent_of(node), move |&n| self.parent_of(n))
    }

    /// Enclosing try/catch blocks of `node`, innermost first.
    fn try_ancestors(&self, node: NodeId::Id) -> impl Iterator<Item = NodeId::Id> + '_ {
        self.ancestors(node)
            .filter(|&n| self.method.node(n).is_try_catch())
    }

    fn goto_label(&self, goto_id: NodeId::Id) -> NodeId::Id {
        match &self.method.expr(goto_id).operand {
            Some(Operand::Label(label)) => *label,
            _ => unreachable!("goto without a label operand"),
        }
    }

    /// Where does control land when we begin executing `node`? `Ok(None)`
    /// means the simulated path has no well-defined next point (a cycle, or
    /// control entering a forbidden region).
    fn enter(
        &self,
        node: NodeId::Id,
        visited: &mut NodeSet,
    ) -> Result<Option<NodeId::Id>, AstError> {
        if !visited.insert(node) {
            // Infinite loop.
            return Ok(None);
        }

        match self.method.node(node) {
            // A label executes no code; fall through.
            Node::Label(_) => self.exit(node, visited),
            Node::Expression(e) => {
                if e.code == AstCode::Goto {
                    self.enter_goto(node, visited)
                } else {
                    Ok(Some(node))
                }
            }
            Node::Block(_) | Node::Case(_) | Node::Catch(_) => {
                let block = self.method.block(node);
                if let Some(entry) = block.entry_goto {
                    self.enter(entry, visited)
                } else if block.body.is_empty() {
                    self.exit(node, visited)
                } else {
                    self.enter(block.body[0], visited)
                }
            }
            Node::Condition(c) => Ok(Some(c.condition)),
            Node::Loop(l) => match l.condition {
                Some(condition) => Ok(Some(condition)),
                None => self.enter(l.body, visited),
            },
            // A try block cannot be implicitly entered.
            Node::TryCatch(_) => Ok(Some(node)),
            Node::Switch(s) => Ok(Some(s.condition)),
        }
    }

    /// The goto case of [`enter`](Self::enter): simulate the jump itself,
    /// refusing jumps that would enter a try block anywhere but at its very
    /// start.
    fn enter_goto(
        &self,
        goto_id: NodeId::Id,
        visited: &mut NodeSet,
    ) -> Result<Option<NodeId::Id>, AstError> {
        let target = self.goto_label(goto_id);

        // Early exit: same innermost try block, so the simulated path
        // starts under the same finally handlers.
        if self.try_ancestors(goto_id).next() == self.try_ancestors(target).next() {
            return self.enter(target, visited);
        }

        // Outermost first, to find the first try block the target is in
        // but the goto is not.
        let mut source_chain: Vec<NodeId::Id> = self.try_ancestors(goto_id).collect();
        let mut target_chain: Vec<NodeId::Id> = self.try_ancestors(target).collect();
        source_chain.reverse();
        target_chain.reverse();

        let mut i = 0;
        while i < source_chain.len()
            && i < target_chain.len()
            && source_chain[i] == target_chain[i]
        {
            i += 1;
        }

        if i == target_chain.len() {
            // The target is in an enclosing or identical set of try blocks.
            return self.enter(target, visited);
        }

        let target_try = target_chain[i];

        // Entry into a try block is only permitted at its very start: the
        // target must be a leading top-level label of the try body, past
        // nothing but nops, other labels, and leading nested try blocks.
        let mut current = Some(target_try);
        while let Some(try_id) = current {
            current = None;

            let Node::TryCatch(t) = self.method.node(try_id) else {
                unreachable!()
            };
            for &n in &self.method.block(t.try_block).body {
                if self.method.node(n).is_label() {
                    if n == target {
                        return Ok(Some(target_try));
                    }
                } else if !match_code(self.method, n, AstCode::Nop) {
                    if self.method.node(n).is_try_catch() {
                        current = Some(n);
                    }
                    break;
                }
            }
        }

        // The goto jumps into the middle of a try block; there is no
        // structured representation for that.
        Ok(None)
    }

    /// Where does control land when `node` completes?
    fn exit(
        &self,
        node: NodeId::Id,
        visited: &mut NodeSet,
    ) -> Result<Option<NodeId::Id>, AstError> {
        let Some(parent) = self.parent_of(node) else {
            // Exited the method body.
            return Ok(None);
        };

        match self.method.node(parent) {
            Node::Block(_) | Node::Case(_) | Node::Catch(_) => {
                match self.next_sibling.get(&node) {
                    Some(&Some(next)) => self.enter(next, visited),
                    _ => self.exit(parent, visited),
                }
            }
            Node::Condition(_) => self.exit(parent, visited),
            // Finally blocks are completely ignored here: try blocks cannot
            // be entered, so completion falls through normally.
            Node::TryCatch(_) => self.exit(parent, visited),
            // Implicit exit from a switch is not allowed.
            Node::Switch(_) => Ok(None),
            // Completing the loop body re-enters the loop.
            Node::Loop(_) => self.enter(parent, visited),
            Node::Expression(_) | Node::Label(_) => Err(AstError::UnsupportedNode(parent)),
        }
    }

    /// Rewrite a goto at the tail of a try or catch body into an explicit
    /// `leave` when it falls through to a `leave`. This normalizes handler
    /// exits before classification.
    fn transform_leave_statements(&mut self) -> Result<(), AstError> {
        let gotos: Vec<NodeId::Id> = self
            .method
            .expressions()
            .filter(|&e| match_goto(self.method, e).is_some())
            .collect();

        for g in gotos {
            let mut visited = NodeSet::new();
            let Some(exit_target) = self.exit(g, &mut visited)? else {
                continue;
            };
            if !match_code(self.method, exit_target, AstCode::Leave) {
                continue;
            }

            let parent = self.parent_of(g);
            let grandparent = parent.and_then(|p| self.parent_of(p));
            let (Some(parent), Some(grandparent)) = (parent, grandparent) else {
                continue;
            };

            let at_handler_tail = self.method.node(parent).is_block_like()
                && matches!(
                    self.method.node(grandparent),
                    Node::Catch(_) | Node::TryCatch(_)
                )
                && self.method.block(parent).body.last() == Some(&g);

            if at_handler_tail {
                trace!("rewriting tail goto {} into a leave", g);
                let e = self.method.expr_mut(g);
                e.code = AstCode::Leave;
                e.operand = None;
            }
        }

        Ok(())
    }

    /// Try to rewrite one goto into its strongest structured equivalent.
    /// Returns whether the expression was modified.
    fn try_simplify_goto(&mut self, goto_id: NodeId::Id) -> Result<bool, AstError> {
        debug_assert!(self.method.expr(goto_id).code == AstCode::Goto);

        let target = {
            let mut visited = NodeSet::new();
            self.enter(goto_id, &mut visited)?
        };
        let Some(target) = target else {
            return Ok(false);
        };

        // The goto expression is seeded as visited because we do not want
        // the simulation to iterate over the node we plan to modify; the
        // simulated path then starts in the same try block, so the same
        // finally handlers execute.
        let mut visited = NodeSet::new();
        visited.insert(goto_id);

        // Natural fall-through: the goto jumps exactly where control would
        // arrive anyway.
        if self.exit(goto_id, &mut visited)? == Some(target) {
            trace!("goto {} falls through naturally; rewriting into a nop", goto_id);
            let ranges = std::mem::take(&mut self.method.expr_mut(goto_id).ranges);
            if let Some(t) = self.method.node_mut(target).as_expression_mut() {
                t.ranges.extend(ranges);
            }
            let e = self.method.expr_mut(goto_id);
            e.code = AstCode::Nop;
            e.operand = None;
            return Ok(true);
        }

        // A jump to the front of an enclosing finally handler is redundant:
        // leaving the try runs the handler anyway.
        visited.clear();
        visited.insert(goto_id);

        let mut redundant_finally = false;
        for try_id in self.try_ancestors(goto_id) {
            let Node::TryCatch(t) = self.method.node(try_id) else {
                unreachable!()
            };
            let Some(finally) = t.finally_block else {
                continue;
            };
            if self.enter(finally, &mut visited)? == Some(target) {
                redundant_finally = true;
                break;
            }
        }
        if redundant_finally {
            trace!("goto {} jumps to an enclosing finally; rewriting into a nop", goto_id);
            let e = self.method.expr_mut(goto_id);
            e.code = AstCode::Nop;
            e.operand = None;
            e.ranges.clear();
            return Ok(true);
        }

        // Break out of an enclosing loop or switch.
        visited.clear();
        visited.insert(goto_id);

        let mut loop_depth = 0;
        let mut switch_depth = 0;
        let mut break_block = None;

        for parent in self.ancestors(goto_id) {
            match self.method.node(parent) {
                Node::Loop(_) => {
                    loop_depth += 1;

                    let e = self.exit(parent, &mut visited)?;
                    if e == Some(target) {
                        break_block = Some(parent);
                        break;
                    }

                    // The loop may be followed by a try block whose front
                    // door is the target.
                    if let Some(e) = e {
                        if self.method.node(e).is_try_catch() {
                            if let Some(&first_child) = self.method.node(e).children().first() {
                                visited.clear();
                                if self.enter(first_child, &mut visited)? == Some(target) {
                                    break_block = Some(parent);
                                    break;
                                }
                            }
                        }
                    }
                }
                Node::Switch(_) => {
                    switch_depth += 1;

                    // A jump to the label right after the switch.
                    if let Some(&Some(next)) = self.next_sibling.get(&parent) {
                        if next == self.goto_label(goto_id) {
                            break_block = Some(parent);
                            break;
                        }
                    }
                }
                _ => {}
            }
        }

        visited.clear();
        visited.insert(goto_id);

        if let Some(b) = break_block {
            trace!("goto {} breaks out of {}", goto_id, b);
            // The operand stays only when the break needs a label to pick
            // the right one of several enclosing loops/switches.
            let keep_operand = loop_depth + switch_depth > 1;
            let e = self.method.expr_mut(goto_id);
            e.code = AstCode::LoopOrSwitchBreak;
            if !keep_operand {
                e.operand = None;
            }
            return Ok(true);
        }

        // Continue an enclosing loop.
        let mut loop_depth = 0;
        let mut continue_block = None;

        for parent in self.ancestors(goto_id) {
            if !self.method.node(parent).is_loop() {
                continue;
            }
            loop_depth += 1;

            let en = self.enter(parent, &mut visited)?;
            if en == Some(target) {
                continue_block = Some(parent);
                break;
            }
            if let Some(en) = en {
                if self.method.node(en).is_try_catch() {
                    if let Some(&first_child) = self.method.node(en).children().first() {
                        visited.clear();
                        if self.enter(first_child, &mut visited)? == Some(target) {
                            continue_block = Some(parent);
                            break;
                        }
                    }
                }
            }
        }

        if let Some(c) = continue_block {
            trace!("goto {} continues {}", goto_id, c);
            let keep_operand = loop_depth > 1;
            let e = self.method.expr_mut(goto_id);
            e.code = AstCode::LoopContinue;
            if !keep_operand {
                e.operand = None;
            }
            return Ok(true);
        }

        if self.try_inline_return(goto_id, target, AstCode::Return)
            || self.try_inline_return(goto_id, target, AstCode::AThrow)
        {
            trace!("goto {} inlined its return sequence", goto_id);
            return Ok(true);
        }

        Ok(false)
    }

    /// Inline the return (or throw) sequence a goto jumps to: either a
    /// direct `return e`, or a `store v <- e; return load v` pair, possibly
    /// with labels in between.
    fn try_inline_return(
        &mut self,
        goto_id: NodeId::Id,
        target: NodeId::Id,
        code: AstCode,
    ) -> bool {
        if let Some(arguments) = match_get_arguments(self.method, target, code) {
            if arguments.len() <= 1 {
                let argument = arguments.first().copied();
                let cloned = argument.map(|a| self.method.clone_expr(a));
                let e = self.method.expr_mut(goto_id);
                e.code = code;
                e.operand = None;
                e.arguments.clear();
                e.arguments.extend(cloned);
                return true;
            }
        }

        let mut next = self.next_sibling.get(&target).copied().flatten();
        while let Some(n) = next {
            if !self.method.node(n).is_label() {
                break;
            }
            next = self.node_after_label.get(&n).copied();
        }

        let Some(next) = next else {
            return false;
        };
        let Some((variable, stored)) = match_store(self.method, target) else {
            return false;
        };
        let Some(return_args) = match_get_arguments(self.method, next, code) else {
            return false;
        };
        let &[returned] = return_args else {
            return false;
        };
        if match_load(self.method, returned) != Some(variable) {
            return false;
        }

        let cloned = self.method.clone_expr(stored);
        let e = self.method.expr_mut(goto_id);
        e.code = code;
        e.operand = None;
        e.arguments.clear();
        e.arguments.push(cloned);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `[Store, Label, Return]` under the root, with the store's value as a
    /// nested argument.
    fn linear_method() -> (MethodAst, NodeId::Id, NodeId::Id, NodeId::Id, NodeId::Id) {
        let mut m = MethodAst::new();
        let v = m.new_variable("x");
        let one = m.new_expr(AstCode::LdC, Some(Operand::Constant(1)), vec![]);
        let store = m.new_store(v, one);
        let label = m.new_label("L_0");
        let ret = m.new_expr(AstCode::Return, None, vec![]);
        let root = m.root();
        m.push(root, store);
        m.push(root, label);
        m.push(root, ret);
        (m, store, label, ret, one)
    }

    #[test]
    fn topology_records_parents_and_siblings() {
        let (mut m, store, label, ret, one) = linear_method();
        let root = m.root();
        let pass = GotoRemoval::new(&mut m).unwrap();

        assert_eq!(pass.parent.get(&root), Some(&None));
        assert_eq!(pass.parent_of(store), Some(root));
        assert_eq!(pass.parent_of(one), Some(store));

        // A last child is present with `None`; a non-child is not indexed.
        assert_eq!(pass.next_sibling.get(&store), Some(&Some(label)));
        assert_eq!(pass.next_sibling.get(&ret), Some(&None));
        assert_eq!(pass.next_sibling.get(&root), None);
    }

    #[test]
    fn topology_records_label_neighborhood() {
        let (mut m, store, label, ret, _) = linear_method();
        let pass = GotoRemoval::new(&mut m).unwrap();

        assert_eq!(pass.label_before.get(&ret), Some(&label));
        assert_eq!(pass.node_after_label.get(&label), Some(&ret));
        assert_eq!(pass.label_before.get(&store), None);
    }

    #[test]
    fn aliased_subtree_is_rejected() {
        let mut m = MethodAst::new();
        let v = m.new_variable("x");
        let load = m.new_load(v);
        let a = m.new_expr(AstCode::Return, None, vec![load]);
        let b = m.new_expr(AstCode::AThrow, None, vec![load]);
        let root = m.root();
        m.push(root, a);
        m.push(root, b);

        assert_eq!(
            GotoRemoval::new(&mut m).err(),
            Some(AstError::ExpressionLinkedFromMultipleLocations(load))
        );
    }

    #[test]
    fn enter_returns_the_condition_expression() {
        let mut m = MethodAst::new();
        let v = m.new_variable("x");
        let cond_expr = m.new_load(v);
        let t = m.new_block(vec![]);
        let f = m.new_block(vec![]);
        let cond = m.new_condition(cond_expr, t, f);
        let root = m.root();
        m.push(root, cond);

        let pass = GotoRemoval::new(&mut m).unwrap();
        let mut visited = NodeSet::new();
        assert_eq!(pass.enter(cond, &mut visited).unwrap(), Some(cond_expr));
    }

    #[test]
    fn exit_of_last_statement_leaves_the_method() {
        let (mut m, store, ..) = linear_method();
        let root = m.root();
        let pass = GotoRemoval::new(&mut m).unwrap();

        let mut visited = NodeSet::new();
        assert_eq!(pass.exit(root, &mut visited).unwrap(), None);

        // The store falls through to the return past the label.
        let mut visited = NodeSet::new();
        let landed = pass.exit(store, &mut visited).unwrap();
        assert!(matches!(
            pass.method.node(landed.unwrap()),
            Node::Expression(e) if e.code == AstCode::Return
        ));
    }

    #[test]
    fn exit_from_a_case_body_has_no_target() {
        let mut m = MethodAst::new();
        let v = m.new_variable("x");
        let discr = m.new_load(v);
        let stmt = m.new_expr(AstCode::Nop, None, vec![]);
        let case = m.new_case(vec![0], vec![stmt]);
        let sw = m.new_switch(discr, vec![case]);
        let root = m.root();
        m.push(root, sw);

        let pass = GotoRemoval::new(&mut m).unwrap();
        let mut visited = NodeSet::new();
        assert_eq!(pass.exit(stmt, &mut visited).unwrap(), None);
    }

    #[test]
    fn self_loop_through_a_label_has_no_target() {
        // `L: goto L` cycles in the simulation, which must bail out instead
        // of diverging.
        let mut m = MethodAst::new();
        let l = m.new_label("L_0");
        let g = m.new_goto(l);
        let root = m.root();
        m.push(root, l);
        m.push(root, g);

        let pass = GotoRemoval::new(&mut m).unwrap();
        let mut visited = NodeSet::new();
        assert_eq!(pass.enter(g, &mut visited).unwrap(), None);
    }
}
