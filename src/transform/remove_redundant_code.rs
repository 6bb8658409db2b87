//! Cleanup after goto elimination: dead labels, nop and leave markers,
//! redundant trailing continues/breaks/returns, and statements made
//! unreachable by the rewrites.

use hashlink::LinkedHashSet;

use crate::ast::matching::*;
use crate::ast::*;

/// Remove the redundant code the goto rewrites leave behind. Returns whether
/// any unreachable statement was deleted, in which case the caller reruns
/// the whole pass: the deletions may expose new simplifications.
pub fn remove_redundant_code(method: &mut MethodAst) -> bool {
    remove_dead_labels_and_nops(method);
    remove_redundant_continues(method);
    cleanup_switches(method);
    remove_trailing_return(method);
    remove_unreachable_statements(method)
}

/// Collect the labels still targeted by a branch, folding gotos that jump to
/// the front of a protected-region handler into `leave` markers on the way,
/// then prune every block body of nops, leaves and dead labels.
fn remove_dead_labels_and_nops(method: &mut MethodAst) {
    let mut live_labels: LinkedHashSet<NodeId::Id> = LinkedHashSet::new();
    let try_blocks: Vec<NodeId::Id> = method.try_catch_blocks().collect();
    let expressions: Vec<NodeId::Id> = method.expressions().collect();

    for e in expressions {
        if !method.expr(e).is_branch() {
            continue;
        }

        if let Some(target) = match_goto(method, e) {
            if fold_protected_exit(method, &try_blocks, e, target) {
                // The target is not counted as live.
                continue;
            }
        }

        for t in method.expr(e).branch_targets() {
            live_labels.insert(t);
        }
    }

    let blocks: Vec<NodeId::Id> = method.blocks().collect();
    for b in blocks {
        let keep: Vec<bool> = method
            .block(b)
            .body
            .iter()
            .map(|&n| {
                !(match_code(method, n, AstCode::Nop)
                    || match_code(method, n, AstCode::Leave)
                    || (method.node(n).is_label() && !live_labels.contains(&n)))
            })
            .collect();
        let mut keep = keep.iter();
        method.block_mut(b).body.retain(|_| *keep.next().unwrap());
    }
}

/// An explicit jump to the first statement of a finally handler (or of a
/// lone catch handler when there is no finally) marks an exit from the
/// protected region: rewrite it into a `leave`.
fn fold_protected_exit(
    method: &mut MethodAst,
    try_blocks: &[NodeId::Id],
    goto_id: NodeId::Id,
    target: NodeId::Id,
) -> bool {
    for &t in try_blocks {
        let Node::TryCatch(tc) = method.node(t) else {
            unreachable!()
        };

        let first_in_handler = if let Some(finally) = tc.finally_block {
            method.block(finally).body.first().copied()
        } else if let &[catch] = tc.catch_blocks.as_slice() {
            method.block(catch).body.first().copied()
        } else {
            None
        };

        if first_in_handler == Some(target) {
            trace!("goto {} exits a protected region; rewriting into a leave", goto_id);
            let e = method.expr_mut(goto_id);
            e.code = AstCode::Leave;
            e.operand = None;
            return true;
        }
    }
    false
}

/// A loop body ending in `continue` continues anyway.
fn remove_redundant_continues(method: &mut MethodAst) {
    let loops: Vec<NodeId::Id> = method.loops().collect();
    for l in loops {
        let Node::Loop(lp) = method.node(l) else {
            unreachable!()
        };
        let body = lp.body;
        if match_last(method, body, AstCode::LoopContinue) {
            method.block_mut(body).body.pop();
        }
    }
}

/// Drop unreachable trailing breaks from case bodies and remove case blocks
/// that only break when the default case is absent or does nothing.
fn cleanup_switches(method: &mut MethodAst) {
    let switches: Vec<NodeId::Id> = method.switches().collect();
    for s in switches {
        let Node::Switch(sw) = method.node(s) else {
            unreachable!()
        };
        let case_blocks = sw.case_blocks.clone();

        let mut default_case = None;
        for &case in &case_blocks {
            let Node::Case(c) = method.node(case) else {
                unreachable!()
            };
            debug_assert!(c.block.entry_goto.is_none());

            if c.values.is_empty() {
                default_case = Some(case);
            }

            let body = &c.block.body;
            let size = body.len();
            if size >= 2
                && method.node(body[size - 2]).is_unconditional_control_flow()
                && match_code(method, body[size - 1], AstCode::LoopOrSwitchBreak)
            {
                method.block_mut(case).body.pop();
            }
        }

        let default_does_nothing = match default_case {
            None => true,
            Some(d) => {
                let body = &method.block(d).body;
                body.len() == 1 && match_unlabeled(method, body[0], AstCode::LoopOrSwitchBreak)
            }
        };

        if default_does_nothing {
            let removed: Vec<NodeId::Id> = case_blocks
                .iter()
                .copied()
                .filter(|&case| {
                    let body = &method.block(case).body;
                    body.len() == 1 && match_unlabeled(method, body[0], AstCode::LoopOrSwitchBreak)
                })
                .collect();

            if !removed.is_empty() {
                let Node::Switch(sw) = method.node_mut(s) else {
                    unreachable!()
                };
                sw.case_blocks.retain(|c| !removed.contains(c));
            }
        }
    }
}

/// A final argument-less `return` is implied by falling off the method.
fn remove_trailing_return(method: &mut MethodAst) {
    let root = method.root();
    let Some(&last) = method.block(root).body.last() else {
        return;
    };
    if match_code(method, last, AstCode::Return) && method.expr(last).arguments.is_empty() {
        method.block_mut(root).body.pop();
    }
}

/// Delete `return`/`throw` statements that immediately follow unconditional
/// control flow.
fn remove_unreachable_statements(method: &mut MethodAst) -> bool {
    let mut modified = false;

    let blocks: Vec<NodeId::Id> = method.blocks().collect();
    for b in blocks {
        let mut i = 0;
        loop {
            let body = &method.block(b).body;
            if i + 1 >= body.len() {
                break;
            }
            let here = body[i];
            let next = body[i + 1];

            if method.node(here).is_unconditional_control_flow()
                && (match_code(method, next, AstCode::Return)
                    || match_code(method, next, AstCode::AThrow))
            {
                method.block_mut(b).body.remove(i + 1);
                modified = true;
            } else {
                i += 1;
            }
        }
    }

    modified
}
