//! Pattern helpers over expressions.
//!
//! The side conditions matter: a helper that captures the operand requires
//! an argument-less expression, and one that captures the arguments requires
//! an operand-less expression. The rewriting rules depend on exactly these
//! shapes.

use crate::ast::nodes::*;

/// The node is an expression with the given opcode. No argument or operand
/// condition.
pub fn match_code(method: &MethodAst, node: NodeId::Id, code: AstCode) -> bool {
    match method.node(node).as_expression() {
        Some(e) => e.code == code,
        None => false,
    }
}

/// The node is an argument-less expression with the given opcode; yields its
/// operand (which may itself be absent).
pub fn match_get_operand<'m>(
    method: &'m MethodAst,
    node: NodeId::Id,
    code: AstCode,
) -> Option<Option<&'m Operand>> {
    let e = method.node(node).as_expression()?;
    if e.code == code && e.arguments.is_empty() {
        Some(e.operand.as_ref())
    } else {
        None
    }
}

/// The node is an operand-less expression with the given opcode; yields its
/// arguments.
pub fn match_get_arguments<'m>(
    method: &'m MethodAst,
    node: NodeId::Id,
    code: AstCode,
) -> Option<&'m [NodeId::Id]> {
    let e = method.node(node).as_expression()?;
    if e.code == code {
        debug_assert!(e.operand.is_none());
        Some(&e.arguments)
    } else {
        None
    }
}

/// A goto and its target label.
pub fn match_goto(method: &MethodAst, node: NodeId::Id) -> Option<NodeId::Id> {
    match match_get_operand(method, node, AstCode::Goto)? {
        Some(Operand::Label(target)) => Some(*target),
        _ => None,
    }
}

/// An argument-less, operand-less expression with the given opcode (an
/// unlabeled break, an empty return, ...).
pub fn match_unlabeled(method: &MethodAst, node: NodeId::Id, code: AstCode) -> bool {
    matches!(match_get_operand(method, node, code), Some(None))
}

/// A store into a variable; yields the variable and the stored expression.
pub fn match_store(method: &MethodAst, node: NodeId::Id) -> Option<(VariableId::Id, NodeId::Id)> {
    let e = method.node(node).as_expression()?;
    match (&e.operand, e.arguments.as_slice()) {
        (Some(Operand::Variable(v)), &[value]) if e.code == AstCode::Store => Some((*v, value)),
        _ => None,
    }
}

/// A load of a variable.
pub fn match_load(method: &MethodAst, node: NodeId::Id) -> Option<VariableId::Id> {
    match match_get_operand(method, node, AstCode::Load)? {
        Some(Operand::Variable(v)) => Some(*v),
        _ => None,
    }
}

/// The block-like body ends with an expression of the given opcode.
pub fn match_last(method: &MethodAst, block: NodeId::Id, code: AstCode) -> bool {
    match method.block(block).body.last() {
        Some(&last) => match_code(method, last, code),
        None => false,
    }
}
