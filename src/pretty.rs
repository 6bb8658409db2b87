//! Pretty-printing for method ASTs.
//!
//! Renders a subtree as an indented listing: labels at the start of a line,
//! block braces, `opcode(operand, args...)` expressions. Used by the trace
//! logging of the passes and by tests for readable failures.

use itertools::Itertools;
use std::fmt;

use crate::ast::*;

pub static TAB_INCR: &str = "    ";

impl fmt::Display for AstCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AstCode::Nop => "nop",
            AstCode::LdC => "ldc",
            AstCode::Load => "load",
            AstCode::Store => "store",
            AstCode::LoadElement => "loadelement",
            AstCode::StoreElement => "storeelement",
            AstCode::ArrayLength => "arraylength",
            AstCode::Add => "add",
            AstCode::Sub => "sub",
            AstCode::Mul => "mul",
            AstCode::Div => "div",
            AstCode::Rem => "rem",
            AstCode::Neg => "neg",
            AstCode::Shl => "shl",
            AstCode::Shr => "shr",
            AstCode::CmpEq => "cmpeq",
            AstCode::CmpNe => "cmpne",
            AstCode::CmpLt => "cmplt",
            AstCode::CmpGe => "cmpge",
            AstCode::CmpGt => "cmpgt",
            AstCode::CmpLe => "cmple",
            AstCode::IfTrue => "iftrue",
            AstCode::Goto => "goto",
            AstCode::Switch => "switch",
            AstCode::InvokeVirtual => "invokevirtual",
            AstCode::InvokeStatic => "invokestatic",
            AstCode::GetField => "getfield",
            AstCode::PutField => "putfield",
            AstCode::GetStatic => "getstatic",
            AstCode::PutStatic => "putstatic",
            AstCode::InstanceOf => "instanceof",
            AstCode::CheckCast => "checkcast",
            AstCode::NewObject => "newobject",
            AstCode::MonitorEnter => "monitorenter",
            AstCode::MonitorExit => "monitorexit",
            AstCode::AThrow => "athrow",
            AstCode::Return => "return",
            AstCode::Leave => "leave",
            AstCode::LoopOrSwitchBreak => "break",
            AstCode::LoopContinue => "continue",
        };
        f.write_str(name)
    }
}

pub struct AstDisplay<'a> {
    method: &'a MethodAst,
    node: NodeId::Id,
}

impl MethodAst {
    pub fn display(&self, node: NodeId::Id) -> AstDisplay<'_> {
        AstDisplay { method: self, node }
    }
}

impl fmt::Display for AstDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_stmt(self.method, f, self.node, "")
    }
}

fn operand_to_string(method: &MethodAst, operand: &Operand) -> String {
    match operand {
        Operand::Label(l) => label_name(method, *l).to_string(),
        Operand::Labels(ls) => format!(
            "[{}]",
            ls.iter().map(|&l| label_name(method, l)).format(", ")
        ),
        Operand::Variable(v) => method.variable(*v).name.clone(),
        Operand::Constant(c) => c.to_string(),
        Operand::Member(m) => m.clone(),
    }
}

fn label_name(method: &MethodAst, label: NodeId::Id) -> &str {
    match method.node(label) {
        Node::Label(l) => &l.name,
        _ => "<not a label>",
    }
}

fn expr_to_string(method: &MethodAst, id: NodeId::Id) -> String {
    let e = method.expr(id);
    let parts = e
        .operand
        .iter()
        .map(|op| operand_to_string(method, op))
        .chain(e.arguments.iter().map(|&a| expr_to_string(method, a)));
    let parts = parts.format(", ").to_string();
    if parts.is_empty() {
        e.code.to_string()
    } else {
        format!("{}({})", e.code, parts)
    }
}

fn fmt_block_contents(
    method: &MethodAst,
    f: &mut fmt::Formatter<'_>,
    block: NodeId::Id,
    indent: &str,
) -> fmt::Result {
    let b = method.block(block);
    if let Some(entry) = b.entry_goto {
        fmt_stmt(method, f, entry, indent)?;
    }
    for &stmt in &b.body {
        fmt_stmt(method, f, stmt, indent)?;
    }
    Ok(())
}

fn fmt_stmt(
    method: &MethodAst,
    f: &mut fmt::Formatter<'_>,
    id: NodeId::Id,
    indent: &str,
) -> fmt::Result {
    let inner = format!("{indent}{TAB_INCR}");
    match method.node(id) {
        Node::Label(l) => writeln!(f, "{indent}{}:", l.name),
        Node::Expression(_) => writeln!(f, "{indent}{}", expr_to_string(method, id)),
        Node::Block(_) => {
            writeln!(f, "{indent}{{")?;
            fmt_block_contents(method, f, id, &inner)?;
            writeln!(f, "{indent}}}")
        }
        Node::Condition(c) => {
            writeln!(f, "{indent}if ({}) {{", expr_to_string(method, c.condition))?;
            fmt_block_contents(method, f, c.true_block, &inner)?;
            let false_block = method.block(c.false_block);
            if false_block.entry_goto.is_some() || !false_block.body.is_empty() {
                writeln!(f, "{indent}}} else {{")?;
                fmt_block_contents(method, f, c.false_block, &inner)?;
            }
            writeln!(f, "{indent}}}")
        }
        Node::Loop(l) => {
            match l.condition {
                Some(cond) => {
                    writeln!(f, "{indent}while ({}) {{", expr_to_string(method, cond))?
                }
                None => writeln!(f, "{indent}loop {{")?,
            }
            fmt_block_contents(method, f, l.body, &inner)?;
            writeln!(f, "{indent}}}")
        }
        Node::Switch(s) => {
            writeln!(
                f,
                "{indent}switch ({}) {{",
                expr_to_string(method, s.condition)
            )?;
            for &case in &s.case_blocks {
                fmt_stmt(method, f, case, &inner)?;
            }
            writeln!(f, "{indent}}}")
        }
        Node::Case(c) => {
            if c.values.is_empty() {
                writeln!(f, "{indent}default:")?;
            } else {
                writeln!(f, "{indent}case {}:", c.values.iter().format(", "))?;
            }
            fmt_block_contents(method, f, id, &inner)
        }
        Node::TryCatch(t) => {
            writeln!(f, "{indent}try {{")?;
            fmt_block_contents(method, f, t.try_block, &inner)?;
            for &catch in &t.catch_blocks {
                fmt_stmt(method, f, catch, indent)?;
            }
            if let Some(finally) = t.finally_block {
                writeln!(f, "{indent}}} finally {{")?;
                fmt_block_contents(method, f, finally, &inner)?;
            }
            writeln!(f, "{indent}}}")
        }
        Node::Catch(c) => {
            let types = c.exception_types.iter().format(" | ");
            match c.exception_variable {
                Some(v) => writeln!(
                    f,
                    "{indent}}} catch ({} {}) {{",
                    types,
                    method.variable(v).name
                )?,
                None => writeln!(f, "{indent}}} catch ({}) {{", types)?,
            }
            fmt_block_contents(method, f, id, &inner)
        }
    }
}
