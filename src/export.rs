//! Export a restructured method to JSON, for downstream tooling and golden
//! inspection. Node slots are serialized in id order, so the references
//! inside the tree stay meaningful.

use serde::Serialize;

use crate::ast::MethodAst;

#[derive(Serialize)]
#[serde(rename = "Method")]
struct MethodSerializer<'a> {
    name: &'a str,
    method: &'a MethodAst,
}

pub fn export_method(
    name: &str,
    method: &MethodAst,
    writer: impl std::io::Write,
) -> serde_json::Result<()> {
    trace!("exporting method `{}`", name);
    serde_json::to_writer(writer, &MethodSerializer { name, method })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    #[test]
    fn exports_a_method_as_json() {
        let mut m = MethodAst::new();
        let r = m.new_expr(AstCode::Return, None, vec![]);
        let root = m.root();
        m.push(root, r);

        let mut out = Vec::new();
        export_method("test", &m, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["name"], "test");
        assert!(json["method"]["nodes"].is_array());
    }
}
