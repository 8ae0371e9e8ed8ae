//! Rendering type nodes back to signature source text.
//!
//! Output parses back to an equal tree: members are parenthesized wherever
//! the grammar would otherwise bind them differently.

use serde::ser::{Serialize, Serializer};
use std::fmt::{self, Write};

use crate::node::*;

/// Binding strength of a node when printed, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Function,
    Union,
    Intersection,
    Primary,
}

fn precedence(node: &TypeNode) -> Precedence {
    match node {
        TypeNode::Function(_) => Precedence::Function,
        TypeNode::Union(_) => Precedence::Union,
        TypeNode::Intersection(_) => Precedence::Intersection,
        TypeNode::ModuleExports(m) => precedence(&m.value),
        _ => Precedence::Primary,
    }
}

fn write_at(out: &mut String, node: &TypeNode, min: Precedence) -> fmt::Result {
    if precedence(node) < min {
        out.push('(');
        write_node(out, node)?;
        out.push(')');
        Ok(())
    } else {
        write_node(out, node)
    }
}

fn write_list(out: &mut String, items: &[TypeRef], sep: &str, min: Precedence) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        write_at(out, item, min)?;
    }
    Ok(())
}

fn write_node(out: &mut String, node: &TypeNode) -> fmt::Result {
    match node {
        TypeNode::Literal(lit) => out.push_str(&lit.name),
        TypeNode::Value(v) => out.push_str(&v.value),
        TypeNode::Renamed(renamed) => out.push_str(renamed.raw()),
        TypeNode::Function(f) => {
            out.push('(');
            let mut first = true;
            if let Some(this_type) = &f.this_type {
                out.push_str("this: ");
                write_node(out, this_type)?;
                first = false;
            }
            for param in &f.params {
                if !first {
                    out.push_str(", ");
                }
                first = false;
                if let Some(name) = &param.name {
                    write!(out, "{}: ", name)?;
                }
                write_node(out, &param.ty)?;
            }
            out.push_str(") => ");
            write_node(out, &f.result)?;
        }
        TypeNode::Object(o) => {
            if o.fields.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                for (i, (name, ty)) in o.fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write!(out, "{}: ", name)?;
                    write_node(out, ty)?;
                }
                out.push_str(" }");
            }
        }
        TypeNode::Union(u) => write_list(out, &u.members, " | ", Precedence::Intersection)?,
        TypeNode::Intersection(i) => write_list(out, &i.members, " & ", Precedence::Primary)?,
        TypeNode::Generic(g) => {
            write_at(out, &g.base, Precedence::Primary)?;
            out.push('<');
            write_list(out, &g.args, ", ", Precedence::Function)?;
            out.push('>');
        }
        TypeNode::Tuple(t) => {
            out.push('[');
            write_list(out, &t.items, ", ", Precedence::Function)?;
            out.push(']');
        }
        TypeNode::ModuleExports(m) => write_node(out, &m.value)?,
    }
    Ok(())
}

impl TypeNode {
    /// Signature source text for this node.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = write_node(&mut out, self);
        out
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source())
    }
}

impl Serialize for TypeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn lit(name: &str) -> TypeRef {
        TypeNode::literal(name)
    }

    #[test]
    fn test_function_source() {
        let f = TypeNode::function(
            vec![Param::new(Some("key".into()), lit("String")), Param::new(None, lit("Number"))],
            lit("void"),
            Some(lit("BatchClient")),
        );
        assert_eq!(f.to_source(), "(this: BatchClient, key: String, Number) => void");
    }

    #[test]
    fn test_object_source() {
        let mut fields = IndexMap::new();
        fields.insert("b".to_string(), lit("String"));
        fields.insert("a".to_string(), TypeNode::value("1", ValueKind::Number));
        assert_eq!(TypeNode::object(fields).to_source(), "{ b: String, a: 1 }");
        assert_eq!(TypeNode::object(IndexMap::new()).to_source(), "{}");
    }

    #[test]
    fn test_function_inside_union_is_parenthesized() {
        let f = TypeNode::function(vec![], lit("String"), None);
        let u = TypeNode::union(vec![f, TypeNode::value("null", ValueKind::Null)]);
        assert_eq!(u.to_source(), "(() => String) | null");
    }

    #[test]
    fn test_union_inside_intersection_is_parenthesized() {
        let u = TypeNode::union(vec![lit("A"), lit("B")]);
        let i = TypeNode::intersection(vec![u, lit("C")]);
        assert_eq!(i.to_source(), "(A | B) & C");
    }

    #[test]
    fn test_generic_and_tuple_source() {
        let g = TypeNode::generic(lit("Array"), vec![lit("String")]);
        assert_eq!(g.to_source(), "Array<String>");
        let t = TypeNode::tuple(vec![lit("String"), lit("Number")]);
        assert_eq!(t.to_source(), "[String, Number]");
    }

    #[test]
    fn test_serializes_as_source_text() {
        let json = serde_json::to_string(&*TypeNode::renamed("C", "Channel")).unwrap();
        assert_eq!(json, "\"Channel as C\"");
    }
}
