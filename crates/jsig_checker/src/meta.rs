//! Verification results.

use jsig_diagnostics::{DiagnosticKind, TypeDiagnostic};
use jsig_types::TypeRef;
use serde::{Serialize, Serializer};

/// The outcome of verifying one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Diagnostics in traversal order.
    pub errors: Vec<TypeDiagnostic>,
    /// The declared or derived type of `module.exports`.
    #[serde(serialize_with = "serialize_type", skip_serializing_if = "Option::is_none")]
    pub module_exports_type: Option<TypeRef>,
}

impl Meta {
    /// No diagnostics and a known export type.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.module_exports_type.is_some()
    }

    pub fn errors_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &TypeDiagnostic> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

fn serialize_type<S: Serializer>(ty: &Option<TypeRef>, serializer: S) -> Result<S::Ok, S::Error> {
    match ty {
        Some(ty) => serializer.serialize_str(&ty.to_source()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsig_diagnostics::messages;
    use jsig_types::TypeNode;

    #[test]
    fn test_clean_requires_export_type() {
        let mut meta = Meta::default();
        assert!(!meta.is_clean());
        meta.module_exports_type = Some(TypeNode::literal("String"));
        assert!(meta.is_clean());
        meta.errors.push(TypeDiagnostic::new(&messages::UNTYPED_FUNCTION_FOUND, 3));
        assert!(!meta.is_clean());
        assert_eq!(meta.errors_of(DiagnosticKind::UntypedFunctionFound).count(), 1);
    }

    #[test]
    fn test_serializes_export_type_as_source() {
        let meta = Meta {
            errors: vec![],
            module_exports_type: Some(jsig_signature::parse_type("(a: Number) => String").unwrap()),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["moduleExportsType"], "(a: Number) => String");
        assert_eq!(json["errors"], serde_json::json!([]));

        let empty = serde_json::to_value(Meta::default()).unwrap();
        assert!(empty.get("moduleExportsType").is_none());
    }
}
