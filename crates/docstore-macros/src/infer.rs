//! Field role inference from Rust types.
//!
//! The derive never hard-codes parameter kinds; those come from the
//! `QueryParameter` impl of the field type at expansion time. What is
//! inferred here is the structural role: statistics accumulator,
//! include sink, unbindable blob, or plain parameter.

use crate::parse::{FieldRole, IncludeKindAttr};
use quote::ToTokens;
use syn::Type;

/// Decide a field's structural role from its type and an optional
/// `#[query(include)]` attribute.
///
/// `include` is `None` when the attribute is absent, `Some(None)` for
/// the bare flag form, and `Some(Some(kind))` for an explicit kind.
pub fn field_role(
    ty: &Type,
    include: Option<Option<IncludeKindAttr>>,
) -> Result<FieldRole, String> {
    let type_str = type_to_string(ty);

    if let Some(explicit) = include {
        let kind = match explicit {
            Some(kind) => kind,
            None => infer_include_kind(&type_str).ok_or_else(|| {
                format!(
                    "cannot infer an include kind for '{type_str}'; \
                     use #[query(include = \"list\" | \"map\" | \"callback\")]"
                )
            })?,
        };
        return Ok(FieldRole::Include(kind));
    }

    if type_str.ends_with("QueryStatistics") {
        return Ok(FieldRole::Statistics);
    }
    if type_str.ends_with("IncludeCallback") {
        return Ok(FieldRole::Include(IncludeKindAttr::Callback));
    }
    if matches!(type_str.as_str(), "Vec<u8>" | "&[u8]" | "[u8]") {
        return Ok(FieldRole::Unsupported(type_str));
    }

    Ok(FieldRole::Parameter)
}

fn infer_include_kind(type_str: &str) -> Option<IncludeKindAttr> {
    if type_str.starts_with("Vec<") {
        Some(IncludeKindAttr::List)
    } else if type_str.contains("HashMap<") || type_str.contains("BTreeMap<") {
        Some(IncludeKindAttr::Map)
    } else if type_str.ends_with("IncludeCallback") {
        Some(IncludeKindAttr::Callback)
    } else {
        None
    }
}

/// Convert a Type to a simplified string representation for matching.
fn type_to_string(ty: &Type) -> String {
    ty.to_token_stream().to_string().replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parameters_are_the_default_role() {
        let ty: Type = parse_quote!(String);
        assert_eq!(field_role(&ty, None), Ok(FieldRole::Parameter));

        let ty: Type = parse_quote!(Option<i64>);
        assert_eq!(field_role(&ty, None), Ok(FieldRole::Parameter));
    }

    #[test]
    fn statistics_and_callback_types_are_recognized() {
        let ty: Type = parse_quote!(docstore_query::QueryStatistics);
        assert_eq!(field_role(&ty, None), Ok(FieldRole::Statistics));

        let ty: Type = parse_quote!(IncludeCallback);
        assert_eq!(
            field_role(&ty, None),
            Ok(FieldRole::Include(IncludeKindAttr::Callback))
        );
    }

    #[test]
    fn include_flag_infers_from_collection_type() {
        let ty: Type = parse_quote!(Vec<serde_json::Value>);
        assert_eq!(
            field_role(&ty, Some(None)),
            Ok(FieldRole::Include(IncludeKindAttr::List))
        );

        let ty: Type = parse_quote!(std::collections::BTreeMap<String, serde_json::Value>);
        assert_eq!(
            field_role(&ty, Some(None)),
            Ok(FieldRole::Include(IncludeKindAttr::Map))
        );

        let ty: Type = parse_quote!(i32);
        assert!(field_role(&ty, Some(None)).is_err());
    }

    #[test]
    fn blobs_cannot_bind() {
        let ty: Type = parse_quote!(Vec<u8>);
        assert!(matches!(
            field_role(&ty, None),
            Ok(FieldRole::Unsupported(_))
        ));
    }
}
