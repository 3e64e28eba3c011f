//! Parsing logic for the CompiledQuery derive macro.
//!
//! This module extracts struct-level and field-level attributes from the
//! derive input to build `QueryDef` and `FieldDef` structures used for
//! code generation.

use crate::infer;
use syn::{Data, DeriveInput, Error, Field, Fields, Generics, Ident, Lit, Result, Type};

/// Parsed query definition from a struct with `#[derive(CompiledQuery)]`.
#[derive(Debug)]
pub struct QueryDef {
    /// The struct name (e.g., `UserByName`).
    pub name: Ident,
    /// The stable query name used in logging and errors.
    pub query_name: String,
    /// The per-row output type; defaults to `serde_json::Value`.
    pub output: Type,
    /// Whether the type opts into explicit planning.
    pub planning: bool,
    /// Generic parameters from the struct.
    pub generics: Generics,
    /// Parsed field definitions.
    pub fields: Vec<FieldDef>,
}

/// Parsed field definition from a struct field.
#[derive(Debug)]
pub struct FieldDef {
    /// The Rust field name.
    pub name: Ident,
    /// The Rust type of the field.
    pub ty: Type,
    /// What the field contributes to planning.
    pub role: FieldRole,
    /// Excluded from template construction (`#[query(readonly)]`).
    pub readonly: bool,
    /// Excluded from planning entirely (`#[query(ignore)]`).
    pub ignored: bool,
}

/// What a field is, as the derive sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRole {
    /// A candidate bind parameter.
    Parameter,
    /// The statistics accumulator.
    Statistics,
    /// A related-document sink.
    Include(IncludeKindAttr),
    /// A type the engine cannot bind; the payload names it.
    Unsupported(String),
}

/// Include sink flavor, explicit or inferred from the field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKindAttr {
    List,
    Map,
    Callback,
}

/// Parse a `#[derive(CompiledQuery)]` input into a query definition.
pub fn parse_query(input: &DeriveInput) -> Result<QueryDef> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "CompiledQuery can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &input.ident,
            "CompiledQuery requires named fields",
        ));
    };

    let mut query_name: Option<String> = None;
    let mut output: Option<Type> = None;
    let mut planning = false;

    for attr in &input.attrs {
        if !attr.path().is_ident("query") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                if query_name.is_some() {
                    return Err(Error::new_spanned(
                        meta.path,
                        "duplicate query attribute: name",
                    ));
                }
                let value: Lit = meta.value()?.parse()?;
                let Lit::Str(lit_str) = value else {
                    return Err(Error::new_spanned(
                        meta.path,
                        "expected string literal for query name",
                    ));
                };
                query_name = Some(lit_str.value());
                Ok(())
            } else if meta.path.is_ident("output") {
                if output.is_some() {
                    return Err(Error::new_spanned(
                        meta.path,
                        "duplicate query attribute: output",
                    ));
                }
                let value: Lit = meta.value()?.parse()?;
                let Lit::Str(lit_str) = value else {
                    return Err(Error::new_spanned(
                        meta.path,
                        "expected string literal naming the output type",
                    ));
                };
                output = Some(lit_str.parse()?);
                Ok(())
            } else if meta.path.is_ident("planning") {
                planning = true;
                Ok(())
            } else {
                Err(Error::new_spanned(
                    meta.path.clone(),
                    "unknown query attribute on struct",
                ))
            }
        })?;
    }

    let fields = named
        .named
        .iter()
        .map(parse_field)
        .collect::<Result<Vec<_>>>()?;

    let stats_count = fields
        .iter()
        .filter(|f| !f.ignored && f.role == FieldRole::Statistics)
        .count();
    if stats_count > 1 {
        return Err(Error::new_spanned(
            &input.ident,
            "a query type may declare at most one QueryStatistics member",
        ));
    }

    Ok(QueryDef {
        name: input.ident.clone(),
        query_name: query_name.unwrap_or_else(|| input.ident.to_string()),
        output: output.unwrap_or_else(|| syn::parse_quote!(serde_json::Value)),
        planning,
        generics: input.generics.clone(),
        fields,
    })
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;

    let mut readonly = false;
    let mut ignored = false;
    let mut include: Option<Option<IncludeKindAttr>> = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("query") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("ignore") {
                ignored = true;
                Ok(())
            } else if meta.path.is_ident("readonly") {
                readonly = true;
                Ok(())
            } else if meta.path.is_ident("include") {
                if meta.input.peek(syn::Token![=]) {
                    let value: Lit = meta.value()?.parse()?;
                    let Lit::Str(lit_str) = value else {
                        return Err(Error::new_spanned(
                            meta.path,
                            "expected \"map\" or \"callback\"",
                        ));
                    };
                    let kind = match lit_str.value().as_str() {
                        "list" => IncludeKindAttr::List,
                        "map" => IncludeKindAttr::Map,
                        "callback" => IncludeKindAttr::Callback,
                        other => {
                            return Err(Error::new_spanned(
                                lit_str,
                                format!("unknown include kind '{other}'"),
                            ));
                        }
                    };
                    include = Some(Some(kind));
                } else {
                    // flag form: infer the kind from the field type
                    include = Some(None);
                }
                Ok(())
            } else {
                Err(Error::new_spanned(
                    meta.path.clone(),
                    "unknown query attribute on field",
                ))
            }
        })?;
    }

    let role = infer::field_role(&field.ty, include)
        .map_err(|message| Error::new_spanned(&field.ty, message))?;

    Ok(FieldDef {
        name,
        ty: field.ty.clone(),
        role,
        readonly,
        ignored,
    })
}
