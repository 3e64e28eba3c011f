//! Procedural macros for docstore compiled queries.
//!
//! `docstore-macros` is the compile-time layer that replaces runtime
//! reflection: it turns plain query structs into fully described
//! compiled query types by generating static member metadata and the
//! name-based accessors the planning engine works through.
//!
//! # Role In The Architecture
//!
//! - **Member metadata**: `#[derive(CompiledQuery)]` produces a
//!   `CompiledQuery` implementation whose `members()` slice drives
//!   classification, template construction, and parameter matching.
//! - **Enum parameters**: `#[derive(QueryEnum)]` makes a fieldless enum
//!   usable as a query parameter in both ordinal and name storage.
//!
//! These macros are used by application crates via the `docstore` facade.

use proc_macro::TokenStream;
use quote::quote;

mod infer;
mod parse;

use parse::{FieldDef, FieldRole, IncludeKindAttr, QueryDef, parse_query};

/// Derive macro for the `CompiledQuery` trait.
///
/// Every named field becomes a query member: plain fields are bind
/// parameters (their type must implement `QueryParameter`), a
/// `QueryStatistics` field becomes the statistics accumulator, and
/// include sinks collect related documents.
///
/// # Attributes
///
/// Struct level:
/// - `#[query(name = "...")]` - Override the query name used in logs and
///   errors (defaults to the struct name)
/// - `#[query(output = "Type")]` - Per-row output type (defaults to
///   `serde_json::Value`)
/// - `#[query(planning)]` - Always build a fresh template and invoke the
///   type's `QueryPlanning` implementation
///
/// Field level:
/// - `#[query(ignore)]` - Exclude the field from planning
/// - `#[query(readonly)]` - Never assign synthetic values to the field
/// - `#[query(include)]` - Mark a related-document sink; the kind is
///   inferred from the type, or forced with
///   `#[query(include = "list" | "map" | "callback")]`
///
/// # Example
///
/// ```ignore
/// use docstore::prelude::*;
///
/// #[derive(Default, CompiledQuery)]
/// struct UsersByName {
///     name: String,
///     stats: QueryStatistics,
/// }
/// ```
#[proc_macro_derive(CompiledQuery, attributes(query))]
pub fn derive_compiled_query(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);

    let query = match parse_query(&input) {
        Ok(q) => q,
        Err(e) => return e.to_compile_error().into(),
    };

    generate_compiled_query_impl(&query).into()
}

fn generate_compiled_query_impl(query: &QueryDef) -> proc_macro2::TokenStream {
    let name = &query.name;
    let query_name = &query.query_name;
    let output = &query.output;
    let planning = query.planning;
    let (impl_generics, ty_generics, where_clause) = query.generics.split_for_impl();

    let member_entries: Vec<_> = query.fields.iter().map(member_entry).collect();
    let value_arms: Vec<_> = query
        .fields
        .iter()
        .filter(|f| !f.ignored && f.role == FieldRole::Parameter)
        .map(|f| {
            let ident = &f.name;
            let name_str = ident.to_string();
            quote! {
                #name_str => Some(docstore_query::QueryParameter::to_value(&self.#ident)),
            }
        })
        .collect();
    let set_arms: Vec<_> = query
        .fields
        .iter()
        .filter(|f| !f.ignored && !f.readonly && f.role == FieldRole::Parameter)
        .map(|f| {
            let ident = &f.name;
            let name_str = ident.to_string();
            let ty = &f.ty;
            quote! {
                #name_str => match <#ty as docstore_query::QueryParameter>::from_value(&value) {
                    Some(v) => {
                        self.#ident = v;
                        true
                    }
                    None => false,
                },
            }
        })
        .collect();

    let statistics_impl = query
        .fields
        .iter()
        .find(|f| !f.ignored && f.role == FieldRole::Statistics)
        .map(|f| {
            let ident = &f.name;
            quote! {
                fn statistics_mut(&mut self) -> Option<&mut docstore_query::QueryStatistics> {
                    Some(&mut self.#ident)
                }
            }
        });

    let include_arms: Vec<_> = query
        .fields
        .iter()
        .filter(|f| !f.ignored)
        .filter_map(include_arm)
        .collect();
    let accept_include_impl = (!include_arms.is_empty()).then(|| {
        quote! {
            fn accept_include(
                &mut self,
                member: &str,
                document: docstore_query::serde_json::Value,
            ) {
                match member {
                    #(#include_arms)*
                    _ => {}
                }
            }
        }
    });

    let customize_impl = planning.then(|| {
        quote! {
            fn customize_template(
                &mut self,
                source: &mut docstore_query::UniqueValueSource<'_>,
            ) {
                docstore_query::QueryPlanning::configure_template(self, source);
            }
        }
    });

    quote! {
        impl #impl_generics docstore_query::CompiledQuery for #name #ty_generics #where_clause {
            type Output = #output;

            const QUERY_NAME: &'static str = #query_name;
            const USES_EXPLICIT_PLANNING: bool = #planning;

            fn members() -> &'static [docstore_query::MemberInfo] {
                static MEMBERS: &[docstore_query::MemberInfo] = &[
                    #(#member_entries),*
                ];
                MEMBERS
            }

            fn member_value(&self, name: &str) -> Option<docstore_query::Value> {
                match name {
                    #(#value_arms)*
                    _ => None,
                }
            }

            fn set_member_value(&mut self, name: &str, value: docstore_query::Value) -> bool {
                match name {
                    #(#set_arms)*
                    _ => false,
                }
            }

            #statistics_impl

            #accept_include_impl

            #customize_impl
        }
    }
}

/// The `MemberInfo` const expression for one field.
fn member_entry(field: &FieldDef) -> proc_macro2::TokenStream {
    let name_str = field.name.to_string();
    let ty = &field.ty;

    // ignored fields carry no trait bounds; classification skips them
    // before looking at the shape
    if field.ignored {
        let ty_str = quote!(#ty).to_string().replace(' ', "");
        return quote! {
            docstore_query::MemberInfo::unsupported(#name_str, #ty_str).ignore()
        };
    }

    let base = match &field.role {
        FieldRole::Parameter => quote! {
            docstore_query::MemberInfo::parameter(
                #name_str,
                <#ty as docstore_query::QueryParameter>::KIND,
                <#ty as docstore_query::QueryParameter>::NULLABLE,
            )
        },
        FieldRole::Statistics => quote! {
            docstore_query::MemberInfo::statistics(#name_str)
        },
        FieldRole::Include(kind) => {
            let kind = match kind {
                IncludeKindAttr::List => quote!(docstore_query::IncludeKind::List),
                IncludeKindAttr::Map => quote!(docstore_query::IncludeKind::Map),
                IncludeKindAttr::Callback => quote!(docstore_query::IncludeKind::Callback),
            };
            quote! {
                docstore_query::MemberInfo::include(#name_str, #kind)
            }
        }
        FieldRole::Unsupported(type_name) => quote! {
            docstore_query::MemberInfo::unsupported(#name_str, #type_name)
        },
    };

    if field.readonly {
        quote! { #base.readonly() }
    } else {
        base
    }
}

/// The `accept_include` match arm for one include field, if any.
fn include_arm(field: &FieldDef) -> Option<proc_macro2::TokenStream> {
    let FieldRole::Include(kind) = &field.role else {
        return None;
    };
    let ident = &field.name;
    let name_str = ident.to_string();
    let arm = match kind {
        IncludeKindAttr::List => quote! {
            #name_str => self.#ident.push(document),
        },
        IncludeKindAttr::Map => quote! {
            #name_str => {
                let key = match document.get("id") {
                    Some(docstore_query::serde_json::Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => return,
                };
                self.#ident.insert(key, document);
            }
        },
        IncludeKindAttr::Callback => quote! {
            #name_str => self.#ident.deliver(document),
        },
    };
    Some(arm)
}

/// Derive macro for the `QueryEnum` trait.
///
/// Requires a fieldless enum. Also implements `QueryParameter`, so the
/// enum can be used directly as a query member in either ordinal or
/// variant-name storage.
#[proc_macro_derive(QueryEnum)]
pub fn derive_query_enum(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    let name = &input.ident;

    let syn::Data::Enum(data) = &input.data else {
        return syn::Error::new_spanned(name, "QueryEnum can only be derived for enums")
            .to_compile_error()
            .into();
    };
    for variant in &data.variants {
        if !matches!(variant.fields, syn::Fields::Unit) {
            return syn::Error::new_spanned(
                &variant.ident,
                "QueryEnum requires fieldless variants",
            )
            .to_compile_error()
            .into();
        }
    }

    let variant_names: Vec<String> = data.variants.iter().map(|v| v.ident.to_string()).collect();
    let ordinal_arms: Vec<_> = data
        .variants
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let ident = &v.ident;
            let ordinal = i as i32;
            quote! { Self::#ident => #ordinal, }
        })
        .collect();
    let from_arms: Vec<_> = data
        .variants
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let ident = &v.ident;
            let ordinal = i as i32;
            quote! { #ordinal => Some(Self::#ident), }
        })
        .collect();

    let expanded = quote! {
        impl docstore_query::QueryEnum for #name {
            const VARIANTS: &'static [&'static str] = &[#(#variant_names),*];

            fn ordinal(&self) -> i32 {
                match self {
                    #(#ordinal_arms)*
                }
            }

            fn from_ordinal(ordinal: i32) -> Option<Self> {
                match ordinal {
                    #(#from_arms)*
                    _ => None,
                }
            }
        }

        impl docstore_query::QueryParameter for #name {
            const KIND: docstore_query::ParamKind = docstore_query::ParamKind::Enum {
                variants: <#name as docstore_query::QueryEnum>::VARIANTS,
            };

            fn to_value(&self) -> docstore_query::Value {
                docstore_query::Value::Int(docstore_query::QueryEnum::ordinal(self))
            }

            fn from_value(value: &docstore_query::Value) -> Option<Self> {
                match value {
                    docstore_query::Value::Int(ordinal) => {
                        <#name as docstore_query::QueryEnum>::from_ordinal(*ordinal)
                    }
                    docstore_query::Value::Text(name) => {
                        <#name as docstore_query::QueryEnum>::VARIANTS
                            .iter()
                            .position(|v| *v == name.as_str())
                            .and_then(|i| <#name as docstore_query::QueryEnum>::from_ordinal(i as i32))
                    }
                    _ => None,
                }
            }
        }
    };
    expanded.into()
}
