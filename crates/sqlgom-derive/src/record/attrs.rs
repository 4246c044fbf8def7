//! Attribute parsing for the Record derive macro.
//!
//! Handles struct-level and field-level `#[record(...)]` attributes.

use syn::{DeriveInput, Result};

/// Struct-level options.
#[derive(Default)]
pub(super) struct StructAttr {
    pub table: Option<String>,
    pub hooks: bool,
}

/// Field-level options.
#[derive(Default)]
pub(super) struct FieldAttr {
    pub column: Option<String>,
    /// Bare `column`: tag the field under its own name.
    pub column_bare: bool,
    pub hint: Option<HintKind>,
    pub key: bool,
    pub embed: bool,
    pub ignore: bool,
}

#[derive(Clone, Copy)]
pub(super) enum HintKind {
    Date,
    DateTime,
    Decimal,
}

impl HintKind {
    fn parse(lit: &syn::LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "date" => Ok(HintKind::Date),
            "datetime" => Ok(HintKind::DateTime),
            "decimal" => Ok(HintKind::Decimal),
            other => Err(syn::Error::new_spanned(
                lit,
                format!("unknown hint `{other}`, expected one of: date, datetime, decimal"),
            )),
        }
    }
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut out = StructAttr::default();

        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            if ident == "hooks" {
                out.hooks = true;
            } else if ident == "table" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                out.table = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!("unknown record attribute `{ident}`"),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(out)
    }
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut out = FieldAttr::default();

        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;
            if ident == "key" {
                out.key = true;
            } else if ident == "embed" {
                out.embed = true;
            } else if ident == "ignore" {
                out.ignore = true;
            } else if ident == "column" && !input.peek(syn::Token![=]) {
                out.column_bare = true;
            } else if ident == "column" || ident == "hint" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                if ident == "column" {
                    out.column = Some(value.value());
                } else {
                    out.hint = Some(HintKind::parse(&value)?);
                }
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!("unknown record field attribute `{ident}`"),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(out)
    }
}

/// Merge every `#[record(...)]` on the struct.
pub(super) fn struct_attr(input: &DeriveInput) -> Result<StructAttr> {
    let mut out = StructAttr::default();
    for attr in &input.attrs {
        if attr.path().is_ident("record") {
            let parsed: StructAttr = attr.parse_args()?;
            if parsed.table.is_some() {
                out.table = parsed.table;
            }
            out.hooks |= parsed.hooks;
        }
    }
    Ok(out)
}

/// Merge every `#[record(...)]` on a field and reject contradictory options.
pub(super) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in &field.attrs {
        if attr.path().is_ident("record") {
            let parsed: FieldAttr = attr.parse_args()?;
            if parsed.column.is_some() {
                out.column = parsed.column;
            }
            if parsed.hint.is_some() {
                out.hint = parsed.hint;
            }
            out.column_bare |= parsed.column_bare;
            out.key |= parsed.key;
            out.embed |= parsed.embed;
            out.ignore |= parsed.ignore;
        }
    }

    if out.embed && (out.column.is_some() || out.column_bare || out.key || out.hint.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "#[record(embed)] cannot be combined with column, key or hint",
        ));
    }
    if out.ignore && (out.embed || out.key) {
        return Err(syn::Error::new_spanned(
            field,
            "#[record(ignore)] cannot be combined with embed or key",
        ));
    }
    Ok(out)
}
