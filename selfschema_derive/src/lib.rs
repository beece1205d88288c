use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Data, DataEnum, DataStruct, DeriveInput, Fields, GenericArgument, Lit,
    Meta, NestedMeta, PathArguments, Type,
};

#[derive(Clone, Copy)]
enum RecurseShape {
    Box,
    OptionBox,
}

/// Reads `#[schema(recurse)]` / `#[schema(recurse = N)]` off a field. `N`
/// defaults to 0, the innermost enclosing `Fix` — the only one a derived
/// type ever introduces.
fn recurse_level(attrs: &[syn::Attribute]) -> Option<u8> {
    for attr in attrs {
        if !attr.path.is_ident("schema") {
            continue;
        }
        let list = match attr.parse_meta() {
            Ok(Meta::List(list)) => list,
            _ => continue,
        };
        for nested in list.nested {
            match nested {
                NestedMeta::Meta(Meta::Path(p)) if p.is_ident("recurse") => return Some(0),
                NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("recurse") => {
                    if let Lit::Int(n) = nv.lit {
                        return Some(n.base10_parse().expect("recurse level must fit in a u8"));
                    }
                }
                _ => {}
            }
        }
    }
    None
}

fn inner_of<'t>(ty: &'t Type, wrapper: &str) -> Option<&'t Type> {
    let tp = match ty {
        Type::Path(tp) => tp,
        _ => return None,
    };
    let seg = tp.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let ab = match &seg.arguments {
        PathArguments::AngleBracketed(ab) => ab,
        _ => return None,
    };
    match ab.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn is_self_type(ty: &Type) -> bool {
    matches!(ty, Type::Path(tp) if tp.path.is_ident("Self"))
}

fn is_option_type(ty: &Type) -> bool {
    inner_of(ty, "Option").is_some()
}

/// Only `Box<Self>` and `Option<Box<Self>>` are supported recursive field
/// shapes; anything else is a derive-time error rather than a silently
/// wrong schema.
fn recurse_shape(ty: &Type) -> RecurseShape {
    if let Some(inner) = inner_of(ty, "Box") {
        if is_self_type(inner) {
            return RecurseShape::Box;
        }
    }
    if let Some(opt_inner) = inner_of(ty, "Option") {
        if let Some(box_inner) = inner_of(opt_inner, "Box") {
            if is_self_type(box_inner) {
                return RecurseShape::OptionBox;
            }
        }
    }
    panic!("#[schema(recurse)] only supports `Box<Self>` or `Option<Box<Self>>` fields");
}

struct Field {
    /// `Some(ident)` for named fields, `None` for positional (tuple) ones.
    ident: Option<syn::Ident>,
    index: usize,
    ty: Type,
    recurse: Option<u8>,
}

fn collect_fields(fields: &Fields) -> Vec<Field> {
    fields
        .iter()
        .enumerate()
        .map(|(index, f)| Field {
            ident: f.ident.clone(),
            index,
            ty: f.ty.clone(),
            recurse: recurse_level(&f.attrs),
        })
        .collect()
}

fn field_label(f: &Field) -> String {
    match &f.ident {
        Some(ident) => ident.to_string(),
        None => f.index.to_string(),
    }
}

fn field_access(f: &Field) -> TokenStream2 {
    match &f.ident {
        Some(ident) => quote! { #ident },
        None => {
            let idx = syn::Index::from(f.index);
            quote! { #idx }
        }
    }
}

fn field_tmp_ident(f: &Field) -> syn::Ident {
    format_ident!("__f_{}", field_label(f))
}

fn field_schema_expr(f: &Field) -> TokenStream2 {
    let ty = &f.ty;
    match f.recurse {
        Some(n) => quote! { ::selfschema::Schema::SelfRef(#n) },
        None => quote! { <#ty as ::selfschema::KnownSchema>::schema() },
    }
}

/// Schema for one struct body / enum variant payload. A single unnamed
/// field is transparent (the newtype's schema *is* its inner schema, no
/// wrapping `Product`), matching how a one-field tuple struct is meant to
/// read on the wire.
fn payload_schema(fields: &Fields) -> TokenStream2 {
    let items = collect_fields(fields);
    match fields {
        Fields::Named(_) => {
            let entries = items.iter().map(|f| {
                let name = field_label(f);
                let expr = field_schema_expr(f);
                quote! { ::selfschema::schema::RecordField::from((#name, #expr)) }
            });
            quote! { ::selfschema::Schema::Record(vec![ #(#entries),* ]) }
        }
        Fields::Unnamed(_) if items.len() == 1 => field_schema_expr(&items[0]),
        Fields::Unnamed(_) => {
            let exprs = items.iter().map(field_schema_expr);
            quote! { ::selfschema::Schema::Product(vec![ #(#exprs),* ]) }
        }
        Fields::Unit => quote! { ::selfschema::Schema::Product(vec![]) },
    }
}

fn has_recurse(fields: &Fields) -> bool {
    collect_fields(fields).iter().any(|f| f.recurse.is_some())
}

/// `self.field.to_term()` / `self.0.to_term()` list, built for whichever
/// outer wrapping (`Record`/`Product`/bare) the shape calls for.
fn to_term_for_fields(fields: &Fields, self_prefix: TokenStream2) -> TokenStream2 {
    let items = collect_fields(fields);
    match fields {
        Fields::Named(_) => {
            let entries = items.iter().map(|f| {
                let name = field_label(f);
                let access = field_access(f);
                quote! { (#name.to_string(), ::selfschema::Encode::to_term(&#self_prefix.#access)) }
            });
            quote! { ::selfschema::Term::Record(vec![ #(#entries),* ]) }
        }
        Fields::Unnamed(_) if items.len() == 1 => {
            quote! { ::selfschema::Encode::to_term(&#self_prefix.0) }
        }
        Fields::Unnamed(_) => {
            let entries = items.iter().map(|f| {
                let access = field_access(f);
                quote! { ::selfschema::Encode::to_term(&#self_prefix.#access) }
            });
            quote! { ::selfschema::Term::Product(vec![ #(#entries),* ]) }
        }
        Fields::Unit => quote! { ::selfschema::Term::Product(vec![]) },
    }
}

/// `to_term` body for an enum variant, where field access is through a
/// `match`-bound name instead of `self.field`. Returns the binding pattern
/// and the payload-building expression.
fn to_term_for_variant_bound(fields: &Fields) -> (TokenStream2, TokenStream2) {
    let items = collect_fields(fields);
    match fields {
        Fields::Named(_) => {
            let names: Vec<_> = items.iter().map(|f| f.ident.clone().unwrap()).collect();
            let entries = items.iter().zip(&names).map(|(f, n)| {
                let label = field_label(f);
                quote! { (#label.to_string(), ::selfschema::Encode::to_term(#n)) }
            });
            (quote! { { #(#names),* } }, quote! { ::selfschema::Term::Record(vec![ #(#entries),* ]) })
        }
        Fields::Unnamed(_) if items.len() == 1 => {
            (quote! { (__v0) }, quote! { ::selfschema::Encode::to_term(__v0) })
        }
        Fields::Unnamed(_) => {
            let names: Vec<_> = (0..items.len()).map(|i| format_ident!("__v{}", i)).collect();
            let entries = names.iter().map(|n| quote! { ::selfschema::Encode::to_term(#n) });
            (quote! { ( #(#names),* ) }, quote! { ::selfschema::Term::Product(vec![ #(#entries),* ]) })
        }
        Fields::Unit => (quote! {}, quote! { ::selfschema::Term::Product(vec![]) }),
    }
}

fn from_term_for_fields(fields: &Fields, construct: TokenStream2) -> TokenStream2 {
    let items = collect_fields(fields);
    match fields {
        Fields::Named(_) => {
            let binds = items.iter().map(|f| {
                let label = field_label(f);
                let ident = f.ident.clone().unwrap();
                quote! {
                    #ident: ::selfschema::Decode::from_term(
                        __field(#label).ok_or(::selfschema::DecodeError::ApiMisuse("missing field"))?
                    )?
                }
            });
            quote! {
                {
                    let __fields = match __payload {
                        ::selfschema::Term::Record(fields) => fields,
                        _ => return Err(::selfschema::DecodeError::ApiMisuse("expected a record term")),
                    };
                    let __field = |name: &str| __fields.iter().find(|(n, _)| n == name).map(|(_, t)| t);
                    #construct { #(#binds),* }
                }
            }
        }
        Fields::Unnamed(_) if items.len() == 1 => {
            quote! { #construct(::selfschema::Decode::from_term(__payload)?) }
        }
        Fields::Unnamed(_) => {
            let arity = items.len();
            let binds = (0..arity).map(|i| quote! { ::selfschema::Decode::from_term(&__items[#i])? });
            quote! {
                {
                    let __items = match __payload {
                        ::selfschema::Term::Product(items) if items.len() == #arity => items,
                        _ => return Err(::selfschema::DecodeError::ApiMisuse("expected a product term of the right arity")),
                    };
                    #construct( #(#binds),* )
                }
            }
        }
        Fields::Unit => {
            quote! {
                match __payload {
                    ::selfschema::Term::Product(items) if items.is_empty() => #construct,
                    _ => return Err(::selfschema::DecodeError::ApiMisuse("expected an empty product term")),
                }
            }
        }
    }
}

/// Per-field extractor expression: the ordinary `Planned::extractor()` for
/// an unmarked field, or a knot-tying reference to `self_ext` for a field
/// wearing `#[schema(recurse)]`.
fn field_extractor_expr(f: &Field, self_ext: &syn::Ident) -> TokenStream2 {
    match f.recurse {
        None => {
            let ty = &f.ty;
            quote! { <#ty as ::selfschema::extractor::Planned>::extractor() }
        }
        Some(_) => match recurse_shape(&f.ty) {
            RecurseShape::Box => quote! { #self_ext.clone().map(::std::boxed::Box::new) },
            RecurseShape::OptionBox => {
                quote! { ::selfschema::extractor::option(#self_ext.clone().map(::std::boxed::Box::new)) }
            }
        },
    }
}

fn field_default_expr(f: &Field) -> TokenStream2 {
    if f.recurse.is_none() && is_option_type(&f.ty) {
        quote! { Some(None) }
    } else {
        quote! { None }
    }
}

/// `Extractor<Payload>` body planning against a `Record`/`Product`/unit
/// payload schema and assembling `construct`. `self_ext` is the recursion
/// handle threaded in by `Extractor::fix`; unused unless some field in
/// `fields` actually recurses.
fn payload_extractor_body(fields: &Fields, construct: TokenStream2, self_ext: &syn::Ident) -> TokenStream2 {
    let items = collect_fields(fields);
    match fields {
        Fields::Named(_) => {
            let tmp_idents: Vec<_> = items.iter().map(field_tmp_ident).collect();
            let lets = items.iter().zip(&tmp_idents).map(|(f, tmp)| {
                let label = field_label(f);
                let extractor = field_extractor_expr(f, self_ext);
                let default = field_default_expr(f);
                quote! {
                    let #tmp = ::selfschema::extractor::record_field(__fields, #label, #extractor, #default)?;
                }
            });
            let idents: Vec<_> = items.iter().map(|f| f.ident.clone().unwrap()).collect();
            quote! {
                let __fields = ::selfschema::extractor::record_fields(schema)?;
                #(#lets)*
                Ok(::selfschema::extractor::TermFn::new(move |term| #construct {
                    #(#idents: #tmp_idents.apply(term)),*
                }))
            }
        }
        Fields::Unnamed(_) if items.len() == 1 => {
            let extractor = field_extractor_expr(&items[0], self_ext);
            quote! {
                let __inner = (#extractor).plan(schema)?;
                Ok(::selfschema::extractor::TermFn::new(move |term| #construct(__inner.apply(term))))
            }
        }
        Fields::Unnamed(_) => {
            let tmp_idents: Vec<_> = items.iter().map(field_tmp_ident).collect();
            let lets = items.iter().zip(&tmp_idents).map(|(f, tmp)| {
                let idx = f.index;
                let extractor = field_extractor_expr(f, self_ext);
                quote! {
                    let #tmp = ::selfschema::extractor::product_field(__items, #idx, #extractor)?;
                }
            });
            quote! {
                let __items = ::selfschema::extractor::product_fields(schema)?;
                #(#lets)*
                Ok(::selfschema::extractor::TermFn::new(move |term| #construct( #(#tmp_idents.apply(term)),* )))
            }
        }
        Fields::Unit => {
            quote! {
                ::selfschema::extractor::unit().plan(schema)?;
                Ok(::selfschema::extractor::TermFn::new(move |_term| #construct))
            }
        }
    }
}

#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    match &input.data {
        Data::Struct(DataStruct { fields, .. }) => derive_struct(name, fields).into(),
        Data::Enum(DataEnum { variants, .. }) => derive_enum(name, variants).into(),
        Data::Union(_) => panic!("#[derive(Schema)] does not support unions"),
    }
}

fn derive_struct(name: &syn::Ident, fields: &Fields) -> TokenStream2 {
    let body_schema = payload_schema(fields);
    let schema_expr = if has_recurse(fields) {
        quote! { ::selfschema::Schema::Fix(::std::boxed::Box::new(#body_schema)) }
    } else {
        body_schema
    };

    let to_term_body = to_term_for_fields(fields, quote! { self });
    let from_term_body = from_term_for_fields(fields, quote! { Self });

    let self_ext = format_ident!("__self_ext");
    let extractor_body = payload_extractor_body(fields, quote! { Self }, &self_ext);
    let extractor_fn = if has_recurse(fields) {
        quote! {
            ::selfschema::extractor::Extractor::fix(|#self_ext| {
                ::selfschema::extractor::Extractor::new(move |schema| {
                    #extractor_body
                })
            })
        }
    } else {
        quote! {
            ::selfschema::extractor::Extractor::new(|schema| {
                #extractor_body
            })
        }
    };

    quote! {
        impl ::selfschema::KnownSchema for #name {
            fn schema() -> ::selfschema::Schema {
                #schema_expr
            }
        }

        impl ::selfschema::Encode for #name {
            fn to_term(&self) -> ::selfschema::Term {
                #to_term_body
            }
        }

        impl ::selfschema::Decode for #name {
            fn from_term(term: &::selfschema::Term) -> ::selfschema::error::DecodeResult<Self> {
                let __payload = term;
                Ok(#from_term_body)
            }
        }

        impl ::selfschema::extractor::Planned for #name {
            fn extractor() -> ::selfschema::extractor::Extractor<Self> {
                #extractor_fn
            }
        }
    }
}

fn derive_enum(
    name: &syn::Ident,
    variants: &syn::punctuated::Punctuated<syn::Variant, syn::token::Comma>,
) -> TokenStream2 {
    let any_recurse = variants.iter().any(|v| has_recurse(&v.fields));

    let ctor_entries = variants.iter().map(|v| {
        let vname = v.ident.to_string();
        let schema = payload_schema(&v.fields);
        quote! { ::selfschema::schema::VariantCtor::from((#vname, #schema)) }
    });
    let body_schema = quote! { ::selfschema::Schema::Variant(vec![ #(#ctor_entries),* ]) };
    let schema_expr = if any_recurse {
        quote! { ::selfschema::Schema::Fix(::std::boxed::Box::new(#body_schema)) }
    } else {
        body_schema
    };

    let to_term_arms = variants.iter().enumerate().map(|(tag, v)| {
        let vident = &v.ident;
        let vname = v.ident.to_string();
        let tag = tag as u32;
        let (pattern, payload_expr) = to_term_for_variant_bound(&v.fields);
        quote! {
            Self::#vident #pattern => ::selfschema::Term::variant(#tag, #vname, #payload_expr),
        }
    });

    let from_term_arms = variants.iter().map(|v| {
        let vident = &v.ident;
        let vname = v.ident.to_string();
        let construct = quote! { Self::#vident };
        let body = from_term_for_fields(&v.fields, construct);
        quote! { #vname => #body, }
    });

    let self_ext = format_ident!("__self_ext");
    let case_entries = variants.iter().map(|v| {
        let vname = v.ident.to_string();
        let vident = &v.ident;
        let construct = quote! { Self::#vident };
        let body = payload_extractor_body(&v.fields, construct, &self_ext);
        if has_recurse(&v.fields) {
            // Each recursive case closure needs its own handle: they all close
            // over the same Extractor::fix parameter, and Extractor isn't Copy,
            // so a shared `move` capture across variants would only let one of
            // them actually take it.
            quote! {
                (#vname, {
                    let #self_ext = #self_ext.clone();
                    ::selfschema::extractor::Extractor::new(move |schema| { #body })
                })
            }
        } else {
            quote! {
                (#vname, ::selfschema::extractor::Extractor::new(move |schema| { #body }))
            }
        }
    });

    let extractor_inner = quote! {
        ::selfschema::extractor::variant(vec![ #(#case_entries),* ])
    };
    let extractor_fn = if any_recurse {
        quote! { ::selfschema::extractor::Extractor::fix(|#self_ext| #extractor_inner) }
    } else {
        quote! { #extractor_inner }
    };

    quote! {
        impl ::selfschema::KnownSchema for #name {
            fn schema() -> ::selfschema::Schema {
                #schema_expr
            }
        }

        impl ::selfschema::Encode for #name {
            fn to_term(&self) -> ::selfschema::Term {
                match self {
                    #(#to_term_arms)*
                }
            }
        }

        impl ::selfschema::Decode for #name {
            fn from_term(term: &::selfschema::Term) -> ::selfschema::error::DecodeResult<Self> {
                let (__name, __payload): (&str, &::selfschema::Term) = match term {
                    ::selfschema::Term::Variant { name, payload, .. } => (name.as_str(), payload.as_ref()),
                    _ => return Err(::selfschema::DecodeError::ApiMisuse("expected a variant term")),
                };
                Ok(match __name {
                    #(#from_term_arms)*
                    _ => return Err(::selfschema::DecodeError::ApiMisuse("unrecognised variant constructor")),
                })
            }
        }

        impl ::selfschema::extractor::Planned for #name {
            fn extractor() -> ::selfschema::extractor::Extractor<Self> {
                #extractor_fn
            }
        }
    }
}
