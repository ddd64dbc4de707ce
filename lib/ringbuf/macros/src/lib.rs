// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

extern crate proc_macro;
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span};
use quote::{quote, ToTokens};
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, DeriveInput,
};

/// Derives an implementation of the `ringbuf::Count` trait for the annotated
/// `enum` type.
///
/// # Variant attributes
///
/// - `#[count(skip)]`: don't generate a counter for this variant. Trace
///   enums usually have a `None` variant that only initializes the buffer.
///
/// - `#[count(children)]`, on the single field of a variant whose type also
///   implements `Count`: count that field's variants in a nested counter
///   struct instead of counting the outer variant as a whole.
#[proc_macro_derive(Count, attributes(count))]
pub fn derive_count(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match gen_count_impl(input) {
        Ok(tokens) => tokens.to_token_stream().into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Generate the event counts static for a ringbuffer.
///
/// This has to be a proc-macro to paste `_COUNTS` onto the ringbuf's name.
/// It is invoked by `counted_ringbuf!`.
#[doc(hidden)]
#[proc_macro]
pub fn declare_counts(input: TokenStream) -> TokenStream {
    let DeclareCounts { ident, ty } =
        parse_macro_input!(input as DeclareCounts);
    let counts_ident = counts_ident(&ident);
    quote! {
        #[used]
        static #counts_ident: <#ty as ringbuf::Count>::Counters =
            <#ty as ringbuf::Count>::NEW_COUNTERS;
    }
    .into()
}

/// Increment the event count in a ringbuffer for a particular event.
///
/// Invoked by `count_entry!`, inside a critical section.
#[doc(hidden)]
#[proc_macro]
pub fn incr_count(input: TokenStream) -> TokenStream {
    let IncrCount { mut path, expr } = parse_macro_input!(input as IncrCount);
    let Some(last) = path.segments.last_mut() else {
        return syn::Error::new(Span::call_site(), "path may not be empty")
            .to_compile_error()
            .into();
    };
    last.ident = counts_ident(&last.ident);

    quote! {
        ringbuf::Count::count(#expr, &#path)
    }
    .into()
}

struct DeclareCounts {
    ident: Ident,
    ty: syn::Type,
}

struct IncrCount {
    path: syn::Path,
    expr: syn::Expr,
}

impl Parse for DeclareCounts {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let ident = input.parse()?;
        input.parse::<syn::Token![,]>()?;
        let ty = input.parse()?;
        Ok(DeclareCounts { ident, ty })
    }
}

impl Parse for IncrCount {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let path = input.parse()?;
        input.parse::<syn::Token![,]>()?;
        let expr = input.parse()?;
        Ok(IncrCount { path, expr })
    }
}

fn gen_count_impl(input: DeriveInput) -> Result<impl ToTokens, syn::Error> {
    let data_enum = match input.data {
        syn::Data::Enum(ref data_enum) => data_enum,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "`Count` can only be derived for enums",
            ));
        }
    };
    let variants = &data_enum.variants;
    let mut state = CountGenerator::new(&input.ident, variants.len());

    for variant in variants {
        state.add_variant(variant)?;
    }

    Ok(state.generate(&input))
}

struct CountGenerator<'input> {
    enum_name: &'input syn::Ident,
    field_defs: Vec<proc_macro2::TokenStream>,
    field_inits: Vec<proc_macro2::TokenStream>,
    variant_patterns: Vec<proc_macro2::TokenStream>,
    any_skipped: bool,
}

/// Load-then-store increment; see `ringbuf::Count::count`.
fn bump(counter: proc_macro2::TokenStream) -> proc_macro2::TokenStream {
    quote! {{
        let c = &#counter;
        c.store(
            c.load(core::sync::atomic::Ordering::Relaxed).wrapping_add(1),
            core::sync::atomic::Ordering::Relaxed,
        );
    }}
}

impl<'input> CountGenerator<'input> {
    fn new(enum_name: &'input syn::Ident, variants: usize) -> Self {
        Self {
            enum_name,
            field_defs: Vec::with_capacity(variants),
            field_inits: Vec::with_capacity(variants),
            variant_patterns: Vec::with_capacity(variants),
            any_skipped: false,
        }
    }

    fn generate(self, input: &DeriveInput) -> impl ToTokens {
        let Self {
            enum_name,
            field_defs,
            field_inits,
            mut variant_patterns,
            any_skipped,
        } = self;

        if any_skipped {
            variant_patterns.push(quote! { _ => {} });
        }
        let vis = &input.vis;

        let counts_ty = counts_ty(enum_name);
        quote! {
            #[doc = concat!("Total counts for [`", stringify!(#enum_name), "`].")]
            #[allow(nonstandard_style)]
            #vis struct #counts_ty {
                #(#field_defs),*
            }

            #[automatically_derived]
            impl ringbuf::Count for #enum_name {
                type Counters = #counts_ty;

                // Only ever used as a static initializer.
                #[allow(clippy::declare_interior_mutable_const)]
                const NEW_COUNTERS: #counts_ty = #counts_ty {
                    #(#field_inits),*
                };

                fn count(&self, counters: &Self::Counters) {
                    match self {
                        #(#variant_patterns),*
                    };
                }
            }
        }
    }

    fn add_variant(
        &mut self,
        variant: &syn::Variant,
    ) -> Result<(), syn::Error> {
        for attr in &variant.attrs {
            if !attr.path().is_ident("count") {
                continue;
            }
            attr.parse_args_with(SkipAttr::parse)?;
            self.any_skipped = true;
            return Ok(());
        }
        let enum_name = self.enum_name;
        let variant_name = &variant.ident;
        match &variant.fields {
            syn::Fields::Unit => {
                let bump = bump(quote! { counters.#variant_name });
                self.variant_patterns
                    .push(quote! { #enum_name::#variant_name => #bump });
                self.add_def_init(variant_name);
            }
            ref fields => {
                if let Some((i, counted_field)) = find_counted_field(fields)? {
                    self.add_count_children_def_init(
                        variant_name,
                        &counted_field.ty,
                    );
                    match &counted_field.ident {
                        Some(field_name) => {
                            self.variant_patterns.push(quote! {
                                #enum_name::#variant_name { ref #field_name, .. } => {
                                    ringbuf::Count::count(#field_name, &counters.#variant_name);
                                }
                            });
                        }
                        None => {
                            let mut pattern = Vec::new();
                            for _ in 0..i {
                                pattern.push(quote! { _, });
                            }
                            pattern.push(quote! { ref f, });
                            if fields.len() > i + 1 {
                                pattern.push(quote! { .. });
                            }
                            self.variant_patterns.push(quote! {
                                #enum_name::#variant_name(#(#pattern)*) => {
                                    ringbuf::Count::count(f, &counters.#variant_name);
                                }
                            });
                        }
                    }
                } else {
                    self.add_def_init(variant_name);
                    let bump = bump(quote! { counters.#variant_name });
                    if let syn::Fields::Named(_) = fields {
                        self.variant_patterns.push(quote! {
                            #enum_name::#variant_name { .. } => #bump
                        });
                    } else {
                        self.variant_patterns.push(quote! {
                            #enum_name::#variant_name(..) => #bump
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn add_def_init(&mut self, variant_name: &syn::Ident) {
        let Self {
            field_defs,
            field_inits,
            enum_name,
            ..
        } = self;
        field_defs.push(quote! {
            #[doc = concat!(
                " The total number of times a [`",
                stringify!(#enum_name), "::", stringify!(#variant_name),
                "`]"
            )]
            #[doc = " has been recorded by this set of counters."]
            pub #variant_name: core::sync::atomic::AtomicU32
        });
        field_inits.push(
            quote! { #variant_name: core::sync::atomic::AtomicU32::new(0) },
        );
    }

    fn add_count_children_def_init(
        &mut self,
        variant_name: &syn::Ident,
        variant_type: &syn::Type,
    ) {
        let Self {
            field_defs,
            field_inits,
            enum_name,
            ..
        } = self;
        field_defs.push(quote! {
            #[doc = concat!(
                " Counts of the nested events carried by [`",
                stringify!(#enum_name), "::", stringify!(#variant_name),
                "`]."
            )]
            pub #variant_name: <#variant_type as ringbuf::Count>::Counters
        });
        field_inits.push(quote! {
            #variant_name: <#variant_type as ringbuf::Count>::NEW_COUNTERS
        });
    }
}

fn find_counted_field(
    fields: &syn::Fields,
) -> syn::Result<Option<(usize, &syn::Field)>> {
    let mut counted_field = None;
    for (i, field) in fields.iter().enumerate() {
        for attr in &field.attrs {
            if !attr.path().is_ident("count") {
                continue;
            }
            attr.parse_args_with(ChildrenAttr::parse)?;

            if counted_field.is_some() {
                return Err(syn::Error::new_spanned(
                    field,
                    "a variant may only have one field annotated \
                    with `#[count(children)]`",
                ));
            }
            counted_field = Some((i, field));
        }
    }

    Ok(counted_field)
}

struct SkipAttr;

struct ChildrenAttr;

fn parse_keyword(
    input: ParseStream<'_>,
    keyword: &str,
    expected: &str,
) -> syn::Result<()> {
    let ident = input.fork().parse::<syn::Ident>()?;
    if ident == keyword {
        let _: syn::Ident = input.parse()?;
        Ok(())
    } else {
        Err(syn::Error::new(
            ident.span(),
            format!("unrecognized `#[count]` attribute, expected `{expected}`"),
        ))
    }
}

impl Parse for SkipAttr {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        parse_keyword(input, "skip", "#[count(skip)]").map(|()| Self)
    }
}

impl Parse for ChildrenAttr {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        parse_keyword(input, "children", "#[count(children)]").map(|()| Self)
    }
}

fn counts_ident(ident: &Ident) -> Ident {
    Ident::new(&format!("{ident}_COUNTS"), Span::call_site())
}

fn counts_ty(ident: &Ident) -> Ident {
    Ident::new(&format!("{ident}Counts"), Span::call_site())
}
