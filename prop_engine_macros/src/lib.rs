//! This crate provides the `#[property]` attribute. Its use is documented
//! in the `prop_engine` crate.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, FnArg, Ident, ItemFn, Pat, ReturnType};

/// Expands
///
/// ```ignore
/// #[property]
/// fn doubling_is_monotonic(a: i64, b: i64) -> bool {
///     a <= b || a * 2 <= b * 2
/// }
/// ```
///
/// into a `#[test]` that builds a one-quantifier-per-argument scenario from
/// each argument's `prop_engine::arbitrary::DefaultArbitrary` impl,
/// compiles it, and asserts the result is satisfiable -- a single typed
/// function pointer promoted to a named-quantifier scenario per argument.
#[proc_macro_attribute]
pub fn property(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let inner = parse_macro_input!(item as ItemFn);
    let outer_ident = inner.sig.ident.clone();
    let inner_ident = Ident::new(&format!("__{}_property_body", outer_ident), outer_ident.span());

    let mut renamed_inner = inner.clone();
    renamed_inner.sig.ident = inner_ident.clone();

    let mut names = Vec::new();
    let mut tys = Vec::new();
    for arg in &inner.sig.inputs {
        let FnArg::Typed(pat_ty) = arg else {
            return syn::Error::new_spanned(arg, "#[property] does not support `self` receivers")
                .to_compile_error()
                .into();
        };
        let Pat::Ident(pat_ident) = pat_ty.pat.as_ref() else {
            return syn::Error::new_spanned(pat_ty, "#[property] arguments must be simple identifiers")
                .to_compile_error()
                .into();
        };
        names.push(pat_ident.ident.to_string());
        tys.push(pat_ty.ty.clone());
    }

    let bindings = names.iter().zip(tys.iter()).map(|(name, ty)| {
        quote! {
            .forall(#name, <#ty as ::prop_engine::arbitrary::DefaultArbitrary>::default_arbitrary())
        }
    });

    let arg_idents: Vec<Ident> = names.iter().map(|n| Ident::new(n, proc_macro2::Span::call_site())).collect();
    let fetches = names.iter().zip(tys.iter()).zip(arg_idents.iter()).map(|((name, ty), ident)| {
        quote! {
            let #ident: #ty = ::std::clone::Clone::clone(case.get::<#ty>(#name).expect("quantifier bound by scenario compile"));
        }
    });

    let call = quote! { #inner_ident(#(#arg_idents),*) };

    let property_expr = match &inner.sig.output {
        ReturnType::Default => quote! { { #call; ::std::result::Result::Ok(true) } },
        _ => quote! { ::std::result::Result::Ok(#call) },
    };

    let fn_name_str = outer_ident.to_string();

    let expanded = quote! {
        #[test]
        fn #outer_ident() {
            #renamed_inner

            let scenario = ::prop_engine::scenario::Scenario::new()
                #(#bindings)*
                .then(move |case| {
                    #(#fetches)*
                    #property_expr
                })
                .compile()
                .expect("#[property] scenario failed to compile");

            let result = ::prop_engine::check::Check::new().run(scenario);
            if !result.satisfiable() {
                panic!("property `{}` was falsified (seed={})", #fn_name_str, result.seed);
            }
        }
    };

    expanded.into()
}
