use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, BinOp, Block, Expr, ExprLit, Ident, Pat, Stmt, UnOp,
};

/// Builds a computation graph from plain arithmetic.
///
/// Every `let` binds a `::valuegrad::Value`. Literals become leaves, `+ - * /`
/// and unary `-` become graph operations, and `relu(x)`, `tanh(x)`, `neg(x)`
/// and `pow(x, y)` call the corresponding library functions.
///
/// ```ignore
/// valuegrad! {{
///     let x = 2.;
///     let y = relu(x * 3. - 1.);
/// }}
/// y.backward();
/// ```
#[proc_macro]
pub fn valuegrad(input: TokenStream) -> TokenStream {
    // Parse the input tokens into a syntax tree
    let input = parse_macro_input!(input as Block);

    let mut objs = vec![];

    for stmt in &input.stmts {
        if let Err(err) = traverse_stmt(stmt, &mut objs) {
            return err.to_compile_error().into();
        }
    }

    let expanded = quote! {
        #(#objs)*
    };

    TokenStream::from(expanded)
}

fn traverse_stmt(input: &Stmt, terms: &mut Vec<TokenStream2>) -> syn::Result<()> {
    match input {
        Stmt::Local(local) => {
            let Pat::Ident(id) = &local.pat else {
                return Err(syn::Error::new(
                    local.pat.span(),
                    "expected a plain identifier",
                ));
            };
            let Some(init) = &local.init else {
                return Err(syn::Error::new(local.span(), "expected an initializer"));
            };
            let name = id.ident.clone();
            let ts = match &*init.expr {
                Expr::Lit(lit) => {
                    let lit = &lit.lit;
                    quote! {
                        let #name = ::valuegrad::Value::from(#lit as f64);
                    }
                }
                Expr::Path(path) => quote! {
                    let #name = #path.clone();
                },
                ex => {
                    let res = traverse_expr(ex, terms)?;
                    quote! {
                        let #name = #res;
                    }
                }
            };
            terms.push(ts);
            Ok(())
        }
        Stmt::Expr(ex, _) => traverse_expr(ex, terms).map(|_| ()),
        _ => Err(syn::Error::new(input.span(), "unsupported statement")),
    }
}

fn var_name(terms: &[TokenStream2]) -> String {
    format!("_a{}", terms.len())
}

fn format_term(ex: &ExprLit, terms: &mut Vec<TokenStream2>) -> Ident {
    let name = Ident::new(&var_name(terms), ex.span());
    let lit = &ex.lit;
    let ts = quote! {
        let #name = ::valuegrad::Value::from(#lit as f64);
    };
    terms.push(ts);
    name
}

fn push_term(terms: &mut Vec<TokenStream2>, span: proc_macro2::Span, op: TokenStream2) -> Ident {
    let name = Ident::new(&var_name(terms), span);
    terms.push(quote! {
        let #name = #op;
    });
    name
}

fn traverse_expr(input: &Expr, terms: &mut Vec<TokenStream2>) -> syn::Result<Ident> {
    match input {
        Expr::Binary(ex) => {
            let lhs = traverse_expr(&ex.left, terms)?;
            let rhs = traverse_expr(&ex.right, terms)?;
            let binop = match ex.op {
                BinOp::Add(_) => quote! { &#lhs + &#rhs },
                BinOp::Sub(_) => quote! { &#lhs - &#rhs },
                BinOp::Mul(_) => quote! { &#lhs * &#rhs },
                BinOp::Div(_) => quote! { &#lhs / &#rhs },
                _ => return Err(syn::Error::new(ex.op.span(), "unsupported operator")),
            };
            Ok(push_term(terms, ex.span(), binop))
        }
        Expr::Unary(ex) => {
            if !matches!(ex.op, UnOp::Neg(_)) {
                return Err(syn::Error::new(ex.op.span(), "unsupported operator"));
            }
            let term = traverse_expr(&ex.expr, terms)?;
            Ok(push_term(terms, ex.span(), quote! { -&#term }))
        }
        Expr::Paren(ex) => traverse_expr(&ex.expr, terms),
        Expr::Lit(lit) => Ok(format_term(lit, terms)),
        Expr::Path(path) => path
            .path
            .get_ident()
            .cloned()
            .ok_or_else(|| syn::Error::new(path.span(), "expected a local variable")),
        Expr::Call(call) => {
            let Expr::Path(func) = &*call.func else {
                return Err(syn::Error::new(call.func.span(), "expected a function name"));
            };
            let func = func
                .path
                .get_ident()
                .cloned()
                .ok_or_else(|| syn::Error::new(func.span(), "expected a function name"))?;
            let arity = match func.to_string().as_str() {
                "relu" | "tanh" | "neg" => 1,
                "pow" => 2,
                _ => return Err(syn::Error::new(func.span(), "unknown function")),
            };
            if call.args.len() != arity {
                return Err(syn::Error::new(
                    call.args.span(),
                    format!("`{func}` takes {arity} argument(s)"),
                ));
            }
            let args = call
                .args
                .iter()
                .map(|arg| traverse_expr(arg, terms))
                .collect::<syn::Result<Vec<_>>>()?;
            Ok(push_term(
                terms,
                call.span(),
                quote! { ::valuegrad::#func(#(&#args),*) },
            ))
        }
        _ => Err(syn::Error::new(input.span(), "unsupported expression")),
    }
}
