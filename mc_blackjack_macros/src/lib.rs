use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Ident, ImplItemFn};

/// This macro is added before a method of `EpisodeSimulator` in the impl block.
/// Use this macro to first check if the current game phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(PlayerTurn)]` will make a method first check
/// if the current game phase is `PlayerTurn`. If not, the method will return
/// `BlackjackError::PhaseViolation` naming the method and both phases.
///
/// The annotated method must return `crate::Result<_>` and `GamePhase` must be in scope.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream, item: TokenStream) -> TokenStream {
    let phase = parse_macro_input!(attr as Ident);
    let mut ast = parse_macro_input!(item as ImplItemFn);
    let operation = ast.sig.ident.to_string();

    let early_return: syn::Stmt = syn::parse_quote! {
        if self.current_game_phase != GamePhase::#phase {
            return Err(crate::BlackjackError::PhaseViolation {
                operation: #operation,
                expected: GamePhase::#phase,
                actual: self.current_game_phase,
            });
        }
    };
    ast.block.stmts.insert(0, early_return);
    quote!(#ast).into()
}
