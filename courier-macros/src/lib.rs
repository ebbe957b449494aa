mod utils;

use proc_macro::TokenStream;

use utils::{RuntimeArgs, compile_error, wrap_body};

/// Runs an `async fn main` on a fresh courier runtime.
///
/// ```rust,ignore
/// #[courier::main(worker_threads = 2)]
/// async fn main() {
///     courier::yield_now().await;
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let expanded = RuntimeArgs::parse(attr).and_then(|args| wrap_body(item, &args));

    match expanded {
        Ok(tokens) => tokens.into_iter().collect(),
        Err(message) => compile_error(&message),
    }
}

/// Runs an `async fn` test on its own courier runtime.
///
/// Accepts the same options as [`main`](macro@main).
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let expanded = RuntimeArgs::parse(attr).and_then(|args| wrap_body(item, &args));

    match expanded {
        Ok(tokens) => {
            let mut result: TokenStream = "#[::core::prelude::v1::test]"
                .parse()
                .unwrap_or_default();
            result.extend(tokens);
            result
        }
        Err(message) => compile_error(&message),
    }
}
