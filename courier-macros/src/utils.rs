use proc_macro::{Delimiter, Group, Ident, Literal, Span, TokenStream, TokenTree};

/// Options accepted by `#[courier::main]` and `#[courier::test]`.
#[derive(Default)]
pub(crate) struct RuntimeArgs {
    worker_threads: Option<usize>,
}

impl RuntimeArgs {
    /// Parses `worker_threads = N`, the only option so far.
    pub(crate) fn parse(attr: TokenStream) -> Result<Self, String> {
        let mut args = RuntimeArgs::default();
        let tokens: Vec<TokenTree> = attr.into_iter().collect();

        for option in tokens.split(|t| matches!(t, TokenTree::Punct(p) if p.as_char() == ',')) {
            match option {
                [] => {}
                [
                    TokenTree::Ident(name),
                    TokenTree::Punct(eq),
                    TokenTree::Literal(value),
                ] if eq.as_char() == '=' => match name.to_string().as_str() {
                    "worker_threads" => {
                        let n = value
                            .to_string()
                            .parse::<usize>()
                            .map_err(|_| format!("invalid worker_threads value `{value}`"))?;

                        if n == 0 {
                            return Err("worker_threads must be greater than 0".into());
                        }
                        args.worker_threads = Some(n);
                    }
                    other => return Err(format!("unknown option `{other}`")),
                },
                _ => return Err("expected `option = value`".into()),
            }
        }

        Ok(args)
    }

    /// The expression building the runtime.
    fn builder(&self) -> String {
        let mut builder = String::from("::courier::RuntimeBuilder::new()");

        if let Some(n) = self.worker_threads {
            builder.push_str(&format!(".worker_threads({n})"));
        }

        builder.push_str(".build().expect(\"failed to start the courier runtime\")");
        builder
    }
}

/// Turns `async fn f() { body }` into `fn f() { runtime.block_on(async move { body }) }`.
pub(crate) fn wrap_body(item: TokenStream, args: &RuntimeArgs) -> Result<Vec<TokenTree>, String> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let async_pos = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
        .ok_or("the function must be `async`")?;
    tokens.remove(async_pos);

    let body_pos = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
        .ok_or("expected a function body")?;

    let TokenTree::Group(body) = &tokens[body_pos] else {
        return Err("expected a function body".into());
    };

    let mut future = vec![
        TokenTree::Ident(Ident::new("async", Span::call_site())),
        TokenTree::Ident(Ident::new("move", Span::call_site())),
    ];
    future.push(TokenTree::Group(Group::new(Delimiter::Brace, body.stream())));

    let prelude: TokenStream = format!("let __courier_runtime = {}; __courier_runtime.block_on", args.builder())
        .parse()
        .map_err(|err| format!("{err}"))?;

    let mut block: Vec<TokenTree> = prelude.into_iter().collect();
    block.push(TokenTree::Group(Group::new(
        Delimiter::Parenthesis,
        future.into_iter().collect(),
    )));

    tokens[body_pos] = TokenTree::Group(Group::new(Delimiter::Brace, block.into_iter().collect()));

    Ok(tokens)
}

/// Expands to a `compile_error!` carrying `message`.
pub(crate) fn compile_error(message: &str) -> TokenStream {
    let mut tokens: Vec<TokenTree> = "::core::compile_error!"
        .parse::<TokenStream>()
        .map(|ts| ts.into_iter().collect())
        .unwrap_or_default();

    tokens.push(TokenTree::Group(Group::new(
        Delimiter::Parenthesis,
        TokenTree::Literal(Literal::string(message)).into(),
    )));

    tokens.into_iter().collect()
}
