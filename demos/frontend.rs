use htsc::{error::Diagnostics, lex, optimize::{Annotate, Pass}, parse, source::Source};
use std::io::{self, Read};

fn main() -> io::Result<()> {
    let mut text = String::new();
    io::stdin().lock().read_to_string(&mut text)?;

    let source = Source::new("<stdin>", &text);
    let lex::Tokens { tokens, warnings } = lex::tokenize(&source);

    print!("Tokens: {:#?}\n\n", tokens.iter().map(|token| token.val()).collect::<Vec<_>>());
    if !warnings.is_empty() {
        eprint!("{}", Diagnostics::from(warnings).kind("warning"));
    }

    let diagnostics = match parse::parse(&tokens) {
        Err(error) => Diagnostics::from(error).kind("Syntax error"),

        Ok((parsed, state)) => {
            print!("IR: {:#?}\n\n", parsed.program.statements().collect::<Vec<_>>());
            print!("Symbols: {:#?}\n\n", state.symbols.iter().collect::<Vec<_>>());
            print!("Jobs: {:#?}\n\n", parsed.jobs);

            let program = Annotate.run(parsed.program);
            for record in htsc::codegen::generate(&program) {
                println!("{}", record);
            }

            Diagnostics::default()
        }
    };

    if !diagnostics.is_empty() {
        eprint!("{}", diagnostics);
    }

    Ok(())
}
