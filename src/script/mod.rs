//! Macro scripting — a small expression language with an allow-listed
//! capability surface, used by `script` actions and injections.

pub mod eval;
pub mod lexer;
pub mod parser;

pub use eval::{Evaluator, Scope, Value};
pub use parser::{parse_expression, parse_program};

/// Evaluate an expression and return its string form.
pub async fn evaluate(source: &str, scope: &Scope<'_>) -> Result<String, String> {
    let expr = parse_expression(source)?;
    let mut evaluator = Evaluator::new(scope);
    Ok(evaluator.eval(&expr).await?.to_string())
}

/// Run a script to completion, discarding its value.
pub async fn run(source: &str, scope: &Scope<'_>) -> Result<(), String> {
    let program = parse_program(source)?;
    Evaluator::new(scope).run(&program).await?;
    Ok(())
}

/// Syntax-check a script without running it.
pub fn check_program(source: &str) -> Result<(), String> {
    parse_program(source).map(|_| ())
}

/// Syntax-check an expression without running it.
pub fn check_expression(source: &str) -> Result<(), String> {
    parse_expression(source).map(|_| ())
}
