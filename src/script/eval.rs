//! NM-012: Evaluator for macro scripts and injection expressions.
//!
//! Only the functions listed in `call` exist. Anything reaching outside the
//! process goes through the run's `Capabilities`.

use super::parser::{BinOp, Expr, Stmt, UnOp};
use crate::core::dateformat;
use crate::core::types::Args;
use crate::host::{shell, Capabilities, PromptRequest};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// A script value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty(),
            Self::Num(n) => *n != 0.0 && !n.is_nan(),
            Self::Bool(b) => *b,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Num(_) => "number",
            Self::Bool(_) => "bool",
        }
    }

    fn as_num(&self, op: &str) -> Result<f64, String> {
        match self {
            Self::Num(n) => Ok(*n),
            other => Err(format!("'{}' needs numbers, got {}", op, other.type_name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{}", s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Num(n) => write!(f, "{}", n),
        }
    }
}

/// What a script can see of the world.
pub struct Scope<'a> {
    pub caps: Capabilities<'a>,
    pub workspace: &'a Path,
    pub vars: &'a HashMap<String, String>,
    pub now: NaiveDateTime,
}

type EvalFuture<'e> = Pin<Box<dyn Future<Output = Result<Value, String>> + 'e>>;

/// Evaluates statements against a scope, keeping `let` bindings.
pub struct Evaluator<'s, 'a> {
    scope: &'s Scope<'a>,
    locals: HashMap<String, Value>,
}

impl<'s, 'a> Evaluator<'s, 'a> {
    pub fn new(scope: &'s Scope<'a>) -> Self {
        Self {
            scope,
            locals: HashMap::new(),
        }
    }

    /// Run statements in order. Returns the last expression's value.
    pub async fn run(&mut self, program: &[Stmt]) -> Result<Option<Value>, String> {
        let mut last = None;
        for stmt in program {
            match stmt {
                Stmt::Let(name, expr) => {
                    let value = self.eval(expr).await?;
                    self.locals.insert(name.clone(), value);
                    last = None;
                }
                Stmt::Expr(expr) => last = Some(self.eval(expr).await?),
            }
        }
        Ok(last)
    }

    /// Evaluate one expression.
    pub fn eval<'e>(&'e mut self, expr: &'e Expr) -> EvalFuture<'e> {
        Box::pin(async move {
            match expr {
                Expr::Num(n) => Ok(Value::Num(*n)),
                Expr::Str(s) => Ok(Value::Str(s.clone())),
                Expr::Bool(b) => Ok(Value::Bool(*b)),
                Expr::Var(name) => self.lookup(name),
                Expr::Unary(op, inner) => {
                    let value = self.eval(inner).await?;
                    match op {
                        UnOp::Neg => Ok(Value::Num(-value.as_num("-")?)),
                        UnOp::Not => Ok(Value::Bool(!value.truthy())),
                    }
                }
                Expr::Binary(BinOp::And, lhs, rhs) => {
                    if !self.eval(lhs).await?.truthy() {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(self.eval(rhs).await?.truthy()))
                }
                Expr::Binary(BinOp::Or, lhs, rhs) => {
                    if self.eval(lhs).await?.truthy() {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(self.eval(rhs).await?.truthy()))
                }
                Expr::Binary(op, lhs, rhs) => {
                    let l = self.eval(lhs).await?;
                    let r = self.eval(rhs).await?;
                    binary(*op, l, r)
                }
                Expr::Call(name, arg_exprs) => {
                    let mut args = Vec::with_capacity(arg_exprs.len());
                    for arg in arg_exprs {
                        args.push(self.eval(arg).await?);
                    }
                    self.call(name, args).await
                }
            }
        })
    }

    fn lookup(&self, name: &str) -> Result<Value, String> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        self.scope
            .vars
            .get(name)
            .map(|v| Value::Str(v.clone()))
            .ok_or_else(|| format!("unknown variable: {}", name))
    }

    async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, String> {
        let scope = self.scope;
        let editor = scope.caps.editor;
        match name {
            "date" => {
                arity(name, &args, 0, 1)?;
                let pattern = args
                    .first()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| dateformat::DEFAULT_PATTERN.to_string());
                Ok(Value::Str(dateformat::format(&scope.now, &pattern)))
            }
            "clipboard" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::Str(editor.clipboard().unwrap_or_default()))
            }
            "selection" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::Str(editor.selection().unwrap_or_default()))
            }
            "file" => {
                arity(name, &args, 0, 0)?;
                let file = editor
                    .active_file()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                Ok(Value::Str(file))
            }
            "workspace" => {
                arity(name, &args, 0, 0)?;
                Ok(Value::Str(scope.workspace.display().to_string()))
            }
            "env" => {
                arity(name, &args, 1, 1)?;
                Ok(Value::Str(std::env::var(args[0].to_string()).unwrap_or_default()))
            }
            "var" => {
                arity(name, &args, 1, 1)?;
                let key = args[0].to_string();
                Ok(Value::Str(scope.vars.get(&key).cloned().unwrap_or_default()))
            }
            "upper" => {
                arity(name, &args, 1, 1)?;
                Ok(Value::Str(args[0].to_string().to_uppercase()))
            }
            "lower" => {
                arity(name, &args, 1, 1)?;
                Ok(Value::Str(args[0].to_string().to_lowercase()))
            }
            "trim" => {
                arity(name, &args, 1, 1)?;
                Ok(Value::Str(args[0].to_string().trim().to_string()))
            }
            "len" => {
                arity(name, &args, 1, 1)?;
                Ok(Value::Num(args[0].to_string().chars().count() as f64))
            }
            "replace" => {
                arity(name, &args, 3, 3)?;
                let (text, from, to) = (args[0].to_string(), args[1].to_string(), args[2].to_string());
                Ok(Value::Str(text.replace(&from, &to)))
            }
            "concat" => Ok(Value::Str(args.iter().map(|a| a.to_string()).collect())),
            "prompt" => {
                arity(name, &args, 1, 2)?;
                let mut request = PromptRequest::new(args[0].to_string());
                if let Some(placeholder) = args.get(1) {
                    request = request.with_placeholder(placeholder.to_string());
                }
                let answer = scope.caps.prompter.input(&request).await;
                Ok(Value::Str(answer.unwrap_or_default()))
            }
            "exec" => {
                if args.is_empty() || args.len() % 2 == 0 {
                    return Err("exec expects a command name followed by key, value pairs".to_string());
                }
                let command = args[0].to_string();
                let command_args: Option<Args> = (args.len() > 1).then(|| {
                    args[1..]
                        .chunks(2)
                        .map(|pair| {
                            (
                                pair[0].to_string(),
                                serde_yaml_ng::Value::String(pair[1].to_string()),
                            )
                        })
                        .collect()
                });
                scope
                    .caps
                    .host
                    .execute(&command, command_args.as_ref())
                    .await
                    .map_err(|e| format!("command '{}' failed: {}", command, e))?;
                Ok(Value::Str(String::new()))
            }
            "shell" => {
                arity(name, &args, 1, 1)?;
                let cwd = Some(scope.workspace).filter(|dir| dir.is_dir());
                let out = shell::exec_checked(&args[0].to_string(), cwd)?;
                Ok(Value::Str(out.stdout.trim_end_matches('\n').to_string()))
            }
            "log" => {
                let line = args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(" ");
                tracing::info!(target: "notemacro::script", "{}", line);
                Ok(Value::Str(line))
            }
            other => Err(format!("unknown function: {}", other)),
        }
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{}..={}", min, max)
        };
        return Err(format!(
            "{}() takes {} argument(s), got {}",
            name,
            expected,
            args.len()
        ));
    }
    Ok(())
}

fn binary(op: BinOp, l: Value, r: Value) -> Result<Value, String> {
    match op {
        BinOp::Add => match (l, r) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
            (l @ Value::Str(_), r) | (l, r @ Value::Str(_)) => {
                Ok(Value::Str(format!("{}{}", l, r)))
            }
            (l, r) => Err(format!("cannot add {} and {}", l.type_name(), r.type_name())),
        },
        BinOp::Sub => Ok(Value::Num(l.as_num("-")? - r.as_num("-")?)),
        BinOp::Mul => Ok(Value::Num(l.as_num("*")? * r.as_num("*")?)),
        BinOp::Div | BinOp::Rem => {
            let symbol = if op == BinOp::Div { "/" } else { "%" };
            let (a, b) = (l.as_num(symbol)?, r.as_num(symbol)?);
            if b == 0.0 {
                return Err("division by zero".to_string());
            }
            Ok(Value::Num(if op == BinOp::Div { a / b } else { a % b }))
        }
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::Ne => Ok(Value::Bool(l != r)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (&l, &r) {
                (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => None,
            }
            .ok_or_else(|| format!("cannot compare {} and {}", l.type_name(), r.type_name()))?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators are evaluated lazily"),
    }
}
