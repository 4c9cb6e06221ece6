//! NM-011: Recursive-descent parser for scripts and expressions.
//!
//! Precedence, loosest first: `||`, `&&`, equality, comparison, `+ -`,
//! `* / %`, unary `- !`, then literals, variables, calls, and parentheses.

use super::lexer::{tokenize, Token};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// Expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Var(String),
    Call(String, Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// One script statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(String, Expr),
    Expr(Expr),
}

/// Parse a whole script.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, String> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut stmts = Vec::new();
    loop {
        parser.skip_separators();
        if parser.at_end() {
            break;
        }
        stmts.push(parser.statement()?);
        if !parser.at_end() && !parser.eat(&Token::Sep) {
            return Err(parser.unexpected("end of statement"));
        }
    }
    Ok(stmts)
}

/// Parse a single expression (as used by injections).
pub fn parse_expression(source: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.skip_separators();
    if parser.at_end() {
        return Err("empty expression".to_string());
    }
    let expr = parser.expression()?;
    parser.skip_separators();
    if !parser.at_end() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

/// Deepest expression tree a script or injection may build.
pub const MAX_DEPTH: usize = 256;

/// An expression with the depth of its tree.
type Parsed = (Expr, usize);

fn too_deep() -> String {
    format!("expression nested too deeply (limit {})", MAX_DEPTH)
}

fn within_limit(depth: usize) -> Result<usize, String> {
    if depth > MAX_DEPTH {
        Err(too_deep())
    } else {
        Ok(depth)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Active `unary` frames; bounds parser recursion.
    nesting: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_separators(&mut self) {
        while self.eat(&Token::Sep) {}
    }

    fn unexpected(&self, wanted: &str) -> String {
        match self.peek() {
            Some(token) => format!("expected {}, found {:?}", wanted, token),
            None => format!("expected {}, found end of input", wanted),
        }
    }

    fn statement(&mut self) -> Result<Stmt, String> {
        if self.eat(&Token::Let) {
            let name = match self.advance() {
                Some(Token::Ident(name)) => name,
                _ => return Err("expected variable name after 'let'".to_string()),
            };
            if !self.eat(&Token::Assign) {
                return Err(self.unexpected("'='"));
            }
            return Ok(Stmt::Let(name, self.expression()?));
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr, String> {
        self.nested().map(|(expr, _)| expr)
    }

    fn nested(&mut self) -> Result<Parsed, String> {
        self.binary_level(0)
    }

    /// Operator table indexed by precedence level.
    fn level_ops(level: usize) -> &'static [(Token, BinOp)] {
        const OR: &[(Token, BinOp)] = &[(Token::Or, BinOp::Or)];
        const AND: &[(Token, BinOp)] = &[(Token::And, BinOp::And)];
        const EQUALITY: &[(Token, BinOp)] = &[(Token::Eq, BinOp::Eq), (Token::Ne, BinOp::Ne)];
        const COMPARE: &[(Token, BinOp)] = &[
            (Token::Lt, BinOp::Lt),
            (Token::Le, BinOp::Le),
            (Token::Gt, BinOp::Gt),
            (Token::Ge, BinOp::Ge),
        ];
        const ADDITIVE: &[(Token, BinOp)] = &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)];
        const MULTIPLICATIVE: &[(Token, BinOp)] = &[
            (Token::Star, BinOp::Mul),
            (Token::Slash, BinOp::Div),
            (Token::Percent, BinOp::Rem),
        ];
        match level {
            0 => OR,
            1 => AND,
            2 => EQUALITY,
            3 => COMPARE,
            4 => ADDITIVE,
            _ => MULTIPLICATIVE,
        }
    }

    fn binary_level(&mut self, level: usize) -> Result<Parsed, String> {
        if level > 5 {
            return self.unary();
        }
        let (mut lhs, mut depth) = self.binary_level(level + 1)?;
        'outer: loop {
            for (token, op) in Self::level_ops(level) {
                if self.eat(token) {
                    let (rhs, rhs_depth) = self.binary_level(level + 1)?;
                    depth = within_limit(depth.max(rhs_depth) + 1)?;
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok((lhs, depth));
        }
    }

    fn unary(&mut self) -> Result<Parsed, String> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(too_deep());
        }
        let parsed = self.unary_operand();
        self.nesting -= 1;
        parsed
    }

    fn unary_operand(&mut self) -> Result<Parsed, String> {
        let op = if self.eat(&Token::Minus) {
            UnOp::Neg
        } else if self.eat(&Token::Bang) {
            UnOp::Not
        } else {
            return self.primary();
        };
        let (inner, depth) = self.unary()?;
        Ok((Expr::Unary(op, Box::new(inner)), within_limit(depth + 1)?))
    }

    fn primary(&mut self) -> Result<Parsed, String> {
        match self.advance() {
            Some(Token::Num(n)) => Ok((Expr::Num(n), 1)),
            Some(Token::Str(s)) => Ok((Expr::Str(s), 1)),
            Some(Token::True) => Ok((Expr::Bool(true), 1)),
            Some(Token::False) => Ok((Expr::Bool(false), 1)),
            Some(Token::LParen) => {
                let inner = self.nested()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.unexpected("')'"));
                }
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if !self.eat(&Token::LParen) {
                    return Ok((Expr::Var(name), 1));
                }
                let mut args = Vec::new();
                let mut depth = 0;
                if self.eat(&Token::RParen) {
                    return Ok((Expr::Call(name, args), 1));
                }
                loop {
                    let (arg, arg_depth) = self.nested()?;
                    args.push(arg);
                    depth = depth.max(arg_depth);
                    if self.eat(&Token::RParen) {
                        return Ok((Expr::Call(name, args), within_limit(depth + 1)?));
                    }
                    if !self.eat(&Token::Comma) {
                        return Err(self.unexpected("',' or ')'"));
                    }
                }
            }
            Some(token) => Err(format!("unexpected {:?}", token)),
            None => Err("unexpected end of input".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Num(n))
    }

    #[test]
    fn test_nm011_precedence() {
        assert_eq!(
            parse_expression("1 + 2 * 3").unwrap(),
            Expr::Binary(
                BinOp::Add,
                num(1.0),
                Box::new(Expr::Binary(BinOp::Mul, num(2.0), num(3.0)))
            )
        );
    }

    #[test]
    fn test_nm011_left_associative() {
        assert_eq!(
            parse_expression("8 - 2 - 1").unwrap(),
            Expr::Binary(
                BinOp::Sub,
                Box::new(Expr::Binary(BinOp::Sub, num(8.0), num(2.0))),
                num(1.0)
            )
        );
    }

    #[test]
    fn test_nm011_call_and_var() {
        assert_eq!(
            parse_expression("upper(name)").unwrap(),
            Expr::Call("upper".into(), vec![Expr::Var("name".into())])
        );
        assert_eq!(
            parse_expression("clipboard()").unwrap(),
            Expr::Call("clipboard".into(), vec![])
        );
    }

    #[test]
    fn test_nm011_program_statements() {
        let program = parse_program("let a = 1\nlet b = a + 1; log(b)\n").unwrap();
        assert_eq!(program.len(), 3);
        assert!(matches!(program[0], Stmt::Let(ref n, _) if n == "a"));
        assert!(matches!(program[2], Stmt::Expr(Expr::Call(ref n, _)) if n == "log"));
    }

    #[test]
    fn test_nm011_expression_rejects_trailing_tokens() {
        assert!(parse_expression("1 2").is_err());
        assert!(parse_expression("").unwrap_err().contains("empty"));
    }

    #[test]
    fn test_nm011_unbalanced_parens() {
        assert!(parse_expression("(1 + 2").is_err());
        assert!(parse_expression("f(1,").is_err());
    }

    #[test]
    fn test_nm011_deep_unary_rejected() {
        let source = format!("{}1", "-".repeat(200_000));
        assert!(parse_expression(&source).unwrap_err().contains("nested too deeply"));
        let shallow = format!("{}1", "!".repeat(40));
        assert!(parse_expression(&shallow).is_ok());
    }

    #[test]
    fn test_nm011_deep_parens_rejected() {
        let source = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(parse_expression(&source).unwrap_err().contains("nested too deeply"));
        let call = format!("{}1{}", "upper(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(parse_program(&call).unwrap_err().contains("nested too deeply"));
    }

    #[test]
    fn test_nm011_long_operator_chain_rejected() {
        let long = vec!["1"; 50_000].join(" + ");
        assert!(parse_expression(&long).unwrap_err().contains("nested too deeply"));
        let ok = vec!["1"; MAX_DEPTH].join(" + ");
        assert!(parse_expression(&ok).is_ok());
    }

    #[test]
    fn test_nm011_let_requires_assign() {
        assert!(parse_program("let x 1").is_err());
    }
}
