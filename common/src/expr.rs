//! 计算表达式
//!
//! 复杂映射的 `calculation` 表达式只支持四则运算、括号、一元正负号、
//! 数字和变量（源字段名）。不支持函数调用，也无法访问绑定值以外的任何名称。

use crate::error::{Error, Result};

/// 括号与一元符号的最大嵌套层数
pub const MAX_DEPTH: usize = 64;

/// 单个表达式的最大记号数（语法树深度和求值递归都以此为界）
pub const MAX_TOKENS: usize = 1024;

/// 表达式语法树
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Var(String),
    Neg(Box<Expr>),
    Binary {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '×' | '÷')
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' | '×' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    return Err(Error::Expression("不支持乘方运算 '**'".into()));
                }
                tokens.push(Token::Star);
            }
            '/' | '÷' => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    return Err(Error::Expression("不支持整除运算 '//'".into()));
                }
                tokens.push(Token::Slash);
            }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            '0'..='9' | '.' => {
                let mut num = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = num
                    .parse()
                    .map_err(|_| Error::Expression(format!("无效的数字: {}", num)))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphanumeric() || c == '_' || !c.is_ascii() => {
                // 字段名：直到空白或运算符为止（允许中文、全角括号等）
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || is_operator(ch) {
                        break;
                    }
                    ident.push(ch);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(Error::Expression(format!("不支持的字符: '{}'", c))),
        }
    }

    Ok(tokens)
}

impl Expr {
    /// 解析表达式文本
    pub fn parse(input: &str) -> Result<Expr> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(Error::Expression("表达式为空".into()));
        }
        if tokens.len() > MAX_TOKENS {
            return Err(Error::Expression(format!(
                "表达式过长（{} 个记号，上限 {}）",
                tokens.len(),
                MAX_TOKENS
            )));
        }
        let (expr, pos) = parse_add_sub(&tokens, 0, 0)?;
        if pos < tokens.len() {
            return Err(Error::Expression(format!(
                "表达式 '{}' 第 {} 个记号处有多余内容",
                input.trim(),
                pos + 1
            )));
        }
        Ok(expr)
    }

    /// 按变量绑定求值；未绑定的变量、除零和非有限结果均为错误
    pub fn eval<F>(&self, lookup: &F) -> Result<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Var(name) => lookup(name)
                .ok_or_else(|| Error::Expression(format!("未定义的变量: {}", name)))?,
            Expr::Neg(inner) => -inner.eval(lookup)?,
            Expr::Binary { op, left, right } => {
                let l = left.eval(lookup)?;
                let r = right.eval(lookup)?;
                match op {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    Op::Div => {
                        if r == 0.0 {
                            return Err(Error::Expression("除数为零".into()));
                        }
                        l / r
                    }
                }
            }
        };
        if !value.is_finite() {
            return Err(Error::Expression("计算结果不是有限数值".into()));
        }
        Ok(value)
    }

    /// 表达式中引用的变量名（去重，出现顺序）
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Var(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::Neg(inner) => inner.collect_variables(names),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
        }
    }
}

fn parse_add_sub(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize)> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos, depth)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1, depth)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize)> {
    let (mut left, mut pos) = parse_unary(tokens, pos, depth)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1, depth)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_unary(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize)> {
    if depth > MAX_DEPTH {
        return Err(Error::Expression(format!("嵌套层数超过 {}", MAX_DEPTH)));
    }
    match tokens.get(pos) {
        Some(Token::Plus) => parse_unary(tokens, pos + 1, depth + 1),
        Some(Token::Minus) => {
            let (inner, pos) = parse_unary(tokens, pos + 1, depth + 1)?;
            Ok((Expr::Neg(Box::new(inner)), pos))
        }
        _ => parse_primary(tokens, pos, depth),
    }
}

fn parse_primary(tokens: &[Token], pos: usize, depth: usize) -> Result<(Expr, usize)> {
    let Some(token) = tokens.get(pos) else {
        return Err(Error::Expression("表达式意外结束".into()));
    };

    match token {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::Ident(name) => {
            if let Some(Token::LParen) = tokens.get(pos + 1) {
                return Err(Error::Expression(format!("不支持函数调用: {}(...)", name)));
            }
            Ok((Expr::Var(name.clone()), pos + 1))
        }
        Token::LParen => {
            let (expr, pos) = parse_add_sub(tokens, pos + 1, depth + 1)?;
            match tokens.get(pos) {
                Some(Token::RParen) => Ok((expr, pos + 1)),
                _ => Err(Error::Expression("缺少右括号".into())),
            }
        }
        _ => Err(Error::Expression(format!("第 {} 个记号处语法错误", pos + 1))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn eval_with(expr: &str, vars: &[(&str, f64)]) -> Result<f64> {
        let bindings: HashMap<&str, f64> = vars.iter().copied().collect();
        Expr::parse(expr)?.eval(&|name: &str| bindings.get(name).copied())
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(eval_with("1 + 2 * 3", &[]).unwrap(), 7.0);
        assert_eq!(eval_with("(1 + 2) * 3", &[]).unwrap(), 9.0);
        assert_eq!(eval_with("10 - 4 - 3", &[]).unwrap(), 3.0);
        assert_eq!(eval_with("12 / 4 / 3", &[]).unwrap(), 1.0);
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval_with("-5 + 2", &[]).unwrap(), -3.0);
        assert_eq!(eval_with("2 * -(1 + 1)", &[]).unwrap(), -4.0);
    }

    #[test]
    fn test_chinese_field_names() {
        let result = eval_with(
            "基本工资 + 绩效A*0.5 - 公积金（个人）",
            &[("基本工资", 3000.0), ("绩效A", 1000.0), ("公积金（个人）", 300.0)],
        );
        assert_eq!(result.unwrap(), 3200.0);
    }

    #[test]
    fn test_unknown_variable_is_error() {
        let err = eval_with("a + b", &[("a", 1.0)]).unwrap_err();
        assert!(format!("{}", err).contains("b"));
    }

    #[test]
    fn test_function_calls_rejected() {
        assert!(Expr::parse("abs(a)").is_err());
        assert!(Expr::parse("__import__('os')").is_err());
        assert!(Expr::parse("a ** 2").is_err());
        assert!(Expr::parse("a // 2").is_err());
    }

    #[test]
    fn test_division_by_zero() {
        assert!(eval_with("a / b", &[("a", 1.0), ("b", 0.0)]).is_err());
    }

    #[test]
    fn test_syntax_errors() {
        assert!(Expr::parse("").is_err());
        assert!(Expr::parse("(a + b").is_err());
        assert!(Expr::parse("a + ").is_err());
        assert!(Expr::parse("a b").is_err());
        assert!(Expr::parse("1.2.3").is_err());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let nested = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        let err = Expr::parse(&nested).unwrap_err();
        assert!(err.to_string().contains("嵌套"));
        assert!(Expr::parse(&format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000))).is_err());

        let within = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(eval_with(&within, &[]).unwrap(), 1.0);

        assert!(Expr::parse(&format!("{}1", "-".repeat(100))).unwrap_err().to_string().contains("嵌套"));
        assert!(Expr::parse(&format!("{}1", "-".repeat(5_000))).is_err());
    }

    #[test]
    fn test_long_chain_rejected() {
        let long = vec!["a"; 50_000].join("+");
        let err = Expr::parse(&long).unwrap_err();
        assert!(err.to_string().contains("过长"));

        // 上限以内的长链正常求值
        let chain = vec!["a"; 500].join("+");
        assert_eq!(eval_with(&chain, &[("a", 2.0)]).unwrap(), 1000.0);
    }

    #[test]
    fn test_variables_listed_once() {
        let expr = Expr::parse("a + b * a - c").unwrap();
        assert_eq!(expr.variables(), vec!["a", "b", "c"]);
    }
}
