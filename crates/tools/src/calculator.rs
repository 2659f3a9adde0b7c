//! Calculator tool: evaluates arithmetic expressions.
//!
//! Supports `+`, `-`, `*`, `/`, `%`, `^` (right-associative), parentheses,
//! unary minus and decimal numbers, via a small precedence-climbing parser.

use async_trait::async_trait;
use schemagent_core::error::ToolError;
use schemagent_core::schema::{FieldSpec, FieldType, Schema};
use schemagent_core::tool::Tool;
use serde_json::Value;

pub const INPUT_SCHEMA: &str = "calculator_input";
pub const OUTPUT_SCHEMA: &str = "calculator_output";

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses and decimals."
    }

    fn input_schema(&self) -> Schema {
        Schema::new(INPUT_SCHEMA, "Select the calculator and give it an expression")
            .field(
                FieldSpec::required("expression", FieldType::String)
                    .describe("The expression to evaluate, e.g. '(2 + 3) * 4'"),
            )
            .strict()
    }

    fn output_schema(&self) -> Schema {
        Schema::new(OUTPUT_SCHEMA, "The value of the evaluated expression")
            .field(FieldSpec::required("result", FieldType::Number).coercible())
            .field(
                FieldSpec::required("formatted", FieldType::String)
                    .describe("The result rendered for display"),
            )
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let expression = input["expression"].as_str().unwrap_or_default();
        let value = evaluate(expression).map_err(|reason| ToolError::ExecutionFailed {
            tool_name: "calculator".into(),
            reason,
        })?;
        Ok(serde_json::json!({ "result": value, "formatted": format_number(value) }))
    }
}

/// Render whole numbers without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Evaluate an arithmetic expression string.
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = lex(expr)?;
    let mut cursor = Cursor { tokens: &tokens, pos: 0 };
    let value = cursor.expression(0)?;
    if let Some(tok) = cursor.peek() {
        return Err(format!("Unexpected trailing input at token {}: {tok:?}", cursor.pos));
    }
    if !value.is_finite() {
        return Err("Result is not a finite number".into());
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(f64),
    Op(char),
    Open,
    Close,
}

fn lex(input: &str) -> Result<Vec<Tok>, String> {
    let mut out = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                chars.next();
                out.push(Tok::Op(c));
            }
            '(' => {
                chars.next();
                out.push(Tok::Open);
            }
            ')' => {
                chars.next();
                out.push(Tok::Close);
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = start;
                while let Some(&(i, d)) = chars.peek() {
                    if !(d.is_ascii_digit() || d == '.') {
                        break;
                    }
                    end = i + d.len_utf8();
                    chars.next();
                }
                let literal = &input[start..end];
                let n = literal
                    .parse()
                    .map_err(|_| format!("Invalid number: {literal}"))?;
                out.push(Tok::Num(n));
            }
            other => return Err(format!("Unexpected character: '{other}'")),
        }
    }
    Ok(out)
}

/// Binding power and right-associativity of a binary operator.
fn binding(op: char) -> Option<(u8, bool)> {
    match op {
        '+' | '-' => Some((1, false)),
        '*' | '/' | '%' => Some((2, false)),
        '^' => Some((4, true)),
        _ => None,
    }
}

struct Cursor<'a> {
    tokens: &'a [Tok],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<Tok> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.peek();
        self.pos += usize::from(tok.is_some());
        tok
    }

    fn expression(&mut self, min_power: u8) -> Result<f64, String> {
        let mut lhs = self.operand()?;
        while let Some(Tok::Op(op)) = self.peek() {
            let Some((power, right_assoc)) = binding(op) else { break };
            if power < min_power {
                break;
            }
            self.next();
            let next_min = if right_assoc { power } else { power + 1 };
            let rhs = self.expression(next_min)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn operand(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Tok::Num(n)) => Ok(n),
            // Unary minus binds tighter than * but looser than ^: -2^2 = -4.
            Some(Tok::Op('-')) => Ok(-self.expression(3)?),
            Some(Tok::Open) => {
                let value = self.expression(0)?;
                match self.next() {
                    Some(Tok::Close) => Ok(value),
                    _ => Err("Expected closing parenthesis".into()),
                }
            }
            Some(tok) => Err(format!("Unexpected token: {tok:?}")),
            None => Err("Unexpected end of expression".into()),
        }
    }
}

fn apply(op: char, lhs: f64, rhs: f64) -> Result<f64, String> {
    match op {
        '+' => Ok(lhs + rhs),
        '-' => Ok(lhs - rhs),
        '*' => Ok(lhs * rhs),
        '/' | '%' if rhs == 0.0 => Err("Division by zero".into()),
        '/' => Ok(lhs / rhs),
        '%' => Ok(lhs % rhs),
        '^' => Ok(lhs.powf(rhs)),
        _ => Err(format!("Unknown operator: {op}")),
    }
}
