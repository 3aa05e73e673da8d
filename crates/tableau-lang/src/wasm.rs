//! WASM bindings for the tableau model notation
//!
//! This module provides JavaScript-friendly APIs for editors and step-by-step
//! tableau viewers running in the browser.

use wasm_bindgen::prelude::*;

use crate::lexer::Lexer;
use crate::parser::{ParseError, Parser};
use tableau_solver::{Method, PivotRule, Solver, SolverIteration};

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse source text and return the linear model as JSON
#[wasm_bindgen]
pub fn parse(source: &str) -> Result<JsValue, JsValue> {
    let model = Parser::parse(source).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&model)
}

/// Tokenize source text and return tokens as JSON
#[wasm_bindgen]
pub fn tokenize(source: &str) -> Result<JsValue, JsValue> {
    let tokens: Vec<TokenInfo> = Lexer::tokenize(source)
        .into_iter()
        .map(|t| TokenInfo {
            kind: format!("{:?}", t.kind),
            text: t.text,
            start: t.span.start,
            end: t.span.end,
        })
        .collect();
    to_js(&tokens)
}

/// Token information for JavaScript
#[derive(serde::Serialize)]
struct TokenInfo {
    kind: String,
    text: String,
    start: usize,
    end: usize,
}

/// Validate source text and return diagnostics as JSON
#[wasm_bindgen]
pub fn validate(source: &str) -> JsValue {
    let diagnostics = get_diagnostics(source);
    serde_wasm_bindgen::to_value(&diagnostics).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
struct Diagnostic {
    start: usize,
    end: usize,
    line: usize,
    severity: String,
    message: String,
}

fn get_diagnostics(source: &str) -> Vec<Diagnostic> {
    match Parser::parse(source) {
        Ok(_) => Vec::new(),
        Err(e) => vec![diagnostic_for(source, &e)],
    }
}

/// Byte range of the original line the error points at.
fn diagnostic_for(source: &str, error: &ParseError) -> Diagnostic {
    let mut start = 0;
    for (i, line) in source.split('\n').enumerate() {
        let end = start + line.len();
        if i + 1 == error.source_line {
            return Diagnostic {
                start,
                end,
                line: error.source_line,
                severity: "error".to_string(),
                message: error.message.clone(),
            };
        }
        start = end + 1;
    }
    Diagnostic {
        start: 0,
        end: source.len(),
        line: error.source_line,
        severity: "error".to_string(),
        message: error.message.clone(),
    }
}

/// Solve a model and return the outcome with every tableau as JSON
#[wasm_bindgen]
pub fn solve(source: &str, bland: bool) -> Result<JsValue, JsValue> {
    let model = Parser::parse(source).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let rule = if bland { PivotRule::Bland } else { PivotRule::Dantzig };
    let solved = Solver::new()
        .with_pivot_rule(rule)
        .solve(&model)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let result = SolveResult {
        outcome: solved.outcome.to_string(),
        objective: solved.objective_text(),
        z: solved.z.to_string(),
        values: solved
            .input_values()
            .into_iter()
            .map(|(variable, value)| ValueResult {
                name: variable.name().to_string(),
                value: value.to_string(),
            })
            .collect(),
        pages: solved
            .pages()
            .map(|(method, iteration)| PageResult { method, iteration })
            .collect(),
    };
    to_js(&result)
}

#[derive(serde::Serialize)]
struct SolveResult<'a> {
    outcome: String,
    objective: String,
    z: String,
    values: Vec<ValueResult>,
    pages: Vec<PageResult<'a>>,
}

#[derive(serde::Serialize)]
struct ValueResult {
    name: String,
    value: String,
}

#[derive(serde::Serialize)]
struct PageResult<'a> {
    method: Method,
    iteration: &'a SolverIteration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_points_at_source_line() {
        let source = "MAXZ=X1\n\nX1<=";
        let error = Parser::parse(source).unwrap_err();
        let diagnostic = diagnostic_for(source, &error);
        assert_eq!(diagnostic.line, 3);
        assert_eq!(&source[diagnostic.start..diagnostic.end], "X1<=");
        assert_eq!(diagnostic.message, "Invalid constraint declaration");
    }

    #[test]
    fn test_valid_source_has_no_diagnostics() {
        assert!(get_diagnostics("MAXZ=X1\nX1<=3").is_empty());
    }
}
