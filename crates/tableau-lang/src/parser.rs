use std::collections::HashMap;

use tableau_solver::{Constraint, ConstraintOp, LinearModel, Objective, Rational, Term, Variable};
use thiserror::Error;

use crate::lexer::{Lexer, Token, TokenKind};

const INVALID_OBJECTIVE: &str = "Invalid or undeclared objective.";
const INVALID_VARIABLE: &str = "Invalid variable declaration.";
const INVALID_CONSTRAINT: &str = "Invalid constraint declaration";

/// A model text that could not be read.
///
/// `line` indexes `lines`, the cleaned lines (uppercased, whitespace removed,
/// blank lines dropped). `source_line` is the 1-based line of the original text.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (line {source_line})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub lines: Vec<String>,
    pub source_line: usize,
}

impl ParseError {
    /// Cleaned text of the line that failed.
    pub fn offending_line(&self) -> Option<&str> {
        self.lines.get(self.line).map(String::as_str)
    }
}

/// A non-blank input line after cleaning
#[derive(Debug, Clone, PartialEq)]
struct CleanLine {
    text: String,
    source_line: usize,
}

fn clean_lines(source: &str) -> Vec<CleanLine> {
    source
        .to_uppercase()
        .split('\n')
        .enumerate()
        .filter_map(|(i, line)| {
            let text: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            (!text.is_empty()).then_some(CleanLine {
                text,
                source_line: i + 1,
            })
        })
        .collect()
}

/// Parser for the line-oriented model notation:
///
/// ```text
/// MAXZ=3X1+5X2
/// X1<=4
/// 2X2<=12
/// 3X1+2X2<=18
/// ```
///
/// A [`Parser`] instance walks the tokens of a single cleaned line;
/// [`Parser::parse`] drives it over a whole text.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<LinearModel, ParseError> {
        let cleaned = clean_lines(source);
        let fail = |message: String, line: usize| ParseError {
            message,
            line,
            lines: cleaned.iter().map(|l| l.text.clone()).collect(),
            source_line: cleaned.get(line).map_or(1, |l| l.source_line),
        };

        let Some(declaration) = cleaned.first() else {
            return Err(fail(INVALID_OBJECTIVE.to_string(), 0));
        };
        let (objective, rest) = if let Some(rest) = declaration.text.strip_prefix("MAXZ=") {
            (Objective::Max, rest)
        } else if let Some(rest) = declaration.text.strip_prefix("MINZ=") {
            (Objective::Min, rest)
        } else {
            return Err(fail(INVALID_OBJECTIVE.to_string(), 0));
        };

        let mut model = LinearModel::new(objective);
        let mut declared: HashMap<String, Variable> = HashMap::new();

        let mut parser = Parser::new(Lexer::tokenize(rest));
        let terms = parser
            .parse_terms()
            .and_then(|terms| parser.expect_end(INVALID_VARIABLE).map(|_| terms))
            .map_err(|message| fail(message, 0))?;
        let mut objective_function = Vec::with_capacity(terms.len());
        for (coefficient, name) in terms {
            let variable = declared
                .entry(name)
                .or_insert_with_key(|name| model.add_variable(name.as_str()))
                .clone();
            objective_function.push(variable.with(coefficient));
        }
        model.set_objective(objective, objective_function);
        log::trace!(
            "{} objective over {} variables",
            objective,
            model.num_variables()
        );

        for (i, line) in cleaned.iter().enumerate().skip(1) {
            let constraint = Parser::new(Lexer::tokenize(&line.text))
                .parse_constraint(format!("CT{}", i), &declared)
                .map_err(|message| fail(message, i))?;
            log::trace!(
                "{}: {} terms {} {}",
                constraint.name,
                constraint.terms.len(),
                constraint.op,
                constraint.rhs
            );
            model.add_constraint(constraint);
        }

        Ok(model)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect_end(&self, message: &str) -> Result<(), String> {
        match self.peek_kind() {
            TokenKind::Eof => Ok(()),
            _ => Err(message.to_string()),
        }
    }

    /// Terms up to the end of the line or the first token that cannot start
    /// another term.
    ///
    /// A term is `[+|-][coefficient]X<n>`; terms after the first need a sign.
    /// A bare `-` means -1 and a missing coefficient means 1.
    fn parse_terms(&mut self) -> Result<Vec<(Rational, String)>, String> {
        let mut terms = Vec::new();
        loop {
            let kind = self.peek_kind();
            if kind == TokenKind::Eof || kind.is_relation() {
                break;
            }

            let negative = match kind {
                TokenKind::Plus => {
                    self.advance();
                    false
                }
                TokenKind::Minus => {
                    self.advance();
                    true
                }
                _ if terms.is_empty() => false,
                _ => break,
            };

            let coefficient = if self.peek_kind() == TokenKind::Number {
                let text = self.advance().map(|t| t.text.clone()).unwrap_or_default();
                text.parse::<Rational>()
                    .map_err(|_| INVALID_VARIABLE.to_string())?
            } else {
                Rational::one()
            };

            let name = match self.current() {
                Some(token) if token.kind == TokenKind::Var => token.text.clone(),
                _ => return Err(INVALID_VARIABLE.to_string()),
            };
            self.advance();

            let coefficient = if negative { -coefficient } else { coefficient };
            terms.push((coefficient, name));
        }
        Ok(terms)
    }

    /// `<terms> <relation> [-]<integer>` over already declared variables.
    fn parse_constraint(
        &mut self,
        name: String,
        declared: &HashMap<String, Variable>,
    ) -> Result<Constraint, String> {
        let terms = self
            .parse_terms()?
            .into_iter()
            .map(|(coefficient, variable)| match declared.get(&variable) {
                Some(declared) => Ok(declared.with(coefficient)),
                None => Err(format!("Undeclared variable {}", variable)),
            })
            .collect::<Result<Vec<Term>, _>>()?;

        let op = match self.peek_kind() {
            TokenKind::Le => ConstraintOp::Le,
            TokenKind::Ge => ConstraintOp::Ge,
            TokenKind::Eq | TokenKind::EqEq => ConstraintOp::Eq,
            _ => return Err(INVALID_CONSTRAINT.to_string()),
        };
        self.advance();

        let rhs = self.parse_rhs()?;
        self.expect_end(INVALID_CONSTRAINT)?;

        Ok(Constraint::new(name, op, rhs, terms))
    }

    /// Right-hand sides are integers, optionally negative.
    fn parse_rhs(&mut self) -> Result<Rational, String> {
        let negative = self.peek_kind() == TokenKind::Minus;
        if negative {
            self.advance();
        }
        let digits = match self.current() {
            Some(token)
                if token.kind == TokenKind::Number
                    && token.text.bytes().all(|b| b.is_ascii_digit()) =>
            {
                token.text.clone()
            }
            _ => return Err(INVALID_CONSTRAINT.to_string()),
        };
        self.advance();

        let value: Rational = digits
            .parse()
            .map_err(|_| INVALID_CONSTRAINT.to_string())?;
        Ok(if negative { -value } else { value })
    }
}
