use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
	compiler::FieldIndex,
	error::{Error, Result},
	value::Val,
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOp {
	Sum,
	Count,
	Min,
	Max,
	Average,
}

#[derive(Clone, Debug)]
pub struct CompiledExpr {
	root: Expr,
	aggregate: Option<AggregateOp>,
}
impl CompiledExpr {
	// Parses an expression string against the shared field index. Every
	// `${name}` either binds a request parameter as a literal or claims a
	// stable slot in the index. An aggregate function is only legal as the
	// outermost node; its argument is evaluated per row and folded by the
	// item generators.
	pub fn parse(
		raw: &str,
		params: &HashMap<String, String>,
		index: &mut FieldIndex,
	) -> Result<Self> {
		let tokens = lex(raw)?;
		let mut parser = Parser { tokens: &tokens, cursor: 0, params, index, raw_len: raw.len() };
		let root = parser.parse_root()?;
		let aggregate = match &root {
			Expr::Aggregate { op, .. } => Some(*op),
			_ => None,
		};

		Ok(Self { root, aggregate })
	}

	pub fn aggregate(&self) -> Option<AggregateOp> {
		self.aggregate
	}

	// Per-row value. For an aggregate root this is the row's contribution;
	// combining contributions is the generator's job.
	pub fn eval(&self, row: &[Val]) -> Val {
		self.root.eval(row)
	}
}

#[derive(Clone, Debug)]
enum Expr {
	Literal(Val),
	Slot(usize),
	Negate(Box<Expr>),
	Arith { op: ArithOp, lhs: Box<Expr>, rhs: Box<Expr> },
	Aggregate { op: AggregateOp, arg: Option<Box<Expr>> },
	Concat(Vec<Expr>),
	Uppercase(Box<Expr>),
	Lowercase(Box<Expr>),
}
impl Expr {
	fn eval(&self, row: &[Val]) -> Val {
		match self {
			Self::Literal(value) => value.clone(),
			Self::Slot(slot) => row.get(*slot).cloned().unwrap_or(Val::Null),
			Self::Negate(inner) => match inner.eval(row) {
				Val::Int(value) => Val::Int(value.wrapping_neg()),
				other => other.to_number().map(|value| Val::Float(-value)).unwrap_or(Val::Null),
			},
			Self::Arith { op, lhs, rhs } => op.eval(lhs.eval(row), rhs.eval(row)),
			Self::Aggregate { op: AggregateOp::Count, .. } => Val::Int(1),
			Self::Aggregate { arg, .. } =>
				arg.as_ref().map(|inner| inner.eval(row)).unwrap_or(Val::Null),
			Self::Concat(args) => {
				let mut out = String::new();

				for arg in args {
					out.push_str(&arg.eval(row).to_text());
				}

				Val::Text(out)
			},
			Self::Uppercase(inner) => Val::Text(inner.eval(row).to_text().to_uppercase()),
			Self::Lowercase(inner) => Val::Text(inner.eval(row).to_text().to_lowercase()),
		}
	}
}

#[derive(Clone, Copy, Debug)]
enum ArithOp {
	Add,
	Subtract,
	Multiply,
	Divide,
}
impl ArithOp {
	fn eval(self, lhs: Val, rhs: Val) -> Val {
		if lhs.is_null() || rhs.is_null() {
			return Val::Null;
		}

		if let (Val::Int(left), Val::Int(right)) = (&lhs, &rhs) {
			match self {
				Self::Add =>
					if let Some(value) = left.checked_add(*right) {
						return Val::Int(value);
					},
				Self::Subtract =>
					if let Some(value) = left.checked_sub(*right) {
						return Val::Int(value);
					},
				Self::Multiply =>
					if let Some(value) = left.checked_mul(*right) {
						return Val::Int(value);
					},
				Self::Divide => {},
			}
		}

		match (lhs.to_number(), rhs.to_number()) {
			(Some(left), Some(right)) => match self {
				Self::Add => Val::Float(left + right),
				Self::Subtract => Val::Float(left - right),
				Self::Multiply => Val::Float(left * right),
				Self::Divide =>
					if right == 0.0 {
						Val::Null
					} else {
						Val::Float(left / right)
					},
			},
			// '+' doubles as text concatenation.
			_ => match self {
				Self::Add => Val::Text(format!("{}{}", lhs.to_text(), rhs.to_text())),
				_ => Val::Null,
			},
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
	Number(String),
	Literal(String),
	Reference(String),
	Ident(String),
	Plus,
	Minus,
	Star,
	Slash,
	LParen,
	RParen,
	Comma,
}

fn lex(raw: &str) -> Result<Vec<(usize, Token)>> {
	let mut tokens = Vec::new();
	let mut chars = raw.char_indices().peekable();

	while let Some((position, ch)) = chars.next() {
		match ch {
			ch if ch.is_whitespace() => {},
			'+' => tokens.push((position, Token::Plus)),
			'-' => tokens.push((position, Token::Minus)),
			'*' => tokens.push((position, Token::Star)),
			'/' => tokens.push((position, Token::Slash)),
			'(' => tokens.push((position, Token::LParen)),
			')' => tokens.push((position, Token::RParen)),
			',' => tokens.push((position, Token::Comma)),
			'\'' => {
				let mut value = String::new();
				let mut closed = false;

				for (_, ch) in chars.by_ref() {
					if ch == '\'' {
						closed = true;

						break;
					}

					value.push(ch);
				}

				if !closed {
					return Err(parse_error(position, "unterminated string literal"));
				}

				tokens.push((position, Token::Literal(value)));
			},
			'$' => {
				if chars.next_if(|(_, ch)| *ch == '{').is_none() {
					return Err(parse_error(position, "expected '{' after '$'"));
				}

				let mut name = String::new();
				let mut closed = false;

				for (_, ch) in chars.by_ref() {
					if ch == '}' {
						closed = true;

						break;
					}

					name.push(ch);
				}

				if !closed {
					return Err(parse_error(position, "unterminated field reference"));
				}
				if name.trim().is_empty() {
					return Err(parse_error(position, "empty field reference"));
				}

				tokens.push((position, Token::Reference(name.trim().to_string())));
			},
			ch if ch.is_ascii_digit() => {
				let mut number = ch.to_string();

				while let Some((_, next)) = chars.next_if(|(_, ch)| ch.is_ascii_digit() || *ch == '.') {
					number.push(next);
				}

				tokens.push((position, Token::Number(number)));
			},
			ch if ch.is_ascii_alphabetic() || ch == '_' => {
				let mut ident = ch.to_string();

				while let Some((_, next)) =
					chars.next_if(|(_, ch)| ch.is_ascii_alphanumeric() || *ch == '_')
				{
					ident.push(next);
				}

				tokens.push((position, Token::Ident(ident)));
			},
			_ => return Err(parse_error(position, &format!("unexpected character {ch:?}"))),
		}
	}

	Ok(tokens)
}

struct Parser<'a> {
	tokens: &'a [(usize, Token)],
	cursor: usize,
	params: &'a HashMap<String, String>,
	index: &'a mut FieldIndex,
	raw_len: usize,
}
impl Parser<'_> {
	fn parse_root(&mut self) -> Result<Expr> {
		// An aggregate call may only stand alone at the root.
		if let Some(op) = self.peek_aggregate_call() {
			let (position, _) = self.next().expect("peeked ident");

			self.next();

			let args = self.parse_args()?;
			let arg = match (op, args.len()) {
				(AggregateOp::Count, 0 | 1) => args.into_iter().next().map(Box::new),
				(_, 1) => args.into_iter().next().map(Box::new),
				_ => {
					return Err(parse_error(
						position,
						"aggregate functions take exactly one argument",
					));
				},
			};
			let expr = Expr::Aggregate { op, arg };

			self.expect_end()?;

			return Ok(expr);
		}

		let expr = self.parse_expression()?;

		self.expect_end()?;

		Ok(expr)
	}

	fn parse_expression(&mut self) -> Result<Expr> {
		let mut lhs = self.parse_term()?;

		loop {
			let op = match self.peek() {
				Some((_, Token::Plus)) => ArithOp::Add,
				Some((_, Token::Minus)) => ArithOp::Subtract,
				_ => break,
			};

			self.next();

			let rhs = self.parse_term()?;

			lhs = Expr::Arith { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
		}

		Ok(lhs)
	}

	fn parse_term(&mut self) -> Result<Expr> {
		let mut lhs = self.parse_factor()?;

		loop {
			let op = match self.peek() {
				Some((_, Token::Star)) => ArithOp::Multiply,
				Some((_, Token::Slash)) => ArithOp::Divide,
				_ => break,
			};

			self.next();

			let rhs = self.parse_factor()?;

			lhs = Expr::Arith { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
		}

		Ok(lhs)
	}

	fn parse_factor(&mut self) -> Result<Expr> {
		let Some((position, token)) = self.next() else {
			return Err(parse_error(self.raw_len, "unexpected end of expression"));
		};

		match token {
			Token::Number(raw) => parse_number(position, &raw),
			Token::Literal(value) => Ok(Expr::Literal(Val::Text(value))),
			Token::Reference(name) => Ok(self.resolve_reference(&name)),
			Token::Minus => Ok(Expr::Negate(Box::new(self.parse_factor()?))),
			Token::LParen => {
				let inner = self.parse_expression()?;

				self.expect(Token::RParen)?;

				Ok(inner)
			},
			Token::Ident(name) => {
				if aggregate_op(&name).is_some() {
					return Err(parse_error(
						position,
						&format!("aggregate function {name} must be the outermost expression"),
					));
				}

				self.expect(Token::LParen)?;

				let args = self.parse_args()?;

				match name.to_ascii_lowercase().as_str() {
					"concat" => Ok(Expr::Concat(args)),
					"uppercase" => single_arg(position, &name, args).map(Expr::Uppercase),
					"lowercase" => single_arg(position, &name, args).map(Expr::Lowercase),
					_ => Err(parse_error(position, &format!("unknown function {name}"))),
				}
			},
			_ => Err(parse_error(position, "expected a value")),
		}
	}

	// Arguments of a call whose '(' has already been consumed.
	fn parse_args(&mut self) -> Result<Vec<Expr>> {
		let mut args = Vec::new();

		if matches!(self.peek(), Some((_, Token::RParen))) {
			self.next();

			return Ok(args);
		}

		loop {
			args.push(self.parse_expression()?);

			match self.next() {
				Some((_, Token::Comma)) => {},
				Some((_, Token::RParen)) => break,
				Some((position, _)) => {
					return Err(parse_error(position, "expected ',' or ')'"));
				},
				None => return Err(parse_error(self.raw_len, "unterminated argument list")),
			}
		}

		Ok(args)
	}

	fn resolve_reference(&mut self, name: &str) -> Expr {
		if let Some(raw) = self.params.get(name) {
			return Expr::Literal(parse_param(raw));
		}

		Expr::Slot(self.index.slot(name))
	}

	fn peek(&self) -> Option<&(usize, Token)> {
		self.tokens.get(self.cursor)
	}

	fn peek_aggregate_call(&self) -> Option<AggregateOp> {
		let op = match self.tokens.get(self.cursor) {
			Some((_, Token::Ident(name))) => aggregate_op(name)?,
			_ => return None,
		};

		match self.tokens.get(self.cursor + 1) {
			Some((_, Token::LParen)) => Some(op),
			_ => None,
		}
	}

	fn next(&mut self) -> Option<(usize, Token)> {
		let token = self.tokens.get(self.cursor).cloned();

		if token.is_some() {
			self.cursor += 1;
		}

		token
	}

	fn expect(&mut self, expected: Token) -> Result<()> {
		match self.next() {
			Some((_, token)) if token == expected => Ok(()),
			Some((position, _)) => Err(parse_error(position, &format!("expected {expected:?}"))),
			None => Err(parse_error(self.raw_len, &format!("expected {expected:?}"))),
		}
	}

	fn expect_end(&mut self) -> Result<()> {
		match self.peek() {
			None => Ok(()),
			Some((position, _)) => Err(parse_error(*position, "unexpected trailing input")),
		}
	}
}

fn aggregate_op(name: &str) -> Option<AggregateOp> {
	match name.to_ascii_lowercase().as_str() {
		"sum" => Some(AggregateOp::Sum),
		"count" => Some(AggregateOp::Count),
		"min" => Some(AggregateOp::Min),
		"max" => Some(AggregateOp::Max),
		"average" => Some(AggregateOp::Average),
		_ => None,
	}
}

fn single_arg(position: usize, name: &str, args: Vec<Expr>) -> Result<Box<Expr>> {
	if args.len() != 1 {
		return Err(parse_error(position, &format!("{name} takes exactly one argument")));
	}

	Ok(Box::new(args.into_iter().next().expect("length checked")))
}

fn parse_number(position: usize, raw: &str) -> Result<Expr> {
	if raw.contains('.') {
		raw.parse::<f64>()
			.map(|value| Expr::Literal(Val::Float(value)))
			.map_err(|_| parse_error(position, &format!("invalid number {raw:?}")))
	} else {
		raw.parse::<i64>()
			.map(|value| Expr::Literal(Val::Int(value)))
			.map_err(|_| parse_error(position, &format!("invalid number {raw:?}")))
	}
}

fn parse_param(raw: &str) -> Val {
	if let Ok(value) = raw.parse::<i64>() {
		return Val::Int(value);
	}
	if let Ok(value) = raw.parse::<f64>() {
		return Val::Float(value);
	}

	Val::Text(raw.to_string())
}

fn parse_error(position: usize, message: &str) -> Error {
	Error::ExpressionParse { position, message: message.to_string() }
}
