//! Expression evaluation over a read-only [`Context`].

use crate::ast::{BinaryOp, CompareOp, Expr, ExprKind, Literal, LogicalOp, Span, UnaryOp};
use crate::context::Context;
use crate::error::{ExprError, ExprResult};
use crate::functions;
use crate::parser::Parser;
use crate::value::{self, Value};

/// A parsed expression, ready to be evaluated against any number of contexts
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> ExprResult<Self> {
        let root = Parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, context: &Context) -> ExprResult<Value> {
        Evaluator {
            source: &self.source,
            context,
        }
        .eval(&self.root)
    }

    /// Evaluate and require a boolean result
    pub fn evaluate_bool(&self, context: &Context) -> ExprResult<bool> {
        match self.evaluate(context)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExprError::Evaluation {
                expression: self.source.trim().to_string(),
                message: format!("expected a boolean, got '{}'", other.type_name()),
            }),
        }
    }
}

/// Parse and evaluate in one step
pub fn evaluate(expression: &str, context: &Context) -> ExprResult<Value> {
    Expression::parse(expression)?.evaluate(context)
}

struct Evaluator<'a> {
    source: &'a str,
    context: &'a Context,
}

impl Evaluator<'_> {
    fn text(&self, span: Span) -> String {
        self.source
            .chars()
            .skip(span.start)
            .take(span.end.saturating_sub(span.start))
            .collect()
    }

    fn fail(&self, span: Span, message: String) -> ExprError {
        ExprError::Evaluation {
            expression: self.text(span),
            message,
        }
    }

    fn eval(&self, expr: &Expr) -> ExprResult<Value> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(match lit {
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::None => Value::None,
            }),

            ExprKind::Name(name) => {
                self.context
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ExprError::Name { name: name.clone() })
            }

            ExprKind::Call { function, args } => {
                let f = functions::lookup(function).ok_or_else(|| ExprError::Name {
                    name: function.clone(),
                })?;
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<ExprResult<Vec<_>>>()?;
                f(&values).map_err(|e| e.at(|| self.text(expr.span)))
            }

            ExprKind::Unary { op, operand } => {
                let v = self.eval(operand)?;
                let result = match op {
                    UnaryOp::Neg => value::negate(&v),
                    UnaryOp::Pos => value::positive(&v),
                };
                result.map_err(|m| self.fail(expr.span, m))
            }

            ExprKind::Not(operand) => Ok(Value::Bool(!self.eval(operand)?.is_truthy())),

            ExprKind::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                let result = match op {
                    BinaryOp::Add => value::add(&l, &r),
                    BinaryOp::Sub => value::sub(&l, &r),
                    BinaryOp::Mul => value::mul(&l, &r),
                    BinaryOp::Div => value::div(&l, &r),
                    BinaryOp::FloorDiv => value::floor_div(&l, &r),
                    BinaryOp::Mod => value::rem(&l, &r),
                    BinaryOp::Pow => value::pow(&l, &r),
                };
                result.map_err(|m| self.fail(expr.span, m))
            }

            ExprKind::Logical { op, left, right } => {
                let l = self.eval(left)?.is_truthy();
                let short_circuit = match op {
                    LogicalOp::And => !l,
                    LogicalOp::Or => l,
                };
                if short_circuit {
                    return Ok(Value::Bool(l));
                }
                Ok(Value::Bool(self.eval(right)?.is_truthy()))
            }

            ExprKind::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right_expr) in rest {
                    let right = self.eval(right_expr)?;
                    let holds = self
                        .compare(*op, &left, &right)
                        .map_err(|m| self.fail(expr.span, m))?;
                    if !holds {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }

            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }

            ExprKind::Index { target, index } => {
                let target_value = self.eval(target)?;
                let index_value = self.eval(index)?;
                index_string(&target_value, &index_value).map_err(|m| self.fail(expr.span, m))
            }

            ExprKind::Slice { target, start, end } => {
                let target_value = self.eval(target)?;
                let start = start.as_ref().map(|e| self.eval(e)).transpose()?;
                let end = end.as_ref().map(|e| self.eval(e)).transpose()?;
                slice_string(&target_value, start.as_ref(), end.as_ref())
                    .map_err(|m| self.fail(expr.span, m))
            }
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> Result<bool, String> {
        use std::cmp::Ordering;

        Ok(match op {
            CompareOp::Eq => value::equals(left, right),
            CompareOp::Ne => !value::equals(left, right),
            CompareOp::Lt => value::compare(op.symbol(), left, right)? == Ordering::Less,
            CompareOp::Le => value::compare(op.symbol(), left, right)? != Ordering::Greater,
            CompareOp::Gt => value::compare(op.symbol(), left, right)? == Ordering::Greater,
            CompareOp::Ge => value::compare(op.symbol(), left, right)? != Ordering::Less,
            CompareOp::In => value::contains(right, left)?,
            CompareOp::NotIn => !value::contains(right, left)?,
        })
    }
}

/// Resolve a possibly negative index against `len`
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index.saturating_add(len) } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

fn index_string(target: &Value, index: &Value) -> Result<Value, String> {
    let s = match target {
        Value::Str(s) => s,
        other => return Err(format!("'{}' object is not subscriptable", other.type_name())),
    };
    let i = match index {
        Value::Int(i) => *i,
        other => {
            return Err(format!(
                "string indices must be integers, not '{}'",
                other.type_name()
            ))
        }
    };
    let chars: Vec<char> = s.chars().collect();
    normalize_index(i, chars.len())
        .map(|i| Value::Str(chars[i].to_string()))
        .ok_or_else(|| "string index out of range".to_string())
}

fn slice_string(target: &Value, start: Option<&Value>, end: Option<&Value>) -> Result<Value, String> {
    let s = match target {
        Value::Str(s) => s,
        other => return Err(format!("'{}' object is not subscriptable", other.type_name())),
    };
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;

    // Out-of-range bounds clamp rather than fail
    let bound = |v: Option<&Value>, default: i64| -> Result<usize, String> {
        let raw = match v {
            None | Some(Value::None) => default,
            Some(Value::Int(i)) => *i,
            Some(other) => {
                return Err(format!(
                    "slice indices must be integers or None, not '{}'",
                    other.type_name()
                ))
            }
        };
        let resolved = if raw < 0 { raw.saturating_add(len) } else { raw };
        Ok(resolved.clamp(0, len) as usize)
    };

    let from = bound(start, 0)?;
    let to = bound(end, len)?;
    if from >= to {
        return Ok(Value::Str(String::new()));
    }
    Ok(Value::Str(chars[from..to].iter().collect()))
}
