//! `{{ expression }}` template rendering.
//!
//! Text outside placeholders is copied verbatim. Each placeholder body is
//! evaluated as an expression and replaced by the canonical string form of
//! its value. Placeholders are evaluated left to right and the first
//! failure aborts the render.

use crate::context::Context;
use crate::error::{ExprError, ExprResult};
use crate::eval::Expression;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Placeholder(Expression),
}

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Split a template into literal text and parsed placeholders.
    ///
    /// Fails on an unterminated `{{` or a placeholder containing `}` or
    /// another `{{`; a stray `}}` outside a placeholder is plain text.
    pub fn parse(source: &str) -> ExprResult<Self> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(open) = rest.find(OPEN) {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let body_start = open + OPEN.len();
            let body_rest = &rest[body_start..];

            let close = body_rest.find('}').ok_or_else(|| ExprError::Template {
                offset: offset + open,
                message: "unterminated placeholder".into(),
            })?;
            if !body_rest[close..].starts_with(CLOSE) {
                return Err(ExprError::Template {
                    offset: offset + body_start + close,
                    message: "unexpected '}' inside placeholder".into(),
                });
            }
            let body = &body_rest[..close];
            if let Some(nested) = body.find(OPEN) {
                return Err(ExprError::Template {
                    offset: offset + body_start + nested,
                    message: "nested placeholder".into(),
                });
            }

            segments.push(Segment::Placeholder(Expression::parse(body)?));

            let consumed = body_start + close + CLOSE.len();
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the template contains no placeholders
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Text(_)))
    }

    pub fn render(&self, context: &Context) -> ExprResult<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(expr) => {
                    let value = expr.evaluate(context)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step
pub fn render(template: &str, context: &Context) -> ExprResult<String> {
    Template::parse(template)?.render(context)
}
