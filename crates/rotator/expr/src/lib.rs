//! Sandboxed expression language and template renderer for filter rotation.
//!
//! Expressions are a small Python-flavoured language: arithmetic,
//! comparisons, boolean logic, conditionals, string indexing and calls to a
//! fixed library of date and string functions. Evaluation can only read the
//! names bound in a [`Context`] and call the functions in [`functions`];
//! there is no attribute access, no assignment and no I/O.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use rotator_expr::{render, Context};
//!
//! let now = Utc.with_ymd_and_hms(2021, 11, 3, 0, 0, 0).unwrap();
//! let name = render(
//!     "f-{{datetime_format(now - timedelta_days(1), '%Y%m%d')}}",
//!     &Context::new(now),
//! )
//! .unwrap();
//! assert_eq!(name, "f-20211102");
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod template;
pub mod value;

pub use context::{Context, NOW};
pub use error::{ExprError, ExprResult};
pub use eval::{evaluate, Expression};
pub use template::{render, Template};
pub use value::Value;

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn ctx() -> Context {
        Context::new(Utc.with_ymd_and_hms(2021, 11, 3, 8, 15, 0).unwrap())
    }

    proptest! {
        #[test]
        fn prop_text_without_braces_renders_verbatim(text in "[^{}]{0,64}") {
            prop_assert_eq!(render(&text, &ctx()), Ok(text.clone()));
        }

        #[test]
        fn prop_start_and_end_bounded_by_length(s in "\\PC{0,32}", n in 0i64..64) {
            let c = ctx().with_variable("s", s.clone()).with_variable("n", n);
            let len = s.chars().count() as i64;
            for f in ["start", "end"] {
                let out = evaluate(&format!("len({}(s, n))", f), &c);
                prop_assert_eq!(out, Ok(Value::Int(n.min(len))));
            }
            prop_assert_eq!(
                evaluate("start(s, n) + end(s, len(s) - n) == s", &c.clone().with_variable("n", n.min(len))),
                Ok(Value::Bool(true))
            );
        }

        #[test]
        fn prop_name_is_stable_within_a_day(
            day in 0i64..20_000,
            first in 0i64..86_400,
            second in 0i64..86_400,
        ) {
            let midnight = Utc.timestamp_opt(day * 86_400, 0).unwrap();
            let template = "f-{{datetime_format(now,'%Y%m%d')}}";
            let a = render(template, &Context::new(midnight + chrono::Duration::seconds(first)));
            let b = render(template, &Context::new(midnight + chrono::Duration::seconds(second)));
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a, Ok(format!("f-{}", midnight.format("%Y%m%d"))));
        }

        #[test]
        fn prop_integer_literals_render_as_written(i in 0i64..i64::MAX) {
            prop_assert_eq!(render(&format!("{{{{{}}}}}", i), &ctx()), Ok(i.to_string()));
        }

        #[test]
        fn prop_timedelta_days_moves_unixtime(days in -3650i64..3650) {
            let c = ctx().with_variable("d", days);
            prop_assert_eq!(
                evaluate("unixtime(now + timedelta_days(d)) - unixtime(now)", &c),
                Ok(Value::Int(days * 86_400))
            );
        }

        #[test]
        fn prop_evaluation_never_panics(expr in "[a-z0-9_ +\\-*/%()<>=!'\\[\\]:.,]{0,40}") {
            let _ = evaluate(&expr, &ctx());
        }
    }
}
