//! Macros for ergonomic flow composition.

/// Sequence steps without nesting `and_then` closures by hand.
///
/// - `from pat in expr;` binds the value of `expr` for the rest of the block
/// - `expr;` runs `expr` and discards its value
/// - `let pat = expr;` is a plain binding
/// - the last expression is the flow that produces the result
///
/// Works for [`Flow`](crate::effects::Flow) and
/// [`AsyncFlow`](crate::effects::AsyncFlow) alike, since both expose
/// `and_then`. Continuations are `Fn` closures, so values bound earlier and
/// used in later steps must be `Copy` (or cloned into a `let`).
///
/// # Example
///
/// ```
/// use stepwise::config::Settings;
/// use stepwise::effects::{pure, Flow};
/// use stepwise::flow;
/// use stepwise::logging::info;
///
/// let total: Flow<i32> = flow! {
///     from x in pure(20);
///     info("got x");
///     from y in pure(1);
///     let sum = x + y;
///     pure(sum * 2)
/// };
/// assert_eq!(total.run(Settings::default()).value(), Some(&42));
/// ```
#[macro_export]
macro_rules! flow {
    (from $p:pat in $e:expr; $($rest:tt)+) => {
        $e.and_then(move |$p| $crate::flow!($($rest)+))
    };
    (let $p:pat = $e:expr; $($rest:tt)+) => {{
        let $p = $e;
        $crate::flow!($($rest)+)
    }};
    ($e:expr; $($rest:tt)+) => {
        $e.and_then(move |_| $crate::flow!($($rest)+))
    };
    ($e:expr $(;)?) => {
        $e
    };
}
