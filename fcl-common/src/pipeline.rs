//! Interaction pipeline.
//!
//! A pipeline is an ordered list of [`Transformer`]s applied to an [`Interaction`]. Each
//! transformer either hands back the (possibly changed) interaction or rejects it. Rejection
//! is data: [`pipe`] stops at the first rejection, marks the interaction bad and returns it, so
//! callers check [`is_ok`]/[`why`] instead of handling an error.
//!
//! ```
//! use fcl_common::{builders::{limit, script}, pipeline::{build, is_ok}};
//!
//! let ix = build([script("pub fun main(): Int { return 42 }"), limit(50)]);
//! assert!(is_ok(&ix));
//! ```
use std::fmt;

use tracing::{debug, trace, warn};

use crate::interaction::Interaction;

/// A rejected interaction together with the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    interaction: Box<Interaction>,
    reason: String,
}

impl Rejection {
    pub fn new(interaction: Interaction, reason: impl Into<String>) -> Self {
        Self { interaction: Box::new(interaction), reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn into_parts(self) -> (Interaction, String) {
        (*self.interaction, self.reason)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interaction rejected: {}", self.reason)
    }
}

/// Outcome of a single transformer application.
pub type Transformed = Result<Interaction, Rejection>;

/// Shorthand for rejecting from inside a transformer.
pub fn reject(interaction: Interaction, reason: impl Into<String>) -> Transformed {
    Err(Rejection::new(interaction, reason))
}

pub trait Transformer: Send + Sync {
    /// Name used in logs and default diagnostics.
    fn name(&self) -> &str;

    fn apply(&self, interaction: Interaction) -> Transformed;
}

pub type BoxedTransformer = Box<dyn Transformer>;

impl<T: Transformer + ?Sized> Transformer for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&self, interaction: Interaction) -> Transformed {
        (**self).apply(interaction)
    }
}

impl<T: Transformer + ?Sized> Transformer for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn apply(&self, interaction: Interaction) -> Transformed {
        (**self).apply(interaction)
    }
}

struct FnTransformer<F> {
    name: String,
    f: F,
}

impl<F> Transformer for FnTransformer<F>
where
    F: Fn(Interaction) -> Transformed + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, interaction: Interaction) -> Transformed {
        (self.f)(interaction)
    }
}

/// Wraps a closure into a named transformer.
pub fn transformer<F>(name: impl Into<String>, f: F) -> BoxedTransformer
where
    F: Fn(Interaction) -> Transformed + Send + Sync + 'static,
{
    Box::new(FnTransformer { name: name.into(), f })
}

/// Applies `transformers` in order to `interaction`.
///
/// Never fails: the first rejection marks the returned interaction bad and no later
/// transformer runs. An interaction that is already bad is returned untouched.
pub fn pipe<I>(interaction: Interaction, transformers: I) -> Interaction
where
    I: IntoIterator,
    I::Item: Transformer,
{
    if interaction.is_bad() {
        debug!(reason = ?interaction.why(), "Skipping pipeline for bad interaction");
        return interaction;
    }

    let mut current = interaction;
    for (index, t) in transformers.into_iter().enumerate() {
        trace!(index, transformer = t.name(), "Applying transformer");
        match t.apply(current) {
            Ok(next) if next.is_bad() => return next,
            Ok(next) => current = next,
            Err(rejection) => {
                let (mut rejected, reason) = rejection.into_parts();
                let reason = if reason.trim().is_empty() {
                    format!("transformer '{}' rejected the interaction", t.name())
                } else {
                    reason
                };
                warn!(index, transformer = t.name(), %reason, "Interaction rejected");
                rejected.mark_bad(reason);
                return rejected;
            }
        }
    }
    current
}

/// Creates a fresh interaction and pipes it through `transformers`.
pub fn build<I>(transformers: I) -> Interaction
where
    I: IntoIterator,
    I::Item: Transformer,
{
    pipe(Interaction::default(), transformers)
}

/// Composes several transformers into one, so pipelines can be nested.
pub fn pipeline(transformers: Vec<BoxedTransformer>) -> BoxedTransformer {
    transformer("pipeline", move |ix| {
        let out = pipe(ix, &transformers);
        match out.why().map(str::to_string) {
            Some(reason) if out.is_bad() => reject(out, reason),
            _ => Ok(out),
        }
    })
}

/// Rejects the interaction with `Validation failed: {name}` unless `predicate` holds.
pub fn validator<F>(name: impl Into<String>, predicate: F) -> BoxedTransformer
where
    F: Fn(&Interaction) -> bool + Send + Sync + 'static,
{
    let name = name.into();
    let reason = format!("Validation failed: {name}");
    transformer(name, move |ix| if predicate(&ix) { Ok(ix) } else { reject(ix, reason.clone()) })
}

/// Guard that rejects with the fixed `message` unless `condition` holds.
pub fn invariant<F>(condition: F, message: impl Into<String>) -> BoxedTransformer
where
    F: Fn(&Interaction) -> bool + Send + Sync + 'static,
{
    let message = message.into();
    transformer("invariant", move |ix| {
        if condition(&ix) {
            Ok(ix)
        } else {
            reject(ix, message.clone())
        }
    })
}

pub fn is_ok(interaction: &Interaction) -> bool {
    interaction.is_ok()
}

pub fn is_bad(interaction: &Interaction) -> bool {
    interaction.is_bad()
}

pub fn why(interaction: &Interaction) -> Option<&str> {
    interaction.why()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        builders::{authorizations, limit, proposer, script, transaction},
        interaction::{authorization, InteractionTag},
    };

    fn failing(reason: &'static str) -> BoxedTransformer {
        transformer("failing", move |ix| reject(ix, reason))
    }

    fn counting(counter: Arc<AtomicUsize>) -> BoxedTransformer {
        transformer("counting", move |ix| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ix)
        })
    }

    #[test]
    fn test_build_empty_is_default() {
        let ix = build(Vec::<BoxedTransformer>::new());

        assert_eq!(ix, Interaction::default());
        assert!(is_ok(&ix));
    }

    #[test]
    fn test_pipe_applies_in_order() {
        let ix = build([script("pub fun main() {}"), limit(10), limit(20)]);

        assert_eq!(ix.tag(), InteractionTag::Script);
        assert_eq!(ix.message().compute_limit, Some(20));
    }

    #[test]
    fn test_pipe_short_circuits() {
        let counter = Arc::new(AtomicUsize::new(0));

        let ix = build([
            counting(counter.clone()),
            failing("first failure"),
            limit(99),
            counting(counter.clone()),
            failing("second failure"),
        ]);

        assert!(is_bad(&ix));
        assert_eq!(why(&ix), Some("first failure"));
        assert_eq!(ix.message().compute_limit, None);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pipe_on_bad_interaction_is_noop() {
        let bad = build([failing("broken")]);

        let res = pipe(bad.clone(), [limit(5)]);

        assert_eq!(res, bad);
    }

    #[test]
    fn test_empty_reason_gets_default() {
        let ix = build([failing("  ")]);

        assert_eq!(why(&ix), Some("transformer 'failing' rejected the interaction"));
    }

    #[test]
    fn test_validator_without_authorizations_is_bad() {
        let ix = pipe(
            build(Vec::<BoxedTransformer>::new()),
            [validator("hasAuth", |ix| !ix.authorizations().is_empty())],
        );

        assert!(is_bad(&ix));
        assert_eq!(why(&ix), Some("Validation failed: hasAuth"));
    }

    #[test]
    fn test_passing_validator_leaves_interaction_untouched() {
        let before = build([transaction("transaction {}"), limit(30)]);

        let after = pipe(before.clone(), [validator("isTransaction", |ix| ix.tag() == InteractionTag::Transaction)]);

        assert_eq!(after, before);
    }

    #[test]
    fn test_invariant() {
        let auth = authorization("0x01", 0, Some(1)).unwrap();
        let needs_auth = || {
            invariant(
                |ix: &Interaction| !ix.authorizations().is_empty(),
                "A transaction needs at least one authorization",
            )
        };

        let ok = build([transaction("transaction {}"), authorizations(vec![auth.clone()]), needs_auth()]);
        let bad = build([transaction("transaction {}"), proposer(auth), needs_auth()]);

        assert!(is_ok(&ok));
        assert_eq!(why(&bad), Some("A transaction needs at least one authorization"));
    }

    #[test]
    fn test_nested_pipeline() {
        let inner = pipeline(vec![script("pub fun main() {}"), failing("inner")]);

        let ix = build([inner, limit(1)]);

        assert_eq!(why(&ix), Some("inner"));
        assert_eq!(ix.tag(), InteractionTag::Script);
        assert_eq!(ix.message().compute_limit, None);
    }

    #[test]
    fn test_pipe_by_reference_is_reusable() {
        let steps = vec![script("pub fun main() {}"), limit(7)];

        let first = build(&steps);
        let second = build(&steps);

        assert_eq!(first, second);
    }

    #[test]
    fn test_interactions_built_concurrently() {
        let handles: Vec<_> = (1..=4u64)
            .map(|n| std::thread::spawn(move || build([script("pub fun main() {}"), limit(n)])))
            .collect();

        let limits: Vec<_> = handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap()
                    .message()
                    .compute_limit
            })
            .collect();

        assert_eq!(limits, vec![Some(1), Some(2), Some(3), Some(4)]);
    }
}
