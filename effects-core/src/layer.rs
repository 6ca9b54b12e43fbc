//! Layer — a recipe for building part of a [`Context`] (spec §5).
//!
//! A `Layer` is itself modeled as an `Effect<Context, E>` factory rather
//! than a plain `Context`, so its construction can depend on other
//! services, fail, or sleep — exactly like any other effect. Combinators
//! compose layers without ever building anything; construction happens
//! only when a layer is provided to an effect and the interpreter reaches
//! that node.

use crate::context::Context;
use crate::effect::{succeed, Effect};
use std::sync::Arc;

type BuildFn<E> = Arc<dyn Fn() -> Effect<Context, E> + Send + Sync>;

/// A recipe that produces a [`Context`] when built.
#[derive(Clone)]
pub struct Layer<E> {
    build: BuildFn<E>,
}

impl<E: 'static> Layer<E> {
    /// A layer that always builds the same, already-known `Context`.
    pub fn from_value(ctx: Context) -> Self {
        Self {
            build: Arc::new(move || succeed(ctx.clone())),
        }
    }

    /// A layer whose construction is itself an arbitrary effect — it may
    /// read other services, fail, or block.
    pub fn from_effect(f: impl Fn() -> Effect<Context, E> + Send + Sync + 'static) -> Self {
        Self { build: Arc::new(f) }
    }

    /// Build this layer's `Context`.
    pub fn build(&self) -> Effect<Context, E> {
        (self.build)()
    }

    /// Combine two layers horizontally: build both independently and merge
    /// their contexts, with `other`'s bindings winning on conflict.
    #[must_use]
    pub fn combine_with(self, other: Layer<E>) -> Layer<E> {
        Layer {
            build: Arc::new(move || {
                let base = self.build();
                let overlay = other.build();
                base.flat_map(move |base_ctx| overlay.map(move |overlay_ctx| base_ctx.merge(&overlay_ctx)))
            }),
        }
    }

    /// Combine two layers sequentially: build `self` first, then build
    /// `next` with `self`'s context already merged into the ambient one —
    /// so `next` can depend on services `self` provides.
    #[must_use]
    pub fn and_then(self, next: Layer<E>) -> Layer<E> {
        Layer {
            build: Arc::new(move || {
                let base = self.build();
                let next = next.clone();
                base.flat_map(move |base_ctx| {
                    next.build()
                        .map(move |next_ctx| base_ctx.merge(&next_ctx))
                        .provided_with(base_ctx.clone())
                })
            }),
        }
    }

    /// Run `effect` with this layer's `Context` merged over the ambient
    /// one. Shorthand for `effect.provided_by_layer(self)`.
    pub fn provide_to<A>(self, effect: Effect<A, E>) -> Effect<A, E>
    where
        A: Send + 'static,
    {
        effect.provided_by_layer(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Tag;

    struct Greeting(&'static str);
    struct Shout(bool);

    #[test]
    fn from_value_builds_the_same_context() {
        let tag = Tag::<Greeting>::new("Greeting");
        let ctx = Context::empty().insert(tag, Greeting("hi"));
        let layer: Layer<String> = Layer::from_value(ctx);
        // No interpreter is available in effects-core's own tests; this
        // just exercises that building returns an effect without panicking.
        let _built = layer.build();
    }

    #[test]
    fn combine_with_merges_both_layers() {
        let greet_tag = Tag::<Greeting>::new("Greeting");
        let shout_tag = Tag::<Shout>::new("Shout");
        let a: Layer<String> =
            Layer::from_value(Context::empty().insert(greet_tag, Greeting("hi")));
        let b: Layer<String> = Layer::from_value(Context::empty().insert(shout_tag, Shout(true)));
        let _combined = a.combine_with(b);
    }
}
