//! Context — an immutable, type-indexed service registry.
//!
//! Keys are opaque typed [`Tag`]s rather than strings or `class-string`
//! identifiers, per spec §9's redesign note: the retrieval type is encoded
//! in the tag itself, so a lookup either returns the right type or fails —
//! there is no runtime cast that can silently retrieve the wrong service.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// An opaque, phantom-typed identifier for a service of type `T`.
///
/// Two tags are the same binding iff they share a `name` *and* a `T` —
/// the name exists purely for diagnostics (it shows up in
/// `ServiceNotFound` messages); uniqueness is enforced by `TypeId`.
pub struct Tag<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Tag<T> {
    /// Create a new tag. `name` is used only for error messages.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The diagnostic name this tag was constructed with.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls: `T` need not implement these traits for `Tag<T>` to.
impl<T> Clone for Tag<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Tag<T> {}
impl<T> fmt::Debug for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.name)
    }
}

/// An immutable mapping from [`Tag`] to service value.
///
/// `Context` is cheap to clone (an `Arc`'d map under the hood) and every
/// mutating operation (`insert`, `merge`) returns a new `Context` rather
/// than mutating in place — matching spec §3's "insertion (returning a new
/// Context)".
#[derive(Clone, Default)]
pub struct Context {
    services: im_map::Map,
}

impl Context {
    /// The empty context.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up the service bound to `tag`, if any.
    pub fn get<T: Send + Sync + 'static>(&self, tag: Tag<T>) -> Option<Arc<T>> {
        self.services
            .get(Key::of::<T>(tag.name()))
            .and_then(|boxed| boxed.clone().downcast::<T>().ok())
    }

    /// Return a new `Context` with `tag` bound to `value`, overriding any
    /// existing binding for the same tag (same `name` *and* `T` — a
    /// different tag naming the same `T` gets its own slot).
    #[must_use]
    pub fn insert<T: Send + Sync + 'static>(&self, tag: Tag<T>, value: T) -> Self {
        let mut services = self.services.clone();
        services.insert(Key::of::<T>(tag.name()), Arc::new(value));
        Self { services }
    }

    /// Right-biased merge: bindings in `overlay` win over bindings in `self`
    /// for any tag present in both.
    #[must_use]
    pub fn merge(&self, overlay: &Context) -> Self {
        let mut services = self.services.clone();
        services.extend(overlay.services.clone());
        Self { services }
    }

    /// Number of distinct service types bound in this context.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True iff no services are bound.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("services", &self.services.len())
            .finish()
    }
}

/// The registry key: a tag's identity is its `T` *and* its `name` (see
/// `Tag`'s own doc comment), so both go into the key — `TypeId` alone would
/// collide two distinct tags bound to the same Rust type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct Key {
    type_id: TypeId,
    name: &'static str,
}

impl Key {
    pub(super) fn of<T: 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name,
        }
    }
}

/// A small `HashMap<Key, Arc<dyn Any>>` wrapper, isolated in its own module
/// so `Context`'s public API never exposes the `Any` machinery.
mod im_map {
    use super::*;

    #[derive(Clone, Default)]
    pub(super) struct Map(HashMap<Key, Arc<dyn Any + Send + Sync>>);

    impl Map {
        pub(super) fn get(&self, key: Key) -> Option<&Arc<dyn Any + Send + Sync>> {
            self.0.get(&key)
        }

        pub(super) fn insert(&mut self, key: Key, value: Arc<dyn Any + Send + Sync>) {
            self.0.insert(key, value);
        }

        pub(super) fn extend(&mut self, other: Map) {
            self.0.extend(other.0);
        }

        pub(super) fn len(&self) -> usize {
            self.0.len()
        }

        pub(super) fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter(String);
    struct Counter(u32);

    #[test]
    fn insert_then_get_roundtrips() {
        let tag = Tag::<Greeter>::new("Greeter");
        let ctx = Context::empty().insert(tag, Greeter("hi".into()));
        assert_eq!(ctx.get(tag).unwrap().0, "hi");
    }

    #[test]
    fn missing_tag_is_none() {
        let tag = Tag::<Counter>::new("Counter");
        let ctx = Context::empty();
        assert!(ctx.get(tag).is_none());
    }

    #[test]
    fn merge_is_right_biased() {
        let tag = Tag::<Counter>::new("Counter");
        let base = Context::empty().insert(tag, Counter(1));
        let overlay = Context::empty().insert(tag, Counter(2));
        let merged = base.merge(&overlay);
        assert_eq!(merged.get(tag).unwrap().0, 2);
    }

    #[test]
    fn distinct_tags_of_the_same_type_do_not_collide() {
        let primary = Tag::<String>::new("primary_db_url");
        let replica = Tag::<String>::new("replica_db_url");
        let ctx = Context::empty()
            .insert(primary, "postgres://primary".to_string())
            .insert(replica, "postgres://replica".to_string());
        assert_eq!(*ctx.get(primary).unwrap(), "postgres://primary");
        assert_eq!(*ctx.get(replica).unwrap(), "postgres://replica");
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn insert_does_not_mutate_original() {
        let tag = Tag::<Counter>::new("Counter");
        let base = Context::empty().insert(tag, Counter(1));
        let _shadowed = base.insert(tag, Counter(2));
        assert_eq!(base.get(tag).unwrap().0, 1);
    }
}
