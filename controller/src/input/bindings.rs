use std::any::Any;
use std::sync::{Arc, Weak};

use super::channel::{InputId, InputValue};

/// Stable handle returned by every `bind_*` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingHandle(pub u32);

/// Which button condition fires an action binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    Press,
    Hold,
    Release,
}

/// Ordering constraint between a directional gesture and a button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceOrder {
    None,
    DirectionalFirst,
    ButtonFirst,
}

/// When a binding removes itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UnbindPolicy {
    Never,
    AfterFires(u32),
    AfterSeconds(f32),
}

pub type ActionFn = dyn FnMut(InputValue, f32) + Send + Sync;
pub type SequenceFn = dyn FnMut(InputValue, InputValue) + Send + Sync;
pub type DirectionalFn = dyn FnMut() + Send + Sync;

/// Callback plus an optional owner; once the owner is dropped the delegate counts as unbound
/// and its binding is pruned on the next evaluation.
pub struct Delegate<F: ?Sized> {
    callback: Box<F>,
    owner: Option<Weak<dyn Any + Send + Sync>>,
}

impl<F: ?Sized> Delegate<F> {
    pub fn new(callback: Box<F>) -> Self {
        Self {
            callback,
            owner: None,
        }
    }

    /// Tie the delegate's lifetime to `owner`.
    pub fn with_owner<T: Any + Send + Sync>(mut self, owner: &Arc<T>) -> Self {
        let weak: Weak<dyn Any + Send + Sync> = Arc::downgrade(owner) as Weak<dyn Any + Send + Sync>;
        self.owner = Some(weak);
        self
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.owner.as_ref().is_none_or(|w| w.strong_count() > 0)
    }

    #[inline]
    pub(crate) fn callback_mut(&mut self) -> &mut F {
        &mut self.callback
    }
}

impl Delegate<ActionFn> {
    pub fn action(f: impl FnMut(InputValue, f32) + Send + Sync + 'static) -> Self {
        Self::new(Box::new(f))
    }
}

impl Delegate<SequenceFn> {
    pub fn sequence(f: impl FnMut(InputValue, InputValue) + Send + Sync + 'static) -> Self {
        Self::new(Box::new(f))
    }
}

impl Delegate<DirectionalFn> {
    pub fn directional(f: impl FnMut() + Send + Sync + 'static) -> Self {
        Self::new(Box::new(f))
    }
}

impl<F: ?Sized> std::fmt::Debug for Delegate<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegate")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Bookkeeping shared by every binding kind.
#[derive(Clone, Copy, Debug)]
pub struct BindingMeta {
    pub handle: BindingHandle,
    pub priority: i32,
    pub auto_consume: bool,
    pub policy: UnbindPolicy,
    pub fires: u32,
    pub age: f32,
    pub marked: bool,
    /// Frame serials of the evidence the binding last fired on.
    pub last_fired: Option<(u64, u64)>,
}

impl BindingMeta {
    pub(crate) fn new(handle: BindingHandle, priority: i32, auto_consume: bool) -> Self {
        Self {
            handle,
            priority,
            auto_consume,
            policy: UnbindPolicy::Never,
            fires: 0,
            age: 0.0,
            marked: false,
            last_fired: None,
        }
    }

    /// Record a firing on `evidence`; false if the binding already fired on it.
    pub(crate) fn try_fire(&mut self, evidence: (u64, u64)) -> bool {
        if self.marked || self.last_fired == Some(evidence) {
            return false;
        }
        self.last_fired = Some(evidence);
        self.fires = self.fires.saturating_add(1);
        if let UnbindPolicy::AfterFires(n) = self.policy
            && self.fires >= n
        {
            self.marked = true;
        }
        true
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.age += dt;
        if let UnbindPolicy::AfterSeconds(t) = self.policy
            && self.age >= t
        {
            self.marked = true;
        }
    }
}

/// Fires when one button satisfies `trigger`. Delegate receives `(value, elapsed)`.
#[derive(Debug)]
pub struct ActionBinding {
    pub meta: BindingMeta,
    pub input: InputId,
    pub trigger: TriggerEvent,
    pub delegate: Delegate<ActionFn>,
}

/// Fires when two buttons are pressed within the window. Delegate receives both values.
///
/// With `first_is_hold` the first button must be held while the second is pressed; order is then
/// irrelevant and only the second is consumed.
#[derive(Debug)]
pub struct SequenceBinding {
    pub meta: BindingMeta,
    pub first: InputId,
    pub second: InputId,
    pub first_is_hold: bool,
    pub order_matters: bool,
    pub delegate: Delegate<SequenceFn>,
}

/// Fires when a directional gesture completes.
#[derive(Debug)]
pub struct DirectionalBinding {
    pub meta: BindingMeta,
    pub gesture: InputId,
    pub delegate: Delegate<DirectionalFn>,
}

/// Fires when a gesture and a button press both appear in the window.
/// Delegate receives the button's `(value, elapsed)`.
#[derive(Debug)]
pub struct DirectionalSequenceBinding {
    pub meta: BindingMeta,
    pub input: InputId,
    pub gesture: InputId,
    pub order: SequenceOrder,
    pub delegate: Delegate<ActionFn>,
}

pub(crate) trait Binding {
    fn meta(&self) -> &BindingMeta;
    fn meta_mut(&mut self) -> &mut BindingMeta;
    fn is_bound(&self) -> bool;
}

macro_rules! impl_binding {
    ($($ty:ty),*) => {
        $(impl Binding for $ty {
            #[inline]
            fn meta(&self) -> &BindingMeta {
                &self.meta
            }
            #[inline]
            fn meta_mut(&mut self) -> &mut BindingMeta {
                &mut self.meta
            }
            #[inline]
            fn is_bound(&self) -> bool {
                self.delegate.is_bound()
            }
        })*
    };
}

impl_binding!(
    ActionBinding,
    SequenceBinding,
    DirectionalBinding,
    DirectionalSequenceBinding
);

/// Priority-ordered bindings with mark-and-sweep removal.
///
/// Notes
/// - Higher priority first; equal priorities keep insertion order.
/// - `mark` never removes immediately, so unbinding from inside an evaluation is safe.
#[derive(Debug)]
pub(crate) struct BindingSet<B> {
    items: Vec<B>,
}

impl<B> Default for BindingSet<B> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<B: Binding> BindingSet<B> {
    pub(crate) fn insert(&mut self, binding: B) {
        self.items.push(binding);
        self.items
            .sort_by_key(|b| std::cmp::Reverse(b.meta().priority));
    }

    pub(crate) fn mark(&mut self, handle: BindingHandle) -> bool {
        match self.items.iter_mut().find(|b| b.meta().handle == handle) {
            Some(b) if !b.meta().marked => {
                b.meta_mut().marked = true;
                true
            }
            _ => false,
        }
    }

    /// Drop marked bindings and bindings whose delegate lost its owner.
    pub(crate) fn sweep(&mut self) {
        self.items.retain(|b| !b.meta().marked && b.is_bound());
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        for b in &mut self.items {
            b.meta_mut().advance(dt);
        }
    }

    #[inline]
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, B> {
        self.items.iter_mut()
    }

    #[inline]
    pub(crate) fn iter(&self) -> std::slice::Iter<'_, B> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directional(handle: u32, priority: i32) -> DirectionalBinding {
        DirectionalBinding {
            meta: BindingMeta::new(BindingHandle(handle), priority, false),
            gesture: InputId::new("Gesture"),
            delegate: Delegate::directional(|| {}),
        }
    }

    #[test]
    fn higher_priority_sorts_first_and_ties_keep_order() {
        let mut set = BindingSet::default();
        set.insert(directional(1, 0));
        set.insert(directional(2, 5));
        set.insert(directional(3, 0));
        let order: Vec<u32> = set.iter().map(|b| b.meta.handle.0).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn marked_bindings_survive_until_sweep() {
        let mut set = BindingSet::default();
        set.insert(directional(1, 0));
        assert!(set.mark(BindingHandle(1)));
        assert!(!set.mark(BindingHandle(1)));
        assert_eq!(set.iter().count(), 1);
        set.sweep();
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn dropped_owner_unbinds_delegate() {
        let owner = Arc::new(());
        let delegate = Delegate::directional(|| {}).with_owner(&owner);
        assert!(delegate.is_bound());
        drop(owner);
        assert!(!delegate.is_bound());
    }

    #[test]
    fn fire_count_policy_marks_binding() {
        let mut meta = BindingMeta::new(BindingHandle(1), 0, true);
        meta.policy = UnbindPolicy::AfterFires(2);
        assert!(meta.try_fire((1, 1)));
        assert!(!meta.try_fire((1, 1)));
        assert!(meta.try_fire((2, 2)));
        assert!(meta.marked);
        assert!(!meta.try_fire((3, 3)));
    }

    #[test]
    fn timeout_policy_marks_binding() {
        let mut meta = BindingMeta::new(BindingHandle(1), 0, false);
        meta.policy = UnbindPolicy::AfterSeconds(0.5);
        meta.advance(0.25);
        assert!(!meta.marked);
        meta.advance(0.25);
        assert!(meta.marked);
    }
}
