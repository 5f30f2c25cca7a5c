// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_ASSIGNMENT_ID: AtomicUsize = AtomicUsize::new(0);
static NEXT_COMPONENT_ID: AtomicUsize = AtomicUsize::new(0);

/// Monotone identity of an assignment store; together with a [`ComponentId`]
/// it keys the per-assignment context of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentId(usize);

impl AssignmentId {
    pub fn next() -> Self {
        Self(NEXT_ASSIGNMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AssignmentId({})", self.0)
    }
}

/// Monotone identity of a context-owning component (a selection, a
/// metaheuristic, the criterion set). Handed out process-wide so that a
/// component can look up its slot in any assignment's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    pub fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

/// Per-assignment storage of component contexts. Exactly one context exists
/// per (assignment, component) pair; it is created on first access and lives
/// as long as the assignment. Asking for a context under a different type
/// than it was created with is a programmer bug and panics.
#[derive(Default)]
pub struct ContextArena {
    slots: Vec<Option<Box<dyn Any + Send>>>,
}

impl std::fmt::Debug for ContextArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occupied = self.slots.iter().filter(|s| s.is_some()).count();
        f.debug_struct("ContextArena")
            .field("slots", &self.slots.len())
            .field("occupied", &occupied)
            .finish()
    }
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create<C, F>(&mut self, component: ComponentId, create: F) -> &mut C
    where
        C: Send + 'static,
        F: FnOnce() -> C,
    {
        let index = component.get();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        let slot = &mut self.slots[index];
        if slot.is_none() {
            *slot = Some(Box::new(create()));
        }
        slot.as_mut()
            .and_then(|b| b.downcast_mut::<C>())
            .expect("assignment context requested under a different type")
    }

    pub fn get<C: Send + 'static>(&self, component: ComponentId) -> Option<&C> {
        self.slots
            .get(component.get())
            .and_then(|s| s.as_ref())
            .and_then(|b| b.downcast_ref::<C>())
    }

    /// Drops every context; the next access recreates them from scratch.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter {
        n: u32,
    }

    #[test]
    fn test_ids_are_monotone_and_distinct() {
        let a = ComponentId::next();
        let b = ComponentId::next();
        assert!(b.get() > a.get());
        let x = AssignmentId::next();
        let y = AssignmentId::next();
        assert!(y.get() > x.get());
    }

    #[test]
    fn test_context_created_once_and_mutable() {
        let mut arena = ContextArena::new();
        let id = ComponentId::next();

        arena.get_or_create(id, || Counter { n: 0 }).n += 1;
        arena.get_or_create(id, || Counter { n: 100 }).n += 1;

        // The second create closure must not have run.
        assert_eq!(arena.get::<Counter>(id), Some(&Counter { n: 2 }));
    }

    #[test]
    fn test_distinct_components_get_distinct_contexts() {
        let mut arena = ContextArena::new();
        let a = ComponentId::next();
        let b = ComponentId::next();
        arena.get_or_create(a, || Counter { n: 1 });
        arena.get_or_create(b, || Counter { n: 2 });
        assert_eq!(arena.get::<Counter>(a).unwrap().n, 1);
        assert_eq!(arena.get::<Counter>(b).unwrap().n, 2);
    }

    #[test]
    fn test_clear_resets_contexts() {
        let mut arena = ContextArena::new();
        let id = ComponentId::next();
        arena.get_or_create(id, || Counter { n: 7 });
        arena.clear();
        assert!(arena.get::<Counter>(id).is_none());
        assert_eq!(arena.get_or_create(id, || Counter { n: 9 }).n, 9);
    }

    #[test]
    #[should_panic(expected = "different type")]
    fn test_type_mismatch_panics() {
        let mut arena = ContextArena::new();
        let id = ComponentId::next();
        arena.get_or_create(id, || Counter { n: 0 });
        let _ = arena.get_or_create(id, || 0u64);
    }
}
