//! Named, orderable callback lists.
//!
//! A [`Signal`] is the observer primitive used for entity create/destroy and
//! per-component add/remove notifications, and doubles as a phase list for
//! frame updates ("input", then "physics", then "render"). Listeners run
//! synchronously, in list order, when the signal is invoked.
//!
//! Listeners may name other listeners they must run after. The list is
//! re-sorted whenever such a listener is connected: a dependent is placed
//! right after the listener(s) it names, everything else keeps its relative
//! order. A dependency cycle is rejected with [`SignalError::Cycle`] and the
//! previous order is kept.

use crate::ecs::SignalError;
use std::fmt;
use std::sync::Arc;
use tessera_metrics::ListenerProfiler;

/// Shared listener callback. Cloning a signal shares these.
pub type Callback<C, E> = Arc<dyn Fn(&mut C, E) + Send + Sync>;

/// Handle returned when connecting a listener.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

impl ListenerId {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Listener<C, E> {
    id: ListenerId,
    name: Option<String>,
    after: Vec<String>,
    active: bool,
    callback: Callback<C, E>,
}

impl<C, E> Clone for Listener<C, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            after: self.after.clone(),
            active: self.active,
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Ordered list of listeners receiving `(&mut C, E)`.
pub struct Signal<C, E> {
    listeners: Vec<Listener<C, E>>,
    next_id: u32,
}

impl<C, E> Signal<C, E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn push(
        &mut self,
        name: Option<String>,
        after: Vec<String>,
        callback: Callback<C, E>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            name,
            after,
            active: true,
            callback,
        });
        id
    }

    /// Append an anonymous listener.
    pub fn connect<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&mut C, E) + Send + Sync + 'static,
    {
        self.push(None, Vec::new(), Arc::new(callback))
    }

    /// Append a named listener. Listeners already waiting on `name` are
    /// moved behind it.
    pub fn connect_named<F>(&mut self, name: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&mut C, E) + Send + Sync + 'static,
    {
        let id = self.push(Some(name.into()), Vec::new(), Arc::new(callback));
        // Cannot fail: a listener with no dependencies has no incoming edge,
        // so it cannot close a cycle.
        let _ = self.order();
        id
    }

    /// Connect a named listener that must run after every listener named in
    /// `after`. Names not connected yet are honored once they appear.
    pub fn connect_after<F>(
        &mut self,
        name: impl Into<String>,
        after: &[&str],
        callback: F,
    ) -> Result<ListenerId, SignalError>
    where
        F: Fn(&mut C, E) + Send + Sync + 'static,
    {
        let name = name.into();
        if after.iter().any(|dep| *dep == name) {
            return Err(SignalError::SelfDependency { name });
        }
        let after = after.iter().map(|dep| dep.to_string()).collect();
        let id = self.push(Some(name), after, Arc::new(callback));
        if let Err(err) = self.order() {
            self.listeners.retain(|l| l.id != id);
            return Err(err);
        }
        Ok(id)
    }

    /// Re-sort listeners so every listener follows the ones it names.
    ///
    /// On a cycle the list is left untouched.
    pub fn order(&mut self) -> Result<(), SignalError> {
        let n = self.listeners.len();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut pending = vec![0usize; n];

        for (j, listener) in self.listeners.iter().enumerate() {
            for dep in &listener.after {
                for (i, other) in self.listeners.iter().enumerate() {
                    if i != j && other.name.as_deref() == Some(dep.as_str()) {
                        children[i].push(j);
                        pending[j] += 1;
                    }
                }
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut stack = Vec::new();
        for root in 0..n {
            if pending[root] != 0 {
                continue;
            }
            // Roots are only ever pushed here; children only once their
            // last dependency is placed.
            pending[root] = usize::MAX;
            stack.push(root);
            while let Some(v) = stack.pop() {
                order.push(v);
                let mut ready = Vec::new();
                for &c in &children[v] {
                    pending[c] -= 1;
                    if pending[c] == 0 {
                        pending[c] = usize::MAX;
                        ready.push(c);
                    }
                }
                stack.extend(ready.into_iter().rev());
            }
        }

        if order.len() < n {
            let listeners: Vec<String> = (0..n)
                .filter(|&i| pending[i] != usize::MAX)
                .map(|i| {
                    self.listeners[i]
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("<listener {}>", self.listeners[i].id))
                })
                .collect();
            tracing::warn!(?listeners, "signal listener dependencies form a cycle");
            return Err(SignalError::Cycle { listeners });
        }

        let mut slots: Vec<Option<Listener<C, E>>> =
            std::mem::take(&mut self.listeners).into_iter().map(Some).collect();
        self.listeners = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();
        tracing::debug!(listeners = n, "signal reordered");
        Ok(())
    }

    /// Enable or disable a listener without removing it.
    pub fn set_active(&mut self, id: ListenerId, active: bool) -> bool {
        match self.listeners.iter_mut().find(|l| l.id == id) {
            Some(listener) => {
                listener.active = active;
                true
            }
            None => false,
        }
    }

    /// Enable or disable every listener named `name`. Returns how many matched.
    pub fn set_active_by_name(&mut self, name: &str, active: bool) -> usize {
        let mut matched = 0;
        for listener in self
            .listeners
            .iter_mut()
            .filter(|l| l.name.as_deref() == Some(name))
        {
            listener.active = active;
            matched += 1;
        }
        matched
    }

    pub fn is_active(&self, id: ListenerId) -> Option<bool> {
        self.listeners.iter().find(|l| l.id == id).map(|l| l.active)
    }

    pub fn disconnect(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Listener names in invocation order (`None` for anonymous listeners).
    pub fn names(&self) -> Vec<Option<&str>> {
        self.listeners.iter().map(|l| l.name.as_deref()).collect()
    }

    /// Active callbacks in invocation order, detached from the signal so the
    /// owner can be borrowed mutably while they run.
    pub(crate) fn snapshot(&self) -> Vec<Callback<C, E>> {
        if self.listeners.is_empty() {
            return Vec::new();
        }
        self.listeners
            .iter()
            .filter(|l| l.active)
            .map(|l| Arc::clone(&l.callback))
            .collect()
    }
}

impl<C, E: Clone> Signal<C, E> {
    /// Call every active listener in order.
    pub fn invoke(&self, ctx: &mut C, event: E) {
        for listener in self.listeners.iter().filter(|l| l.active) {
            (listener.callback)(ctx, event.clone());
        }
    }

    /// Like [`invoke`](Self::invoke), accumulating each named listener's
    /// run time in `profiler` under its name.
    pub fn invoke_profiled(&self, profiler: &mut ListenerProfiler, ctx: &mut C, event: E) {
        for listener in self.listeners.iter().filter(|l| l.active) {
            match &listener.name {
                Some(name) => {
                    profiler.time(name, || (listener.callback)(ctx, event.clone()))
                }
                None => (listener.callback)(ctx, event.clone()),
            }
        }
    }
}

impl<C, E> Clone for Signal<C, E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
            next_id: self.next_id,
        }
    }
}

impl<C, E> Default for Signal<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> fmt::Debug for Signal<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.names())
            .finish()
    }
}
