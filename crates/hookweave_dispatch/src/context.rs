//! Per-thread invocation-tree state.
//!
//! An invocation-tree recording starts when a call whose site configuration
//! has `starts_invocation` set is entered on a thread with no active
//! recording. From then on every instrumented call on that thread becomes a
//! node of the tree, and the tree hook replaces the core service as the data
//! sink of all other sensors. The recording ends at the terminal dispatch of
//! the call that started it.
//!
//! # Nesting
//!
//! [`InvocationContext`] counts nested `starts_invocation` calls. The
//! activating call sets the depth to one; nested ones increment it on entry
//! and decrement it at their terminal dispatch, so only the originating call
//! brings it back to zero and deactivates the context. A nested
//! `starts_invocation` call never starts a second tree.
//!
//! Whether a call holds a depth level is decided once, on entry: the store
//! keeps a per-thread stack of the sites that opened a level, and a terminal
//! dispatch only closes the level its own site opened. Reconfiguring a site
//! while one of its calls is running therefore cannot unbalance the depth.
//!
//! # Storage
//!
//! Contexts live in thread-local storage keyed by dispatcher instance: no
//! thread can observe another thread's context, two dispatchers on the same
//! thread never share one, and a context is dropped together with its thread.

use core::cell::RefCell;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use hookweave_sensor::hook::InvocationTreeHook;
use hookweave_sensor::id::{SensorTypeId, SiteId};
use hookweave_sensor::resolver::TreeSensor;
use hookweave_sensor::sink::{CoreService, Sink};

// ─────────────────────────────────────────────────────────────────────────────
// InvocationContext
// ─────────────────────────────────────────────────────────────────────────────

/// Invocation-tree recording state of one thread.
///
/// Pure state holder: no I/O and no locking. The active tree sensor (its id
/// and hook) is cached on activation so nested calls never resolve it again.
#[derive(Clone, Default)]
pub struct InvocationContext {
    tree: Option<TreeSensor>,
    depth: u32,
}

impl InvocationContext {
    /// Creates an inactive context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a recording is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tree.is_some()
    }

    /// Number of `starts_invocation` calls currently open on this thread.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Sensor-type id of the active tree sensor.
    #[must_use]
    pub fn tree_sensor_id(&self) -> Option<SensorTypeId> {
        self.tree.as_ref().map(|tree| tree.id)
    }

    /// Hook of the active tree sensor.
    #[must_use]
    pub fn tree_hook(&self) -> Option<&Arc<dyn InvocationTreeHook>> {
        self.tree.as_ref().map(|tree| &tree.hook)
    }

    /// Activates the context for a `starts_invocation` call.
    ///
    /// `resolve` is only called when the context is inactive. Returns `true`
    /// if this call activated the context, `false` if a recording was already
    /// active (the call is nested) or no tree sensor could be resolved.
    pub fn try_activate(&mut self, resolve: impl FnOnce() -> Option<TreeSensor>) -> bool {
        if self.tree.is_some() {
            self.depth = self.depth.saturating_add(1);
            return false;
        }

        match resolve() {
            Some(tree) => {
                self.tree = Some(tree);
                self.depth = 1;
                true
            }
            None => false,
        }
    }

    /// Returns the sink for the hook of `sensor_type`.
    ///
    /// While recording, every sensor except the tree sensor itself stores
    /// into the tree hook; the tree sensor, and every sensor outside a
    /// recording, stores into `core`.
    #[must_use]
    pub fn current_sink<'a>(
        &'a self,
        sensor_type: SensorTypeId,
        core: &'a dyn CoreService,
    ) -> Sink<'a> {
        match &self.tree {
            Some(tree) if tree.id != sensor_type => Sink::InvocationTree(tree.hook.as_ref()),
            _ => Sink::Core(core),
        }
    }

    /// Returns the tree sensor if it must be dispatched in addition to the
    /// `configured` sensors of a call.
    ///
    /// That is the case while recording whenever the call's own
    /// configuration does not list the tree sensor.
    #[must_use]
    pub fn woven_tree(&self, configured: &[SensorTypeId]) -> Option<&TreeSensor> {
        self.tree
            .as_ref()
            .filter(|tree| !configured.contains(&tree.id))
    }

    /// Closes one `starts_invocation` call.
    ///
    /// Returns `true` if the originating call was closed and the context got
    /// deactivated.
    pub fn release(&mut self) -> bool {
        if self.tree.is_none() {
            return false;
        }

        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.deactivate();
            true
        } else {
            false
        }
    }

    /// Ends the recording unconditionally.
    pub fn deactivate(&mut self) {
        self.tree = None;
        self.depth = 0;
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("tree_sensor_id", &self.tree_sensor_id())
            .field("depth", &self.depth)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ContextStore
// ─────────────────────────────────────────────────────────────────────────────

/// State one dispatcher keeps for one thread.
#[derive(Default)]
struct ThreadState {
    /// A dispatch of the owning dispatcher is running on this thread.
    dispatching: bool,
    context: InvocationContext,
    /// Sites of the `starts_invocation` calls currently holding a depth level,
    /// innermost last.
    open: Vec<SiteId>,
}

impl ThreadState {
    fn is_idle(&self) -> bool {
        !self.dispatching && !self.context.is_active() && self.open.is_empty()
    }
}

/// Outcome of opening a `starts_invocation` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Opening {
    /// The call activated a new recording.
    Started,
    /// A recording was already active; the call joined it as a nested level.
    Joined,
    /// No recording is active and none could be started.
    Unrecorded,
}

impl Opening {
    /// Whether the call holds a depth level it must close later.
    pub(crate) fn is_recorded(self) -> bool {
        !matches!(self, Self::Unrecorded)
    }
}

thread_local! {
    static THREAD_STATES: RefCell<HashMap<u64, ThreadState>> = RefCell::new(HashMap::new());
}

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to the thread-local state of one dispatcher.
///
/// Every access goes through `try_with`: once thread-local storage is torn
/// down (thread exit) accesses fail softly and dispatch is skipped. No
/// caller-supplied code runs while the thread-local map is borrowed.
pub(crate) struct ContextStore {
    id: u64,
}

impl ContextStore {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Marks the calling thread as dispatching.
    ///
    /// Returns `None` if thread-local storage is gone, or if `guard_reentry`
    /// is set and a dispatch is already running on this thread.
    pub(crate) fn enter(&self, guard_reentry: bool) -> Option<DispatchScope<'_>> {
        THREAD_STATES
            .try_with(|states| {
                let mut states = states.borrow_mut();
                let state = states.entry(self.id).or_default();
                if state.dispatching && guard_reentry {
                    return None;
                }

                let outer = !state.dispatching;
                state.dispatching = true;
                Some(DispatchScope {
                    store: self,
                    outer,
                    close_on_unwind: None,
                })
            })
            .ok()
            .flatten()
    }

    /// Opens a `starts_invocation` call at `site`.
    ///
    /// `tree` is only used when no recording is active; callers resolve it
    /// beforehand so the resolver never runs under the thread-local borrow.
    /// Recorded calls are pushed onto the ownership stack and must be closed
    /// with [`close_invocation`](Self::close_invocation).
    pub(crate) fn open_invocation(&self, site: SiteId, tree: Option<TreeSensor>) -> Opening {
        THREAD_STATES
            .try_with(|states| {
                let mut states = states.borrow_mut();
                let state = states.entry(self.id).or_default();
                let joined = state.context.is_active();
                let started = state.context.try_activate(move || tree);
                let opening = if started {
                    Opening::Started
                } else if joined {
                    Opening::Joined
                } else {
                    Opening::Unrecorded
                };
                if opening.is_recorded() {
                    state.open.push(site);
                }
                opening
            })
            .unwrap_or(Opening::Unrecorded)
    }

    /// Closes the innermost open `starts_invocation` call if it belongs to
    /// `site`.
    ///
    /// Calls that never opened a level (unrecorded, or not starting when
    /// entered) find another site on top and close nothing. Returns `true`
    /// if the recording ended.
    pub(crate) fn close_invocation(&self, site: SiteId) -> bool {
        THREAD_STATES
            .try_with(|states| {
                let mut states = states.borrow_mut();
                let Some(state) = states.get_mut(&self.id) else {
                    return false;
                };
                if state.open.last() != Some(&site) {
                    return false;
                }

                state.open.pop();
                let ended = state.context.release();
                if state.is_idle() {
                    states.remove(&self.id);
                }
                ended
            })
            .unwrap_or(false)
    }

    /// Returns `true` while a recording is active on the calling thread.
    pub(crate) fn is_active(&self) -> bool {
        THREAD_STATES
            .try_with(|states| {
                states
                    .borrow()
                    .get(&self.id)
                    .is_some_and(|state| state.context.is_active())
            })
            .unwrap_or(false)
    }

    /// Returns a copy of the calling thread's context.
    pub(crate) fn snapshot(&self) -> InvocationContext {
        THREAD_STATES
            .try_with(|states| {
                states
                    .borrow()
                    .get(&self.id)
                    .map(|state| state.context.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn leave(&self, outer: bool) {
        let _ = THREAD_STATES.try_with(|states| {
            let mut states = states.borrow_mut();
            if let Some(state) = states.get_mut(&self.id) {
                if outer {
                    state.dispatching = false;
                }
                if state.is_idle() {
                    states.remove(&self.id);
                }
            }
        });
    }
}

/// Marks a dispatch in progress on the current thread until dropped.
pub(crate) struct DispatchScope<'a> {
    store: &'a ContextStore,
    /// Whether this scope set the dispatching flag (and must clear it).
    outer: bool,
    /// Open call to close if the dispatch unwinds before closing it itself.
    close_on_unwind: Option<SiteId>,
}

impl DispatchScope<'_> {
    /// Closes the `starts_invocation` call at `site` if a hook panic escapes
    /// this dispatch.
    pub(crate) fn close_on_unwind(&mut self, site: SiteId) {
        self.close_on_unwind = Some(site);
    }
}

impl Drop for DispatchScope<'_> {
    fn drop(&mut self) {
        if let Some(site) = self.close_on_unwind
            && std::thread::panicking()
        {
            self.store.close_invocation(site);
        }
        self.store.leave(self.outer);
    }
}
