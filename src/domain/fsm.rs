//! Generic guarded finite-state machine.
//!
//! A machine is a current state plus, per state, an ordered list of
//! `(target, guard)` transitions and optional `on_enter` / `on_update` hooks.
//!
//! `update(ctx)`:
//!   1. Scan the current state's transitions in order; the FIRST guard that
//!      returns true fires. Self-transitions are no-ops.
//!   2. On a real switch, run the new state's `on_enter`.
//!   3. Run `on_update` of the (possibly new) current state.
//!
//! At most one transition per call. Guards are plain `fn(&C) -> bool`, so
//! they cannot capture or mutate anything: they read the context snapshot
//! and nothing else. Hooks get `&mut C`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

pub type Guard<C> = fn(&C) -> bool;
pub type Hook<C> = fn(&mut C);

pub struct Transition<S, C> {
    pub to: S,
    pub guard: Guard<C>,
}

struct StateDef<S, C> {
    transitions: Vec<Transition<S, C>>,
    on_enter: Option<Hook<C>>,
    on_update: Option<Hook<C>>,
}

impl<S, C> StateDef<S, C> {
    fn empty() -> Self {
        StateDef { transitions: Vec::new(), on_enter: None, on_update: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError {
    #[error("initial state {0} has no definition")]
    UndefinedInitial(String),

    #[error("state {0} is defined twice")]
    DuplicateState(String),

    #[error("transition {from} -> {to} targets a state with no definition")]
    UnknownTarget { from: String, to: String },

    #[error("hook registered for undefined state {0}")]
    HookWithoutState(String),
}

// ── Builder ──

pub struct FsmBuilder<S, C> {
    initial: S,
    defs: HashMap<S, StateDef<S, C>>,
    order: Vec<S>,
    errors: Vec<FsmError>,
}

impl<S, C> FsmBuilder<S, C>
where
    S: Copy + Eq + Hash + Debug,
{
    pub fn new(initial: S) -> Self {
        FsmBuilder { initial, defs: HashMap::new(), order: Vec::new(), errors: Vec::new() }
    }

    /// Define a state and its transitions in priority order.
    pub fn state(mut self, s: S, transitions: Vec<(S, Guard<C>)>) -> Self {
        if self.defs.contains_key(&s) {
            self.errors.push(FsmError::DuplicateState(format!("{s:?}")));
            return self;
        }
        let mut def = StateDef::empty();
        def.transitions = transitions
            .into_iter()
            .map(|(to, guard)| Transition { to, guard })
            .collect();
        self.defs.insert(s, def);
        self.order.push(s);
        self
    }

    pub fn on_enter(mut self, s: S, hook: Hook<C>) -> Self {
        match self.defs.get_mut(&s) {
            Some(def) => def.on_enter = Some(hook),
            None => self.errors.push(FsmError::HookWithoutState(format!("{s:?}"))),
        }
        self
    }

    pub fn on_update(mut self, s: S, hook: Hook<C>) -> Self {
        match self.defs.get_mut(&s) {
            Some(def) => def.on_update = Some(hook),
            None => self.errors.push(FsmError::HookWithoutState(format!("{s:?}"))),
        }
        self
    }

    /// Validate the table. Every transition target and the initial state
    /// must be defined; the first problem found is returned.
    pub fn build(self) -> Result<Fsm<S, C>, FsmError> {
        if let Some(e) = self.errors.into_iter().next() {
            return Err(e);
        }
        if !self.defs.contains_key(&self.initial) {
            return Err(FsmError::UndefinedInitial(format!("{:?}", self.initial)));
        }
        for from in &self.order {
            for t in &self.defs[from].transitions {
                if !self.defs.contains_key(&t.to) {
                    return Err(FsmError::UnknownTarget {
                        from: format!("{from:?}"),
                        to: format!("{:?}", t.to),
                    });
                }
            }
        }
        Ok(Fsm { state: self.initial, defs: self.defs })
    }
}

// ── Machine ──

pub struct Fsm<S, C> {
    state: S,
    defs: HashMap<S, StateDef<S, C>>,
}

impl<S, C> Fsm<S, C>
where
    S: Copy + Eq + Hash + Debug,
{
    pub fn state(&self) -> S {
        self.state
    }

    /// Evaluate transitions, then run hooks. Returns the state entered this
    /// call, if any.
    pub fn update(&mut self, ctx: &mut C) -> Option<S> {
        let def = self.def(self.state);
        let target = def
            .transitions
            .iter()
            .find(|t| (t.guard)(&*ctx))
            .map(|t| t.to);

        let mut entered = None;
        if let Some(to) = target {
            if to != self.state {
                self.state = to;
                if let Some(enter) = self.def(to).on_enter {
                    enter(ctx);
                }
                entered = Some(to);
            }
        }

        if let Some(tick) = self.def(self.state).on_update {
            tick(ctx);
        }
        entered
    }

    /// Switch state from outside the transition table (e.g. a KO). Runs
    /// `on_enter` like a normal switch.
    pub fn force(&mut self, s: S, ctx: &mut C) {
        if s == self.state { return; }
        let enter = self.def(s).on_enter;
        self.state = s;
        if let Some(enter) = enter {
            enter(ctx);
        }
    }

    /// Reset to `s` without running hooks (match restart).
    pub fn reset(&mut self, s: S) {
        let _ = self.def(s);
        self.state = s;
    }

    fn def(&self, s: S) -> &StateDef<S, C> {
        match self.defs.get(&s) {
            Some(d) => d,
            // build() checked every reachable state; anything else is a bug
            None => panic!("fsm reached undefined state {s:?}"),
        }
    }
}
