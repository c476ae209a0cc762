//! Element states and the transition machinery.
//!
//! An element moves between [`State`]s one adjacent step at a time. A request
//! to reach a target state runs a *chain* of steps; each step calls the
//! element's `change_state` hook without any lock held. A step may complete
//! asynchronously, in which case the chain parks until the element commits
//! the step, and then resumes towards the newest requested target.

use crate::element::handle::{ElementInner, ElementKind};
use crate::object::lock;
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::executor::Command;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Element lifecycle states.
///
/// Ordered from `Null` (no resources) to `Playing` (data flowing).
/// `VoidPending` is a marker meaning "no state", used for pending slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum State {
    /// No state pending.
    VoidPending,
    /// Initial state, no resources allocated.
    #[default]
    Null,
    /// Resources allocated, ready to be paused.
    Ready,
    /// Prerolled; data may be accepted but the clock is stopped.
    Paused,
    /// Data is flowing.
    Playing,
}

impl State {
    /// The state one step closer to `target`.
    ///
    /// Returns `self` when already there or when either side is `VoidPending`.
    pub fn next_towards(self, target: State) -> State {
        if self == State::VoidPending || target == State::VoidPending {
            return self;
        }
        match self.cmp(&target) {
            std::cmp::Ordering::Less => self.up(),
            std::cmp::Ordering::Greater => self.down(),
            std::cmp::Ordering::Equal => self,
        }
    }

    fn up(self) -> State {
        match self {
            State::Null => State::Ready,
            State::Ready => State::Paused,
            State::Paused | State::Playing => State::Playing,
            State::VoidPending => State::VoidPending,
        }
    }

    fn down(self) -> State {
        match self {
            State::Playing => State::Paused,
            State::Paused => State::Ready,
            State::Ready | State::Null => State::Null,
            State::VoidPending => State::VoidPending,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::VoidPending => "VOID_PENDING",
            State::Null => "NULL",
            State::Ready => "READY",
            State::Paused => "PAUSED",
            State::Playing => "PLAYING",
        };
        f.write_str(name)
    }
}

/// A single step between adjacent states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChange {
    /// `Null` to `Ready`: allocate resources.
    NullToReady,
    /// `Ready` to `Paused`: activate pads, preroll.
    ReadyToPaused,
    /// `Paused` to `Playing`: start streaming.
    PausedToPlaying,
    /// `Playing` to `Paused`: stop streaming.
    PlayingToPaused,
    /// `Paused` to `Ready`: deactivate pads.
    PausedToReady,
    /// `Ready` to `Null`: release resources.
    ReadyToNull,
}

impl StateChange {
    /// The step from `current` to `next`, if they are adjacent.
    pub fn new(current: State, next: State) -> Option<Self> {
        match (current, next) {
            (State::Null, State::Ready) => Some(Self::NullToReady),
            (State::Ready, State::Paused) => Some(Self::ReadyToPaused),
            (State::Paused, State::Playing) => Some(Self::PausedToPlaying),
            (State::Playing, State::Paused) => Some(Self::PlayingToPaused),
            (State::Paused, State::Ready) => Some(Self::PausedToReady),
            (State::Ready, State::Null) => Some(Self::ReadyToNull),
            _ => None,
        }
    }

    /// The first step from `current` towards `target`.
    pub fn step(current: State, target: State) -> Option<Self> {
        Self::new(current, current.next_towards(target))
    }

    /// State before the step.
    pub fn current(self) -> State {
        match self {
            Self::NullToReady => State::Null,
            Self::ReadyToPaused | Self::ReadyToNull => State::Ready,
            Self::PausedToPlaying | Self::PausedToReady => State::Paused,
            Self::PlayingToPaused => State::Playing,
        }
    }

    /// State after the step.
    pub fn next(self) -> State {
        match self {
            Self::ReadyToNull => State::Null,
            Self::NullToReady | Self::PausedToReady => State::Ready,
            Self::ReadyToPaused | Self::PlayingToPaused => State::Paused,
            Self::PausedToPlaying => State::Playing,
        }
    }

    /// Whether the step goes towards `Playing`.
    pub fn is_upward(self) -> bool {
        self.next() > self.current()
    }

    /// The step undoing this one.
    pub fn reverse(self) -> Self {
        match self {
            Self::NullToReady => Self::ReadyToNull,
            Self::ReadyToPaused => Self::PausedToReady,
            Self::PausedToPlaying => Self::PlayingToPaused,
            Self::PlayingToPaused => Self::PausedToPlaying,
            Self::PausedToReady => Self::ReadyToPaused,
            Self::ReadyToNull => Self::NullToReady,
        }
    }

    /// Whether a request for `target` undoes this step.
    pub(crate) fn reversed_by(self, target: State) -> bool {
        if self.is_upward() {
            target < self.next()
        } else {
            target > self.next()
        }
    }
}

/// Successful outcome of a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChangeSuccess {
    /// The change completed.
    Success,
    /// The change will complete later; see [`Element::get_state`](crate::Element::get_state).
    Async,
    /// The change completed, but the element cannot preroll (live sources).
    NoPreroll,
}

pub use crate::error::StateChangeError;

/// Result of a state change request or step.
pub type StateChangeResult = std::result::Result<StateChangeSuccess, StateChangeError>;

/// Flat form of [`StateChangeResult`], used when committing async steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateChangeReturn {
    /// The step completed.
    Success,
    /// The step is still in flight.
    Async,
    /// The step completed without preroll.
    NoPreroll,
    /// The step failed.
    Failure,
}

impl StateChangeReturn {
    /// Convert into the `Result` form.
    pub fn into_result(self) -> StateChangeResult {
        match self {
            Self::Success => Ok(StateChangeSuccess::Success),
            Self::Async => Ok(StateChangeSuccess::Async),
            Self::NoPreroll => Ok(StateChangeSuccess::NoPreroll),
            Self::Failure => Err(StateChangeError),
        }
    }
}

impl From<StateChangeResult> for StateChangeReturn {
    fn from(result: StateChangeResult) -> Self {
        match result {
            Ok(StateChangeSuccess::Success) => Self::Success,
            Ok(StateChangeSuccess::Async) => Self::Async,
            Ok(StateChangeSuccess::NoPreroll) => Self::NoPreroll,
            Err(_) => Self::Failure,
        }
    }
}

/// Per-element state bookkeeping, guarded by the element's state mutex.
#[derive(Debug)]
pub(crate) struct StateCell {
    pub(crate) current: State,
    /// Target of the step in flight, `VoidPending` when none.
    pub(crate) next: State,
    /// Final state the running chain heads for.
    pub(crate) pending: State,
    /// Newest state requested by the application.
    pub(crate) target: State,
    pub(crate) last_return: StateChangeReturn,
    /// A thread is executing the chain.
    pub(crate) busy: bool,
    /// A request was handed to a worker and not yet picked up.
    pub(crate) queued: bool,
    /// Commit received while the step that went async was still returning.
    pub(crate) early_commit: Option<StateChangeReturn>,
    /// Excluded from parent state propagation.
    pub(crate) locked: bool,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            current: State::Null,
            next: State::VoidPending,
            pending: State::VoidPending,
            target: State::Null,
            last_return: StateChangeReturn::Success,
            busy: false,
            queued: false,
            early_commit: None,
            locked: false,
        }
    }

    /// An async step is parked waiting for a commit.
    pub(crate) fn in_async(&self) -> bool {
        !self.busy && self.next != State::VoidPending && self.last_return == StateChangeReturn::Async
    }

    /// Nothing in flight: no chain, no queued request, no async step.
    pub(crate) fn settled(&self) -> bool {
        !self.busy && !self.queued && !self.in_async()
    }

    pub(crate) fn outcome(&self) -> StateChangeResult {
        if self.in_async() {
            return Ok(StateChangeSuccess::Async);
        }
        self.last_return.into_result()
    }
}

impl ElementInner {
    fn wait_state<'a>(&self, cell: MutexGuard<'a, StateCell>) -> MutexGuard<'a, StateCell> {
        self.state_changed
            .wait(cell)
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Synchronous state request.
    ///
    /// Pipelines hand the request to their worker and wait until it has been
    /// processed; everything else runs the chain on the calling thread.
    pub(crate) fn set_state(self: &Arc<Self>, target: State) -> StateChangeResult {
        if let Some(pipeline) = &self.pipeline {
            if !pipeline.executor.is_current() {
                if !self.queue_state(target) {
                    return Err(StateChangeError);
                }
                return self.wait_idle();
            }
        }
        self.change_to(Some(target))
    }

    /// Fire-and-forget state request; progress is reported through events.
    pub(crate) fn set_state_async(self: &Arc<Self>, target: State) {
        if self.pipeline.is_some() {
            if !self.queue_state(target) {
                tracing::error!(element = %self.name(), %target, "pipeline executor is gone");
            }
            return;
        }

        {
            let mut cell = lock(&self.state);
            cell.target = target;
            cell.queued = true;
        }
        let element = self.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("{}-state", self.name()))
            .spawn(move || {
                let _ = element.change_to(None);
            });
        if let Err(err) = spawned {
            tracing::warn!(element = %self.name(), %err, "cannot spawn state thread, changing inline");
            let _ = self.change_to(None);
        }
    }

    /// Record a request and hand it to the pipeline worker.
    fn queue_state(&self, target: State) -> bool {
        {
            let mut cell = lock(&self.state);
            cell.target = target;
            cell.queued = true;
            if cell.busy || cell.in_async() {
                // Redirect the running chain right away.
                cell.pending = target;
            }
        }
        tracing::debug!(element = %self.name(), %target, "queued state change");

        let sent = self
            .pipeline
            .as_ref()
            .is_some_and(|pipeline| pipeline.executor.send(Command::SetState));
        if !sent {
            lock(&self.state).queued = false;
            self.state_changed.notify_all();
        }
        sent
    }

    /// Wait until no chain runs and no request is queued.
    fn wait_idle(&self) -> StateChangeResult {
        let mut cell = lock(&self.state);
        while cell.busy || cell.queued {
            cell = self.wait_state(cell);
        }
        cell.outcome()
    }

    /// Move towards `target`, or towards the recorded target for queued
    /// requests (`None`).
    pub(crate) fn change_to(self: &Arc<Self>, target: Option<State>) -> StateChangeResult {
        let mut cell = lock(&self.state);
        let target = match target {
            Some(target) => {
                cell.target = target;
                target
            }
            None => {
                cell.queued = false;
                self.state_changed.notify_all();
                cell.target
            }
        };

        if cell.busy {
            cell.pending = target;
            if self.on_worker() {
                // A continuation is queued behind us and picks up the new target.
                return Ok(StateChangeSuccess::Async);
            }
            while cell.busy {
                cell = self.wait_state(cell);
            }
            return cell.outcome();
        }

        if cell.in_async() {
            let parked = StateChange::new(cell.current, cell.next);
            cell.pending = target;
            let Some(step) = parked.filter(|step| step.reversed_by(target)) else {
                tracing::debug!(element = %self.name(), %target, "async step in flight, retargeted");
                return Ok(StateChangeSuccess::Async);
            };
            // Late commits for the aborted step find no step in flight.
            cell.next = State::VoidPending;
            cell.last_return = StateChangeReturn::Success;
            cell.busy = true;
            cell.early_commit = None;
            drop(cell);
            return self.abort_step(step);
        }

        if cell.current == target {
            cell.pending = State::VoidPending;
            if cell.last_return == StateChangeReturn::Failure {
                cell.last_return = StateChangeReturn::Success;
            }
            self.state_changed.notify_all();
            return cell.outcome();
        }

        cell.pending = target;
        cell.busy = true;
        cell.early_commit = None;
        drop(cell);

        tracing::debug!(element = %self.name(), %target, "starting state change");
        self.run_chain()
    }

    /// Undo a parked async step, then head for the pending state from
    /// `current`. The caller has set `busy`.
    ///
    /// Bins undo the step on their children too, which aborts any child step
    /// still waiting for its own commit.
    fn abort_step(self: &Arc<Self>, step: StateChange) -> StateChangeResult {
        let undo = step.reverse();
        tracing::debug!(element = %self.name(), ?step, "aborting async state change");

        if let Err(err) = self.change_state(undo) {
            tracing::warn!(element = %self.name(), ?undo, %err, "undoing async step failed");
            let cell = lock(&self.state);
            return self.fail_chain(cell, undo);
        }
        self.run_chain()
    }

    fn on_worker(&self) -> bool {
        self.pipeline
            .as_ref()
            .is_some_and(|pipeline| pipeline.executor.is_current())
    }

    /// Step towards the pending state. The caller has set `busy`.
    pub(crate) fn run_chain(self: &Arc<Self>) -> StateChangeResult {
        loop {
            let transition = {
                let mut cell = lock(&self.state);
                if cell.pending == State::VoidPending {
                    cell.pending = cell.current;
                }
                match StateChange::step(cell.current, cell.pending) {
                    Some(transition) => {
                        cell.next = transition.next();
                        transition
                    }
                    None => return self.finish_chain(cell),
                }
            };

            tracing::debug!(element = %self.name(), ?transition, "changing state");
            let ret = StateChangeReturn::from(self.change_state(transition));

            let mut cell = lock(&self.state);
            let ret = match ret {
                StateChangeReturn::Async => cell.early_commit.take().unwrap_or(ret),
                ret => ret,
            };
            cell.early_commit = None;

            match ret {
                StateChangeReturn::Success | StateChangeReturn::NoPreroll => {
                    let (old, new, pending) = Self::complete_step(&mut cell, transition, ret);
                    drop(cell);
                    self.state_changed.notify_all();
                    self.post_state_changed(old, new, pending);
                }
                StateChangeReturn::Async => {
                    cell.last_return = StateChangeReturn::Async;
                    cell.busy = false;
                    drop(cell);
                    self.state_changed.notify_all();
                    tracing::debug!(element = %self.name(), ?transition, "state change went async");
                    // Children may have committed before we parked.
                    self.check_async_children();
                    return Ok(StateChangeSuccess::Async);
                }
                StateChangeReturn::Failure => return self.fail_chain(cell, transition),
            }
        }
    }

    fn complete_step(
        cell: &mut StateCell,
        transition: StateChange,
        ret: StateChangeReturn,
    ) -> (State, State, State) {
        cell.current = transition.next();
        cell.next = State::VoidPending;
        cell.last_return = ret;
        let pending = if cell.current == cell.pending {
            State::VoidPending
        } else {
            cell.pending
        };
        (transition.current(), cell.current, pending)
    }

    fn finish_chain(self: &Arc<Self>, mut cell: MutexGuard<'_, StateCell>) -> StateChangeResult {
        cell.pending = State::VoidPending;
        cell.next = State::VoidPending;
        cell.busy = false;
        if cell.last_return == StateChangeReturn::Async {
            cell.last_return = StateChangeReturn::Success;
        }
        let outcome = cell.outcome();
        let reached = cell.current;
        drop(cell);
        self.state_changed.notify_all();

        tracing::debug!(element = %self.name(), state = %reached, "state change complete");
        self.notify_parent();
        outcome
    }

    fn fail_chain(
        self: &Arc<Self>,
        mut cell: MutexGuard<'_, StateCell>,
        transition: StateChange,
    ) -> StateChangeResult {
        cell.next = State::VoidPending;
        cell.pending = State::VoidPending;
        cell.last_return = StateChangeReturn::Failure;
        cell.busy = false;
        drop(cell);
        self.state_changed.notify_all();

        tracing::warn!(element = %self.name(), ?transition, "state change failed");
        self.post(PipelineEvent::Error {
            element: self.name().to_string(),
            message: format!("state change {transition:?} failed"),
        });
        self.notify_parent();
        Err(StateChangeError)
    }

    /// Run the element's own transition hook.
    fn change_state(self: &Arc<Self>, transition: StateChange) -> StateChangeResult {
        match &self.kind {
            ElementKind::Leaf(leaf) => self.change_leaf_state(leaf, transition),
            ElementKind::Bin(bin) => self.change_bin_state(bin, transition),
        }
    }

    /// Complete (or fail) a step that previously returned `Async`.
    pub(crate) fn commit_state(self: &Arc<Self>, ret: StateChangeReturn) {
        let mut cell = lock(&self.state);
        if cell.next == State::VoidPending {
            tracing::debug!(element = %self.name(), ?ret, "commit without a step in flight");
            return;
        }
        if cell.busy {
            cell.early_commit = Some(ret);
            return;
        }
        self.commit_parked(cell, ret);
    }

    fn commit_parked(self: &Arc<Self>, mut cell: MutexGuard<'_, StateCell>, ret: StateChangeReturn) {
        if cell.last_return != StateChangeReturn::Async {
            return;
        }
        let Some(transition) = StateChange::new(cell.current, cell.next) else {
            return;
        };

        match ret {
            StateChangeReturn::Async => {}
            StateChangeReturn::Failure => {
                let _ = self.fail_chain(cell, transition);
            }
            StateChangeReturn::Success | StateChangeReturn::NoPreroll => {
                let (old, new, pending) = Self::complete_step(&mut cell, transition, ret);
                cell.busy = true;
                drop(cell);
                self.state_changed.notify_all();

                tracing::debug!(element = %self.name(), ?transition, "async state change committed");
                self.post_state_changed(old, new, pending);
                self.post(PipelineEvent::AsyncDone {
                    element: self.name().to_string(),
                });
                self.continue_chain();
            }
        }
    }

    /// Resume a chain after a commit. The caller has set `busy`.
    fn continue_chain(self: &Arc<Self>) {
        if let Some(pipeline) = &self.pipeline {
            if !pipeline.executor.is_current() && pipeline.executor.send(Command::Continue) {
                return;
            }
        }
        let _ = self.run_chain();
    }

    fn notify_parent(&self) {
        if let Some(parent) = self.core.parent() {
            parent.check_async_children();
        }
    }

    /// Commit a bin's async step once none of its children is in flight.
    pub(crate) fn check_async_children(self: &Arc<Self>) {
        let ElementKind::Bin(bin) = &self.kind else {
            return;
        };
        let parked = {
            let cell = lock(&self.state);
            if !cell.in_async() {
                return;
            }
            cell.next
        };

        let mut ret = StateChangeReturn::Success;
        for child in bin.snapshot() {
            let cell = lock(&child.state);
            if cell.locked {
                continue;
            }
            if !cell.settled() {
                return;
            }
            match cell.last_return {
                StateChangeReturn::Failure => ret = StateChangeReturn::Failure,
                StateChangeReturn::NoPreroll if ret == StateChangeReturn::Success => {
                    ret = StateChangeReturn::NoPreroll;
                }
                _ => {}
            }
        }

        // Several children may resolve at once; only one of them commits.
        let cell = lock(&self.state);
        if !cell.in_async() || cell.next != parked {
            return;
        }
        tracing::debug!(bin = %self.name(), ?ret, "children resolved");
        self.commit_parked(cell, ret);
    }

    /// Wait for the element to settle.
    ///
    /// `None` waits forever. On timeout the result is `Async` with the
    /// pending state still reported.
    pub(crate) fn get_state(&self, timeout: Option<Duration>) -> (StateChangeResult, State, State) {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut cell = lock(&self.state);
        loop {
            if cell.settled() {
                return (cell.outcome(), cell.current, cell.pending);
            }
            match deadline {
                None => cell = self.wait_state(cell),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        let pending = if cell.pending == State::VoidPending {
                            cell.target
                        } else {
                            cell.pending
                        };
                        return (Ok(StateChangeSuccess::Async), cell.current, pending);
                    }
                    cell = self
                        .state_changed
                        .wait_timeout(cell, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|err| err.into_inner().0);
                }
            }
        }
    }

    fn post_state_changed(&self, old: State, new: State, pending: State) {
        self.post(PipelineEvent::StateChanged {
            element: self.name().to_string(),
            old,
            new,
            pending,
        });
    }
}
