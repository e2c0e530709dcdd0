//! Collaborators that record every call, for headless runs and tests.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

use crate::core::collaborators::{
    Collaborators, MovementLock, OpinionSystem, OutcomeFeedback, SceneUnloader, SessionContext,
    SessionNotification, SessionNotifier, SessionRegistry, UnloadCallback, UnloadError,
};
use crate::core::session::SessionId;
use crate::schema::player::{NpcId, OpinionDelta, OpinionTarget, PlayerId};
use crate::schema::scene::SceneId;

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RegisterSession(PlayerId, SessionId),
    DeregisterSession(PlayerId, SessionId, bool),
    NotifyOutcome(PlayerId, bool),
    AdjustOpinion(NpcId, OpinionTarget, i32),
    SuspendMovement(PlayerId),
    RestoreSimulation(PlayerId),
    RestoreMovement(PlayerId),
    Unload(SceneId),
    Notify(SessionNotification),
}

#[derive(Default)]
struct Shared {
    calls: Vec<Call>,
    partners: FxHashMap<PlayerId, NpcId>,
    sessions: FxHashMap<PlayerId, SessionId>,
    pending_unloads: Vec<(SceneId, UnloadCallback)>,
}

/// A collaborator handle implementing every collaborator trait.
#[derive(Clone, Default)]
pub struct Recording {
    shared: Rc<RefCell<Shared>>,
}

impl Recording {
    fn push(&self, call: Call) {
        trace!(?call, "collaborator call");
        self.shared.borrow_mut().calls.push(call);
    }
}

impl SessionRegistry for Recording {
    fn register_session(&mut self, owner: PlayerId, session: SessionId) {
        self.shared.borrow_mut().sessions.insert(owner, session);
        self.push(Call::RegisterSession(owner, session));
    }

    fn deregister_session(&mut self, owner: PlayerId, session: SessionId, won: bool) {
        self.shared.borrow_mut().sessions.remove(&owner);
        self.push(Call::DeregisterSession(owner, session, won));
    }

    fn session_for_owner(&self, owner: PlayerId) -> Option<SessionId> {
        self.shared.borrow().sessions.get(&owner).copied()
    }
}

impl OutcomeFeedback for Recording {
    fn notify_outcome(&mut self, owner: PlayerId, won: bool) {
        self.push(Call::NotifyOutcome(owner, won));
    }
}

impl OpinionSystem for Recording {
    fn conversation_partner(&self, owner: PlayerId) -> Option<NpcId> {
        self.shared.borrow().partners.get(&owner).copied()
    }

    fn adjust_opinion(&mut self, npc: NpcId, target: OpinionTarget, delta: OpinionDelta) {
        self.push(Call::AdjustOpinion(npc, target, delta.value()));
    }
}

impl MovementLock for Recording {
    fn suspend_movement(&mut self, owner: PlayerId) {
        self.push(Call::SuspendMovement(owner));
    }

    fn restore_simulation(&mut self, owner: PlayerId) {
        self.push(Call::RestoreSimulation(owner));
    }

    fn restore_movement(&mut self, owner: PlayerId) {
        self.push(Call::RestoreMovement(owner));
    }
}

impl SceneUnloader for Recording {
    fn unload(&mut self, scene: SceneId, on_complete: UnloadCallback) {
        self.shared
            .borrow_mut()
            .pending_unloads
            .push((scene, on_complete));
        self.push(Call::Unload(scene));
    }
}

impl SessionNotifier for Recording {
    fn notify(&mut self, notification: SessionNotification) {
        self.push(Call::Notify(notification));
    }
}

/// A full set of recording collaborators sharing one log.
///
/// Scene unloads are held until [`Recorder::complete_unloads`] runs them.
#[derive(Clone)]
pub struct Recorder {
    registry: Recording,
    feedback: Recording,
    opinion: Recording,
    movement: Recording,
    unloader: Recording,
    notifier: Recording,
}

impl Recorder {
    pub fn new() -> Self {
        let shared = Recording::default();
        Self {
            registry: shared.clone(),
            feedback: shared.clone(),
            opinion: shared.clone(),
            movement: shared.clone(),
            unloader: shared.clone(),
            notifier: shared,
        }
    }

    /// Make `npc` the conversation partner of `owner`.
    pub fn with_partner(self, owner: PlayerId, npc: NpcId) -> Self {
        self.registry
            .shared
            .borrow_mut()
            .partners
            .insert(owner, npc);
        self
    }

    /// Borrow as a session context, using the recorder's own registry.
    pub fn context(&mut self) -> SessionContext<'_> {
        SessionContext {
            registry: &mut self.registry,
            feedback: &mut self.feedback,
            opinion: &mut self.opinion,
            movement: &mut self.movement,
            unloader: &mut self.unloader,
            notifier: &mut self.notifier,
        }
    }

    /// Boxed collaborators for a director. They keep logging into this
    /// recorder.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            feedback: Box::new(self.feedback.clone()),
            opinion: Box::new(self.opinion.clone()),
            movement: Box::new(self.movement.clone()),
            unloader: Box::new(self.unloader.clone()),
            notifier: Box::new(self.notifier.clone()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.registry.shared.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.registry.shared.borrow_mut().calls.clear();
    }

    pub fn pending_unloads(&self) -> usize {
        self.registry.shared.borrow().pending_unloads.len()
    }

    /// Finish every pending unload with `result`, returning how many ran.
    pub fn complete_unloads(&self, result: Result<(), String>) -> usize {
        // Take the queue first so callbacks run without the log borrowed.
        let pending = std::mem::take(&mut self.registry.shared.borrow_mut().pending_unloads);
        let count = pending.len();
        for (scene, callback) in pending {
            callback(result.clone().map_err(|reason| UnloadError { scene, reason }));
        }
        count
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
