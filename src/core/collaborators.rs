//! Interfaces to the systems a session talks to but does not own.

use std::cell::Cell;
use std::rc::Rc;
use thiserror::Error;

use crate::core::session::SessionId;
use crate::schema::player::{NpcId, OpinionDelta, OpinionTarget, PlayerId};
use crate::schema::scene::SceneId;

/// Tracks which session each player is in and receives final outcomes.
pub trait SessionRegistry {
    fn register_session(&mut self, owner: PlayerId, session: SessionId);
    fn deregister_session(&mut self, owner: PlayerId, session: SessionId, won: bool);
    fn session_for_owner(&self, owner: PlayerId) -> Option<SessionId>;
}

/// Win/lose jingles and on-screen feedback.
pub trait OutcomeFeedback {
    fn notify_outcome(&mut self, owner: PlayerId, won: bool);
}

/// The NPC opinion system.
pub trait OpinionSystem {
    /// The NPC the player was talking to when the microgame began, if any.
    fn conversation_partner(&self, owner: PlayerId) -> Option<NpcId>;
    fn adjust_opinion(&mut self, npc: NpcId, target: OpinionTarget, delta: OpinionDelta);
}

/// Toggles for the owner's overworld movement while a microgame runs.
pub trait MovementLock {
    fn suspend_movement(&mut self, owner: PlayerId);
    /// Give the owner's body back to the physics simulation.
    fn restore_simulation(&mut self, owner: PlayerId);
    fn restore_movement(&mut self, owner: PlayerId);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to unload scene {scene:?}: {reason}")]
pub struct UnloadError {
    pub scene: SceneId,
    pub reason: String,
}

/// Runs once when a scene unload finishes. May be called arbitrarily late.
pub type UnloadCallback = Box<dyn FnOnce(Result<(), UnloadError>)>;

/// Streams microgame scenes out in the background.
pub trait SceneUnloader {
    fn unload(&mut self, scene: SceneId, on_complete: UnloadCallback);
}

/// Lifecycle notifications, carrying the definition's configured event name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotification {
    Started {
        session: SessionId,
        owner: PlayerId,
        event: Option<String>,
    },
    Ended {
        session: SessionId,
        owner: PlayerId,
        won: bool,
        event: Option<String>,
    },
}

pub trait SessionNotifier {
    fn notify(&mut self, notification: SessionNotification);
}

/// Current on-screen width in pixels.
pub trait DisplaySource {
    fn current_width(&self) -> i32;
}

/// A display width the host updates when the window resizes.
#[derive(Debug, Clone, Default)]
pub struct SharedDisplay {
    width: Rc<Cell<i32>>,
}

impl SharedDisplay {
    pub fn new(width: i32) -> Self {
        Self {
            width: Rc::new(Cell::new(width)),
        }
    }

    pub fn set_width(&self, width: i32) {
        self.width.set(width);
    }
}

impl DisplaySource for SharedDisplay {
    fn current_width(&self) -> i32 {
        self.width.get()
    }
}

/// The collaborators owned by a director.
pub struct Collaborators {
    pub feedback: Box<dyn OutcomeFeedback>,
    pub opinion: Box<dyn OpinionSystem>,
    pub movement: Box<dyn MovementLock>,
    pub unloader: Box<dyn SceneUnloader>,
    pub notifier: Box<dyn SessionNotifier>,
}

/// Borrowed view of every collaborator, passed to session operations.
pub struct SessionContext<'a> {
    pub registry: &'a mut dyn SessionRegistry,
    pub feedback: &'a mut dyn OutcomeFeedback,
    pub opinion: &'a mut dyn OpinionSystem,
    pub movement: &'a mut dyn MovementLock,
    pub unloader: &'a mut dyn SceneUnloader,
    pub notifier: &'a mut dyn SessionNotifier,
}

impl Collaborators {
    /// Borrow these collaborators alongside `registry`.
    pub fn context<'a>(
        &'a mut self,
        registry: &'a mut dyn SessionRegistry,
    ) -> SessionContext<'a> {
        SessionContext {
            registry,
            feedback: self.feedback.as_mut(),
            opinion: self.opinion.as_mut(),
            movement: self.movement.as_mut(),
            unloader: self.unloader.as_mut(),
            notifier: self.notifier.as_mut(),
        }
    }
}
