//! The director: owns players and sessions and drives the frame tick.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::clock::{Seconds, Timestamp};
use crate::core::collaborators::{Collaborators, DisplaySource, SessionRegistry};
use crate::core::player::Player;
use crate::core::session::{Session, SessionError, SessionId, SessionState};
use crate::core::viewport::{TargetAllocator, ViewportError};
use crate::schema::microgame::{MicrogameDefinition, RuntimeConfig};
use crate::schema::player::PlayerId;
use crate::schema::scene::{ObjectId, Scene};

#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("player not registered: {0}")]
    UnknownPlayer(PlayerId),
    #[error("player already registered: {0}")]
    DuplicatePlayer(PlayerId),
    #[error("session not found: {0:?}")]
    UnknownSession(SessionId),
    #[error("{owner} is already playing session {session:?}")]
    OwnerBusy { owner: PlayerId, session: SessionId },
    #[error("viewport error: {0}")]
    Viewport(#[from] ViewportError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Wins and losses for one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
}

/// Which session each player is in, plus their running record.
#[derive(Debug, Default)]
pub struct Roster {
    active: FxHashMap<PlayerId, SessionId>,
    records: FxHashMap<PlayerId, Record>,
}

impl Roster {
    pub fn record(&self, owner: PlayerId) -> Record {
        self.records.get(&owner).copied().unwrap_or_default()
    }
}

impl SessionRegistry for Roster {
    fn register_session(&mut self, owner: PlayerId, session: SessionId) {
        self.active.insert(owner, session);
    }

    fn deregister_session(&mut self, owner: PlayerId, session: SessionId, won: bool) {
        if self.active.get(&owner) == Some(&session) {
            self.active.remove(&owner);
        }
        let record = self.records.entry(owner).or_default();
        if won {
            record.wins += 1;
        } else {
            record.losses += 1;
        }
    }

    fn session_for_owner(&self, owner: PlayerId) -> Option<SessionId> {
        self.active.get(&owner).copied()
    }
}

/// A session that ended during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session: SessionId,
    pub owner: PlayerId,
    pub won: bool,
}

pub struct Director {
    config: RuntimeConfig,
    players: FxHashMap<PlayerId, Player>,
    sessions: FxHashMap<SessionId, Session>,
    next_session_id: u64,
    roster: Roster,
    collaborators: Collaborators,
    allocator: Box<dyn TargetAllocator>,
    display: Box<dyn DisplaySource>,
}

impl Director {
    pub fn new(
        config: RuntimeConfig,
        collaborators: Collaborators,
        allocator: Box<dyn TargetAllocator>,
        display: Box<dyn DisplaySource>,
    ) -> Self {
        Self {
            config,
            players: FxHashMap::default(),
            sessions: FxHashMap::default(),
            next_session_id: 1,
            roster: Roster::default(),
            collaborators,
            allocator,
            display,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Register a player and build their idle viewport target.
    pub fn register_player(
        &mut self,
        id: PlayerId,
        layout_size: i32,
    ) -> Result<(), DirectorError> {
        if self.players.contains_key(&id) {
            return Err(DirectorError::DuplicatePlayer(id));
        }
        let player = Player::new(id, layout_size, self.config.pixel_depth);
        player.refresh_viewport(self.display.current_width(), self.allocator.as_mut())?;
        info!(player = %id, layout_size, "player registered");
        self.players.insert(id, player);
        Ok(())
    }

    /// Remove a player and release their viewport target.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<(), DirectorError> {
        if let Some(session) = self.roster.session_for_owner(id) {
            return Err(DirectorError::OwnerBusy { owner: id, session });
        }
        let player = self
            .players
            .remove(&id)
            .ok_or(DirectorError::UnknownPlayer(id))?;
        player.viewport.release(self.allocator.as_mut());
        info!(player = %id, "player removed");
        Ok(())
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Wrap a freshly loaded scene in an idle session.
    pub fn load_session(&mut self, definition: MicrogameDefinition, scene: Scene) -> SessionId {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;
        debug!(session = id.0, microgame = %definition.id, scene = scene.id.0, "session loaded");
        self.sessions.insert(id, Session::new(id, definition, scene));
        id
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_for_owner(&self, owner: PlayerId) -> Option<SessionId> {
        self.roster.session_for_owner(owner)
    }

    pub fn is_playing(&self, owner: PlayerId) -> bool {
        self.roster.session_for_owner(owner).is_some()
    }

    pub fn record(&self, owner: PlayerId) -> Record {
        self.roster.record(owner)
    }

    /// Start `session` for `owner`.
    ///
    /// Returns `Ok(false)` if the session already has an owner. Fails if the
    /// owner is already playing another session.
    pub fn start_session(
        &mut self,
        session: SessionId,
        owner: PlayerId,
        now: Timestamp,
    ) -> Result<bool, DirectorError> {
        if let Some(active) = self.roster.session_for_owner(owner) {
            if active != session {
                return Err(DirectorError::OwnerBusy {
                    owner,
                    session: active,
                });
            }
        }
        let player = self
            .players
            .get(&owner)
            .ok_or(DirectorError::UnknownPlayer(owner))?;
        let target = self
            .sessions
            .get_mut(&session)
            .ok_or(DirectorError::UnknownSession(session))?;

        let layer = self.config.layer_for(owner);
        let mut ctx = self.collaborators.context(&mut self.roster);
        let started = target.start(player, layer, now, &mut ctx);
        if started {
            player.hud.set_loaded(true);
        }
        Ok(started)
    }

    /// End `session` now with outcome `won`.
    ///
    /// Returns `Ok(false)` if it had already ended or never started.
    pub fn end_session(&mut self, session: SessionId, won: bool) -> Result<bool, DirectorError> {
        let target = self
            .sessions
            .get_mut(&session)
            .ok_or(DirectorError::UnknownSession(session))?;
        let mut ctx = self.collaborators.context(&mut self.roster);
        let ended = target.end(won, &mut ctx);
        if ended {
            self.sessions.remove(&session);
        }
        Ok(ended)
    }

    pub fn extend_session(
        &mut self,
        session: SessionId,
        seconds: Seconds,
    ) -> Result<(), DirectorError> {
        self.sessions
            .get_mut(&session)
            .ok_or(DirectorError::UnknownSession(session))?
            .extend(seconds);
        Ok(())
    }

    pub fn set_time_scale(
        &mut self,
        session: SessionId,
        now: Timestamp,
        scale: f64,
    ) -> Result<(), DirectorError> {
        self.sessions
            .get_mut(&session)
            .ok_or(DirectorError::UnknownSession(session))?
            .set_time_scale(now, scale)?;
        Ok(())
    }

    /// Bring a runtime-spawned object into `session`'s scene.
    pub fn adopt_object(
        &mut self,
        session: SessionId,
        object: ObjectId,
    ) -> Result<(), DirectorError> {
        self.sessions
            .get_mut(&session)
            .ok_or(DirectorError::UnknownSession(session))?
            .adopt_object(object);
        Ok(())
    }

    /// Per-frame update.
    ///
    /// Resizes every player's viewport target to the current display width,
    /// then ticks running sessions in id order. Sessions that time out are
    /// removed and reported.
    pub fn tick(&mut self, now: Timestamp) -> Result<Vec<SessionOutcome>, DirectorError> {
        let width = self.display.current_width();
        for id in PlayerId::ALL {
            if let Some(player) = self.players.get(&id) {
                player.refresh_viewport(width, self.allocator.as_mut())?;
            }
        }

        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();

        let mut outcomes = Vec::new();
        for id in ids {
            let Some(session) = self.sessions.get_mut(&id) else {
                continue;
            };
            let mut ctx = self.collaborators.context(&mut self.roster);
            if let Some(won) = session.tick(now, &mut ctx) {
                if let Some(owner) = session.owner() {
                    outcomes.push(SessionOutcome {
                        session: id,
                        owner,
                        won,
                    });
                }
            }
        }

        self.sessions.retain(|_, s| s.state() != SessionState::Ended);
        Ok(outcomes)
    }
}

impl Drop for Director {
    fn drop(&mut self) {
        for player in self.players.values() {
            player.viewport.release(self.allocator.as_mut());
        }
    }
}
