//! Microgame session state machine.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::core::clock::{Clock, ClockError, Seconds, Timestamp};
use crate::core::collaborators::{SessionContext, SessionNotification};
use crate::core::partition::PartitionTable;
use crate::core::player::{Player, PlayerHud};
use crate::core::viewport::{RenderTarget, ViewportSlot};
use crate::schema::microgame::MicrogameDefinition;
use crate::schema::player::{Layer, OpinionDelta, PlayerId};
use crate::schema::scene::{ObjectId, Scene};

/// Director-assigned session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SessionError {
    #[error("session is not running")]
    NotRunning,
    #[error(transparent)]
    Clock(#[from] ClockError),
}

/// What the session's camera renders: one layer, into the owner's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    pub culling_mask: u32,
    pub target: Option<RenderTarget>,
}

#[derive(Debug)]
struct Binding {
    owner: PlayerId,
    layer: Layer,
    clock: Clock,
    viewport: Option<ViewportSlot>,
    hud: PlayerHud,
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    definition: MicrogameDefinition,
    scene: Scene,
    partition: PartitionTable,
    state: SessionState,
    binding: Option<Binding>,
    /// Time added before the clock exists.
    pending_extension: Seconds,
}

impl Session {
    pub fn new(id: SessionId, definition: MicrogameDefinition, scene: Scene) -> Self {
        Self {
            id,
            definition,
            scene,
            partition: PartitionTable::new(),
            state: SessionState::Idle,
            binding: None,
            pending_extension: 0.0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.binding.as_ref().map(|b| b.owner)
    }

    pub fn definition(&self) -> &MicrogameDefinition {
        &self.definition
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn partition(&self) -> &PartitionTable {
        &self.partition
    }

    pub fn elapsed(&self, now: Timestamp) -> Option<Seconds> {
        self.binding.as_ref().map(|b| b.clock.elapsed(now))
    }

    pub fn remaining(&self, now: Timestamp) -> Option<Seconds> {
        self.binding.as_ref().map(|b| b.clock.remaining(now))
    }

    /// The camera while running. `None` before start and after end.
    pub fn camera(&self) -> Option<Camera> {
        let binding = self.binding.as_ref()?;
        let viewport = binding.viewport.as_ref()?;
        Some(Camera {
            culling_mask: binding.layer.mask(),
            target: viewport.current(),
        })
    }

    /// Assign `owner` and start the clock.
    ///
    /// Returns `false` without touching anything if the session already has
    /// an owner.
    pub fn start(
        &mut self,
        owner: &Player,
        layer: Layer,
        now: Timestamp,
        ctx: &mut SessionContext<'_>,
    ) -> bool {
        if self.state != SessionState::Idle {
            debug!(
                session = self.id.0,
                requested = %owner.id,
                "start ignored, session already owned"
            );
            return false;
        }

        let mut clock = Clock::start(now, self.definition.initial_duration);
        clock.extend(self.pending_extension);
        self.pending_extension = 0.0;

        self.partition
            .assign_all(self.scene.objects.iter().copied(), layer);
        owner.hud.set_title(&self.definition.display_name);
        owner.hud.set_time_remaining(countdown_label(clock.remaining(now)));

        self.binding = Some(Binding {
            owner: owner.id,
            layer,
            clock,
            viewport: Some(owner.viewport.clone()),
            hud: owner.hud.clone(),
        });
        self.state = SessionState::Running;

        ctx.movement.suspend_movement(owner.id);
        ctx.registry.register_session(owner.id, self.id);
        ctx.notifier.notify(SessionNotification::Started {
            session: self.id,
            owner: owner.id,
            event: self.definition.on_start.clone(),
        });

        info!(
            session = self.id.0,
            owner = %owner.id,
            microgame = %self.definition.id,
            duration = self.definition.initial_duration,
            objects = self.scene.objects.len(),
            "microgame started"
        );
        true
    }

    /// Bring an object spawned at runtime into this session's scene.
    pub fn adopt_object(&mut self, object: ObjectId) {
        match (&self.state, &self.binding) {
            (SessionState::Ended, _) => {
                warn!(
                    session = self.id.0,
                    object = object.0,
                    "object adopted after end, ignored"
                );
            }
            (SessionState::Running, Some(binding)) => {
                self.scene.objects.push(object);
                self.partition.assign(object, binding.layer);
            }
            _ => self.scene.objects.push(object),
        }
    }

    /// Add `seconds` to the clock. Before start the time is held and applied
    /// when the clock starts.
    pub fn extend(&mut self, seconds: Seconds) {
        match (&self.state, self.binding.as_mut()) {
            (SessionState::Running, Some(binding)) => binding.clock.extend(seconds),
            (SessionState::Idle, _) => self.pending_extension += seconds,
            _ => warn!(session = self.id.0, seconds, "extend after end, ignored"),
        }
    }

    pub fn set_time_scale(&mut self, now: Timestamp, scale: f64) -> Result<(), SessionError> {
        match (&self.state, self.binding.as_mut()) {
            (SessionState::Running, Some(binding)) => {
                binding.clock.set_scale(now, scale)?;
                debug!(session = self.id.0, scale, "time scale changed");
                Ok(())
            }
            _ => Err(SessionError::NotRunning),
        }
    }

    /// Per-frame update. Refreshes the countdown label and ends the session
    /// with the definition's timeout outcome once the clock runs out.
    ///
    /// Returns `Some(won)` if the session ended during this tick.
    pub fn tick(&mut self, now: Timestamp, ctx: &mut SessionContext<'_>) -> Option<bool> {
        if self.state != SessionState::Running {
            return None;
        }
        let binding = self.binding.as_ref()?;
        let remaining = binding.clock.remaining(now);
        binding.hud.set_time_remaining(countdown_label(remaining));

        if remaining <= 0.0 {
            let won = self.definition.win_on_timeout;
            debug!(session = self.id.0, won, "microgame timed out");
            self.end(won, ctx);
            return Some(won);
        }
        None
    }

    /// Finish the session with outcome `won`.
    ///
    /// Only the first call does anything; later calls log a warning and
    /// return `false`. The scene unload is requested last and completes in
    /// the background.
    pub fn end(&mut self, won: bool, ctx: &mut SessionContext<'_>) -> bool {
        if self.state != SessionState::Running {
            warn!(session = self.id.0, state = ?self.state, won, "end ignored");
            return false;
        }
        let Some(binding) = self.binding.as_mut() else {
            return false;
        };
        self.state = SessionState::Ended;
        let owner = binding.owner;

        ctx.movement.restore_simulation(owner);
        ctx.feedback.notify_outcome(owner, won);

        match ctx.opinion.conversation_partner(owner) {
            Some(npc) => {
                ctx.opinion
                    .adjust_opinion(npc, owner.opinion_target(), OpinionDelta::from_outcome(won));
            }
            None => debug!(%owner, "no conversation partner, opinion unchanged"),
        }

        ctx.movement.restore_movement(owner);
        ctx.registry.deregister_session(owner, self.id, won);
        ctx.notifier.notify(SessionNotification::Ended {
            session: self.id,
            owner,
            won,
            event: self.definition.on_end.clone(),
        });

        // The camera stops reading the owner's target.
        binding.viewport = None;

        let scene = self.scene.id;
        let loaded = binding.hud.loaded_flag();
        ctx.unloader.unload(
            scene,
            Box::new(move |result| {
                if let Err(e) = result {
                    error!(error = %e, "microgame scene unload failed");
                }
                if !loaded.clear() {
                    debug!(scene = scene.0, "unload finished after owner HUD was dropped");
                }
            }),
        );

        info!(session = self.id.0, %owner, won, "microgame ended");
        true
    }
}

/// Whole seconds left, rounded up.
fn countdown_label(remaining: Seconds) -> String {
    format!("{:.0}", remaining.ceil())
}
