//! Director integration tests: full session lifecycles across both players.

use std::cell::RefCell;
use std::rc::Rc;

use microgame_runtime::core::collaborators::SharedDisplay;
use microgame_runtime::core::director::{Director, DirectorError, Record, SessionOutcome};
use microgame_runtime::core::recorder::{Call, Recorder};
use microgame_runtime::core::session::SessionState;
use microgame_runtime::core::viewport::{
    MemoryAllocator, TargetAllocator, TargetHandle, TargetSpec, ViewportError,
};
use microgame_runtime::schema::microgame::{MicrogameDefinition, RuntimeConfig};
use microgame_runtime::schema::player::{NpcId, OpinionTarget, PlayerId};
use microgame_runtime::schema::scene::{ObjectId, Scene, SceneId};

/// Lets the test inspect the allocator after handing it to the director.
#[derive(Clone, Default)]
struct SharedAllocator(Rc<RefCell<MemoryAllocator>>);

impl TargetAllocator for SharedAllocator {
    fn allocate(&mut self, spec: TargetSpec) -> TargetHandle {
        self.0.borrow_mut().allocate(spec)
    }

    fn release(&mut self, handle: TargetHandle) {
        self.0.borrow_mut().release(handle)
    }
}

struct Fixture {
    director: Director,
    recorder: Recorder,
    allocator: SharedAllocator,
    display: SharedDisplay,
}

fn fixture(display_width: i32) -> Fixture {
    let recorder = Recorder::new()
        .with_partner(PlayerId::One, NpcId(11))
        .with_partner(PlayerId::Two, NpcId(12));
    let allocator = SharedAllocator::default();
    let display = SharedDisplay::new(display_width);
    let director = Director::new(
        RuntimeConfig::default(),
        recorder.collaborators(),
        Box::new(allocator.clone()),
        Box::new(display.clone()),
    );
    Fixture {
        director,
        recorder,
        allocator,
        display,
    }
}

fn microgame(duration: f64, win_on_timeout: bool) -> MicrogameDefinition {
    MicrogameDefinition {
        initial_duration: duration,
        display_name: "Dodge!".to_string(),
        win_on_timeout,
        ..MicrogameDefinition::new("dodge")
    }
}

fn scene(id: u64) -> Scene {
    Scene::new(SceneId(id), [ObjectId(id * 10), ObjectId(id * 10 + 1)])
}

#[test]
fn timeout_win_raises_opinion_and_clears_registry() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 100).unwrap();
    let id = f.director.load_session(microgame(3.0, true), scene(1));

    assert!(f.director.start_session(id, PlayerId::One, 0.0).unwrap());
    assert!(f.director.is_playing(PlayerId::One));
    let hud = f.director.player(PlayerId::One).unwrap().hud.clone();
    assert_eq!(hud.title(), "Dodge!");
    assert!(hud.is_loaded());

    assert!(f.director.tick(1.0).unwrap().is_empty());
    assert_eq!(hud.time_remaining(), "2");

    let outcomes = f.director.tick(3.0).unwrap();
    assert_eq!(
        outcomes,
        vec![SessionOutcome {
            session: id,
            owner: PlayerId::One,
            won: true,
        }]
    );
    assert!(f
        .recorder
        .calls()
        .contains(&Call::AdjustOpinion(NpcId(11), OpinionTarget(1), 1)));
    assert!(!f.director.is_playing(PlayerId::One));
    assert!(f.director.session(id).is_none());
    assert_eq!(f.director.record(PlayerId::One), Record { wins: 1, losses: 0 });

    // The panel stays up until the scene has actually unloaded.
    assert!(hud.is_loaded());
    assert_eq!(f.recorder.complete_unloads(Ok(())), 1);
    assert!(!hud.is_loaded());
}

#[test]
fn explicit_loss_for_player_two() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::Two, 100).unwrap();
    let id = f.director.load_session(microgame(10.0, true), scene(2));
    f.director.start_session(id, PlayerId::Two, 0.0).unwrap();

    assert!(f.director.end_session(id, false).unwrap());
    assert!(f
        .recorder
        .calls()
        .contains(&Call::AdjustOpinion(NpcId(12), OpinionTarget(2), -1)));
    assert_eq!(f.director.record(PlayerId::Two), Record { wins: 0, losses: 1 });
    assert!(f.director.tick(20.0).unwrap().is_empty());
    assert!(matches!(
        f.director.end_session(id, true),
        Err(DirectorError::UnknownSession(_))
    ));
}

#[test]
fn second_owner_cannot_take_a_started_session() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 0).unwrap();
    f.director.register_player(PlayerId::Two, 0).unwrap();
    let id = f.director.load_session(microgame(5.0, true), scene(1));

    assert!(f.director.start_session(id, PlayerId::One, 0.0).unwrap());
    assert!(!f.director.start_session(id, PlayerId::Two, 0.5).unwrap());
    let session = f.director.session(id).unwrap();
    assert_eq!(session.owner(), Some(PlayerId::One));
    assert_eq!(session.state(), SessionState::Running);
    assert!(!f.director.is_playing(PlayerId::Two));
}

#[test]
fn busy_owner_cannot_start_another_session() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 0).unwrap();
    let first = f.director.load_session(microgame(5.0, true), scene(1));
    let second = f.director.load_session(microgame(5.0, true), scene(2));
    f.director.start_session(first, PlayerId::One, 0.0).unwrap();

    let err = f
        .director
        .start_session(second, PlayerId::One, 1.0)
        .unwrap_err();
    assert!(matches!(
        err,
        DirectorError::OwnerBusy { owner: PlayerId::One, session } if session == first
    ));
    assert_eq!(f.director.session(second).unwrap().state(), SessionState::Idle);
}

#[test]
fn both_players_play_side_by_side_on_separate_layers() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 0).unwrap();
    f.director.register_player(PlayerId::Two, 0).unwrap();
    let a = f.director.load_session(microgame(2.0, true), scene(1));
    let b = f.director.load_session(microgame(4.0, false), scene(2));
    f.director.start_session(a, PlayerId::One, 0.0).unwrap();
    f.director.start_session(b, PlayerId::Two, 0.0).unwrap();

    let cam_a = f.director.session(a).unwrap().camera().unwrap();
    let cam_b = f.director.session(b).unwrap().camera().unwrap();
    assert_eq!(cam_a.culling_mask, 1 << 8);
    assert_eq!(cam_b.culling_mask, 1 << 9);
    assert_ne!(cam_a.target, cam_b.target);

    let outcomes = f.director.tick(2.0).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].owner, PlayerId::One);
    assert!(f.director.is_playing(PlayerId::Two));

    let outcomes = f.director.tick(4.0).unwrap();
    assert_eq!(
        outcomes,
        vec![SessionOutcome {
            session: b,
            owner: PlayerId::Two,
            won: false,
        }]
    );
}

#[test]
fn paused_session_does_not_time_out() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 0).unwrap();
    let id = f.director.load_session(microgame(3.0, true), scene(1));
    f.director.start_session(id, PlayerId::One, 0.0).unwrap();

    f.director.set_time_scale(id, 1.0, 0.0).unwrap();
    assert!(f.director.tick(100.0).unwrap().is_empty());
    assert_eq!(f.director.session(id).unwrap().remaining(100.0), Some(2.0));

    f.director.set_time_scale(id, 100.0, 1.0).unwrap();
    f.director.extend_session(id, 1.0).unwrap();
    assert!(f.director.tick(102.5).unwrap().is_empty());
    assert_eq!(f.director.tick(103.0).unwrap().len(), 1);
}

#[test]
fn viewport_follows_display_width() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 100).unwrap();
    let slot = f.director.player(PlayerId::One).unwrap().viewport.clone();
    assert_eq!(slot.current_dimension(), Some(500));
    let first = slot.current().unwrap().handle;

    f.director.tick(0.0).unwrap();
    assert_eq!(f.allocator.0.borrow().allocations.len(), 1);

    f.display.set_width(600);
    f.director.tick(0.1).unwrap();
    assert_eq!(slot.current_dimension(), Some(400));

    let alloc = f.allocator.0.borrow();
    assert_eq!(alloc.releases, vec![first]);
    assert_eq!(alloc.live_count(), 1);
    assert_eq!(alloc.allocations[1], TargetSpec::square(400, 24));
}

#[test]
fn running_session_camera_sees_resized_target() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 100).unwrap();
    let id = f.director.load_session(microgame(5.0, true), scene(1));
    f.director.start_session(id, PlayerId::One, 0.0).unwrap();

    f.display.set_width(1000);
    f.director.tick(0.5).unwrap();
    let camera = f.director.session(id).unwrap().camera().unwrap();
    assert_eq!(camera.target.unwrap().dimension(), 600);
    assert!(f.allocator.0.borrow().is_live(camera.target.unwrap().handle));
}

#[test]
fn non_positive_viewport_is_fatal() {
    let mut f = fixture(0);
    let err = f.director.register_player(PlayerId::One, 0).unwrap_err();
    assert!(matches!(
        err,
        DirectorError::Viewport(ViewportError::InvalidDimension(0))
    ));
    assert!(f.director.player(PlayerId::One).is_none());

    f.display.set_width(800);
    f.director.register_player(PlayerId::One, 0).unwrap();
    f.display.set_width(-10);
    assert!(matches!(
        f.director.tick(1.0),
        Err(DirectorError::Viewport(ViewportError::InvalidDimension(-5)))
    ));
}

#[test]
fn remove_player_releases_target() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::One, 0).unwrap();
    let id = f.director.load_session(microgame(5.0, true), scene(1));
    f.director.start_session(id, PlayerId::One, 0.0).unwrap();

    assert!(matches!(
        f.director.remove_player(PlayerId::One),
        Err(DirectorError::OwnerBusy { .. })
    ));
    f.director.end_session(id, true).unwrap();
    f.director.remove_player(PlayerId::One).unwrap();
    assert_eq!(f.allocator.0.borrow().live_count(), 0);
    assert!(matches!(
        f.director.remove_player(PlayerId::One),
        Err(DirectorError::UnknownPlayer(PlayerId::One))
    ));
}

#[test]
fn dropping_director_releases_every_target() {
    let f = fixture(800);
    let Fixture {
        mut director,
        allocator,
        ..
    } = f;
    director.register_player(PlayerId::One, 0).unwrap();
    director.register_player(PlayerId::Two, 0).unwrap();
    assert_eq!(allocator.0.borrow().live_count(), 2);
    drop(director);
    assert_eq!(allocator.0.borrow().live_count(), 0);
}

#[test]
fn objects_spawned_mid_game_join_owner_layer() {
    let mut f = fixture(800);
    f.director.register_player(PlayerId::Two, 0).unwrap();
    let id = f.director.load_session(microgame(5.0, true), scene(3));
    f.director.start_session(id, PlayerId::Two, 0.0).unwrap();
    f.director.adopt_object(id, ObjectId(99)).unwrap();

    let session = f.director.session(id).unwrap();
    let layer = f.director.config().layer_for(PlayerId::Two);
    assert_eq!(
        session.partition().objects_on(layer),
        vec![ObjectId(30), ObjectId(31), ObjectId(99)]
    );
}

#[test]
fn camera_on_unaddressable_layer_has_empty_mask() {
    let recorder = Recorder::default();
    let config = RuntimeConfig {
        player_one_layer: 40,
        ..RuntimeConfig::default()
    };
    assert!(config.validate().is_err());
    let mut director = Director::new(
        config,
        recorder.collaborators(),
        Box::new(MemoryAllocator::new()),
        Box::new(SharedDisplay::new(800)),
    );
    director.register_player(PlayerId::One, 0).unwrap();
    let id = director.load_session(microgame(5.0, true), scene(1));
    director.start_session(id, PlayerId::One, 0.0).unwrap();

    let camera = director.session(id).unwrap().camera().unwrap();
    assert_eq!(camera.culling_mask, 0);
}
