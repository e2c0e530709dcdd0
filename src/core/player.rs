//! Player slots: layout, render target and HUD bindings.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::viewport::{self, TargetAllocator, ViewportError, ViewportSlot};
use crate::schema::player::PlayerId;

#[derive(Debug, Default)]
struct HudState {
    title: RefCell<String>,
    time_remaining: RefCell<String>,
    loaded: Cell<bool>,
}

/// Text and flags shown in a player's half of the screen.
///
/// Cloning shares the same state. Background tasks hold a [`HudFlag`]
/// instead so they never keep a player's HUD alive.
#[derive(Debug, Clone, Default)]
pub struct PlayerHud {
    state: Rc<HudState>,
}

impl PlayerHud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> String {
        self.state.title.borrow().clone()
    }

    pub fn set_title(&self, title: &str) {
        *self.state.title.borrow_mut() = title.to_string();
    }

    pub fn time_remaining(&self) -> String {
        self.state.time_remaining.borrow().clone()
    }

    pub fn set_time_remaining(&self, label: String) {
        *self.state.time_remaining.borrow_mut() = label;
    }

    /// Whether the microgame panel is shown as loaded.
    pub fn is_loaded(&self) -> bool {
        self.state.loaded.get()
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.state.loaded.set(loaded);
    }

    pub fn loaded_flag(&self) -> HudFlag {
        HudFlag {
            state: Rc::downgrade(&self.state),
        }
    }
}

/// Weak handle to a HUD's "loaded" flag.
#[derive(Debug, Clone)]
pub struct HudFlag {
    state: Weak<HudState>,
}

impl HudFlag {
    /// Clear the flag. Returns `false` if the HUD no longer exists.
    pub fn clear(&self) -> bool {
        match self.state.upgrade() {
            Some(state) => {
                state.loaded.set(false);
                true
            }
            None => false,
        }
    }
}

/// One registered player slot.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    /// Extra pixels the UI sizer adds on top of half the screen width.
    pub layout_size: i32,
    pub viewport: ViewportSlot,
    pub hud: PlayerHud,
}

impl Player {
    pub fn new(id: PlayerId, layout_size: i32, pixel_depth: u8) -> Self {
        Self {
            id,
            layout_size,
            viewport: ViewportSlot::new(pixel_depth),
            hud: PlayerHud::new(),
        }
    }

    /// Resize this player's target to match the current display width.
    pub fn refresh_viewport(
        &self,
        display_width: i32,
        allocator: &mut dyn TargetAllocator,
    ) -> Result<bool, ViewportError> {
        let dimension = viewport::resolve(self.layout_size, display_width);
        self.viewport.ensure_sized(dimension, allocator)
    }
}
