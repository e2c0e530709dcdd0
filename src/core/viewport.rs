//! Per-player off-screen render targets.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewportError {
    #[error("viewport dimension must be positive, got {0}")]
    InvalidDimension(i32),
}

/// Size and depth of a square render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSpec {
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u8,
}

impl TargetSpec {
    pub fn square(dimension: u32, pixel_depth: u8) -> Self {
        Self {
            width: dimension,
            height: dimension,
            pixel_depth,
        }
    }
}

/// Opaque id of a backing render resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub u64);

/// A live render target: its backing handle and its size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub handle: TargetHandle,
    pub spec: TargetSpec,
}

impl RenderTarget {
    pub fn dimension(&self) -> u32 {
        self.spec.width
    }
}

/// Creates and frees backing render resources.
///
/// Targets are released explicitly; dropping a [`RenderTarget`] does not
/// free anything.
pub trait TargetAllocator {
    fn allocate(&mut self, spec: TargetSpec) -> TargetHandle;
    fn release(&mut self, handle: TargetHandle);
}

/// Target edge length for a player's microgame area: the UI sizer plus half
/// the screen width, floored.
pub fn resolve(layout_size: i32, display_width: i32) -> i32 {
    layout_size + display_width.div_euclid(2)
}

#[derive(Debug)]
struct SlotState {
    target: Option<RenderTarget>,
    pixel_depth: u8,
}

/// Shared, replaceable binding to one player's current render target.
#[derive(Debug, Clone)]
pub struct ViewportSlot {
    inner: Rc<RefCell<SlotState>>,
}

impl ViewportSlot {
    pub fn new(pixel_depth: u8) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SlotState {
                target: None,
                pixel_depth,
            })),
        }
    }

    /// The target readers should render into right now.
    pub fn current(&self) -> Option<RenderTarget> {
        self.inner.borrow().target
    }

    pub fn current_dimension(&self) -> Option<u32> {
        self.current().map(|t| t.dimension())
    }

    /// Make sure the bound target is `dimension` square.
    ///
    /// Returns `Ok(true)` if a new target was allocated. The old target is
    /// released after the new one is bound, so no reader can observe a
    /// released handle.
    pub fn ensure_sized(
        &self,
        dimension: i32,
        allocator: &mut dyn TargetAllocator,
    ) -> Result<bool, ViewportError> {
        let size = u32::try_from(dimension)
            .ok()
            .filter(|&d| d > 0)
            .ok_or(ViewportError::InvalidDimension(dimension))?;

        let mut state = self.inner.borrow_mut();
        if state.target.map(|t| t.dimension()) == Some(size) {
            return Ok(false);
        }

        let spec = TargetSpec::square(size, state.pixel_depth);
        let handle = allocator.allocate(spec);
        let previous = state.target.replace(RenderTarget { handle, spec });
        if let Some(old) = previous {
            allocator.release(old.handle);
        }
        debug!(
            dimension = size,
            handle = handle.0,
            replaced = previous.is_some(),
            "viewport target rebuilt"
        );
        Ok(true)
    }

    /// Release the bound target, leaving the slot empty.
    pub fn release(&self, allocator: &mut dyn TargetAllocator) {
        if let Some(old) = self.inner.borrow_mut().target.take() {
            allocator.release(old.handle);
        }
    }

    /// True if both handles point at the same slot.
    pub fn shares_with(&self, other: &ViewportSlot) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Allocator that hands out sequential handles and tracks what is live.
///
/// Used by headless runs and tests in place of a GPU backend.
#[derive(Debug, Default)]
pub struct MemoryAllocator {
    next_handle: u64,
    live: FxHashMap<TargetHandle, TargetSpec>,
    pub allocations: Vec<TargetSpec>,
    pub releases: Vec<TargetHandle>,
}

impl MemoryAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self, handle: TargetHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl TargetAllocator for MemoryAllocator {
    fn allocate(&mut self, spec: TargetSpec) -> TargetHandle {
        self.next_handle += 1;
        let handle = TargetHandle(self.next_handle);
        self.live.insert(handle, spec);
        self.allocations.push(spec);
        handle
    }

    fn release(&mut self, handle: TargetHandle) {
        self.live.remove(&handle);
        self.releases.push(handle);
    }
}
