#![forbid(unsafe_code)]

//! Cards: navigable units wrapping externally supplied content.
//!
//! A [`Card`] is a cheap-clone handle. Groups, running transitions, the scene
//! and the history list all hold the same card; it lives while any of them
//! does.
//!
//! Each card owns a three-state vertical layout ([`CardState`]) and a cached
//! [`Snapshot`] of its content used as the drag overlay.
//!
//! # Invariants
//!
//! 1. The snapshot is never read stale: every layout or content change marks
//!    it stale and [`Card::snapshot`] refreshes before returning.
//! 2. `navigate(state, false)` updates frame and state before returning.
//! 3. `navigate(state, true)` updates the frame every tick and the state only
//!    when the spring settles.
//!
//! # Failure Modes
//!
//! - Content whose `capture` returns `None` leaves the card without a
//!   snapshot; a drag cannot start on it.
//! - A content change notification that arrives while the card is mid-update
//!   is downgraded to a stale mark and refreshed on next read.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cardstack_core::Rect;
use cardstack_core::animation::Animation;
use cardstack_core::animation::spring::{Spring, presets};

use crate::config::LayoutConfig;

// ---------------------------------------------------------------------------
// Identity and content contract
// ---------------------------------------------------------------------------

static NEXT_CARD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique card identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(u64);

impl CardId {
    fn next() -> Self {
        Self(NEXT_CARD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// An opaque captured image of card content.
///
/// The byte encoding is agreed between the content and the renderer; the
/// engine only moves it around.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pub width: f64,
    pub height: f64,
    pub data: Rc<[u8]>,
}

impl Bitmap {
    /// Create a bitmap.
    #[must_use]
    pub fn new(width: f64, height: f64, data: impl Into<Rc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }
}

/// Callback content invokes when its visuals change.
pub type ChangeListener = Box<dyn Fn()>;

/// Shared content reference.
pub type ContentRef = Rc<dyn CardContent>;

/// What a card needs from the content it wraps.
pub trait CardContent {
    /// Capture `region` (card-local coordinates) as a bitmap.
    fn capture(&self, region: Rect) -> Option<Bitmap>;

    /// Install (or clear) the change callback. Content calls it whenever its
    /// visuals change so the card can refresh its snapshot.
    fn set_change_listener(&self, listener: Option<ChangeListener>);

    /// Whether the content has an inner scroll region whose drags should
    /// move the card between layout states.
    fn inner_scroll(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// State and snapshot
// ---------------------------------------------------------------------------

/// Vertical layout position of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardState {
    /// Near the bottom, leaving a peek strip.
    Minimized,
    /// Mid-viewport resting position.
    #[default]
    Stack,
    /// Near the top, almost full screen.
    Expanded,
}

/// A captured snapshot and where it was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub bitmap: Bitmap,
    /// Card frame at capture time.
    pub frame: Rect,
    /// Card-local region that was captured.
    pub region: Rect,
    /// Increments on every capture of this card.
    pub generation: u64,
}

impl Snapshot {
    /// Where the snapshot sits on screen when the card is at rest.
    #[must_use]
    pub fn screen_rect(&self) -> Rect {
        Rect::new(
            self.frame.x,
            self.frame.y,
            self.region.width,
            self.region.height,
        )
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Motion {
    target: CardState,
    from_y: f64,
    to_y: f64,
    spring: Spring,
}

#[derive(Debug, Default)]
struct ScrollTracking {
    dragging: bool,
}

#[derive(Debug)]
struct CardEntity {
    state: CardState,
    bounds: Rect,
    frame: Rect,
    layout: LayoutConfig,
    motion: Option<Motion>,
    snapshot: Option<Snapshot>,
    generation: u64,
    scroll: ScrollTracking,
}

struct CardInner {
    id: CardId,
    content: ContentRef,
    stale: Cell<bool>,
    entity: RefCell<CardEntity>,
}

impl Drop for CardInner {
    fn drop(&mut self) {
        self.content.set_change_listener(None);
    }
}

/// Handle to a card. Clones share the same card.
pub struct Card {
    inner: Rc<CardInner>,
}

// Manual Clone: shares the same Rc.
impl Clone for Card {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Card {}

impl std::fmt::Debug for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entity = self.inner.entity.try_borrow();
        let mut d = f.debug_struct("Card");
        d.field("id", &self.inner.id);
        if let Ok(e) = entity {
            d.field("state", &e.state).field("frame", &e.frame);
        }
        d.finish_non_exhaustive()
    }
}

impl Card {
    /// Wrap `content` in a card resting in `state`.
    ///
    /// Registers a change listener on the content; the listener only holds a
    /// weak reference to the card.
    #[must_use]
    pub fn new(content: ContentRef, state: CardState, layout: LayoutConfig) -> Self {
        let card = Self {
            inner: Rc::new(CardInner {
                id: CardId::next(),
                content,
                stale: Cell::new(true),
                entity: RefCell::new(CardEntity {
                    state,
                    bounds: Rect::default(),
                    frame: Rect::default(),
                    layout,
                    motion: None,
                    snapshot: None,
                    generation: 0,
                    scroll: ScrollTracking::default(),
                }),
            }),
        };
        let weak: Weak<CardInner> = Rc::downgrade(&card.inner);
        card.inner
            .content
            .set_change_listener(Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Card { inner }.content_did_change();
                }
            })));
        card
    }

    /// Identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CardId {
        self.inner.id
    }

    /// The wrapped content.
    #[must_use]
    pub fn content(&self) -> &ContentRef {
        &self.inner.content
    }

    /// Current layout state. While an animated navigate is in flight this is
    /// still the state being left.
    #[must_use]
    pub fn state(&self) -> CardState {
        self.inner.entity.borrow().state
    }

    /// Destination of an in-flight animated navigate.
    #[must_use]
    pub fn target_state(&self) -> Option<CardState> {
        self.inner.entity.borrow().motion.as_ref().map(|m| m.target)
    }

    /// Current frame in container coordinates.
    #[must_use]
    pub fn frame(&self) -> Rect {
        self.inner.entity.borrow().frame
    }

    /// Container bounds used for layout.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.inner.entity.borrow().bounds
    }

    /// Whether an animated navigate is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.inner.entity.borrow().motion.is_some()
    }

    /// Relayout for new container bounds.
    pub fn set_bounds(&self, bounds: Rect) {
        {
            let mut e = self.inner.entity.borrow_mut();
            e.bounds = bounds;
            e.motion = None;
            e.frame = e.layout.frame(e.state, bounds);
        }
        self.mark_stale();
    }

    /// Move to `to`. See the module invariants for the animated case.
    pub fn navigate(&self, to: CardState, animated: bool) {
        let mut e = self.inner.entity.borrow_mut();
        let to_y = e.layout.origin(to, e.bounds);
        if animated {
            let from_y = e.frame.y;
            let spring = presets::card_settle(from_y, to_y);
            if spring.is_complete() {
                e.motion = None;
                e.state = to;
                e.frame = e.frame.with_y(to_y);
            } else {
                e.motion = Some(Motion {
                    target: to,
                    from_y,
                    to_y,
                    spring,
                });
            }
        } else {
            e.motion = None;
            e.state = to;
            e.frame = e.layout.frame(to, e.bounds);
        }
        drop(e);
        self.mark_stale();
        tracing::debug!(target: "cardstack.card", card = %self.id(), state = ?to, animated, "navigate");
    }

    /// Advance an in-flight navigate. Returns `true` while still animating.
    pub fn tick(&self, dt: Duration) -> bool {
        let mut e = self.inner.entity.borrow_mut();
        let Some(motion) = e.motion.as_mut() else {
            return false;
        };
        motion.spring.tick(dt);
        let y = motion.from_y + (motion.to_y - motion.from_y) * motion.spring.value();
        let done = motion.spring.is_complete();
        let target = motion.target;
        e.frame = e.frame.with_y(y);
        if done {
            e.motion = None;
            e.state = target;
            e.frame = e.layout.frame(target, e.bounds);
        }
        drop(e);
        self.mark_stale();
        !done
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// Whether the cached snapshot is out of date.
    #[must_use]
    pub fn is_snapshot_stale(&self) -> bool {
        self.inner.stale.get()
    }

    /// Mark the cached snapshot out of date.
    pub fn mark_stale(&self) {
        self.inner.stale.set(true);
    }

    /// Recompute the frame for the current state and capture a snapshot of
    /// the region visible in the stack state.
    ///
    /// Returns `false` if the content could not be captured; the previous
    /// snapshot is kept in that case.
    pub fn refresh_snapshot(&self) -> bool {
        let (frame, region) = {
            let mut e = self.inner.entity.borrow_mut();
            if e.motion.is_none() {
                e.frame = e.layout.frame(e.state, e.bounds);
            }
            let height = e.layout.snapshot_height(e.bounds);
            (e.frame, Rect::from_size(e.frame.width, height))
        };

        let Some(bitmap) = self.inner.content.capture(region) else {
            tracing::warn!(target: "cardstack.card", card = %self.id(), "content capture failed");
            return false;
        };

        let mut e = self.inner.entity.borrow_mut();
        e.generation += 1;
        let generation = e.generation;
        e.snapshot = Some(Snapshot {
            bitmap,
            frame,
            region,
            generation,
        });
        self.inner.stale.set(false);
        tracing::trace!(target: "cardstack.card", card = %self.id(), generation, "snapshot refreshed");
        true
    }

    /// The snapshot, refreshed first if stale.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        if self.is_snapshot_stale() {
            self.refresh_snapshot();
        }
        self.inner.entity.borrow().snapshot.clone()
    }

    /// Number of captures taken so far.
    #[must_use]
    pub fn snapshot_generation(&self) -> u64 {
        self.inner.entity.borrow().generation
    }

    fn content_did_change(&self) {
        // The notification may arrive while this card is already borrowed
        // (content changed in response to a layout call).
        if self.inner.entity.try_borrow_mut().is_ok() {
            self.refresh_snapshot();
        } else {
            self.mark_stale();
        }
    }

    // -----------------------------------------------------------------------
    // Inner scroll pass-through
    // -----------------------------------------------------------------------

    /// The content's inner scroll view started a drag.
    pub fn inner_scroll_will_begin(&self) {
        if !self.inner.content.inner_scroll() {
            return;
        }
        let mut e = self.inner.entity.borrow_mut();
        e.scroll.dragging = true;
        e.motion = None;
    }

    /// The inner scroll view moved to `offset` (positive scrolls content up).
    ///
    /// Returns the offset the content should use: the card absorbs movement
    /// until it reaches the expanded origin, then the content scrolls.
    pub fn inner_scroll_did_scroll(&self, offset: f64) -> f64 {
        let mut e = self.inner.entity.borrow_mut();
        if !e.scroll.dragging {
            return offset;
        }
        let expanded = e.layout.origin(CardState::Expanded, e.bounds);
        let absorbed = if offset < 0.0 {
            let y = e.frame.y + offset.abs();
            e.frame = e.frame.with_y(y);
            true
        } else if e.frame.y > expanded {
            let y = e.frame.y - offset;
            e.frame = e.frame.with_y(y);
            true
        } else {
            false
        };
        drop(e);
        if absorbed {
            self.mark_stale();
            0.0
        } else {
            offset
        }
    }

    /// The inner drag ended at `offset` with `velocity` (positive moves the
    /// card up). Picks the next state with a hysteresis buffer and navigates
    /// there. Returns `None` when the content is scrolled and keeps the drag.
    pub fn inner_scroll_will_end(&self, offset: f64, velocity: f64) -> Option<CardState> {
        let next = {
            let mut e = self.inner.entity.borrow_mut();
            if !e.scroll.dragging {
                return None;
            }
            e.scroll.dragging = false;
            if offset != 0.0 {
                return None;
            }
            let y = e.frame.y;
            let buffer = e.layout.hysteresis_buffer;
            let stack = e.layout.origin(CardState::Stack, e.bounds);
            let expanded = e.layout.origin(CardState::Expanded, e.bounds);
            let minimized = e.layout.origin(CardState::Minimized, e.bounds);
            next_state(e.state, y, velocity, buffer, stack, expanded, minimized)
        };
        self.navigate(next, true);
        Some(next)
    }
}

fn next_state(
    state: CardState,
    y: f64,
    velocity: f64,
    buffer: f64,
    stack: f64,
    expanded: f64,
    minimized: f64,
) -> CardState {
    match state {
        CardState::Minimized => {
            if y >= stack - buffer && velocity > 0.0 {
                CardState::Stack
            } else if velocity > 0.0 {
                CardState::Expanded
            } else {
                state
            }
        }
        CardState::Stack => {
            if y >= expanded - buffer && velocity > 0.0 {
                CardState::Expanded
            } else if y <= minimized + buffer && velocity < 0.0 {
                CardState::Minimized
            } else {
                state
            }
        }
        CardState::Expanded => {
            if y <= stack + buffer && velocity < 0.0 {
                CardState::Stack
            } else if y >= stack - buffer && velocity < 0.0 {
                CardState::Minimized
            } else {
                state
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
