#![forbid(unsafe_code)]

//! Deterministic fakes and drivers for exercising `cardstack-runtime`
//! without a renderer.
//!
//! # Role in cardstack
//! Tests build stacks out of [`SolidContent`] cards, feed them scripted
//! pages through [`scripted_loader`], drag with [`DragDriver`], and read
//! back `tracing` output with [`LogCapture`].
//!
//! Cards carry a numeric tag in their captured bitmap; [`card_tag`] reads
//! it back so tests can assert deck order without downcasting content.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cardstack_core::{PanEvent, PanPhase, Point, Rect, TouchEvent};
use cardstack_runtime::{
    Bitmap, Card, CardContent, CardStack, CardState, ChangeListener, ContentRef, FixedSource,
    LayoutConfig, NavigationError, PaginatedLoader, Release, SimulatedSource,
};
use tracing_subscriber::layer::SubscriberExt;
use web_time::Instant;

/// One 60 Hz frame.
pub const FRAME: Duration = Duration::from_millis(16);

/// A phone-sized container.
pub const PHONE: Rect = Rect::from_size(375.0, 812.0);

/// Tag used by [`loading_card`].
pub const LOADING_TAG: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Flat-colour content. The colour doubles as the card's tag.
#[derive(Default)]
pub struct SolidContent {
    color: Cell<u32>,
    inner_scroll: bool,
    captures: Cell<u32>,
    listener: RefCell<Option<ChangeListener>>,
}

impl std::fmt::Debug for SolidContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolidContent")
            .field("color", &self.color.get())
            .field("inner_scroll", &self.inner_scroll)
            .field("captures", &self.captures.get())
            .finish_non_exhaustive()
    }
}

impl SolidContent {
    #[must_use]
    pub fn new(color: u32) -> Rc<Self> {
        Rc::new(Self {
            color: Cell::new(color),
            ..Self::default()
        })
    }

    /// Content that reports an inner scroll region.
    #[must_use]
    pub fn scrollable(color: u32) -> Rc<Self> {
        Rc::new(Self {
            color: Cell::new(color),
            inner_scroll: true,
            ..Self::default()
        })
    }

    /// Repaint in `color` and notify the owning card.
    pub fn poke(&self, color: u32) {
        self.color.set(color);
        if let Some(listener) = self.listener.borrow().as_ref() {
            listener();
        }
    }

    #[must_use]
    pub fn color(&self) -> u32 {
        self.color.get()
    }

    /// How many times a snapshot was captured.
    #[must_use]
    pub fn captures(&self) -> u32 {
        self.captures.get()
    }
}

impl CardContent for SolidContent {
    fn capture(&self, region: Rect) -> Option<Bitmap> {
        self.captures.set(self.captures.get() + 1);
        Some(Bitmap::new(
            region.width,
            region.height,
            self.color.get().to_le_bytes().to_vec(),
        ))
    }

    fn set_change_listener(&self, listener: Option<ChangeListener>) {
        *self.listener.borrow_mut() = listener;
    }

    fn inner_scroll(&self) -> bool {
        self.inner_scroll
    }
}

/// Content that never produces a snapshot.
#[derive(Debug, Default)]
pub struct BlankContent;

impl CardContent for BlankContent {
    fn capture(&self, _region: Rect) -> Option<Bitmap> {
        None
    }

    fn set_change_listener(&self, _listener: Option<ChangeListener>) {}
}

// ---------------------------------------------------------------------------
// Cards and loaders
// ---------------------------------------------------------------------------

/// A resting card tagged `tag`.
#[must_use]
pub fn solid_card(tag: u32) -> Card {
    Card::new(SolidContent::new(tag), CardState::Stack, LayoutConfig::default())
}

/// Cards tagged `0..n`.
#[must_use]
pub fn solid_cards(n: u32) -> Vec<Card> {
    (0..n).map(solid_card).collect()
}

/// A placeholder card tagged [`LOADING_TAG`].
#[must_use]
pub fn loading_card() -> Card {
    solid_card(LOADING_TAG)
}

/// Contents tagged with `tags`, in order.
#[must_use]
pub fn contents(tags: &[u32]) -> Vec<ContentRef> {
    tags.iter()
        .map(|&tag| SolidContent::new(tag) as ContentRef)
        .collect()
}

/// A loader serving `pages` one per request, the last marked final.
#[must_use]
pub fn scripted_loader(pages: &[&[u32]]) -> PaginatedLoader {
    PaginatedLoader::new(FixedSource::new(
        pages.iter().map(|tags| contents(tags)).collect(),
    ))
}

/// A loader producing `per_page` cards per page after `delay`, tagged
/// `page * 100 + i`, without end.
#[must_use]
pub fn endless_loader(delay: Duration, per_page: u32) -> PaginatedLoader {
    PaginatedLoader::new(SimulatedSource::new(delay, move |page| {
        contents(&(0..per_page).map(|i| page * 100 + i).collect::<Vec<_>>())
    }))
}

/// The tag of `card`'s content, read back through a capture.
#[must_use]
pub fn card_tag(card: &Card) -> Option<u32> {
    let bitmap = card.content().capture(Rect::from_size(1.0, 1.0))?;
    let bytes: [u8; 4] = bitmap.data.get(..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Tags of `cards`, in order.
#[must_use]
pub fn tags(cards: &[Card]) -> Vec<u32> {
    cards.iter().filter_map(card_tag).collect()
}

// ---------------------------------------------------------------------------
// Driving
// ---------------------------------------------------------------------------

/// Tick until the stack settles. Returns the frames spent, or `None` if it
/// was still busy after `max_frames`.
pub fn settle(stack: &mut CardStack, max_frames: usize) -> Option<usize> {
    for frame in 1..=max_frames {
        stack.tick(FRAME);
        if stack.is_settled() {
            return Some(frame);
        }
    }
    None
}

/// Synthesizes horizontal drags as pan phases.
#[derive(Debug, Clone, Copy)]
pub struct DragDriver {
    /// Intermediate `Changed` events per drag.
    pub steps: u32,
    /// Vertical drift added to every event.
    pub drift: f64,
}

impl Default for DragDriver {
    fn default() -> Self {
        Self {
            steps: 8,
            drift: 0.0,
        }
    }
}

impl DragDriver {
    /// Drag by `fraction` of the container width (negative is left) and
    /// release. Returns what the release did, or the rejection at `Began`.
    pub fn drag(&self, stack: &mut CardStack, fraction: f64) -> Result<Option<Release>, NavigationError> {
        let total = fraction * stack.navigation().bounds().width;
        let steps = self.steps.max(1);
        let first = total / f64::from(steps);
        stack.handle_pan(self.event(PanPhase::Began, first))?;
        if !stack.queue().running().is_some_and(|op| op.is_interactive()) {
            return Ok(None);
        }
        for i in 2..=steps {
            stack.handle_pan(self.event(PanPhase::Changed, first * f64::from(i)))?;
        }
        stack.handle_pan(self.event(PanPhase::Ended, total))
    }

    /// [`drag`](Self::drag), then tick until settled.
    pub fn swipe(&self, stack: &mut CardStack, fraction: f64) -> Result<Option<Release>, NavigationError> {
        let release = self.drag(stack, fraction)?;
        settle(stack, 2_000);
        Ok(release)
    }

    /// The same drag as raw touches through the stack's recognizer, one
    /// sample per frame starting at `start`. Returns the release, if any.
    pub fn touch_drag(
        &self,
        stack: &mut CardStack,
        fraction: f64,
        start: Instant,
    ) -> Result<Option<Release>, NavigationError> {
        let origin = stack.navigation().bounds().center();
        let total = fraction * stack.navigation().bounds().width;
        let steps = self.steps.max(1);
        let mut now = start;
        stack.handle_touch(TouchEvent::Down(origin), now)?;
        let mut release = None;
        for i in 1..=steps {
            now += FRAME;
            let dx = total * f64::from(i) / f64::from(steps);
            let at = Point::new(origin.x + dx, origin.y + self.drift);
            release = release.or(stack.handle_touch(TouchEvent::Move(at), now)?);
        }
        now += FRAME;
        let end = Point::new(origin.x + total, origin.y + self.drift);
        Ok(release.or(stack.handle_touch(TouchEvent::Up(end), now)?))
    }

    fn event(&self, phase: PanPhase, dx: f64) -> PanEvent {
        PanEvent::new(phase, Point::new(dx, self.drift), Point::new(dx * 4.0, 0.0))
    }
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

/// One captured `tracing` event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub target: String,
    pub message: Option<String>,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

/// A `tracing` layer that records every event.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything captured so far.
    #[must_use]
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: fields.get("message").cloned(),
            fields,
        };
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(captured);
    }
}

/// Run `f` with a capturing subscriber installed on this thread.
pub fn with_captured_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.events())
}
