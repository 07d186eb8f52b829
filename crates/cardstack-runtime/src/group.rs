#![forbid(unsafe_code)]

//! Card groups: an ordered deck with a cursor, a swipe record, and an
//! optional paginated loader.
//!
//! # Invariants
//!
//! 1. `swipe_history.len() == current_index`: entry `i` is the direction
//!    card `i` was swiped.
//! 2. `current_index <= cards.len()`. The cursor sits past the end only
//!    while a page is in flight, which is when the loading card shows.
//! 3. Each delivered batch is appended in reverse arrival order.
//!
//! # Failure Modes
//!
//! - `did_swipe` / `did_undo_swipe` with the wrong card are rejected with a
//!   [`GroupError`] and leave the group unchanged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use cardstack_core::{PanDirection, Rect};

use crate::card::{Card, CardState};
use crate::config::{LayoutConfig, StackConfig};
use crate::error::{GroupError, LoaderError};
use crate::loader::PaginatedLoader;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique group identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    fn next() -> Self {
        Self(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// An ordered deck of cards with a cursor.
#[derive(Debug)]
pub struct CardGroup {
    id: GroupId,
    title: Option<String>,
    cards: Vec<Card>,
    current_index: usize,
    loading_card: Option<Card>,
    swipe_history: Vec<PanDirection>,
    loader: Option<PaginatedLoader>,
    prefetch_buffer: usize,
    layout: LayoutConfig,
    bounds: Rect,
    fetches: u32,
}

impl CardGroup {
    fn empty() -> Self {
        Self {
            id: GroupId::next(),
            title: None,
            cards: Vec::new(),
            current_index: 0,
            loading_card: None,
            swipe_history: Vec::new(),
            loader: None,
            prefetch_buffer: 3,
            layout: LayoutConfig::default(),
            bounds: Rect::default(),
            fetches: 0,
        }
    }

    /// A group fed by `loader`. The first page is requested immediately, so
    /// the group starts out showing `loading_card`.
    #[must_use]
    pub fn with_loader(loader: PaginatedLoader, loading_card: Card) -> Self {
        let mut group = Self {
            loader: Some(loader),
            loading_card: Some(loading_card),
            ..Self::empty()
        };
        if let Err(err) = group.fetch_next() {
            tracing::warn!(target: "cardstack.loader", group = %group.id, %err, "initial fetch rejected");
        }
        group
    }

    /// A group over a fixed list of cards.
    #[must_use]
    pub fn with_cards(cards: Vec<Card>) -> Self {
        Self {
            cards,
            ..Self::empty()
        }
    }

    /// Set the title (builder pattern).
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the prefetch threshold (builder pattern).
    #[must_use]
    pub fn prefetch_buffer(mut self, buffer: usize) -> Self {
        self.prefetch_buffer = buffer;
        self
    }

    /// Adopt the stack's layout and bounds. Cards created from later batches
    /// use them too.
    pub fn configure(&mut self, config: &StackConfig, bounds: Rect) {
        self.prefetch_buffer = config.group.prefetch_buffer;
        self.layout = config.layout.clone();
        self.set_bounds(bounds);
    }

    /// Relayout every card for new container bounds.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        for card in self.cards.iter().chain(self.loading_card.as_ref()) {
            card.set_bounds(bounds);
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    #[must_use]
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn swipe_history(&self) -> &[PanDirection] {
        &self.swipe_history
    }

    #[must_use]
    pub fn loading_card(&self) -> Option<&Card> {
        self.loading_card.as_ref()
    }

    #[must_use]
    pub fn loader(&self) -> Option<&PaginatedLoader> {
        self.loader.as_ref()
    }

    /// Number of page loads started.
    #[must_use]
    pub fn fetches(&self) -> u32 {
        self.fetches
    }

    /// The card under the cursor, if it has loaded.
    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        self.cards.get(self.current_index)
    }

    #[must_use]
    pub fn next_card(&self) -> Option<&Card> {
        self.cards.get(self.current_index + 1)
    }

    /// `None` at index 0.
    #[must_use]
    pub fn previous_card(&self) -> Option<&Card> {
        self.current_index
            .checked_sub(1)
            .and_then(|i| self.cards.get(i))
    }

    /// What this group shows right now: the current card, or the loading
    /// card when the cursor has nothing ready.
    #[must_use]
    pub fn display_card(&self) -> Option<&Card> {
        self.current_card().or(self.loading_card.as_ref())
    }

    /// Cards from the cursor to the end, inclusive.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.current_index)
    }

    #[must_use]
    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    #[must_use]
    pub fn is_loading_card(&self, card: &Card) -> bool {
        self.loading_card.as_ref() == Some(card)
    }

    fn is_loading(&self) -> bool {
        self.loader.as_ref().is_some_and(PaginatedLoader::is_loading)
    }

    fn has_loaded_all(&self) -> bool {
        self.loader.as_ref().is_none_or(PaginatedLoader::has_loaded_all)
    }

    /// A page is in flight and the cursor has no ready card.
    #[must_use]
    pub fn should_show_loading_card(&self) -> bool {
        self.is_loading() && self.current_index >= self.cards.len()
    }

    /// The cursor is on the final card and nothing more will arrive.
    #[must_use]
    pub fn is_last_card(&self) -> bool {
        !self.cards.is_empty()
            && self.current_index == self.cards.len() - 1
            && self.has_loaded_all()
            && !self.is_loading()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Prefetch hook called when a drag starts on this group.
    pub fn will_begin_swiping(&mut self) {
        let Some(loader) = &self.loader else {
            return;
        };
        if self.remaining() < self.prefetch_buffer
            && !loader.is_loading()
            && !loader.has_loaded_all()
            && self.fetch_next().is_ok()
        {
            tracing::debug!(target: "cardstack.loader", group = %self.id, remaining = self.remaining(), "prefetch");
        }
    }

    /// Record that `card` was swiped away in `direction` and advance.
    pub fn did_swipe(&mut self, card: &Card, direction: PanDirection) -> Result<(), GroupError> {
        if self.current_card() != Some(card) {
            return Err(GroupError::NotCurrent(card.id()));
        }
        self.swipe_history.push(direction);
        self.current_index += 1;
        tracing::debug!(
            target: "cardstack.stack",
            group = %self.id,
            card = %card.id(),
            ?direction,
            index = self.current_index,
            "did swipe"
        );
        Ok(())
    }

    /// Step back to `card`, which must be the card before the cursor.
    pub fn did_undo_swipe(&mut self, card: &Card) -> Result<(), GroupError> {
        if self.current_index == 0 {
            return Err(GroupError::AtFirstCard);
        }
        if self.swipe_history.is_empty() {
            return Err(GroupError::EmptyHistory);
        }
        if self.previous_card() != Some(card) {
            return Err(GroupError::NotPrevious(card.id()));
        }
        self.current_index -= 1;
        self.swipe_history.pop();
        tracing::debug!(
            target: "cardstack.stack",
            group = %self.id,
            card = %card.id(),
            index = self.current_index,
            "did undo swipe"
        );
        Ok(())
    }

    /// Direction `card` was swiped, if it has been.
    #[must_use]
    pub fn swipe_direction(&self, card: &Card) -> Option<PanDirection> {
        let index = self.cards.iter().position(|c| c == card)?;
        self.swipe_history.get(index).copied()
    }

    /// Ask the loader for the next page. No-op without a loader.
    pub fn fetch_next(&mut self) -> Result<(), LoaderError> {
        let Some(loader) = self.loader.as_mut() else {
            return Ok(());
        };
        loader.load()?;
        self.fetches += 1;
        Ok(())
    }

    /// Drive the loader by `dt`, splicing any delivered batch into the deck.
    /// Returns `true` when a batch landed.
    pub fn pump(&mut self, dt: Duration) -> bool {
        let Some(loader) = self.loader.as_mut() else {
            return false;
        };
        let cards = &mut self.cards;
        let layout = &self.layout;
        let bounds = self.bounds;
        loader.pump(dt, |batch| {
            cards.extend(batch.into_iter().rev().map(|content| {
                let card = Card::new(content, CardState::Stack, layout.clone());
                card.set_bounds(bounds);
                card
            }));
        })
    }
}
