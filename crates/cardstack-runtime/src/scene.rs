#![forbid(unsafe_code)]

//! Headless scene model read by renderers.
//!
//! The scene lists attached cards bottom to top, each with a hidden flag and
//! a [`Visual`] (transform + opacity) relative to its resting frame, plus the
//! optional drag snapshot overlay drawn above everything.
//!
//! Only transitions and the gesture controller write to the scene.

use cardstack_core::{Rect, Transform};

use crate::card::{Card, CardId, Snapshot};

/// Per-node visual state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visual {
    pub transform: Transform,
    pub alpha: f64,
}

impl Default for Visual {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Visual {
    /// At rest and fully opaque.
    pub const IDENTITY: Self = Self {
        transform: Transform::IDENTITY,
        alpha: 1.0,
    };

    /// Opaque with `transform`.
    #[must_use]
    pub const fn transformed(transform: Transform) -> Self {
        Self {
            transform,
            alpha: 1.0,
        }
    }

    /// Set opacity (builder pattern).
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// One attached card.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub card: Card,
    pub hidden: bool,
    pub visual: Visual,
}

/// The drag snapshot shown in place of a hidden card.
#[derive(Debug, Clone)]
pub struct SnapshotOverlay {
    /// Card the snapshot was taken from.
    pub card: CardId,
    pub snapshot: Snapshot,
    /// On-screen rect at rest.
    pub rest: Rect,
    /// Offset from `rest`.
    pub transform: Transform,
}

/// Attached cards in z-order plus the overlay.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    overlay: Option<SnapshotOverlay>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `card` on top, moving it there if already attached.
    pub fn attach(&mut self, card: &Card) {
        let node = self.remove(card).unwrap_or_else(|| Self::fresh(card));
        self.nodes.push(node);
    }

    /// Attach `card` directly below `reference`. Falls back to the top when
    /// `reference` is not attached.
    pub fn attach_below(&mut self, card: &Card, reference: &Card) {
        let node = self.remove(card).unwrap_or_else(|| Self::fresh(card));
        match self.position(reference) {
            Some(i) => self.nodes.insert(i, node),
            None => self.nodes.push(node),
        }
    }

    /// Detach `card`. Returns whether it was attached.
    pub fn detach(&mut self, card: &Card) -> bool {
        self.remove(card).is_some()
    }

    #[must_use]
    pub fn contains(&self, card: &Card) -> bool {
        self.position(card).is_some()
    }

    pub fn set_hidden(&mut self, card: &Card, hidden: bool) {
        if let Some(node) = self.node_mut(card) {
            node.hidden = hidden;
        }
    }

    #[must_use]
    pub fn is_hidden(&self, card: &Card) -> bool {
        self.node(card).is_some_and(|n| n.hidden)
    }

    /// Whether `card` is attached and not hidden.
    #[must_use]
    pub fn is_visible(&self, card: &Card) -> bool {
        self.node(card).is_some_and(|n| !n.hidden)
    }

    pub fn set_visual(&mut self, card: &Card, visual: Visual) {
        if let Some(node) = self.node_mut(card) {
            node.visual = visual;
        }
    }

    #[must_use]
    pub fn visual(&self, card: &Card) -> Option<Visual> {
        self.node(card).map(|n| n.visual)
    }

    /// Nodes bottom to top.
    #[must_use]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // -----------------------------------------------------------------------
    // Overlay
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn overlay(&self) -> Option<&SnapshotOverlay> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut SnapshotOverlay> {
        self.overlay.as_mut()
    }

    pub fn set_overlay(&mut self, overlay: SnapshotOverlay) {
        self.overlay = Some(overlay);
    }

    pub fn take_overlay(&mut self) -> Option<SnapshotOverlay> {
        self.overlay.take()
    }

    fn fresh(card: &Card) -> SceneNode {
        SceneNode {
            card: card.clone(),
            hidden: false,
            visual: Visual::IDENTITY,
        }
    }

    fn position(&self, card: &Card) -> Option<usize> {
        self.nodes.iter().position(|n| n.card == *card)
    }

    fn remove(&mut self, card: &Card) -> Option<SceneNode> {
        self.position(card).map(|i| self.nodes.remove(i))
    }

    fn node(&self, card: &Card) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.card == *card)
    }

    fn node_mut(&mut self, card: &Card) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|n| n.card == *card)
    }
}
