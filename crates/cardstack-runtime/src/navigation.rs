#![forbid(unsafe_code)]

//! Navigation state shared by transitions, the queue, and the gesture
//! controller.
//!
//! # Invariants
//!
//! 1. `displayed` is written only by transition commit and by stack
//!    construction. Rollback and abort leave it alone.
//! 2. Staged groups are invisible to navigation until their push commits;
//!    rollback or abort drops them.

use cardstack_core::{PanDirection, Rect};

use crate::card::Card;
use crate::config::StackConfig;
use crate::group::{CardGroup, GroupId};
use crate::history::History;
use crate::scene::Scene;
use crate::signal::Signal;
use crate::transition::{AbortReason, NavigationKind};

/// Events for host feedback (haptics, shake).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackFeedback {
    /// A requested navigation could not run.
    Rejected {
        kind: NavigationKind,
        reason: AbortReason,
    },
    GroupPushed(GroupId),
    GroupPopped(GroupId),
    CardSwiped { direction: PanDirection },
}

/// Everything a transition reads and commits into.
#[derive(Debug)]
pub struct NavigationState {
    pub(crate) groups: Vec<CardGroup>,
    pub(crate) staged: Vec<CardGroup>,
    pub(crate) displayed: Option<Card>,
    pub(crate) history: History,
    pub(crate) scene: Scene,
    pub(crate) bounds: Rect,
    pub(crate) config: StackConfig,
    pub(crate) feedback: Signal<StackFeedback>,
}

impl NavigationState {
    /// A state with `root` as the only group, its display card shown.
    #[must_use]
    pub fn new(mut root: CardGroup, config: StackConfig, bounds: Rect) -> Self {
        root.configure(&config, bounds);
        let displayed = root.display_card().cloned();
        let mut scene = Scene::new();
        if let Some(card) = &displayed {
            scene.attach(card);
        }
        Self {
            groups: vec![root],
            staged: Vec::new(),
            displayed,
            history: History::new(),
            scene,
            bounds,
            config,
            feedback: Signal::new(),
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[CardGroup] {
        &self.groups
    }

    #[must_use]
    pub fn top_group(&self) -> Option<&CardGroup> {
        self.groups.last()
    }

    pub fn top_group_mut(&mut self) -> Option<&mut CardGroup> {
        self.groups.last_mut()
    }

    #[must_use]
    pub fn group_below_top(&self) -> Option<&CardGroup> {
        self.groups.len().checked_sub(2).map(|i| &self.groups[i])
    }

    #[must_use]
    pub fn staged_group(&self, id: GroupId) -> Option<&CardGroup> {
        self.staged.iter().find(|g| g.id() == id)
    }

    /// The single card the stack is showing.
    #[must_use]
    pub fn displayed(&self) -> Option<&Card> {
        self.displayed.as_ref()
    }

    /// Whether `card` is the top group's loading placeholder.
    #[must_use]
    pub fn is_top_loading_card(&self, card: &Card) -> bool {
        self.top_group().is_some_and(|g| g.is_loading_card(card))
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[must_use]
    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Hold `group` until its push commits.
    pub(crate) fn stage(&mut self, mut group: CardGroup) -> GroupId {
        group.configure(&self.config, self.bounds);
        let id = group.id();
        self.staged.push(group);
        id
    }

    pub(crate) fn unstage(&mut self, id: GroupId) -> Option<CardGroup> {
        let i = self.staged.iter().position(|g| g.id() == id)?;
        Some(self.staged.remove(i))
    }

    pub(crate) fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        for group in self.groups.iter_mut().chain(self.staged.iter_mut()) {
            group.set_bounds(bounds);
        }
    }
}
