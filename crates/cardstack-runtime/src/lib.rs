#![forbid(unsafe_code)]

//! Cardstack Runtime
//!
//! A card-stack navigation engine: groups of cards stacked on a screen, one
//! card displayed at a time, navigated by drag-to-pop, undo, and group
//! push/pop, with paginated loading behind a placeholder card.
//!
//! # Key Components
//!
//! - [`CardStack`] - Root controller and the only type hosts drive
//! - [`CardGroup`] - Ordered deck with a cursor, swipe history, and loader
//! - [`PaginatedLoader`] - Single-flight page fetcher over a [`PageSource`]
//! - [`NavigationQueue`] - FIFO, one-at-a-time transition runner
//! - [`TransitionOperation`] - Deferred endpoints plus commit bookkeeping
//! - [`GestureController`] - Drag snapshot, threshold, throw or snap back
//! - [`Card`] - Shared handle around host content with layout and snapshot
//!
//! # Role in cardstack
//! `cardstack-runtime` is the state machine. It consumes pan phases and
//! animation primitives from `cardstack-core` and exposes a scene model
//! (card order, visuals, hidden flags, drag overlay) that a renderer reads.
//!
//! # How it fits in the system
//! Hosts feed touches or pan events and call [`CardStack::tick`] once per
//! frame. Nothing moves between ticks; there are no timers or threads on the
//! navigation path. Page sources may fetch off-thread but deliver through
//! `tick`.

pub mod card;
pub mod config;
pub mod error;
pub mod gesture_controller;
pub mod group;
pub mod history;
pub mod loader;
pub mod navigation;
pub mod queue;
pub mod scene;
pub mod signal;
pub mod stack;
pub mod transition;

pub use card::{Bitmap, Card, CardContent, CardId, CardState, ChangeListener, ContentRef, Snapshot};
pub use config::{
    GestureConfig, GroupConfig, LayoutConfig, QueueConfig, StackConfig, TransitionTimings,
};
pub use error::{ConfigError, GroupError, LoaderError, NavigationError};
pub use gesture_controller::{GestureController, Release};
pub use group::{CardGroup, GroupId};
pub use history::History;
pub use loader::{
    BatchLoaded, FixedSource, Page, PageSource, PaginatedLoader, RemotePage, SimulatedSource,
    ThreadedSource,
};
pub use navigation::{NavigationState, StackFeedback};
pub use queue::NavigationQueue;
pub use scene::{Scene, SceneNode, SnapshotOverlay, Visual};
pub use signal::{Signal, Subscription};
pub use stack::CardStack;
pub use transition::{
    AbortReason, AnimationStrategy, Endpoint, NavigationKind, OperationId, OperationState,
    TransitionAnimator, TransitionOperation, TransitionOutcome,
};
