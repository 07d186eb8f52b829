#![forbid(unsafe_code)]

//! Core: geometry, pan classification, and animation primitives.
//!
//! # Role in cardstack
//! `cardstack-core` is the leaf layer. It knows nothing about cards, groups,
//! or transitions; it provides the vocabulary the runtime is written in.
//!
//! # Primary responsibilities
//! - **Geometry**: [`geometry::Point`], [`geometry::Size`], [`geometry::Rect`]
//!   and the translate+rotate+scale [`geometry::Transform`] applied to cards
//!   and the drag snapshot.
//! - **Gesture**: [`gesture::PanDirection`] classification and the
//!   [`gesture::PanRecognizer`] that turns raw touches into pan phases.
//! - **Animation**: the [`animation::Animation`] trait, fixed-duration
//!   [`animation::Tween`]s with easing, and [`animation::spring::Spring`].
//! - **Logging**: [`logging::init`] bootstraps a `tracing` subscriber.
//!
//! # How it fits in the system
//! `cardstack-runtime` consumes pan events and animation primitives from here
//! and drives the navigation state machine. Rendering is external: renderers
//! read geometry values out of the runtime's scene model.

pub mod animation;
pub mod geometry;
pub mod gesture;
pub mod logging;

pub use geometry::{Point, Rect, Size, Transform};
pub use gesture::{
    PanDirection, PanEvent, PanPhase, PanRecognizer, PanRecognizerConfig, TouchEvent,
};
