//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the server and its clients. They are serialized over the feed API and the
//! live update stream.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. Nothing here touches the network or the
//! database.

/// Feed items, merge-by-time and feed filters
pub mod feed;

/// Live update payloads and channel names
pub mod live_update;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use error::SharedError;
pub use feed::{
    merge_by_time, CreateEventRequest, CreatePostRequest, Event, FeedQuery, FeedResponse, ItemKind,
    Post, SourceScope, Timed, TimedItem,
};
pub use live_update::{event_created_channel, LiveUpdate, UpdateType, POST_CREATED_CHANNEL};
