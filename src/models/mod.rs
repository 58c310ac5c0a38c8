// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod memory;
pub mod user;

pub use memory::{Badge, Location, MediaAttachment, Memory, Story, StoryPage};
pub use user::{Account, Session, SessionInfo, User, UserPublic, Verification};
