// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Session coordinator             │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │ Permissions │    │  Camera traits   │    │
//! │  └─────────────┘    └────────┬─────────┘    │
//! │                     ┌────────┴─────────┐    │
//! │                     │ Virtual Camera   │    │
//! │                     └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: platform camera traits, shared types, preview surfaces
//! - [`permissions`]: permission provider collaborator
//! - [`virtual_camera`]: in-process camera platform with synthetic sources

pub mod camera;
pub mod permissions;
pub mod virtual_camera;
