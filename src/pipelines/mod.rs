// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! Heavy work triggered by a capture runs off the dispatch thread so the
//! preview surfaces keep receiving frames.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │  FramePair   │ ──▶ │ Composite Pipeline│ ──▶ │ OutputSink   │
//! │ (front/back) │     │  - Stack          │     │ (JPEG / PNG) │
//! │              │     │  - Encode         │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`photo`]: composite stills

pub mod photo;
