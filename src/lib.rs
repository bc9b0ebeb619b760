// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Overtext: durable text overrides for documents you do not control.
//!
//! A user picks an element, types replacement text, and the engine remembers it under a CSS
//! selector synthesized for that element. On every load, and after every mutation burst, the
//! persisted overrides are re-applied to the live [`dom::Document`]; the ones that no longer
//! resolve are masked instead of flashing stale text.
//!
//! Module map:
//! - [`dom`]: arena document, HTML parsing, selector engine, mutation observers.
//! - [`synthesis`]: selector synthesis for a chosen element.
//! - [`model`]: page keys and override records.
//! - [`store`]: key-value backends and the per-page override store.
//! - [`reconcile`]: apply passes, masking, debounced observation.
//! - [`edit`]: the click-to-edit state machine.
//! - [`agent`]: message and event routing for a page.
//! - [`query`]: search and diagnostics over override lists.

pub mod agent;
pub mod config;
pub mod dom;
pub mod edit;
pub mod model;
pub mod query;
pub mod reconcile;
pub mod store;
pub mod synthesis;
