// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Persistence for override lists.
//!
//! [`KeyValueStore`] is the host's asynchronous key-value contract; [`OverrideStore`] is the
//! accessor the rest of the crate goes through. Two adapters ship with the crate: an in-process
//! [`MemoryStore`] and a directory-backed [`FileStore`].

pub mod kv;
pub mod overrides;

pub use kv::{FileStore, KeyValueStore, MemoryStore, StoreError, WriteDurability};
pub use overrides::OverrideStore;

#[cfg(test)]
mod tests;
