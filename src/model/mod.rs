// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! A page is identified by its [`PageKey`]; each key owns one [`OverrideList`] of
//! selector-addressed text replacements.

pub mod override_record;
pub mod page_key;

pub use override_record::{OverrideList, OverrideRecord};
pub use page_key::PageKey;
