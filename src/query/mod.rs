// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over override lists.
//!
//! Derived views for management surfaces: filtering a page's overrides and finding which of
//! them no longer resolve.

pub mod overrides;
