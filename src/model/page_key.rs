// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::borrow::Borrow;
use std::fmt;

use url::Url;

/// Identity of a page for persistence: `origin + pathname`.
///
/// Query and fragment never take part, so `https://a.com/p?x=1#y` and `https://a.com/p` share a
/// key. Opaque origins (`file:`, `data:`, ...) serialize as `null`. Only a URL that cannot be
/// parsed yields the empty key, and every store operation on the empty key is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    value: String,
}

impl PageKey {
    pub fn from_url(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) => Self::from_parsed(&parsed),
            Err(_) => Self::empty(),
        }
    }

    pub fn from_parsed(url: &Url) -> Self {
        Self {
            value: format!("{}{}", url.origin().ascii_serialization(), url.path()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for PageKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for PageKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}
