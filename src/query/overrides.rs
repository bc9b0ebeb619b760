// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use regex::RegexBuilder;

use crate::model::{OverrideList, OverrideRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Substring,
    Regex,
}

/// Records whose selector or text matches `needle`, most recent first.
pub fn search<'a>(
    list: &'a OverrideList,
    needle: &str,
    mode: SearchMode,
    case_insensitive: bool,
) -> Result<Vec<&'a OverrideRecord>, regex::Error> {
    let records = list.recent_first().into_iter();
    match mode {
        SearchMode::Substring => {
            if case_insensitive {
                let needle_lower = needle.to_lowercase();
                Ok(records
                    .filter(|r| {
                        r.selector.to_lowercase().contains(&needle_lower)
                            || r.text.to_lowercase().contains(&needle_lower)
                    })
                    .collect())
            } else {
                Ok(records
                    .filter(|r| r.selector.contains(needle) || r.text.contains(needle))
                    .collect())
            }
        }
        SearchMode::Regex => {
            let regex = RegexBuilder::new(needle)
                .case_insensitive(case_insensitive)
                .build()?;
            Ok(records
                .filter(|r| regex.is_match(&r.selector) || regex.is_match(&r.text))
                .collect())
        }
    }
}

/// Selectors that currently resolve to nothing in `doc`, in list order.
pub fn unresolved<'a>(list: &'a OverrideList, doc: &crate::dom::Document) -> Vec<&'a str> {
    list.selectors()
        .filter(|selector| !matches!(doc.query_selector(selector), Ok(Some(_))))
        .collect()
}
