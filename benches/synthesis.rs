// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use overtext::config::SynthesisConfig;
use overtext::synthesis::synthesize;

mod fixtures;
mod profiler;

// Benchmark identity (keep stable):
// - Group name in this file: `synthesis.synthesize`
// - Case IDs are `fixtures::Case::id()` values; do not rename them.
fn benches_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis.synthesize");
    let config = SynthesisConfig::default();

    for case in [
        fixtures::Case::Small,
        fixtures::Case::MediumNested,
        fixtures::Case::LargeAnonymous,
    ] {
        let doc = fixtures::fixture(case);
        let items = doc.query_selector_all("li").expect("li query");
        let last = *items.last().expect("fixture has items");
        let config = config.clone();

        group.bench_function(format!("{}_last_item", case.id()), |b| {
            b.iter(|| black_box(synthesize(black_box(&doc), black_box(last), &config)))
        });
        group.bench_function(format!("{}_all_items", case.id()), |b| {
            b.iter(|| {
                let mut acc = 0usize;
                for item in &items {
                    acc = acc.wrapping_add(synthesize(&doc, *item, &config).len());
                }
                black_box(acc)
            })
        });
    }
    group.finish();
}

fn benches_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("dom.count_matches");
    for case in [fixtures::Case::MediumNested, fixtures::Case::LargeAnonymous] {
        let doc = fixtures::fixture(case);
        group.bench_function(case.id(), |b| {
            b.iter(|| {
                black_box(
                    doc.count_matches(black_box("section.card:nth-of-type(3) li:nth-of-type(7)"))
                        .expect("count"),
                )
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_synthesis, benches_query
}
criterion_main!(benches);
