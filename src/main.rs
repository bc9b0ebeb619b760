// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Overtext CLI entrypoint.
//!
//! Loads an HTML page, applies the overrides persisted for its URL and prints the resulting
//! document. Management flags edit the page's override list before it is applied.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use overtext::config::EngineConfig;
use overtext::dom::parse_html;
use overtext::model::PageKey;
use overtext::query::overrides::{search, unresolved, SearchMode};
use overtext::reconcile::Reconciler;
use overtext::store::{FileStore, KeyValueStore, MemoryStore, OverrideStore, WriteDurability};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} <page.html> --url <url> [--store <dir>] [--durable-writes] [--config <file>] [--verbose]\n      [--set <selector>=<text>]... [--delete <selector>]... [--clear]\n      [--list | --search <needle> [--regex] [--ignore-case] | --pick <css>]\n\nWithout a query flag the page is reconciled and the resulting HTML is printed to stdout.\n--list and --search print the page's overrides (most recent first) instead.\n--pick prints the selector that would be stored for the first element matching <css>.\n\nIf --store is omitted, overrides live in memory for this run only.\n--durable-writes opts into slower, best-effort durable persistence (fsync/sync where supported).\nRUST_LOG overrides the log filter."
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Query {
    List,
    Search { needle: String, regex: bool, ignore_case: bool },
    Pick(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    page: Option<String>,
    url: Option<String>,
    store_dir: Option<String>,
    config: Option<String>,
    durable_writes: bool,
    verbose: bool,
    sets: Vec<(String, String)>,
    deletes: Vec<String>,
    clear: bool,
    query: Option<Query>,
}

/// Splits `<selector>=<text>` at the first `=` outside attribute brackets and quotes.
fn parse_set(raw: &str) -> Result<(String, String), ()> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut split = None;
    for (i, c) in raw.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '=') if depth == 0 => {
                split = Some(i);
                break;
            }
            _ => {}
        }
    }
    let at = split.ok_or(())?;
    let (selector, text) = (&raw[..at], &raw[at + 1..]);
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(());
    }
    Ok((selector.to_owned(), text.to_owned()))
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();
    let mut regex = false;
    let mut ignore_case = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--url" => {
                if options.url.is_some() {
                    return Err(());
                }
                options.url = Some(args.next().ok_or(())?);
            }
            "--store" => {
                if options.store_dir.is_some() {
                    return Err(());
                }
                options.store_dir = Some(args.next().ok_or(())?);
            }
            "--config" => {
                if options.config.is_some() {
                    return Err(());
                }
                options.config = Some(args.next().ok_or(())?);
            }
            "--durable-writes" => {
                if options.durable_writes {
                    return Err(());
                }
                options.durable_writes = true;
            }
            "--verbose" | "-v" => {
                if options.verbose {
                    return Err(());
                }
                options.verbose = true;
            }
            "--set" => {
                let raw = args.next().ok_or(())?;
                options.sets.push(parse_set(&raw)?);
            }
            "--delete" => {
                options.deletes.push(args.next().ok_or(())?);
            }
            "--clear" => {
                if options.clear {
                    return Err(());
                }
                options.clear = true;
            }
            "--list" => {
                if options.query.is_some() {
                    return Err(());
                }
                options.query = Some(Query::List);
            }
            "--search" => {
                if options.query.is_some() {
                    return Err(());
                }
                let needle = args.next().ok_or(())?;
                options.query = Some(Query::Search {
                    needle,
                    regex: false,
                    ignore_case: false,
                });
            }
            "--regex" => {
                if regex {
                    return Err(());
                }
                regex = true;
            }
            "--ignore-case" | "-i" => {
                if ignore_case {
                    return Err(());
                }
                ignore_case = true;
            }
            "--pick" => {
                if options.query.is_some() {
                    return Err(());
                }
                options.query = Some(Query::Pick(args.next().ok_or(())?));
            }
            _ if arg.starts_with('-') => return Err(()),
            _ => {
                if options.page.is_some() {
                    return Err(());
                }
                options.page = Some(arg);
            }
        }
    }

    match options.query.as_mut() {
        Some(Query::Search {
            regex: r,
            ignore_case: i,
            ..
        }) => {
            *r = regex;
            *i = ignore_case;
        }
        _ if regex || ignore_case => return Err(()),
        _ => {}
    }

    if options.page.is_none() || options.url.is_none() {
        return Err(());
    }
    if options.durable_writes && options.store_dir.is_none() {
        return Err(());
    }

    Ok(options)
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("overtext=debug")
        } else {
            EnvFilter::new("overtext=warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "overtext".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };
        setup_tracing(options.verbose);

        let config = match options.config.as_deref() {
            Some(path) => EngineConfig::load(Path::new(path))?,
            None => EngineConfig::default(),
        };
        let page_path = options.page.clone().unwrap_or_default();
        let html = std::fs::read_to_string(&page_path)
            .map_err(|err| format!("failed to read {page_path}: {err}"))?;
        let document = parse_html(&html)?;
        let page = PageKey::from_url(options.url.as_deref().unwrap_or_default());
        if page.is_empty() {
            tracing::warn!("url has no origin; overrides are disabled for this page");
        }

        let backend: Arc<dyn KeyValueStore> = match options.store_dir.as_deref() {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let store = FileStore::new(dir);
                if options.durable_writes {
                    Arc::new(store.with_durability(WriteDurability::Durable))
                } else {
                    Arc::new(store)
                }
            }
            None => Arc::new(MemoryStore::new()),
        };
        let store = OverrideStore::new(backend);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

        runtime.block_on(async move {
            if options.clear {
                store.clear(&page).await;
            }
            for selector in &options.deletes {
                store.delete(&page, selector).await;
            }
            for (selector, text) in &options.sets {
                store.save(&page, selector, text).await;
            }

            match options.query {
                Some(Query::List) => {
                    let list = store.load(&page).await;
                    for record in list.recent_first() {
                        println!("{}\t{}", record.selector, record.text);
                    }
                    let unresolved = unresolved(&list, &document);
                    if !unresolved.is_empty() {
                        eprintln!("unresolved: {}", unresolved.join(", "));
                    }
                }
                Some(Query::Search {
                    needle,
                    regex,
                    ignore_case,
                }) => {
                    let list = store.load(&page).await;
                    let mode = if regex {
                        SearchMode::Regex
                    } else {
                        SearchMode::Substring
                    };
                    for record in search(&list, &needle, mode, ignore_case)? {
                        println!("{}\t{}", record.selector, record.text);
                    }
                }
                Some(Query::Pick(css)) => {
                    let target = document
                        .query_selector(&css)?
                        .ok_or_else(|| format!("no element matches {css}"))?;
                    println!(
                        "{}",
                        overtext::synthesis::synthesize(&document, target, &config.synthesis())
                    );
                }
                None => {
                    let document = Arc::new(tokio::sync::Mutex::new(document));
                    let reconciler = Reconciler::new(document.clone(), store, page, config);
                    let report = reconciler.init().await;
                    reconciler.stop_observing().await;
                    if !report.skipped.is_empty() {
                        eprintln!("skipped: {}", report.skipped.join(", "));
                    }
                    println!("{}", document.lock().await.to_html());
                }
            }
            Ok::<(), Box<dyn Error>>(())
        })?;

        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("overtext: {err}");
        std::process::exit(1);
    }
}
