use crate::di::Services;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ListCount<'a> {
    name: &'a str,
    list_type: &'static str,
    rules: usize,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    generation: u64,
    store: &'a str,
    lists: Vec<ListCount<'a>>,
    total: usize,
}

/// Print how many rules each configured list contributed.
pub fn run_check(services: &Services) -> anyhow::Result<()> {
    let generation = services.engine.current();
    let summary = generation.summary();

    let lists = generation
        .lists()
        .iter()
        .map(|list| ListCount {
            name: list.canonical_name(),
            list_type: list.list_type.as_str(),
            rules: summary.count_for(list.canonical_name()).unwrap_or(0),
        })
        .collect();

    let report = CheckReport {
        generation: generation.id(),
        store: &services.config.store.kind,
        lists,
        total: summary.total,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
