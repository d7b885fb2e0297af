use std::collections::HashSet;

use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use factscope::{
    project, refine_result, result_to_rows, ActFact, ActObject, FactTypeLabel, NamedId, ObjectTypeFilter,
    SearchResult, SortOrder, TimeHorizon, TimeUnit, RETRACTED_FLAG,
};

const OBJECT_TYPES: [&str; 4] = ["threatActor", "report", "tool", "vulnerability"];

// 512 objects in a ring, each linked to the next, plus a name fact per
// object and every tenth link retracted.
fn make_result() -> SearchResult {
    let now = Utc::now();
    let objects: Vec<ActObject> = (0..512u32)
        .map(|i| {
            let type_name = OBJECT_TYPES[i as usize % OBJECT_TYPES.len()];
            ActObject::new(format!("o{i}"), NamedId::new(format!("t-{type_name}"), type_name), format!("value-{i}"))
        })
        .collect();

    let mut facts = Vec::with_capacity(objects.len() * 2);
    for (i, object) in objects.iter().enumerate() {
        let next = &objects[(i + 1) % objects.len()];
        let mut link = ActFact::new(format!("l{i}"), NamedId::new("ft-link", "mentions"), now - Duration::hours(i as i64))
            .with_source(object.clone())
            .with_destination(next.clone());
        if i % 10 == 0 {
            link = link.with_flag(RETRACTED_FLAG);
        }
        facts.push(link);
        facts.push(
            ActFact::new(format!("n{i}"), NamedId::new("ft-name", "name"), now - Duration::hours(i as i64))
                .with_value(format!("name-{i}"))
                .with_source(object.clone()),
        );
    }
    SearchResult::from_parts(facts, objects)
}

fn filters(checked: bool) -> Vec<ObjectTypeFilter> {
    OBJECT_TYPES
        .iter()
        .map(|name| ObjectTypeFilter {
            id: format!("t-{name}"),
            name: (*name).to_string(),
            checked: checked || *name != "tool",
        })
        .collect()
}

fn bench_refine(c: &mut Criterion) {
    let result = make_result();
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(result.facts.len() as u64));

    let all = filters(true);
    group.bench_function("refine/unfiltered", |b| {
        b.iter(|| refine_result(&result, &all, &TimeHorizon::Unbounded, false, Utc::now()));
    });

    let some = filters(false);
    let horizon = TimeHorizon::Relative {
        amount: 7,
        unit: TimeUnit::Day,
    };
    group.bench_function("refine/filtered", |b| {
        b.iter(|| refine_result(&result, &some, &horizon, false, Utc::now()));
    });

    group.finish();
}

fn bench_project(c: &mut Criterion) {
    let refined = refine_result(&make_result(), &filters(true), &TimeHorizon::Unbounded, false, Utc::now());
    let label = FactTypeLabel::new("name");
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(refined.len() as u64));

    group.bench_function("project/graph", |b| {
        b.iter(|| project(&refined, &label));
    });

    let excluded = HashSet::from(["tool".to_string()]);
    group.bench_function("project/table", |b| {
        b.iter(|| result_to_rows(&refined, &excluded, &HashSet::new(), SortOrder::default()));
    });

    group.finish();
}

criterion_group!(pipeline, bench_refine, bench_project);
criterion_main!(pipeline);
