use factscope::{
    ActFact, ActObject, ColumnKind, ExecuteOutcome, FactReference, FactId, GraphElement, InMemoryFactStore, NamedId,
    ObjectFactsSearch, ObjectId, ResolveError, ResolvedData, Search, SearchError, SearchResolver, Session,
    SessionConfig, SortDirection, SortOrder, RETRACTED_FLAG,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// Set RUST_LOG=factscope=debug to see history and projection logs.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn threat_actor() -> ActObject {
    ActObject::new("x", NamedId::new("t-actor", "threatActor"), "APT1")
}

fn report() -> ActObject {
    ActObject::new("y", NamedId::new("t-report", "report"), "report-1")
}

fn tool() -> ActObject {
    ActObject::new("z", NamedId::new("t-tool", "tool"), "gh0st")
}

fn seeded_store() -> Arc<InMemoryFactStore> {
    let store = InMemoryFactStore::new();
    let now = Utc::now();

    let mentions = ActFact::new("f-mentions", NamedId::new("ft-mentions", "mentions"), now - Duration::days(2))
        .with_source(report())
        .with_destination(threat_actor());
    let mentions_again = ActFact::new("f-mentions-2", NamedId::new("ft-mentions", "mentions"), now - Duration::days(1))
        .with_source(report())
        .with_destination(threat_actor());
    let uses = ActFact::new("f-uses", NamedId::new("ft-uses", "uses"), now - Duration::days(40))
        .with_source(threat_actor())
        .with_destination(tool());
    let name = ActFact::new("f-name", NamedId::new("ft-name", "name"), now - Duration::days(5))
        .with_value("Comment Crew")
        .with_source(threat_actor());
    let retracted = ActFact::new("f-retracted", NamedId::new("ft-uses", "uses"), now - Duration::days(3))
        .with_source(threat_actor())
        .with_destination(tool())
        .with_flag(RETRACTED_FLAG);
    let observed = ActFact::new("f-meta", NamedId::new("ft-obs", "observationTime"), now - Duration::days(2))
        .with_reference(FactReference {
            id: FactId::new("f-mentions"),
            fact_type: NamedId::new("ft-mentions", "mentions"),
        });

    for fact in [mentions, mentions_again, uses, name, retracted, observed] {
        store.insert_fact(fact).unwrap();
    }
    Arc::new(store)
}

#[tokio::test]
async fn analyst_walkthrough() {
    init_tracing();
    let session = Session::new(SessionConfig::default(), seeded_store()).unwrap();

    let outcome = session.execute(Search::object("threatActor", "APT1")).await;
    assert!(outcome.is_added());
    assert!(!session.history().is_loading());

    // Re-issuing the same search is a no-op.
    let again = session.execute(Search::object("threatActor", "APT1")).await;
    assert!(matches!(again, ExecuteOutcome::AlreadyPresent(_)));
    assert_eq!(session.history().len(), 1);

    // Retracted fact hidden, meta-fact excluded from the graph.
    let refined = session.refined();
    assert!(!refined.facts.contains_key(&FactId::new("f-retracted")));
    assert!(refined.facts.contains_key(&FactId::new("f-meta")));

    let graph = session.graph();
    // 3 objects + 1 pendant name fact; 3 two-ended facts + 1 pendant edge.
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 4);
    assert!(graph.get("f-meta").is_none());
    let Some(GraphElement::ObjectNode(actor)) = graph.get("x") else {
        panic!("expected the threat actor node");
    };
    assert_eq!(actor.label, "Comment Crew");

    session.toggle_show_retractions();
    assert!(session.refined().facts.contains_key(&FactId::new("f-retracted")));
    assert_eq!(session.graph().edge_count(), 5);
    session.toggle_show_retractions();

    // Horizon "last 30 days" keeps only the old tool usage.
    session.set_end_timestamp("last 30 days".parse().unwrap());
    let old = session.refined();
    let ids: Vec<&str> = old.facts.keys().map(FactId::as_str).collect();
    assert_eq!(ids, vec!["f-uses"]);
    let range = session.time_range();
    assert_eq!(range.from, range.to);
    session.set_end_timestamp("Any time".parse().unwrap());

    // Unchecking threat actors empties every fact touching one.
    assert_eq!(session.toggle_object_type_filter("t-actor"), Some(false));
    let without_actor = session.refined();
    assert!(without_actor.objects.values().all(|o| o.type_name() != "threatActor"));
    assert_eq!(session.toggle_object_type_filter("t-actor"), Some(true));
    assert_eq!(session.refined(), refined);
}

#[tokio::test]
async fn table_projection_of_raw_query() {
    let store = InMemoryFactStore::new();
    store.insert_object(threat_actor()).unwrap();
    store.insert_object(report()).unwrap();
    store
        .insert_fact(
            ActFact::new("f1", NamedId::new("ft-mentions", "mentions"), Utc::now())
                .with_source(report())
                .with_destination(threat_actor()),
        )
        .unwrap();
    let session = Session::new(SessionConfig::default(), Arc::new(store)).unwrap();

    let search = Search::object("threatActor", "APT1");
    session.execute(search.clone()).await;
    session.select(None);

    let rows = session.query_table(&search.id(), SortOrder::default()).unwrap();
    let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["report", "threatActor"]);
    assert!(rows.iter().all(|r| !r.is_selected));

    session.set_object_type_checked("t-actor", false);
    let rows = session.query_table(&search.id(), SortOrder::default()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "report");

    let by_value = SortOrder::default().toggle(ColumnKind::ObjectValue);
    assert_eq!(by_value.order, SortDirection::Asc);
}

#[tokio::test]
async fn merge_previous_controls_cumulative_result() {
    let session = Session::new(SessionConfig::default(), seeded_store()).unwrap();
    session
        .execute(Search::ObjectFacts(
            ObjectFactsSearch::new("threatActor", "APT1").with_fact_types(["name"]),
        ))
        .await;
    session.execute(Search::object("tool", "gh0st")).await;
    assert_eq!(session.history().len(), 2);

    let merged = session.result();
    assert!(merged.facts.contains_key(&FactId::new("f-name")));
    assert!(merged.facts.contains_key(&FactId::new("f-uses")));

    assert!(!session.flip_merge_previous());
    let last_only = session.result();
    assert!(!last_only.facts.contains_key(&FactId::new("f-name")));
    assert!(last_only.facts.contains_key(&FactId::new("f-uses")));
}

struct Oversized;

#[async_trait]
impl SearchResolver for Oversized {
    async fn count(&self, _search: &Search) -> Result<usize, ResolveError> {
        Ok(5_000)
    }

    async fn resolve(&self, _search: &Search) -> Result<ResolvedData, ResolveError> {
        panic!("resolve must not run past the count probe");
    }
}

#[tokio::test]
async fn oversized_search_is_refused_before_resolution() {
    let session = Session::new(SessionConfig::default(), Arc::new(Oversized)).unwrap();
    let outcome = session.execute(Search::object("threatActor", "APT1")).await;

    assert_eq!(
        outcome,
        ExecuteOutcome::Failed(SearchError::TooMuchData {
            limit: 2000,
            actual: 5_000
        })
    );
    assert!(session.history().is_empty());
    assert!(session.history().error().is_some());
    assert!(session.object_type_filters().is_empty());
}

#[tokio::test]
async fn malformed_json_search_is_recorded() {
    let session = Session::new(SessionConfig::default(), seeded_store()).unwrap();
    let outcome = session
        .execute_value(serde_json::json!({"objectValue": "APT1"}))
        .await;
    assert!(matches!(outcome, ExecuteOutcome::Failed(SearchError::MalformedSearch { .. })));
    assert!(session.history().is_empty());

    let outcome = session
        .execute_value(serde_json::json!({"objectType": "threatActor", "objectValue": "APT1"}))
        .await;
    assert!(outcome.is_added());
    assert!(session.history().error().is_none());
}

#[tokio::test]
async fn export_survives_json_and_reimport() {
    let session = Session::new(SessionConfig::default(), seeded_store()).unwrap();
    session.execute(Search::object("threatActor", "APT1")).await;
    session.execute(Search::fact("f-uses", "uses")).await;
    session.prune_object(ObjectId::new("z"));

    let json = factscope::export::to_json_pretty(&session.export()).unwrap();
    let export = factscope::export::from_json(&json).unwrap();

    let restored = Session::new(SessionConfig::default(), seeded_store()).unwrap();
    let outcomes = restored.import(export).await.unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(restored.pruned_objects(), vec![ObjectId::new("z")]);
    assert_eq!(restored.refined().facts.keys().collect::<Vec<_>>(), session.refined().facts.keys().collect::<Vec<_>>());
}

#[tokio::test]
async fn concurrent_executions_deduplicate() {
    init_tracing();
    let session = Session::new(SessionConfig::default(), seeded_store()).unwrap();
    let (a, b, c) = tokio::join!(
        session.execute(Search::object("threatActor", "APT1")),
        session.execute(Search::object("threatActor", "APT1")),
        session.execute(Search::object("report", "report-1")),
    );

    let added = [&a, &b, &c].iter().filter(|o| o.is_added()).count();
    assert_eq!(added, 2);
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.object_type_filters().len(), 3);
}
