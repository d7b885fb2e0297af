//! # factscope - Fact Graph Analysis Sessions
//!
//! factscope turns searches against a fact/object store into an analyst's
//! working view: executed searches are cached in a deduplicated history,
//! their results are merged, filtered, and projected into a graph model and
//! object tables for a renderer.
//!
//! ## Core Concepts
//!
//! - **Object**: a typed value in the domain graph, identified by id
//! - **Fact**: a typed statement linking zero, one or two objects, or
//!   annotating another fact
//! - **Query History**: ordered, deduplicated cache of executed searches
//! - **Refinery**: retraction, object type and time filters over the
//!   cumulative result
//! - **Projectors**: pure graph and table views of a result
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use factscope::{InMemoryFactStore, Search, Session, SessionConfig, SortOrder};
//!
//! let store = Arc::new(InMemoryFactStore::new());
//! let session = Session::new(SessionConfig::default(), store)?;
//!
//! session.execute(Search::object("threatActor", "APT1")).await;
//! let graph = session.graph();
//! let rows = session.table(SortOrder::default());
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod model;
pub mod search;
pub mod time;

// Resolution and history
pub mod history;
pub mod resolver;

// Derived views
pub mod graph;
pub mod refinery;
pub mod table;

// Session
pub mod config;
pub mod export;
pub mod session;

// Re-export primary types at crate root for convenience
pub use config::{SessionConfig, EXPORT_VERSION};
pub use error::{ScopeError, ScopeResult, SearchError, ValidationError};
pub use export::StateExport;
pub use graph::{
    project, Edge, FactNode, FactTypeLabel, GraphElement, GraphModel, ObjectLabel, ObjectNode, Selection,
    SelectionKind, ValueLabel,
};
pub use history::{ExecuteOutcome, QueryHistory, DEFAULT_MAX_FETCH_LIMIT};
pub use model::{
    ActFact, ActObject, FactId, FactReference, Leg, NamedId, ObjectId, ObjectStats, SearchResult, RETRACTED_FLAG,
    RETRACTION_FACT_TYPE,
};
pub use refinery::{refine_result, time_range, ObjectTypeFilter, Refinery};
pub use resolver::{InMemoryFactStore, ResolveError, ResolvedData, SearchResolver};
pub use search::{ObjectFactsSearch, Query, QueryId, Search, SingleFactSearch};
pub use session::Session;
pub use table::{default_columns, result_to_rows, Column, ColumnKind, ObjectRow, SortDirection, SortOrder};
pub use time::{TimeHorizon, TimeRange, TimeUnit, ANY_TIME};
