//! Graph entity model: objects, facts and keyed result sets.
//!
//! Pure data. Behavior lives in the history, refinery and projectors.

mod fact;
mod object;
mod result;

pub use fact::{ActFact, FactId, FactReference, Leg, RETRACTED_FLAG, RETRACTION_FACT_TYPE};
pub use object::{ActObject, NamedId, ObjectId, ObjectStats};
pub use result::{objects_of_facts, SearchResult};
