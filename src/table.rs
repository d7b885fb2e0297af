//! Tabular projection of a result: one row per object.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{ActObject, ObjectId, SearchResult};

/// Column a table can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    ObjectType,
    ObjectValue,
    Properties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOrder {
    pub order_by: ColumnKind,
    pub order: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            order_by: ColumnKind::ObjectType,
            order: SortDirection::Asc,
        }
    }
}

impl SortOrder {
    #[must_use]
    pub const fn new(order_by: ColumnKind, order: SortDirection) -> Self {
        Self { order_by, order }
    }

    /// Clicking the current column flips its direction; another column
    /// starts ascending.
    #[must_use]
    pub fn toggle(self, kind: ColumnKind) -> Self {
        if self.order_by == kind {
            Self::new(kind, self.order.flip())
        } else {
            Self::new(kind, SortDirection::Asc)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub label: String,
    pub kind: ColumnKind,
}

/// The `Type`, `Value` and `Properties` columns.
#[must_use]
pub fn default_columns() -> Vec<Column> {
    [
        ("Type", ColumnKind::ObjectType),
        ("Value", ColumnKind::ObjectValue),
        ("Properties", ColumnKind::Properties),
    ]
    .into_iter()
    .map(|(label, kind)| Column {
        label: label.to_string(),
        kind,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRow {
    pub key: String,
    /// Type display name.
    pub title: String,
    pub is_selected: bool,
    pub object: ActObject,
    /// `(fact type name, value)` of one-legged facts on this object.
    pub properties: Vec<(String, String)>,
}

impl ObjectRow {
    /// Properties rendered as `name: value` lines.
    #[must_use]
    pub fn properties_text(&self) -> String {
        self.properties
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn sort_key(&self, order_by: ColumnKind) -> String {
        match order_by {
            ColumnKind::ObjectType => self.title.clone(),
            ColumnKind::ObjectValue => self.object.value.clone(),
            ColumnKind::Properties => self.properties_text(),
        }
    }
}

fn properties_of(result: &SearchResult) -> BTreeMap<&ObjectId, Vec<(String, String)>> {
    let mut properties: BTreeMap<&ObjectId, Vec<(String, String)>> = BTreeMap::new();
    for fact in result.facts.values() {
        let Some((_, object)) = fact.single_leg() else {
            continue;
        };
        let Some(value) = fact.value.as_ref() else {
            continue;
        };
        properties
            .entry(&object.id)
            .or_default()
            .push((fact.fact_type.name.clone(), value.clone()));
    }
    for list in properties.values_mut() {
        list.sort();
    }
    properties
}

/// One row per object whose type name is not in `excluded_types`, sorted by
/// `sort` with ties broken by object id ascending.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use factscope::{result_to_rows, SearchResult, SortOrder};
///
/// let rows = result_to_rows(&SearchResult::new(), &HashSet::new(), &HashSet::new(), SortOrder::default());
/// assert!(rows.is_empty());
/// ```
#[must_use]
pub fn result_to_rows(
    result: &SearchResult,
    excluded_types: &HashSet<String>,
    selected: &HashSet<ObjectId>,
    sort: SortOrder,
) -> Vec<ObjectRow> {
    let mut properties = properties_of(result);
    // Keys are built once per row; the properties key is a rendered string.
    let mut keyed: Vec<(String, ObjectRow)> = result
        .objects
        .values()
        .filter(|o| !excluded_types.contains(o.type_name()))
        .map(|o| ObjectRow {
            key: o.id.as_str().to_string(),
            title: o.type_name().to_string(),
            is_selected: selected.contains(&o.id),
            object: o.clone(),
            properties: properties.remove(&o.id).unwrap_or_default(),
        })
        .map(|row| (row.sort_key(sort.order_by), row))
        .collect();

    keyed.sort_by(|(a_key, a), (b_key, b)| {
        let primary = match sort.order {
            SortDirection::Asc => a_key.cmp(b_key),
            SortDirection::Desc => b_key.cmp(a_key),
        };
        primary.then_with(|| a.key.cmp(&b.key))
    });
    keyed.into_iter().map(|(_, row)| row).collect()
}

/// Type names of the objects in `result`, for building an exclusion set.
#[must_use]
pub fn object_type_names(result: &SearchResult) -> BTreeSet<String> {
    result
        .objects
        .values()
        .map(|o| o.type_name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::model::{ActFact, NamedId};

    fn apt1() -> SearchResult {
        SearchResult::from_parts(
            Vec::new(),
            vec![
                ActObject::new("x", NamedId::new("t1", "threatActor"), "APT1"),
                ActObject::new("y", NamedId::new("t2", "report"), "report-1"),
            ],
        )
    }

    fn keys(rows: &[ObjectRow]) -> Vec<&str> {
        rows.iter().map(|r| r.key.as_str()).collect()
    }

    #[test]
    fn test_rows_sorted_by_type_ascending() {
        let rows = result_to_rows(&apt1(), &HashSet::new(), &HashSet::new(), SortOrder::default());
        let titles: Vec<&str> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["report", "threatActor"]);
        assert!(rows.iter().all(|r| !r.is_selected));
    }

    #[test]
    fn test_excluded_type_is_dropped() {
        let excluded = HashSet::from(["threatActor".to_string()]);
        let rows = result_to_rows(&apt1(), &excluded, &HashSet::new(), SortOrder::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "report");
    }

    #[test]
    fn test_selection_is_reflected() {
        let selected = HashSet::from([ObjectId::new("x")]);
        let rows = result_to_rows(&apt1(), &HashSet::new(), &selected, SortOrder::default());
        assert!(!rows[0].is_selected);
        assert!(rows[1].is_selected);
    }

    #[test]
    fn test_descending_and_value_sort() {
        let desc = SortOrder::new(ColumnKind::ObjectType, SortDirection::Desc);
        let rows = result_to_rows(&apt1(), &HashSet::new(), &HashSet::new(), desc);
        assert_eq!(keys(&rows), vec!["x", "y"]);

        let by_value = SortOrder::new(ColumnKind::ObjectValue, SortDirection::Asc);
        let rows = result_to_rows(&apt1(), &HashSet::new(), &HashSet::new(), by_value);
        assert_eq!(keys(&rows), vec!["x", "y"]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let result = SearchResult::from_parts(
            Vec::new(),
            vec![
                ActObject::new("b", NamedId::new("t1", "tool"), "same"),
                ActObject::new("a", NamedId::new("t1", "tool"), "same"),
                ActObject::new("c", NamedId::new("t1", "tool"), "same"),
            ],
        );
        for order in [SortDirection::Asc, SortDirection::Desc] {
            let rows = result_to_rows(
                &result,
                &HashSet::new(),
                &HashSet::new(),
                SortOrder::new(ColumnKind::ObjectValue, order),
            );
            assert_eq!(keys(&rows), vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn test_properties_from_one_legged_facts() {
        let actor = ActObject::new("x", NamedId::new("t1", "threatActor"), "APT1");
        let facts = vec![
            ActFact::new("f1", NamedId::new("ft1", "name"), Utc::now())
                .with_value("Comment Crew")
                .with_source(actor.clone()),
            ActFact::new("f2", NamedId::new("ft2", "alias"), Utc::now())
                .with_value("Byzantine Candor")
                .with_destination(actor.clone()),
        ];
        let result = SearchResult::from_parts(facts, vec![actor]);
        let rows = result_to_rows(&result, &HashSet::new(), &HashSet::new(), SortOrder::default());
        assert_eq!(
            rows[0].properties,
            vec![
                ("alias".to_string(), "Byzantine Candor".to_string()),
                ("name".to_string(), "Comment Crew".to_string()),
            ]
        );
        assert_eq!(rows[0].properties_text(), "alias: Byzantine Candor\nname: Comment Crew");
    }

    #[test]
    fn test_sort_by_rendered_properties() {
        let objects: Vec<ActObject> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| ActObject::new(id, NamedId::new("t1", "tool"), id))
            .collect();
        let facts = vec![
            ActFact::new("f1", NamedId::new("ft1", "name"), Utc::now())
                .with_value("Zed")
                .with_source(objects[1].clone()),
            ActFact::new("f2", NamedId::new("ft2", "alias"), Utc::now())
                .with_value("Q")
                .with_source(objects[2].clone()),
        ];
        let result = SearchResult::from_parts(facts, objects);

        let asc = SortOrder::new(ColumnKind::Properties, SortDirection::Asc);
        let rows = result_to_rows(&result, &HashSet::new(), &HashSet::new(), asc);
        assert_eq!(keys(&rows), vec!["a", "d", "c", "b"]);

        let desc = SortOrder::new(ColumnKind::Properties, SortDirection::Desc);
        let rows = result_to_rows(&result, &HashSet::new(), &HashSet::new(), desc);
        assert_eq!(keys(&rows), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_sort_order_toggle() {
        let order = SortOrder::default();
        let flipped = order.toggle(ColumnKind::ObjectType);
        assert_eq!(flipped.order, SortDirection::Desc);
        let other = flipped.toggle(ColumnKind::Properties);
        assert_eq!(other, SortOrder::new(ColumnKind::Properties, SortDirection::Asc));
    }

    #[test]
    fn test_default_columns() {
        let labels: Vec<String> = default_columns().into_iter().map(|c| c.label).collect();
        assert_eq!(labels, vec!["Type", "Value", "Properties"]);
        assert_eq!(object_type_names(&apt1()).len(), 2);
    }
}
