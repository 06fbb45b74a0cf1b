use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::store::{
    CmpOp, CountQuery, FieldValue, Filter, FindQuery, GroupQuery, InsertQuery, Sort,
};

/// The operation a probe times, one variant per store call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(tag = "op", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProbeOp {
    Count(CountQuery),
    Find(FindQuery),
    GroupCount(GroupQuery),
    Insert(InsertQuery),
}

impl ProbeOp {
    /// Collection and filter to check the access plan of, for reads that filter.
    pub fn explain_target(&self) -> Option<(&str, &Filter)> {
        match self {
            Self::Count(q) => Some((&q.collection, &q.filter)),
            Self::Find(q) => Some((&q.collection, &q.filter)),
            Self::GroupCount(_) | Self::Insert(_) => None,
        }
    }

    /// Writes run once per benchmark, whatever the read iteration count.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Insert(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryProbe {
    pub name: String,
    #[serde(flatten)]
    pub op: ProbeOp,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_iterations() -> u32 {
    QueryProbe::DEFAULT_ITERATIONS
}

impl QueryProbe {
    pub const DEFAULT_ITERATIONS: u32 = 5;

    pub fn new(name: impl Into<String>, op: ProbeOp) -> Self {
        Self {
            name: name.into(),
            op,
            iterations: Self::DEFAULT_ITERATIONS,
        }
    }

    #[must_use]
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }
}

fn find(collection: &str, filter: Filter) -> FindQuery {
    FindQuery {
        collection: collection.to_string(),
        filter,
        sort: None,
        skip: None,
        limit: Some(50),
    }
}

fn count(collection: &str, filter: Filter) -> CountQuery {
    CountQuery {
        collection: collection.to_string(),
        filter,
    }
}

fn group(collection: &str, group_by: &str) -> GroupQuery {
    GroupQuery {
        collection: collection.to_string(),
        filter: Filter::all(),
        group_by: group_by.to_string(),
    }
}

/// Probes over the call-center collections: indexed status, date and account lookups,
/// an unindexed field, aggregations and one representative write.
pub fn call_center_probes(iterations: u32) -> Vec<QueryProbe> {
    let recent = FindQuery {
        sort: Some(Sort {
            field: "created_at".to_string(),
            descending: true,
        }),
        ..find(
            "calls",
            Filter::all().with("created_at", CmpOp::Gte, "2024-06-01"),
        )
    };
    let paged = FindQuery {
        skip: Some(100),
        ..find("orders", Filter::all().eq("status", "open"))
    };

    let record: BTreeMap<String, FieldValue> = [
        ("account_id", FieldValue::Int(1)),
        ("status", FieldValue::from("completed")),
        ("direction", FieldValue::from("inbound")),
        ("duration_sec", FieldValue::Int(95)),
        ("created_at", FieldValue::from("2024-12-31T23:59:00Z")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    vec![
        QueryProbe::new(
            "calls_by_status",
            ProbeOp::Find(find("calls", Filter::all().eq("status", "completed"))),
        ),
        QueryProbe::new("calls_recent", ProbeOp::Find(recent)),
        QueryProbe::new(
            "calls_by_account",
            ProbeOp::Find(find("calls", Filter::all().eq("account_id", 42i64))),
        ),
        QueryProbe::new(
            "calls_by_direction_unindexed",
            ProbeOp::Find(find("calls", Filter::all().eq("direction", "outbound"))),
        ),
        QueryProbe::new(
            "calls_missed_count",
            ProbeOp::Count(count("calls", Filter::all().eq("status", "missed"))),
        ),
        QueryProbe::new(
            "orders_by_account",
            ProbeOp::Find(find("orders", Filter::all().eq("account_id", 7i64))),
        ),
        QueryProbe::new("orders_open_page", ProbeOp::Find(paged)),
        QueryProbe::new(
            "orders_group_by_status",
            ProbeOp::GroupCount(group("orders", "status")),
        ),
        QueryProbe::new(
            "calls_group_by_direction",
            ProbeOp::GroupCount(group("calls", "direction")),
        ),
        QueryProbe::new(
            "accounts_active_count",
            ProbeOp::Count(count("accounts", Filter::all().eq("status", "active"))),
        ),
        QueryProbe::new(
            "calls_insert",
            ProbeOp::Insert(InsertQuery {
                collection: "calls".to_string(),
                record,
            }),
        ),
    ]
    .into_iter()
    .map(|p| {
        let n = if p.op.is_write() { 1 } else { iterations };
        p.iterations(n)
    })
    .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn catalog_has_a_single_shot_insert() {
        let probes = call_center_probes(10);
        let inserts: Vec<_> = probes
            .iter()
            .filter(|p| matches!(p.op, ProbeOp::Insert(_)))
            .collect();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].iterations, 1);
        assert!(
            probes
                .iter()
                .filter(|p| !matches!(p.op, ProbeOp::Insert(_)))
                .all(|p| p.iterations == 10)
        );
    }

    #[test]
    fn catalog_names_are_unique() {
        let probes = call_center_probes(3);
        let mut names: Vec<_> = probes.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), probes.len());
    }

    #[test]
    fn only_filtered_reads_are_explained() {
        let probes = call_center_probes(1);
        for p in &probes {
            let explained = p.op.explain_target().is_some();
            let read = matches!(p.op, ProbeOp::Find(_) | ProbeOp::Count(_));
            assert_eq!(explained, read, "{}", p.name);
        }
    }

    #[test]
    fn probe_parses_from_yaml_shape() {
        let p: QueryProbe = serde_json::from_value(serde_json::json!({
            "name": "by_status",
            "op": "count",
            "collection": "calls",
            "filter": {"conditions": [{"field": "status", "op": "eq", "value": "missed"}]}
        }))
        .unwrap();
        assert_eq!(p.iterations, QueryProbe::DEFAULT_ITERATIONS);
        assert_eq!(p.op.as_ref(), "count");
        let ProbeOp::Count(q) = p.op else {
            panic!("expected count");
        };
        assert_eq!(q.filter.conditions[0].value, FieldValue::from("missed"));
    }
}
