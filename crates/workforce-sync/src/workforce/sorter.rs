//! Orders a provider batch so that managers are reconciled before their reports.

use std::collections::HashMap;

use super::domain::{ExternalEmployee, ExternalEmployeeId};

/// Sorter output. `records` holds every unique record of the input.
#[derive(Debug, Clone, Default)]
pub struct SortedBatch {
    pub records: Vec<ExternalEmployee>,
    /// Manager cycles found in the batch, each listed in walk order starting
    /// from the member seen first in the input.
    pub cycles: Vec<Vec<ExternalEmployeeId>>,
    /// Later records that reused an external id already present in the batch.
    pub duplicates: Vec<ExternalEmployee>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Sorts a batch so every in-batch manager precedes its direct reports.
///
/// Each record has at most one manager, so the depth-first visit is a walk up the
/// manager chain. Walks start from records in input order. A reference back into
/// the chain being walked is a cycle: the walk stops there and the chain is emitted
/// top-down, which places the cycle's first-seen member after the rest of the cycle.
/// Managers outside the batch end the walk; the reconciler resolves them from storage.
pub fn sort_by_manager(batch: Vec<ExternalEmployee>) -> SortedBatch {
    let mut unique: Vec<ExternalEmployee> = Vec::with_capacity(batch.len());
    let mut duplicates = Vec::new();
    let mut index: HashMap<ExternalEmployeeId, usize> = HashMap::with_capacity(batch.len());

    for record in batch {
        if index.contains_key(&record.id) {
            duplicates.push(record);
            continue;
        }
        index.insert(record.id.clone(), unique.len());
        unique.push(record);
    }

    let managers: Vec<Option<usize>> = unique
        .iter()
        .map(|record| {
            record
                .manager_ref()
                .and_then(|manager| index.get(&manager).copied())
        })
        .collect();

    let mut state = vec![Visit::Unvisited; unique.len()];
    let mut order: Vec<usize> = Vec::with_capacity(unique.len());
    let mut cycles = Vec::new();

    for start in 0..unique.len() {
        if state[start] != Visit::Unvisited {
            continue;
        }

        let mut chain: Vec<usize> = Vec::new();
        let mut cursor = Some(start);

        while let Some(current) = cursor {
            match state[current] {
                Visit::Unvisited => {
                    state[current] = Visit::InProgress;
                    chain.push(current);
                    cursor = managers[current];
                }
                Visit::InProgress => {
                    if let Some(position) = chain.iter().position(|&node| node == current) {
                        cycles.push(
                            chain[position..]
                                .iter()
                                .map(|&node| unique[node].id.clone())
                                .collect(),
                        );
                    }
                    cursor = None;
                }
                Visit::Done => cursor = None,
            }
        }

        for &node in chain.iter().rev() {
            state[node] = Visit::Done;
            order.push(node);
        }
    }

    let mut slots: Vec<Option<ExternalEmployee>> = unique.into_iter().map(Some).collect();
    let records = order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect();

    SortedBatch {
        records,
        cycles,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(id: &str, manager: Option<&str>) -> ExternalEmployee {
        ExternalEmployee {
            id: ExternalEmployeeId::from(id),
            remote_id: format!("R-{id}"),
            first_name: id.to_uppercase(),
            last_name: "Tester".to_string(),
            work_email: format!("{id}@example.com"),
            personal_email: None,
            mobile_phone_number: None,
            manager: manager.map(str::to_string),
            job_title: None,
            employment_status: None,
            team: None,
            work_location: None,
            raw: Value::Null,
        }
    }

    fn ids(sorted: &SortedBatch) -> Vec<&str> {
        sorted.records.iter().map(|record| record.id.as_str()).collect()
    }

    fn position(sorted: &SortedBatch, id: &str) -> usize {
        sorted
            .records
            .iter()
            .position(|record| record.id.as_str() == id)
            .expect("record present")
    }

    #[test]
    fn manager_precedes_report_given_in_reverse() {
        let sorted = sort_by_manager(vec![record("e2", Some("e1")), record("e1", None)]);
        assert_eq!(ids(&sorted), vec!["e1", "e2"]);
        assert!(sorted.cycles.is_empty());
    }

    #[test]
    fn deep_chain_is_ordered_top_down() {
        let sorted = sort_by_manager(vec![
            record("d", Some("c")),
            record("b", Some("a")),
            record("c", Some("b")),
            record("a", None),
        ]);
        assert_eq!(ids(&sorted), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn every_in_batch_manager_precedes_its_reports() {
        let batch = vec![
            record("ic1", Some("lead1")),
            record("lead2", Some("vp")),
            record("ic2", Some("lead2")),
            record("vp", Some("ceo")),
            record("lead1", Some("vp")),
            record("ceo", None),
            record("ic3", Some("lead1")),
        ];
        let sorted = sort_by_manager(batch.clone());
        assert_eq!(sorted.records.len(), batch.len());

        for report in &batch {
            if let Some(manager) = report.manager.as_deref() {
                assert!(
                    position(&sorted, manager) < position(&sorted, report.id.as_str()),
                    "{manager} should precede {}",
                    report.id
                );
            }
        }
    }

    #[test]
    fn out_of_batch_manager_does_not_block_record() {
        let sorted = sort_by_manager(vec![record("e5", Some("synced-last-week"))]);
        assert_eq!(ids(&sorted), vec!["e5"]);
        assert!(sorted.cycles.is_empty());
    }

    #[test]
    fn cycle_is_detected_and_every_member_emitted() {
        let sorted = sort_by_manager(vec![
            record("a", Some("b")),
            record("b", Some("a")),
            record("x", Some("a")),
        ]);

        assert_eq!(
            sorted.cycles,
            vec![vec![ExternalEmployeeId::from("a"), ExternalEmployeeId::from("b")]]
        );
        assert_eq!(ids(&sorted), vec!["b", "a", "x"]);
    }

    #[test]
    fn self_reference_is_not_a_cycle_member() {
        let sorted = sort_by_manager(vec![record("solo", Some("solo"))]);
        assert_eq!(ids(&sorted), vec!["solo"]);
        assert!(sorted.cycles.is_empty());
    }

    #[test]
    fn reports_hanging_off_a_cycle_follow_it() {
        let sorted = sort_by_manager(vec![
            record("r", Some("c")),
            record("a", Some("c")),
            record("c", Some("a")),
        ]);
        assert_eq!(sorted.cycles.len(), 1);
        assert!(position(&sorted, "c") < position(&sorted, "r"));
        assert_eq!(sorted.records.len(), 3);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let mut second = record("e1", None);
        second.first_name = "Later".to_string();
        let sorted = sort_by_manager(vec![record("e1", None), second]);

        assert_eq!(sorted.records.len(), 1);
        assert_eq!(sorted.records[0].first_name, "E1");
        assert_eq!(sorted.duplicates.len(), 1);
        assert_eq!(sorted.duplicates[0].first_name, "Later");
    }

    #[test]
    fn empty_batch_sorts_to_empty() {
        let sorted = sort_by_manager(Vec::new());
        assert!(sorted.records.is_empty());
        assert!(sorted.cycles.is_empty());
        assert!(sorted.duplicates.is_empty());
    }
}
