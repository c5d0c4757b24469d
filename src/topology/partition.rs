// SPDX-License-Identifier: Apache-2.0

use crate::topology::batch::{BatchSizer, BatchSplittable, split_batch};

/// Cuts `batch` into sub-batches holding at most `max_unit_count` records each.
///
/// The input is always cut at least once, even when it is already within the ceiling. Every
/// cut takes `split_size` records off the front of a batch. A head still over the ceiling is
/// cut again at half the granularity, a tail still over the ceiling is worked on at the same
/// granularity. A batch no larger than the current granularity has the granularity halved
/// before it is cut, so every cut makes progress. Granularity never drops below one record.
///
/// Sub-batches come out head before tail at every level, so concatenating them restores the
/// original record order. Batches without records produce nothing.
pub fn partition_by_count<T>(batch: Vec<T>, split_size: usize, max_unit_count: usize) -> Vec<Vec<T>>
where
    T: BatchSizer + BatchSplittable,
{
    let max_unit_count = max_unit_count.max(1);
    let mut parts = Vec::new();

    // Popped from the back, so the tail is pushed before its head. Only the input itself
    // is cut regardless of the ceiling.
    let mut pending = vec![(batch, split_size.max(1), true)];
    while let Some((batch, mut split_size, force_cut)) = pending.pop() {
        let count = batch.size_of();
        if count == 0 {
            continue;
        }
        if !force_cut && count <= max_unit_count {
            parts.push(batch);
            continue;
        }

        while count <= split_size && split_size > 1 {
            split_size /= 2;
        }

        let (head, tail) = split_batch(batch, split_size);
        pending.push((tail, split_size, false));
        pending.push((head, (split_size / 2).max(1), false));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
    use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
    use utilities::otlp::FakeOTLP;

    fn span_names(parts: &[Vec<ResourceSpans>]) -> Vec<String> {
        parts
            .iter()
            .flatten()
            .flat_map(|rs| &rs.scope_spans)
            .flat_map(|ss| &ss.spans)
            .map(|s| s.name.clone())
            .collect()
    }

    #[test]
    fn test_partition_max_span_count() {
        let td = FakeOTLP::trace_service_request_with_spans(1, 20).resource_spans;
        let parts = partition_by_count(td, 5, 2);

        let total: usize = parts.iter().map(|p| p.size_of()).sum();
        assert_eq!(20, total);
        assert!(parts.iter().all(|p| p.size_of() <= 2));
    }

    #[test]
    fn test_partition_bound_holds() {
        let td = FakeOTLP::trace_service_request_with_spans(3, 11).resource_spans;
        for max_unit_count in 1..=35 {
            for split_size in [1, 2, 3, 7, 16, 33, 64] {
                let parts = partition_by_count(td.clone(), split_size, max_unit_count);
                let total: usize = parts.iter().map(|p| p.size_of()).sum();
                assert_eq!(33, total);
                assert!(
                    parts
                        .iter()
                        .all(|p| p.size_of() >= 1 && p.size_of() <= max_unit_count)
                );
            }
        }
    }

    #[test]
    fn test_partition_preserves_record_order() {
        let mut td = FakeOTLP::trace_service_request_with_spans(2, 9).resource_spans;
        for (r, rs) in td.iter_mut().enumerate() {
            for span in rs.scope_spans.iter_mut().flat_map(|ss| ss.spans.iter_mut()) {
                span.name = format!("r{}-{}", r, span.name);
            }
        }
        let expected = span_names(&[td.clone()]);

        let parts = partition_by_count(td, 4, 3);
        assert_eq!(expected, span_names(&parts));
    }

    #[test]
    fn test_partition_keeps_resource_identity() {
        let td = FakeOTLP::trace_service_request_with_spans(2, 5).resource_spans;
        let resource = td[0].resource.clone();
        let parts = partition_by_count(td, 3, 2);
        assert!(parts.iter().flatten().all(|rs| rs.resource == resource));
        assert!(parts.iter().flatten().all(|rs| rs.size_of() > 0));
    }

    #[test]
    fn test_partition_under_ceiling_is_still_cut() {
        let td = FakeOTLP::trace_service_request_with_spans(1, 20).resource_spans;
        let parts = partition_by_count(td, 5, 25);

        let counts: Vec<usize> = parts.iter().map(|p| p.size_of()).collect();
        assert_eq!(vec![5, 15], counts);
    }

    #[test]
    fn test_partition_small_input_halves_before_cut() {
        let logs = FakeOTLP::logs_service_request_with_logs(2, 3).resource_logs;
        let parts = partition_by_count(logs, 8, 6);

        // 6 records at granularity 8 halve to 4 before the first cut
        let counts: Vec<usize> = parts.iter().map(|p| p.size_of()).collect();
        assert_eq!(vec![4, 2], counts);
    }

    #[test]
    fn test_partition_single_record() {
        let logs = FakeOTLP::logs_service_request_with_logs(1, 1).resource_logs;
        let parts = partition_by_count(logs, 3, 1);
        assert_eq!(1, parts.len());
        assert_eq!(1, parts[0].size_of());
    }

    #[test]
    fn test_partition_zero_granularity_terminates() {
        let logs = FakeOTLP::logs_service_request_with_logs(1, 9).resource_logs;
        let parts = partition_by_count(logs, 0, 0);
        assert_eq!(9, parts.len());
        assert!(parts.iter().all(|p| p.size_of() == 1));
    }

    #[test]
    fn test_partition_empty_batch() {
        let parts = partition_by_count(Vec::<ResourceLogs>::new(), 4, 2);
        assert!(parts.is_empty());
    }
}
