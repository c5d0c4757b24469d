// SPDX-License-Identifier: Apache-2.0

/// Counts the atomic records (spans, metric data points, log records) held by a node of a
/// telemetry batch.
pub trait BatchSizer {
    fn size_of(&self) -> usize;
}

pub trait BatchSplittable {
    /// Moves the first `split_n` records out of `self` into a new node that carries the same
    /// identity (resource, scope or metric descriptor). `self` keeps the remainder.
    fn split(&mut self, split_n: usize) -> Self
    where
        Self: Sized;
}

impl<T: BatchSizer> BatchSizer for [T] {
    fn size_of(&self) -> usize {
        self.iter().map(|n| n.size_of()).sum()
    }
}

/// Cuts `batch` after `target` records. The head holds the first `target` records in their
/// original resource and scope grouping, the tail holds everything else. A resource that
/// straddles the cut shows up on both sides, each copy holding only its share.
///
/// Resources left without records are dropped from both sides.
pub fn split_batch<T>(mut batch: Vec<T>, target: usize) -> (Vec<T>, Vec<T>)
where
    T: BatchSizer + BatchSplittable,
{
    let mut head = split_front(&mut batch, target);
    head.retain(|r| r.size_of() > 0);
    batch.retain(|r| r.size_of() > 0);
    (head, batch)
}

/// Removes the first `split_n` records from `items`. Whole items are moved while they fit,
/// the first item that doesn't fit is split.
pub(crate) fn split_front<T>(items: &mut Vec<T>, split_n: usize) -> Vec<T>
where
    T: BatchSizer + BatchSplittable,
{
    let mut count_moved = 0;
    let mut whole = 0;
    for item in items.iter() {
        if count_moved >= split_n {
            break;
        }
        let n = item.size_of();
        if count_moved + n > split_n {
            break;
        }
        count_moved += n;
        whole += 1;
    }

    let mut head: Vec<T> = items.drain(..whole).collect();
    if count_moved < split_n {
        if let Some(first) = items.first_mut() {
            head.push(first.split(split_n - count_moved));
        }
    }
    head
}

/// Removes up to `n` leaf records from the front of `records`.
pub(crate) fn drain_front<T>(records: &mut Vec<T>, n: usize) -> Vec<T> {
    let n = n.min(records.len());
    records.drain(..n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
    use utilities::otlp::FakeOTLP;

    // Three resources holding 4 spans each, names are unique across the batch.
    fn numbered_spans() -> Vec<ResourceSpans> {
        let mut batch = FakeOTLP::trace_service_request_with_spans(3, 4).resource_spans;
        for (r, rs) in batch.iter_mut().enumerate() {
            for span in rs.scope_spans.iter_mut().flat_map(|ss| ss.spans.iter_mut()) {
                span.name = format!("r{}-{}", r, span.name);
            }
        }
        batch
    }

    fn span_names(batch: &[ResourceSpans]) -> Vec<String> {
        batch
            .iter()
            .flat_map(|rs| &rs.scope_spans)
            .flat_map(|ss| &ss.spans)
            .map(|s| s.name.clone())
            .collect()
    }

    #[test]
    fn test_split_conserves_records() {
        let original = numbered_spans();
        let names = span_names(&original);
        for target in 0..=names.len() + 2 {
            let (head, tail) = split_batch(original.clone(), target);
            let expected_head = target.min(names.len());
            assert_eq!(expected_head, head.size_of());
            assert_eq!(names.len(), head.size_of() + tail.size_of());

            let mut rejoined = span_names(&head);
            rejoined.extend(span_names(&tail));
            assert_eq!(names, rejoined);
        }
    }

    #[test]
    fn test_split_zero_target() {
        let (head, tail) = split_batch(numbered_spans(), 0);
        assert!(head.is_empty());
        assert_eq!(3, tail.len());
        assert_eq!(12, tail.size_of());
    }

    #[test]
    fn test_split_past_total() {
        let (head, tail) = split_batch(numbered_spans(), 100);
        assert_eq!(3, head.len());
        assert_eq!(12, head.size_of());
        assert!(tail.is_empty());
    }

    #[test]
    fn test_split_mid_resource_keeps_identity() {
        let original = numbered_spans();
        let (head, tail) = split_batch(original.clone(), 6);

        // Resource 1 straddles the cut
        assert_eq!(2, head.len());
        assert_eq!(2, tail.len());
        assert_eq!(original[1].resource, head[1].resource);
        assert_eq!(original[1].resource, tail[0].resource);
        assert_eq!(
            original[1].scope_spans[0].scope,
            tail[0].scope_spans[0].scope
        );
        assert_eq!(2, head[1].size_of());
        assert_eq!(2, tail[0].size_of());
    }

    #[test]
    fn test_split_on_resource_boundary_leaves_no_empty_resource() {
        let (head, tail) = split_batch(numbered_spans(), 4);
        assert_eq!(1, head.len());
        assert_eq!(2, tail.len());
        assert!(head.iter().chain(tail.iter()).all(|rs| rs.size_of() > 0));
    }

    #[test]
    fn test_split_drops_empty_resources() {
        let mut batch = numbered_spans();
        batch[1].scope_spans.clear();
        let (head, tail) = split_batch(batch, 2);
        assert_eq!(1, head.len());
        assert_eq!(2, tail.len());
        assert_eq!(8, head.size_of() + tail.size_of());
    }
}
