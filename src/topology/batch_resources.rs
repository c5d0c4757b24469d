// SPDX-License-Identifier: Apache-2.0

use opentelemetry_proto::tonic::{
    logs::v1::{ResourceLogs, ScopeLogs},
    metrics::v1::{
        ExponentialHistogram, Gauge, Histogram, Metric, ResourceMetrics, ScopeMetrics, Sum,
        Summary, metric::Data,
    },
    trace::v1::{ResourceSpans, ScopeSpans},
};

use crate::topology::batch::{BatchSizer, BatchSplittable, drain_front, split_front};

impl BatchSizer for ResourceSpans {
    fn size_of(&self) -> usize {
        self.scope_spans.size_of()
    }
}

impl BatchSizer for ScopeSpans {
    fn size_of(&self) -> usize {
        self.spans.len()
    }
}

impl BatchSplittable for ResourceSpans {
    fn split(&mut self, split_n: usize) -> Self {
        ResourceSpans {
            scope_spans: split_front(&mut self.scope_spans, split_n),
            schema_url: self.schema_url.clone(),
            resource: self.resource.clone(),
        }
    }
}

impl BatchSplittable for ScopeSpans {
    fn split(&mut self, split_n: usize) -> Self {
        ScopeSpans {
            spans: drain_front(&mut self.spans, split_n),
            scope: self.scope.clone(),
            schema_url: self.schema_url.clone(),
        }
    }
}

impl BatchSizer for ResourceMetrics {
    fn size_of(&self) -> usize {
        self.scope_metrics.size_of()
    }
}

impl BatchSizer for ScopeMetrics {
    fn size_of(&self) -> usize {
        self.metrics.size_of()
    }
}

// Data points are the atomic unit for metrics
impl BatchSizer for Metric {
    fn size_of(&self) -> usize {
        match &self.data {
            None => 0,
            Some(d) => match d {
                Data::Gauge(g) => g.data_points.len(),
                Data::Sum(s) => s.data_points.len(),
                Data::Histogram(h) => h.data_points.len(),
                Data::ExponentialHistogram(e) => e.data_points.len(),
                Data::Summary(s) => s.data_points.len(),
            },
        }
    }
}

impl BatchSplittable for ResourceMetrics {
    fn split(&mut self, split_n: usize) -> Self {
        ResourceMetrics {
            scope_metrics: split_front(&mut self.scope_metrics, split_n),
            schema_url: self.schema_url.clone(),
            resource: self.resource.clone(),
        }
    }
}

impl BatchSplittable for ScopeMetrics {
    fn split(&mut self, split_n: usize) -> Self {
        ScopeMetrics {
            metrics: split_front(&mut self.metrics, split_n),
            scope: self.scope.clone(),
            schema_url: self.schema_url.clone(),
        }
    }
}

impl BatchSplittable for Metric {
    /// Splits the data points of this metric. The descriptor (name, unit, temporality,
    /// monotonicity) is copied to the new metric.
    fn split(&mut self, split_n: usize) -> Self {
        let data = self.data.as_mut().map(|d| match d {
            Data::Gauge(g) => Data::Gauge(Gauge {
                data_points: drain_front(&mut g.data_points, split_n),
            }),
            Data::Sum(s) => Data::Sum(Sum {
                data_points: drain_front(&mut s.data_points, split_n),
                aggregation_temporality: s.aggregation_temporality,
                is_monotonic: s.is_monotonic,
            }),
            Data::Histogram(h) => Data::Histogram(Histogram {
                data_points: drain_front(&mut h.data_points, split_n),
                aggregation_temporality: h.aggregation_temporality,
            }),
            Data::ExponentialHistogram(e) => Data::ExponentialHistogram(ExponentialHistogram {
                data_points: drain_front(&mut e.data_points, split_n),
                aggregation_temporality: e.aggregation_temporality,
            }),
            Data::Summary(s) => Data::Summary(Summary {
                data_points: drain_front(&mut s.data_points, split_n),
            }),
        });
        Metric {
            name: self.name.clone(),
            description: self.description.clone(),
            unit: self.unit.clone(),
            metadata: self.metadata.clone(),
            data,
        }
    }
}

impl BatchSizer for ResourceLogs {
    fn size_of(&self) -> usize {
        self.scope_logs.size_of()
    }
}

impl BatchSizer for ScopeLogs {
    fn size_of(&self) -> usize {
        self.log_records.len()
    }
}

impl BatchSplittable for ResourceLogs {
    fn split(&mut self, split_n: usize) -> Self {
        ResourceLogs {
            scope_logs: split_front(&mut self.scope_logs, split_n),
            schema_url: self.schema_url.clone(),
            resource: self.resource.clone(),
        }
    }
}

impl BatchSplittable for ScopeLogs {
    fn split(&mut self, split_n: usize) -> Self {
        ScopeLogs {
            log_records: drain_front(&mut self.log_records, split_n),
            scope: self.scope.clone(),
            schema_url: self.schema_url.clone(),
        }
    }
}
