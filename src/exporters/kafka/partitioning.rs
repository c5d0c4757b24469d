// SPDX-License-Identifier: Apache-2.0

//! Message keys and per-key grouping for the OTLP encodings.

use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value::Value};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

/// Message key for a resource: hex of its attribute hash, `None` when it has no attributes.
pub fn resource_attributes_key(resource: Option<&Resource>) -> Option<String> {
    let attributes = &resource?.attributes;
    if attributes.is_empty() {
        return None;
    }
    Some(hex::encode(
        resource_attributes_hash(attributes).to_be_bytes(),
    ))
}

/// Deterministic hash of resource attributes.
/// Maps with the same key/value pairs in different order produce the same hash.
pub fn resource_attributes_hash(attributes: &[KeyValue]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_key_values(&mut hasher, attributes);
    hasher.finish()
}

// Each value is hashed on its own and the (key, value hash) pairs are fed in key order.
fn hash_key_values<H: Hasher>(hasher: &mut H, kvs: &[KeyValue]) {
    let sorted: BTreeMap<&str, u64> = kvs
        .iter()
        .map(|kv| {
            let mut value_hasher = DefaultHasher::new();
            hash_any_value(&mut value_hasher, kv.value.as_ref());
            (kv.key.as_str(), value_hasher.finish())
        })
        .collect();

    sorted.len().hash(hasher);
    for (key, value_hash) in sorted {
        key.hash(hasher);
        value_hash.hash(hasher);
    }
}

fn hash_any_value<H: Hasher>(hasher: &mut H, value: Option<&AnyValue>) {
    match value.and_then(|v| v.value.as_ref()) {
        Some(Value::StringValue(s)) => {
            "string".hash(hasher);
            s.hash(hasher);
        }
        Some(Value::BoolValue(b)) => {
            "bool".hash(hasher);
            b.hash(hasher);
        }
        Some(Value::IntValue(i)) => {
            "int".hash(hasher);
            i.hash(hasher);
        }
        Some(Value::DoubleValue(d)) => {
            "double".hash(hasher);
            d.to_bits().hash(hasher);
        }
        Some(Value::BytesValue(b)) => {
            "bytes".hash(hasher);
            b.hash(hasher);
        }
        // Array order is significant
        Some(Value::ArrayValue(arr)) => {
            "array".hash(hasher);
            arr.values.len().hash(hasher);
            for v in &arr.values {
                hash_any_value(hasher, Some(v));
            }
        }
        Some(Value::KvlistValue(kvlist)) => {
            "kvlist".hash(hasher);
            hash_key_values(hasher, &kvlist.values);
        }
        None => {
            "empty".hash(hasher);
        }
    }
}

struct TraceGroup {
    key: String,
    resources: Vec<ResourceSpans>,
    last_resource: usize,
    last_scope: usize,
}

/// Regroups spans by trace id, in order of first appearance. Each group keeps the resource and
/// scope structure its spans came from and is keyed by the lowercase hex trace id.
pub fn group_by_trace_id(batch: &[ResourceSpans]) -> Vec<(String, Vec<ResourceSpans>)> {
    let mut groups: Vec<TraceGroup> = Vec::new();
    let mut index: HashMap<&[u8], usize> = HashMap::new();

    for (ri, rs) in batch.iter().enumerate() {
        for (si, ss) in rs.scope_spans.iter().enumerate() {
            for span in &ss.spans {
                let gi = *index.entry(span.trace_id.as_slice()).or_insert_with(|| {
                    groups.push(TraceGroup {
                        key: hex::encode(&span.trace_id),
                        resources: Vec::new(),
                        last_resource: usize::MAX,
                        last_scope: usize::MAX,
                    });
                    groups.len() - 1
                });
                let group = &mut groups[gi];

                if group.last_resource != ri {
                    group.resources.push(ResourceSpans {
                        resource: rs.resource.clone(),
                        scope_spans: Vec::new(),
                        schema_url: rs.schema_url.clone(),
                    });
                    group.last_resource = ri;
                    group.last_scope = usize::MAX;
                }
                let resource_idx = group.resources.len() - 1;
                let scopes = &mut group.resources[resource_idx].scope_spans;

                if group.last_scope != si {
                    scopes.push(ScopeSpans {
                        scope: ss.scope.clone(),
                        spans: Vec::new(),
                        schema_url: ss.schema_url.clone(),
                    });
                    group.last_scope = si;
                }
                let scope_idx = scopes.len() - 1;
                scopes[scope_idx].spans.push(span.clone());
            }
        }
    }

    groups.into_iter().map(|g| (g.key, g.resources)).collect()
}
