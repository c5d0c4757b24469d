// SPDX-License-Identifier: Apache-2.0

//! Jaeger `api_v2` model messages. Protobuf encoding comes from prost, JSON follows the
//! protobuf JSON mapping with default values omitted.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ValueType {
    String = 0,
    Bool = 1,
    Int64 = 2,
    Float64 = 3,
    Binary = 4,
}

impl ValueType {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            ValueType::String => "STRING",
            ValueType::Bool => "BOOL",
            ValueType::Int64 => "INT64",
            ValueType::Float64 => "FLOAT64",
            ValueType::Binary => "BINARY",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SpanRefType {
    ChildOf = 0,
    FollowsFrom = 1,
}

impl SpanRefType {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            SpanRefType::ChildOf => "CHILD_OF",
            SpanRefType::FollowsFrom => "FOLLOWS_FROM",
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValue {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(enumeration = "ValueType", tag = "2")]
    #[serde(serialize_with = "value_type_name", skip_serializing_if = "is_zero_i32")]
    pub v_type: i32,
    #[prost(string, tag = "3")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub v_str: String,
    #[prost(bool, tag = "4")]
    #[serde(skip_serializing_if = "is_false")]
    pub v_bool: bool,
    #[prost(int64, tag = "5")]
    #[serde(serialize_with = "int64_string", skip_serializing_if = "is_zero_i64")]
    pub v_int64: i64,
    #[prost(double, tag = "6")]
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub v_float64: f64,
    #[prost(bytes = "vec", tag = "7")]
    #[serde(serialize_with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub v_binary: Vec<u8>,
}

impl KeyValue {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::String.into(),
            v_str: value.into(),
            ..Default::default()
        }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Bool.into(),
            v_bool: value,
            ..Default::default()
        }
    }

    pub fn int64(key: impl Into<String>, value: i64) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Int64.into(),
            v_int64: value,
            ..Default::default()
        }
    }

    pub fn float64(key: impl Into<String>, value: f64) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Float64.into(),
            v_float64: value,
            ..Default::default()
        }
    }

    pub fn binary(key: impl Into<String>, value: Vec<u8>) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Binary.into(),
            v_binary: value,
            ..Default::default()
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    #[prost(message, optional, tag = "1")]
    #[serde(serialize_with = "timestamp_rfc3339", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<prost_types::Timestamp>,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<KeyValue>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanRef {
    #[prost(bytes = "vec", tag = "1")]
    #[serde(serialize_with = "base64_bytes")]
    pub trace_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    #[serde(serialize_with = "base64_bytes")]
    pub span_id: Vec<u8>,
    #[prost(enumeration = "SpanRefType", tag = "3")]
    #[serde(serialize_with = "span_ref_type_name", skip_serializing_if = "is_zero_i32")]
    pub ref_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    #[prost(string, tag = "1")]
    pub service_name: String,
    #[prost(message, repeated, tag = "2")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<KeyValue>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[prost(bytes = "vec", tag = "1")]
    #[serde(serialize_with = "base64_bytes")]
    pub trace_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    #[serde(serialize_with = "base64_bytes")]
    pub span_id: Vec<u8>,
    #[prost(string, tag = "3")]
    pub operation_name: String,
    #[prost(message, repeated, tag = "4")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SpanRef>,
    #[prost(uint32, tag = "5")]
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub flags: u32,
    #[prost(message, optional, tag = "6")]
    #[serde(serialize_with = "timestamp_rfc3339", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<prost_types::Timestamp>,
    #[prost(message, optional, tag = "7")]
    #[serde(serialize_with = "duration_seconds", skip_serializing_if = "Option::is_none")]
    pub duration: Option<prost_types::Duration>,
    #[prost(message, repeated, tag = "8")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<KeyValue>,
    #[prost(message, repeated, tag = "9")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<Log>,
    #[prost(message, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<Process>,
    #[prost(string, tag = "11")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub process_id: String,
    #[prost(string, repeated, tag = "12")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Jaeger trace id as two big-endian halves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceId {
    pub high: u64,
    pub low: u64,
}

impl TraceId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let id = u128::from_be_bytes(bytes);
        TraceId {
            high: (id >> 64) as u64,
            low: id as u64,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.high == 0 && self.low == 0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.high == 0 {
            write!(f, "{:x}", self.low)
        } else {
            write!(f, "{:x}{:016x}", self.high, self.low)
        }
    }
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn value_type_name<S: Serializer>(v: &i32, s: S) -> Result<S::Ok, S::Error> {
    match ValueType::try_from(*v) {
        Ok(t) => s.serialize_str(t.as_str_name()),
        Err(_) => s.serialize_i32(*v),
    }
}

fn span_ref_type_name<S: Serializer>(v: &i32, s: S) -> Result<S::Ok, S::Error> {
    match SpanRefType::try_from(*v) {
        Ok(t) => s.serialize_str(t.as_str_name()),
        Err(_) => s.serialize_i32(*v),
    }
}

// 64-bit integers are strings in the protobuf JSON mapping
fn int64_string<S: Serializer>(v: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(v)
}

fn base64_bytes<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&STANDARD.encode(v))
}

fn timestamp_rfc3339<S: Serializer>(
    v: &Option<prost_types::Timestamp>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match v {
        Some(ts) => s.collect_str(ts),
        None => s.serialize_none(),
    }
}

fn duration_seconds<S: Serializer>(
    v: &Option<prost_types::Duration>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match v {
        Some(d) => s.collect_str(&format_args!("{}.{:09}s", d.seconds, d.nanos)),
        None => s.serialize_none(),
    }
}
