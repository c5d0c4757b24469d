// SPDX-License-Identifier: Apache-2.0

pub mod batch;
pub mod batch_resources;
pub mod partition;
