// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Result storage: detection and diagnosis records persisted as JSONL

pub mod diagnosis_store;

pub use diagnosis_store::{
    DetectionRecord, DiagnosisRecord, DiagnosisStore, RecordSource, StoreStats,
};
