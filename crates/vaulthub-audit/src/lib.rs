// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail for VaultHub.
//!
//! [`AuditRecorder`] appends one immutable entry per vault, API key and
//! account event. Recording never fails the operation that triggered it:
//! store errors go to the operational log. Reads are always scoped to one
//! user and aggregate in SQL rather than from cached counters.

pub mod recorder;

pub use recorder::{AuditEvent, AuditRecorder};
