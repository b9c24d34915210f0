// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for VaultHub integration tests.
//!
//! [`TestHarness`] builds the whole service stack on a temp SQLite database
//! so gateway and binary tests run without any external setup.

pub mod harness;

pub use harness::{
    TEST_MASTER_KEY, TEST_PASSWORD, TEST_PBKDF2_ITERATIONS, TestHarness, TestHarnessBuilder,
};
