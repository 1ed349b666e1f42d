// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod specialization;

pub use specialization::{Activity, Operation, RunContext, Specialization};
