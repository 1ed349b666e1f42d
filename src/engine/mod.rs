// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Protocol execution: token scheduling, dispatch and quantity decomposition.

pub mod clock;
pub mod decomposition;
pub(crate) mod dispatch;
pub mod priority_work_queue;
pub(crate) mod run_state;
pub mod scheduler;

pub use decomposition::plan;
pub use scheduler::{ExecutionRequest, ProtocolExecutor};
