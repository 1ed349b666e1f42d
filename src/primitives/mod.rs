// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod library;
mod registry;
mod signature;

pub use registry::PrimitiveRegistry;
pub use signature::{Footprint, ParameterSpec, PrimitiveSignature};
