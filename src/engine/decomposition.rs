// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Splitting quantities that exceed an instrument's envelope.
//!
//! # Algorithm
//!
//! 1. **Greedy**: emit `min(remaining, max)` until nothing remains
//! 2. **Spread**: a last operation below `min` is spread over the shortest tail of
//!    operations whose average reaches `min`, every tail operation getting that average
//!
//! The result always sums to the requested quantity and every operation lies in
//! `[min, max]`. In the worst case the whole quantity is spread evenly over
//! `ceil(quantity / max)` operations; only when that average is still below `min` is the
//! quantity reported as infeasible.
//!
//! ```text
//! 900 in [10, 300]  ->  300 300 300
//! 605 in [10, 300]  ->  300 152.5 152.5
//!  31 in [10, 15]   ->  10.33 10.33 10.33
//! ```

use crate::errors::DecompositionError;
use crate::resources::{Envelope, VOLUME_EPSILON};

/// Plans the device-level operations for `quantity`.
pub fn plan(quantity: f64, envelope: Envelope) -> Result<Vec<f64>, DecompositionError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(DecompositionError::NonPositiveQuantity { quantity });
    }
    if envelope.is_empty() {
        return Err(DecompositionError::EmptyEnvelope { envelope });
    }
    if quantity < envelope.min - VOLUME_EPSILON {
        return Err(DecompositionError::BelowMinimum { quantity, envelope });
    }

    let mut operations = Vec::new();
    let mut remaining = quantity;
    while remaining > VOLUME_EPSILON {
        let operation = remaining.min(envelope.max);
        operations.push(operation);
        remaining -= operation;
    }

    let count = operations.len();
    match operations.last() {
        None => return Err(DecompositionError::NonPositiveQuantity { quantity }),
        Some(&last) if last >= envelope.min - VOLUME_EPSILON => return Ok(operations),
        Some(_) => {}
    }
    // every operation but the last is `max`, so a longer tail only raises the average
    for tail in 2..=count {
        let start = count - tail;
        let share = operations[start..].iter().sum::<f64>() / tail as f64;
        if share >= envelope.min - VOLUME_EPSILON {
            operations[start..].iter_mut().for_each(|operation| *operation = share);
            return Ok(operations);
        }
    }
    Err(DecompositionError::UnbalancedRemainder { quantity, envelope })
}
