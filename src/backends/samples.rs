// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bookkeeping of sample arrays.
//!
//! Sample arrays are plain values: a container location, or a list of well locations
//! such as `plate/A1`. No physical resource is touched.

use crate::errors::SpecializationError;
use crate::graph::{Outputs, ResolvedInputs, Value};
use crate::primitives::library::{EMPTY_CONTAINER, PLATE_COORDINATES};
use crate::resources::{ResourceGrant, MAX_PLATE_ROWS};
use crate::traits::{Activity, Specialization};
use async_trait::async_trait;

pub const SAMPLE_ARRAYS: &str = "sample_arrays";

pub struct SampleArrays;

impl SampleArrays {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SampleArrays {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Specialization for SampleArrays {
    fn name(&self) -> &str {
        SAMPLE_ARRAYS
    }

    fn supports(&self, primitive: &str) -> bool {
        matches!(primitive, EMPTY_CONTAINER | PLATE_COORDINATES)
    }

    async fn execute(
        &self,
        activity: &Activity,
        inputs: &ResolvedInputs,
        _grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError> {
        let samples = match activity.primitive.as_str() {
            EMPTY_CONTAINER => match inputs.get("sample_array") {
                Some(array) if !array.is_empty() => array.clone(),
                _ => Value::location(inputs.location("specification")?),
            },
            PLATE_COORDINATES => {
                let plate = inputs.location("source")?;
                let mut wells: Vec<Value> = parse_coordinates(inputs.text("coordinates")?)
                    .map_err(SpecializationError::Failed)?
                    .into_iter()
                    .map(|well| Value::location(format!("{}/{}", plate, well)))
                    .collect();
                // a single well is usable wherever a location is expected
                if wells.len() == 1 {
                    wells.remove(0)
                } else {
                    Value::List(wells)
                }
            }
            other => {
                return Err(SpecializationError::Failed(format!(
                    "primitive '{}' is not a sample array primitive",
                    other
                )))
            }
        };

        let mut outputs = Outputs::new();
        outputs.insert("samples".to_string(), samples);
        Ok(outputs)
    }
}

/// Expands `A1`, `A1:B3` and comma separated lists of both into well names, row by row.
pub fn parse_coordinates(coordinates: &str) -> Result<Vec<String>, String> {
    let mut wells = Vec::new();
    for part in coordinates.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let (first, last) = match part.split_once(':') {
            Some((first, last)) => (parse_well(first)?, parse_well(last)?),
            None => {
                let well = parse_well(part)?;
                (well, well)
            }
        };
        for row in first.0.min(last.0)..=first.0.max(last.0) {
            for column in first.1.min(last.1)..=first.1.max(last.1) {
                wells.push(format!("{}{}", (b'A' + row) as char, column));
            }
        }
    }
    if wells.is_empty() {
        return Err(format!("no wells selected by '{}'", coordinates));
    }
    Ok(wells)
}

fn parse_well(well: &str) -> Result<(u8, u32), String> {
    let well = well.trim();
    let mut chars = well.chars();
    let row = chars
        .next()
        .filter(char::is_ascii_uppercase)
        .map(|letter| letter as u8 - b'A')
        .filter(|row| *row < MAX_PLATE_ROWS)
        .ok_or_else(|| format!("invalid well '{}'", well))?;
    let column: u32 = chars
        .as_str()
        .parse()
        .ok()
        .filter(|column| *column > 0)
        .ok_or_else(|| format!("invalid well '{}'", well))?;
    Ok((row, column))
}
