// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::primitives::{library, PrimitiveSignature};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable lookup of primitive signatures by name.
///
/// The registry is passed explicitly to the builder, validation and the executor;
/// there is no global catalogue.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveRegistry {
    signatures: BTreeMap<String, Arc<PrimitiveSignature>>,
}

impl PrimitiveRegistry {
    /// The shipped library of liquid handling, sample array and measurement primitives.
    pub fn standard() -> Self {
        Self::from_signatures(library::standard_signatures())
    }

    /// Later signatures replace earlier ones with the same name.
    pub fn from_signatures(signatures: impl IntoIterator<Item = PrimitiveSignature>) -> Self {
        Self {
            signatures: signatures
                .into_iter()
                .map(|signature| (signature.name.clone(), Arc::new(signature)))
                .collect(),
        }
    }

    pub fn with(mut self, signature: PrimitiveSignature) -> Self {
        self.signatures
            .insert(signature.name.clone(), Arc::new(signature));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PrimitiveSignature>> {
        self.signatures.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signatures.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signatures.keys().map(String::as_str)
    }

    pub fn signatures(&self) -> impl Iterator<Item = &Arc<PrimitiveSignature>> {
        self.signatures.values()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Footprint;

    #[test]
    fn test_standard_registry() {
        let registry = PrimitiveRegistry::standard();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "ConfigureRobot",
                "EmptyContainer",
                "LoadRackOnInstrument",
                "MeasureAbsorbance",
                "MeasureFluorescence",
                "PlateCoordinates",
                "Provision",
                "Transfer",
            ]
        );
        assert!(!registry.contains("Centrifuge"));
        assert_eq!(
            registry.get("Transfer").map(|signature| signature.footprint),
            Some(Footprint::Transfer)
        );
    }

    #[test]
    fn test_custom_signatures_replace_standard_ones() {
        let registry = PrimitiveRegistry::standard()
            .with(PrimitiveSignature::new("Transfer", "dry run").with_output("log"));
        let transfer = registry.get("Transfer").unwrap();
        assert_eq!(transfer.description, "dry run");
        assert!(transfer.inputs.is_empty());
        assert_eq!(registry.len(), 8);
    }
}
