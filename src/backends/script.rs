// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Code generation for a liquid-handling robot.
//!
//! Every liquid-handling activity becomes one line of a Python protocol script; a
//! decomposed transfer becomes one line per operation:
//!
//! ```text
//! p300_single.transfer(300.0, labware1, labware2['A1'])
//! ```
//!
//! Labware gets `labwareN` names in order of first use. The rendered script is exposed
//! as the run artifact.

use crate::errors::SpecializationError;
use crate::graph::{Outputs, ResolvedInputs};
use crate::primitives::library::{
    CONFIGURE_ROBOT, DEFAULT_MOUNT, LOAD_RACK_ON_INSTRUMENT, PROVISION, TRANSFER,
};
use crate::record::RunStatus;
use crate::resources::ResourceGrant;
use crate::traits::{Activity, RunContext, Specialization};
use async_trait::async_trait;
use tokio::sync::Mutex;

pub const SCRIPT_RENDERER: &str = "script_renderer";

/// Instrument name used when neither the activity nor the grant names one.
const FALLBACK_INSTRUMENT: &str = "pipette";

#[derive(Debug, Default)]
struct Script {
    protocol: String,
    labware: Vec<String>,
    lines: Vec<String>,
}

impl Script {
    fn labware_name(&mut self, root: &str) -> String {
        let index = match self.labware.iter().position(|known| known == root) {
            Some(index) => index,
            None => {
                self.labware.push(root.to_string());
                self.labware.len() - 1
            }
        };
        format!("labware{}", index + 1)
    }

    /// `plate/A1` renders as `labwareN['A1']`, a plain container as `labwareN`.
    fn reference(&mut self, location: &str) -> String {
        match location.split_once('/') {
            Some((root, well)) => format!("{}['{}']", self.labware_name(root), well),
            None => self.labware_name(location),
        }
    }

    fn render(&self) -> String {
        let mut script = String::new();
        script.push_str("from opentrons import protocol_api\n\n");
        script.push_str(&format!(
            "metadata = {{'protocolName': '{}', 'apiLevel': '2.13'}}\n\n",
            self.protocol
        ));
        script.push_str("def run(protocol: protocol_api.ProtocolContext):\n");
        for (index, root) in self.labware.iter().enumerate() {
            script.push_str(&format!("    # labware{}: {}\n", index + 1, root));
        }
        for line in &self.lines {
            script.push_str("    ");
            script.push_str(line);
            script.push('\n');
        }
        script
    }
}

pub struct ScriptRenderer {
    script: Mutex<Script>,
}

impl ScriptRenderer {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
        }
    }

    /// Body lines rendered so far.
    pub async fn lines(&self) -> Vec<String> {
        self.script.lock().await.lines.clone()
    }
}

impl Default for ScriptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Specialization for ScriptRenderer {
    fn name(&self) -> &str {
        SCRIPT_RENDERER
    }

    fn supports(&self, primitive: &str) -> bool {
        matches!(
            primitive,
            CONFIGURE_ROBOT | LOAD_RACK_ON_INSTRUMENT | TRANSFER | PROVISION
        )
    }

    async fn execute(
        &self,
        activity: &Activity,
        inputs: &ResolvedInputs,
        grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError> {
        let mut script = self.script.lock().await;
        let line = match activity.primitive.as_str() {
            CONFIGURE_ROBOT => {
                let instrument = inputs.text("instrument")?;
                let mount = inputs.optional_text("mount")?.unwrap_or(DEFAULT_MOUNT);
                format!(
                    "{} = protocol.load_instrument('{}', '{}')",
                    instrument, instrument, mount
                )
            }
            LOAD_RACK_ON_INSTRUMENT => {
                let rack = inputs.location("rack")?;
                let slot = inputs.optional_text("coordinates")?.unwrap_or("deck");
                let name = script.labware_name(rack);
                format!("{} = protocol.load_labware('{}', '{}')", name, rack, slot)
            }
            TRANSFER => {
                let quantity = activity.quantity_or(inputs.microliters("amount")?);
                let instrument = match grant.instrument() {
                    Some(instrument) => instrument.to_string(),
                    None => inputs
                        .optional_text("instrument")?
                        .unwrap_or(FALLBACK_INSTRUMENT)
                        .to_string(),
                };
                let source = script.reference(inputs.location("source")?);
                let destination = script.reference(inputs.location("destination")?);
                format!(
                    "{}.transfer({}, {}, {})",
                    instrument,
                    format_volume(quantity),
                    source,
                    destination
                )
            }
            PROVISION => {
                let amount = inputs.microliters("amount")?;
                let resource = inputs.optional_text("resource")?.unwrap_or("liquid");
                let destination = script.reference(inputs.location("destination")?);
                format!(
                    "protocol.comment(\"Provision {} uL of {} into {}\")",
                    format_volume(amount),
                    resource,
                    destination
                )
            }
            other => {
                return Err(SpecializationError::Failed(format!(
                    "cannot render primitive '{}'",
                    other
                )))
            }
        };
        script.lines.push(line);
        Ok(Outputs::new())
    }

    async fn on_begin(&self, run: &RunContext) -> Result<(), SpecializationError> {
        let mut script = self.script.lock().await;
        *script = Script {
            protocol: run.protocol.clone(),
            ..Script::default()
        };
        Ok(())
    }

    async fn on_end(&self, _run: &RunContext, status: RunStatus) {
        let mut script = self.script.lock().await;
        if status != RunStatus::Completed {
            script
                .lines
                .push(format!("# run ended: {}", status.as_str()));
        }
    }

    async fn artifact(&self) -> Option<String> {
        Some(self.script.lock().await.render())
    }
}

/// Whole volumes keep one decimal (`300.0`), others print in full (`152.5`).
fn format_volume(volume: f64) -> String {
    if volume.fract() == 0.0 {
        format!("{:.1}", volume)
    } else {
        format!("{}", volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeId, Value};
    use crate::resources::{Envelope, InstrumentSpec, ResourceDescriptors, ResourceTracker};
    use crate::traits::Operation;

    fn run() -> RunContext {
        RunContext {
            execution_id: "run-1".into(),
            protocol: "toy".into(),
            agent: "tester".into(),
        }
    }

    fn transfer_activity(operation: Option<Operation>) -> Activity {
        Activity {
            node: NodeId(3),
            path: "transfer".into(),
            primitive: TRANSFER.into(),
            operation,
        }
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(300.0), "300.0");
        assert_eq!(format_volume(152.5), "152.5");
    }

    #[tokio::test]
    async fn test_transfer_lines_per_operation() {
        let tracker = ResourceTracker::new(
            &ResourceDescriptors::new()
                .filled_container("reservoir", 2_000.0, 1_000.0)
                .plate("plate", 2, 2, 1_000.0)
                .instrument(InstrumentSpec {
                    model: "p300_single".into(),
                    envelope: Envelope::new(10.0, 300.0),
                    tip_kind: "tips_300".into(),
                    mount: Some("left".into()),
                    tips: Some(8),
                }),
        )
        .unwrap();
        let grant = tracker
            .reserve(
                "transfer",
                vec![crate::resources::Requirement::Pipette {
                    instrument: None,
                    operations: vec![300.0, 152.5, 152.5],
                }],
            )
            .await
            .unwrap();

        let renderer = ScriptRenderer::new();
        renderer.on_begin(&run()).await.unwrap();

        let mut inputs = ResolvedInputs::new();
        inputs.insert("source", Value::location("reservoir"));
        inputs.insert("destination", Value::location("plate/A1"));
        inputs.insert("amount", Value::microliters(605.0));
        for (index, quantity) in [300.0, 152.5, 152.5].into_iter().enumerate() {
            let activity = transfer_activity(Some(Operation {
                index,
                count: 3,
                quantity,
            }));
            renderer.execute(&activity, &inputs, &grant).await.unwrap();
        }
        tracker.release(grant);

        assert_eq!(
            renderer.lines().await,
            vec![
                "p300_single.transfer(300.0, labware1, labware2['A1'])",
                "p300_single.transfer(152.5, labware1, labware2['A1'])",
                "p300_single.transfer(152.5, labware1, labware2['A1'])",
            ]
        );

        renderer.on_end(&run(), RunStatus::Completed).await;
        let script = renderer.artifact().await.unwrap();
        assert!(script.contains("'protocolName': 'toy'"));
        assert!(script.contains("    # labware2: plate\n"));

        // a new run starts from an empty script
        renderer.on_begin(&run()).await.unwrap();
        assert!(renderer.lines().await.is_empty());
    }

    #[tokio::test]
    async fn test_robot_configuration_lines() {
        let tracker = ResourceTracker::new(&ResourceDescriptors::new()).unwrap();
        let grant = tracker.reserve("configure", vec![]).await.unwrap();
        let renderer = ScriptRenderer::new();

        let mut inputs = ResolvedInputs::new();
        inputs.insert("instrument", Value::text("p300_single"));
        let activity = Activity {
            node: NodeId(2),
            path: "configure".into(),
            primitive: CONFIGURE_ROBOT.into(),
            operation: None,
        };
        renderer.execute(&activity, &inputs, &grant).await.unwrap();

        let mut inputs = ResolvedInputs::new();
        inputs.insert("rack", Value::location("tiprack"));
        inputs.insert("coordinates", Value::text("1"));
        let activity = Activity {
            primitive: LOAD_RACK_ON_INSTRUMENT.into(),
            ..activity
        };
        renderer.execute(&activity, &inputs, &grant).await.unwrap();
        tracker.release(grant);

        assert_eq!(
            renderer.lines().await,
            vec![
                "p300_single = protocol.load_instrument('p300_single', 'left')",
                "labware1 = protocol.load_labware('tiprack', '1')",
            ]
        );
    }
}
