// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Reservation of physical resources for activities.
//!
//! Every resource lives behind its own `tokio::sync::Mutex`. A reservation locks the
//! resources it touches in sorted id order, so overlapping reservations queue up FIFO
//! on the first shared resource and can never deadlock. The locked state is cloned into
//! a staging area, every requirement is checked and applied to the staged copy, and the
//! resulting [`ResourceGrant`] keeps the locks until it is committed (staged state is
//! written back) or released (staged state is dropped).

use crate::errors::{DenialReason, ResourceError};
use crate::observability::messages::resource::{
    GrantCommitted, GrantReleased, ReservationDenied, ReservationGranted,
};
use crate::observability::messages::StructuredLog;
use crate::resources::state::{DECK, DEFAULT_MOUNT};
use crate::resources::{
    well_names, InstrumentState, LocationKind, Requirement, ResourceDescriptors,
    ResourceSnapshot, ResourceState, VOLUME_EPSILON,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// How the tracker picks an instrument when a pipetting requirement names none.
///
/// # Variants
/// * `FirstMounted` - first eligible instrument in id order
/// * `SmallestSufficient` - eligible instrument with the smallest maximum volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentSelection {
    #[default]
    FirstMounted,
    SmallestSufficient,
}

/// Immutable facts about a resource, known without taking its lock.
#[derive(Debug, Clone, PartialEq)]
enum ResourceClass {
    Container,
    Plate,
    TipRack { tip_kind: String },
    Slot,
    Instrument { tip_kind: String },
}

/// Resources one reservation has to lock.
#[derive(Debug, Default)]
struct LockPlan {
    keys: BTreeSet<String>,
    /// Instruments locked only to choose among them or to check their mounts.
    candidates: BTreeSet<String>,
}

/// Staged resource changes of one activity, holding the locks of the touched resources.
#[derive(Debug)]
pub struct ResourceGrant {
    id: u64,
    activity: String,
    requirements: Vec<Requirement>,
    instrument: Option<String>,
    operations: Vec<f64>,
    guards: BTreeMap<String, OwnedMutexGuard<ResourceState>>,
    staged: BTreeMap<String, ResourceState>,
}

impl ResourceGrant {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Instrument chosen for the pipetting requirement, if any.
    pub fn instrument(&self) -> Option<&str> {
        self.instrument.as_deref()
    }

    /// Pipetting operation quantities, one tip each.
    pub fn operations(&self) -> &[f64] {
        &self.operations
    }

    /// State a resource will have once the grant is committed.
    pub fn staged(&self, resource: &str) -> Option<&ResourceState> {
        self.staged.get(resource)
    }

    pub fn locked_resources(&self) -> impl Iterator<Item = &str> {
        self.guards.keys().map(String::as_str)
    }
}

pub struct ResourceTracker {
    resources: BTreeMap<String, Arc<Mutex<ResourceState>>>,
    classes: BTreeMap<String, ResourceClass>,
    selection: InstrumentSelection,
    next_grant: AtomicU64,
}

impl ResourceTracker {
    /// Builds the tracker state from descriptors; plates are expanded into their wells.
    pub fn new(descriptors: &ResourceDescriptors) -> Result<Self, ResourceError> {
        if let Some(error) = descriptors.check().into_iter().next() {
            return Err(error);
        }

        let mut entries: Vec<(String, ResourceClass, ResourceState)> = Vec::new();
        for location in &descriptors.locations {
            match &location.kind {
                LocationKind::Container {
                    capacity,
                    initial_volume,
                } => entries.push((
                    location.id.clone(),
                    ResourceClass::Container,
                    ResourceState::Container {
                        capacity: *capacity,
                        volume: *initial_volume,
                    },
                )),
                LocationKind::Plate {
                    rows,
                    columns,
                    well_capacity,
                    initial_volume,
                } => {
                    entries.push((
                        location.id.clone(),
                        ResourceClass::Plate,
                        ResourceState::Plate {
                            rows: *rows,
                            columns: *columns,
                            placement: None,
                        },
                    ));
                    for well in well_names(*rows, *columns) {
                        entries.push((
                            format!("{}/{}", location.id, well),
                            ResourceClass::Container,
                            ResourceState::Container {
                                capacity: *well_capacity,
                                volume: *initial_volume,
                            },
                        ));
                    }
                }
                LocationKind::TipRack { tip_kind, tips } => entries.push((
                    location.id.clone(),
                    ResourceClass::TipRack {
                        tip_kind: tip_kind.clone(),
                    },
                    ResourceState::TipRack {
                        tip_kind: tip_kind.clone(),
                        tips: *tips,
                        placement: None,
                        attached_to: None,
                    },
                )),
                LocationKind::Slot => entries.push((
                    location.id.clone(),
                    ResourceClass::Slot,
                    ResourceState::Slot { occupant: None },
                )),
            }
        }
        for instrument in &descriptors.instruments {
            entries.push((
                instrument.model.clone(),
                ResourceClass::Instrument {
                    tip_kind: instrument.tip_kind.clone(),
                },
                ResourceState::Instrument(InstrumentState {
                    envelope: instrument.envelope,
                    tip_kind: instrument.tip_kind.clone(),
                    mount: instrument.mount.clone(),
                    tips: instrument.tips,
                }),
            ));
        }

        let mut resources = BTreeMap::new();
        let mut classes = BTreeMap::new();
        for (id, class, state) in entries {
            if classes.insert(id.clone(), class).is_some() {
                return Err(ResourceError::DuplicateResource(id));
            }
            resources.insert(id, Arc::new(Mutex::new(state)));
        }

        Ok(Self {
            resources,
            classes,
            selection: InstrumentSelection::default(),
            next_grant: AtomicU64::new(1),
        })
    }

    pub fn with_selection(mut self, selection: InstrumentSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Checks and stages `requirements` for `activity`.
    ///
    /// Waits for the locks of every touched resource. A denial leaves all state
    /// untouched and releases the locks.
    pub async fn reserve(
        &self,
        activity: &str,
        requirements: Vec<Requirement>,
    ) -> Result<ResourceGrant, DenialReason> {
        match self.try_reserve(activity, requirements).await {
            Ok(grant) => {
                ReservationGranted {
                    grant_id: grant.id,
                    activity,
                    resources: grant.guards.len(),
                    instrument: grant.instrument(),
                    operations: grant.operations.len(),
                }
                .log();
                Ok(grant)
            }
            Err(reason) => {
                ReservationDenied {
                    activity,
                    reason: &reason,
                }
                .log();
                Err(reason)
            }
        }
    }

    async fn try_reserve(
        &self,
        activity: &str,
        requirements: Vec<Requirement>,
    ) -> Result<ResourceGrant, DenialReason> {
        let plan = self.lock_plan(&requirements)?;

        let mut guards = BTreeMap::new();
        for key in &plan.keys {
            if let Some(resource) = self.resources.get(key) {
                guards.insert(key.clone(), Arc::clone(resource).lock_owned().await);
            }
        }
        let mut staged: BTreeMap<String, ResourceState> = guards
            .iter()
            .map(|(key, guard)| (key.clone(), (**guard).clone()))
            .collect();

        let mut instrument = None;
        let mut operations = Vec::new();
        for requirement in &requirements {
            match requirement {
                Requirement::Withdraw { location, volume } => {
                    withdraw(&mut staged, location, *volume)?
                }
                Requirement::Deposit { location, volume } => {
                    deposit(&mut staged, location, *volume)?
                }
                Requirement::Pipette {
                    instrument: requested,
                    operations: requested_operations,
                } => {
                    let chosen =
                        self.select_instrument(&staged, requested.as_deref(), requested_operations)?;
                    if let Some(ResourceState::Instrument(state)) = staged.get_mut(&chosen) {
                        let used = requested_operations.len() as u32;
                        state.tips = state.tips.map(|tips| tips.saturating_sub(used));
                    }
                    instrument = Some(chosen);
                    operations = requested_operations.clone();
                }
                Requirement::Mount {
                    instrument: target,
                    mount,
                } => mount_instrument(&mut staged, target, mount.as_deref())?,
                Requirement::LoadRack { rack, slot } => load_rack(&mut staged, rack, slot.as_deref())?,
            }
        }

        // candidates that were neither chosen nor changed go back to the queue
        let unused: Vec<String> = plan
            .candidates
            .iter()
            .filter(|id| instrument.as_deref() != Some(id.as_str()))
            .filter(|id| match (guards.get(*id), staged.get(*id)) {
                (Some(guard), Some(state)) => **guard == *state,
                _ => true,
            })
            .cloned()
            .collect();
        for id in &unused {
            guards.remove(id);
            staged.remove(id);
        }

        Ok(ResourceGrant {
            id: self.next_grant.fetch_add(1, AtomicOrdering::SeqCst),
            activity: activity.to_string(),
            requirements,
            instrument,
            operations,
            guards,
            staged,
        })
    }

    /// Writes the staged state back and unlocks. Returns the grant id.
    pub fn commit(&self, grant: ResourceGrant) -> u64 {
        let ResourceGrant {
            id,
            activity,
            mut guards,
            staged,
            ..
        } = grant;
        for (key, state) in staged {
            if let Some(guard) = guards.get_mut(&key) {
                **guard = state;
            }
        }
        GrantCommitted {
            grant_id: id,
            activity: &activity,
        }
        .log();
        id
    }

    /// Drops the staged state and unlocks. Returns the grant id.
    pub fn release(&self, grant: ResourceGrant) -> u64 {
        GrantReleased {
            grant_id: grant.id,
            activity: &grant.activity,
        }
        .log();
        grant.id
    }

    /// Current state of every resource. Waits for outstanding grants.
    pub async fn snapshot(&self) -> ResourceSnapshot {
        let mut snapshot = BTreeMap::new();
        for (id, resource) in &self.resources {
            snapshot.insert(id.clone(), resource.lock().await.clone());
        }
        snapshot
    }

    fn lock_plan(&self, requirements: &[Requirement]) -> Result<LockPlan, DenialReason> {
        let mut plan = LockPlan::default();
        for requirement in requirements {
            match requirement {
                Requirement::Withdraw { location, .. } | Requirement::Deposit { location, .. } => {
                    self.expect_class(location, "container", |class| {
                        matches!(class, ResourceClass::Container)
                    })?;
                    plan.keys.insert(location.clone());
                }
                Requirement::Pipette {
                    instrument: Some(instrument),
                    ..
                } => {
                    self.expect_instrument(instrument)?;
                    plan.keys.insert(instrument.clone());
                }
                Requirement::Pipette {
                    instrument: None, ..
                } => {
                    let instruments = self.instruments(|_| true);
                    if instruments.is_empty() {
                        return Err(DenialReason::NoEligibleInstrument {
                            detail: "no instrument is declared".to_string(),
                        });
                    }
                    plan.keys.extend(instruments.iter().cloned());
                    plan.candidates.extend(instruments);
                }
                Requirement::Mount { instrument, .. } => {
                    self.expect_instrument(instrument)?;
                    let others = self.instruments(|id| id != instrument.as_str());
                    plan.keys.insert(instrument.clone());
                    plan.keys.extend(others.iter().cloned());
                    plan.candidates.extend(others);
                }
                Requirement::LoadRack { rack, slot } => {
                    let class = self.expect_class(rack, "labware", |class| {
                        matches!(class, ResourceClass::TipRack { .. } | ResourceClass::Plate)
                    })?;
                    plan.keys.insert(rack.clone());
                    if let Some(slot) = slot {
                        self.expect_class(slot, "slot", |class| matches!(class, ResourceClass::Slot))?;
                        plan.keys.insert(slot.clone());
                    }
                    if let ResourceClass::TipRack { tip_kind } = class {
                        let compatible = self.instruments(|id| {
                            matches!(
                                self.classes.get(id),
                                Some(ResourceClass::Instrument { tip_kind: kind }) if kind == tip_kind
                            )
                        });
                        plan.keys.extend(compatible.iter().cloned());
                        plan.candidates.extend(compatible);
                    }
                }
            }
        }
        Ok(plan)
    }

    fn expect_class(
        &self,
        resource: &str,
        expected: &str,
        accepts: impl Fn(&ResourceClass) -> bool,
    ) -> Result<&ResourceClass, DenialReason> {
        let class = self
            .classes
            .get(resource)
            .ok_or_else(|| DenialReason::UnknownResource {
                resource: resource.to_string(),
            })?;
        if accepts(class) {
            Ok(class)
        } else {
            Err(DenialReason::WrongResourceKind {
                resource: resource.to_string(),
                expected: expected.to_string(),
            })
        }
    }

    fn expect_instrument(&self, resource: &str) -> Result<(), DenialReason> {
        self.expect_class(resource, "instrument", |class| {
            matches!(class, ResourceClass::Instrument { .. })
        })
        .map(|_| ())
    }

    fn instruments(&self, filter: impl Fn(&str) -> bool) -> Vec<String> {
        self.classes
            .iter()
            .filter(|(id, class)| matches!(class, ResourceClass::Instrument { .. }) && filter(id))
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn select_instrument(
        &self,
        staged: &BTreeMap<String, ResourceState>,
        requested: Option<&str>,
        operations: &[f64],
    ) -> Result<String, DenialReason> {
        if let Some(id) = requested {
            return match staged.get(id) {
                Some(ResourceState::Instrument(state)) => {
                    state.check_operations(id, operations)?;
                    Ok(id.to_string())
                }
                _ => Err(DenialReason::WrongResourceKind {
                    resource: id.to_string(),
                    expected: "instrument".to_string(),
                }),
            };
        }

        let mut eligible: Vec<(&String, &InstrumentState)> = Vec::new();
        let mut closest: Option<(u8, DenialReason)> = None;
        for (id, state) in staged {
            let ResourceState::Instrument(instrument) = state else {
                continue;
            };
            match instrument.check_operations(id, operations) {
                Ok(()) => eligible.push((id, instrument)),
                Err(reason) => {
                    let progress = check_progress(&reason);
                    if closest.as_ref().map_or(true, |(best, _)| progress > *best) {
                        closest = Some((progress, reason));
                    }
                }
            }
        }

        let chosen = match self.selection {
            InstrumentSelection::FirstMounted => eligible.first(),
            InstrumentSelection::SmallestSufficient => eligible.iter().min_by(|a, b| {
                a.1.envelope
                    .max
                    .partial_cmp(&b.1.envelope.max)
                    .unwrap_or(Ordering::Equal)
            }),
        };
        match chosen {
            Some((id, _)) => Ok((*id).clone()),
            None => Err(closest.map(|(_, reason)| reason).unwrap_or_else(|| {
                DenialReason::NoEligibleInstrument {
                    detail: "no instrument is declared".to_string(),
                }
            })),
        }
    }
}

/// How far an instrument got through the eligibility checks before being refused.
fn check_progress(reason: &DenialReason) -> u8 {
    match reason {
        DenialReason::InstrumentNotMounted { .. } => 0,
        DenialReason::NoConsumableLoaded { .. } => 1,
        DenialReason::ExceedsEnvelope { .. } | DenialReason::BelowEnvelope { .. } => 2,
        _ => 3,
    }
}

fn container<'s>(
    staged: &'s mut BTreeMap<String, ResourceState>,
    location: &str,
) -> Result<(&'s mut f64, f64), DenialReason> {
    match staged.get_mut(location) {
        Some(ResourceState::Container { capacity, volume }) => Ok((volume, *capacity)),
        Some(_) => Err(DenialReason::WrongResourceKind {
            resource: location.to_string(),
            expected: "container".to_string(),
        }),
        None => Err(DenialReason::UnknownResource {
            resource: location.to_string(),
        }),
    }
}

fn withdraw(
    staged: &mut BTreeMap<String, ResourceState>,
    location: &str,
    requested: f64,
) -> Result<(), DenialReason> {
    let (volume, _) = container(staged, location)?;
    if requested > *volume + VOLUME_EPSILON {
        return Err(DenialReason::InsufficientVolume {
            location: location.to_string(),
            requested,
            available: *volume,
        });
    }
    *volume = (*volume - requested).max(0.0);
    Ok(())
}

fn deposit(
    staged: &mut BTreeMap<String, ResourceState>,
    location: &str,
    requested: f64,
) -> Result<(), DenialReason> {
    let (volume, capacity) = container(staged, location)?;
    if *volume + requested > capacity + VOLUME_EPSILON {
        return Err(DenialReason::CapacityExceeded {
            location: location.to_string(),
            requested,
            capacity,
            current: *volume,
        });
    }
    *volume += requested;
    Ok(())
}

fn mount_instrument(
    staged: &mut BTreeMap<String, ResourceState>,
    instrument: &str,
    mount: Option<&str>,
) -> Result<(), DenialReason> {
    let current = match staged.get(instrument) {
        Some(ResourceState::Instrument(state)) => state.mount.clone(),
        _ => {
            return Err(DenialReason::WrongResourceKind {
                resource: instrument.to_string(),
                expected: "instrument".to_string(),
            })
        }
    };
    let position = mount
        .map(str::to_string)
        .or(current)
        .unwrap_or_else(|| DEFAULT_MOUNT.to_string());

    let occupant = staged.iter().find_map(|(id, state)| match state {
        ResourceState::Instrument(other)
            if id != instrument && other.mount.as_deref() == Some(position.as_str()) =>
        {
            Some(id.clone())
        }
        _ => None,
    });
    if let Some(occupant) = occupant {
        return Err(DenialReason::SlotOccupied {
            slot: position,
            occupant,
        });
    }

    if let Some(ResourceState::Instrument(state)) = staged.get_mut(instrument) {
        state.mount = Some(position);
    }
    Ok(())
}

fn load_rack(
    staged: &mut BTreeMap<String, ResourceState>,
    rack: &str,
    slot: Option<&str>,
) -> Result<(), DenialReason> {
    let (placement, tip_rack) = match staged.get(rack) {
        Some(ResourceState::TipRack {
            placement,
            tip_kind,
            tips,
            ..
        }) => (placement.clone(), Some((tip_kind.clone(), *tips))),
        Some(ResourceState::Plate { placement, .. }) => (placement.clone(), None),
        _ => {
            return Err(DenialReason::WrongResourceKind {
                resource: rack.to_string(),
                expected: "labware".to_string(),
            })
        }
    };
    if let Some(slot) = placement {
        return Err(DenialReason::AlreadyPlaced {
            resource: rack.to_string(),
            slot,
        });
    }

    if let Some(slot) = slot {
        match staged.get_mut(slot) {
            Some(ResourceState::Slot { occupant: Some(occupant) }) => {
                return Err(DenialReason::SlotOccupied {
                    slot: slot.to_string(),
                    occupant: occupant.clone(),
                });
            }
            Some(ResourceState::Slot { occupant }) => *occupant = Some(rack.to_string()),
            _ => {
                return Err(DenialReason::WrongResourceKind {
                    resource: slot.to_string(),
                    expected: "slot".to_string(),
                })
            }
        }
    }

    // mounted compatible instruments first, then the rest, each group in id order
    let attached_to = tip_rack.as_ref().and_then(|(tip_kind, _)| {
        let compatible = staged.iter().filter_map(|(id, state)| match state {
            ResourceState::Instrument(instrument) if &instrument.tip_kind == tip_kind => {
                Some((id, instrument.mount.is_some()))
            }
            _ => None,
        });
        let (mounted, unmounted): (Vec<_>, Vec<_>) = compatible.partition(|(_, mounted)| *mounted);
        mounted
            .into_iter()
            .chain(unmounted)
            .map(|(id, _)| id.clone())
            .next()
    });
    if let (Some(instrument), Some((_, tips))) = (&attached_to, &tip_rack) {
        if let Some(ResourceState::Instrument(state)) = staged.get_mut(instrument) {
            state.tips = Some(state.tips.unwrap_or(0) + tips);
        }
    }

    let position = slot.unwrap_or(DECK).to_string();
    match staged.get_mut(rack) {
        Some(ResourceState::TipRack {
            placement,
            attached_to: attachment,
            ..
        }) => {
            *placement = Some(position);
            *attachment = attached_to;
        }
        Some(ResourceState::Plate { placement, .. }) => *placement = Some(position),
        _ => {}
    }
    Ok(())
}
