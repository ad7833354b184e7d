//! The in-progress appointment and the state machine that edits it.
//!
//! [`DraftController`] owns one [`AppointmentDraft`] for the lifetime of a
//! scheduling dialog. Every mutation goes through a transition method, and
//! the [`DraftState`] is recomputed after each one, so the state can never
//! disagree with the draft's fields.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{AvailabilityEngine, EngineSettings, Resource, SlotDecision, SlotRequest};
use crate::event::CalendarEvent;
use crate::interval::Interval;
use crate::ports::{Discard, SlotDecisionSink, SubmitSink};
use crate::resolver::{LeastBookedResolver, NextAgentResolver};
use crate::types::{AgentId, AppointmentId, EventId, PartyMemberId, TeamId, TourType, UnitId};

/// Where a draft is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DraftState {
    /// No slot selected.
    Empty,
    /// A slot is selected, but required fields are still missing.
    SlotSelected,
    /// The selected slot conflicts and the user has not confirmed it.
    OverlapWarned,
    ReadyToSubmit,
    Submitted,
    Cancelled,
}

impl DraftState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted | Self::Cancelled)
    }
}

impl fmt::Display for DraftState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::SlotSelected => "slot selected",
            Self::OverlapWarned => "overlap warned",
            Self::ReadyToSubmit => "ready to submit",
            Self::Submitted => "submitted",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A required field that blocks submission while unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingField {
    TimeSlot,
    Agent,
    PartyMembers,
    TourType,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TimeSlot => "time slot",
            Self::Agent => "agent",
            Self::PartyMembers => "party members",
            Self::TourType => "tour type",
        };
        f.write_str(s)
    }
}

fn join_missing(missing: &[MissingField]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from draft transitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("cannot {action} while the draft is {state}")]
    IllegalTransition {
        action: &'static str,
        state: DraftState,
    },

    #[error("an agent can only be chosen for team bookings")]
    NotTeamMode,

    #[error("tour type {0} is not offered for this property")]
    TourTypeNotOffered(TourType),

    /// Soft validation failure; the draft is left untouched.
    #[error("missing required fields: {}", join_missing(.missing))]
    Incomplete { missing: Vec<MissingField> },

    #[error("the selected slot overlaps existing events and was not acknowledged")]
    OverlapNotAcknowledged,
}

/// An appointment as stored, used to seed an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAppointment {
    pub id: AppointmentId,
    pub interval: Interval,
    pub agent_id: AgentId,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub party_member_ids: BTreeSet<PartyMemberId>,
    #[serde(default)]
    pub unit_ids: Vec<UnitId>,
    #[serde(default)]
    pub tour_type: Option<TourType>,
    #[serde(default)]
    pub note: String,
}

/// Working state of one booking or edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    pub selected_time_slot: Option<Interval>,
    pub selected_agent_id: Option<AgentId>,
    pub selected_team_id: Option<TeamId>,
    pub is_team_mode: bool,
    pub selected_party_member_ids: BTreeSet<PartyMemberId>,
    pub selected_unit_ids: Vec<UnitId>,
    pub tour_type: Option<TourType>,
    pub note: String,
    pub display_overlap_warning: bool,
    #[serde(skip)]
    pub editing: Option<ExistingAppointment>,
}

impl AppointmentDraft {
    /// A blank draft booked against `resource`.
    pub fn new(resource: Resource) -> Self {
        let mut draft = Self {
            selected_time_slot: None,
            selected_agent_id: None,
            selected_team_id: None,
            is_team_mode: false,
            selected_party_member_ids: BTreeSet::new(),
            selected_unit_ids: Vec::new(),
            tour_type: None,
            note: String::new(),
            display_overlap_warning: false,
            editing: None,
        };
        draft.point_at(resource);
        draft
    }

    /// A draft seeded from a stored appointment, in agent mode.
    pub fn editing(existing: ExistingAppointment) -> Self {
        Self {
            selected_time_slot: Some(existing.interval),
            selected_agent_id: Some(existing.agent_id.clone()),
            selected_team_id: existing.team_id.clone(),
            is_team_mode: false,
            selected_party_member_ids: existing.party_member_ids.clone(),
            selected_unit_ids: existing.unit_ids.clone(),
            tour_type: existing.tour_type,
            note: existing.note.clone(),
            display_overlap_warning: false,
            editing: Some(existing),
        }
    }

    fn point_at(&mut self, resource: Resource) {
        match resource {
            Resource::Agent(agent) => {
                self.is_team_mode = false;
                self.selected_agent_id = Some(agent);
            }
            Resource::Team(team) => {
                self.is_team_mode = true;
                self.selected_team_id = Some(team);
                self.selected_agent_id = None;
            }
        }
    }

    /// The calendar the selected slot is checked against.
    pub fn resource(&self) -> Option<Resource> {
        if self.is_team_mode {
            self.selected_team_id.clone().map(Resource::Team)
        } else {
            self.selected_agent_id.clone().map(Resource::Agent)
        }
    }

    pub fn missing_fields(&self, settings: &EngineSettings) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.selected_time_slot.is_none() {
            missing.push(MissingField::TimeSlot);
        }
        if self.selected_agent_id.is_none() {
            missing.push(MissingField::Agent);
        }
        if self.selected_party_member_ids.is_empty() {
            missing.push(MissingField::PartyMembers);
        }
        if settings.require_tour_type && self.tour_type.is_none() {
            missing.push(MissingField::TourType);
        }
        missing
    }
}

/// The tour type dropdown for a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourTypeOptions {
    pub options: Vec<TourType>,
    /// Set when there is exactly one option.
    pub preselected: Option<TourType>,
    /// A single option needs no dropdown.
    pub hidden: bool,
}

impl TourTypeOptions {
    /// Selectable types enabled for the property, plus the type an edited
    /// appointment already carries even if it is no longer offered.
    pub fn for_property(stored: Option<TourType>, enabled: &[TourType]) -> Self {
        let mut options: Vec<TourType> = TourType::SELECTABLE
            .into_iter()
            .filter(|t| enabled.contains(t))
            .collect();
        if let Some(stored) = stored.filter(|t| !options.contains(t)) {
            options.push(stored);
        }
        let preselected = match options.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        Self {
            options,
            preselected,
            hidden: preselected.is_some(),
        }
    }

    pub fn offers(&self, tour_type: TourType) -> bool {
        self.options.contains(&tour_type)
    }
}

impl Default for TourTypeOptions {
    fn default() -> Self {
        Self::for_property(None, &TourType::SELECTABLE)
    }
}

/// A guest as far as contact details go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    pub id: PartyMemberId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// The only email is a relay address that hides the real one.
    #[serde(default)]
    pub anonymous_email: bool,
}

/// Informational warning about a selected guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", content = "partyMemberId", rename_all = "camelCase")]
pub enum ContactWarning {
    NoContactInfo(PartyMemberId),
    AnonymousEmailOnly(PartyMemberId),
}

/// What the persistence collaborator writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayload {
    pub slot: Interval,
    pub agent_id: AgentId,
    pub team_id: Option<TeamId>,
    /// Sorted.
    pub party_member_ids: Vec<PartyMemberId>,
    pub unit_ids: Vec<UnitId>,
    pub tour_type: Option<TourType>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SubmitCommand {
    Create(AppointmentPayload),
    #[serde(rename_all = "camelCase")]
    Update {
        appointment_id: AppointmentId,
        payload: AppointmentPayload,
        date_changed: bool,
    },
}

impl SubmitCommand {
    pub const fn payload(&self) -> &AppointmentPayload {
        match self {
            Self::Create(payload) | Self::Update { payload, .. } => payload,
        }
    }
}

fn to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::minutes(1))
        .unwrap_or(instant)
}

/// State machine over an [`AppointmentDraft`].
pub struct DraftController<'e, R = LeastBookedResolver, D = Discard, S = Discard> {
    engine: &'e AvailabilityEngine<R>,
    settings: EngineSettings,
    draft: AppointmentDraft,
    events: Vec<CalendarEvent>,
    decision: Option<SlotDecision>,
    acknowledged: BTreeSet<EventId>,
    agent_chosen_manually: bool,
    tour_types: TourTypeOptions,
    is_selected_time_in_past: bool,
    has_date_changed: bool,
    now: DateTime<Utc>,
    state: DraftState,
    decision_sink: D,
    submit_sink: S,
}

impl<'e, R: NextAgentResolver> DraftController<'e, R> {
    /// Opens a controller over `draft` with the current calendar snapshot.
    ///
    /// A draft seeded with a slot is evaluated immediately.
    pub fn new(
        engine: &'e AvailabilityEngine<R>,
        settings: EngineSettings,
        draft: AppointmentDraft,
        events: Vec<CalendarEvent>,
        now: DateTime<Utc>,
    ) -> Self {
        let tour_types = TourTypeOptions::for_property(
            draft.editing.as_ref().and_then(|e| e.tour_type),
            &TourType::SELECTABLE,
        );
        let mut controller = Self {
            engine,
            settings,
            draft,
            events: Vec::new(),
            decision: None,
            acknowledged: BTreeSet::new(),
            agent_chosen_manually: false,
            tour_types,
            is_selected_time_in_past: false,
            has_date_changed: false,
            now,
            state: DraftState::Empty,
            decision_sink: Discard,
            submit_sink: Discard,
        };
        controller.events = controller.without_edited(events);
        if controller.draft.selected_time_slot.is_some() {
            let has_overlap = controller.evaluate_selection().is_some_and(|d| d.has_overlap);
            controller.draft.display_overlap_warning = has_overlap;
            controller.agent_chosen_manually = controller.draft.editing.is_some();
        }
        controller.settle();
        controller
    }
}

impl<'e, R, D, S> DraftController<'e, R, D, S>
where
    R: NextAgentResolver,
    D: SlotDecisionSink,
    S: SubmitSink,
{
    /// Replaces the output ports.
    pub fn with_sinks<D2, S2>(self, decision_sink: D2, submit_sink: S2) -> DraftController<'e, R, D2, S2>
    where
        D2: SlotDecisionSink,
        S2: SubmitSink,
    {
        let mut controller = DraftController {
            engine: self.engine,
            settings: self.settings,
            draft: self.draft,
            events: self.events,
            decision: self.decision,
            acknowledged: self.acknowledged,
            agent_chosen_manually: self.agent_chosen_manually,
            tour_types: self.tour_types,
            is_selected_time_in_past: self.is_selected_time_in_past,
            has_date_changed: self.has_date_changed,
            now: self.now,
            state: self.state,
            decision_sink,
            submit_sink,
        };
        if let Some(decision) = &controller.decision {
            controller.decision_sink.on_slot_decision(decision);
        }
        controller
    }

    /// Restricts the tour type dropdown to what the property enables.
    ///
    /// A single remaining option is preselected when no type is set yet.
    pub fn offer_tour_types(&mut self, enabled: &[TourType]) -> &TourTypeOptions {
        let stored = self.draft.editing.as_ref().and_then(|e| e.tour_type);
        self.tour_types = TourTypeOptions::for_property(stored, enabled);
        if self.draft.tour_type.is_none() && !self.state.is_terminal() {
            self.draft.tour_type = self.tour_types.preselected;
            self.settle();
        }
        &self.tour_types
    }

    pub const fn state(&self) -> DraftState {
        self.state
    }

    pub const fn draft(&self) -> &AppointmentDraft {
        &self.draft
    }

    pub const fn decision(&self) -> Option<&SlotDecision> {
        self.decision.as_ref()
    }

    pub const fn tour_type_options(&self) -> &TourTypeOptions {
        &self.tour_types
    }

    pub const fn is_selected_time_in_past(&self) -> bool {
        self.is_selected_time_in_past
    }

    pub const fn has_date_changed(&self) -> bool {
        self.has_date_changed
    }

    pub const fn decision_sink(&self) -> &D {
        &self.decision_sink
    }

    pub const fn submit_sink(&self) -> &S {
        &self.submit_sink
    }

    pub fn missing_fields(&self) -> Vec<MissingField> {
        self.draft.missing_fields(&self.settings)
    }

    /// Whether saving should tell the guests about the change.
    pub fn should_notify_guests(&self) -> bool {
        let empty = BTreeSet::new();
        let original = self
            .draft
            .editing
            .as_ref()
            .map_or(&empty, |e| &e.party_member_ids);
        original != &self.draft.selected_party_member_ids
            || (self.has_date_changed && !self.is_selected_time_in_past)
    }

    /// Selected guests who cannot be reached, or only through a relay address.
    pub fn contact_warnings(&self, members: &[PartyMember]) -> Vec<ContactWarning> {
        members
            .iter()
            .filter(|m| self.draft.selected_party_member_ids.contains(&m.id))
            .filter_map(|m| match (&m.email, &m.phone) {
                (None, None) => Some(ContactWarning::NoContactInfo(m.id.clone())),
                (Some(_), None) if m.anonymous_email => {
                    Some(ContactWarning::AnonymousEmailOnly(m.id.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn ensure_open(&self, action: &'static str) -> Result<(), DraftError> {
        if self.state.is_terminal() {
            return Err(DraftError::IllegalTransition {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    fn without_edited(&self, mut events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
        if let Some(existing) = &self.draft.editing {
            events.retain(|e| e.id.as_str() != existing.id.as_str());
        }
        events
    }

    /// Runs the engine on the selected slot and publishes the decision.
    fn evaluate_selection(&mut self) -> Option<&SlotDecision> {
        let interval = self.draft.selected_time_slot?;
        let Some(resource) = self.draft.resource() else {
            self.decision = None;
            return None;
        };
        let decision = self
            .engine
            .evaluate(&SlotRequest::new(interval, resource), &self.events);
        self.decision_sink.on_slot_decision(&decision);
        self.decision = Some(decision);
        self.decision.as_ref()
    }

    fn overlap_ids(&self) -> BTreeSet<EventId> {
        self.decision
            .iter()
            .flat_map(|d| d.overlapping_events.iter().map(|e| e.id.clone()))
            .collect()
    }

    fn adopt_suggestion(&mut self) {
        if self.draft.is_team_mode && !self.agent_chosen_manually {
            self.draft.selected_agent_id = self
                .decision
                .as_ref()
                .and_then(SlotDecision::suggested_agent_id)
                .cloned();
        }
    }

    fn settle(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = if self.draft.selected_time_slot.is_none() {
            DraftState::Empty
        } else if self.draft.display_overlap_warning {
            DraftState::OverlapWarned
        } else if self.missing_fields().is_empty() {
            DraftState::ReadyToSubmit
        } else {
            DraftState::SlotSelected
        };
    }

    /// Selects `interval` and re-runs availability for it.
    pub fn select_slot(&mut self, interval: Interval) -> Result<DraftState, DraftError> {
        self.ensure_open("select a slot")?;
        self.draft.selected_time_slot = Some(interval);

        if let Some(existing) = &self.draft.editing {
            self.is_selected_time_in_past = to_minute(interval.start()) < to_minute(self.now);
            self.has_date_changed = existing.interval.start() != interval.start();
        }

        self.agent_chosen_manually = false;
        self.acknowledged.clear();
        let has_overlap = self.evaluate_selection().is_some_and(|d| d.has_overlap);
        self.draft.display_overlap_warning = has_overlap;
        self.adopt_suggestion();
        self.settle();

        tracing::debug!(
            slot = %interval,
            has_overlap,
            state = %self.state,
            "selected slot"
        );
        Ok(self.state)
    }

    /// Accepts the current conflict without checking again.
    pub fn acknowledge_overlap(&mut self) -> Result<DraftState, DraftError> {
        if self.state != DraftState::OverlapWarned {
            return Err(DraftError::IllegalTransition {
                action: "acknowledge an overlap",
                state: self.state,
            });
        }
        self.acknowledged = self.overlap_ids();
        self.draft.display_overlap_warning = false;
        self.settle();
        tracing::debug!(acknowledged = self.acknowledged.len(), "overlap acknowledged");
        Ok(self.state)
    }

    /// Switches the booked calendar and drops the selected slot.
    pub fn change_resource(&mut self, resource: Resource) -> Result<DraftState, DraftError> {
        self.ensure_open("change the resource")?;
        tracing::debug!(?resource, "changing resource");
        self.draft.point_at(resource);
        self.draft.selected_time_slot = None;
        self.draft.display_overlap_warning = false;
        self.decision = None;
        self.acknowledged.clear();
        self.agent_chosen_manually = false;
        self.is_selected_time_in_past = false;
        self.has_date_changed = false;
        self.settle();
        Ok(self.state)
    }

    /// Overrides the resolver's pick in team mode.
    pub fn choose_agent(&mut self, agent: AgentId) -> Result<DraftState, DraftError> {
        self.ensure_open("choose an agent")?;
        if !self.draft.is_team_mode {
            return Err(DraftError::NotTeamMode);
        }
        self.draft.selected_agent_id = Some(agent);
        self.agent_chosen_manually = true;
        self.settle();
        Ok(self.state)
    }

    pub fn set_party_members<I>(&mut self, members: I) -> Result<DraftState, DraftError>
    where
        I: IntoIterator<Item = PartyMemberId>,
    {
        self.ensure_open("change party members")?;
        self.draft.selected_party_member_ids = members.into_iter().collect();
        self.settle();
        Ok(self.state)
    }

    pub fn set_units(&mut self, units: Vec<UnitId>) -> Result<DraftState, DraftError> {
        self.ensure_open("change units")?;
        self.draft.selected_unit_ids = units;
        self.settle();
        Ok(self.state)
    }

    pub fn set_tour_type(&mut self, tour_type: Option<TourType>) -> Result<DraftState, DraftError> {
        self.ensure_open("change the tour type")?;
        if let Some(t) = tour_type.filter(|t| !self.tour_types.offers(*t)) {
            return Err(DraftError::TourTypeNotOffered(t));
        }
        self.draft.tour_type = tour_type;
        self.settle();
        Ok(self.state)
    }

    pub fn set_note(&mut self, note: impl Into<String>) -> Result<DraftState, DraftError> {
        self.ensure_open("change the note")?;
        self.draft.note = note.into();
        self.settle();
        Ok(self.state)
    }

    /// Replaces the calendar snapshot and re-evaluates the selected slot.
    ///
    /// An acknowledgement survives only if every event now overlapping was
    /// already acknowledged.
    pub fn refresh_events(&mut self, events: Vec<CalendarEvent>) -> Result<DraftState, DraftError> {
        self.ensure_open("refresh events")?;
        self.events = self.without_edited(events);

        if self.draft.selected_time_slot.is_some() {
            let has_overlap = self.evaluate_selection().is_some_and(|d| d.has_overlap);
            let current = self.overlap_ids();
            let still_acknowledged = !self.acknowledged.is_empty() && current.is_subset(&self.acknowledged);
            self.draft.display_overlap_warning = has_overlap && !still_acknowledged;
            if !still_acknowledged {
                self.acknowledged.clear();
            }
            self.adopt_suggestion();
        }
        self.settle();
        tracing::debug!(events = self.events.len(), state = %self.state, "refreshed events");
        Ok(self.state)
    }

    /// Validates the draft and emits the create or update command.
    pub fn submit(&mut self) -> Result<SubmitCommand, DraftError> {
        self.ensure_open("submit")?;
        let missing = self.missing_fields();
        if !missing.is_empty() {
            tracing::debug!(?missing, "submit blocked");
            return Err(DraftError::Incomplete { missing });
        }
        if self.state == DraftState::OverlapWarned {
            return Err(DraftError::OverlapNotAcknowledged);
        }

        let (Some(slot), Some(agent_id)) = (
            self.draft.selected_time_slot,
            self.draft.selected_agent_id.clone(),
        ) else {
            return Err(DraftError::Incomplete {
                missing: self.missing_fields(),
            });
        };
        let payload = AppointmentPayload {
            slot,
            agent_id,
            team_id: self.draft.selected_team_id.clone(),
            party_member_ids: self.draft.selected_party_member_ids.iter().cloned().collect(),
            unit_ids: self.draft.selected_unit_ids.clone(),
            tour_type: self.draft.tour_type,
            note: self.draft.note.clone(),
        };
        let command = match &self.draft.editing {
            Some(existing) => SubmitCommand::Update {
                appointment_id: existing.id.clone(),
                payload,
                date_changed: self.has_date_changed,
            },
            None => SubmitCommand::Create(payload),
        };

        self.state = DraftState::Submitted;
        self.submit_sink.on_submit(&command);
        tracing::debug!(slot = %slot, notify_guests = self.should_notify_guests(), "draft submitted");
        Ok(command)
    }

    pub fn cancel(&mut self) -> Result<DraftState, DraftError> {
        self.ensure_open("cancel")?;
        self.state = DraftState::Cancelled;
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::UTC;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, hour, minute, 0)
            .single()
            .expect("valid test timestamp")
    }

    fn iv(start: (u32, u32), end: (u32, u32)) -> Interval {
        Interval::new(at(start.0, start.1), at(end.0, end.1), UTC).unwrap()
    }

    fn agent(id: &str) -> AgentId {
        AgentId::new(id).unwrap()
    }

    fn team() -> TeamId {
        TeamId::new("leasing").unwrap()
    }

    fn member(id: &str) -> PartyMemberId {
        PartyMemberId::new(id).unwrap()
    }

    fn appointment(id: &str, owner: &str, interval: Interval) -> CalendarEvent {
        CalendarEvent::appointment(EventId::new(id).unwrap(), agent(owner), interval, &[], at(0, 0))
    }

    fn engine() -> AvailabilityEngine {
        AvailabilityEngine::default().with_roster(team(), vec![agent("ann"), agent("bob")])
    }

    fn settings() -> EngineSettings {
        EngineSettings::default()
    }

    fn now() -> DateTime<Utc> {
        at(8, 0)
    }

    fn agent_controller<'e>(
        engine: &'e AvailabilityEngine,
        events: Vec<CalendarEvent>,
    ) -> DraftController<'e> {
        DraftController::new(
            engine,
            settings(),
            AppointmentDraft::new(Resource::Agent(agent("ann"))),
            events,
            now(),
        )
    }

    fn fill_required<D: SlotDecisionSink, S: SubmitSink>(c: &mut DraftController<'_, LeastBookedResolver, D, S>) {
        c.set_party_members([member("p1")]).unwrap();
        c.set_tour_type(Some(TourType::InPersonTour)).unwrap();
    }

    #[test]
    fn new_draft_is_empty() {
        let engine = engine();
        let c = agent_controller(&engine, Vec::new());
        assert_eq!(c.state(), DraftState::Empty);
        assert_eq!(
            c.missing_fields(),
            vec![MissingField::TimeSlot, MissingField::PartyMembers, MissingField::TourType]
        );
    }

    #[test]
    fn agent_mode_overlap_then_acknowledge_then_submit() {
        let engine = engine();
        let events = vec![appointment("existing", "ann", iv((9, 0), (9, 30)))];
        let mut c = agent_controller(&engine, events)
            .with_sinks(Vec::<SlotDecision>::new(), Vec::<SubmitCommand>::new());
        fill_required(&mut c);

        assert_eq!(c.select_slot(iv((9, 15), (9, 45))).unwrap(), DraftState::OverlapWarned);
        let decision = c.decision().unwrap();
        assert!(decision.has_overlap);
        assert_eq!(decision.overlapping_events[0].id.as_str(), "existing");
        assert!(c.draft().display_overlap_warning);
        assert_eq!(c.submit(), Err(DraftError::OverlapNotAcknowledged));

        assert_eq!(c.acknowledge_overlap().unwrap(), DraftState::ReadyToSubmit);
        let command = c.submit().unwrap();
        assert_eq!(c.state(), DraftState::Submitted);
        assert!(matches!(command, SubmitCommand::Create(_)));
        assert_eq!(command.payload().agent_id, agent("ann"));

        assert_eq!(c.decision_sink().len(), 1);
        assert_eq!(c.submit_sink(), &vec![command]);
    }

    #[test]
    fn acknowledge_is_only_legal_when_warned() {
        let engine = engine();
        let mut c = agent_controller(&engine, Vec::new());
        c.select_slot(iv((9, 0), (9, 15))).unwrap();
        assert_eq!(
            c.acknowledge_overlap(),
            Err(DraftError::IllegalTransition {
                action: "acknowledge an overlap",
                state: DraftState::SlotSelected,
            })
        );
    }

    #[test]
    fn submit_without_party_members_is_rejected() {
        let engine = engine();
        let mut c = agent_controller(&engine, Vec::new());
        c.set_tour_type(Some(TourType::VirtualTour)).unwrap();
        c.select_slot(iv((9, 0), (9, 15))).unwrap();

        let err = c.submit().unwrap_err();
        assert_eq!(
            err,
            DraftError::Incomplete {
                missing: vec![MissingField::PartyMembers]
            }
        );
        assert_eq!(err.to_string(), "missing required fields: party members");
        assert_eq!(c.state(), DraftState::SlotSelected);
    }

    #[test]
    fn tour_type_is_optional_outside_complete_mode() {
        let engine = engine();
        let relaxed = EngineSettings {
            require_tour_type: false,
            ..settings()
        };
        let mut c = DraftController::new(
            &engine,
            relaxed,
            AppointmentDraft::new(Resource::Agent(agent("ann"))),
            Vec::new(),
            now(),
        );
        c.set_party_members([member("p1")]).unwrap();
        assert_eq!(c.select_slot(iv((9, 0), (9, 15))).unwrap(), DraftState::ReadyToSubmit);
    }

    #[test]
    fn team_mode_adopts_the_suggested_agent() {
        let engine = engine();
        let mut c = DraftController::new(
            &engine,
            settings(),
            AppointmentDraft::new(Resource::Team(team())),
            Vec::new(),
            now(),
        );
        fill_required(&mut c);

        assert_eq!(c.select_slot(iv((14, 0), (15, 0))).unwrap(), DraftState::ReadyToSubmit);
        let picked = c.draft().selected_agent_id.clone().unwrap();
        assert!([agent("ann"), agent("bob")].contains(&picked));
        assert_eq!(c.submit().unwrap().payload().team_id, Some(team()));
    }

    #[test]
    fn team_mode_with_nobody_free_needs_a_manual_agent() {
        let engine = engine();
        let events = vec![
            appointment("ann-busy", "ann", iv((14, 0), (15, 0))),
            appointment("bob-busy", "bob", iv((14, 30), (15, 30))),
        ];
        let mut c = DraftController::new(
            &engine,
            settings(),
            AppointmentDraft::new(Resource::Team(team())),
            events,
            now(),
        );
        fill_required(&mut c);

        assert_eq!(c.select_slot(iv((14, 0), (15, 0))).unwrap(), DraftState::SlotSelected);
        assert!(c.decision().unwrap().requires_manual_agent());
        assert_eq!(c.missing_fields(), vec![MissingField::Agent]);

        assert_eq!(c.choose_agent(agent("cy")).unwrap(), DraftState::ReadyToSubmit);
        assert_eq!(c.submit().unwrap().payload().agent_id, agent("cy"));
    }

    #[test]
    fn choose_agent_needs_team_mode() {
        let engine = engine();
        let mut c = agent_controller(&engine, Vec::new());
        assert_eq!(c.choose_agent(agent("bob")), Err(DraftError::NotTeamMode));
    }

    #[test]
    fn changing_resource_drops_the_slot() {
        let engine = engine();
        let events = vec![appointment("existing", "ann", iv((9, 0), (9, 30)))];
        let mut c = agent_controller(&engine, events);
        c.select_slot(iv((9, 15), (9, 45))).unwrap();

        assert_eq!(c.change_resource(Resource::Team(team())).unwrap(), DraftState::Empty);
        assert_eq!(c.draft().selected_time_slot, None);
        assert_eq!(c.draft().selected_agent_id, None);
        assert!(!c.draft().display_overlap_warning);
        assert!(c.decision().is_none());
    }

    #[test]
    fn refresh_keeps_acknowledgement_for_the_same_conflicts() {
        let engine = engine();
        let existing = appointment("existing", "ann", iv((9, 0), (9, 30)));
        let mut c = agent_controller(&engine, vec![existing.clone()]);
        fill_required(&mut c);
        c.select_slot(iv((9, 15), (9, 45))).unwrap();
        c.acknowledge_overlap().unwrap();

        assert_eq!(c.refresh_events(vec![existing.clone()]).unwrap(), DraftState::ReadyToSubmit);

        let newcomer = appointment("newcomer", "ann", iv((9, 30), (10, 0)));
        assert_eq!(
            c.refresh_events(vec![existing, newcomer]).unwrap(),
            DraftState::OverlapWarned
        );
    }

    #[test]
    fn team_acknowledgement_survives_a_rebuilt_calendar() {
        let engine = engine();
        let meeting = CalendarEvent::team(EventId::new("t1").unwrap(), team(), iv((14, 0), (15, 0)), at(0, 0));
        let busy = || {
            crate::team_slots::TeamCalendar::build(
                at(0, 0).with_timezone(&UTC),
                1,
                crate::slot::SlotGranularity::TEAM_DEFAULT,
                &[agent("ann"), agent("bob")],
                std::slice::from_ref(&meeting),
                &[],
            )
            .unwrap()
            .busy_events(&team(), now())
        };
        let mut c = DraftController::new(
            &engine,
            settings(),
            AppointmentDraft::new(Resource::Team(team())),
            busy(),
            now(),
        );
        fill_required(&mut c);

        assert_eq!(c.select_slot(iv((14, 0), (15, 0))).unwrap(), DraftState::OverlapWarned);
        assert_eq!(c.acknowledge_overlap().unwrap(), DraftState::ReadyToSubmit);
        assert_eq!(c.refresh_events(busy()).unwrap(), DraftState::ReadyToSubmit);
    }

    #[test]
    fn refresh_clears_a_resolved_warning() {
        let engine = engine();
        let mut c = agent_controller(&engine, vec![appointment("existing", "ann", iv((9, 0), (9, 30)))]);
        fill_required(&mut c);
        c.select_slot(iv((9, 15), (9, 45))).unwrap();
        assert_eq!(c.refresh_events(Vec::new()).unwrap(), DraftState::ReadyToSubmit);
    }

    #[test]
    fn terminal_states_reject_mutation() {
        let engine = engine();
        let mut c = agent_controller(&engine, Vec::new());
        assert_eq!(c.cancel().unwrap(), DraftState::Cancelled);
        assert!(matches!(
            c.select_slot(iv((9, 0), (9, 15))),
            Err(DraftError::IllegalTransition { state: DraftState::Cancelled, .. })
        ));
        assert!(c.submit().is_err());
        assert!(c.cancel().is_err());
    }

    fn existing() -> ExistingAppointment {
        ExistingAppointment {
            id: AppointmentId::new("appt-1").unwrap(),
            interval: iv((10, 0), (10, 30)),
            agent_id: agent("ann"),
            team_id: Some(team()),
            party_member_ids: [member("p1")].into_iter().collect(),
            unit_ids: vec![UnitId::new("unit-101").unwrap()],
            tour_type: Some(TourType::ImportedTour),
            note: "gate code 1234".to_string(),
        }
    }

    #[test]
    fn editing_seeds_the_draft_and_ignores_itself() {
        let engine = engine();
        let itself = CalendarEvent::appointment(
            EventId::new("appt-1").unwrap(),
            agent("ann"),
            iv((10, 0), (10, 30)),
            &[],
            at(0, 0),
        );
        let c = DraftController::new(
            &engine,
            settings(),
            AppointmentDraft::editing(existing()),
            vec![itself],
            now(),
        );

        assert_eq!(c.state(), DraftState::ReadyToSubmit);
        assert!(!c.decision().unwrap().has_overlap);
        assert_eq!(c.draft().note, "gate code 1234");
        assert!(c.tour_type_options().offers(TourType::ImportedTour));
        assert!(!c.should_notify_guests());
    }

    #[test]
    fn editing_a_conflicting_slot_starts_warned() {
        let engine = engine();
        let other = appointment("other", "ann", iv((10, 0), (10, 30)));
        let mut c = DraftController::new(
            &engine,
            settings(),
            AppointmentDraft::editing(existing()),
            vec![other],
            now(),
        );

        assert_eq!(c.state(), DraftState::OverlapWarned);
        assert!(c.draft().display_overlap_warning);
        assert_eq!(c.submit(), Err(DraftError::OverlapNotAcknowledged));

        assert_eq!(c.acknowledge_overlap().unwrap(), DraftState::ReadyToSubmit);
        assert!(matches!(c.submit().unwrap(), SubmitCommand::Update { .. }));
    }

    #[test]
    fn editing_tracks_date_changes() {
        let engine = engine();
        let mut c = DraftController::new(
            &engine,
            settings(),
            AppointmentDraft::editing(existing()),
            Vec::new(),
            at(12, 0),
        );

        c.select_slot(iv((11, 0), (11, 30))).unwrap();
        assert!(c.has_date_changed());
        assert!(c.is_selected_time_in_past());
        assert!(!c.should_notify_guests());

        c.select_slot(iv((13, 0), (13, 30))).unwrap();
        assert!(!c.is_selected_time_in_past());
        assert!(c.should_notify_guests());

        let command = c.submit().unwrap();
        assert!(matches!(
            command,
            SubmitCommand::Update { date_changed: true, .. }
        ));
    }

    #[test]
    fn changed_guests_are_notified() {
        let engine = engine();
        let mut c = DraftController::new(
            &engine,
            settings(),
            AppointmentDraft::editing(existing()),
            Vec::new(),
            now(),
        );
        c.set_party_members([member("p1"), member("p2")]).unwrap();
        assert!(c.should_notify_guests());
    }

    #[test]
    fn single_tour_type_is_preselected() {
        let options = TourTypeOptions::for_property(None, &[TourType::VirtualTour]);
        assert_eq!(options.preselected, Some(TourType::VirtualTour));
        assert!(options.hidden);

        let options = TourTypeOptions::for_property(Some(TourType::ImportedTour), &[TourType::VirtualTour]);
        assert_eq!(options.options, vec![TourType::VirtualTour, TourType::ImportedTour]);
        assert!(!options.hidden);
        assert!(!TourTypeOptions::default().offers(TourType::ImportedTour));
    }

    #[test]
    fn offering_one_tour_type_fills_it_in() {
        let engine = engine();
        let mut c = agent_controller(&engine, Vec::new());
        c.offer_tour_types(&[TourType::AgentlessTour]);
        assert_eq!(c.draft().tour_type, Some(TourType::AgentlessTour));
        assert_eq!(
            c.set_tour_type(Some(TourType::VirtualTour)),
            Err(DraftError::TourTypeNotOffered(TourType::VirtualTour))
        );
    }

    #[test]
    fn contact_warnings_cover_selected_members_only() {
        let engine = engine();
        let mut c = agent_controller(&engine, Vec::new());
        c.set_party_members([member("p1"), member("p2"), member("p3")]).unwrap();
        let members = vec![
            PartyMember { id: member("p1"), email: None, phone: None, anonymous_email: false },
            PartyMember {
                id: member("p2"),
                email: Some("relay@example.com".to_string()),
                phone: None,
                anonymous_email: true,
            },
            PartyMember {
                id: member("p3"),
                email: None,
                phone: Some("4155550123".to_string()),
                anonymous_email: false,
            },
            PartyMember { id: member("p4"), email: None, phone: None, anonymous_email: false },
        ];
        assert_eq!(
            c.contact_warnings(&members),
            vec![
                ContactWarning::NoContactInfo(member("p1")),
                ContactWarning::AnonymousEmailOnly(member("p2")),
            ]
        );
    }

    #[test]
    fn payload_serializes_camel_case() {
        let engine = engine();
        let mut c = agent_controller(&engine, Vec::new());
        fill_required(&mut c);
        c.select_slot(iv((9, 0), (9, 15))).unwrap();
        let json = serde_json::to_value(c.submit().unwrap()).unwrap();
        assert_eq!(json["command"], "create");
        assert_eq!(json["agentId"], "ann");
        assert_eq!(json["partyMemberIds"][0], "p1");
        assert_eq!(json["tourType"], "inPersonTour");
    }

    #[test]
    fn team_events_do_not_leak_into_agent_mode() {
        let engine = engine();
        let team_block = CalendarEvent::team(EventId::new("t1").unwrap(), team(), iv((9, 0), (10, 0)), at(0, 0));
        let mut c = agent_controller(&engine, vec![team_block]);
        c.select_slot(iv((9, 0), (9, 15))).unwrap();
        assert!(!c.decision().unwrap().has_overlap);
        assert!(c.decision().unwrap().overlapping_events.is_empty());
    }
}
