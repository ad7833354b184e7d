//! Draft command: replays a scripted booking session.
//!
//! The script is a JSON list of actions, each tagged with `action`:
//!
//! ```json
//! [
//!   {"action": "selectSlot", "start": "2025-01-15 09:15"},
//!   {"action": "acknowledgeOverlap"},
//!   {"action": "setPartyMembers", "ids": ["p1"]},
//!   {"action": "setTourType", "tourType": "inPersonTour"},
//!   {"action": "submit"}
//! ]
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tour_core::{
    AgentId, AppointmentDraft, AppointmentId, AvailabilityEngine, CalendarEvent, CalendarFeed,
    DraftController, DraftError, DraftState, ExistingAppointment, FeedSnapshot, Interval,
    LeastBookedResolver, PartyMemberId, Resource, SlotDecision, SubmitCommand, TeamId, TourType,
    UnitId, day_window, round_down,
};

use crate::Config;
use crate::commands::util;
use crate::feed_file::JsonFileFeed;

/// One scripted user interaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DraftAction {
    SelectSlot {
        start: String,
        #[serde(default)]
        minutes: Option<u32>,
    },
    AcknowledgeOverlap,
    ChangeResource {
        #[serde(default)]
        agent: Option<AgentId>,
        #[serde(default)]
        team: Option<TeamId>,
    },
    ChooseAgent {
        agent: AgentId,
    },
    SetPartyMembers {
        ids: Vec<PartyMemberId>,
    },
    SetUnits {
        ids: Vec<UnitId>,
    },
    SetTourType {
        #[serde(default)]
        tour_type: Option<TourType>,
    },
    SetNote {
        note: String,
    },
    Submit,
    Cancel,
}

impl DraftAction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectSlot { .. } => "selectSlot",
            Self::AcknowledgeOverlap => "acknowledgeOverlap",
            Self::ChangeResource { .. } => "changeResource",
            Self::ChooseAgent { .. } => "chooseAgent",
            Self::SetPartyMembers { .. } => "setPartyMembers",
            Self::SetUnits { .. } => "setUnits",
            Self::SetTourType { .. } => "setTourType",
            Self::SetNote { .. } => "setNote",
            Self::Submit => "submit",
            Self::Cancel => "cancel",
        }
    }
}

/// Parsed arguments of `tour draft`.
#[derive(Debug, Clone)]
pub struct DraftArgs<'a> {
    pub feed: &'a Path,
    pub script: &'a Path,
    pub resource: Resource,
    pub members: Vec<AgentId>,
    pub edit: Option<&'a Path>,
    pub now: DateTime<Utc>,
}

/// Everything needed to rebuild the event snapshot for a resource and day.
struct Session<'a> {
    snapshot: FeedSnapshot,
    members: &'a [AgentId],
    config: &'a Config,
    editing: Option<AppointmentId>,
    now: DateTime<Utc>,
}

impl Session<'_> {
    fn events(&self, resource: &Resource, day: &Interval) -> Result<Vec<CalendarEvent>> {
        match resource {
            Resource::Agent(agent) => Ok(self
                .snapshot
                .agent_events(agent, day, self.editing.as_ref(), self.now)?),
            Resource::Team(team) => {
                let calendar = util::team_calendar(
                    &self.snapshot,
                    team,
                    self.members,
                    self.config,
                    day.local_start(),
                    self.now,
                )?;
                let mut events = calendar.busy_events(team, self.now);
                events.extend(self.snapshot.member_events(day.timezone(), self.now)?);
                Ok(events)
            }
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("malformed {what} {}", path.display()))
}

pub fn run<W: Write>(writer: &mut W, config: &Config, args: &DraftArgs<'_>) -> Result<()> {
    let tz = config.tz().context("invalid timezone")?;
    let settings = config.engine_settings().context("invalid team_slot_minutes")?;
    let actions: Vec<DraftAction> = read_json(args.script, "draft script")?;
    let existing: Option<ExistingAppointment> = args
        .edit
        .map(|path| read_json(path, "appointment"))
        .transpose()?;

    let draft = match existing {
        Some(existing) => AppointmentDraft::editing(existing),
        None => AppointmentDraft::new(args.resource.clone()),
    };
    let first_day = day_window(
        draft.selected_time_slot.map_or(args.now, |slot| slot.start()),
        tz,
    );
    let snapshot = JsonFileFeed::new(args.feed)
        .load(&args.resource, &first_day, tz)
        .with_context(|| format!("failed to load feed {}", args.feed.display()))?;
    let session = Session {
        snapshot,
        members: &args.members,
        config,
        editing: draft.editing.as_ref().map(|e| e.id.clone()),
        now: args.now,
    };

    let member_events = session.snapshot.member_events(tz, args.now)?;
    let mut engine = AvailabilityEngine::new(LeastBookedResolver::from_events(&member_events));
    for team in teams_in(&args.resource, &actions) {
        engine = engine.with_roster(team, args.members.clone());
    }

    let initial_resource = draft.resource().unwrap_or_else(|| args.resource.clone());
    let initial_events = session.events(&initial_resource, &first_day)?;
    let mut controller = DraftController::new(&engine, settings, draft, initial_events, args.now)
        .with_sinks(Vec::<SlotDecision>::new(), Vec::<SubmitCommand>::new());
    controller.offer_tour_types(&config.tour_types);

    for (step, action) in actions.into_iter().enumerate() {
        let name = action.name();
        let outcome = match action {
            DraftAction::SelectSlot { start, minutes } => {
                let Some(resource) = controller.draft().resource() else {
                    writeln!(writer, "{}. {name} -> rejected: no resource selected", step + 1)?;
                    continue;
                };
                let interval = slot_interval(&start, minutes, &resource, &settings, tz, args.now)?;
                let events = session.events(&resource, &day_window(interval.start(), tz))?;
                controller
                    .refresh_events(events)
                    .and_then(|_| controller.select_slot(interval))
            }
            DraftAction::AcknowledgeOverlap => controller.acknowledge_overlap(),
            DraftAction::ChangeResource { agent, team } => {
                let resource = match (agent, team) {
                    (Some(agent), None) => Resource::Agent(agent),
                    (None, Some(team)) => Resource::Team(team),
                    _ => anyhow::bail!("step {}: changeResource needs exactly one of agent or team", step + 1),
                };
                controller.change_resource(resource)
            }
            DraftAction::ChooseAgent { agent } => controller.choose_agent(agent),
            DraftAction::SetPartyMembers { ids } => controller.set_party_members(ids),
            DraftAction::SetUnits { ids } => controller.set_units(ids),
            DraftAction::SetTourType { tour_type } => controller.set_tour_type(tour_type),
            DraftAction::SetNote { note } => controller.set_note(note),
            DraftAction::Submit => controller.submit().map(|_| DraftState::Submitted),
            DraftAction::Cancel => controller.cancel(),
        };
        report_step(writer, step + 1, name, &outcome)?;
        if name == "selectSlot" && outcome.is_ok() {
            if let Some(decision) = controller.decision() {
                report_decision(writer, decision)?;
            }
        }
    }

    writeln!(writer, "State: {}", controller.state())?;
    if !controller.state().is_terminal() {
        let missing = controller.missing_fields();
        if !missing.is_empty() {
            let names: Vec<_> = missing.iter().map(ToString::to_string).collect();
            writeln!(writer, "Missing: {}", names.join(", "))?;
        }
    }
    if let Some(command) = controller.submit_sink().last() {
        let notify = if controller.should_notify_guests() { "yes" } else { "no" };
        writeln!(writer, "Notify guests: {notify}")?;
        writeln!(writer, "{}", serde_json::to_string_pretty(command)?)?;
    }
    tracing::debug!(decisions = controller.decision_sink().len(), "draft session finished");
    Ok(())
}

/// Teams the session may book against.
fn teams_in(resource: &Resource, actions: &[DraftAction]) -> Vec<TeamId> {
    let initial = match resource {
        Resource::Team(team) => Some(team.clone()),
        Resource::Agent(_) => None,
    };
    initial
        .into_iter()
        .chain(actions.iter().filter_map(|a| match a {
            DraftAction::ChangeResource { team: Some(team), .. } => Some(team.clone()),
            _ => None,
        }))
        .collect()
}

fn slot_interval(
    start: &str,
    minutes: Option<u32>,
    resource: &Resource,
    settings: &tour_core::EngineSettings,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<Interval> {
    let granularity = resource.granularity(settings);
    let start = round_down(util::parse_time(start, tz, now)?, granularity, tz);
    let minutes = minutes.unwrap_or_else(|| granularity.minutes());
    Interval::starting_at(start, i64::from(minutes), tz).context("invalid slot length")
}

fn report_step<W: Write>(
    writer: &mut W,
    step: usize,
    name: &str,
    outcome: &Result<DraftState, DraftError>,
) -> Result<()> {
    match outcome {
        Ok(state) => writeln!(writer, "{step}. {name} -> {state}")?,
        Err(err) => writeln!(writer, "{step}. {name} -> rejected: {err}")?,
    }
    Ok(())
}

fn report_decision<W: Write>(writer: &mut W, decision: &SlotDecision) -> Result<()> {
    writeln!(writer, "   slot {}", decision.interval)?;
    for event in &decision.overlapping_events {
        writeln!(writer, "   overlaps {} {}", event.kind, event.interval)?;
    }
    if decision.requires_manual_agent() {
        writeln!(writer, "   no free agent, choose one manually")?;
    } else if let Some(agent) = decision.suggested_agent_id() {
        writeln!(writer, "   suggested agent {agent}")?;
    }
    Ok(())
}
