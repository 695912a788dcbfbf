//! TransitionEngine: the booking dialogue as a `(Step, Intent)` table.
//!
//! The engine never touches storage or the network except through the
//! address resolver. It returns the next state, the messages to send and any
//! side effect for the dispatcher to run.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::booking::model::VehicleClass;
use crate::channels::channel::Outbound;
use crate::conversation::intent::{Intent, buttons, rows};
use crate::conversation::prompts::{self, Leg, MAX_CANDIDATES};
use crate::conversation::state::{AddressCandidate, ConversationState, Step};
use crate::datetime::{DateTimeNormalizer, PickupTime, QuickOption};
use crate::error::NormalizeError;
use crate::resolver::{AddressQuery, AddressResolver, resolve_or_empty};

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Persist a booking together with the CONFIRM → DONE write.
    CreateBooking,
    /// Reply with the customer's recent bookings.
    ListBookings,
}

/// Outcome of feeding one intent to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State to persist, or `None` to leave the stored state untouched.
    pub next: Option<ConversationState>,
    pub outbound: Vec<Outbound>,
    pub command: Option<Command>,
}

impl Transition {
    /// No state change, nothing to send.
    pub fn ignored() -> Self {
        Self {
            next: None,
            outbound: Vec::new(),
            command: None,
        }
    }

    /// Send messages without changing state.
    fn reply(outbound: Vec<Outbound>) -> Self {
        Self {
            next: None,
            outbound,
            command: None,
        }
    }

    fn save(state: ConversationState, outbound: Vec<Outbound>) -> Self {
        Self {
            next: Some(state),
            outbound,
            command: None,
        }
    }

    fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    pub fn is_ignored(&self) -> bool {
        self.next.is_none() && self.outbound.is_empty() && self.command.is_none()
    }
}

/// Move `state` to `step`, or ignore the event if the edge is illegal.
fn advance(mut state: ConversationState, step: Step, outbound: Vec<Outbound>) -> Transition {
    if !state.move_to(step) {
        return Transition::ignored();
    }
    Transition::save(state, outbound)
}

pub struct TransitionEngine {
    resolver: Arc<dyn AddressResolver>,
    normalizer: DateTimeNormalizer,
}

impl TransitionEngine {
    pub fn new(resolver: Arc<dyn AddressResolver>, normalizer: DateTimeNormalizer) -> Self {
        Self {
            resolver,
            normalizer,
        }
    }

    /// Compute the transition for `intent` arriving while in `state`.
    ///
    /// `now` is the reference instant for quick time options.
    pub async fn transition(
        &self,
        state: &ConversationState,
        intent: &Intent,
        now: DateTime<Utc>,
    ) -> Transition {
        match intent {
            Intent::Restart => {
                let mut next = state.clone();
                next.reset();
                return Transition::save(next, vec![prompts::name_prompt()]);
            }
            Intent::MyBookings => {
                return Transition::ignored().with_command(Command::ListBookings);
            }
            _ => {}
        }

        match state.step {
            Step::AskName => self.on_ask_name(state, intent),
            Step::AskPickup => self.on_ask_pickup(state, intent).await,
            Step::PickupChoose => self.on_choose(state, intent, Leg::Pickup),
            Step::AskDropoff => self.on_ask_dropoff(state, intent).await,
            Step::DropoffChoose => self.on_choose(state, intent, Leg::Dropoff),
            Step::AskDatetime => self.on_ask_datetime(state, intent, now),
            Step::AskVehicle => self.on_ask_vehicle(state, intent),
            Step::Confirm => self.on_confirm(state, intent),
            Step::Done => self.on_done(intent),
        }
    }

    fn on_ask_name(&self, state: &ConversationState, intent: &Intent) -> Transition {
        // First contact: greet without treating the message as a name.
        if state.is_new() {
            return Transition::save(state.clone(), vec![prompts::name_prompt()]);
        }
        let Intent::Text(text) = intent else {
            return Transition::ignored();
        };
        let name = text.trim().to_string();
        let mut next = state.clone();
        next.temp.name = Some(name.clone());
        advance(next, Step::AskPickup, vec![prompts::pickup_prompt(&name)])
    }

    async fn on_ask_pickup(&self, state: &ConversationState, intent: &Intent) -> Transition {
        let query = match intent {
            Intent::Text(text) => AddressQuery::Text(text.trim().to_string()),
            Intent::Location(c) => AddressQuery::Coordinates(*c),
            _ => return Transition::ignored(),
        };
        let candidates = self.lookup(&query).await;

        let mut next = state.clone();
        match candidates.len() {
            0 => Transition::reply(vec![prompts::pickup_not_found()]),
            1 => {
                next.temp.pickup = Some(candidates[0].text.clone());
                next.temp.pickup_options.clear();
                advance(next, Step::AskDropoff, vec![prompts::dropoff_prompt()])
            }
            _ => {
                let list = prompts::candidate_list(Leg::Pickup, &candidates);
                next.temp.pickup_options = candidates;
                advance(next, Step::PickupChoose, vec![list])
            }
        }
    }

    async fn on_ask_dropoff(&self, state: &ConversationState, intent: &Intent) -> Transition {
        let Intent::Text(text) = intent else {
            return Transition::ignored();
        };
        let candidates = self
            .lookup(&AddressQuery::Text(text.trim().to_string()))
            .await;

        let mut next = state.clone();
        match candidates.len() {
            0 => Transition::reply(vec![prompts::dropoff_not_found()]),
            1 => {
                next.temp.dropoff = Some(candidates[0].text.clone());
                next.temp.dropoff_options.clear();
                advance(next, Step::AskDatetime, vec![prompts::time_prompt()])
            }
            _ => {
                let list = prompts::candidate_list(Leg::Dropoff, &candidates);
                next.temp.dropoff_options = candidates;
                advance(next, Step::DropoffChoose, vec![list])
            }
        }
    }

    async fn lookup(&self, query: &AddressQuery) -> Vec<AddressCandidate> {
        let mut candidates = resolve_or_empty(self.resolver.as_ref(), query).await;
        candidates.truncate(MAX_CANDIDATES);
        candidates
    }

    /// PICKUP_CHOOSE / DROPOFF_CHOOSE: accept a row id matching a stored candidate.
    fn on_choose(&self, state: &ConversationState, intent: &Intent, leg: Leg) -> Transition {
        let Intent::ListSelect(id) = intent else {
            return Transition::ignored();
        };
        let options = match leg {
            Leg::Pickup => &state.temp.pickup_options,
            Leg::Dropoff => &state.temp.dropoff_options,
        };
        if options.is_empty() {
            return Transition::ignored();
        }

        let selected = id
            .strip_prefix(leg.row_prefix())
            .and_then(|cid| options.iter().find(|c| c.id == cid));
        let Some(selected) = selected else {
            tracing::debug!(phone = %state.phone, id = %id, "Unknown selection, re-sending list");
            return Transition::reply(vec![prompts::candidate_list(leg, options)]);
        };

        let mut next = state.clone();
        match leg {
            Leg::Pickup => {
                next.temp.pickup = Some(selected.text.clone());
                next.temp.pickup_options.clear();
                advance(next, Step::AskDropoff, vec![prompts::dropoff_prompt()])
            }
            Leg::Dropoff => {
                next.temp.dropoff = Some(selected.text.clone());
                next.temp.dropoff_options.clear();
                advance(next, Step::AskDatetime, vec![prompts::time_prompt()])
            }
        }
    }

    fn on_ask_datetime(
        &self,
        state: &ConversationState,
        intent: &Intent,
        now: DateTime<Utc>,
    ) -> Transition {
        let pickup = match intent {
            Intent::Button(id) if id == buttons::CHOOSE_TIME => {
                return Transition::reply(vec![prompts::time_list()]);
            }
            Intent::ListSelect(id) => match QuickOption::from_id(id) {
                Some(option) => self.normalizer.quick(option, now),
                None => return Transition::reply(vec![prompts::time_list()]),
            },
            Intent::Text(text) => match self.normalizer.normalize(text, now) {
                Ok(pickup) => pickup,
                Err(NormalizeError::InPast(_)) => {
                    return Transition::reply(vec![prompts::time_in_past()]);
                }
                Err(e) => {
                    tracing::debug!(phone = %state.phone, error = %e, "Unparsed pickup time");
                    return Transition::reply(vec![prompts::time_not_understood()]);
                }
            },
            _ => return Transition::ignored(),
        };
        self.set_pickup_time(state, pickup)
    }

    fn set_pickup_time(&self, state: &ConversationState, pickup: PickupTime) -> Transition {
        let mut next = state.clone();
        next.temp.booking_date = Some(pickup.date_string());
        next.temp.booking_time = Some(pickup.time_string());
        advance(next, Step::AskVehicle, vec![prompts::vehicle_list()])
    }

    fn on_ask_vehicle(&self, state: &ConversationState, intent: &Intent) -> Transition {
        let vehicle = match intent {
            Intent::ListSelect(id) => id
                .strip_prefix(rows::VEHICLE)
                .and_then(|class| class.parse::<VehicleClass>().ok()),
            Intent::Text(text) => text.parse::<VehicleClass>().ok(),
            _ => return Transition::ignored(),
        };
        let Some(vehicle) = vehicle else {
            return Transition::reply(vec![prompts::vehicle_list()]);
        };

        let mut next = state.clone();
        next.temp.vehicle = Some(vehicle);
        let summary = prompts::summary(&next.temp);
        advance(next, Step::Confirm, vec![summary])
    }

    fn on_confirm(&self, state: &ConversationState, intent: &Intent) -> Transition {
        if intent.is_confirm() {
            return advance(state.clone(), Step::Done, vec![prompts::post_booking_menu()])
                .with_command(Command::CreateBooking);
        }
        if intent.is_edit() || intent.is_cancel() {
            let notice = if intent.is_edit() {
                prompts::editing()
            } else {
                prompts::cancelled()
            };
            let mut next = state.clone();
            next.reset();
            return Transition::save(next, vec![notice, prompts::name_prompt()]);
        }
        match intent {
            Intent::Text(_) => Transition::reply(vec![prompts::summary(&state.temp)]),
            _ => Transition::ignored(),
        }
    }

    fn on_done(&self, intent: &Intent) -> Transition {
        if intent.is_confirm() {
            return Transition::reply(vec![prompts::post_booking_menu()]);
        }
        match intent {
            Intent::Text(_) => Transition::reply(vec![prompts::main_menu()]),
            _ => Transition::ignored(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::channels::channel::OutboundMessage;
    use crate::conversation::state::{Coordinates, TempData};
    use crate::error::ResolverError;

    /// Resolver answering from a fixed table; coordinates resolve to one place.
    struct TableResolver {
        by_text: HashMap<String, Vec<AddressCandidate>>,
    }

    impl TableResolver {
        fn new() -> Self {
            let mut by_text = HashMap::new();
            by_text.insert(
                "10 downing street".to_string(),
                vec![AddressCandidate::new("downing", "10 Downing St, London SW1A 2AA, UK")],
            );
            by_text.insert(
                "main street".to_string(),
                vec![
                    AddressCandidate::new("leeds", "Main St, Leeds, UK"),
                    AddressCandidate::new("york", "Main St, York, UK"),
                    AddressCandidate::new("bath", "Main St, Bath, UK"),
                ],
            );
            by_text.insert(
                "high street".to_string(),
                (0..11)
                    .map(|i| AddressCandidate::new(format!("hs{i}"), format!("{i} High St, UK")))
                    .collect(),
            );
            Self { by_text }
        }
    }

    #[async_trait]
    impl AddressResolver for TableResolver {
        async fn resolve(
            &self,
            query: &AddressQuery,
        ) -> Result<Vec<AddressCandidate>, ResolverError> {
            match query {
                AddressQuery::Coordinates(_) => Ok(vec![AddressCandidate::new(
                    "here",
                    "1 Shared Location Rd, London, UK",
                )]),
                AddressQuery::Text(t) if t == "boom" => {
                    Err(ResolverError::RequestFailed("down".into()))
                }
                AddressQuery::Text(t) => Ok(self
                    .by_text
                    .get(&t.to_lowercase())
                    .cloned()
                    .unwrap_or_default()),
            }
        }
    }

    fn engine() -> TransitionEngine {
        TransitionEngine::new(
            Arc::new(TableResolver::new()),
            DateTimeNormalizer::new(FixedOffset::east_opt(0).unwrap()),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    fn at(step: Step) -> ConversationState {
        let mut state = ConversationState::new("447700900123");
        state.version = 3;
        state.step = step;
        state
    }

    fn text(s: &str) -> Intent {
        Intent::Text(s.into())
    }

    fn select(id: &str) -> Intent {
        Intent::ListSelect(id.into())
    }

    async fn run(state: &ConversationState, intent: Intent) -> Transition {
        engine().transition(state, &intent, now()).await
    }

    fn next_step(t: &Transition) -> Step {
        t.next.as_ref().expect("expected a state change").step
    }

    fn full_temp() -> TempData {
        TempData {
            name: Some("John".into()),
            pickup: Some("10 Downing St".into()),
            dropoff: Some("Main St, York, UK".into()),
            booking_date: Some("2026-10-19".into()),
            booking_time: Some("09:45".into()),
            vehicle: Some(VehicleClass::Sedan),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn restart_from_every_step_clears_temp() {
        for step in Step::ALL {
            let mut state = at(step);
            state.temp = full_temp();
            let t = run(&state, Intent::Restart).await;
            let next = t.next.unwrap();
            assert_eq!(next.step, Step::AskName, "restart from {step}");
            assert!(next.temp.is_empty());
            assert_eq!(t.outbound, vec![prompts::name_prompt()]);
            assert_eq!(t.command, None);
        }
    }

    #[tokio::test]
    async fn my_bookings_from_any_step_keeps_state() {
        for step in Step::ALL {
            let t = run(&at(step), Intent::MyBookings).await;
            assert!(t.next.is_none());
            assert_eq!(t.command, Some(Command::ListBookings));
        }
    }

    #[tokio::test]
    async fn first_contact_greets_without_taking_name() {
        let fresh = ConversationState::new("447700900123");
        let t = run(&fresh, text("hello")).await;
        let next = t.next.unwrap();
        assert_eq!(next.step, Step::AskName);
        assert_eq!(next.temp.name, None);
        assert_eq!(t.outbound, vec![prompts::name_prompt()]);
    }

    #[tokio::test]
    async fn name_moves_to_pickup() {
        let t = run(&at(Step::AskName), text("  John ")).await;
        let next = t.next.unwrap();
        assert_eq!(next.step, Step::AskPickup);
        assert_eq!(next.temp.name.as_deref(), Some("John"));
        assert!(matches!(
            t.outbound[0].message,
            OutboundMessage::LocationRequest { .. }
        ));
    }

    #[tokio::test]
    async fn ask_name_ignores_non_text() {
        let t = run(&at(Step::AskName), select("pickup_x")).await;
        assert!(t.is_ignored());
    }

    #[tokio::test]
    async fn pickup_by_location_single_result_skips_choice() {
        let t = run(
            &at(Step::AskPickup),
            Intent::Location(Coordinates {
                lat: 51.5,
                lng: -0.1,
            }),
        )
        .await;
        let next = t.next.unwrap();
        assert_eq!(next.step, Step::AskDropoff);
        assert_eq!(
            next.temp.pickup.as_deref(),
            Some("1 Shared Location Rd, London, UK")
        );
        assert_eq!(t.outbound, vec![prompts::dropoff_prompt()]);
    }

    #[tokio::test]
    async fn pickup_multiple_results_offers_list() {
        let t = run(&at(Step::AskPickup), text("Main Street")).await;
        let next = t.next.as_ref().unwrap();
        assert_eq!(next.step, Step::PickupChoose);
        assert_eq!(next.temp.pickup_options.len(), 3);
        let rows = t.outbound[0].message.list_rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.id.starts_with("pickup_")));
    }

    #[tokio::test]
    async fn pickup_no_results_reprompts() {
        let t = run(&at(Step::AskPickup), text("nowhere at all")).await;
        assert!(t.next.is_none());
        assert_eq!(t.outbound, vec![prompts::pickup_not_found()]);
    }

    #[tokio::test]
    async fn resolver_error_counts_as_no_results() {
        let t = run(&at(Step::AskPickup), text("boom")).await;
        assert!(t.next.is_none());
        assert_eq!(t.outbound, vec![prompts::pickup_not_found()]);
    }

    #[tokio::test]
    async fn candidates_capped_at_eight() {
        let t = run(&at(Step::AskDropoff), text("High Street")).await;
        let next = t.next.as_ref().unwrap();
        assert_eq!(next.temp.dropoff_options.len(), MAX_CANDIDATES);
        assert_eq!(t.outbound[0].message.list_rows().len(), MAX_CANDIDATES);
    }

    #[tokio::test]
    async fn pickup_choice_sets_pickup() {
        let listed = run(&at(Step::AskPickup), text("Main Street")).await;
        let state = listed.next.unwrap();
        let t = run(&state, select("pickup_york")).await;
        let next = t.next.unwrap();
        assert_eq!(next.step, Step::AskDropoff);
        assert_eq!(next.temp.pickup.as_deref(), Some("Main St, York, UK"));
        assert!(next.temp.pickup_options.is_empty());
    }

    #[tokio::test]
    async fn unknown_choice_resends_same_list() {
        let listed = run(&at(Step::AskPickup), text("Main Street")).await;
        let original_list = listed.outbound[0].clone();
        let state = listed.next.unwrap();

        for bad in ["pickup_nope", "drop_york"] {
            let t = run(&state, select(bad)).await;
            assert!(t.next.is_none());
            assert_eq!(t.outbound, vec![original_list.clone()]);
        }
    }

    #[tokio::test]
    async fn choose_ignores_text() {
        let listed = run(&at(Step::AskPickup), text("Main Street")).await;
        let t = run(&listed.next.unwrap(), text("Main St York")).await;
        assert!(t.is_ignored());
    }

    #[tokio::test]
    async fn dropoff_ignores_location() {
        let t = run(
            &at(Step::AskDropoff),
            Intent::Location(Coordinates { lat: 1.0, lng: 1.0 }),
        )
        .await;
        assert!(t.is_ignored());
    }

    #[tokio::test]
    async fn dropoff_single_result_asks_time() {
        let t = run(&at(Step::AskDropoff), text("10 Downing Street")).await;
        assert_eq!(next_step(&t), Step::AskDatetime);
        assert_eq!(t.outbound, vec![prompts::time_prompt()]);
    }

    #[tokio::test]
    async fn dropoff_choice_moves_to_datetime() {
        let listed = run(&at(Step::AskDropoff), text("Main Street")).await;
        let state = listed.next.unwrap();
        assert_eq!(state.step, Step::DropoffChoose);
        let t = run(&state, select("drop_bath")).await;
        let next = t.next.unwrap();
        assert_eq!(next.step, Step::AskDatetime);
        assert_eq!(next.temp.dropoff.as_deref(), Some("Main St, Bath, UK"));
    }

    #[tokio::test]
    async fn quick_options_button_lists_windows() {
        let t = run(&at(Step::AskDatetime), Intent::Button("choose_time".into())).await;
        assert!(t.next.is_none());
        assert_eq!(t.outbound, vec![prompts::time_list()]);
    }

    #[tokio::test]
    async fn quick_option_computed_from_now() {
        let t = run(&at(Step::AskDatetime), select("time_15")).await;
        let next = t.next.unwrap();
        assert_eq!(next.step, Step::AskVehicle);
        assert_eq!(next.temp.booking_date.as_deref(), Some("2026-10-19"));
        assert_eq!(next.temp.booking_time.as_deref(), Some("09:45"));
        assert_eq!(t.outbound, vec![prompts::vehicle_list()]);
    }

    #[tokio::test]
    async fn free_text_time() {
        let t = run(&at(Step::AskDatetime), text("tomorrow 10am")).await;
        let next = t.next.unwrap();
        assert_eq!(next.temp.booking_date.as_deref(), Some("2026-10-20"));
        assert_eq!(next.temp.booking_time.as_deref(), Some("10:00"));
    }

    #[tokio::test]
    async fn bad_time_reprompts() {
        let t = run(&at(Step::AskDatetime), text("whenever")).await;
        assert!(t.next.is_none());
        assert_eq!(t.outbound, vec![prompts::time_not_understood()]);

        let t = run(&at(Step::AskDatetime), text("today 8am")).await;
        assert_eq!(t.outbound, vec![prompts::time_in_past()]);
    }

    #[tokio::test]
    async fn vehicle_by_id_or_name() {
        let mut state = at(Step::AskVehicle);
        state.temp = TempData {
            vehicle: None,
            ..full_temp()
        };
        let t = run(&state, select("car_suv")).await;
        let next = t.next.unwrap();
        assert_eq!(next.step, Step::Confirm);
        assert_eq!(next.temp.vehicle, Some(VehicleClass::Suv));
        assert!(t.outbound[0].message.body().contains("SUV"));

        let t = run(&state, text("Van")).await;
        assert_eq!(t.next.unwrap().temp.vehicle, Some(VehicleClass::Van));
    }

    #[tokio::test]
    async fn unknown_vehicle_resends_list() {
        let t = run(&at(Step::AskVehicle), select("car_limo")).await;
        assert!(t.next.is_none());
        assert_eq!(t.outbound, vec![prompts::vehicle_list()]);
    }

    #[tokio::test]
    async fn confirm_requests_booking() {
        let mut state = at(Step::Confirm);
        state.temp = full_temp();
        for intent in [text("confirm"), Intent::Button("confirm_booking".into())] {
            let t = run(&state, intent).await;
            let next = t.next.as_ref().unwrap();
            assert_eq!(next.step, Step::Done);
            assert!(next.temp.is_empty());
            assert_eq!(t.command, Some(Command::CreateBooking));
            assert_eq!(t.outbound, vec![prompts::post_booking_menu()]);
        }
    }

    #[tokio::test]
    async fn edit_and_cancel_restart() {
        let mut state = at(Step::Confirm);
        state.temp = full_temp();
        for intent in [
            text("edit"),
            text("Cancel"),
            Intent::Button("edit_booking".into()),
            Intent::Button("cancel_booking".into()),
        ] {
            let t = run(&state, intent).await;
            let next = t.next.unwrap();
            assert_eq!(next.step, Step::AskName);
            assert!(next.temp.is_empty());
            assert_eq!(t.command, None);
            assert_eq!(t.outbound.last(), Some(&prompts::name_prompt()));
        }
    }

    #[tokio::test]
    async fn confirm_other_text_resends_summary() {
        let mut state = at(Step::Confirm);
        state.temp = full_temp();
        let t = run(&state, text("hmm")).await;
        assert!(t.next.is_none());
        assert_eq!(t.outbound, vec![prompts::summary(&state.temp)]);
    }

    #[tokio::test]
    async fn done_confirm_repeats_menu_without_booking() {
        let t = run(&at(Step::Done), text("confirm")).await;
        assert!(t.next.is_none());
        assert_eq!(t.command, None);
        assert_eq!(t.outbound, vec![prompts::post_booking_menu()]);
    }

    #[tokio::test]
    async fn done_text_shows_main_menu() {
        let t = run(&at(Step::Done), text("thanks")).await;
        assert!(t.next.is_none());
        assert_eq!(t.outbound, vec![prompts::main_menu()]);
    }

    #[tokio::test]
    async fn unrelated_shapes_are_ignored() {
        let cases = [
            (Step::AskPickup, Intent::Button("confirm_booking".into())),
            (Step::AskDatetime, Intent::Location(Coordinates { lat: 0.0, lng: 0.0 })),
            (Step::AskVehicle, Intent::Button("x".into())),
            (Step::Confirm, select("car_sedan")),
            (Step::Done, select("time_15")),
        ];
        for (step, intent) in cases {
            let t = run(&at(step), intent.clone()).await;
            assert!(t.is_ignored(), "{step} should ignore {intent:?}");
        }
    }

    #[tokio::test]
    async fn every_state_change_follows_an_edge() {
        let intents = [
            text("John"),
            text("Main Street"),
            text("10 Downing Street"),
            text("tomorrow 10am"),
            text("confirm"),
            text("edit"),
            text("sedan"),
            select("pickup_york"),
            select("drop_york"),
            select("time_30"),
            select("car_mpv"),
            Intent::Button("choose_time".into()),
            Intent::Button("confirm_booking".into()),
            Intent::Location(Coordinates { lat: 1.0, lng: 2.0 }),
        ];
        for step in Step::ALL {
            let mut state = at(step);
            state.temp = full_temp();
            state.temp.pickup_options = vec![AddressCandidate::new("york", "Main St, York, UK")];
            state.temp.dropoff_options = vec![AddressCandidate::new("york", "Main St, York, UK")];
            for intent in &intents {
                let t = run(&state, intent.clone()).await;
                if let Some(next) = t.next {
                    assert!(
                        step.can_transition_to(next.step),
                        "{step} -> {} via {intent:?}",
                        next.step
                    );
                }
            }
        }
    }
}
