use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{Appointment, Availability, WeeklySchedule};
use crate::services::booking::{book, BookingError, BookingRequest};
use crate::services::conflicts::taken_slots_or_empty;
use crate::store::BookingStore;

/// Identifies one taken-slot fetch. A fresh generation is issued on every
/// date selection, so reselecting a date never revives an older response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchKey {
    pub date: NaiveDate,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Someone else got the slot first.
    SlotTaken(String),
    Failed(String),
    Incomplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingState {
    pub provider_id: String,
    pub consumer_id: String,
    pub service_id: String,
    pub today: NaiveDate,
    pub availability: Option<Availability>,
    pub selected_date: Option<NaiveDate>,
    pub selected_slot: Option<String>,
    /// Candidate labels for the selected date.
    pub slots: Vec<String>,
    pub taken_slots: BTreeSet<String>,
    /// The only fetch whose result will be applied.
    pub fetch_key: Option<FetchKey>,
    pub loading: bool,
    pub submitting: bool,
    pub booked: Option<Appointment>,
    pub notice: Option<Notice>,
    generation: u64,
}

impl BookingState {
    pub fn new(
        provider_id: impl Into<String>,
        consumer_id: impl Into<String>,
        service_id: impl Into<String>,
        availability: Option<Availability>,
        today: NaiveDate,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            consumer_id: consumer_id.into(),
            service_id: service_id.into(),
            today,
            availability,
            selected_date: None,
            selected_slot: None,
            slots: vec![],
            taken_slots: BTreeSet::new(),
            fetch_key: None,
            loading: false,
            submitting: false,
            booked: None,
            notice: None,
            generation: 0,
        }
    }

    /// Slots the user can still pick.
    pub fn free_slots(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .filter(|s| !self.taken_slots.contains(*s))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectDate(NaiveDate),
    TakenSlotsLoaded {
        key: FetchKey,
        taken: BTreeSet<String>,
    },
    SelectSlot(String),
    Submit,
    BookingSucceeded(Appointment),
    BookingFailed {
        date: NaiveDate,
        slot: String,
        slot_taken: bool,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchTakenSlots { key: FetchKey, provider_id: String },
    SubmitBooking(BookingRequest),
}

pub fn reduce(mut state: BookingState, action: Action) -> (BookingState, Option<Effect>) {
    match action {
        Action::SelectDate(date) => {
            if date < state.today {
                return (state, None);
            }

            state.selected_date = Some(date);
            state.selected_slot = None;
            state.taken_slots.clear();
            state.notice = None;

            let schedule = WeeklySchedule::new(state.availability.as_ref());
            match schedule.slots_on(date) {
                Some(slots) => {
                    state.generation += 1;
                    let key = FetchKey {
                        date,
                        generation: state.generation,
                    };
                    state.slots = slots.collect();
                    state.fetch_key = Some(key);
                    state.loading = true;
                    let effect = Effect::FetchTakenSlots {
                        key,
                        provider_id: state.provider_id.clone(),
                    };
                    (state, Some(effect))
                }
                None => {
                    state.slots.clear();
                    state.fetch_key = None;
                    state.loading = false;
                    (state, None)
                }
            }
        }

        Action::TakenSlotsLoaded { key, taken } => {
            if state.fetch_key != Some(key) {
                tracing::debug!(date = %key.date, generation = key.generation, "dropping stale taken-slot result");
                return (state, None);
            }
            if state
                .selected_slot
                .as_ref()
                .is_some_and(|s| taken.contains(s))
            {
                state.selected_slot = None;
            }
            state.taken_slots = taken;
            state.loading = false;
            (state, None)
        }

        Action::SelectSlot(label) => {
            let selectable = state.selected_date.is_some()
                && !state.submitting
                && state.slots.contains(&label)
                && !state.taken_slots.contains(&label);
            if selectable {
                state.selected_slot = Some(label);
                state.notice = None;
            }
            (state, None)
        }

        Action::Submit => {
            if state.submitting {
                return (state, None);
            }
            let (Some(date), Some(slot)) = (state.selected_date, state.selected_slot.clone()) else {
                state.notice = Some(Notice::Incomplete);
                return (state, None);
            };

            state.submitting = true;
            state.notice = None;
            let request = BookingRequest {
                consumer_id: state.consumer_id.clone(),
                provider_id: state.provider_id.clone(),
                service_id: state.service_id.clone(),
                date,
                slot,
            };
            (state, Some(Effect::SubmitBooking(request)))
        }

        Action::BookingSucceeded(appointment) => {
            state.submitting = false;
            state.notice = None;
            state.booked = Some(appointment);
            (state, None)
        }

        Action::BookingFailed {
            date,
            slot,
            slot_taken,
            message,
        } => {
            state.submitting = false;
            if slot_taken {
                if state.selected_date == Some(date) {
                    if state.selected_slot.as_deref() == Some(slot.as_str()) {
                        state.selected_slot = None;
                    }
                    state.taken_slots.insert(slot);
                }
                state.notice = Some(Notice::SlotTaken(message));
            } else {
                state.notice = Some(Notice::Failed(message));
            }
            (state, None)
        }
    }
}

/// Runs [`reduce`] against a live store. Fetches and submissions run as
/// spawned tasks whose results come back through [`SessionDriver::next`].
pub struct SessionDriver<S: ?Sized> {
    store: Arc<S>,
    state: BookingState,
    fetch: Option<JoinHandle<()>>,
    submits: Vec<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Action>,
    rx: mpsc::UnboundedReceiver<Action>,
}

impl<S> SessionDriver<S>
where
    S: BookingStore + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, state: BookingState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            state,
            fetch: None,
            submits: vec![],
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn dispatch(&mut self, action: Action) {
        let (next, effect) = reduce(self.state.clone(), action);
        self.state = next;
        if let Some(effect) = effect {
            self.run(effect);
        }
    }

    /// Waits for the next fetch or submission to finish and applies it.
    /// Returns `None` at once when nothing is in flight or queued; the
    /// driver keeps its own sender, so the channel itself never closes.
    pub async fn next(&mut self) -> Option<&BookingState> {
        let idle = self.fetch.as_ref().map_or(true, JoinHandle::is_finished)
            && self.submits.iter().all(JoinHandle::is_finished);

        let action = match self.rx.try_recv() {
            Ok(action) => action,
            Err(_) if idle => return None,
            Err(_) => self.rx.recv().await?,
        };
        self.submits.retain(|task| !task.is_finished());
        self.dispatch(action);
        Some(&self.state)
    }

    fn run(&mut self, effect: Effect) {
        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();

        match effect {
            Effect::FetchTakenSlots { key, provider_id } => {
                if let Some(previous) = self.fetch.take() {
                    previous.abort();
                }
                self.fetch = Some(tokio::spawn(async move {
                    let taken = taken_slots_or_empty(store.as_ref(), &provider_id, key.date).await;
                    let _ = tx.send(Action::TakenSlotsLoaded { key, taken });
                }));
            }
            Effect::SubmitBooking(request) => {
                let today = self.state.today;
                self.submits.push(tokio::spawn(async move {
                    let action = match book(store.as_ref(), &request, today).await {
                        Ok(appointment) => Action::BookingSucceeded(appointment),
                        Err(e) => Action::BookingFailed {
                            slot_taken: matches!(e, BookingError::SlotTaken),
                            message: e.to_string(),
                            date: request.date,
                            slot: request.slot,
                        },
                    };
                    let _ = tx.send(action);
                }));
            }
        }
    }
}
