//! Façade handed to presentation code.
//!
//! [`ComplaintDesk`] is the only way hosts reach the record store. Reads are
//! pass-throughs; the two mutations persist first and then notify
//! subscribers through [`ChangeNotifier`].

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;

use anyhow::{Context, Result};
use canteen_complaints_core::{
    require_present, Canteen, CanteenSummary, ChangeEvent, Complaint, ComplaintFilter,
    ComplaintListing, ComplaintStatus, Response, Stall, StallSummary,
};
use canteen_complaints_store_csv::{CsvRecordStore, StoreLayout};
use tracing::debug;

pub type Listener = Box<dyn FnMut(DeskView<'_>) -> Result<()>>;

/// Read-only façade handed to listeners while an event is published.
#[derive(Debug, Clone, Copy)]
pub struct DeskView<'a> {
    store: &'a CsvRecordStore,
}

impl<'a> DeskView<'a> {
    #[must_use]
    pub fn new(store: &'a CsvRecordStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn canteens(self) -> Vec<Canteen> {
        self.store.canteens().to_vec()
    }

    #[must_use]
    pub fn stalls(self) -> Vec<Stall> {
        self.store.stalls().to_vec()
    }

    #[must_use]
    pub fn stalls_for_canteen(self, canteen_id: &str) -> Vec<Stall> {
        self.store.stalls_for_canteen(canteen_id)
    }

    #[must_use]
    pub fn stall_name(self, stall_id: &str) -> String {
        self.store.stall_name(stall_id)
    }

    #[must_use]
    pub fn stall_summaries(self) -> Vec<StallSummary> {
        self.store.stall_summaries()
    }

    #[must_use]
    pub fn canteen_summaries(self) -> Vec<CanteenSummary> {
        self.store.canteen_summaries()
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn all_complaints_sorted(self) -> Result<Vec<Complaint>> {
        self.store.all_complaints_by_recency()
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn complaints_for_stall(self, stall_id: &str) -> Result<Vec<Complaint>> {
        self.store.complaints_for_stall(stall_id)
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn complaints_for_status(self, status: ComplaintStatus) -> Result<Vec<Complaint>> {
        self.store.complaints_for_status(status)
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn complaint_listing(self, filter: &ComplaintFilter) -> Result<Vec<ComplaintListing>> {
        self.store.complaint_listing(filter)
    }

    #[must_use]
    pub fn complaint_detail(self, complaint_id: &str) -> Option<Complaint> {
        self.store.get_complaint(complaint_id).cloned()
    }

    /// # Errors
    /// Fails when a stored response date is malformed.
    pub fn complaint_responses(self, complaint_id: &str) -> Result<Vec<Response>> {
        self.store.responses_for_complaint(complaint_id)
    }
}

/// Synchronous fan-out of change events.
///
/// Listeners run on the publishing thread in registration order and receive
/// a [`DeskView`] of the already persisted state. The first listener error
/// stops the fan-out and is returned to the publisher.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: BTreeMap<ChangeEvent, Vec<Listener>>,
}

impl ChangeNotifier {
    pub fn subscribe<F>(&mut self, event: ChangeEvent, listener: F)
    where
        F: FnMut(DeskView<'_>) -> Result<()> + 'static,
    {
        self.listeners
            .entry(event)
            .or_default()
            .push(Box::new(listener));
    }

    /// Invokes every listener registered for `event` with `view`.
    ///
    /// # Errors
    /// Returns the first listener failure; later listeners are not run.
    pub fn publish(&mut self, event: ChangeEvent, view: DeskView<'_>) -> Result<()> {
        let Some(listeners) = self.listeners.get_mut(&event) else {
            return Ok(());
        };

        debug!(%event, listeners = listeners.len(), "publishing change event");
        for (position, listener) in listeners.iter_mut().enumerate() {
            listener(view).with_context(|| format!("listener #{position} for {event} failed"))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn listener_count(&self, event: ChangeEvent) -> usize {
        self.listeners.get(&event).map_or(0, Vec::len)
    }
}

impl Debug for ChangeNotifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(event, listeners)| (event.as_str(), listeners.len()))
            .collect();
        f.debug_struct("ChangeNotifier")
            .field("listeners", &counts)
            .finish()
    }
}

#[derive(Debug)]
pub struct ComplaintDesk {
    store: CsvRecordStore,
    notifier: ChangeNotifier,
}

impl ComplaintDesk {
    #[must_use]
    pub fn new(store: CsvRecordStore) -> Self {
        Self {
            store,
            notifier: ChangeNotifier::default(),
        }
    }

    /// Loads the store from `data_dir` with the default file names.
    ///
    /// # Errors
    /// Returns an error when an existing collection file cannot be read.
    pub fn open_dir(data_dir: &Path) -> Result<Self> {
        Ok(Self::new(CsvRecordStore::open(StoreLayout::in_dir(data_dir))?))
    }

    #[must_use]
    pub fn store(&self) -> &CsvRecordStore {
        &self.store
    }

    #[must_use]
    pub fn view(&self) -> DeskView<'_> {
        DeskView::new(&self.store)
    }

    pub fn subscribe<F>(&mut self, event: ChangeEvent, listener: F)
    where
        F: FnMut(DeskView<'_>) -> Result<()> + 'static,
    {
        self.notifier.subscribe(event, listener);
    }

    /// # Errors
    /// Propagates the first listener failure.
    pub fn publish(&mut self, event: ChangeEvent) -> Result<()> {
        self.notifier.publish(event, DeskView::new(&self.store))
    }

    #[must_use]
    pub fn canteens(&self) -> Vec<Canteen> {
        self.view().canteens()
    }

    #[must_use]
    pub fn stalls(&self) -> Vec<Stall> {
        self.view().stalls()
    }

    #[must_use]
    pub fn stalls_for_canteen(&self, canteen_id: &str) -> Vec<Stall> {
        self.view().stalls_for_canteen(canteen_id)
    }

    #[must_use]
    pub fn stall_name(&self, stall_id: &str) -> String {
        self.view().stall_name(stall_id)
    }

    #[must_use]
    pub fn stall_summaries(&self) -> Vec<StallSummary> {
        self.view().stall_summaries()
    }

    #[must_use]
    pub fn canteen_summaries(&self) -> Vec<CanteenSummary> {
        self.view().canteen_summaries()
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn all_complaints_sorted(&self) -> Result<Vec<Complaint>> {
        self.view().all_complaints_sorted()
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn complaints_for_stall(&self, stall_id: &str) -> Result<Vec<Complaint>> {
        self.view().complaints_for_stall(stall_id)
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn complaints_for_status(&self, status: ComplaintStatus) -> Result<Vec<Complaint>> {
        self.view().complaints_for_status(status)
    }

    /// # Errors
    /// Fails when a stored complaint date is malformed.
    pub fn complaint_listing(&self, filter: &ComplaintFilter) -> Result<Vec<ComplaintListing>> {
        self.view().complaint_listing(filter)
    }

    #[must_use]
    pub fn complaint_detail(&self, complaint_id: &str) -> Option<Complaint> {
        self.view().complaint_detail(complaint_id)
    }

    /// # Errors
    /// Fails when a stored response date is malformed.
    pub fn complaint_responses(&self, complaint_id: &str) -> Result<Vec<Response>> {
        self.view().complaint_responses(complaint_id)
    }

    /// Files a new complaint and publishes `complaints_updated`.
    ///
    /// # Errors
    /// Fails on blank input, on a write failure, or when a listener fails.
    /// A listener failure is reported after the complaint is already stored.
    pub fn create_complaint(
        &mut self,
        stall_id: &str,
        problem_type: &str,
        description: &str,
    ) -> Result<String> {
        require_present("stall_id", stall_id)?;
        require_present("problem_type", problem_type)?;
        require_present("complaint_description", description)?;

        let complaint_id = self
            .store
            .add_complaint(stall_id, problem_type, description)?;
        self.publish(ChangeEvent::ComplaintsUpdated)?;
        Ok(complaint_id)
    }

    /// Records a staff response, then publishes `responses_updated` followed
    /// by `complaints_updated`.
    ///
    /// # Errors
    /// Fails on blank input, on a write failure, or when a listener fails.
    /// A listener failure is reported after the response is already stored.
    pub fn submit_response(&mut self, complaint_id: &str, response_text: &str) -> Result<String> {
        require_present("complaint_id", complaint_id)?;
        require_present("response_text", response_text)?;

        let response_id = self.store.add_response(complaint_id, response_text, None)?;
        self.publish(ChangeEvent::ResponsesUpdated)?;
        self.publish(ChangeEvent::ComplaintsUpdated)?;
        Ok(response_id)
    }
}
