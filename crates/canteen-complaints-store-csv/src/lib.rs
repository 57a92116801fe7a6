#![allow(clippy::missing_errors_doc)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use canteen_complaints_core::{
    list_complaints, next_sequential_id, sort_by_recency, sort_chronologically,
    stall_name_or_placeholder, summarize_canteens, summarize_stalls, today, CalendarDate, Canteen,
    CanteenSummary, Complaint, ComplaintFilter, ComplaintListing, ComplaintStatus, Response,
    Stall, StallSummary, COMPLAINT_ID_PREFIX, RESPONSE_ID_PREFIX,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{debug, info, warn};

pub const CANTEENS_FILE: &str = "canteens.csv";
pub const STALLS_FILE: &str = "stalls.csv";
pub const COMPLAINTS_FILE: &str = "complaints.csv";
pub const RESPONSES_FILE: &str = "responses.csv";

const COMPLAINT_HEADERS: [&str; 6] = [
    "complaint_id",
    "stall_id",
    "complaint_date",
    "problem_type",
    "complaint_description",
    "status",
];
const RESPONSE_HEADERS: [&str; 4] = [
    "response_id",
    "complaint_id",
    "response_date",
    "response_text",
];

/// Where the four collections live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub data_dir: PathBuf,
    pub canteens_file: String,
    pub stalls_file: String,
    pub complaints_file: String,
    pub responses_file: String,
}

impl StoreLayout {
    #[must_use]
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            canteens_file: CANTEENS_FILE.to_string(),
            stalls_file: STALLS_FILE.to_string(),
            complaints_file: COMPLAINTS_FILE.to_string(),
            responses_file: RESPONSES_FILE.to_string(),
        }
    }

    #[must_use]
    pub fn canteens_path(&self) -> PathBuf {
        self.data_dir.join(&self.canteens_file)
    }

    #[must_use]
    pub fn stalls_path(&self) -> PathBuf {
        self.data_dir.join(&self.stalls_file)
    }

    #[must_use]
    pub fn complaints_path(&self) -> PathBuf {
        self.data_dir.join(&self.complaints_file)
    }

    #[must_use]
    pub fn responses_path(&self) -> PathBuf {
        self.data_dir.join(&self.responses_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ComplaintRow {
    complaint_id: String,
    stall_id: String,
    complaint_date: String,
    problem_type: String,
    complaint_description: String,
    status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseRow {
    response_id: String,
    complaint_id: String,
    response_date: String,
    response_text: String,
}

/// Flat-file record store for canteens, stalls, complaints and responses.
///
/// Canteens and stalls are read-only seed data. Every complaint or response
/// mutation rewrites the whole backing file before returning.
#[derive(Debug)]
pub struct CsvRecordStore {
    layout: StoreLayout,
    canteens: Vec<Canteen>,
    stalls: Vec<Stall>,
    complaints: Vec<Complaint>,
    responses: Vec<Response>,
}

impl CsvRecordStore {
    pub fn open(layout: StoreLayout) -> Result<Self> {
        let mut store = Self {
            layout,
            canteens: Vec::new(),
            stalls: Vec::new(),
            complaints: Vec::new(),
            responses: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn open_dir(data_dir: &Path) -> Result<Self> {
        Self::open(StoreLayout::in_dir(data_dir))
    }

    /// Re-reads all four collections. A missing file yields an empty
    /// collection.
    pub fn load(&mut self) -> Result<()> {
        let canteens = read_collection::<Canteen>(&self.layout.canteens_path(), "canteens")?;
        let stalls = read_collection::<Stall>(&self.layout.stalls_path(), "stalls")?;

        let complaints_path = self.layout.complaints_path();
        let complaints = read_collection::<ComplaintRow>(&complaints_path, "complaints")?
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let line = index + 2;
                complaint_from_row(row).map_err(|err| {
                    warn!(
                        path = %complaints_path.display(),
                        line,
                        error = %err,
                        "rejecting complaint with unreadable fields"
                    );
                    err.context(format!(
                        "invalid complaint on line {line} of {}",
                        complaints_path.display()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let responses: Vec<Response> =
            read_collection::<ResponseRow>(&self.layout.responses_path(), "responses")?
                .into_iter()
                .map(response_from_row)
                .collect();

        self.canteens = canteens;
        self.stalls = stalls;
        self.complaints = complaints;
        self.responses = responses;
        Ok(())
    }

    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    #[must_use]
    pub fn canteens(&self) -> &[Canteen] {
        &self.canteens
    }

    #[must_use]
    pub fn stalls(&self) -> &[Stall] {
        &self.stalls
    }

    /// Complaints in stored order.
    #[must_use]
    pub fn complaints(&self) -> &[Complaint] {
        &self.complaints
    }

    /// Responses in stored order.
    #[must_use]
    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    #[must_use]
    pub fn get_canteen(&self, canteen_id: &str) -> Option<&Canteen> {
        self.canteens
            .iter()
            .find(|canteen| canteen.canteen_id == canteen_id)
    }

    #[must_use]
    pub fn get_stall(&self, stall_id: &str) -> Option<&Stall> {
        self.stalls.iter().find(|stall| stall.stall_id == stall_id)
    }

    #[must_use]
    pub fn get_complaint(&self, complaint_id: &str) -> Option<&Complaint> {
        self.complaints
            .iter()
            .find(|complaint| complaint.complaint_id == complaint_id)
    }

    #[must_use]
    pub fn stall_name(&self, stall_id: &str) -> String {
        stall_name_or_placeholder(&self.stalls, stall_id)
    }

    #[must_use]
    pub fn stalls_for_canteen(&self, canteen_id: &str) -> Vec<Stall> {
        self.stalls
            .iter()
            .filter(|stall| stall.canteen_id == canteen_id)
            .cloned()
            .collect()
    }

    /// All complaints, newest first. Fails if any stored date is malformed.
    pub fn all_complaints_by_recency(&self) -> Result<Vec<Complaint>> {
        sort_by_recency(self.complaints.clone())
            .map_err(|err| anyhow!("failed to order complaints by date: {err}"))
    }

    pub fn complaints_matching(&self, filter: &ComplaintFilter) -> Result<Vec<Complaint>> {
        Ok(self
            .all_complaints_by_recency()?
            .into_iter()
            .filter(|complaint| filter.matches(complaint))
            .collect())
    }

    pub fn complaints_for_stall(&self, stall_id: &str) -> Result<Vec<Complaint>> {
        self.complaints_matching(&ComplaintFilter::Stall(stall_id.to_string()))
    }

    pub fn complaints_for_status(&self, status: ComplaintStatus) -> Result<Vec<Complaint>> {
        self.complaints_matching(&ComplaintFilter::Status(status))
    }

    pub fn complaint_listing(&self, filter: &ComplaintFilter) -> Result<Vec<ComplaintListing>> {
        let ordered = self.complaints_matching(filter)?;
        Ok(list_complaints(&ordered, &self.stalls))
    }

    /// Responses for one complaint, oldest first.
    pub fn responses_for_complaint(&self, complaint_id: &str) -> Result<Vec<Response>> {
        let matching = self
            .responses
            .iter()
            .filter(|response| response.complaint_id == complaint_id)
            .cloned()
            .collect();
        sort_chronologically(matching)
            .map_err(|err| anyhow!("failed to order responses for {complaint_id}: {err}"))
    }

    #[must_use]
    pub fn stall_summaries(&self) -> Vec<StallSummary> {
        summarize_stalls(&self.stalls, &self.complaints)
    }

    #[must_use]
    pub fn canteen_summaries(&self) -> Vec<CanteenSummary> {
        summarize_canteens(&self.canteens, &self.stalls, &self.complaints)
    }

    /// Records a new pending complaint dated today and returns its id.
    ///
    /// The stall id is not checked against the stall collection.
    pub fn add_complaint(
        &mut self,
        stall_id: &str,
        problem_type: &str,
        description: &str,
    ) -> Result<String> {
        let complaint_date = CalendarDate::from_date(today())?;
        let complaint_id = next_sequential_id(
            COMPLAINT_ID_PREFIX,
            self.complaints
                .iter()
                .map(|complaint| complaint.complaint_id.as_str()),
        );

        self.complaints.push(Complaint {
            complaint_id: complaint_id.clone(),
            stall_id: stall_id.to_string(),
            complaint_date,
            problem_type: problem_type.to_string(),
            complaint_description: description.to_string(),
            status: ComplaintStatus::Pending,
        });
        self.persist_complaints()?;

        info!(%complaint_id, stall_id, "recorded complaint");
        Ok(complaint_id)
    }

    /// Records a response and marks the owning complaint resolved.
    ///
    /// The response file is rewritten first, then the complaint file. A
    /// response against an unknown complaint is still recorded; only the
    /// status update is skipped.
    pub fn add_response(
        &mut self,
        complaint_id: &str,
        response_text: &str,
        response_date: Option<Date>,
    ) -> Result<String> {
        let response_date = CalendarDate::from_date(response_date.unwrap_or_else(today))?;
        let response_id = next_sequential_id(
            RESPONSE_ID_PREFIX,
            self.responses
                .iter()
                .map(|response| response.response_id.as_str()),
        );

        self.responses.push(Response {
            response_id: response_id.clone(),
            complaint_id: complaint_id.to_string(),
            response_date,
            response_text: response_text.to_string(),
        });
        self.persist_responses()?;

        if !self.update_complaint_status(complaint_id, ComplaintStatus::Resolved)? {
            warn!(
                %response_id,
                complaint_id, "response recorded against unknown complaint"
            );
        }

        info!(%response_id, complaint_id, "recorded response");
        Ok(response_id)
    }

    /// Sets a complaint's status and rewrites the complaint file.
    ///
    /// Returns `false` without touching storage when no complaint matches.
    pub fn update_complaint_status(
        &mut self,
        complaint_id: &str,
        status: ComplaintStatus,
    ) -> Result<bool> {
        let Some(complaint) = self
            .complaints
            .iter_mut()
            .find(|complaint| complaint.complaint_id == complaint_id)
        else {
            return Ok(false);
        };

        complaint.status = status;
        self.persist_complaints()?;
        Ok(true)
    }

    fn persist_complaints(&self) -> Result<()> {
        let rows: Vec<ComplaintRow> = self.complaints.iter().map(complaint_to_row).collect();
        write_collection(&self.layout.complaints_path(), &COMPLAINT_HEADERS, &rows)
    }

    fn persist_responses(&self) -> Result<()> {
        let rows: Vec<ResponseRow> = self.responses.iter().map(response_to_row).collect();
        write_collection(&self.layout.responses_path(), &RESPONSE_HEADERS, &rows)
    }
}

fn read_collection<T: DeserializeOwned>(path: &Path, collection: &str) -> Result<Vec<T>> {
    if !path.exists() {
        debug!(collection, path = %path.display(), "collection file missing, starting empty");
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open {collection} at {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        let row = record.with_context(|| {
            format!(
                "failed to read {collection} line {} of {}",
                index + 2,
                path.display()
            )
        })?;
        rows.push(row);
    }

    debug!(collection, path = %path.display(), rows = rows.len(), "loaded collection");
    Ok(rows)
}

/// Replaces the file at `path` with `headers` followed by `rows`.
///
/// Rows go to a sibling temporary file that is renamed over the target once
/// fully written. The temporary file is removed if any step fails.
fn write_collection<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    let temp_path = path.with_extension("csv.tmp");
    let replaced = write_rows(&temp_path, headers, rows).and_then(|()| {
        fs::rename(&temp_path, path).with_context(|| {
            format!(
                "failed to replace {} with {}",
                path.display(),
                temp_path.display()
            )
        })
    });

    if let Err(err) = replaced {
        if temp_path.exists() {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!(
                    path = %temp_path.display(),
                    error = %cleanup,
                    "failed to remove temporary file"
                );
            }
        }
        return Err(err);
    }

    debug!(path = %path.display(), rows = rows.len(), "rewrote collection");
    Ok(())
}

fn write_rows<T: Serialize>(temp_path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    let file = File::create(temp_path)
        .with_context(|| format!("failed to create {}", temp_path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(file);
    writer
        .write_record(headers)
        .with_context(|| format!("failed to write header to {}", temp_path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", temp_path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", temp_path.display()))
}

fn complaint_from_row(row: ComplaintRow) -> Result<Complaint> {
    let status = ComplaintStatus::parse_stored(&row.status)?;
    Ok(Complaint {
        complaint_id: row.complaint_id,
        stall_id: row.stall_id,
        complaint_date: CalendarDate::from_stored(row.complaint_date),
        problem_type: row.problem_type,
        complaint_description: row.complaint_description,
        status,
    })
}

fn complaint_to_row(complaint: &Complaint) -> ComplaintRow {
    ComplaintRow {
        complaint_id: complaint.complaint_id.clone(),
        stall_id: complaint.stall_id.clone(),
        complaint_date: complaint.complaint_date.as_str().to_string(),
        problem_type: complaint.problem_type.clone(),
        complaint_description: complaint.complaint_description.clone(),
        status: complaint.status.as_str().to_string(),
    }
}

fn response_from_row(row: ResponseRow) -> Response {
    Response {
        response_id: row.response_id,
        complaint_id: row.complaint_id,
        response_date: CalendarDate::from_stored(row.response_date),
        response_text: row.response_text,
    }
}

fn response_to_row(response: &Response) -> ResponseRow {
    ResponseRow {
        response_id: response.response_id.clone(),
        complaint_id: response.complaint_id.clone(),
        response_date: response.response_date.as_str().to_string(),
        response_text: response.response_text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canteen_complaints_core::parse_calendar_date;
    use proptest::prelude::*;
    use ulid::Ulid;

    const CANTEENS_CSV: &str = "canteen_id,canteen_name,location\r\nC1,Canteen A,Bldg 1\r\nC2,Canteen B,Bldg 2\r\n";
    const STALLS_CSV: &str =
        "stall_id,canteen_id,stall_name\r\nS1,C1,Noodle Shop\r\nS2,C1,Rice Bowl\r\nS3,C2,Juice Bar\r\n";

    fn must<T>(result: Result<T>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("test failure: {err:#}"),
        }
    }

    fn must_some<T>(value: Option<T>) -> T {
        match value {
            Some(inner) => inner,
            None => panic!("expected Some(..), got None"),
        }
    }

    struct TempDataDir(PathBuf);

    impl TempDataDir {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("canteen-store-{}", Ulid::new()));
            if let Err(err) = fs::create_dir_all(&path) {
                panic!("failed to create temp dir {}: {err}", path.display());
            }
            Self(path)
        }

        fn write(&self, name: &str, body: &str) {
            if let Err(err) = fs::write(self.0.join(name), body) {
                panic!("failed to write {name}: {err}");
            }
        }

        fn read(&self, name: &str) -> String {
            match fs::read_to_string(self.0.join(name)) {
                Ok(body) => body,
                Err(err) => panic!("failed to read {name}: {err}"),
            }
        }

        fn open(&self) -> CsvRecordStore {
            must(CsvRecordStore::open_dir(&self.0))
        }
    }

    impl Drop for TempDataDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn seeded_dir() -> TempDataDir {
        let dir = TempDataDir::new();
        dir.write(CANTEENS_FILE, CANTEENS_CSV);
        dir.write(STALLS_FILE, STALLS_CSV);
        dir
    }

    fn complaint_ids(complaints: &[Complaint]) -> Vec<&str> {
        complaints
            .iter()
            .map(|complaint| complaint.complaint_id.as_str())
            .collect()
    }

    #[test]
    fn missing_files_load_as_empty_collections() {
        let dir = TempDataDir::new();
        let store = dir.open();

        assert!(store.canteens().is_empty());
        assert!(store.stalls().is_empty());
        assert!(must(store.all_complaints_by_recency()).is_empty());
        assert!(must(store.responses_for_complaint("C001")).is_empty());
        assert!(store.stall_summaries().is_empty());
    }

    #[test]
    fn lookups_return_none_for_unknown_ids() {
        let dir = seeded_dir();
        let store = dir.open();

        assert_eq!(must_some(store.get_canteen("C2")).location, "Bldg 2");
        assert_eq!(must_some(store.get_stall("S3")).stall_name, "Juice Bar");
        assert!(store.get_canteen("C9").is_none());
        assert!(store.get_stall("S99").is_none());
        assert!(store.get_complaint("C001").is_none());
        assert!(must(store.complaints_for_stall("S99")).is_empty());
        assert_eq!(store.stall_name("S99"), canteen_complaints_core::UNKNOWN_STALL_NAME);
    }

    #[test]
    fn stalls_for_canteen_keep_stored_order() {
        let dir = seeded_dir();
        let store = dir.open();

        let names: Vec<String> = store
            .stalls_for_canteen("C1")
            .into_iter()
            .map(|stall| stall.stall_name)
            .collect();
        assert_eq!(names, vec!["Noodle Shop", "Rice Bowl"]);
        assert!(store.stalls_for_canteen("C9").is_empty());
    }

    #[test]
    fn seed_columns_are_matched_by_header_name() {
        let dir = TempDataDir::new();
        dir.write(STALLS_FILE, "stall_name,stall_id,canteen_id\r\nNoodle Shop,S1,C1\r\n");
        let store = dir.open();

        let stall = must_some(store.get_stall("S1"));
        assert_eq!(stall.canteen_id, "C1");
        assert_eq!(stall.stall_name, "Noodle Shop");
    }

    #[test]
    fn add_complaint_assigns_sequential_ids_and_persists() {
        let dir = seeded_dir();
        let mut store = dir.open();

        let first = must(store.add_complaint("S1", "Hygiene", "Dirty table"));
        let second = must(store.add_complaint("S2", "Taste", "Too salty, \"really\""));
        assert_eq!(first, "C001");
        assert_eq!(second, "C002");

        let complaint = must_some(store.get_complaint("C001"));
        assert_eq!(complaint.status, ComplaintStatus::Pending);
        assert!(complaint.complaint_date.to_date().is_ok());

        let reloaded = dir.open();
        assert_eq!(reloaded.complaints(), store.complaints());

        let body = dir.read(COMPLAINTS_FILE);
        assert!(body.starts_with(
            "complaint_id,stall_id,complaint_date,problem_type,complaint_description,status\r\n"
        ));
    }

    #[test]
    fn rewrite_preserves_existing_rows_byte_for_byte() {
        let dir = seeded_dir();
        let existing = "complaint_id,stall_id,complaint_date,problem_type,complaint_description,status\r\n\
C001,S1,2024-01-05,Hygiene,\"Dirty table, sticky\",รอดำเนินการ\r\n\
C002,S2,2024-01-06,Taste,Too salty,ดำเนินการแล้ว\r\n";
        dir.write(COMPLAINTS_FILE, existing);

        let mut store = dir.open();
        assert!(must(store.update_complaint_status("C002", ComplaintStatus::Resolved)));
        assert_eq!(dir.read(COMPLAINTS_FILE), existing);

        let _ = must(store.add_complaint("S3", "Service", "Slow"));
        assert!(dir.read(COMPLAINTS_FILE).starts_with(existing));
    }

    #[test]
    fn response_rewrite_preserves_existing_rows_byte_for_byte() {
        let dir = seeded_dir();
        let existing = "response_id,complaint_id,response_date,response_text\r\n\
R001,C001,2024-01-06,\"Wiped, and sanitised\"\r\n\
R002,C001,2024-01-07,\"ตอบแล้ว \"\"ด่วน\"\"\"\r\n\
R003,C404,2024-01-08,\r\n";
        dir.write(RESPONSES_FILE, existing);

        let mut store = dir.open();
        assert_eq!(must_some(store.responses().get(2)).response_text, "");

        let date = must(parse_calendar_date("2024-01-09").map_err(Into::into));
        let response_id = must(store.add_response("C001", "Checked, \"again\"", Some(date)));
        assert_eq!(response_id, "R004");

        let body = dir.read(RESPONSES_FILE);
        assert!(body.starts_with(existing));
        assert_eq!(
            &body[existing.len()..],
            "R004,C001,2024-01-09,\"Checked, \"\"again\"\"\"\r\n"
        );
        assert_eq!(dir.open().responses(), store.responses());
    }

    #[test]
    fn add_response_resolves_and_never_reverts() {
        let dir = seeded_dir();
        let mut store = dir.open();
        let complaint_id = must(store.add_complaint("S1", "Hygiene", "Dirty table"));

        let first = must(store.add_response(&complaint_id, "Cleaned, thank you", None));
        assert_eq!(first, "R001");
        assert_eq!(
            must_some(store.get_complaint(&complaint_id)).status,
            ComplaintStatus::Resolved
        );

        let second = must(store.add_response(&complaint_id, "Checked again", None));
        assert_eq!(second, "R002");
        assert_eq!(
            must_some(store.get_complaint(&complaint_id)).status,
            ComplaintStatus::Resolved
        );

        let reloaded = dir.open();
        assert_eq!(
            must_some(reloaded.get_complaint(&complaint_id)).status,
            ComplaintStatus::Resolved
        );
        assert_eq!(must(reloaded.responses_for_complaint(&complaint_id)).len(), 2);
    }

    #[test]
    fn responses_are_ordered_oldest_first() {
        let dir = seeded_dir();
        let mut store = dir.open();
        let complaint_id = must(store.add_complaint("S1", "Hygiene", "Dirty table"));

        let later = must(parse_calendar_date("2024-05-02").map_err(Into::into));
        let earlier = must(parse_calendar_date("2024-05-01").map_err(Into::into));
        let _ = must(store.add_response(&complaint_id, "second", Some(later)));
        let _ = must(store.add_response(&complaint_id, "first", Some(earlier)));

        let texts: Vec<String> = must(store.responses_for_complaint(&complaint_id))
            .into_iter()
            .map(|response| response.response_text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn response_to_unknown_complaint_is_recorded_without_status_change() {
        let dir = seeded_dir();
        let mut store = dir.open();

        let response_id = must(store.add_response("C404", "Nobody home", None));
        assert_eq!(response_id, "R001");
        assert_eq!(store.responses().len(), 1);
        assert!(store.complaints().is_empty());
        assert!(!dir.0.join(COMPLAINTS_FILE).exists());
    }

    #[test]
    fn update_status_for_unknown_complaint_is_a_no_op() {
        let dir = seeded_dir();
        let mut store = dir.open();

        assert!(!must(store.update_complaint_status("C001", ComplaintStatus::Resolved)));
        assert!(!dir.0.join(COMPLAINTS_FILE).exists());
    }

    #[test]
    fn recency_and_filters_follow_stored_dates() {
        let dir = seeded_dir();
        dir.write(
            COMPLAINTS_FILE,
            "complaint_id,stall_id,complaint_date,problem_type,complaint_description,status\r\n\
C001,S1,2024-01-05,Hygiene,a,รอดำเนินการ\r\n\
C002,S2,2024-03-01,Taste,b,ดำเนินการแล้ว\r\n\
C003,S1,2024-01-05,Service,c,ดำเนินการแล้ว\r\n\
C004,S1,2024-02-10,Hygiene,d,รอดำเนินการ\r\n",
        );
        let store = dir.open();

        assert_eq!(
            complaint_ids(&must(store.all_complaints_by_recency())),
            vec!["C002", "C004", "C001", "C003"]
        );
        assert_eq!(
            complaint_ids(&must(store.complaints_for_stall("S1"))),
            vec!["C004", "C001", "C003"]
        );
        assert_eq!(
            complaint_ids(&must(store.complaints_for_status(ComplaintStatus::Resolved))),
            vec!["C002", "C003"]
        );

        let listing = must(store.complaint_listing(&ComplaintFilter::Status(
            ComplaintStatus::Pending,
        )));
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].stall_name, "Noodle Shop");
    }

    #[test]
    fn malformed_dates_fail_ordering_but_not_loading() {
        let dir = seeded_dir();
        dir.write(
            COMPLAINTS_FILE,
            "complaint_id,stall_id,complaint_date,problem_type,complaint_description,status\r\n\
C001,S1,05/01/2024,Hygiene,a,รอดำเนินการ\r\n",
        );
        let store = dir.open();

        assert!(store.get_complaint("C001").is_some());
        assert!(store.all_complaints_by_recency().is_err());
        assert!(store.complaints_for_stall("S1").is_err());
        assert_eq!(store.stall_summaries()[0].total_count, 1);
    }

    #[test]
    fn unknown_status_literal_fails_load() {
        let dir = seeded_dir();
        dir.write(
            COMPLAINTS_FILE,
            "complaint_id,stall_id,complaint_date,problem_type,complaint_description,status\r\n\
C001,S1,2024-01-05,Hygiene,a,รอดำเนินการ\r\n\
C002,S1,2024-01-06,Hygiene,b,done\r\n",
        );

        let err = match CsvRecordStore::open_dir(&dir.0) {
            Ok(_) => panic!("expected load failure for unknown status"),
            Err(err) => err,
        };
        let message = format!("{err:#}");
        assert!(message.contains("line 3"));
        assert!(message.contains("\"done\""));
    }

    #[test]
    fn missing_data_dir_fails_the_write_but_keeps_memory() {
        let dir = TempDataDir::new();
        let mut store = must(CsvRecordStore::open_dir(&dir.0.join("absent")));

        assert!(store.add_complaint("S1", "Hygiene", "Dirty table").is_err());
        assert_eq!(store.complaints().len(), 1);
    }

    #[test]
    fn failed_replace_leaves_no_temporary_file() {
        let dir = seeded_dir();
        let mut store = dir.open();
        if let Err(err) = fs::create_dir(dir.0.join(COMPLAINTS_FILE)) {
            panic!("failed to block complaints path: {err}");
        }

        assert!(store.add_complaint("S1", "Hygiene", "Dirty table").is_err());
        assert!(!dir.0.join("complaints.csv.tmp").exists());
        assert!(dir.0.join(COMPLAINTS_FILE).is_dir());
    }

    #[test]
    fn summaries_cover_every_stall_and_canteen() {
        let dir = seeded_dir();
        let mut store = dir.open();
        let _ = must(store.add_complaint("S3", "Hygiene", "a"));
        let _ = must(store.add_complaint("S3", "Taste", "b"));
        let _ = must(store.add_complaint("S99", "Taste", "orphan"));

        let stalls = store.stall_summaries();
        let stall_ids: Vec<&str> = stalls.iter().map(|s| s.stall_id.as_str()).collect();
        assert_eq!(stall_ids, vec!["S3", "S1", "S2"]);
        assert_eq!(stalls.iter().map(|s| s.total_count).sum::<usize>(), 2);

        let canteens = store.canteen_summaries();
        let canteen_ids: Vec<&str> = canteens.iter().map(|c| c.canteen_id.as_str()).collect();
        assert_eq!(canteen_ids, vec!["C2", "C1"]);
        assert_eq!(canteens[0].total_count, 2);
        assert_eq!(canteens[1].total_count, 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_complaint_and_response_collections_round_trip(
            entries in prop::collection::vec(("[A-Za-z ,\"]{1,12}", "[A-Za-z0-9 ,.\"]{1,24}"), 1..8)
        ) {
            let dir = seeded_dir();
            let mut store = dir.open();
            for (problem_type, description) in &entries {
                let complaint_id = must(store.add_complaint("S1", problem_type, description));
                let _ = must(store.add_response(&complaint_id, description, None));
            }

            let reloaded = dir.open();
            prop_assert_eq!(reloaded.complaints(), store.complaints());
            prop_assert_eq!(reloaded.responses(), store.responses());
        }
    }
}
