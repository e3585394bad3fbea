use crate::store::{JsonArrayStore, LoadOutcome, RecordStore, StoredRecord};
use formdrop_core::{AppendError, ClientInfo, FormFields, Record};
use http::Method;
use std::io;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Behaviour switches for [`RecordAppender`].
#[derive(Debug, Clone)]
pub struct AppendOptions {
    /// The only verb that may append.
    pub accepted_method: Method,
    /// Serialize load → append → save across callers of this appender.
    ///
    /// When off, two concurrent appends can load the same snapshot and the
    /// later save drops the earlier record. The file lock only prevents
    /// interleaved bytes.
    pub serialize_appends: bool,
}

impl Default for AppendOptions {
    fn default() -> Self {
        Self {
            accepted_method: Method::POST,
            serialize_appends: false,
        }
    }
}

/// What a successful append did.
#[derive(Debug, Clone)]
pub struct AppendReport {
    pub record: Record,
    /// Write strategy that persisted the array.
    pub strategy: &'static str,
    /// How the previous content was loaded.
    pub load: LoadOutcome,
    /// Number of records in the store after the append.
    pub total: usize,
}

/// Turns a submission into a [`Record`] and merges it into the store.
pub struct RecordAppender<S = JsonArrayStore> {
    store: S,
    options: AppendOptions,
    gate: Mutex<()>,
}

impl<S: RecordStore> RecordAppender<S> {
    pub fn new(store: S, options: AppendOptions) -> Self {
        Self {
            store,
            options,
            gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &AppendOptions {
        &self.options
    }

    /// Append one submission and return the stored record.
    pub fn append(
        &self,
        method: &Method,
        fields: FormFields,
        client: ClientInfo,
    ) -> Result<Record, AppendError> {
        self.append_with_report(method, fields, client)
            .map(|report| report.record)
    }

    /// Same as [`append`](Self::append), with details for logging and metrics.
    pub fn append_with_report(
        &self,
        method: &Method,
        fields: FormFields,
        client: ClientInfo,
    ) -> Result<AppendReport, AppendError> {
        if *method != self.options.accepted_method {
            return Err(AppendError::method_not_allowed(
                method.clone(),
                self.options.accepted_method.clone(),
            ));
        }

        let record = Record::new(fields, client);
        let entry: StoredRecord = serde_json::to_value(&record)
            .and_then(serde_json::from_value)
            .map_err(|e| {
                AppendError::persist_failure(
                    self.store.path(),
                    Vec::new(),
                    io::Error::new(io::ErrorKind::InvalidData, e),
                )
            })?;

        let _guard = self
            .options
            .serialize_appends
            .then(|| self.gate.lock().unwrap_or_else(PoisonError::into_inner));

        let loaded = self.store.load();
        let mut records: Vec<StoredRecord> = loaded.records;
        records.push(entry);

        match self.store.save(&records) {
            Ok(strategy) => {
                debug!(
                    strategy,
                    total = records.len(),
                    path = %self.store.path().display(),
                    "appender: record persisted"
                );
                Ok(AppendReport {
                    record,
                    strategy,
                    load: loaded.outcome,
                    total: records.len(),
                })
            }
            Err(e) => Err(AppendError::persist_failure(
                self.store.path(),
                e.attempts,
                e.source,
            )),
        }
    }
}
