#![deny(warnings)]

//! Worksheet state container.
//!
//! [`WorksheetStore`] owns the single worksheet record. Every edit goes
//! through it: the raw input is parsed into its canonical value, change
//! listeners receive the new state with freshly derived metrics, and the
//! complete record is handed to the injected [`SnapshotStore`].
//!
//! Snapshot writes are fire-and-forget: a failed write is logged and counted
//! but never rejects or rolls back the edit.

use persistence::{PersistError, SnapshotStore};
use plan_core::money::{parse_currency_text, parse_percentage_text};
use plan_core::{Field, FieldKind, FieldValue, FunnelConstants, UnknownField, WorksheetState};
use plan_metrics::{metrics_for, FunnelMetrics};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
    #[error("field {field} expects a {expected:?} value")]
    KindMismatch { field: Field, expected: FieldKind },
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// How the initial state was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A stored snapshot was restored.
    Restored,
    /// Nothing was stored; started from the empty worksheet.
    Fresh,
    /// The stored snapshot could not be read; started from the empty worksheet.
    Recovered,
}

/// Passed to change listeners after each edit.
#[derive(Debug)]
pub struct ChangeEvent<'a> {
    pub field: Field,
    pub state: &'a WorksheetState,
    pub metrics: FunnelMetrics,
}

/// Handle returned by [`WorksheetStore::on_change`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ChangeEvent<'_>)>;

pub struct WorksheetStore<S: SnapshotStore> {
    state: WorksheetState,
    snapshots: S,
    constants: FunnelConstants,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    load_outcome: LoadOutcome,
    failed_writes: u64,
}

impl<S: SnapshotStore> WorksheetStore<S> {
    /// Load the stored snapshot, falling back to the empty worksheet when it
    /// is absent or unreadable.
    pub fn initialize(snapshots: S, constants: FunnelConstants) -> Self {
        let (state, load_outcome) = match snapshots.load() {
            Ok(Some(state)) => (state, LoadOutcome::Restored),
            Ok(None) => (WorksheetState::default(), LoadOutcome::Fresh),
            Err(e) => {
                warn!(error = %e, "stored worksheet is unreadable; starting empty");
                (WorksheetState::default(), LoadOutcome::Recovered)
            }
        };
        info!(?load_outcome, "worksheet initialized");
        Self {
            state,
            snapshots,
            constants,
            listeners: Vec::new(),
            next_subscription: 0,
            load_outcome,
            failed_writes: 0,
        }
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.load_outcome
    }

    pub fn state(&self) -> &WorksheetState {
        &self.state
    }

    pub fn get(&self, field: Field) -> FieldValue {
        self.state.value(field)
    }

    pub fn constants(&self) -> &FunnelConstants {
        &self.constants
    }

    /// Recomputed from the current state on every call.
    pub fn derived_metrics(&self) -> FunnelMetrics {
        metrics_for(&self.state, &self.constants)
    }

    /// Apply raw user input to `field`.
    ///
    /// Text is stored verbatim. Currency input keeps only its digits, read as
    /// cents. Percentage input that is not numeric becomes zero.
    pub fn set_field(&mut self, field: Field, raw: &str) {
        match field.kind() {
            FieldKind::Text => {
                if let Some(slot) = self.state.text_mut(field) {
                    *slot = raw.to_string();
                }
            }
            FieldKind::Currency => {
                if let Some(slot) = self.state.number_mut(field) {
                    *slot = parse_currency_text(raw);
                }
            }
            FieldKind::Percentage => {
                if let Some(slot) = self.state.number_mut(field) {
                    *slot = parse_percentage_text(raw);
                }
            }
        }
        self.commit(field);
    }

    /// Like [`set_field`](Self::set_field) but resolves the field by key or name.
    pub fn set_field_by_name(&mut self, name: &str, raw: &str) -> Result<Field, StoreError> {
        let field: Field = name.parse()?;
        self.set_field(field, raw);
        Ok(field)
    }

    /// Store an already canonical value.
    pub fn set_value(&mut self, field: Field, value: FieldValue) -> Result<(), StoreError> {
        let expected = field.kind();
        match value {
            FieldValue::Text(text) => {
                let slot = self
                    .state
                    .text_mut(field)
                    .ok_or(StoreError::KindMismatch { field, expected })?;
                *slot = text;
            }
            FieldValue::Number(n) => {
                let slot = self
                    .state
                    .number_mut(field)
                    .ok_or(StoreError::KindMismatch { field, expected })?;
                *slot = n;
            }
        }
        self.commit(field);
        Ok(())
    }

    /// Register a listener called after every edit.
    pub fn on_change<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent<'_>) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns whether the listener was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Snapshot writes that failed since initialization.
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    /// Drain buffered snapshots, if the snapshot store buffers.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.snapshots.flush()?;
        Ok(())
    }

    pub fn snapshots(&self) -> &S {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> S {
        self.snapshots
    }

    fn commit(&mut self, field: Field) {
        let metrics = metrics_for(&self.state, &self.constants);
        debug!(%field, ?metrics, "field updated");
        let event = ChangeEvent {
            field,
            state: &self.state,
            metrics,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
        if let Err(e) = self.snapshots.save(&self.state) {
            self.failed_writes += 1;
            warn!(error = %e, %field, "failed to persist worksheet");
        }
    }
}
