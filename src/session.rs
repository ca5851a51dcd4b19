//! Session: one selection plus the shared record sets it reads.

use std::sync::Arc;

use crate::error::{DashboardError, Result};
use crate::logging::{log_selection_change, log_selection_rejected};
use crate::metrics::{get_derived_metrics, DerivedMetrics};
use crate::records::RecordSets;
use crate::state::{
    apply_event, AlertFilter, Config, OrgFilter, Selection, SelectionChange, SelectionEvent, View,
};

/// Notified synchronously after each selection change that altered a field.
pub trait SelectionObserver {
    fn selection_changed(&mut self, selection: &Selection, change: &SelectionChange);
}

impl<F> SelectionObserver for F
where
    F: FnMut(&Selection, &SelectionChange),
{
    fn selection_changed(&mut self, selection: &Selection, change: &SelectionChange) {
        self(selection, change)
    }
}

pub struct Session {
    records: Arc<RecordSets>,
    selection: Selection,
    revision: u64,
    observers: Vec<Box<dyn SelectionObserver>>,
}

impl Session {
    pub fn new(records: Arc<RecordSets>) -> Self {
        Self {
            records,
            selection: Selection::default(),
            revision: 0,
            observers: Vec::new(),
        }
    }

    pub fn with_config(records: Arc<RecordSets>, cfg: &Config) -> Self {
        let mut session = Self::new(records);
        session.selection = Selection::with_view(cfg.default_view);
        session
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Number of selection changes that altered a field.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn records(&self) -> &RecordSets {
        &self.records
    }

    pub fn subscribe(&mut self, observer: Box<dyn SelectionObserver>) {
        self.observers.push(observer);
    }

    pub fn set_view(&mut self, view: &str) -> Result<()> {
        let view = self.validated("view", view, View::parse)?;
        self.apply(SelectionEvent::SetView(view)).map(|_| ())
    }

    pub fn set_org_filter(&mut self, org: &str) -> Result<()> {
        let filter = self.validated("org_filter", org, |v| OrgFilter::parse(v, &*self.records))?;
        self.apply(SelectionEvent::SetOrgFilter(filter)).map(|_| ())
    }

    pub fn set_alert_filter(&mut self, severity: &str) -> Result<()> {
        let filter = self.validated("alert_filter", severity, AlertFilter::parse)?;
        self.apply(SelectionEvent::SetAlertFilter(filter)).map(|_| ())
    }

    /// Apply several labelled selections at once. All values are validated
    /// first; if any is rejected nothing changes.
    pub fn select(
        &mut self,
        view: Option<&str>,
        org: Option<&str>,
        alerts: Option<&str>,
    ) -> Result<()> {
        let mut events = Vec::with_capacity(3);
        if let Some(v) = view {
            events.push(SelectionEvent::SetView(self.validated("view", v, View::parse)?));
        }
        if let Some(o) = org {
            let filter = self.validated("org_filter", o, |v| OrgFilter::parse(v, &*self.records))?;
            events.push(SelectionEvent::SetOrgFilter(filter));
        }
        if let Some(a) = alerts {
            events.push(SelectionEvent::SetAlertFilter(self.validated("alert_filter", a, AlertFilter::parse)?));
        }
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }

    /// Apply a typed event. Returns whether any field changed.
    pub fn apply(&mut self, event: SelectionEvent) -> Result<bool> {
        let change = match apply_event(&mut self.selection, event, &*self.records) {
            Ok(change) => change,
            Err(err) => {
                if let DashboardError::InvalidSelection { field, value } = &err {
                    log_selection_rejected(field, value);
                }
                return Err(err);
            }
        };
        if change.is_noop() {
            return Ok(false);
        }
        self.revision += 1;
        log_selection_change(change.field, &change.from, &change.to, self.revision);
        for observer in self.observers.iter_mut() {
            observer.selection_changed(&self.selection, &change);
        }
        Ok(true)
    }

    /// Recomputed on every call.
    pub fn derived_metrics(&self) -> DerivedMetrics {
        get_derived_metrics(&self.records, &self.selection)
    }

    /// Swap in a new record set. The selection is left as it is; an org
    /// filter naming an org the new set lacks yields no per-org rows.
    pub fn replace_records(&mut self, records: Arc<RecordSets>) {
        self.records = records;
    }

    fn validated<T>(
        &self,
        field: &'static str,
        value: &str,
        parse: impl FnOnce(&str) -> Result<T>,
    ) -> Result<T> {
        parse(value).map_err(|err| {
            log_selection_rejected(field, value);
            err
        })
    }
}
