//! Selection state: the active view, organization filter and alert filter.
//!
//! The three fields are independent enumerations. Every change goes through
//! [`apply_event`], which validates the new value and either replaces the
//! field or leaves the selection untouched.

use serde::Serialize;
use std::fmt;

use crate::error::{DashboardError, Result};
use crate::records::{RecordSets, Severity};

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON record set to load instead of the built-in sample
    pub data_path: Option<String>,
    pub default_view: View,
    /// Decimals used when printing percentages
    pub display_decimals: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse-or-default over any key lookup; unparsable values fall back.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_path: lookup("DASH_DATA_PATH").filter(|v| !v.trim().is_empty()),
            default_view: lookup("DASH_DEFAULT_VIEW")
                .and_then(|v| View::parse(&v).ok())
                .unwrap_or_default(),
            display_decimals: lookup("DASH_DISPLAY_DECIMALS").and_then(|v| v.parse().ok()).unwrap_or(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: None,
            default_view: View::Executive,
            display_decimals: 1,
        }
    }
}

// =============================================================================
// Views and filters
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Executive,
    Financial,
    Timeline,
    Alerts,
}

impl View {
    pub const ALL: [View; 4] = [View::Executive, View::Financial, View::Timeline, View::Alerts];

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "executive" => Ok(View::Executive),
            "financial" => Ok(View::Financial),
            "timeline" => Ok(View::Timeline),
            "alerts" => Ok(View::Alerts),
            other => Err(DashboardError::invalid_selection("view", other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Executive => "executive",
            View::Financial => "financial",
            View::Timeline => "timeline",
            View::Alerts => "alerts",
        }
    }

    /// Button caption.
    pub fn title(&self) -> &'static str {
        match self {
            View::Executive => "Executive View",
            View::Financial => "Financial Impact",
            View::Timeline => "Timeline Adherence",
            View::Alerts => "Alerts & Actions",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl AlertFilter {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "all" => Ok(AlertFilter::All),
            "high" => Ok(AlertFilter::High),
            "medium" => Ok(AlertFilter::Medium),
            "low" => Ok(AlertFilter::Low),
            other => Err(DashboardError::invalid_selection("alert_filter", other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFilter::All => "all",
            AlertFilter::High => "high",
            AlertFilter::Medium => "medium",
            AlertFilter::Low => "low",
        }
    }

    /// `None` for `All`.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            AlertFilter::All => None,
            AlertFilter::High => Some(Severity::High),
            AlertFilter::Medium => Some(Severity::Medium),
            AlertFilter::Low => Some(Severity::Low),
        }
    }

    pub fn matches(&self, severity: &Severity) -> bool {
        match self.severity() {
            None => true,
            Some(wanted) => wanted == *severity,
        }
    }
}

/// Source of valid organization ids for the org filter.
pub trait OrgRegistry {
    fn is_known_org(&self, id: &str) -> bool;
}

impl OrgRegistry for RecordSets {
    fn is_known_org(&self, id: &str) -> bool {
        RecordSets::is_known_org(self, id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum OrgFilter {
    #[default]
    All,
    Org(String),
}

impl OrgFilter {
    pub fn parse(value: &str, registry: &dyn OrgRegistry) -> Result<Self> {
        if value == "all" {
            return Ok(OrgFilter::All);
        }
        if registry.is_known_org(value) {
            Ok(OrgFilter::Org(value.to_string()))
        } else {
            Err(DashboardError::invalid_selection("org_filter", value))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrgFilter::All => "all",
            OrgFilter::Org(id) => id.as_str(),
        }
    }
}

impl From<OrgFilter> for String {
    fn from(filter: OrgFilter) -> String {
        filter.as_str().to_string()
    }
}

// =============================================================================
// Selection
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub view: View,
    pub org_filter: OrgFilter,
    pub alert_filter: AlertFilter,
}

impl Selection {
    pub fn with_view(view: View) -> Self {
        Self {
            view,
            ..Default::default()
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "view={} org={} alerts={}",
            self.view.as_str(),
            self.org_filter.as_str(),
            self.alert_filter.as_str()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    SetView(View),
    SetOrgFilter(OrgFilter),
    SetAlertFilter(AlertFilter),
}

/// Result of a validated selection event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub field: &'static str,
    pub from: String,
    pub to: String,
}

impl SelectionChange {
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Validate and apply one event. On error the selection is not touched.
pub fn apply_event(
    selection: &mut Selection,
    event: SelectionEvent,
    registry: &dyn OrgRegistry,
) -> Result<SelectionChange> {
    match event {
        SelectionEvent::SetView(view) => {
            let from = selection.view.as_str().to_string();
            selection.view = view;
            Ok(SelectionChange { field: "view", from, to: view.as_str().to_string() })
        }
        SelectionEvent::SetOrgFilter(filter) => {
            if let OrgFilter::Org(id) = &filter {
                if !registry.is_known_org(id) {
                    return Err(DashboardError::invalid_selection("org_filter", id.as_str()));
                }
            }
            let from = selection.org_filter.as_str().to_string();
            let to = filter.as_str().to_string();
            selection.org_filter = filter;
            Ok(SelectionChange { field: "org_filter", from, to })
        }
        SelectionEvent::SetAlertFilter(filter) => {
            let from = selection.alert_filter.as_str().to_string();
            selection.alert_filter = filter;
            Ok(SelectionChange { field: "alert_filter", from, to: filter.as_str().to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static [&'static str]);

    impl OrgRegistry for Fixed {
        fn is_known_org(&self, id: &str) -> bool {
            self.0.contains(&id)
        }
    }

    const ORGS: Fixed = Fixed(&["rs", "clientA"]);

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        Config::from_lookup(|key| {
            pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_config_defaults_when_unset() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.data_path, None);
        assert_eq!(cfg.default_view, View::Executive);
        assert_eq!(cfg.display_decimals, 1);
    }

    #[test]
    fn test_config_reads_values() {
        let cfg = config_from(&[
            ("DASH_DATA_PATH", "/srv/dash/records.json"),
            ("DASH_DEFAULT_VIEW", "alerts"),
            ("DASH_DISPLAY_DECIMALS", "2"),
        ]);
        assert_eq!(cfg.data_path.as_deref(), Some("/srv/dash/records.json"));
        assert_eq!(cfg.default_view, View::Alerts);
        assert_eq!(cfg.display_decimals, 2);
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let cfg = config_from(&[
            ("DASH_DATA_PATH", "   "),
            ("DASH_DEFAULT_VIEW", "overview"),
            ("DASH_DISPLAY_DECIMALS", "two"),
        ]);
        assert_eq!(cfg.data_path, None);
        assert_eq!(cfg.default_view, View::Executive);
        assert_eq!(cfg.display_decimals, 1);
    }

    #[test]
    fn test_defaults() {
        let sel = Selection::default();
        assert_eq!(sel.view, View::Executive);
        assert_eq!(sel.org_filter, OrgFilter::All);
        assert_eq!(sel.alert_filter, AlertFilter::All);
    }

    #[test]
    fn test_view_parse_rejects_unknown() {
        for view in View::ALL {
            assert_eq!(View::parse(view.as_str()).unwrap(), view);
        }
        let err = View::parse("overview").unwrap_err();
        assert_eq!(err, DashboardError::invalid_selection("view", "overview"));
    }

    #[test]
    fn test_alert_filter_domain() {
        assert_eq!(AlertFilter::parse("medium").unwrap(), AlertFilter::Medium);
        assert!(AlertFilter::parse("critical").is_err());
        assert!(AlertFilter::parse("High").is_err());
        assert!(AlertFilter::All.matches(&Severity::Unrecognized("x".into())));
        assert!(!AlertFilter::High.matches(&Severity::Low));
    }

    #[test]
    fn test_org_filter_uses_registry() {
        assert_eq!(OrgFilter::parse("all", &ORGS).unwrap(), OrgFilter::All);
        assert_eq!(OrgFilter::parse("rs", &ORGS).unwrap(), OrgFilter::Org("rs".into()));
        assert!(OrgFilter::parse("clientZ", &ORGS).is_err());
    }

    #[test]
    fn test_apply_event_reports_change() {
        let mut sel = Selection::default();
        let change = apply_event(&mut sel, SelectionEvent::SetView(View::Alerts), &ORGS).unwrap();
        assert_eq!(change.field, "view");
        assert_eq!(change.from, "executive");
        assert_eq!(change.to, "alerts");
        assert!(!change.is_noop());
        assert_eq!(sel.view, View::Alerts);

        let again = apply_event(&mut sel, SelectionEvent::SetView(View::Alerts), &ORGS).unwrap();
        assert!(again.is_noop());
    }

    #[test]
    fn test_apply_event_rejects_unknown_org_without_mutation() {
        let mut sel = Selection::default();
        apply_event(&mut sel, SelectionEvent::SetAlertFilter(AlertFilter::High), &ORGS).unwrap();
        let before = sel.clone();
        let err = apply_event(&mut sel, SelectionEvent::SetOrgFilter(OrgFilter::Org("ghost".into())), &ORGS);
        assert!(matches!(err, Err(DashboardError::InvalidSelection { field: "org_filter", .. })));
        assert_eq!(sel, before);
    }

    #[test]
    fn test_selection_serializes_as_labels() {
        let sel = Selection {
            view: View::Financial,
            org_filter: OrgFilter::Org("clientA".into()),
            alert_filter: AlertFilter::Low,
        };
        let v = serde_json::to_value(&sel).unwrap();
        assert_eq!(v, serde_json::json!({"view": "financial", "org_filter": "clientA", "alert_filter": "low"}));
        assert_eq!(sel.to_string(), "view=financial org=clientA alerts=low");
    }
}
