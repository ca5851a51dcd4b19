//! Typed record sets consumed by the dashboard.
//!
//! Record sets are loaded once (from the built-in sample or from a JSON
//! document) and never mutated afterwards. Status-like fields are closed
//! enumerations that keep unrecognized labels verbatim so the calculator can
//! fail closed on them instead of rejecting the whole document.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

use crate::error::{DashboardError, Result};
use crate::format::parse_percent;
use crate::logging::{log_org_id_collision, log_records_loaded};

macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// Label outside the closed set, kept verbatim.
            Unrecognized(String),
        }

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn known() -> Vec<Self> {
                vec![$(Self::$variant),+]
            }

            pub fn parse(label: &str) -> Self {
                match label {
                    $($label => Self::$variant,)+
                    other => Self::Unrecognized(other.to_string()),
                }
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Unrecognized(raw) => raw.as_str(),
                }
            }

            pub fn is_recognized(&self) -> bool {
                !matches!(self, Self::Unrecognized(_))
            }
        }

        impl From<String> for $name {
            fn from(label: String) -> Self {
                Self::parse(&label)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum!(
    /// Alert severity.
    Severity, "severity" {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
);

label_enum!(
    MilestoneStatus, "milestone_status" {
        Complete => "Complete",
        OnTrack => "On Track",
        AtRisk => "At Risk",
        Pending => "Pending",
    }
);

label_enum!(
    PhaseStatus, "phase_status" {
        Complete => "Complete",
        InProgress => "In Progress",
        OnTrack => "On Track",
        Pending => "Pending",
    }
);

label_enum!(
    ImperativeState, "imperative_status" {
        Exceeding => "Exceeding",
        OnTrack => "On Track",
        AtRisk => "At Risk",
    }
);

label_enum!(
    /// Impact or probability rating of a timeline risk.
    RiskLevel, "risk_level" {
        High => "High",
        Medium => "Medium",
        Low => "Low",
    }
);

label_enum!(
    Priority, "priority" {
        Immediate => "Immediate",
        High => "High",
        Medium => "Medium",
    }
);

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialPoint {
    pub month: String,
    pub projected: f64,
    pub actual: f64,
    pub savings: f64,
    pub revenue: f64,
}

/// Per-organization financial performance.
///
/// `roi` is a percentage number (`7.8` means 7.8%). Feeds that still carry the
/// pre-formatted string (`"7.8%"`) are parsed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgFinancial {
    pub org: String,
    pub investment: f64,
    pub realized: f64,
    #[serde(deserialize_with = "de_percent")]
    pub roi: f64,
    pub time_adherence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: Severity,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub name: String,
    pub due_date: String,
    pub status: MilestoneStatus,
    pub days_variance: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub phase: String,
    pub completion: f64,
    pub status: PhaseStatus,
    pub month: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImperativeStatus {
    pub name: String,
    pub value: f64,
    pub target: f64,
    pub status: ImperativeState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskItem {
    pub risk: String,
    pub impact: RiskLevel,
    pub probability: RiskLevel,
    pub mitigation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub month: String,
    pub analysis: f64,
    pub execution: f64,
    pub recalibration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub phase: String,
    pub planned: f64,
    pub actual: f64,
    pub risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgPerformance {
    pub org: String,
    pub cpr: f64,
    pub adoption: f64,
    pub impact: f64,
}

/// Headline card. Values are display strings supplied by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub change: String,
    pub subtext: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationProgress {
    pub module: String,
    pub completion: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub action: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PercentRepr {
    Number(f64),
    Text(String),
}

fn de_percent<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match PercentRepr::deserialize(deserializer)? {
        PercentRepr::Number(n) => Ok(n),
        PercentRepr::Text(s) => {
            parse_percent(&s).ok_or_else(|| de::Error::custom(format!("invalid percentage: {:?}", s)))
        }
    }
}

// =============================================================================
// Record sets
// =============================================================================

/// All record collections the dashboard reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordSets {
    pub organizations: Vec<Organization>,
    pub financials: Vec<FinancialPoint>,
    pub org_financials: Vec<OrgFinancial>,
    pub alerts: Vec<Alert>,
    pub milestones: Vec<Milestone>,
    pub phases: Vec<PhaseProgress>,
    pub imperatives: Vec<ImperativeStatus>,
    pub risks: Vec<RiskItem>,
    pub trends: Vec<TrendPoint>,
    pub timeline: Vec<TimelinePoint>,
    pub org_performance: Vec<OrgPerformance>,
    pub kpis: Vec<Kpi>,
    pub certifications: Vec<CertificationProgress>,
    pub actions: Vec<ActionItem>,
    #[serde(skip)]
    version: String,
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl RecordSets {
    /// SHA-256 of the source document (or of the serialized sample).
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let mut sets: RecordSets =
            serde_json::from_str(input).map_err(|e| DashboardError::RecordLoad(e.to_string()))?;
        sets.version = fingerprint(input.as_bytes());
        if sets.organizations.is_empty() {
            sets.organizations = derive_organizations(&sets.org_financials);
        }
        sets.log_loaded("json");
        Ok(sets)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::RecordLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&input)
    }

    pub fn is_known_org(&self, id: &str) -> bool {
        self.organizations.iter().any(|o| o.id == id)
    }

    pub fn org_name(&self, id: &str) -> Option<&str> {
        self.organizations
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.name.as_str())
    }

    fn log_loaded(&self, source: &str) {
        log_records_loaded(
            source,
            &self.version,
            &[
                ("organizations", self.organizations.len()),
                ("financials", self.financials.len()),
                ("org_financials", self.org_financials.len()),
                ("alerts", self.alerts.len()),
                ("milestones", self.milestones.len()),
            ],
        );
    }

    /// The record sets the dashboard ships with.
    pub fn sample() -> Self {
        let mut sets = RecordSets {
            organizations: vec![
                org("rs", "RS Internal"),
                org("clientA", "Client A"),
                org("clientB", "Client B"),
                org("clientC", "Client C"),
            ],
            financials: vec![
                fin("M1", 0.0, 0.0, 0.0, 0.0),
                fin("M2", 180_000.0, 165_000.0, 95_000.0, 70_000.0),
                fin("M3", 420_000.0, 410_000.0, 240_000.0, 170_000.0),
                fin("M4", 720_000.0, 745_000.0, 420_000.0, 325_000.0),
                fin("M5", 1_050_000.0, 1_128_000.0, 640_000.0, 488_000.0),
            ],
            org_financials: vec![
                org_fin("RS Internal", 450_000.0, 485_000.0, 7.8, 94.0),
                org_fin("Client A", 850_000.0, 780_000.0, -8.2, 78.0),
                org_fin("Client B", 720_000.0, 795_000.0, 10.4, 85.0),
                org_fin("Client C", 580_000.0, 485_000.0, -16.4, 68.0),
            ],
            alerts: vec![
                alert(1, "At Risk", "Client C - Timeline slipping; 12 days behind schedule", Severity::High, "2 hours ago"),
                alert(2, "Warning", "Client A - ROI realization below target by $70K this month", Severity::High, "4 hours ago"),
                alert(3, "Notice", "RS Internal - Exceeded financial targets by $35K", Severity::Low, "1 day ago"),
                alert(4, "At Risk", "Client B - Timeline adherence degrading; watch M8-9 phase", Severity::Medium, "6 hours ago"),
                alert(5, "Warning", "Cross-org - Initiative resource constraints impacting phase completion", Severity::Medium, "8 hours ago"),
            ],
            milestones: vec![
                milestone("Assessment Complete", "M2", MilestoneStatus::Complete, -2),
                milestone("Dashboards Launched", "M4", MilestoneStatus::OnTrack, 0),
                milestone("Executive Alignment", "M5", MilestoneStatus::AtRisk, 5),
                milestone("Capability Building", "M8", MilestoneStatus::AtRisk, 12),
                milestone("Sustainability Plan", "M12", MilestoneStatus::Pending, 0),
            ],
            phases: vec![
                phase("Foundation", 95.0, PhaseStatus::Complete, "M1-2"),
                phase("Initial Implementation", 72.0, PhaseStatus::InProgress, "M3-4"),
                phase("Integration", 45.0, PhaseStatus::OnTrack, "M5-8"),
                phase("Sustainability", 15.0, PhaseStatus::Pending, "M9-12"),
            ],
            imperatives: vec![
                imperative("Strategic Alignment", 88.0, 90.0, ImperativeState::OnTrack),
                imperative("Cross-Functional Execution", 75.0, 80.0, ImperativeState::AtRisk),
                imperative("Performance Visibility", 92.0, 90.0, ImperativeState::Exceeding),
                imperative("Capability Building", 68.0, 75.0, ImperativeState::AtRisk),
                imperative("Change Adoption", 81.0, 85.0, ImperativeState::OnTrack),
            ],
            risks: vec![
                risk("Resource Constraints", RiskLevel::High, RiskLevel::Medium, "Accelerate hiring; reallocate from lower priorities"),
                risk("Capability Gaps", RiskLevel::Medium, RiskLevel::High, "Intensive training program; external mentoring"),
                risk("Stakeholder Misalignment", RiskLevel::Medium, RiskLevel::Medium, "Escalation sessions; alignment workshops"),
                risk("Scope Creep", RiskLevel::High, RiskLevel::Medium, "Strict change control; scope gate reviews"),
            ],
            trends: vec![
                trend("M1", 60.0, 40.0, 20.0),
                trend("M2", 85.0, 55.0, 35.0),
                trend("M3", 90.0, 75.0, 50.0),
                trend("M4", 92.0, 82.0, 62.0),
                trend("M5", 94.0, 88.0, 75.0),
            ],
            timeline: vec![
                timeline("Foundation", 100.0, 95.0, 0.0),
                timeline("Initial Implementation", 100.0, 72.0, 5.0),
                timeline("Integration", 100.0, 45.0, 12.0),
                timeline("Sustainability", 100.0, 15.0, 25.0),
            ],
            org_performance: vec![
                perf("RS Internal", 89.0, 86.0, 92.0),
                perf("Client A", 75.0, 72.0, 78.0),
                perf("Client B", 82.0, 80.0, 85.0),
                perf("Client C", 68.0, 65.0, 70.0),
            ],
            kpis: vec![
                kpi("Total Financial Impact", "$3.14M", "+$280K", "Realized vs. Projected"),
                kpi("Avg. Timeline Adherence", "81%", "-4%", "Across all phases"),
                kpi("Implementation Progress", "78%", "+5%", "Overall completion"),
                kpi("Executive Alignment", "87/100", "+3", "CPR adoption score"),
            ],
            certifications: vec![
                cert("Intro to CPR", 100.0),
                cert("Strategic Visioning", 95.0),
                cert("Strategic Planning", 78.0),
                cert("Cross-Functional Leadership", 65.0),
                cert("Measurement & Accountability", 45.0),
            ],
            actions: vec![
                action(
                    "Timeline Recovery - Client C",
                    "12 days behind with capability gaps. Recommend resource augmentation and accelerated training.",
                    Priority::Immediate,
                    "Activate contingency resources",
                ),
                action(
                    "Phase Risk Mitigation",
                    "Upcoming Integration phase shows resource constraints. Recommend proactive reallocation.",
                    Priority::High,
                    "Review capacity plan",
                ),
                action(
                    "Celebrate RS Internal Success",
                    "RS exceeded financial targets and timeline. Leverage as case study for client marketing.",
                    Priority::Medium,
                    "Create case study asset",
                ),
            ],
            version: String::new(),
        };
        sets.version = serde_json::to_vec(&sets)
            .map(|bytes| fingerprint(&bytes))
            .unwrap_or_else(|_| "sample".to_string());
        sets.log_loaded("sample");
        sets
    }
}

/// Registry fallback for feeds without an `organizations` list: ids are the
/// lowercased names with spaces removed. Colliding ids get a `-2`, `-3`, ...
/// suffix so every org stays selectable.
fn derive_organizations(org_financials: &[OrgFinancial]) -> Vec<Organization> {
    let mut orgs: Vec<Organization> = Vec::with_capacity(org_financials.len());
    for f in org_financials {
        let base = f.org.to_lowercase().replace(' ', "");
        let mut id = base.clone();
        let mut n = 1;
        while orgs.iter().any(|o| o.id == id) {
            n += 1;
            id = format!("{}-{}", base, n);
        }
        if id != base {
            log_org_id_collision(&f.org, &base, &id);
        }
        orgs.push(Organization { id, name: f.org.clone() });
    }
    orgs
}

fn org(id: &str, name: &str) -> Organization {
    Organization { id: id.into(), name: name.into() }
}

fn fin(month: &str, projected: f64, actual: f64, savings: f64, revenue: f64) -> FinancialPoint {
    FinancialPoint { month: month.into(), projected, actual, savings, revenue }
}

fn org_fin(org: &str, investment: f64, realized: f64, roi: f64, time_adherence: f64) -> OrgFinancial {
    OrgFinancial { org: org.into(), investment, realized, roi, time_adherence }
}

fn alert(id: u32, kind: &str, message: &str, severity: Severity, time: &str) -> Alert {
    Alert { id, kind: kind.into(), message: message.into(), severity, time: time.into() }
}

fn milestone(name: &str, due_date: &str, status: MilestoneStatus, days_variance: i32) -> Milestone {
    Milestone { name: name.into(), due_date: due_date.into(), status, days_variance }
}

fn phase(phase: &str, completion: f64, status: PhaseStatus, month: &str) -> PhaseProgress {
    PhaseProgress { phase: phase.into(), completion, status, month: month.into() }
}

fn imperative(name: &str, value: f64, target: f64, status: ImperativeState) -> ImperativeStatus {
    ImperativeStatus { name: name.into(), value, target, status }
}

fn risk(risk: &str, impact: RiskLevel, probability: RiskLevel, mitigation: &str) -> RiskItem {
    RiskItem { risk: risk.into(), impact, probability, mitigation: mitigation.into() }
}

fn trend(month: &str, analysis: f64, execution: f64, recalibration: f64) -> TrendPoint {
    TrendPoint { month: month.into(), analysis, execution, recalibration }
}

fn timeline(phase: &str, planned: f64, actual: f64, risk: f64) -> TimelinePoint {
    TimelinePoint { phase: phase.into(), planned, actual, risk }
}

fn perf(org: &str, cpr: f64, adoption: f64, impact: f64) -> OrgPerformance {
    OrgPerformance { org: org.into(), cpr, adoption, impact }
}

fn kpi(label: &str, value: &str, change: &str, subtext: &str) -> Kpi {
    Kpi { label: label.into(), value: value.into(), change: change.into(), subtext: subtext.into() }
}

fn cert(module: &str, completion: f64) -> CertificationProgress {
    CertificationProgress { module: module.into(), completion }
}

fn action(title: &str, description: &str, priority: Priority, action: &str) -> ActionItem {
    ActionItem { title: title.into(), description: description.into(), priority, action: action.into() }
}
