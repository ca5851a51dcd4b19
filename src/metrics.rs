//! Derived metrics over the record sets and the current selection.
//!
//! Every function here is deterministic and leaves its inputs untouched.
//! Ratios with a zero denominator come back as [`Metric::Undefined`], never
//! as NaN or infinity. Unrecognized status labels map to [`Tone::Unknown`] and
//! are reported as [`Substitution`]s in the snapshot.

use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::logging::{log_degenerate, log_substitution};
use crate::records::{
    Alert, FinancialPoint, ImperativeState, MilestoneStatus, OrgFinancial, PhaseStatus, Priority,
    RecordSets, RiskLevel, Severity,
};
use crate::state::{AlertFilter, OrgFilter, Selection};

/// Time adherence at or above this is `good`.
pub const GOOD_ADHERENCE: f64 = 85.0;
/// Time adherence at or above this (and below `GOOD_ADHERENCE`) is `watch`.
pub const WATCH_ADHERENCE: f64 = 75.0;
/// Decimals kept by [`compute_roi_realization_rate`].
pub const ROI_DECIMALS: i32 = 1;

// =============================================================================
// Metric values
// =============================================================================

/// A derived number, or the marker for a degenerate aggregate.
///
/// Serializes as a JSON number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum Metric {
    Value(f64),
    Undefined,
}

impl Metric {
    /// Non-finite input collapses to `Undefined`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Metric::Value(value)
        } else {
            Metric::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Metric::Value(_))
    }

    /// For callers that cannot proceed without a number.
    pub fn require(self, metric: &'static str) -> Result<f64> {
        self.value()
            .ok_or(DashboardError::DegenerateAggregate { metric })
    }
}

impl From<Metric> for Option<f64> {
    fn from(metric: Metric) -> Self {
        metric.value()
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn ratio(metric: &'static str, numerator: f64, denominator: f64) -> Metric {
    if denominator == 0.0 || !denominator.is_finite() {
        log_degenerate(metric, denominator);
        return Metric::Undefined;
    }
    Metric::from_f64(numerator / denominator)
}

// =============================================================================
// Financial aggregates
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub total_investment: f64,
    pub total_realized: f64,
}

pub fn compute_totals(orgs: &[OrgFinancial]) -> Totals {
    Totals {
        total_investment: orgs.iter().map(|o| o.investment).sum(),
        total_realized: orgs.iter().map(|o| o.realized).sum(),
    }
}

/// `(Σrealized / Σinvestment - 1) * 100`, rounded to one decimal.
pub fn compute_roi_realization_rate(orgs: &[OrgFinancial]) -> Metric {
    let totals = compute_totals(orgs);
    match ratio("roi_rate", totals.total_realized, totals.total_investment) {
        Metric::Value(r) => Metric::from_f64(round_to((r - 1.0) * 100.0, ROI_DECIMALS)),
        Metric::Undefined => Metric::Undefined,
    }
}

/// Latest cumulative `actual` spread over the number of months reported.
pub fn compute_average_monthly_impact(points: &[FinancialPoint]) -> Metric {
    let Some(last) = points.last() else {
        log_degenerate("avg_monthly_impact", 0.0);
        return Metric::Undefined;
    };
    ratio("avg_monthly_impact", last.actual, points.len() as f64)
}

/// Latest cumulative `actual`, if any points exist.
pub fn current_financial_impact(points: &[FinancialPoint]) -> Option<f64> {
    points.last().map(|p| p.actual)
}

pub fn average_time_adherence(orgs: &[OrgFinancial]) -> Metric {
    let sum: f64 = orgs.iter().map(|o| o.time_adherence).sum();
    ratio("avg_time_adherence", sum, orgs.len() as f64)
}

// =============================================================================
// Alerts
// =============================================================================

/// Stable filter. `All` returns every alert in its original order.
pub fn filter_alerts(alerts: &[Alert], filter: AlertFilter) -> Vec<&Alert> {
    alerts.iter().filter(|a| filter.matches(&a.severity)).collect()
}

pub fn count_by_severity(alerts: &[Alert], severity: &Severity) -> usize {
    alerts.iter().filter(|a| a.severity == *severity).count()
}

/// Badge counts. `unrecognized` holds alerts whose severity is outside the
/// closed set, so `high + medium + low + unrecognized == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unrecognized: usize,
    pub total: usize,
}

pub fn severity_counts(alerts: &[Alert]) -> SeverityCounts {
    let mut counts = SeverityCounts {
        total: alerts.len(),
        ..Default::default()
    };
    for alert in alerts {
        match alert.severity {
            Severity::High => counts.high += 1,
            Severity::Medium => counts.medium += 1,
            Severity::Low => counts.low += 1,
            Severity::Unrecognized(_) => counts.unrecognized += 1,
        }
    }
    counts
}

// =============================================================================
// Classifications
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdherenceTier {
    Good,
    Watch,
    Risk,
}

impl AdherenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdherenceTier::Good => "good",
            AdherenceTier::Watch => "watch",
            AdherenceTier::Risk => "risk",
        }
    }
}

/// Cut points are inclusive on the higher tier. NaN lands in `Risk`.
pub fn classify_adherence(time_adherence: f64) -> AdherenceTier {
    if time_adherence >= GOOD_ADHERENCE {
        AdherenceTier::Good
    } else if time_adherence >= WATCH_ADHERENCE {
        AdherenceTier::Watch
    } else {
        AdherenceTier::Risk
    }
}

pub fn classify_org_financial(org: &OrgFinancial) -> AdherenceTier {
    classify_adherence(org.time_adherence)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiSign {
    Positive,
    Negative,
}

/// Numeric comparison; NaN is `Negative`.
pub fn classify_roi(roi: f64) -> RoiSign {
    if roi >= 0.0 {
        RoiSign::Positive
    } else {
        RoiSign::Negative
    }
}

/// Whether realized value beat the investment (strictly).
pub fn realized_sign(totals: &Totals) -> RoiSign {
    if totals.total_realized > totals.total_investment {
        RoiSign::Positive
    } else {
        RoiSign::Negative
    }
}

/// Visual tone the rendering layer maps to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Info,
    Caution,
    Danger,
    Neutral,
    Unknown,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Success => "success",
            Tone::Info => "info",
            Tone::Caution => "caution",
            Tone::Danger => "danger",
            Tone::Neutral => "neutral",
            Tone::Unknown => "unknown",
        }
    }
}

pub fn severity_tone(severity: &Severity) -> Tone {
    match severity {
        Severity::High => Tone::Danger,
        Severity::Medium => Tone::Caution,
        Severity::Low => Tone::Info,
        Severity::Unrecognized(_) => Tone::Unknown,
    }
}

pub fn phase_tone(status: &PhaseStatus) -> Tone {
    match status {
        PhaseStatus::Complete => Tone::Success,
        PhaseStatus::InProgress | PhaseStatus::OnTrack => Tone::Info,
        PhaseStatus::Pending => Tone::Neutral,
        PhaseStatus::Unrecognized(_) => Tone::Unknown,
    }
}

pub fn imperative_tone(status: &ImperativeState) -> Tone {
    match status {
        ImperativeState::Exceeding => Tone::Success,
        ImperativeState::OnTrack => Tone::Info,
        ImperativeState::AtRisk => Tone::Danger,
        ImperativeState::Unrecognized(_) => Tone::Unknown,
    }
}

/// Milestone cards flag anything not complete or on track.
pub fn milestone_tone(status: &MilestoneStatus) -> Tone {
    match status {
        MilestoneStatus::Complete => Tone::Success,
        MilestoneStatus::OnTrack => Tone::Info,
        MilestoneStatus::AtRisk | MilestoneStatus::Pending => Tone::Danger,
        MilestoneStatus::Unrecognized(_) => Tone::Unknown,
    }
}

pub fn level_tone(level: &RiskLevel) -> Tone {
    match level {
        RiskLevel::High => Tone::Danger,
        RiskLevel::Medium | RiskLevel::Low => Tone::Caution,
        RiskLevel::Unrecognized(_) => Tone::Unknown,
    }
}

pub fn priority_tone(priority: &Priority) -> Tone {
    match priority {
        Priority::Immediate => Tone::Danger,
        Priority::High => Tone::Caution,
        Priority::Medium => Tone::Info,
        Priority::Unrecognized(_) => Tone::Unknown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum Variance {
    OnTime,
    Ahead(u32),
    Behind(u32),
}

impl Variance {
    pub fn label(&self) -> String {
        match self {
            Variance::OnTime => "On Time".to_string(),
            Variance::Ahead(days) => format!("-{} days", days),
            Variance::Behind(days) => format!("+{} days", days),
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Variance::OnTime => Tone::Info,
            Variance::Ahead(_) => Tone::Success,
            Variance::Behind(_) => Tone::Danger,
        }
    }
}

pub fn milestone_variance(days_variance: i32) -> Variance {
    match days_variance {
        0 => Variance::OnTime,
        d if d < 0 => Variance::Ahead(d.unsigned_abs()),
        d => Variance::Behind(d.unsigned_abs()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// KPI change strings such as `"+$280K"` or `"-4%"`.
pub fn change_direction(change: &str) -> Direction {
    if change.trim_start().starts_with('-') {
        Direction::Down
    } else {
        Direction::Up
    }
}

// =============================================================================
// Substitutions
// =============================================================================

/// An unrecognized label that was mapped to the conservative default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    pub kind: &'static str,
    pub value: String,
    pub fallback: Tone,
}

impl Substitution {
    pub fn to_error(&self) -> DashboardError {
        DashboardError::unknown_enum(self.kind, self.value.clone())
    }
}

/// Every unrecognized label in the record sets, in record order.
pub fn collect_substitutions(records: &RecordSets) -> Vec<Substitution> {
    let mut found = Vec::new();
    let mut push = |kind: &'static str, label: &str, recognized: bool, tone: Tone| {
        if !recognized {
            log_substitution(kind, label, tone.as_str());
            found.push(Substitution {
                kind,
                value: label.to_string(),
                fallback: tone,
            });
        }
    };
    for a in &records.alerts {
        push(Severity::KIND, a.severity.as_str(), a.severity.is_recognized(), severity_tone(&a.severity));
    }
    for m in &records.milestones {
        push(MilestoneStatus::KIND, m.status.as_str(), m.status.is_recognized(), milestone_tone(&m.status));
    }
    for p in &records.phases {
        push(PhaseStatus::KIND, p.status.as_str(), p.status.is_recognized(), phase_tone(&p.status));
    }
    for i in &records.imperatives {
        push(ImperativeState::KIND, i.status.as_str(), i.status.is_recognized(), imperative_tone(&i.status));
    }
    for r in &records.risks {
        push(RiskLevel::KIND, r.impact.as_str(), r.impact.is_recognized(), level_tone(&r.impact));
        push(RiskLevel::KIND, r.probability.as_str(), r.probability.is_recognized(), level_tone(&r.probability));
    }
    for a in &records.actions {
        push(Priority::KIND, a.priority.as_str(), a.priority.is_recognized(), priority_tone(&a.priority));
    }
    found
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgClassification {
    pub org: String,
    pub investment: f64,
    pub realized: f64,
    pub roi: f64,
    pub roi_sign: RoiSign,
    pub time_adherence: f64,
    pub tier: AdherenceTier,
}

impl OrgClassification {
    pub fn from_record(org: &OrgFinancial) -> Self {
        Self {
            org: org.org.clone(),
            investment: org.investment,
            realized: org.realized,
            roi: org.roi,
            roi_sign: classify_roi(org.roi),
            time_adherence: org.time_adherence,
            tier: classify_org_financial(org),
        }
    }
}

/// Everything the rendering layer reads for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub selection: Selection,
    pub records_version: String,
    pub roi_rate: Metric,
    pub total_investment: f64,
    pub total_realized: f64,
    pub realized_sign: RoiSign,
    pub current_financial_impact: Option<f64>,
    pub avg_monthly_impact: Metric,
    pub avg_time_adherence: Metric,
    pub filtered_alerts: Vec<Alert>,
    pub severity_counts: SeverityCounts,
    pub per_org_classification: Vec<OrgClassification>,
    pub substitutions: Vec<Substitution>,
}

/// Per-org rows narrowed by the org filter. Headline totals stay portfolio-wide.
pub fn org_rows(records: &RecordSets, filter: &OrgFilter) -> Vec<OrgClassification> {
    let name = match filter {
        OrgFilter::All => None,
        OrgFilter::Org(id) => match records.org_name(id) {
            Some(name) => Some(name),
            None => return Vec::new(),
        },
    };
    records
        .org_financials
        .iter()
        .filter(|o| name.map_or(true, |n| o.org == n))
        .map(OrgClassification::from_record)
        .collect()
}

pub fn get_derived_metrics(records: &RecordSets, selection: &Selection) -> DerivedMetrics {
    let totals = compute_totals(&records.org_financials);
    DerivedMetrics {
        selection: selection.clone(),
        records_version: records.version().to_string(),
        roi_rate: compute_roi_realization_rate(&records.org_financials),
        total_investment: totals.total_investment,
        total_realized: totals.total_realized,
        realized_sign: realized_sign(&totals),
        current_financial_impact: current_financial_impact(&records.financials),
        avg_monthly_impact: compute_average_monthly_impact(&records.financials),
        avg_time_adherence: average_time_adherence(&records.org_financials),
        filtered_alerts: filter_alerts(&records.alerts, selection.alert_filter)
            .into_iter()
            .cloned()
            .collect(),
        severity_counts: severity_counts(&records.alerts),
        per_org_classification: org_rows(records, &selection.org_filter),
        substitutions: collect_substitutions(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org(investment: f64, realized: f64, time_adherence: f64) -> OrgFinancial {
        OrgFinancial {
            org: "X".to_string(),
            investment,
            realized,
            roi: 0.0,
            time_adherence,
        }
    }

    fn alert(id: u32, severity: Severity) -> Alert {
        Alert {
            id,
            kind: "Notice".to_string(),
            message: format!("alert {}", id),
            severity,
            time: "now".to_string(),
        }
    }

    #[test]
    fn test_roi_rate_sample() {
        let sets = RecordSets::sample();
        // 2_545_000 / 2_600_000 = 0.97884..., so -2.1%
        assert_eq!(compute_roi_realization_rate(&sets.org_financials), Metric::Value(-2.1));
    }

    #[test]
    fn test_roi_rate_degenerate() {
        assert_eq!(compute_roi_realization_rate(&[]), Metric::Undefined);
        let zero = vec![org(0.0, 100.0, 90.0), org(0.0, 50.0, 90.0)];
        assert_eq!(compute_roi_realization_rate(&zero), Metric::Undefined);
        assert!(compute_roi_realization_rate(&zero).require("roi_rate").is_err());
    }

    #[test]
    fn test_roi_rate_matches_formula() {
        let cases = [
            vec![org(100.0, 110.0, 0.0)],
            vec![org(300.0, 250.0, 0.0), org(700.0, 820.0, 0.0)],
            vec![org(1.0, 0.0, 0.0)],
            vec![org(3.0, 1.0, 0.0)],
        ];
        for orgs in cases {
            let t = compute_totals(&orgs);
            let expected = round_to((t.total_realized / t.total_investment - 1.0) * 100.0, 1);
            assert_eq!(compute_roi_realization_rate(&orgs), Metric::Value(expected));
        }
    }

    #[test]
    fn test_totals_sample() {
        let sets = RecordSets::sample();
        let totals = compute_totals(&sets.org_financials);
        assert_eq!(totals.total_investment, 2_600_000.0);
        assert_eq!(totals.total_realized, 2_545_000.0);
        assert_eq!(realized_sign(&totals), RoiSign::Negative);
    }

    #[test]
    fn test_average_monthly_impact() {
        let sets = RecordSets::sample();
        assert_eq!(compute_average_monthly_impact(&sets.financials), Metric::Value(225_600.0));
        assert_eq!(compute_average_monthly_impact(&[]), Metric::Undefined);
    }

    #[test]
    fn test_average_time_adherence() {
        let sets = RecordSets::sample();
        assert_eq!(average_time_adherence(&sets.org_financials), Metric::Value(81.25));
        assert_eq!(average_time_adherence(&[]), Metric::Undefined);
    }

    #[test]
    fn test_filter_alerts_preserves_order() {
        let alerts = vec![
            alert(1, Severity::Low),
            alert(2, Severity::High),
            alert(3, Severity::Low),
            alert(4, Severity::Unrecognized("critical".into())),
            alert(5, Severity::Low),
        ];
        let low: Vec<u32> = filter_alerts(&alerts, AlertFilter::Low).iter().map(|a| a.id).collect();
        assert_eq!(low, vec![1, 3, 5]);

        let all: Vec<&Alert> = filter_alerts(&alerts, AlertFilter::All);
        assert_eq!(all.len(), alerts.len());
        assert!(all.iter().zip(alerts.iter()).all(|(a, b)| *a == b));

        assert!(filter_alerts(&alerts, AlertFilter::Medium).is_empty());
    }

    #[test]
    fn test_severity_counts_partition() {
        let alerts = vec![
            alert(1, Severity::High),
            alert(2, Severity::Medium),
            alert(3, Severity::Unrecognized("urgent".into())),
        ];
        let counts = severity_counts(&alerts);
        assert_eq!(counts.high + counts.medium + counts.low + counts.unrecognized, counts.total);
        assert_eq!(counts.unrecognized, 1);
        assert_eq!(count_by_severity(&alerts, &Severity::High), 1);
        assert_eq!(count_by_severity(&alerts, &Severity::High), 1);
    }

    #[test]
    fn test_adherence_boundaries() {
        assert_eq!(classify_org_financial(&org(1.0, 1.0, 85.0)), AdherenceTier::Good);
        assert_eq!(classify_org_financial(&org(1.0, 1.0, 84.999)), AdherenceTier::Watch);
        assert_eq!(classify_org_financial(&org(1.0, 1.0, 75.0)), AdherenceTier::Watch);
        assert_eq!(classify_org_financial(&org(1.0, 1.0, 74.9)), AdherenceTier::Risk);
        assert_eq!(classify_adherence(f64::NAN), AdherenceTier::Risk);
    }

    #[test]
    fn test_classify_roi_numeric() {
        assert_eq!(classify_roi(0.0), RoiSign::Positive);
        assert_eq!(classify_roi(-0.0), RoiSign::Positive);
        assert_eq!(classify_roi(-8.2), RoiSign::Negative);
        assert_eq!(classify_roi(10.4), RoiSign::Positive);
        assert_eq!(classify_roi(f64::NAN), RoiSign::Negative);
    }

    #[test]
    fn test_tones_fail_closed() {
        assert_eq!(severity_tone(&Severity::parse("critical")), Tone::Unknown);
        assert_eq!(phase_tone(&PhaseStatus::parse("Blocked")), Tone::Unknown);
        assert_eq!(milestone_tone(&MilestoneStatus::Pending), Tone::Danger);
        assert_eq!(phase_tone(&PhaseStatus::Pending), Tone::Neutral);
        assert_eq!(imperative_tone(&ImperativeState::Exceeding), Tone::Success);
        assert_eq!(level_tone(&RiskLevel::Medium), Tone::Caution);
        assert_eq!(priority_tone(&Priority::Immediate), Tone::Danger);
    }

    #[test]
    fn test_milestone_variance() {
        assert_eq!(milestone_variance(0), Variance::OnTime);
        assert_eq!(milestone_variance(-2).label(), "-2 days");
        assert_eq!(milestone_variance(12), Variance::Behind(12));
        assert_eq!(milestone_variance(12).label(), "+12 days");
        assert_eq!(milestone_variance(5).tone(), Tone::Danger);
    }

    #[test]
    fn test_change_direction() {
        assert_eq!(change_direction("+$280K"), Direction::Up);
        assert_eq!(change_direction("-4%"), Direction::Down);
        assert_eq!(change_direction("+3"), Direction::Up);
    }

    #[test]
    fn test_substitutions_sample_is_clean() {
        assert!(collect_substitutions(&RecordSets::sample()).is_empty());
    }

    #[test]
    fn test_substitutions_report_unknown_labels() {
        let mut sets = RecordSets::sample();
        sets.alerts.push(alert(6, Severity::parse("critical")));
        sets.milestones[0].status = MilestoneStatus::parse("Slipped");
        let subs = collect_substitutions(&sets);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].kind, "severity");
        assert_eq!(subs[0].value, "critical");
        assert_eq!(subs[0].fallback, Tone::Unknown);
        assert_eq!(subs[1].to_error(), DashboardError::unknown_enum("milestone_status", "Slipped"));
    }

    #[test]
    fn test_org_rows_follow_filter() {
        let sets = RecordSets::sample();
        assert_eq!(org_rows(&sets, &OrgFilter::All).len(), 4);
        let rows = org_rows(&sets, &OrgFilter::Org("clientC".into()));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].org, "Client C");
        assert_eq!(rows[0].tier, AdherenceTier::Risk);
        assert_eq!(rows[0].roi_sign, RoiSign::Negative);
        assert!(org_rows(&sets, &OrgFilter::Org("ghost".into())).is_empty());
    }

    #[test]
    fn test_metric_serializes_null_when_undefined() {
        assert_eq!(serde_json::to_value(Metric::Undefined).unwrap(), serde_json::Value::Null);
        assert_eq!(serde_json::to_value(Metric::Value(-2.1)).unwrap(), serde_json::json!(-2.1));
    }
}
