use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cprdash::format::{format_metric, format_millions, format_percent, format_thousands};
use cprdash::logging::{json_log, obj, v_num, v_str};
use cprdash::metrics::DerivedMetrics;
use cprdash::{Config, DashboardError, RecordSets, Session};

struct Args {
    view: Option<String>,
    org: Option<String>,
    alerts: Option<String>,
    data: Option<String>,
    summary: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args { view: None, org: None, alerts: None, data: None, summary: false };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = || it.next().ok_or_else(|| anyhow!("missing value for {}", flag));
        match flag.as_str() {
            "--view" => args.view = Some(value()?),
            "--org" => args.org = Some(value()?),
            "--alerts" => args.alerts = Some(value()?),
            "--data" => args.data = Some(value()?),
            "--summary" => args.summary = true,
            other => return Err(anyhow!("unknown argument: {}", other)),
        }
    }
    Ok(args)
}

fn print_summary(d: &DerivedMetrics, decimals: usize) {
    let pct = |v: f64| format_percent(v, decimals);
    println!("selection:            {}", d.selection);
    println!("roi realization rate: {}", format_metric(d.roi_rate, pct));
    println!("total investment:     {}", format_millions(d.total_investment));
    println!("total realized:       {}", format_millions(d.total_realized));
    println!("avg monthly impact:   {}", format_metric(d.avg_monthly_impact, format_thousands));
    println!(
        "alerts:               {} shown / {} total ({} high, {} medium, {} low)",
        d.filtered_alerts.len(),
        d.severity_counts.total,
        d.severity_counts.high,
        d.severity_counts.medium,
        d.severity_counts.low
    );
    for row in &d.per_org_classification {
        println!(
            "  {:<12} {:>7} {:>7} roi {:>7} ({:?}) adherence {:>5} {}",
            row.org,
            format_thousands(row.investment),
            format_thousands(row.realized),
            pct(row.roi),
            row.roi_sign,
            format_percent(row.time_adherence, 0),
            row.tier.as_str()
        );
    }
    for sub in &d.substitutions {
        println!("  substituted {} {:?} -> {}", sub.kind, sub.value, sub.fallback.as_str());
    }
}

fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args = parse_args()?;

    let records = match args.data.as_deref().or(cfg.data_path.as_deref()) {
        Some(path) => RecordSets::load(Path::new(path)).with_context(|| format!("loading {}", path))?,
        None => RecordSets::sample(),
    };
    let mut session = Session::with_config(Arc::new(records), &cfg);

    if let Err(err) = session.select(args.view.as_deref(), args.org.as_deref(), args.alerts.as_deref()) {
        if let DashboardError::InvalidSelection { field, .. } = &err {
            json_log("cli", obj(&[("error", v_str(&err.to_string())), ("field", v_str(field))]));
        }
        eprintln!("{}", err);
        std::process::exit(2);
    }

    let derived = session.derived_metrics();
    json_log(
        "cli",
        obj(&[
            ("selection", v_str(&derived.selection.to_string())),
            ("records_version", v_str(&derived.records_version)),
            ("filtered_alerts", v_num(derived.filtered_alerts.len() as f64)),
        ]),
    );

    if args.summary {
        print_summary(&derived, cfg.display_decimals);
    } else {
        println!("{}", serde_json::to_string_pretty(&derived)?);
    }
    Ok(())
}
