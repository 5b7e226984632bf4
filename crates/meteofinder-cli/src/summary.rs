use std::path::{Path, PathBuf};

use console::Style;
use meteofinder_core::decision::{Mode, Verdict};
use meteofinder_core::pipeline::{Diagnosis, SweepReport};
use meteofinder_core::report::RunReport;
use meteofinder_core::scoring::{SegmentOutcome, SensitivityLevel};

use crate::files::CopyTarget;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    bad: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            bad: Style::new().red(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn rule(len: usize) -> String {
    "\u{2550}".repeat(len)
}

pub fn print_scan_header(folder: &Path, images: usize, mode: Mode, level: SensitivityLevel) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("MeteoFinder"));
    println!("  {}", s.title.apply_to(rule(11)));
    println!();
    println!("  {:<14}{}", s.label.apply_to("Folder"), s.path.apply_to(folder.display()));
    println!("  {:<14}{}", s.label.apply_to("Images"), s.value.apply_to(images));
    println!("  {:<14}{}", s.label.apply_to("Mode"), s.good.apply_to(mode));
    println!(
        "  {:<14}{} {}",
        s.label.apply_to("Sensitivity"),
        s.value.apply_to(level),
        s.label.apply_to(format!("({})", level.description()))
    );
    println!();
}

/// `copied` is the number of files copied and where, `None` when the run
/// copies nothing.
pub fn print_run_report(report: &RunReport, copied: Option<(usize, CopyTarget)>) {
    let s = Styles::new();
    let summary = &report.summary;

    println!("  {}", s.header.apply_to("Results"));
    println!("    {:<16}{}", s.label.apply_to("Scanned"), s.value.apply_to(summary.total));
    println!(
        "    {:<16}{}",
        s.label.apply_to("Accepted"),
        s.good.apply_to(summary.accepted())
    );
    if report.mode == Mode::Hybrid {
        println!(
            "    {:<16}{}",
            s.label.apply_to("  verified"),
            s.value.apply_to(summary.accepted_remote)
        );
        println!(
            "    {:<16}{}",
            s.label.apply_to("  local"),
            s.value.apply_to(summary.accepted_local)
        );
    }
    println!("    {:<16}{}", s.label.apply_to("Rejected"), s.value.apply_to(summary.rejected));
    if summary.escalation_failed > 0 {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Failed"),
            s.bad.apply_to(summary.escalation_failed)
        );
    }
    if summary.skipped > 0 {
        println!(
            "    {:<16}{}",
            s.label.apply_to("Skipped"),
            s.disabled.apply_to(summary.skipped)
        );
    }
    println!();

    if report.mode == Mode::Hybrid {
        println!("  {}", s.header.apply_to("Verification"));
        println!(
            "    {:<16}{}",
            s.label.apply_to("Escalations"),
            s.value.apply_to(report.budget.escalations)
        );
        println!(
            "    {:<16}{} ({} confirmed, {} refuted, {} failed)",
            s.label.apply_to("Calls"),
            s.value.apply_to(report.budget.attempts),
            report.budget.confirmed,
            report.budget.refuted,
            report.budget.failed
        );
        println!(
            "    {:<16}{}",
            s.label.apply_to("Est. cost"),
            s.value.apply_to(format!("${:.3}", summary.estimated_cost_usd))
        );
        if report.degraded {
            println!(
                "    {:<16}{}",
                s.label.apply_to("Status"),
                s.bad.apply_to("fell back to local-only after repeated failures")
            );
        }
        println!();
    }

    let accepted = report.accepted_set();
    if accepted.is_empty() {
        println!("  {}", s.disabled.apply_to("No meteors found."));
        if report.level.value() < SensitivityLevel::MAX {
            println!(
                "  {}",
                s.label.apply_to("Tip: raise the sensitivity (-s 4 or -s 5) to catch fainter streaks.")
            );
        }
    } else {
        println!("  {}", s.header.apply_to("Meteors"));
        for image in &accepted {
            let tag = match image.verdict {
                Verdict::AcceptedRemote => "verified",
                _ => "local",
            };
            let score = image
                .score
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".into());
            println!(
                "    {}  {}  {}",
                s.path.apply_to(image.path.display()),
                s.value.apply_to(score),
                s.label.apply_to(tag)
            );
        }
        match copied {
            Some((n, target)) => println!(
                "\n  Copied {} new file(s) into {}/",
                s.good.apply_to(n),
                target.folder_name()
            ),
            None => println!("\n  {}", s.label.apply_to("Pre-filter only: nothing was copied.")),
        }
    }
    println!();
}

/// Dry run of `verify`: what would be sent and roughly what it costs.
pub fn print_verify_plan(candidates: &[PathBuf], cost_per_call_usd: f64) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Verification Plan"));
    println!("  {}", s.title.apply_to(rule(17)));
    println!();
    println!("  {:<14}{}", s.label.apply_to("Candidates"), s.value.apply_to(candidates.len()));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Est. cost"),
        s.value.apply_to(format!("${:.3}", candidates.len() as f64 * cost_per_call_usd))
    );
    println!();
    for path in candidates {
        println!("    {}", s.path.apply_to(path.display()));
    }
    println!();
    println!("  {}", s.label.apply_to("Dry run: nothing was sent or copied."));
    println!();
}

pub fn print_sweep(report: &SweepReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Sensitivity Sweep"));
    println!("  {}", s.title.apply_to(rule(17)));
    println!();
    println!("  {:<14}{}", s.label.apply_to("Analysed"), s.value.apply_to(report.analysed));
    if report.failed > 0 {
        println!("  {:<14}{}", s.label.apply_to("Unreadable"), s.bad.apply_to(report.failed));
    }
    if report.skipped > 0 {
        println!("  {:<14}{}", s.label.apply_to("Skipped"), s.disabled.apply_to(report.skipped));
    }
    println!();
    for count in &report.levels {
        println!(
            "    {}  {:>5} detected  {:>6}  {}",
            s.value.apply_to(count.level),
            count.detected,
            format!("{:.1}%", count.rate * 100.0),
            s.label.apply_to(count.level.description())
        );
    }
    println!();
}

pub fn print_diagnosis(path: &Path, level: SensitivityLevel, diagnosis: &Diagnosis) {
    let s = Styles::new();

    println!();
    println!("  {}", s.path.apply_to(path.display()));
    println!(
        "    {:<14}{}x{} (scale {:.3})",
        s.label.apply_to("Analysed at"),
        diagnosis.width,
        diagnosis.height,
        diagnosis.scale
    );
    println!("    {:<14}{}", s.label.apply_to("Edge pixels"), diagnosis.edge_pixels);
    println!("    {:<14}{}", s.label.apply_to("Segments"), diagnosis.assessments.len());
    println!("    {:<14}{}", s.label.apply_to("Level"), level);

    for (i, a) in diagnosis.assessments.iter().enumerate() {
        let f = &a.features;
        let outcome = match &a.outcome {
            SegmentOutcome::Qualified { score } => {
                s.good.apply_to(format!("qualified {score:.2}")).to_string()
            }
            SegmentOutcome::Rejected(reason) => s.bad.apply_to(reason.to_string()).to_string(),
        };
        println!(
            "    {:>3}. len {:>6.1}  ang {:>5.1}  bright {:.2}  contrast {:.2}  curv {:.2}  runs {}  drop {:.2}  red {}  par {}  {}",
            i + 1,
            f.length,
            a.segment.angle,
            f.brightness,
            f.contrast,
            f.curvature,
            f.modulation_runs,
            f.dropout,
            f.red_hits,
            a.parallel_companions,
            outcome
        );
    }
}
