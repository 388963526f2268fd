//! Plain-text renderers for `status`, `list`, `usage` and `check`.
//!
//! Renderers return strings so commands decide where output goes.

use console::style;
use std::fmt::Write;

use crate::gates::Readiness;
use crate::mission::{CriterionStatus, Mission, UsageTotals};
use crate::phase::{Outcome, Phase, PhasePointer};
use crate::ui::icons::{BLOCKER, CHECK, COST, CROSS, PENDING, RETRY, RUNNING};
use crate::ui::progress::pointer_label;

const WRAP_WIDTH: usize = 76;

fn wrapped(label: &str, text: &str) -> String {
    let indent = " ".repeat(label.len() + 4);
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent("")
        .subsequent_indent(&indent);
    textwrap::fill(text, options)
}

pub fn render_status(mission: &Mission, verbose: bool) -> String {
    let mut out = String::new();
    let ctx = &mission.mission_context;

    let _ = writeln!(out, "{} {}", style("Mission").bold(), style(&mission.id).cyan().bold());
    if !ctx.objective.is_empty() {
        let _ = writeln!(out, "  Objective: {}", wrapped("Objective:", &ctx.objective));
    }
    let _ = writeln!(out, "  Phase:     {}", style(pointer_label(mission.current_phase)).yellow());
    let _ = writeln!(out, "  Rigor:     {}", mission.test_rigor);
    if verbose {
        for (label, items) in [
            ("Scope:", &ctx.scope),
            ("Constraints:", &ctx.constraints),
            ("Non-goals:", &ctx.non_goals),
        ] {
            if !items.is_empty() {
                let _ = writeln!(out, "  {} {}", label, wrapped(label, &items.join(", ")));
            }
        }
    }

    let _ = writeln!(out, "\n  {}", style("Phases").underlined());
    for phase in Phase::ALL {
        let record = mission.record(phase);
        let icon = match (mission.current_phase, record.latest().map(|l| l.outcome)) {
            (PhasePointer::Active(current), _) if current == phase => RUNNING,
            (_, None) => PENDING,
            (_, Some(Outcome::Error)) => CROSS,
            (_, Some(Outcome::Fail)) => RETRY,
            (_, Some(_)) => CHECK,
        };
        let last = record
            .latest()
            .map(|l| format!("{} after {} iteration(s)", l.outcome, l.iteration))
            .unwrap_or_else(|| "not run".to_string());
        let _ = writeln!(out, "    {}{:<10} {}", icon, phase.as_str(), style(last).dim());
    }

    let criteria = &mission.phases.plan.acceptance_criteria;
    if !criteria.is_empty() {
        let passed = criteria.iter().filter(|c| c.status == CriterionStatus::Pass).count();
        let failed = criteria.iter().filter(|c| c.status == CriterionStatus::Fail).count();
        let _ = writeln!(
            out,
            "\n  Criteria:  {} total, {} pass, {} fail",
            criteria.len(),
            style(passed).green(),
            style(failed).red()
        );
        if verbose {
            for c in criteria {
                let _ = writeln!(out, "    - [{}] {}", c.status, c.description);
            }
        }
    }

    if let Some(phase) = mission.current_phase.phase()
        && let Some(log) = mission.record(phase).latest()
    {
        for missing in &log.blocked_by {
            let _ = writeln!(out, "  {}{}", BLOCKER, style(missing).red());
        }
        if let Some(error) = &log.error {
            let _ = writeln!(out, "  {}{}", CROSS, style(error).red());
        }
    }

    if let Some(message) = mission
        .phases
        .finalize
        .latest()
        .and_then(|l| l.commit_message.as_deref())
    {
        let _ = writeln!(out, "\n  Commit:    {}", message);
    }

    let _ = writeln!(out, "\n  {}", render_usage(&mission.usage_totals()));
    if verbose && let Some(ledger) = &mission.usage {
        for run in ledger.runs() {
            let status = if run.success { "ok" } else { "failed" };
            let _ = writeln!(
                out,
                "    {} {:<10} {:>8} tok  ${:.4}  {} {}",
                run.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                run.phase.as_str(),
                run.total_tokens,
                run.cost_usd,
                run.model,
                status
            );
        }
    }

    out
}

pub fn render_usage(totals: &UsageTotals) -> String {
    format!(
        "{}{} run(s), {} prompt + {} completion = {} tokens, ${:.4}",
        COST,
        totals.runs,
        totals.prompt_tokens,
        totals.completion_tokens,
        totals.total_tokens,
        totals.cost_usd
    )
}

pub fn render_list_row(mission: &Mission) -> String {
    let objective = mission.mission_context.objective.lines().next().unwrap_or("");
    format!(
        "{:<24} {:<10} {}",
        mission.id,
        pointer_label(mission.current_phase),
        style(textwrap::wrap(objective, 44).first().map(|l| l.to_string()).unwrap_or_default()).dim()
    )
}

pub fn render_readiness(id: &str, target: PhasePointer, readiness: &Readiness) -> String {
    if readiness.is_ok() {
        return format!("{}{} is ready for {}", CHECK, id, pointer_label(target));
    }
    let mut out = format!("{}{} is not ready for {}:\n", BLOCKER, id, pointer_label(target));
    for missing in &readiness.missing {
        let _ = writeln!(out, "  - {}", missing);
    }
    out
}
