use crate::orchestrator::{RunReport, StopReason, TickReport};
use crate::phase::{Outcome, Phase, PhasePointer};
use crate::ui::icons::{BLOCKER, CHECK, CROSS, RETRY, SPARKLE};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Terminal UI for a mission run.
///
/// Two bars are stacked vertically:
/// - Phase bar: how far the pointer has moved through the four phases
/// - Tick bar: spinner naming the phase currently running
pub struct RunUI {
    multi: MultiProgress,
    phase_bar: ProgressBar,
    tick_bar: ProgressBar,
    verbose: bool,
}

fn position(pointer: PhasePointer) -> u64 {
    match pointer {
        PhasePointer::Active(phase) => Phase::ALL.iter().position(|p| *p == phase).unwrap_or(0) as u64,
        PhasePointer::Complete => Phase::ALL.len() as u64,
    }
}

impl RunUI {
    pub fn new(mission_id: &str, start: PhasePointer, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let phase_bar = multi.add(ProgressBar::new(Phase::ALL.len() as u64));
        if let Ok(phase_style) =
            ProgressStyle::default_bar().template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        {
            phase_bar.set_style(phase_style.progress_chars("█▓▒░"));
        }
        phase_bar.set_prefix("Phases");
        phase_bar.set_position(position(start));
        phase_bar.set_message(style(mission_id).bold().to_string());

        let tick_bar = multi.add(ProgressBar::new_spinner());
        if let Ok(tick_style) = ProgressStyle::default_spinner().template("{prefix:.bold.dim} {spinner} {msg}") {
            tick_bar.set_style(tick_style);
        }
        tick_bar.set_prefix("   Now");

        let ui = Self {
            multi,
            phase_bar,
            tick_bar,
            verbose,
        };
        ui.running(start);
        ui
    }

    /// Print a line above the bars, falling back to stderr.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    fn running(&self, pointer: PhasePointer) {
        if let Some(phase) = pointer.phase() {
            self.tick_bar.set_message(format!(
                "Running {} {}",
                style(phase).yellow(),
                style(format!("({})", phase.operation_kind())).dim()
            ));
            self.tick_bar.enable_steady_tick(Duration::from_millis(100));
        }
    }

    /// Record a finished tick and show what runs next.
    pub fn tick_finished(&self, tick: &TickReport) {
        let icon = match tick.outcome {
            Outcome::Completed | Outcome::Pass => CHECK,
            Outcome::Fail => RETRY,
            Outcome::Error => CROSS,
        };
        self.print_line(format!(
            "  {}{} iteration {} {} {}",
            icon,
            style(tick.phase).bold(),
            tick.iteration,
            style("→").dim(),
            style(tick.outcome).cyan()
        ));
        if self.verbose && tick.pointer != PhasePointer::Active(tick.phase) {
            self.print_line(format!("    {} pointer now {}", style("→").dim(), pointer_label(tick.pointer)));
        }
        self.phase_bar.set_position(position(tick.pointer));
        self.running(tick.pointer);
    }

    /// Hide the bars while something else owns the terminal.
    pub fn pause(&self) {
        self.tick_bar.disable_steady_tick();
        self.multi.set_draw_target(ProgressDrawTarget::hidden());
    }

    pub fn resume(&self) {
        self.multi.set_draw_target(ProgressDrawTarget::stderr());
        self.tick_bar.enable_steady_tick(Duration::from_millis(100));
    }

    /// Stop the spinner after the run returned.
    pub fn finish(&self, report: &RunReport) {
        let msg = match report.stop {
            StopReason::Complete => format!("{}Mission complete", SPARKLE),
            StopReason::SingleStep => format!("Stepped to {}", pointer_label(report.final_pointer)),
            StopReason::IterationCeiling => format!(
                "Stopped at iteration ceiling ({} ticks), next: {}",
                report.ticks.len(),
                pointer_label(report.final_pointer)
            ),
            StopReason::Cancelled => format!("Cancelled, next: {}", pointer_label(report.final_pointer)),
        };
        self.tick_bar.finish_with_message(msg);
        self.phase_bar.finish();
    }

    /// Stop the spinner after the run was halted by an error.
    pub fn halted(&self, reason: &str) {
        self.tick_bar
            .finish_with_message(format!("{}{}", BLOCKER, style(reason).red()));
        self.phase_bar.abandon();
    }
}

pub fn pointer_label(pointer: PhasePointer) -> String {
    match pointer {
        PhasePointer::Active(phase) => phase.to_string(),
        PhasePointer::Complete => "complete".to_string(),
    }
}
