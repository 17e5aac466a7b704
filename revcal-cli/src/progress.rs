//! Per-round progress lines on stdout.
//!
//! The line format is what downstream experiment scripts grep for, so it is
//! kept stable.

use revcal_core::{RoundCallback, RoundRecord, RunState, StopReason};
use std::io::Write;

/// Prints one progress block per round.
pub struct ProgressPrinter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn emit(
        &mut self,
        topic: &str,
        record: &RoundRecord,
        state: &RunState,
        num_rel: usize,
    ) -> std::io::Result<()> {
        if record.round == 0 {
            writeln!(
                self.out,
                "Initial: {} reviewed, {} relevant out of {} total",
                state.docs_reviewed, state.rel_seen, num_rel
            )?;
        } else {
            writeln!(
                self.out,
                "{} Step {}: {} reviewed, {} relevant / {} total, {:.4} step set prec",
                topic,
                record.round,
                state.docs_reviewed,
                state.rel_seen,
                num_rel,
                state.step_set_precision()
            )?;
        }
        writeln!(self.out, "AP: {:.4}", record.effectiveness)?;
        self.out.flush()
    }
}

impl<W: Write + Send> RoundCallback for ProgressPrinter<W> {
    fn on_round_end(
        &mut self,
        topic: &str,
        record: &RoundRecord,
        state: &RunState,
        num_rel: usize,
    ) {
        if let Err(e) = self.emit(topic, record, state, num_rel) {
            tracing::warn!(error = %e, "Failed to write progress line");
        }
    }

    fn on_stop(&mut self, topic: &str, reason: StopReason, state: &RunState) {
        if let Err(e) = writeln!(self.out, "{topic} stopped after step {}: {reason}", state.step) {
            tracing::warn!(error = %e, "Failed to write progress line");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(state: &RunState, num_rel: usize) -> RoundRecord {
        RoundRecord::new(state, 1, 1, num_rel)
    }

    #[test]
    fn test_round_zero_line() {
        let mut printer = ProgressPrinter::new(Vec::new());
        let state = RunState::seeded(10, 3);
        printer.on_round_end("401", &record(&state, 12), &state, 12);

        let out = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(out, "Initial: 10 reviewed, 3 relevant out of 12 total\nAP: 0.0250\n");
    }

    #[test]
    fn test_step_line_and_stop() {
        let mut printer = ProgressPrinter::new(Vec::new());
        let state = RunState {
            step: 4,
            docs_reviewed: 14,
            rel_seen: 6,
            rel_seen_after_training: 3,
            zero_steps: 0,
            sum_prec: 2.0,
        };
        printer.on_round_end("401", &record(&state, 8), &state, 8);
        printer.on_stop("401", StopReason::MaxSteps, &state);

        let out = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(
            out,
            "401 Step 4: 14 reviewed, 6 relevant / 8 total, 0.7500 step set prec\n\
             AP: 0.2500\n\
             401 stopped after step 4: maximum steps\n"
        );
    }
}
