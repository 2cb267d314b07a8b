use std::path::PathBuf;

use clap::Args;

use ttu::trace::transitions;
use ttu::trace::ExecTraceProcessor;
use ttu::Context;

#[derive(Args)]
pub struct Transitions {
    /// The trace file to parse
    trace: PathBuf,

    /// Only show transitions that were aborted
    #[arg(short = 'a', long)]
    only_aborted: bool,
}

impl Transitions {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let mut session = ExecTraceProcessor::new(ctx, &self.trace)?;
        let trace = transitions::parse_trace(&mut session)?;

        println!("{} transitions", trace.len());
        for t in trace.transitions() {
            if self.only_aborted && !t.is_aborted() {
                continue;
            }
            let status = if t.is_aborted() {
                "aborted"
            } else if t.is_merged() {
                "merged"
            } else if t.is_finished() {
                "finished"
            } else {
                "incomplete"
            };
            println!(
                "transition {} type {} {} (create: {} send: {} finish: {}) handler: {} changes: {}",
                t.id,
                t.transition_type,
                status,
                fmt_ts(t.create_time),
                fmt_ts(t.send_time),
                fmt_ts(t.finish_time),
                t.handler.as_deref().unwrap_or("-"),
                t.changes.len(),
            );
        }

        Ok(())
    }
}

fn fmt_ts(ts: Option<i64>) -> String {
    match ts {
        Some(v) => format!("{}ns", v),
        None => "unset".into(),
    }
}
