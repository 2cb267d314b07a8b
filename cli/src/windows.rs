use std::path::PathBuf;

use clap::Args;
use itertools::Itertools;
use regex::Regex;

use ttu::trace::windowmanager;
use ttu::trace::ExecTraceProcessor;
use ttu::Context;

#[derive(Args)]
pub struct Windows {
    /// The trace file to parse
    trace: PathBuf,

    /// Only show window titles matching the given regex
    #[arg(short = 'm', long)]
    matching: Option<String>,

    /// Only show windows that were visible at least once
    #[arg(short = 'V', long)]
    only_visible: bool,
}

impl Windows {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let filter = match &self.matching {
            Some(raw) => Some(Regex::new(raw)?),
            None => None,
        };

        let mut session = ExecTraceProcessor::new(ctx, &self.trace)?;
        let trace = windowmanager::parse_trace(&mut session)?;

        // (title, entries seen, entries visible)
        let mut seen: Vec<(String, usize, usize)> = Vec::new();
        for state in trace.entries() {
            for window in state.windows() {
                if let Some(re) = &filter {
                    if !re.is_match(&window.title) {
                        continue;
                    }
                }
                match seen.iter_mut().find(|(title, _, _)| title == &window.title) {
                    Some((_, count, visible)) => {
                        *count += 1;
                        if window.visible {
                            *visible += 1;
                        }
                    }
                    None => seen.push((
                        window.title.clone(),
                        1,
                        if window.visible { 1 } else { 0 },
                    )),
                }
            }
        }

        for (title, count, visible) in seen
            .iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        {
            if self.only_visible && *visible == 0 {
                continue;
            }
            println!("{} (seen {}, visible {})", title, count, visible);
        }

        Ok(())
    }
}
