use std::path::PathBuf;

use clap::Args;

use ttu::trace::windowmanager::{self, WindowContainer};
use ttu::trace::{layers, ExecTraceProcessor};
use ttu::Context;

#[derive(Args)]
pub struct Dump {
    /// The trace file to parse
    trace: PathBuf,

    /// Print the full window hierarchy for every entry
    #[arg(short = 't', long)]
    tree: bool,

    /// Also dump the surface flinger snapshots
    #[arg(short = 'L', long)]
    layers: bool,
}

impl Dump {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let mut session = ExecTraceProcessor::new(ctx, &self.trace)?;
        let trace = windowmanager::parse_trace(&mut session)?;

        println!("{} window manager entries", trace.len());
        for state in trace.entries() {
            println!(
                "[{}ns] focused app: {} focused window: {} windows: {} keyguard: {}",
                state.elapsed_timestamp_nanos,
                or_dash(&state.focused_app),
                or_dash(&state.focused_window),
                state.windows().len(),
                if state.is_keyguard_showing() {
                    "showing"
                } else {
                    "hidden"
                },
            );
            if self.tree {
                print_container(&state.root, 1);
            }
        }

        if self.layers {
            // one session per parse, never shared
            let mut session = ExecTraceProcessor::new(ctx, &self.trace)?;
            let layers_trace = layers::parse_trace(&mut session)?;
            println!("{} surface flinger snapshots", layers_trace.len());
            for entry in layers_trace.entries() {
                println!(
                    "[{}ns] layers: {} visible: {}",
                    entry.elapsed_timestamp_nanos,
                    entry.layers().len(),
                    entry.visible_layers().len(),
                );
            }
        }

        Ok(())
    }
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}

fn print_container(container: &WindowContainer, depth: usize) {
    let marker = if container.visible { "*" } else { " " };
    println!(
        "{}{} {} {}",
        "  ".repeat(depth),
        marker,
        container.kind.name(),
        or_dash(&container.title),
    );
    for child in &container.children {
        print_container(child, depth + 1);
    }
}
