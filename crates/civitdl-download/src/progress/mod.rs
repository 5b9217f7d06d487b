//! Terminal progress for a download run.
//!
//! One byte-based bar covers the whole run. Per-job result lines are
//! printed above it so they do not tear the bar.

mod throttle;

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};

pub use throttle::ProgressThrottle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Render {
    Fancy,
    Plain,
    Quiet,
}

/// Shared progress display; clones draw to the same bar.
#[derive(Clone)]
pub struct RunProgress {
    bar: ProgressBar,
    render: Render,
}

impl RunProgress {
    /// Bar sized to `total_bytes`, drawn only when stdout is a terminal.
    pub fn new(total_bytes: u64) -> Self {
        if std::io::stdout().is_terminal() {
            let bar = ProgressBar::with_draw_target(Some(total_bytes), ProgressDrawTarget::stdout());
            bar.set_style(Self::bar_style());
            bar.enable_steady_tick(Duration::from_millis(120));
            Self {
                bar,
                render: Render::Fancy,
            }
        } else {
            Self {
                bar: ProgressBar::hidden(),
                render: Render::Plain,
            }
        }
    }

    /// No bar and no lines.
    pub fn quiet() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            render: Render::Quiet,
        }
    }

    pub fn add_bytes(&self, bytes: u64) {
        if bytes > 0 {
            self.bar.inc(bytes);
        }
    }

    /// Print a line without tearing the bar.
    pub fn println(&self, line: impl AsRef<str>) {
        match self.render {
            Render::Fancy => self.bar.println(line.as_ref()),
            Render::Plain => println!("{}", line.as_ref()),
            Render::Quiet => {}
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner} {bar:28.cyan/blue} {human_bytes:>9} / {human_total:>9} @ {binary_bytes_per_sec} ETA {eta}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("human_bytes", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{}", HumanBytes(state.pos()));
        })
        .with_key("human_total", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let value = state
                .len()
                .map_or_else(|| "?".to_string(), |len| HumanBytes(len).to_string());
            let _ = write!(w, "{value}");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_progress_counts_bytes() {
        let progress = RunProgress::quiet();
        progress.add_bytes(10);
        progress.clone().add_bytes(5);
        assert_eq!(progress.bar.position(), 15);
        progress.println("not shown");
        progress.finish();
    }
}
