//! `ImportProgress` adapter drawing an `indicatif` bar on stderr.
//!
//! The bar hides itself when stderr is not a terminal.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::ObjectKind;
use crate::domain::ports::ImportProgress;

const BAR_TEMPLATE: &str = "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len}";

/// One progress bar per pass.
#[derive(Debug, Default)]
pub struct IndicatifProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgress {
    fn with_bar(&self, apply: impl FnOnce(&mut Option<ProgressBar>)) {
        if let Ok(mut bar) = self.bar.lock() {
            apply(&mut bar);
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("=> "))
}

impl ImportProgress for IndicatifProgress {
    fn start(&self, kind: ObjectKind, total: usize) {
        let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
        bar.set_style(bar_style());
        bar.set_message(format!("Importing {kind}s"));
        bar.enable_steady_tick(Duration::from_millis(100));
        self.with_bar(|slot| {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        });
    }

    fn advance(&self) {
        self.with_bar(|slot| {
            if let Some(bar) = slot.as_ref() {
                bar.inc(1);
            }
        });
    }

    fn finish(&self) {
        self.with_bar(|slot| {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        });
    }
}
