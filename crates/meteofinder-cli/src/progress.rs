use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use meteofinder_core::pipeline::{PipelineStage, ProgressReporter};

/// Drives one indicatif bar per pipeline stage.
pub struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        self.with_bar(|slot| {
            if let Some(old) = slot.take() {
                old.finish_and_clear();
            }
            let pb = match total_items {
                Some(total) => {
                    let pb = ProgressBar::new(total as u64);
                    if let Ok(style) = ProgressStyle::default_bar()
                        .template("{msg:22} [{bar:40}] {pos}/{len}")
                    {
                        pb.set_style(style.progress_chars("=> "));
                    }
                    pb
                }
                None => ProgressBar::new_spinner(),
            };
            pb.set_message(stage.to_string());
            *slot = Some(pb);
        });
    }

    fn advance(&self, items_done: usize) {
        self.with_bar(|slot| {
            if let Some(pb) = slot {
                pb.inc(items_done as u64);
            }
        });
    }

    fn finish_stage(&self) {
        self.with_bar(|slot| {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        });
    }
}
