//! Terminal rendering of the progress events reported by the workflows.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use kinnet::engine::progress::{Progress, ProgressCallback};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::warn;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const COUNTER_TEMPLATE: &str = "{msg:<45} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})";

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

/// Owns the terminal while a command runs. Log lines and progress events
/// arrive on one channel so that they never interleave with a redraw.
pub struct ProgressDisplay {
    mp: MultiProgress,
    phase: Option<PhaseLine>,
    events: mpsc::Receiver<UiEvent>,
    shutdown: watch::Receiver<bool>,
}

/// The line of the running phase: a spinner until the phase reports how many
/// items it works through, a counter afterwards.
struct PhaseLine {
    bar: ProgressBar,
    name: &'static str,
    counting: bool,
}

impl PhaseLine {
    fn start(mp: &MultiProgress, name: &'static str) -> Self {
        let bar = mp.add(ProgressBar::new_spinner());
        bar.set_style(style(SPINNER_TEMPLATE).tick_strings(&[
            "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
        ]));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.set_message(name);
        Self {
            bar,
            name,
            counting: false,
        }
    }

    /// Exploration grows its work list as new wells turn up, so a second
    /// count only extends the bar.
    fn count(&mut self, total: u64) {
        if !self.counting {
            self.bar.disable_steady_tick();
            self.bar.set_style(style(COUNTER_TEMPLATE).progress_chars("━╸ "));
            self.bar.set_position(0);
            self.counting = true;
        }
        self.bar.set_length(total);
    }

    fn tally(&self, active: usize, succeeded: usize, failed: usize) {
        self.bar
            .set_message(tally_message(self.name, active, succeeded, failed));
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn tally_message(phase: &str, active: usize, succeeded: usize, failed: usize) -> String {
    format!("{phase} ({active} running, {succeeded} found, {failed} failed)")
}

impl ProgressDisplay {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, events) = mpsc::channel(1024);
        let (shutdown_sender, shutdown) = watch::channel(false);
        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let display = Self {
            mp,
            phase: None,
            events,
            shutdown,
        };
        (display, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.handle_event(event),
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
        if let Some(phase) = self.phase.take() {
            phase.bar.finish_and_clear();
        }
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(line) => {
                self.mp.println(line).ok();
            }
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                if let Some(previous) = self.phase.replace(PhaseLine::start(&self.mp, name)) {
                    previous.bar.finish_and_clear();
                }
            }
            Progress::PhaseFinish => {
                if let Some(phase) = self.phase.take() {
                    phase.bar.finish_and_clear();
                    self.mp.println(format!("✓ {}", phase.name)).ok();
                }
            }
            Progress::TaskStart { total_steps } => {
                if let Some(phase) = self.phase.as_mut() {
                    phase.count(total_steps);
                }
            }
            Progress::TaskIncrement => {
                if let Some(phase) = self.phase.as_ref() {
                    phase.bar.inc(1);
                }
            }
            Progress::TaskFinish => {
                if let Some(phase) = self.phase.as_mut() {
                    phase.bar.finish();
                    phase.counting = false;
                }
            }
            Progress::Tick {
                active,
                succeeded,
                failed,
            } => {
                if let Some(phase) = self.phase.as_ref() {
                    phase.tally(active, succeeded, failed);
                }
            }
            Progress::Message(text) => {
                self.mp.println(format!("  {text}")).ok();
            }
        }
    }
}

/// Forwards workflow progress into the display channel without blocking the
/// orchestration loop; a full channel drops the event.
#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            if let Err(e) = sender.try_send(UiEvent::Progress(progress)) {
                warn!("Dropped a progress update: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_display() -> ProgressDisplay {
        let (display, _, _) = ProgressDisplay::new();
        display.mp.set_draw_target(ProgressDrawTarget::hidden());
        display
    }

    fn send(display: &mut ProgressDisplay, progress: Progress) {
        display.handle_event(UiEvent::Progress(progress));
    }

    fn phase(display: &ProgressDisplay) -> &PhaseLine {
        display.phase.as_ref().unwrap()
    }

    #[test]
    fn phase_start_shows_the_phase_name() {
        let mut display = hidden_display();
        send(&mut display, Progress::PhaseStart { name: "Reaction search" });

        assert_eq!(phase(&display).bar.message(), "Reaction search");
        assert!(!phase(&display).counting);
    }

    #[test]
    fn a_new_phase_replaces_the_running_one() {
        let mut display = hidden_display();
        send(&mut display, Progress::PhaseStart { name: "Reactant" });
        let first = phase(&display).bar.clone();

        send(&mut display, Progress::PhaseStart { name: "Reaction search" });

        assert!(first.is_finished());
        assert_eq!(phase(&display).name, "Reaction search");
    }

    #[test]
    fn phase_finish_clears_the_line() {
        let mut display = hidden_display();
        send(&mut display, Progress::PhaseStart { name: "Selection" });
        send(&mut display, Progress::PhaseFinish);

        assert!(display.phase.is_none());
    }

    #[test]
    fn growing_work_list_extends_the_counter() {
        let mut display = hidden_display();
        send(&mut display, Progress::PhaseStart { name: "Surface exploration" });
        send(&mut display, Progress::TaskStart { total_steps: 2 });
        send(&mut display, Progress::TaskIncrement);

        send(&mut display, Progress::TaskStart { total_steps: 5 });

        let bar = &phase(&display).bar;
        assert_eq!(bar.length(), Some(5));
        assert_eq!(bar.position(), 1);
    }

    #[test]
    fn task_finish_completes_the_counter() {
        let mut display = hidden_display();
        send(&mut display, Progress::PhaseStart { name: "Reaction pipeline" });
        send(&mut display, Progress::TaskStart { total_steps: 100 });

        send(&mut display, Progress::TaskFinish);

        assert!(phase(&display).bar.is_finished());
        assert!(!phase(&display).counting);
    }

    #[test]
    fn tick_reports_instance_counts() {
        let mut display = hidden_display();
        send(&mut display, Progress::PhaseStart { name: "Reaction pipeline" });

        send(
            &mut display,
            Progress::Tick {
                active: 4,
                succeeded: 2,
                failed: 1,
            },
        );

        assert_eq!(
            phase(&display).bar.message(),
            "Reaction pipeline (4 running, 2 found, 1 failed)"
        );
    }

    #[test]
    fn events_without_a_phase_are_ignored() {
        let mut display = hidden_display();
        send(&mut display, Progress::TaskIncrement);
        send(&mut display, Progress::PhaseFinish);
        display.handle_event(UiEvent::Log("well 1234 done".to_string()));

        assert!(display.phase.is_none());
    }

    #[tokio::test]
    async fn handler_forwards_progress_to_the_channel() {
        let (sender, mut receiver) = mpsc::channel(1);
        let callback = CliProgressHandler::new(sender).get_callback();

        callback(Progress::PhaseStart { name: "Selection" });

        let event = receiver.recv().await.unwrap();
        let UiEvent::Progress(Progress::PhaseStart { name }) = event else {
            panic!("expected a phase start, got {event:?}");
        };
        assert_eq!(name, "Selection");
    }

    #[tokio::test]
    async fn display_drains_pending_events_on_shutdown() {
        let (display, sender, shutdown) = ProgressDisplay::new();
        display.mp.set_draw_target(ProgressDrawTarget::hidden());
        sender
            .send(UiEvent::Progress(Progress::PhaseStart { name: "Network" }))
            .await
            .unwrap();
        shutdown.send(true).unwrap();

        display.run().await;
    }
}
