//! Exercise session window: egui/eframe application.
//!
//! # Architecture
//!
//! [`CoachApp`] is the top-level [`eframe::App`].  Every `update` call is one
//! display tick:
//!
//! 1. drain hotkey events, completed feedback and the completion result;
//! 2. tick the [`CaptureLoop`] (live surface) and the [`AnimationPlayer`]
//!    (reference surface), passing the egui context as their scheduler;
//! 3. lay out the two surfaces, the feedback panel and any dialog.
//!
//! # Session phases
//!
//! | Phase        | Visual                                                 |
//! |--------------|--------------------------------------------------------|
//! | `Live`       | Live + reference skeletons, feedback panel             |
//! | `Finishing`  | Finish dialog: sets, reps, pain slider                 |
//! | `Submitting` | Dialog disabled with spinner while the report is sent  |
//! | `Done`       | Summary; capture and playback torn down                |

use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use crate::api::{AnalysisClient, ApiError, ExerciseInfo, FeedbackResult};
use crate::config::AppConfig;
use crate::hotkey::HotkeyEvent;
use crate::pipeline::{AnimationPlayer, CaptureLoop, FeedbackState, PauseSwitch};
use crate::render::{paint_display_list, DisplayList};
use crate::session::{SessionTracker, MAX_PAIN_LEVEL};

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the user is in the session, as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Live,
    Finishing,
    Submitting,
    Done,
}

// ---------------------------------------------------------------------------
// FinishForm
// ---------------------------------------------------------------------------

/// Values edited in the finish dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishForm {
    pub sets: u32,
    pub reps: u32,
    pub pain_level: u8,
}

impl FinishForm {
    /// Counted sets/reps, or the exercise targets when nothing was counted.
    pub fn prefill(tracker: &SessionTracker) -> Self {
        let (target_sets, target_reps) = tracker.targets();
        let counted = tracker.completed_sets() > 0 || tracker.completed_reps() > 0;
        let (sets, reps) = if counted {
            (tracker.completed_sets(), tracker.completed_reps())
        } else {
            (target_sets, target_reps)
        };
        Self {
            sets,
            reps,
            pain_level: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppParts
// ---------------------------------------------------------------------------

/// Everything `main` assembles before the window opens.
pub struct AppParts {
    pub config: AppConfig,
    pub exercise: ExerciseInfo,
    pub runtime: Handle,
    pub client: Arc<dyn AnalysisClient>,
    pub pause: PauseSwitch,
    /// Running capture loop, or the user-facing reason live analysis is off.
    pub capture: Result<CaptureLoop, String>,
    pub player: AnimationPlayer,
    pub feedback: FeedbackState,
    pub hotkey_rx: mpsc::Receiver<HotkeyEvent>,
}

// ---------------------------------------------------------------------------
// CoachApp
// ---------------------------------------------------------------------------

/// eframe application: the exercise session window.
pub struct CoachApp {
    config: AppConfig,
    exercise: ExerciseInfo,
    runtime: Handle,
    client: Arc<dyn AnalysisClient>,

    // ── Session loops ────────────────────────────────────────────────────
    pause: PauseSwitch,
    capture: Option<CaptureLoop>,
    capture_error: Option<String>,
    player: AnimationPlayer,
    live_surface: DisplayList,
    reference_surface: DisplayList,

    // ── Feedback / session ───────────────────────────────────────────────
    feedback: FeedbackState,
    tracker: SessionTracker,
    phase: SessionPhase,
    form: FinishForm,
    paused_before_dialog: bool,
    completion_rx: Option<oneshot::Receiver<Result<(), ApiError>>>,
    completion_error: Option<String>,

    hotkey_rx: mpsc::Receiver<HotkeyEvent>,
}

impl CoachApp {
    /// Create the app and start reference playback on `ctx`.
    pub fn new(parts: AppParts, ctx: &egui::Context) -> Self {
        let now = Instant::now();
        let (width, height) = (parts.config.capture.width as f32, parts.config.capture.height as f32);

        let (capture, capture_error) = match parts.capture {
            Ok(capture) => (Some(capture), None),
            Err(message) => (None, Some(message)),
        };

        let mut player = parts.player;
        player.start(now, ctx);

        let tracker = SessionTracker::new(&parts.exercise, now);
        let form = FinishForm::prefill(&tracker);

        Self {
            config: parts.config,
            exercise: parts.exercise,
            runtime: parts.runtime,
            client: parts.client,
            pause: parts.pause,
            capture,
            capture_error,
            player,
            live_surface: DisplayList::new(width, height),
            reference_surface: DisplayList::new(width, height),
            feedback: parts.feedback,
            tracker,
            phase: SessionPhase::Live,
            form,
            paused_before_dialog: false,
            completion_rx: None,
            completion_error: None,
            hotkey_rx: parts.hotkey_rx,
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending hotkey events (non-blocking).
    fn poll_hotkeys(&mut self) {
        while let Ok(event) = self.hotkey_rx.try_recv() {
            match event {
                HotkeyEvent::TogglePause => {
                    if self.phase == SessionPhase::Live {
                        self.pause.toggle();
                    }
                }
                HotkeyEvent::FinishSession => self.open_finish_dialog(),
            }
        }
    }

    fn poll_feedback(&mut self) {
        for result in self.feedback.poll() {
            self.tracker.record(&result);
        }
    }

    fn poll_completion(&mut self) {
        let Some(rx) = self.completion_rx.as_mut() else {
            return;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(ApiError::Request("completion task ended unexpectedly".into()))
            }
        };
        self.completion_rx = None;

        match outcome {
            Ok(()) => {
                log::info!("session: completion accepted");
                self.tracker.mark_completed();
                self.phase = SessionPhase::Done;
                self.shutdown();
            }
            Err(e) => {
                log::warn!("session: completion failed: {e}");
                self.completion_error = Some(format!("Could not save the session: {e}"));
                self.phase = SessionPhase::Finishing;
            }
        }
    }

    // ── Session actions ──────────────────────────────────────────────────

    fn open_finish_dialog(&mut self) {
        if self.phase != SessionPhase::Live {
            return;
        }
        self.paused_before_dialog = self.pause.is_paused();
        self.pause.set_paused(true);
        self.form = FinishForm::prefill(&self.tracker);
        self.completion_error = None;
        self.phase = SessionPhase::Finishing;
    }

    fn cancel_finish_dialog(&mut self) {
        self.pause.set_paused(self.paused_before_dialog);
        self.phase = SessionPhase::Live;
    }

    fn submit_completion(&mut self) {
        self.tracker.set_counts(self.form.sets, self.form.reps);
        let request = match self.tracker.completion_request(self.form.pain_level, Instant::now()) {
            Ok(request) => request,
            Err(e) => {
                self.completion_error = Some(e.to_string());
                return;
            }
        };

        let (tx, rx) = oneshot::channel();
        let client = Arc::clone(&self.client);
        let exercise_id = self.config.analysis.exercise_id.clone();
        self.runtime.spawn(async move {
            let _ = tx.send(client.complete_session(&exercise_id, &request).await);
        });

        self.completion_rx = Some(rx);
        self.completion_error = None;
        self.phase = SessionPhase::Submitting;
    }

    /// Stop both loops and release the camera and the engine.
    fn shutdown(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            capture.stop();
        }
        self.player.stop();
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_toolbar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            ui.heading(&self.exercise.name);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let live = self.phase == SessionPhase::Live;
                if self.phase == SessionPhase::Done {
                    if ui.button("Close").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                    return;
                }
                let finish = format!("Finish ({})", self.config.hotkey.finish_key);
                if ui.add_enabled(live, egui::Button::new(finish)).clicked() {
                    self.open_finish_dialog();
                }
                let label = if self.pause.is_paused() { "Resume" } else { "Pause" };
                let pause = format!("{label} ({})", self.config.hotkey.pause_key);
                if ui.add_enabled(live, egui::Button::new(pause)).clicked() {
                    self.pause.toggle();
                }
            });
        });
    }

    fn draw_surfaces(&mut self, ui: &mut egui::Ui) {
        let aspect = self.config.capture.height as f32 / self.config.capture.width.max(1) as f32;

        ui.columns(2, |cols| {
            cols[0].label("You");
            let size = egui::vec2(cols[0].available_width(), cols[0].available_width() * aspect);
            let (rect, _) = cols[0].allocate_exact_size(size, egui::Sense::hover());
            self.live_surface.set_size(rect.width(), rect.height());
            paint_display_list(cols[0].painter(), rect, &self.live_surface);
            if let Some(message) = &self.capture_error {
                cols[0].painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    message,
                    egui::FontId::proportional(15.0),
                    egui::Color32::from_rgb(255, 136, 68),
                );
            }

            cols[1].label("Reference");
            let size = egui::vec2(cols[1].available_width(), cols[1].available_width() * aspect);
            let (rect, _) = cols[1].allocate_exact_size(size, egui::Sense::hover());
            self.reference_surface.set_size(rect.width(), rect.height());
            paint_display_list(cols[1].painter(), rect, &self.reference_surface);
            if self.player.is_empty() {
                cols[1].painter().text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "No reference animation",
                    egui::FontId::proportional(15.0),
                    egui::Color32::GRAY,
                );
            }
        });
    }

    fn draw_feedback(&mut self, ui: &mut egui::Ui) {
        ui.heading("Feedback");
        ui.add_space(4.0);

        match self.feedback.latest() {
            Some(result) => draw_result(ui, result, self.config.ui.show_angle_errors),
            None => {
                ui.label(egui::RichText::new("Waiting for the first analysis…").color(egui::Color32::GRAY));
            }
        }

        ui.separator();
        ui.heading("Session");
        egui::Grid::new("session-stats").num_columns(2).show(ui, |ui| {
            ui.label("Average score");
            ui.label(
                self.tracker
                    .average_score()
                    .map_or_else(|| "—".to_string(), |s| s.to_string()),
            );
            ui.end_row();

            ui.label("Sets");
            ui.label(self.tracker.completed_sets().to_string());
            ui.end_row();

            ui.label("Reps");
            ui.label(self.tracker.completed_reps().to_string());
            ui.end_row();

            let minutes = self.tracker.elapsed(Instant::now()).as_secs() / 60;
            ui.label("Elapsed");
            ui.label(format!("{minutes} min"));
            ui.end_row();
        });

        if self.phase == SessionPhase::Live {
            ui.horizontal(|ui| {
                if ui.button("+1 rep").clicked() {
                    self.tracker.add_rep();
                }
                if ui.button("Set done").clicked() {
                    self.tracker.finish_set();
                }
            });
        }

        if let Some(capture) = &self.capture {
            let stats = capture.stats();
            ui.separator();
            ui.label(
                egui::RichText::new(format!(
                    "{} · {} frames · {} requests{}",
                    if self.pause.is_paused() { "Paused" } else { capture.state().label() },
                    stats.submitted,
                    stats.emitted,
                    stats
                        .last_latency
                        .map(|d| format!(" · {} ms", d.as_millis()))
                        .unwrap_or_default()
                ))
                .small()
                .color(egui::Color32::GRAY),
            );
        }
    }

    fn draw_finish_dialog(&mut self, ctx: &egui::Context) {
        let submitting = self.phase == SessionPhase::Submitting;
        let mut submit = false;
        let mut cancel = false;

        egui::Window::new("Finish session")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.add_enabled_ui(!submitting, |ui| {
                    egui::Grid::new("finish-form").num_columns(2).show(ui, |ui| {
                        ui.label("Completed sets");
                        ui.add(egui::DragValue::new(&mut self.form.sets).range(0..=99));
                        ui.end_row();

                        ui.label("Completed reps");
                        ui.add(egui::DragValue::new(&mut self.form.reps).range(0..=999));
                        ui.end_row();

                        ui.label("Pain level");
                        ui.add(egui::Slider::new(&mut self.form.pain_level, 0..=MAX_PAIN_LEVEL));
                        ui.end_row();
                    });
                });

                if let Some(error) = &self.completion_error {
                    ui.colored_label(egui::Color32::from_rgb(255, 136, 68), error);
                }

                ui.horizontal(|ui| {
                    if submitting {
                        ui.spinner();
                        ui.label("Saving…");
                    } else {
                        let label = if self.completion_error.is_some() { "Retry" } else { "Submit" };
                        submit = ui.button(label).clicked();
                        cancel = ui.button("Back to exercise").clicked();
                    }
                });
            });

        if submit {
            self.submit_completion();
        } else if cancel {
            self.cancel_finish_dialog();
        }
    }

    fn draw_summary(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("Session saved");
            ui.add_space(8.0);
            ui.label(format!(
                "{} sets · {} reps · average score {}",
                self.tracker.completed_sets(),
                self.tracker.completed_reps(),
                self.tracker
                    .average_score()
                    .map_or_else(|| "—".to_string(), |s| s.to_string()),
            ));
        });
    }
}

/// Colour for a 0–100 score.
pub fn score_color(score: u8) -> egui::Color32 {
    match score {
        80..=u8::MAX => egui::Color32::from_rgb(80, 200, 120),
        50..=79 => egui::Color32::from_rgb(240, 190, 60),
        _ => egui::Color32::from_rgb(255, 90, 90),
    }
}

fn draw_result(ui: &mut egui::Ui, result: &FeedbackResult, show_angles: bool) {
    ui.label(
        egui::RichText::new(format!("{}", result.score))
            .size(40.0)
            .strong()
            .color(score_color(result.score)),
    );
    if result.is_correct {
        ui.colored_label(egui::Color32::from_rgb(80, 200, 120), "Correct form");
    } else {
        ui.label("Adjust your form");
    }
    if result.critical_error {
        ui.colored_label(egui::Color32::from_rgb(255, 90, 90), "⚠ Stop and check your posture");
    }
    if let Some(text) = &result.feedback {
        ui.add_space(4.0);
        ui.label(egui::RichText::new(text).size(15.0));
    }

    if show_angles && !result.angle_errors.is_empty() {
        ui.add_space(6.0);
        egui::Grid::new("angle-errors").striped(true).num_columns(3).show(ui, |ui| {
            for (joint, err) in result.worst_joints() {
                ui.label(joint.replace('_', " "));
                ui.label(format!("{:.0}° / {:.0}°", err.current, err.target));
                ui.label(format!("{:+.0}°", err.diff));
                ui.end_row();
            }
        });
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for CoachApp {
    /// Called every display refresh: poll channels, tick both loops, render.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll non-blocking channels ------------------------------------
        self.poll_hotkeys();
        self.poll_feedback();
        self.poll_completion();

        // --- Tick the session loops ----------------------------------------
        let now = Instant::now();
        if let Some(capture) = self.capture.as_mut() {
            if !capture.tick(now, &mut self.live_surface, ctx) && self.capture_error.is_none() {
                self.capture_error = capture.fault().map(ToString::to_string);
            }
        }
        self.player.tick(now, &mut self.reference_surface, ctx);

        if self.phase == SessionPhase::Submitting {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        // --- Layout --------------------------------------------------------
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.draw_toolbar(ui, ctx));

        if self.phase == SessionPhase::Done {
            egui::CentralPanel::default().show(ctx, |ui| self.draw_summary(ui));
            return;
        }

        egui::SidePanel::right("feedback")
            .min_width(260.0)
            .show(ctx, |ui| self.draw_feedback(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_surfaces(ui));

        if matches!(self.phase, SessionPhase::Finishing | SessionPhase::Submitting) {
            self.draw_finish_dialog(ctx);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown();
        log::info!("session window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(target_sets: u32, target_reps: u32) -> SessionTracker {
        let mut exercise = ExerciseInfo::offline("1");
        exercise.target_sets = target_sets;
        exercise.target_reps = target_reps;
        SessionTracker::new(&exercise, Instant::now())
    }

    #[test]
    fn form_prefills_targets_when_nothing_counted() {
        let form = FinishForm::prefill(&tracker(3, 10));
        assert_eq!(
            form,
            FinishForm {
                sets: 3,
                reps: 10,
                pain_level: 0
            }
        );
    }

    #[test]
    fn form_prefills_counted_values() {
        let mut tracker = tracker(3, 10);
        tracker.finish_set();
        tracker.add_rep();
        let form = FinishForm::prefill(&tracker);
        assert_eq!((form.sets, form.reps), (1, 1));
    }

    #[test]
    fn score_colours_by_band() {
        assert_eq!(score_color(100), score_color(80));
        assert_ne!(score_color(79), score_color(80));
        assert_eq!(score_color(0), score_color(49));
    }
}
