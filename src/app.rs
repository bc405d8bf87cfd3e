//! Presentation shell — egui/eframe application.
//!
//! [`DescribeloApp`] is a thin rendering layer over the session core: every
//! frame it reads the [`SharedSession`] snapshot and draws the view for the
//! current [`Phase`], and every user action is forwarded as a [`UserIntent`]
//! over an mpsc channel. No session logic lives here — the shell never
//! decides transitions, it only refrains from offering controls whose
//! intents are unreachable in the current phase (and greys the text editor
//! while a transcript merge is pending).
//!
//! | Phase | View |
//! |-------|------|
//! | `SelectingTopic` | topic cards |
//! | `GeneratingImage` | spinner |
//! | `Describing` | image summary + vocabulary + editor + record/submit |
//! | `Analyzing` | spinner |
//! | `ShowingFeedback` | score, breakdown bars, corrections, vocabulary |

use eframe::egui;
use tokio::sync::mpsc;

use crate::services::FeedbackResult;
use crate::session::{CaptureState, Phase, SharedSession, UserIntent};
use crate::topics;

// ---------------------------------------------------------------------------
// DescribeloApp
// ---------------------------------------------------------------------------

/// eframe application — renders the session and emits intents.
pub struct DescribeloApp {
    /// Shared session state, mutated only by the orchestrator.
    session: SharedSession,
    /// Intent channel into the orchestrator.
    intents_tx: mpsc::Sender<UserIntent>,
    /// Local editing buffer for the description text field.
    draft: String,
    /// Last observed session buffer epoch; when the epoch moves (transcript
    /// merge, retry, reset), the draft reloads from the session instead of
    /// clobbering it.
    seen_epoch: u64,
}

impl DescribeloApp {
    /// Create a new shell over `session`, sending intents into `intents_tx`.
    pub fn new(session: SharedSession, intents_tx: mpsc::Sender<UserIntent>) -> Self {
        Self {
            session,
            intents_tx,
            draft: String::new(),
            seen_epoch: 0,
        }
    }

    fn send(&self, intent: UserIntent) {
        // try_send: the orchestrator drains quickly and a dropped intent on
        // a saturated channel is preferable to blocking the UI thread.
        if let Err(e) = self.intents_tx.try_send(intent) {
            log::warn!("intent dropped: {e}");
        }
    }

    /// Adopt orchestrator-side description changes without clobbering live
    /// typing.
    ///
    /// The session bumps its buffer epoch only when it rewrites the buffer
    /// itself (merge, retry, reset) — echoes of our own `EditDescription`
    /// intents do not move it, so a slow echo can never overwrite newer
    /// keystrokes.
    fn sync_draft(&mut self, epoch: u64, session_description: &str) {
        if epoch != self.seen_epoch {
            self.draft = session_description.to_string();
            self.seen_epoch = epoch;
        }
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_error_banner(&self, ui: &mut egui::Ui, error: &str) {
        ui.label(
            egui::RichText::new(error)
                .color(egui::Color32::from_rgb(255, 136, 68))
                .size(13.0),
        );
        ui.separator();
    }

    fn draw_topic_selection(&self, ui: &mut egui::Ui) {
        ui.heading("Elige un tema");
        ui.add_space(6.0);

        for topic in topics::CATALOG {
            let label = format!("{}  {}", topic.symbol, topic.title);
            let card = ui.add_sized(
                [ui.available_width(), 40.0],
                egui::Button::new(egui::RichText::new(label).size(15.0)),
            );
            if card.on_hover_text(topic.description).clicked() {
                self.send(UserIntent::SelectTopic(topic.id.to_string()));
            }
            ui.add_space(2.0);
        }
    }

    fn draw_generating(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.spinner();
            ui.add_space(6.0);
            ui.label("Generando imagen…");
        });
    }

    fn draw_describing(&mut self, ui: &mut egui::Ui) {
        let (image_summary, vocabulary, capture, can_submit) = {
            let session = self.session.lock().unwrap();
            let summary = session
                .image
                .as_ref()
                .and_then(|img| img.decode())
                .map(|bytes| format!("Imagen lista ({} KB)", bytes.len() / 1024))
                .unwrap_or_else(|| "Imagen lista".to_string());
            let vocab = session.topic.map(|t| t.vocabulary).unwrap_or(&[]);
            (summary, vocab, session.capture, session.can_submit())
        };

        ui.label(egui::RichText::new(image_summary).weak());
        ui.add_space(4.0);

        if !vocabulary.is_empty() {
            ui.label(egui::RichText::new("Vocabulario sugerido:").size(12.0));
            ui.horizontal_wrapped(|ui| {
                for term in vocabulary {
                    ui.label(
                        egui::RichText::new(*term)
                            .size(12.0)
                            .color(egui::Color32::from_rgb(120, 170, 255)),
                    );
                }
            });
            ui.add_space(6.0);
        }

        // Editor — disabled while a transcript merge is pending so the two
        // description writers stay temporally disjoint.
        let editable = capture != CaptureState::Transcribing;
        let response = ui.add_enabled(
            editable,
            egui::TextEdit::multiline(&mut self.draft)
                .desired_rows(6)
                .desired_width(ui.available_width())
                .hint_text("Describe lo que ves en la imagen…"),
        );
        if response.changed() {
            self.send(UserIntent::EditDescription(self.draft.clone()));
        }

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            let record_label = match capture {
                CaptureState::Idle => "● Dictar",
                CaptureState::Recording => "■ Detener",
                CaptureState::Transcribing => "… Transcribiendo",
            };
            if ui
                .add_enabled(
                    capture != CaptureState::Transcribing,
                    egui::Button::new(record_label),
                )
                .clicked()
            {
                self.send(UserIntent::ToggleRecording);
            }

            if ui
                .add_enabled(can_submit, egui::Button::new("Enviar"))
                .clicked()
            {
                self.send(UserIntent::Submit);
            }

            if ui
                .add_enabled(capture == CaptureState::Idle, egui::Button::new("Otra imagen"))
                .clicked()
            {
                self.send(UserIntent::RequestNewImage);
            }

            if ui.button("Cambiar tema").clicked() {
                self.send(UserIntent::Reset);
            }
        });
    }

    fn draw_analyzing(&self, ui: &mut egui::Ui) {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.spinner();
            ui.add_space(6.0);
            ui.label("Evaluando tu descripción…");
        });
    }

    fn draw_feedback(&self, ui: &mut egui::Ui, feedback: &FeedbackResult) {
        ui.heading(format!("Puntuación: {:.1} / 10", feedback.score));
        self.draw_score_bar(ui, feedback.score);
        ui.add_space(6.0);

        if let Some(breakdown) = &feedback.breakdown {
            for (label, value) in [
                ("Gramática", breakdown.grammar),
                ("Vocabulario", breakdown.vocabulary),
                ("Coherencia", breakdown.coherence),
            ] {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(format!("{label}: {value:.0}")).size(12.0));
                });
                self.draw_score_bar(ui, value);
            }
            ui.add_space(6.0);
        }

        if !feedback.advice.is_empty() {
            ui.label(&feedback.advice);
            ui.add_space(6.0);
        }

        if !feedback.corrections.is_empty() {
            ui.label(egui::RichText::new("Correcciones:").strong());
            for correction in &feedback.corrections {
                ui.label(format!(
                    "• \u{201c}{}\u{201d} → \u{201c}{}\u{201d} — {}",
                    correction.error, correction.correction, correction.explanation
                ));
            }
            ui.add_space(6.0);
        }

        if !feedback.suggested_vocabulary.is_empty() {
            ui.label(egui::RichText::new("Vocabulario recomendado:").strong());
            ui.horizontal_wrapped(|ui| {
                for term in &feedback.suggested_vocabulary {
                    ui.label(
                        egui::RichText::new(term)
                            .size(12.0)
                            .color(egui::Color32::from_rgb(120, 170, 255)),
                    );
                }
            });
            ui.add_space(6.0);
        }

        if !feedback.coherence_note.is_empty() {
            ui.label(egui::RichText::new(&feedback.coherence_note).italics());
            ui.add_space(6.0);
        }

        ui.horizontal(|ui| {
            if ui.button("Describir de nuevo").clicked() {
                self.send(UserIntent::RetrySameImage);
            }
            if ui.button("Cambiar tema").clicked() {
                self.send(UserIntent::Reset);
            }
        });
    }

    /// Horizontal 0–10 bar painted as plain rects.
    fn draw_score_bar(&self, ui: &mut egui::Ui, value: f32) {
        let (rect, _) =
            ui.allocate_exact_size(egui::vec2(ui.available_width(), 8.0), egui::Sense::hover());
        let painter = ui.painter();
        painter.rect_filled(rect, 2.0, egui::Color32::from_rgb(50, 50, 50));

        let frac = (value / 10.0).clamp(0.0, 1.0);
        let fill = egui::Rect::from_min_size(
            rect.min,
            egui::vec2(rect.width() * frac, rect.height()),
        );
        let color = if value >= 7.0 {
            egui::Color32::from_rgb(80, 200, 120)
        } else if value >= 4.0 {
            egui::Color32::from_rgb(230, 190, 80)
        } else {
            egui::Color32::from_rgb(230, 110, 80)
        };
        painter.rect_filled(fill, 2.0, color);
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for DescribeloApp {
    /// Called every frame by eframe: snapshot the session, then render the
    /// view for its phase.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (phase, capture, error, feedback, epoch, description) = {
            let session = self.session.lock().unwrap();
            (
                session.phase,
                session.capture,
                session.error.clone(),
                session.feedback.clone(),
                session.buffer_epoch(),
                session.description.clone(),
            )
        };

        self.sync_draft(epoch, &description);

        // Keep polling while something is pending off-screen.
        if phase.is_busy() || capture != CaptureState::Idle {
            ctx.request_repaint_after(std::time::Duration::from_millis(66));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(error) = &error {
                self.draw_error_banner(ui, error);
            }

            match phase {
                Phase::SelectingTopic => self.draw_topic_selection(ui),
                Phase::GeneratingImage => self.draw_generating(ui),
                Phase::Describing => self.draw_describing(ui),
                Phase::Analyzing => self.draw_analyzing(ui),
                Phase::ShowingFeedback => {
                    if let Some(feedback) = &feedback {
                        self.draw_feedback(ui, feedback);
                    }
                }
            }
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("describelo closing");
    }
}
