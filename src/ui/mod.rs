use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui::{
    self, Align, Color32, CornerRadius, FontData, FontDefinitions, FontFamily, Frame, Layout,
    Margin, RichText, Stroke, Vec2, epaint::Shadow,
};
use log::{debug, error, info, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use crate::engine::ManagerEngine;
use crate::engine::model::AppModel;
use crate::engine::models::{AppRecord, ConversionMode};
use crate::engine::state::{
    AppListKind, Effect, EngineEvent, Msg, Tab, Toast, ToastLevel, UserAction, View,
};
use crate::i18n::{I18n, Language, Message, SUPPORTED_LANGUAGES};

const TOAST_LIFETIME: Duration = Duration::from_secs(3);
const BUSY_REPAINT: Duration = Duration::from_millis(100);
const CJK_FONT_ID: &str = "cjk_fallback";
const CJK_FONT_CANDIDATES: [&str; 6] = [
    "/system/fonts/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "C:\\Windows\\Fonts\\msyh.ttc",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThemePalette {
    bg: Color32,
    panel: Color32,
    surface: Color32,
    surface_elev: Color32,
    sunken_surface: Color32,
    border: Color32,
    border_strong: Color32,
    text_primary: Color32,
    text_muted: Color32,
    accent: Color32,
    accent_soft: Color32,
    accent_glow: Color32,
    info: Color32,
    warning: Color32,
    danger: Color32,
    success: Color32,
}

impl ThemePalette {
    const fn dark() -> Self {
        Self {
            bg: Color32::from_rgb(11, 14, 19),
            panel: Color32::from_rgb(17, 22, 29),
            surface: Color32::from_rgb(24, 31, 39),
            surface_elev: Color32::from_rgb(29, 37, 47),
            sunken_surface: Color32::from_rgb(14, 18, 24),
            border: Color32::from_rgb(45, 57, 72),
            border_strong: Color32::from_rgb(63, 79, 97),
            text_primary: Color32::from_rgb(228, 235, 244),
            text_muted: Color32::from_rgb(167, 182, 197),
            accent: Color32::from_rgb(92, 219, 195),
            accent_soft: Color32::from_rgb(63, 140, 125),
            accent_glow: Color32::from_rgb(151, 239, 217),
            info: Color32::from_rgb(122, 186, 255),
            warning: Color32::from_rgb(246, 195, 111),
            danger: Color32::from_rgb(239, 117, 117),
            success: Color32::from_rgb(120, 214, 140),
        }
    }

    const fn light() -> Self {
        Self {
            bg: Color32::from_rgb(240, 245, 252),
            panel: Color32::from_rgb(226, 234, 243),
            surface: Color32::from_rgb(245, 249, 255),
            surface_elev: Color32::from_rgb(255, 255, 255),
            sunken_surface: Color32::from_rgb(217, 225, 236),
            border: Color32::from_rgb(195, 205, 221),
            border_strong: Color32::from_rgb(172, 186, 206),
            text_primary: Color32::from_rgb(28, 38, 52),
            text_muted: Color32::from_rgb(80, 99, 121),
            accent: Color32::from_rgb(27, 170, 152),
            accent_soft: Color32::from_rgb(152, 223, 212),
            accent_glow: Color32::from_rgb(16, 190, 173),
            info: Color32::from_rgb(64, 120, 212),
            warning: Color32::from_rgb(235, 164, 70),
            danger: Color32::from_rgb(219, 83, 83),
            success: Color32::from_rgb(46, 150, 80),
        }
    }

    fn toast_color(&self, level: ToastLevel) -> Color32 {
        match level {
            ToastLevel::Success => self.success,
            ToastLevel::Error => self.danger,
            ToastLevel::Warning => self.warning,
            ToastLevel::Info => self.info,
        }
    }
}

impl Theme {
    const fn palette(self) -> ThemePalette {
        match self {
            Theme::Dark => ThemePalette::dark(),
            Theme::Light => ThemePalette::light(),
        }
    }

    const fn label_key(self) -> &'static str {
        match self {
            Theme::Dark => "theme_dark",
            Theme::Light => "theme_light",
        }
    }
}

fn tint(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_premultiplied(color.r(), color.g(), color.b(), alpha)
}

fn badge_frame(color: Color32) -> Frame {
    Frame::new()
        .fill(tint(color, 32))
        .stroke(Stroke::new(1.0, color))
        .corner_radius(CornerRadius::same(255))
        .inner_margin(Margin::symmetric(10, 4))
}

fn section_frame(colors: &ThemePalette) -> Frame {
    Frame::new()
        .fill(colors.surface)
        .stroke(Stroke::new(1.0, colors.border))
        .corner_radius(CornerRadius::same(14))
        .inner_margin(Margin::same(14))
}

fn row_frame(colors: &ThemePalette, highlighted: bool) -> Frame {
    let stroke = if highlighted {
        colors.accent
    } else {
        colors.border
    };
    Frame::new()
        .fill(colors.surface_elev)
        .stroke(Stroke::new(1.0, stroke))
        .corner_radius(CornerRadius::same(10))
        .inner_margin(Margin::symmetric(12, 8))
}

fn toast_frame(colors: &ThemePalette, color: Color32) -> Frame {
    Frame::new()
        .fill(colors.surface_elev)
        .stroke(Stroke::new(1.5, color))
        .corner_radius(CornerRadius::same(12))
        .inner_margin(Margin::symmetric(14, 10))
        .shadow(Shadow {
            offset: [0, 2],
            blur: 10,
            spread: 0,
            color: Color32::from_black_alpha(70),
        })
}

fn primary_cta_button(
    label: impl Into<egui::WidgetText>,
    colors: &ThemePalette,
    min_width: f32,
) -> egui::Button<'_> {
    egui::Button::new(label)
        .fill(colors.accent_soft)
        .stroke(Stroke::new(1.0, colors.accent))
        .min_size(Vec2::new(min_width, 32.0))
}

fn secondary_button(label: impl Into<egui::WidgetText>, colors: &ThemePalette) -> egui::Button<'_> {
    egui::Button::new(label)
        .fill(colors.surface_elev)
        .stroke(Stroke::new(1.0, colors.border_strong))
}

fn danger_button(label: impl Into<egui::WidgetText>, colors: &ThemePalette) -> egui::Button<'_> {
    egui::Button::new(label)
        .fill(tint(colors.danger, 60))
        .stroke(Stroke::new(1.0, colors.danger))
}

fn build_runtime() -> Arc<Runtime> {
    match Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(err) => {
            warn!(
                "ui: failed to create multithreaded runtime ({}); trying single-threaded runtime",
                err
            );
            match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => Arc::new(rt),
                Err(fallback_err) => {
                    error!(
                        "ui: failed to create any Tokio runtime ({}); terminating",
                        fallback_err
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Register the first CJK-capable system font found as a fallback face.
fn setup_custom_fonts(ctx: &egui::Context) {
    let Some(bytes) = CJK_FONT_CANDIDATES
        .iter()
        .find_map(|path| fs::read(path).ok())
    else {
        debug!("ui: no CJK font found; Chinese text may not render");
        return;
    };
    let mut fonts = FontDefinitions::default();
    fonts.font_data.insert(
        CJK_FONT_ID.to_owned(),
        Arc::new(FontData::from_owned(bytes)),
    );
    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        fonts
            .families
            .entry(family)
            .or_default()
            .push(CJK_FONT_ID.to_owned());
    }
    ctx.set_fonts(fonts);
}

fn apply_theme(ctx: &egui::Context, colors: &ThemePalette) {
    let is_dark = colors == &ThemePalette::dark();
    let mut visuals = if is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };
    let radius = CornerRadius::same(10);
    visuals.panel_fill = colors.bg;
    visuals.window_fill = colors.surface;
    visuals.override_text_color = Some(colors.text_primary);
    visuals.hyperlink_color = colors.accent_glow;
    visuals.widgets.noninteractive.corner_radius = radius;
    visuals.widgets.inactive.corner_radius = radius;
    visuals.widgets.hovered.corner_radius = radius;
    visuals.widgets.active.corner_radius = radius;
    visuals.widgets.noninteractive.bg_fill = colors.surface;
    visuals.widgets.inactive.bg_fill = colors.surface_elev;
    visuals.widgets.hovered.bg_fill = colors.accent_soft;
    visuals.widgets.active.bg_fill = colors.accent;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, colors.border);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, colors.border_strong);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.3, colors.accent);
    visuals.widgets.active.bg_stroke = Stroke::new(1.5, colors.accent_glow);
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, colors.text_muted);
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, colors.text_muted);
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, colors.text_primary);
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, colors.text_primary);
    visuals.selection.bg_fill = colors.accent;
    visuals.selection.stroke = Stroke::new(1.0, colors.accent_glow);
    visuals.faint_bg_color = colors.sunken_surface;
    visuals.extreme_bg_color = colors.sunken_surface;
    visuals.window_corner_radius = CornerRadius::same(14);
    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = Vec2::new(10.0, 10.0);
    style.spacing.button_padding = Vec2::new(14.0, 8.0);
    ctx.set_style(style);
}

pub struct ManagerApp {
    // Owns the worker thread pool; dropping it stops the effect worker.
    #[allow(dead_code)]
    runtime: Arc<Runtime>,
    effects_tx: mpsc::UnboundedSender<Effect>,
    updates_rx: mpsc::UnboundedReceiver<EngineEvent>,
    model: AppModel,
    theme: Theme,
    language_override: Option<Language>,
    toast_seen: HashMap<u64, Instant>,
    window_title: String,
    version: &'static str,
}

impl ManagerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        engine: ManagerEngine,
        language_override: Option<Language>,
    ) -> Self {
        let runtime = build_runtime();
        let (effects_tx, mut effects_rx) = mpsc::unbounded_channel::<Effect>();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        // Effects run one at a time, in the order the reducer produced them.
        runtime.spawn(async move {
            let mut engine = engine;
            while let Some(effect) = effects_rx.recv().await {
                engine.run_effect(effect, &updates_tx).await;
            }
            debug!("ui: effect worker stopped");
        });

        setup_custom_fonts(&cc.egui_ctx);

        let mut app = Self {
            runtime,
            effects_tx,
            updates_rx,
            model: AppModel::default(),
            theme: Theme::Dark,
            language_override,
            toast_seen: HashMap::new(),
            window_title: String::new(),
            version: env!("CARGO_PKG_VERSION"),
        };
        app.dispatch(UserAction::Start);
        app
    }

    fn colors(&self) -> ThemePalette {
        self.theme.palette()
    }

    fn dispatch(&mut self, msg: impl Into<Msg>) {
        for effect in self.model.update(msg) {
            if self.effects_tx.send(effect).is_err() {
                error!("ui: effect worker is gone; dropping effect");
            }
        }
    }

    fn sync_state(&mut self) {
        while let Ok(event) = self.updates_rx.try_recv() {
            let translations_loaded = matches!(event, EngineEvent::TranslationsLoaded { .. });
            self.dispatch(event);
            if translations_loaded && let Some(language) = self.language_override.take() {
                info!("ui: applying language override {}", language.code());
                self.dispatch(UserAction::SetLanguage(language.code().to_owned()));
            }
        }
    }

    fn expire_toasts(&mut self) {
        let now = Instant::now();
        let live: Vec<u64> = self.model.toasts.iter().map(|toast| toast.id).collect();
        self.toast_seen.retain(|id, _| live.contains(id));
        let mut expired = Vec::new();
        for id in live {
            let seen = *self.toast_seen.entry(id).or_insert(now);
            if now.duration_since(seen) >= TOAST_LIFETIME {
                expired.push(id);
            }
        }
        for id in expired {
            self.dispatch(UserAction::DismissToast(id));
        }
    }

    fn is_busy(&self) -> bool {
        self.model.loading || self.model.is_converting() || !self.model.toasts.is_empty()
    }

    fn render_top_bar(
        &self,
        ui: &mut egui::Ui,
        colors: &ThemePalette,
        i18n: I18n,
        theme: &mut Theme,
        actions: &mut Vec<UserAction>,
    ) {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading(RichText::new(i18n.t("app_title")).color(colors.accent));
                ui.label(RichText::new(i18n.t("app_subtitle")).color(colors.text_muted));
            });
            if self.model.loading {
                ui.add(egui::Spinner::new());
                ui.label(RichText::new(i18n.t("loading")).color(colors.text_muted));
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                egui::ComboBox::from_id_salt("theme_combo")
                    .selected_text(i18n.t(theme.label_key()))
                    .show_ui(ui, |ui| {
                        for option in [Theme::Dark, Theme::Light] {
                            ui.selectable_value(theme, option, i18n.t(option.label_key()));
                        }
                    });
                ui.add_space(6.0);
                egui::ComboBox::from_id_salt("language_combo")
                    .selected_text(self.model.language.display_name())
                    .show_ui(ui, |ui| {
                        for language in SUPPORTED_LANGUAGES {
                            if ui
                                .selectable_label(
                                    self.model.language == language,
                                    language.display_name(),
                                )
                                .clicked()
                            {
                                actions.push(UserAction::SetLanguage(language.code().to_owned()));
                            }
                        }
                    });
                ui.add_space(6.0);
                if ui
                    .add(danger_button(i18n.t("reboot"), colors))
                    .clicked()
                {
                    actions.push(UserAction::RequestReboot);
                }
                if ui
                    .add_enabled(
                        !self.model.loading && !self.model.is_converting(),
                        secondary_button(i18n.t("refresh"), colors),
                    )
                    .clicked()
                {
                    actions.push(UserAction::Refresh);
                }
            });
        });
    }

    fn render_status_bar(&self, ui: &mut egui::Ui, colors: &ThemePalette, i18n: I18n) {
        ui.horizontal(|ui| {
            let converted = Message::new("status_converted")
                .arg("count", self.model.converted_apps.len());
            let queued = Message::new("status_queue").arg("count", self.model.selection.len());
            badge_frame(colors.accent).show(ui, |ui| {
                ui.label(RichText::new(i18n.render(&converted)).small());
            });
            badge_frame(colors.info).show(ui, |ui| {
                ui.label(RichText::new(i18n.render(&queued)).small());
            });
            if let Some(host) = self.model.host {
                let host_text = Message::new("status_host").arg("host", i18n.t(host.translation_key()));
                badge_frame(colors.border_strong).show(ui, |ui| {
                    ui.label(RichText::new(i18n.render(&host_text)).small());
                });
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                ui.label(
                    RichText::new(format!("v{}", self.version))
                        .color(colors.text_muted)
                        .small(),
                );
            });
        });
    }

    fn render_tabs(&self, ui: &mut egui::Ui, i18n: I18n, actions: &mut Vec<UserAction>) {
        ui.horizontal(|ui| {
            for (tab, key) in [
                (Tab::User, "tab_user_apps"),
                (Tab::System, "tab_system_apps"),
                (Tab::Converted, "tab_converted_apps"),
            ] {
                if ui
                    .selectable_label(self.model.tab == tab, i18n.t(key))
                    .clicked()
                {
                    actions.push(UserAction::SwitchTab(tab));
                }
            }
        });
    }

    fn render_search(
        &self,
        ui: &mut egui::Ui,
        list: AppListKind,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        let hint = match list {
            AppListKind::User => i18n.t("search_user_placeholder"),
            AppListKind::System => i18n.t("search_system_placeholder"),
        };
        let mut term = self.model.search_term(list).to_owned();
        let resp = ui.add(
            egui::TextEdit::singleline(&mut term)
                .hint_text(hint)
                .desired_width(280.0),
        );
        if resp.changed() {
            actions.push(UserAction::SetSearch { list, term });
        }
    }

    fn render_app_meta(&self, ui: &mut egui::Ui, app: &AppRecord, colors: &ThemePalette) {
        ui.vertical(|ui| {
            ui.label(RichText::new(&app.name).strong());
            let mut meta = app.package_name.clone();
            if let Some(version) = &app.version {
                meta.push_str(&format!(" · v{version}"));
            }
            if let Some(size) = &app.size {
                meta.push_str(&format!(" · {size}"));
            }
            ui.label(RichText::new(meta).color(colors.text_muted).small());
        });
    }

    fn render_user_apps(
        &self,
        ui: &mut egui::Ui,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        ui.horizontal_wrapped(|ui| {
            self.render_search(ui, AppListKind::User, i18n, actions);
            if ui
                .add(secondary_button(i18n.t("select_all"), colors))
                .clicked()
            {
                actions.push(UserAction::SelectAllUser);
            }
        });
        ui.add_space(6.0);

        let apps = self.model.visible_apps(AppListKind::User);
        if apps.is_empty() {
            ui.label(RichText::new(i18n.t("no_apps")).color(colors.text_muted));
        }
        egui::ScrollArea::vertical()
            .id_salt("user_apps_scroll")
            .max_height((ui.available_height() - 70.0).max(120.0))
            .show(ui, |ui| {
                for app in apps {
                    let selected = self.model.selection.contains(&app.package_name);
                    row_frame(colors, selected).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.horizontal(|ui| {
                            let mut checked = selected;
                            if ui.checkbox(&mut checked, "").changed() {
                                actions.push(UserAction::ToggleSelection {
                                    package_name: app.package_name.clone(),
                                    selected: checked,
                                });
                            }
                            self.render_app_meta(ui, app, colors);
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                if ui
                                    .add(secondary_button(i18n.t("details"), colors))
                                    .clicked()
                                {
                                    actions.push(UserAction::ShowDetails {
                                        package_name: app.package_name.clone(),
                                    });
                                }
                            });
                        });
                    });
                }
            });

        ui.separator();
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new(i18n.t("conversion_mode")).color(colors.text_muted));
            for (mode, key) in [
                (ConversionMode::System, "mode_system"),
                (ConversionMode::PrivApp, "mode_priv_app"),
            ] {
                if ui.radio(self.model.mode == mode, i18n.t(key)).clicked() {
                    actions.push(UserAction::SetMode(mode));
                }
            }
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let can_convert =
                    !self.model.selection.is_empty() && !self.model.is_converting();
                let label = RichText::new(i18n.t("convert_selected")).strong();
                if ui
                    .add_enabled(can_convert, primary_cta_button(label, colors, 160.0))
                    .clicked()
                {
                    actions.push(UserAction::RequestConvert);
                }
            });
        });
    }

    fn render_system_apps(
        &self,
        ui: &mut egui::Ui,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        self.render_search(ui, AppListKind::System, i18n, actions);
        ui.add_space(6.0);
        let apps = self.model.visible_apps(AppListKind::System);
        if apps.is_empty() {
            ui.label(RichText::new(i18n.t("no_apps")).color(colors.text_muted));
        }
        egui::ScrollArea::vertical()
            .id_salt("system_apps_scroll")
            .show(ui, |ui| {
                for app in apps {
                    row_frame(colors, false).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.horizontal(|ui| {
                            self.render_app_meta(ui, app, colors);
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                if ui
                                    .add(secondary_button(i18n.t("details"), colors))
                                    .clicked()
                                {
                                    actions.push(UserAction::ShowDetails {
                                        package_name: app.package_name.clone(),
                                    });
                                }
                            });
                        });
                    });
                }
            });
    }

    fn render_converted_apps(
        &self,
        ui: &mut egui::Ui,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(i18n.render(
                    &Message::new("status_converted").arg("count", self.model.converted_apps.len()),
                ))
                .color(colors.text_muted),
            );
            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui
                    .add(danger_button(i18n.t("revert_all"), colors))
                    .clicked()
                {
                    actions.push(UserAction::RequestRevertAll);
                }
            });
        });
        ui.add_space(6.0);
        if self.model.converted_apps.is_empty() {
            ui.label(RichText::new(i18n.t("no_converted_apps")).color(colors.text_muted));
            return;
        }
        egui::ScrollArea::vertical()
            .id_salt("converted_apps_scroll")
            .show(ui, |ui| {
                for record in &self.model.converted_apps {
                    row_frame(colors, false).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.horizontal(|ui| {
                            ui.vertical(|ui| {
                                ui.label(RichText::new(record.name()).strong());
                                ui.label(
                                    RichText::new(format!(
                                        "{} → {}",
                                        record.package_name(),
                                        record.conversion_mode.target_dir()
                                    ))
                                    .color(colors.text_muted)
                                    .small(),
                                );
                            });
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                if ui.add(danger_button(i18n.t("revert"), colors)).clicked() {
                                    actions.push(UserAction::RequestRevert {
                                        package_name: record.package_name().to_owned(),
                                    });
                                }
                                if ui
                                    .add(secondary_button(i18n.t("details"), colors))
                                    .clicked()
                                {
                                    actions.push(UserAction::ShowDetails {
                                        package_name: record.package_name().to_owned(),
                                    });
                                }
                            });
                        });
                    });
                }
            });
    }

    fn render_details(
        &self,
        ui: &mut egui::Ui,
        package_name: &str,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        if ui.add(secondary_button(i18n.t("back"), colors)).clicked() {
            actions.push(UserAction::ShowList);
        }
        ui.add_space(8.0);
        let Some(app) = self.model.find_app(package_name) else {
            ui.colored_label(colors.warning, i18n.t("app_not_found"));
            return;
        };
        let unknown = i18n.t("unknown");
        section_frame(colors).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.heading(app.name.as_str());
            ui.add_space(6.0);
            egui::Grid::new("details_grid")
                .num_columns(2)
                .spacing([24.0, 8.0])
                .show(ui, |ui| {
                    let mut row = |label: String, value: String| {
                        ui.label(RichText::new(label).color(colors.text_muted));
                        ui.label(value);
                        ui.end_row();
                    };
                    row(i18n.t("package"), app.package_name.clone());
                    row(
                        i18n.t("version"),
                        app.version.clone().unwrap_or_else(|| unknown.clone()),
                    );
                    row(
                        i18n.t("size"),
                        app.size.clone().unwrap_or_else(|| unknown.clone()),
                    );
                    row(
                        i18n.t("apk_path"),
                        app.apk_path.clone().unwrap_or_else(|| unknown.clone()),
                    );
                    if let Some(record) = self.model.converted_record(package_name) {
                        row(
                            i18n.t("conversion_mode"),
                            record.conversion_mode.target_dir().to_owned(),
                        );
                        row(
                            i18n.t("converted_at"),
                            record
                                .converted_at
                                .format("%Y-%m-%d %H:%M:%S UTC")
                                .to_string(),
                        );
                    }
                });
            if self.model.converted_record(package_name).is_some() {
                ui.add_space(10.0);
                if ui.add(danger_button(i18n.t("revert"), colors)).clicked() {
                    actions.push(UserAction::RequestRevert {
                        package_name: package_name.to_owned(),
                    });
                }
            }
        });
    }

    fn render_progress_modal(
        &self,
        ctx: &egui::Context,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        let Some(batch) = self.model.batch.as_ref().filter(|batch| batch.visible) else {
            return;
        };
        egui::Window::new(i18n.t("converting"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .default_width(380.0)
            .show(ctx, |ui| {
                ui.label(RichText::new(&batch.current).strong());
                ui.add(
                    egui::ProgressBar::new(batch.percent / 100.0)
                        .fill(colors.accent)
                        .corner_radius(CornerRadius::same(10))
                        .desired_height(20.0)
                        .text(i18n.render(
                            &Message::new("progress_of")
                                .arg("current", (batch.index + 1).min(batch.total.max(1)))
                                .arg("total", batch.total),
                        )),
                );
                if !batch.errors.is_empty() {
                    ui.colored_label(colors.danger, batch.errors.join("\n"));
                }
                ui.add_space(6.0);
                if ui.add(secondary_button(i18n.t("hide"), colors)).clicked() {
                    actions.push(UserAction::HideProgress);
                }
            });
    }

    fn render_confirm_modal(
        &self,
        ctx: &egui::Context,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        let Some(confirmation) = &self.model.pending else {
            return;
        };
        egui::Window::new(i18n.t("confirm_title"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(i18n.render(&confirmation.message()));
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    if ui.add(danger_button(i18n.t("confirm"), colors)).clicked() {
                        actions.push(UserAction::Confirm);
                    }
                    if ui.add(secondary_button(i18n.t("cancel"), colors)).clicked() {
                        actions.push(UserAction::Cancel);
                    }
                });
            });
    }

    fn render_toasts(
        &self,
        ctx: &egui::Context,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        if self.model.toasts.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, Vec2::new(-16.0, -56.0))
            .show(ctx, |ui| {
                ui.set_max_width(360.0);
                for toast in &self.model.toasts {
                    self.render_toast(ui, toast, colors, i18n, actions);
                }
            });
    }

    fn render_toast(
        &self,
        ui: &mut egui::Ui,
        toast: &Toast,
        colors: &ThemePalette,
        i18n: I18n,
        actions: &mut Vec<UserAction>,
    ) {
        let color = colors.toast_color(toast.level);
        let resp = toast_frame(colors, color)
            .show(ui, |ui| {
                ui.label(RichText::new(i18n.render(&toast.message)).color(color));
            })
            .response
            .interact(egui::Sense::click());
        if resp.clicked() {
            actions.push(UserAction::DismissToast(toast.id));
        }
    }
}

impl eframe::App for ManagerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_state();
        self.expire_toasts();
        let colors = self.colors();
        apply_theme(ctx, &colors);

        let mut actions = Vec::new();
        let mut theme = self.theme;
        let i18n = self.model.i18n();
        let title = i18n.window_title();
        if title != self.window_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.window_title = title;
        }

        egui::TopBottomPanel::top("top_bar")
            .frame(
                Frame::new()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(16, 12)),
            )
            .show(ctx, |ui| {
                self.render_top_bar(ui, &colors, i18n, &mut theme, &mut actions);
            });

        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                Frame::new()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(16, 8)),
            )
            .show(ctx, |ui| {
                self.render_status_bar(ui, &colors, i18n);
            });

        egui::CentralPanel::default()
            .frame(
                Frame::new()
                    .fill(colors.bg)
                    .inner_margin(Margin::symmetric(14, 12)),
            )
            .show(ctx, |ui| match &self.model.view {
                View::Details { package_name } => {
                    self.render_details(ui, package_name, &colors, i18n, &mut actions);
                }
                View::List => {
                    self.render_tabs(ui, i18n, &mut actions);
                    ui.add_space(6.0);
                    section_frame(&colors).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        match self.model.tab {
                            Tab::User => self.render_user_apps(ui, &colors, i18n, &mut actions),
                            Tab::System => {
                                self.render_system_apps(ui, &colors, i18n, &mut actions)
                            }
                            Tab::Converted => {
                                self.render_converted_apps(ui, &colors, i18n, &mut actions)
                            }
                        }
                    });
                }
            });

        self.render_progress_modal(ctx, &colors, i18n, &mut actions);
        self.render_confirm_modal(ctx, &colors, i18n, &mut actions);
        self.render_toasts(ctx, &colors, i18n, &mut actions);

        self.theme = theme;
        for action in actions {
            self.dispatch(action);
        }
        if self.is_busy() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}
