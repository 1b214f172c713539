//! Timeguessr Stats - Graphical User Interface
//!
//! Provides a tabbed interface over the pipeline: settings and head-to-head
//! summary, both halls, news, score submission and exports.

use chrono::NaiveDate;
use iced::widget::{
    button, column, container, row, rule, scrollable, text, text_editor, text_input,
};
use iced::{Center, Element, Fill, Task, Theme};
use std::path::PathBuf;
use timeguessr_stats::config::Settings;
use timeguessr_stats::pipeline::{self, ConsolidateConfig, DashboardConfig};
use timeguessr_stats::rounds::{parse_date, Category, Roster};
use timeguessr_stats::Hall;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(App::new, App::update, App::view)
        .theme(App::theme)
        .centered()
        .run()
}

// ============================================================================
// App State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabId {
    Welcome,
    Fame,
    Shame,
    News,
    Submit,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    StatsCsv,
    RawScoresCsv,
    Dashboard,
    Workbook,
}

struct App {
    active_tab: TabId,

    // Welcome / settings
    players: String,
    stats_csv: String,
    raw_scores_csv: String,
    settings: Settings,
    settings_status: String,
    summary: String,

    // Report tabs
    fame_report: String,
    shame_report: String,
    news_category: Category,
    news_report: String,

    // Submit tab
    submit_player: String,
    submit_date: String,
    share_text: text_editor::Content,
    submit_status: String,

    // Export tab
    dashboard_output: String,
    workbook_output: String,
    export_status: String,

    /// Background report refresh in flight
    is_running: bool,
    /// Dashboard, workbook or consolidate job in flight
    is_exporting: bool,
}

impl App {
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn new() -> (Self, Task<Message>) {
        App::with_settings(Settings::load())
    }

    fn with_settings(settings: Settings) -> (Self, Task<Message>) {
        let app = App {
            active_tab: TabId::Welcome,
            players: settings.roster.to_config_string(),
            stats_csv: settings.stats_csv.display().to_string(),
            raw_scores_csv: settings.raw_scores_csv.display().to_string(),
            settings_status: String::new(),
            summary: String::new(),
            fame_report: String::new(),
            shame_report: String::new(),
            news_category: Category::Total,
            news_report: String::new(),
            submit_player: settings
                .roster
                .name(timeguessr_stats::Player::First)
                .to_string(),
            submit_date: today().format("%Y-%m-%d").to_string(),
            share_text: text_editor::Content::new(),
            submit_status: String::new(),
            dashboard_output: "timeguessr.html".to_string(),
            workbook_output: "timeguessr.xlsx".to_string(),
            export_status: String::new(),
            is_running: true,
            is_exporting: false,
            settings,
        };
        let task = Task::run(refresh_stream(app.settings.clone(), app.news_category), |msg| msg);
        (app, task)
    }

    /// Settings as currently typed into the Welcome tab.
    fn edited_settings(&self) -> Result<Settings, String> {
        let mut settings = self.settings.clone();
        settings.roster = Roster::parse(&self.players)?;
        if self.stats_csv.trim().is_empty() {
            return Err("Stats CSV path is empty".to_string());
        }
        settings.stats_csv = PathBuf::from(self.stats_csv.trim());
        if !self.raw_scores_csv.trim().is_empty() {
            settings.raw_scores_csv = PathBuf::from(self.raw_scores_csv.trim());
        }
        Ok(settings)
    }

    fn refresh(&mut self) -> Task<Message> {
        self.is_running = true;
        Task::run(
            refresh_stream(self.settings.clone(), self.news_category),
            |msg| msg,
        )
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone)]
enum Message {
    // Tab navigation
    TabSelected(TabId),

    // File dialogs
    BrowseFile(FileKind),
    FileSelected(FileKind, Option<PathBuf>),

    // Welcome / settings
    PlayersChanged(String),
    StatsCsvChanged(String),
    RawScoresCsvChanged(String),
    SaveSettings,
    Refresh,

    // Reports
    NewsCategorySelected(Category),
    ReportLoaded(TabId, Result<String, String>),
    RefreshFinished,

    // Submit tab
    SubmitPlayerChanged(String),
    SubmitDateChanged(String),
    ShareEdited(text_editor::Action),
    SubmitStart { correction: bool },
    SubmitCompleted(Result<String, String>),

    // Export tab
    DashboardOutputChanged(String),
    WorkbookOutputChanged(String),
    DashboardStart,
    WorkbookStart,
    ConsolidateStart,
    ExportCompleted(Result<String, String>),
    ConsolidateCompleted(Result<String, String>),
}

// ============================================================================
// Update
// ============================================================================

impl App {
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            // -- Tab navigation --
            Message::TabSelected(tab) => {
                self.active_tab = tab;
                Task::none()
            }

            // -- File dialogs --
            Message::BrowseFile(kind) => Task::perform(
                async move {
                    let dialog = rfd::AsyncFileDialog::new();
                    let file = match kind {
                        FileKind::StatsCsv | FileKind::RawScoresCsv => {
                            dialog.add_filter("CSV files", &["csv"]).pick_file().await
                        }
                        FileKind::Dashboard => {
                            dialog
                                .add_filter("HTML files", &["html"])
                                .set_file_name("timeguessr.html")
                                .save_file()
                                .await
                        }
                        FileKind::Workbook => {
                            dialog
                                .add_filter("Excel files", &["xlsx"])
                                .set_file_name("timeguessr.xlsx")
                                .save_file()
                                .await
                        }
                    };
                    (kind, file.map(|f| f.path().to_path_buf()))
                },
                |(kind, path)| Message::FileSelected(kind, path),
            ),
            Message::FileSelected(kind, path) => {
                if let Some(p) = path {
                    let path_str = p.display().to_string();
                    match kind {
                        FileKind::StatsCsv => self.stats_csv = path_str,
                        FileKind::RawScoresCsv => self.raw_scores_csv = path_str,
                        FileKind::Dashboard => self.dashboard_output = path_str,
                        FileKind::Workbook => self.workbook_output = path_str,
                    }
                }
                Task::none()
            }

            // -- Welcome / settings --
            Message::PlayersChanged(v) => {
                self.players = v;
                Task::none()
            }
            Message::StatsCsvChanged(v) => {
                self.stats_csv = v;
                Task::none()
            }
            Message::RawScoresCsvChanged(v) => {
                self.raw_scores_csv = v;
                Task::none()
            }
            Message::SaveSettings => match self.edited_settings() {
                Ok(settings) => {
                    self.settings = settings;
                    self.settings_status = match self.settings.save() {
                        Ok(()) => "Settings saved".to_string(),
                        Err(e) => format!("Settings applied but not saved: {}", e),
                    };
                    self.refresh()
                }
                Err(e) => {
                    self.settings_status = format!("Error: {}", e);
                    Task::none()
                }
            },
            Message::Refresh => self.refresh(),

            // -- Reports --
            Message::NewsCategorySelected(category) => {
                self.news_category = category;
                self.news_report = "Loading...".to_string();
                let settings = self.settings.clone();
                Task::perform(
                    async move {
                        pipeline::news_report(&settings, category, pipeline::NEWS_LIMIT)
                            .map_err(|e| e.to_string())
                    },
                    |result| Message::ReportLoaded(TabId::News, result),
                )
            }
            Message::ReportLoaded(tab, result) => {
                let report = match result {
                    Ok(s) => s,
                    Err(e) => format!("Error: {}", e),
                };
                match tab {
                    TabId::Welcome => self.summary = report,
                    TabId::Fame => self.fame_report = report,
                    TabId::Shame => self.shame_report = report,
                    TabId::News => self.news_report = report,
                    TabId::Submit | TabId::Export => {}
                }
                Task::none()
            }
            Message::RefreshFinished => {
                self.is_running = false;
                Task::none()
            }

            // -- Submit tab --
            Message::SubmitPlayerChanged(v) => {
                self.submit_player = v;
                Task::none()
            }
            Message::SubmitDateChanged(v) => {
                self.submit_date = v;
                Task::none()
            }
            Message::ShareEdited(action) => {
                self.share_text.perform(action);
                Task::none()
            }
            Message::SubmitStart { correction } => {
                let Some(date) = parse_date(&self.submit_date) else {
                    self.submit_status = format!("Error: invalid date '{}'", self.submit_date);
                    return Task::none();
                };
                let settings = self.settings.clone();
                let player = self.submit_player.clone();
                let share = self.share_text.text();
                self.submit_status = "Saving...".to_string();
                Task::perform(
                    async move {
                        let result = if correction {
                            pipeline::correct_score(&settings, &player, &share, date)
                        } else {
                            pipeline::submit_share(&settings, &player, &share, date)
                        };
                        result.map_err(|e| e.to_string())
                    },
                    Message::SubmitCompleted,
                )
            }
            Message::SubmitCompleted(result) => {
                self.submit_status = match result {
                    Ok(s) => {
                        self.share_text = text_editor::Content::new();
                        s
                    }
                    Err(e) => format!("Error: {}", e),
                };
                Task::none()
            }

            // -- Export tab --
            Message::DashboardOutputChanged(v) => {
                self.dashboard_output = v;
                Task::none()
            }
            Message::WorkbookOutputChanged(v) => {
                self.workbook_output = v;
                Task::none()
            }
            Message::DashboardStart => {
                let settings = self.settings.clone();
                let config = DashboardConfig {
                    output: PathBuf::from(&self.dashboard_output),
                    today: today(),
                    news_limit: pipeline::NEWS_LIMIT,
                    chart_window: pipeline::CHART_WINDOW,
                };
                self.start_export(
                    move || pipeline::write_dashboard(&settings, &config),
                    Message::ExportCompleted,
                )
            }
            Message::WorkbookStart => {
                let settings = self.settings.clone();
                let output = PathBuf::from(&self.workbook_output);
                self.start_export(
                    move || pipeline::export_workbook(&settings, &output, today()),
                    Message::ExportCompleted,
                )
            }
            Message::ConsolidateStart => {
                let settings = self.settings.clone();
                self.start_export(
                    move || {
                        pipeline::consolidate(
                            &settings,
                            &ConsolidateConfig {
                                actuals: None,
                                guesses: [None, None],
                                output: None,
                            },
                        )
                    },
                    Message::ConsolidateCompleted,
                )
            }
            Message::ExportCompleted(result) => {
                self.is_exporting = false;
                self.export_status = match result {
                    Ok(s) => s,
                    Err(e) => format!("Error: {}", e),
                };
                Task::none()
            }
            Message::ConsolidateCompleted(result) => {
                self.is_exporting = false;
                match result {
                    Ok(s) => {
                        self.export_status = s;
                        // The stats CSV was rewritten
                        self.refresh()
                    }
                    Err(e) => {
                        self.export_status = format!("Error: {}", e);
                        Task::none()
                    }
                }
            }
        }
    }

    fn start_export<F>(
        &mut self,
        job: F,
        done: fn(Result<String, String>) -> Message,
    ) -> Task<Message>
    where
        F: FnOnce() -> anyhow::Result<String> + Send + 'static,
    {
        self.is_exporting = true;
        self.export_status = "Working...".to_string();
        Task::perform(async move { job().map_err(|e| e.to_string()) }, done)
    }
}

// ============================================================================
// View
// ============================================================================

impl App {
    fn view(&self) -> Element<'_, Message> {
        let tab_bar = row![
            tab_button("Welcome", TabId::Welcome, self.active_tab),
            tab_button("Hall of Fame", TabId::Fame, self.active_tab),
            tab_button("Hall of Shame", TabId::Shame, self.active_tab),
            tab_button("News", TabId::News, self.active_tab),
            tab_button("Submit Score", TabId::Submit, self.active_tab),
            tab_button("Export", TabId::Export, self.active_tab),
        ]
        .spacing(4);

        let content: Element<'_, Message> = match self.active_tab {
            TabId::Welcome => self.view_welcome_tab(),
            TabId::Fame => self.view_hall_tab(Hall::Fame, &self.fame_report),
            TabId::Shame => self.view_hall_tab(Hall::Shame, &self.shame_report),
            TabId::News => self.view_news_tab(),
            TabId::Submit => self.view_submit_tab(),
            TabId::Export => self.view_export_tab(),
        };

        let body = container(content).padding(20).width(Fill).height(Fill);

        column![
            container(tab_bar).padding([10, 20]),
            rule::horizontal(1),
            body,
        ]
        .into()
    }

    // -- Welcome tab --
    fn view_welcome_tab(&self) -> Element<'_, Message> {
        let disabled = self.is_running;
        let title = text("Timeguessr Stats").size(28);

        let settings = column![
            row![
                text("Players:").width(130),
                text_input("Michael,Sarah", &self.players)
                    .on_input(Message::PlayersChanged)
                    .width(Fill),
            ]
            .spacing(10)
            .align_y(Center),
            file_picker(
                "Stats CSV:",
                &self.stats_csv,
                Message::StatsCsvChanged,
                Message::BrowseFile(FileKind::StatsCsv),
                disabled,
            ),
            file_picker(
                "Raw scores CSV:",
                &self.raw_scores_csv,
                Message::RawScoresCsvChanged,
                Message::BrowseFile(FileKind::RawScoresCsv),
                disabled,
            ),
        ]
        .spacing(12);

        let mut save_btn = button(text("Save Settings")).style(button::primary);
        let mut refresh_btn = button(text("Refresh"));
        if !disabled {
            save_btn = save_btn.on_press(Message::SaveSettings);
            refresh_btn = refresh_btn.on_press(Message::Refresh);
        }

        column![
            title,
            settings,
            row![save_btn, refresh_btn, text(&self.settings_status).size(13)]
                .spacing(10)
                .align_y(Center),
            rule::horizontal(1),
            report_pane(&self.summary, 350),
        ]
        .spacing(16)
        .into()
    }

    // -- Hall tabs --
    fn view_hall_tab<'a>(&'a self, hall: Hall, report: &'a str) -> Element<'a, Message> {
        let blurb = match hall {
            Hall::Fame => "Trophies for each year, quarter and month.",
            Hall::Shame => "Dubious honors for each year, quarter and month.",
        };
        column![text(blurb).size(14), report_pane(report, 500)]
            .spacing(16)
            .into()
    }

    // -- News tab --
    fn view_news_tab(&self) -> Element<'_, Message> {
        let selector = row(Category::ALL.iter().map(|c| -> Element<'_, Message> {
            let btn = button(text(c.label()).size(13));
            if *c == self.news_category {
                btn.style(button::primary).into()
            } else {
                btn.on_press(Message::NewsCategorySelected(*c))
                    .style(button::secondary)
                    .into()
            }
        }))
        .spacing(4);

        column![selector, report_pane(&self.news_report, 500)]
            .spacing(16)
            .into()
    }

    // -- Submit tab --
    fn view_submit_tab(&self) -> Element<'_, Message> {
        let form = column![
            text("Paste the share text from the game.").size(14),
            row![
                text("Player:").width(130),
                text_input("Name", &self.submit_player)
                    .on_input(Message::SubmitPlayerChanged)
                    .width(200),
                text("Date:"),
                text_input("YYYY-MM-DD", &self.submit_date)
                    .on_input(Message::SubmitDateChanged)
                    .width(120),
            ]
            .spacing(10)
            .align_y(Center),
            text_editor(&self.share_text)
                .placeholder("TimeGuessr #268 41,133/50,000 ...")
                .on_action(Message::ShareEdited)
                .height(180),
        ]
        .spacing(12);

        let buttons = row![
            button(text("Submit"))
                .style(button::primary)
                .on_press(Message::SubmitStart { correction: false }),
            button(text("Correct Existing")).on_press(Message::SubmitStart { correction: true }),
        ]
        .spacing(10);

        column![form, buttons, text(&self.submit_status).size(13)]
            .spacing(16)
            .into()
    }

    // -- Export tab --
    fn view_export_tab(&self) -> Element<'_, Message> {
        let disabled = self.is_exporting;

        let mut dashboard_btn = button(text("Write Dashboard"));
        let mut workbook_btn = button(text("Export Workbook"));
        let mut consolidate_btn = button(text("Rebuild Stats CSV from Raw Scores"));
        if !disabled {
            dashboard_btn = dashboard_btn.on_press(Message::DashboardStart);
            workbook_btn = workbook_btn.on_press(Message::WorkbookStart);
            consolidate_btn = consolidate_btn.on_press(Message::ConsolidateStart);
        }

        column![
            file_picker(
                "Dashboard HTML:",
                &self.dashboard_output,
                Message::DashboardOutputChanged,
                Message::BrowseFile(FileKind::Dashboard),
                disabled,
            ),
            row![dashboard_btn],
            file_picker(
                "Workbook:",
                &self.workbook_output,
                Message::WorkbookOutputChanged,
                Message::BrowseFile(FileKind::Workbook),
                disabled,
            ),
            row![workbook_btn],
            rule::horizontal(1),
            row![consolidate_btn],
            text(&self.export_status).size(13),
        ]
        .spacing(12)
        .into()
    }
}

// ============================================================================
// Helper widgets
// ============================================================================

/// Render a tab button, styled differently when active.
fn tab_button(label: &str, tab: TabId, active: TabId) -> Element<'_, Message> {
    let btn = button(text(label).size(14));
    if tab == active {
        btn.style(button::primary).into()
    } else {
        btn.on_press(Message::TabSelected(tab))
            .style(button::secondary)
            .into()
    }
}

/// Render a file picker row: label + text input + browse button.
fn file_picker<'a, F>(
    label: &'a str,
    value: &str,
    on_change: F,
    on_browse: Message,
    disabled: bool,
) -> Element<'a, Message>
where
    F: Fn(String) -> Message + 'a,
{
    let input = text_input("Select file...", value).on_input_maybe(if disabled {
        None
    } else {
        Some(on_change)
    });

    let mut browse = button(text("Browse").size(13));
    if !disabled {
        browse = browse.on_press(on_browse);
    }

    row![text(label).width(130), input.width(Fill), browse]
        .spacing(10)
        .align_y(Center)
        .into()
}

/// Monospace, scrollable report text.
fn report_pane(report: &str, height: u32) -> Element<'_, Message> {
    if report.is_empty() {
        return text("Loading...").size(13).into();
    }
    scrollable(container(text(report).size(12).font(iced::Font::MONOSPACE)).padding(8))
        .height(height)
        .into()
}

// ============================================================================
// Background refresh
// ============================================================================

/// Build every report on a worker thread, sending each as it completes.
fn refresh_stream(settings: Settings, news_category: Category) -> impl futures::Stream<Item = Message> {
    let (tx, rx) = futures::channel::mpsc::unbounded();

    std::thread::spawn(move || {
        let today = today();
        let send = |tab: TabId, result: anyhow::Result<String>| {
            let _ = tx.unbounded_send(Message::ReportLoaded(tab, result.map_err(|e| e.to_string())));
        };

        send(TabId::Welcome, pipeline::summary_report(&settings));
        send(TabId::Fame, pipeline::hall_of_fame_report(&settings, today));
        send(TabId::Shame, pipeline::hall_of_shame_report(&settings, today));
        send(
            TabId::News,
            pipeline::news_report(&settings, news_category, pipeline::NEWS_LIMIT),
        );
        let _ = tx.unbounded_send(Message::RefreshFinished);
    });

    rx
}
