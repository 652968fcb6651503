// src/app.rs
use iced::alignment::Horizontal;
use iced::widget::{button, column, container, pick_list, row, scrollable, text, text_input, Column, Row, Space};
use iced::{executor, window, Alignment, Application, Command, Element, Length, Settings, Subscription, Theme};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::config::AppConfig;
use crate::data_types::{PageSize, Query, ResultPage, User, PAGE_SIZES};
use crate::errors::{AuthError, FetchError};
use crate::export;
use crate::fetcher;
use crate::graph_client::GraphClient;
use crate::identity::MicrosoftIdentity;
use crate::session_gate::{self, Route, Session, SessionStatus};
use crate::session_store::{AuthDisplay, AuthStateSubscription, SessionStore, TokenStore};
use crate::ui::{self, Styles};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const FIRST_COLUMN_WIDTH: f32 = 180.0;
const COLUMN_WIDTH: f32 = 140.0;

pub struct Flags {
    pub config: Arc<AppConfig>,
    /// Path of the first view to open, `/` or `/dashboard`.
    pub initial_path: String,
}

pub fn run(flags: Flags) -> iced::Result {
    let mut settings = Settings::with_flags(flags);
    settings.window = window::Settings {
        size: (1024, 768),
        resizable: true,
        ..Default::default()
    };
    EquipmentDashboard::run(settings)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Excel,
    Csv,
    Print,
}

impl ExportKind {
    fn file_name(self) -> &'static str {
        match self {
            ExportKind::Excel => export::XLSX_FILE_NAME,
            ExportKind::Csv => export::CSV_FILE_NAME,
            ExportKind::Print => export::PRINT_FILE_NAME,
        }
    }

    fn filter(self) -> (&'static str, &'static str) {
        match self {
            ExportKind::Excel => ("Excel Workbook", "xlsx"),
            ExportKind::Csv => ("CSV Files", "csv"),
            ExportKind::Print => ("HTML Document", "html"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    AuthStateChanged(Option<User>),
    SignIn,
    SignInPrompt(Option<AuthDisplay>),
    CancelSignIn,
    SignedIn(Result<(User, String), AuthError>),
    SignOut,
    SignedOut,
    NameFilterChanged(String),
    EquipmentFilterChanged(String),
    PageSizeSelected(PageSize),
    PreviousPage,
    NextPage,
    PageLoaded(u64, Result<ResultPage, FetchError>),
    Export(ExportKind),
    Exported(Result<Option<PathBuf>, String>),
    ToggleTheme,
}

/// Everything the dashboard view shows; reset on sign-out.
#[derive(Debug, Default)]
struct DashboardState {
    query: Query,
    page: Option<ResultPage>,
    loading: bool,
    error: Option<FetchError>,
    /// Tag of the latest fetch; results carrying an older tag are dropped.
    generation: u64,
    notice: Option<String>,
}

pub struct EquipmentDashboard {
    sessions: Arc<SessionStore<MicrosoftIdentity>>,
    graph: GraphClient,
    session: Session,
    requested: Route,
    is_dark_mode: bool,
    sign_in_pending: bool,
    sign_in_prompt: Option<AuthDisplay>,
    auth_error: Option<AuthError>,
    dashboard: DashboardState,
}

impl Application for EquipmentDashboard {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = Flags;

    fn new(flags: Flags) -> (Self, Command<Message>) {
        let identity = MicrosoftIdentity::new(Arc::clone(&flags.config));
        let sessions = SessionStore::boot(identity, TokenStore::new())
            .with_sign_in_timeout(flags.config.sign_in_timeout());

        (
            EquipmentDashboard {
                sessions: Arc::new(sessions),
                graph: GraphClient::new(flags.config),
                session: Session::loading(),
                requested: Route::from_path(&flags.initial_path),
                is_dark_mode: false,
                sign_in_pending: false,
                sign_in_prompt: None,
                auth_error: None,
                dashboard: DashboardState::default(),
            },
            Command::none(),
        )
    }

    fn title(&self) -> String {
        format!("Sports Equipment Manager v{}", VERSION)
    }

    fn theme(&self) -> Theme {
        if self.is_dark_mode {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::AuthStateChanged(user) => {
                let previous = self.session.bearer_token().map(str::to_owned);
                self.session
                    .auth_state_changed(user, self.sessions.stored_token());
                self.follow_session(previous)
            }

            Message::SignIn => {
                self.sign_in_pending = true;
                self.auth_error = None;
                let sessions = Arc::clone(&self.sessions);
                Command::perform(async move { sessions.sign_in().await }, Message::SignedIn)
            }

            Message::SignInPrompt(display) => {
                self.sign_in_prompt = display;
                Command::none()
            }

            Message::CancelSignIn => {
                self.sessions.cancel_sign_in();
                Command::none()
            }

            Message::SignedIn(result) => {
                self.sign_in_pending = false;
                self.sign_in_prompt = None;
                match result {
                    Ok((user, token)) => {
                        let previous = self.session.bearer_token().map(str::to_owned);
                        self.session.signed_in(user, token);
                        self.requested = Route::Dashboard;
                        self.follow_session(previous)
                    }
                    Err(err) => {
                        error!(error = %err, "login failed");
                        self.auth_error = Some(err);
                        Command::none()
                    }
                }
            }

            Message::SignOut => {
                self.session.signed_out();
                self.reset_dashboard();
                self.normalize_route();
                let sessions = Arc::clone(&self.sessions);
                Command::perform(async move { sessions.sign_out().await }, |_| {
                    Message::SignedOut
                })
            }

            Message::SignedOut => Command::none(),

            Message::NameFilterChanged(value) => {
                self.dashboard.query.name_filter = value;
                self.dashboard.query.page = 1;
                self.refresh()
            }

            Message::EquipmentFilterChanged(value) => {
                self.dashboard.query.equipment_filter = value;
                self.dashboard.query.page = 1;
                self.refresh()
            }

            Message::PageSizeSelected(size) => {
                self.dashboard.query.page_size = size.0;
                self.dashboard.query.page = 1;
                self.refresh()
            }

            Message::PreviousPage => {
                if self.dashboard.query.page > 1 {
                    self.dashboard.query.page -= 1;
                    return self.refresh();
                }
                Command::none()
            }

            Message::NextPage => {
                if self.dashboard.query.page < self.total_pages() {
                    self.dashboard.query.page += 1;
                    return self.refresh();
                }
                Command::none()
            }

            Message::PageLoaded(generation, result) => {
                if generation != self.dashboard.generation {
                    debug!(generation, latest = self.dashboard.generation, "discarding stale page");
                    return Command::none();
                }
                self.dashboard.loading = false;
                match result {
                    Ok(page) => {
                        self.dashboard.page = Some(page);
                        self.dashboard.error = None;
                    }
                    Err(err) => {
                        error!(error = %err, "could not load workbook");
                        if err.needs_reauth() {
                            self.session.token_rejected();
                        }
                        self.dashboard.error = Some(err);
                    }
                }
                Command::none()
            }

            Message::Export(kind) => self.export(kind),

            Message::Exported(result) => {
                self.dashboard.notice = match result {
                    Ok(Some(path)) => Some(format!("Saved {}", path.display())),
                    Ok(None) => None,
                    Err(err) => {
                        warn!(error = %err, "export failed");
                        Some(format!("Export failed: {err}"))
                    }
                };
                Command::none()
            }

            Message::ToggleTheme => {
                self.is_dark_mode = !self.is_dark_mode;
                Command::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let sessions = Arc::clone(&self.sessions);
        let auth_state = iced::subscription::unfold(
            "auth-state",
            None,
            move |watch: Option<AuthStateSubscription>| {
                let sessions = Arc::clone(&sessions);
                async move {
                    let mut watch = watch.unwrap_or_else(|| sessions.on_auth_state_changed());
                    match watch.next().await {
                        Some(user) => (Message::AuthStateChanged(user), Some(watch)),
                        None => std::future::pending().await,
                    }
                }
            },
        );

        let sessions = Arc::clone(&self.sessions);
        let prompts = iced::subscription::unfold(
            "sign-in-prompt",
            None,
            move |watch: Option<watch::Receiver<Option<AuthDisplay>>>| {
                let sessions = Arc::clone(&sessions);
                async move {
                    let mut watch = watch.unwrap_or_else(|| sessions.sign_in_prompts());
                    if watch.changed().await.is_err() {
                        return std::future::pending().await;
                    }
                    let display = watch.borrow_and_update().clone();
                    (Message::SignInPrompt(display), Some(watch))
                }
            },
        );

        Subscription::batch([auth_state, prompts])
    }

    fn view(&self) -> Element<Message> {
        let styles = ui::styles(self.is_dark_mode);

        let content = match session_gate::resolve(self.requested, &self.session) {
            None => centered(text("Loading...").size(20).style(styles.muted_fg)),
            Some(Route::Login) => self.login_view(styles),
            Some(Route::Dashboard) if self.session.status() == SessionStatus::TokenExpired => {
                self.reauth_view()
            }
            Some(Route::Dashboard) => self.dashboard_view(styles),
        };

        let footer = container(
            row![
                text(format!("Sports Equipment Manager v{}", VERSION)).size(14),
                Space::with_width(Length::Fill),
                button(text("Theme").size(14)).on_press(Message::ToggleTheme),
            ]
            .spacing(5)
            .align_items(Alignment::Center),
        )
        .padding(10)
        .width(Length::Fill)
        .style(styles.footer());

        container(column![
            container(content).width(Length::Fill).height(Length::Fill),
            footer
        ])
        .width(Length::Fill)
        .height(Length::Fill)
        .style(styles.page())
        .into()
    }
}

impl EquipmentDashboard {
    /// Re-routes after a session change and reloads when the token changed.
    fn follow_session(&mut self, previous_token: Option<String>) -> Command<Message> {
        self.normalize_route();
        if self.session.bearer_token() == previous_token.as_deref() {
            return Command::none();
        }
        if self.session.status() == SessionStatus::Authenticated {
            self.refresh()
        } else {
            self.reset_dashboard();
            Command::none()
        }
    }

    fn normalize_route(&mut self) {
        if let Some(route) = session_gate::resolve(self.requested, &self.session) {
            self.requested = route;
        }
    }

    fn reset_dashboard(&mut self) {
        self.dashboard = DashboardState {
            generation: self.dashboard.generation + 1,
            ..DashboardState::default()
        };
    }

    fn total_pages(&self) -> usize {
        self.dashboard
            .page
            .as_ref()
            .map_or(0, |page| page.total_pages(self.dashboard.query.page_size()))
    }

    fn refresh(&mut self) -> Command<Message> {
        if self.session.status() != SessionStatus::Authenticated {
            return Command::none();
        }

        self.dashboard.generation += 1;
        self.dashboard.loading = true;
        self.dashboard.error = None;

        let generation = self.dashboard.generation;
        let graph = self.graph.clone();
        let token = self.session.bearer_token().map(str::to_owned);
        let query = self.dashboard.query.clone();

        Command::perform(
            async move { fetcher::fetch_page(&graph, token.as_deref(), &query).await },
            move |result| Message::PageLoaded(generation, result),
        )
    }

    fn export(&self, kind: ExportKind) -> Command<Message> {
        let Some(page) = &self.dashboard.page else {
            return Command::none();
        };
        let columns = page.columns.clone();
        let records = page.matching.clone();

        Command::perform(
            async move {
                let (filter_name, extension) = kind.filter();
                let Some(handle) = rfd::AsyncFileDialog::new()
                    .set_file_name(kind.file_name())
                    .add_filter(filter_name, &[extension])
                    .save_file()
                    .await
                else {
                    return Ok(None);
                };

                let path = handle.path().to_path_buf();
                let written = match kind {
                    ExportKind::Excel => export::write_xlsx(&path, &columns, &records),
                    ExportKind::Csv => export::write_csv(&path, &columns, &records),
                    ExportKind::Print => export::write_print_document(&path, &columns, &records),
                };
                written.map(|_| Some(path)).map_err(|err| err.to_string())
            },
            Message::Exported,
        )
    }

    fn login_view(&self, styles: &Styles) -> Element<Message> {
        let sign_in = button(
            text(if self.sign_in_pending {
                "Signing in..."
            } else {
                "Sign in with Microsoft"
            })
            .size(16),
        )
        .padding([12, 24]);
        let sign_in = if self.sign_in_pending {
            sign_in
        } else {
            sign_in.on_press(Message::SignIn)
        };

        let mut panel = column![
            text("Sports Equipment Manager").size(30),
            text("Login with your Microsoft account to continue")
                .size(16)
                .style(styles.muted_fg),
            sign_in,
        ]
        .spacing(20)
        .align_items(Alignment::Center);

        if self.sign_in_pending {
            if let Some(display) = &self.sign_in_prompt {
                panel = panel
                    .push(
                        text("Open this address in your browser to sign in:")
                            .size(14)
                            .style(styles.muted_fg),
                    )
                    .push(
                        text_input("", &display.auth_url)
                            .padding(8)
                            .width(Length::Fixed(600.0)),
                    )
                    .push(
                        text(format!("Waiting for the redirect on {}", display.listen_addr))
                            .size(14)
                            .style(styles.muted_fg),
                    );
            }
            panel = panel.push(button(text("Cancel")).on_press(Message::CancelSignIn));
        }

        if let Some(err) = &self.auth_error {
            panel = panel.push(text(err.to_string()).size(14).style(styles.error_fg));
        }

        centered(panel)
    }

    fn reauth_view(&self) -> Element<Message> {
        centered(
            column![
                text("Your Microsoft token is expired. Please log in again.").size(22),
                button(text("Logout")).on_press(Message::SignOut),
            ]
            .spacing(20)
            .align_items(Alignment::Center),
        )
    }

    fn dashboard_view(&self, styles: &Styles) -> Element<Message> {
        let state = &self.dashboard;
        let greeting = self
            .session
            .current_user()
            .map_or("", User::greeting_name);

        let header = row![
            text(format!("Welcome, {}", greeting)).size(26),
            Space::with_width(Length::Fill),
            button(text("Logout")).on_press(Message::SignOut),
        ]
        .align_items(Alignment::Center);

        let filters = row![
            text_input("Filter by Name", &state.query.name_filter)
                .on_input(Message::NameFilterChanged)
                .padding(8)
                .width(Length::Fixed(220.0)),
            text_input("Filter by Equipment", &state.query.equipment_filter)
                .on_input(Message::EquipmentFilterChanged)
                .padding(8)
                .width(Length::Fixed(220.0)),
            pick_list(
                &PAGE_SIZES[..],
                Some(PageSize(state.query.page_size())),
                Message::PageSizeSelected
            ),
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        let can_export = state.page.is_some() && !state.loading;
        let action = |label: &'static str, kind: ExportKind| {
            let b = button(text(label));
            if can_export {
                b.on_press(Message::Export(kind))
            } else {
                b
            }
        };
        let mut actions = row![
            action("Export to Excel", ExportKind::Excel),
            action("Export to CSV", ExportKind::Csv),
            action("Print", ExportKind::Print),
        ]
        .spacing(10)
        .align_items(Alignment::Center);
        if let Some(notice) = &state.notice {
            actions = actions.push(text(notice).size(14).style(styles.muted_fg));
        }

        let body: Element<Message> = if let Some(err) = &state.error {
            text(format!("Error: {}", err))
                .size(18)
                .style(styles.error_fg)
                .into()
        } else if state.loading {
            text("Loading Excel data...").size(18).into()
        } else if let Some(page) = &state.page {
            column![
                self.render_table(page, styles),
                self.pagination(page)
            ]
            .spacing(10)
            .into()
        } else {
            Space::with_height(Length::Shrink).into()
        };

        column![header, filters, actions, body]
            .spacing(15)
            .padding(20)
            .into()
    }

    fn render_table(&self, page: &ResultPage, styles: &Styles) -> Element<Message> {
        let width = |i: usize| {
            if i == 0 {
                Length::Fixed(FIRST_COLUMN_WIDTH)
            } else {
                Length::Fixed(COLUMN_WIDTH)
            }
        };

        let headers = Row::with_children(
            page.columns
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    container(text(header).size(16))
                        .width(width(i))
                        .padding(5)
                        .style(styles.header())
                        .into()
                })
                .collect(),
        )
        .spacing(1);

        let rows = page.records.iter().map(|record| {
            Row::with_children(
                page.columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        container(text(record.cell(column)).size(15))
                            .width(width(i))
                            .padding(5)
                            .style(styles.page())
                            .into()
                    })
                    .collect(),
            )
            .spacing(1)
            .into()
        });

        let table = column![headers]
            .push(Column::with_children(rows.collect()).spacing(1))
            .spacing(1);

        scrollable(table).height(Length::Fill).into()
    }

    fn pagination(&self, page: &ResultPage) -> Element<Message> {
        let current = self.dashboard.query.page();
        let total_pages = page.total_pages(self.dashboard.query.page_size());

        let previous = button(text("Previous"));
        let previous = if current > 1 {
            previous.on_press(Message::PreviousPage)
        } else {
            previous
        };
        let next = button(text("Next"));
        let next = if current < total_pages {
            next.on_press(Message::NextPage)
        } else {
            next
        };

        row![
            previous,
            text(format!(
                "Page {} of {} ({} total records)",
                current, total_pages, page.total_matching
            ))
            .horizontal_alignment(Horizontal::Center),
            next,
        ]
        .spacing(15)
        .align_items(Alignment::Center)
        .into()
    }
}

fn centered<'a>(content: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x()
        .center_y()
        .into()
}
