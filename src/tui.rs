// src/tui.rs
use crate::accounts::AccountStore;
use crate::config::Config;
use crate::devices::DeviceStore;
use crate::error::{StoreError, TuiError};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::collections::BTreeSet;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::Duration;

const NORMAL_KEYS: &str =
    "(a) Add | (e) Edit | (n/p) Sort | (Space) Mark | (o) Import | (x/X) Export | (c) Passwd | (l) Logout | (q) Quit";

#[derive(PartialEq, Debug, Clone, Copy)]
enum FileAction {
    Import,
    ExportAll,
    ExportSelected,
}

#[derive(PartialEq, Debug, Clone)]
enum Mode {
    Login,
    CreateAccount,
    Normal,
    CreateDevice,
    EditSecret { id: u32 },
    EditDevice { id: u32, secret: String },
    ChangePassword,
    PathPrompt { action: FileAction },
    ConfirmLogout,
}

impl Mode {
    fn field_labels(&self) -> &'static [&'static str] {
        match self {
            Mode::Login => &["Username:", "Password:"],
            Mode::CreateAccount => &["Username:", "Password:", "Confirm Password:"],
            Mode::CreateDevice => &["Name:", "AppID:", "Saved CPN:", "Security Key:"],
            Mode::EditSecret { .. } => &["CPN or Security Key:"],
            Mode::EditDevice { .. } => &["Name:", "AppID:"],
            Mode::ChangePassword => &["Old Password:", "New Password:", "Confirm New Password:"],
            Mode::PathPrompt { .. } => &["File path:"],
            Mode::Normal | Mode::ConfirmLogout => &[],
        }
    }

    // Account passwords render masked; device secrets are entered in
    // the clear.
    fn is_masked(&self, field_index: usize) -> bool {
        match self {
            Mode::Login => field_index == 1,
            Mode::CreateAccount => field_index >= 1,
            Mode::ChangePassword => true,
            _ => false,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Mode::Login => "ARemi Pro - Login",
            Mode::CreateAccount => "Create New Account",
            Mode::CreateDevice => "Enter Device Details",
            Mode::EditSecret { .. } => "Device Access",
            Mode::EditDevice { .. } => "Edit Device",
            Mode::ChangePassword => "Change Password",
            Mode::PathPrompt { action: FileAction::Import } => "Import Devices",
            Mode::PathPrompt { action: FileAction::ExportAll } => "Export All Devices",
            Mode::PathPrompt { action: FileAction::ExportSelected } => "Export Devices",
            Mode::Normal | Mode::ConfirmLogout => "",
        }
    }
}

pub struct App {
    should_quit: bool,
    mode: Mode,
    accounts: AccountStore,
    devices: DeviceStore,
    current_user: Option<String>,
    table_state: TableState,
    marked: BTreeSet<u32>,
    app_status: String,
    form_fields: Vec<String>,
    form_index: usize,
    current_input: String,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let mut app = App {
            should_quit: false,
            mode: Mode::Normal,
            accounts: AccountStore::load(&config.accounts_file),
            devices: DeviceStore::new(&config.devices_file),
            current_user: None,
            table_state: TableState::default(),
            marked: BTreeSet::new(),
            app_status: String::new(),
            form_fields: Vec::new(),
            form_index: 0,
            current_input: String::new(),
        };
        app.enter_mode(Mode::Login, Vec::new());
        app.app_status = "Enter credentials. (Ctrl+n) Create Account | (Esc) Quit".to_string();
        app
    }

    /// Switches mode and resets the form state, prefilled or blank.
    fn enter_mode(&mut self, mode: Mode, prefill: Vec<String>) {
        let len = mode.field_labels().len();
        self.form_fields = if prefill.len() == len {
            prefill
        } else {
            vec![String::new(); len]
        };
        self.form_index = 0;
        self.current_input = self.form_fields.first().cloned().unwrap_or_default();
        log::debug!("Switched to mode {:?}", mode);
        self.mode = mode;
    }

    pub fn on_key(&mut self, key_event: KeyEvent) {
        match self.mode.clone() {
            Mode::Normal => self.on_key_normal(key_event.code),
            Mode::ConfirmLogout => match key_event.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.logout(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.mode = Mode::Normal;
                    self.app_status = format!("Logout cancelled. {}", NORMAL_KEYS);
                }
                _ => {}
            },
            mode => self.on_key_form(mode, key_event),
        }
    }

    fn on_key_normal(&mut self, key_code: KeyCode) {
        match key_code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('a') => {
                self.enter_mode(Mode::CreateDevice, Vec::new());
                self.app_status = "Adding new device... (Esc to cancel)".to_string();
            }
            KeyCode::Char('e') => match self.selected_id() {
                Some(id) => {
                    self.enter_mode(Mode::EditSecret { id }, Vec::new());
                    self.app_status =
                        "Enter the CPN or Security Key to access this device. (Esc to cancel)"
                            .to_string();
                }
                None => self.app_status = "Please select a device to edit.".to_string(),
            },
            KeyCode::Char(' ') => match self.selected_id() {
                Some(id) => {
                    if !self.marked.remove(&id) {
                        self.marked.insert(id);
                    }
                    self.app_status = format!("{} device(s) marked for export.", self.marked.len());
                }
                None => self.app_status = "No device selected.".to_string(),
            },
            KeyCode::Char('n') => {
                self.devices.sort_by_name();
                self.app_status = format!("Sorted by name. {}", NORMAL_KEYS);
            }
            KeyCode::Char('p') => {
                self.devices.sort_by_app_id();
                self.app_status = format!("Sorted by AppID. {}", NORMAL_KEYS);
            }
            KeyCode::Char('r') => {
                self.clamp_selection();
                self.app_status = format!("{} devices. {}", self.devices.len(), NORMAL_KEYS);
            }
            KeyCode::Char('o') => {
                self.enter_mode(
                    Mode::PathPrompt { action: FileAction::Import },
                    Vec::new(),
                );
                self.app_status = "Path of the devices file to import. (Esc to cancel)".to_string();
            }
            KeyCode::Char('x') => {
                self.enter_mode(
                    Mode::PathPrompt { action: FileAction::ExportAll },
                    Vec::new(),
                );
                self.app_status = "Destination path for all devices. (Esc to cancel)".to_string();
            }
            KeyCode::Char('X') => {
                if self.marked.is_empty() {
                    self.app_status = "No devices selected.".to_string();
                } else {
                    self.enter_mode(
                        Mode::PathPrompt { action: FileAction::ExportSelected },
                        Vec::new(),
                    );
                    self.app_status = format!(
                        "Destination path for {} marked device(s). (Esc to cancel)",
                        self.marked.len()
                    );
                }
            }
            KeyCode::Char('c') => {
                self.enter_mode(Mode::ChangePassword, Vec::new());
                self.app_status = "Changing password... (Esc to cancel)".to_string();
            }
            KeyCode::Char('l') => {
                self.mode = Mode::ConfirmLogout;
            }
            _ => {}
        }
    }

    fn on_key_form(&mut self, mode: Mode, key_event: KeyEvent) {
        if mode == Mode::Login
            && key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('n')
        {
            self.enter_mode(Mode::CreateAccount, Vec::new());
            self.app_status = "Creating account... (Esc to go back)".to_string();
            return;
        }

        let num_fields = mode.field_labels().len();
        match key_event.code {
            KeyCode::Char(c) => self.current_input.push(c),
            KeyCode::Backspace => {
                self.current_input.pop();
            }
            KeyCode::Tab => {
                self.store_current_input();
                self.form_index = (self.form_index + 1) % num_fields;
                self.load_current_input();
            }
            KeyCode::Enter => {
                self.store_current_input();
                if self.form_index == num_fields - 1 {
                    self.submit_form(mode);
                } else {
                    self.form_index += 1;
                    self.load_current_input();
                }
            }
            KeyCode::Esc => self.cancel_form(mode),
            _ => {}
        }
    }

    fn store_current_input(&mut self) {
        if let Some(field) = self.form_fields.get_mut(self.form_index) {
            *field = self.current_input.clone();
        }
    }

    fn load_current_input(&mut self) {
        self.current_input = self
            .form_fields
            .get(self.form_index)
            .cloned()
            .unwrap_or_default();
    }

    fn cancel_form(&mut self, mode: Mode) {
        match mode {
            Mode::Login => {
                // Esc on the login screen quits, like closing the window.
                self.should_quit = true;
            }
            Mode::CreateAccount => {
                self.enter_mode(Mode::Login, Vec::new());
                self.app_status =
                    "Enter credentials. (Ctrl+n) Create Account | (Esc) Quit".to_string();
            }
            _ => {
                self.enter_mode(Mode::Normal, Vec::new());
                self.clamp_selection();
                self.app_status = format!("Cancelled. {}", NORMAL_KEYS);
            }
        }
    }

    fn submit_form(&mut self, mode: Mode) {
        match mode {
            Mode::Login => {
                let username = self.form_fields[0].trim().to_string();
                let password = self.form_fields[1].clone();
                if self.accounts.authenticate(&username, &password) {
                    log::info!("User '{}' logged in.", username);
                    self.current_user = Some(username);
                    self.enter_mode(Mode::Normal, Vec::new());
                    self.clamp_selection();
                    self.app_status = format!("{} devices. {}", self.devices.len(), NORMAL_KEYS);
                } else {
                    log::warn!("Failed login attempt for '{}'.", username);
                    self.app_status = "Invalid login credentials".to_string();
                    self.form_fields[1].clear();
                    self.form_index = 1;
                    self.load_current_input();
                }
            }
            Mode::CreateAccount => {
                let username = self.form_fields[0].trim().to_string();
                let password = self.form_fields[1].clone();
                let confirm = self.form_fields[2].clone();
                if password != confirm {
                    self.app_status = "Passwords do not match.".to_string();
                    self.form_index = 1;
                    self.load_current_input();
                    return;
                }
                match self.accounts.create(&username, &password) {
                    Ok(()) => {
                        self.enter_mode(Mode::Login, Vec::new());
                        self.app_status =
                            "Account created successfully! Please log in.".to_string();
                    }
                    Err(e) => {
                        self.app_status = e.to_string();
                        self.form_index = 0;
                        self.load_current_input();
                    }
                }
            }
            Mode::CreateDevice => {
                let name = self.form_fields[0].trim().to_string();
                let app_id = self.form_fields[1].trim().to_string();
                let saved_cpn = self.form_fields[2].trim().to_string();
                let security_key = self.form_fields[3].trim().to_string();
                match self.devices.create(&name, &app_id, &saved_cpn, &security_key) {
                    Ok(device) => {
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.clamp_selection();
                        self.app_status =
                            format!("Device {} created successfully! {}", device.id, NORMAL_KEYS);
                    }
                    Err(StoreError::InvalidCpn) => {
                        self.app_status =
                            "Invalid Saved CPN. It must be exactly 8 characters.".to_string();
                        self.form_index = 2;
                        self.load_current_input();
                    }
                    Err(e) => {
                        // The device is in memory; only the file write failed.
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.clamp_selection();
                        self.app_status = format!("Warning: device not saved to disk: {}", e);
                    }
                }
            }
            Mode::EditSecret { id } => {
                let secret = self.form_fields[0].clone();
                let verified = self
                    .devices
                    .get(id)
                    .map(|d| secret == d.saved_cpn || secret == d.security_key);
                match verified {
                    Some(true) => {
                        let prefill = self
                            .devices
                            .get(id)
                            .map(|d| vec![d.name.clone(), d.app_id.clone()])
                            .unwrap_or_default();
                        self.enter_mode(Mode::EditDevice { id, secret }, prefill);
                        self.app_status = "Editing device... (Esc to cancel)".to_string();
                    }
                    Some(false) => {
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.app_status = "Incorrect secret. Access denied.".to_string();
                    }
                    None => {
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.app_status = "Selected device not found.".to_string();
                    }
                }
            }
            Mode::EditDevice { id, secret } => {
                let name = self.form_fields[0].trim().to_string();
                let app_id = self.form_fields[1].trim().to_string();
                match self.devices.edit(id, &secret, &name, &app_id) {
                    Ok(device) => {
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.app_status =
                            format!("Device {} updated successfully! {}", device.id, NORMAL_KEYS);
                    }
                    Err(e @ (StoreError::Io(_) | StoreError::Json(_))) => {
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.app_status = format!("Warning: edit not saved to disk: {}", e);
                    }
                    Err(e) => {
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.app_status = e.to_string();
                    }
                }
            }
            Mode::ChangePassword => {
                let old = self.form_fields[0].clone();
                let new = self.form_fields[1].clone();
                let confirm = self.form_fields[2].clone();
                if new != confirm {
                    self.app_status = "New passwords do not match.".to_string();
                    self.form_index = 1;
                    self.load_current_input();
                    return;
                }
                let Some(username) = self.current_user.clone() else {
                    self.enter_mode(Mode::Normal, Vec::new());
                    self.app_status = "Not logged in.".to_string();
                    return;
                };
                match self.accounts.change_password(&username, &old, &new) {
                    Ok(()) => {
                        self.enter_mode(Mode::Normal, Vec::new());
                        self.app_status =
                            format!("Password changed successfully! {}", NORMAL_KEYS);
                    }
                    Err(e) => {
                        self.app_status = e.to_string();
                        self.form_index = 0;
                        self.load_current_input();
                    }
                }
            }
            Mode::PathPrompt { action } => {
                let path = PathBuf::from(self.form_fields[0].trim());
                let outcome = match action {
                    FileAction::Import => self
                        .devices
                        .import_from_file(&path)
                        .map(|n| format!("Imported {} devices.", n)),
                    FileAction::ExportAll => self
                        .devices
                        .export_all(&path)
                        .map(|n| format!("Exported {} devices.", n)),
                    FileAction::ExportSelected => {
                        let ids: Vec<u32> = self.marked.iter().copied().collect();
                        self.devices
                            .export_subset(&ids, &path)
                            .map(|n| format!("Exported {} devices.", n))
                    }
                };
                self.enter_mode(Mode::Normal, Vec::new());
                self.clamp_selection();
                match outcome {
                    Ok(msg) => {
                        if action == FileAction::ExportSelected {
                            self.marked.clear();
                        }
                        self.app_status = format!("{} {}", msg, NORMAL_KEYS);
                    }
                    Err(e) => {
                        log::error!("File operation on {:?} failed: {}", path, e);
                        self.app_status = format!("File error: {}", e);
                    }
                }
            }
            Mode::Normal | Mode::ConfirmLogout => {}
        }
    }

    fn logout(&mut self) {
        log::info!("User {:?} logged out.", self.current_user);
        self.current_user = None;
        self.marked.clear();
        self.table_state.select(None);
        self.enter_mode(Mode::Login, Vec::new());
        self.app_status = "Enter credentials. (Ctrl+n) Create Account | (Esc) Quit".to_string();
    }

    /// The device ID of the highlighted table row, resolved through the
    /// public listing so row order always matches what is on screen.
    fn selected_id(&self) -> Option<u32> {
        let index = self.table_state.selected()?;
        self.devices.list().get(index).map(|view| view.id)
    }

    fn move_selection(&mut self, delta: i32) {
        if self.devices.is_empty() {
            self.table_state.select(None);
            return;
        }
        let len = self.devices.len() as i32;
        let current = self.table_state.selected().unwrap_or(0) as i32;
        let new_index = (current + delta).clamp(0, len - 1);
        self.table_state.select(Some(new_index as usize));
    }

    fn clamp_selection(&mut self) {
        let len = self.devices.len();
        match self.table_state.selected() {
            _ if len == 0 => self.table_state.select(None),
            None => self.table_state.select(Some(0)),
            Some(i) if i >= len => self.table_state.select(Some(len - 1)),
            Some(_) => {}
        }
    }
}

pub fn run_tui(config: &Config) -> Result<(), TuiError> {
    log::info!("Initializing TUI...");
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);

    let res = run_app_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;

    log::info!("TUI shutdown complete.");
    res
}

fn run_app_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<(), TuiError> {
    while !app.should_quit {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    app.on_key(key_event);
                }
            }
        }
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    match app.mode {
        Mode::Login | Mode::CreateAccount => draw_form(f, app),
        Mode::Normal => draw_main_ui(f, app),
        Mode::ConfirmLogout => {
            draw_main_ui(f, app);
            draw_confirm_logout(f);
        }
        _ => {
            draw_main_ui(f, app);
            draw_form(f, app);
        }
    }
}

fn draw_main_ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.size());

    let listing = app.devices.list();
    let table_title = format!("Devices ({})", listing.len());
    let table_block = Block::default().borders(Borders::ALL).title(table_title);

    if listing.is_empty() {
        let empty_text = Paragraph::new("No devices. Press 'a' to add one or 'o' to import a file.")
            .block(table_block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(empty_text, chunks[0]);
    } else {
        let header = Row::new(["", "Device ID", "Name", "AppID", "Status"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows: Vec<Row> = listing
            .iter()
            .map(|view| {
                let mark = if app.marked.contains(&view.id) { "*" } else { "" };
                Row::new([
                    Cell::from(mark),
                    Cell::from(view.id.to_string()),
                    Cell::from(view.name.clone()),
                    Cell::from(view.app_id.clone()),
                    Cell::from(view.status.clone()),
                ])
            })
            .collect();
        let widths = [
            Constraint::Length(2),
            Constraint::Length(10),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Min(8),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(table_block)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::Gray))
            .highlight_symbol("> ");
        f.render_stateful_widget(table, chunks[0], &mut app.table_state);
    }

    let status_title = match &app.current_user {
        Some(user) => format!("Status - logged in as {}", user),
        None => "Status".to_string(),
    };
    let status_paragraph = Paragraph::new(app.app_status.clone())
        .block(Block::default().borders(Borders::ALL).title(status_title));
    f.render_widget(status_paragraph, chunks[1]);
}

fn draw_form(f: &mut Frame, app: &App) {
    let labels = app.mode.field_labels();
    let num_fields = labels.len();
    let height = (num_fields as u16 + 2) * 3 + 4;
    let form_area = centered_rect(60, height, f.size());
    f.render_widget(Clear, form_area);

    let form_block = Block::default().title(app.mode.title()).borders(Borders::ALL);
    f.render_widget(form_block, form_area);

    let mut constraints: Vec<Constraint> = vec![Constraint::Length(3); num_fields];
    constraints.push(Constraint::Min(1));
    constraints.push(Constraint::Length(2));
    let form_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(constraints)
        .split(form_area);

    for (i, label) in labels.iter().enumerate() {
        let value = if i == app.form_index {
            &app.current_input
        } else {
            &app.form_fields[i]
        };
        let display = if app.mode.is_masked(i) {
            "*".repeat(value.chars().count())
        } else {
            value.clone()
        };
        let display = if i == app.form_index {
            format!("{}▋", display)
        } else {
            display
        };

        let paragraph = Paragraph::new(display)
            .block(Block::default().borders(Borders::ALL).title(*label))
            .style(if i == app.form_index {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            });
        f.render_widget(paragraph, form_chunks[i]);
    }

    let help_text = Paragraph::new("(Tab) Next | (Enter) Next/Submit | (Esc) Cancel")
        .alignment(Alignment::Center);
    f.render_widget(help_text, form_chunks[num_fields + 1]);

    let status_line = Paragraph::new(app.app_status.clone())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(status_line, form_chunks[num_fields]);
}

fn draw_confirm_logout(f: &mut Frame) {
    let area = centered_rect(40, 5, f.size());
    f.render_widget(Clear, area);
    let text = Paragraph::new("Are you sure you want to logout? (y/n)")
        .block(Block::default().title("Logout").borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(text, area);
}

/// Helper to create a centered rect of fixed height for popups.
fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let v_margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(v_margin),
            Constraint::Length(height.min(r.height)),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
