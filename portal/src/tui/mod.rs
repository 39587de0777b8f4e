//! Terminal UI for the document request wizard.
//!
//! Layout:
//! - Centered window titled "Document Request Portal"
//! - Document picker, then the wizard for the picked document
//! - Stepper row at the top of the wizard; only the current step shows its title
//! - Active step's inputs; required ones carry `*`, highlighted ones a red `!`
//! - Error line above the bottom button row: [ Back ] [ Next ] [ Cancel ]
//!   (Next reads "Confirm" when it submits)
//! - Busy overlay while the submission is in flight
//!
//! Note: Logging is file-only in TUI mode (stdout logging is disabled) to avoid
//! corrupting the terminal UI.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::info;
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

use crate::backend::{AuthUser, Services};
use crate::config::Collections;
use crate::models::request::DocumentType;
use crate::smoke::fill_active_step;
use crate::wizard::catalog::blueprint;
use crate::wizard::commit::BackendCommit;
use crate::wizard::controller::Transition;
use crate::wizard::files::PendingFile;
use crate::wizard::group::{FieldKind, FieldSpec, SlotSpec};
use crate::wizard::page::WizardPage;

const WINDOW_TITLE: &str = "Document Request Portal";
const SMOKE_WIDTH: u16 = 100;
const SMOKE_HEIGHT: u16 = 30;

/// What the TUI needs to build wizards.
#[derive(Clone)]
pub struct PortalSession {
    pub services: Services,
    pub collections: Collections,
    pub copies: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonFocus {
    Back,
    Next,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Item(usize),
    Button(ButtonFocus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    Cancel,
    FilePath { slot: String, label: String, input: String },
    Message { title: String, body: String },
}

/// One focusable input of the active step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Field(FieldSpec),
    Slot(SlotSpec),
}

struct PortalState {
    picker_index: usize,
    page: Option<WizardPage>,
    focus: Focus,
    modal: Option<Modal>,
    /// Next was pressed on the submitting step; the commit runs after the
    /// busy overlay has been drawn.
    submitting: bool,
    quit: bool,
}

impl PortalState {
    fn new() -> Self {
        Self {
            picker_index: 0,
            page: None,
            focus: Focus::Item(0),
            modal: None,
            submitting: false,
            quit: false,
        }
    }

    fn open(&mut self, document_type: DocumentType, session: &PortalSession) {
        let committer = Arc::new(BackendCommit::new(
            session.services.clone(),
            session.collections.clone(),
            document_type,
        ));
        self.page = Some(WizardPage::new(
            blueprint(document_type),
            session.copies,
            committer,
        ));
        self.focus = Focus::Item(0);
        info!(
            "[PHASE: tui] [STEP: open] Opened {} wizard",
            document_type
        );
    }
}

/// Inputs of the active step, in display order.
fn step_items(page: &WizardPage) -> Vec<Item> {
    let Some(groups) = page.active_groups() else {
        return Vec::new();
    };
    let fields = groups
        .fields
        .iter()
        .flat_map(|g| g.fields().iter().cloned().map(Item::Field));
    let slots = groups
        .uploads
        .iter()
        .flat_map(|g| g.slots().iter().cloned().map(Item::Slot));
    fields.chain(slots).collect()
}

fn field_value(page: &WizardPage, key: &str) -> String {
    page.active_groups()
        .and_then(|groups| groups.fields.iter().find(|g| g.has_field(key)))
        .map(|g| g.value(key))
        .unwrap_or_default()
}

fn selected_files(page: &WizardPage, slot: &str) -> Vec<PendingFile> {
    page.active_groups()
        .and_then(|groups| groups.uploads.iter().find(|g| g.has_slot(slot)))
        .map(|g| g.selected(slot).to_vec())
        .unwrap_or_default()
}

fn focus_order(item_count: usize) -> Vec<Focus> {
    (0..item_count)
        .map(Focus::Item)
        .chain([
            Focus::Button(ButtonFocus::Back),
            Focus::Button(ButtonFocus::Next),
            Focus::Button(ButtonFocus::Cancel),
        ])
        .collect()
}

fn move_focus(state: &mut PortalState, item_count: usize, forward: bool) {
    let order = focus_order(item_count);
    let pos = order.iter().position(|f| *f == state.focus).unwrap_or(0);
    let len = order.len();
    let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
    state.focus = order[next];
}

fn cycle_choice(options: &[&str], current: &str, forward: bool) -> String {
    if options.is_empty() {
        return String::new();
    }
    let next = match options.iter().position(|o| *o == current) {
        None => 0,
        Some(i) if forward => (i + 1) % options.len(),
        Some(i) => (i + options.len() - 1) % options.len(),
    };
    options[next].to_string()
}

pub(crate) fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

pub fn run(session: PortalSession) -> Result<()> {
    info!("[PHASE: tui] [STEP: start] Starting TUI wizard");

    let rt = runtime()?;
    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &session, &rt);
    restore_terminal(&mut terminal)?;

    result
}

/// Non-interactive smoke mode: render a single frame and exit.
/// Targets: `picker`, or `<document>[:<step>]`, e.g. `residency:3`.
pub fn smoke(target: &str) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke target={}",
        target
    );
    let screen = render_smoke(target)?;
    info!(
        "[PHASE: tui] [STEP: smoke] Rendered {} lines",
        screen.lines().count()
    );
    Ok(())
}

fn parse_smoke_target(target: &str) -> Result<Option<(DocumentType, usize)>> {
    let t = target.trim().to_ascii_lowercase();
    if t.is_empty() || t == "picker" {
        return Ok(None);
    }
    let (doc, step) = match t.split_once(':') {
        Some((doc, step)) => (
            doc,
            step.parse::<usize>()
                .with_context(|| format!("Invalid smoke step: '{}'", step))?,
        ),
        None => (t.as_str(), 1),
    };
    Ok(Some((doc.parse::<DocumentType>()?, step.max(1))))
}

fn render_smoke(target: &str) -> Result<String> {
    let mut state = PortalState::new();
    if let Some((document_type, step)) = parse_smoke_target(target)? {
        let rt = runtime()?;
        let (services, auth) = Services::in_memory();
        rt.block_on(auth.sign_in(AuthUser {
            uid: "smoke-user".to_string(),
            email: "smoke@example.com".to_string(),
        }));
        let session = PortalSession {
            services,
            collections: Collections::default(),
            copies: 1,
        };
        state.open(document_type, &session);
        if let Some(page) = state.page.as_mut() {
            while page.current_step() < step && !page.controller().on_terminal() {
                fill_active_step(page)?;
                let transition = rt.block_on(page.next());
                if !matches!(
                    transition,
                    Transition::Advanced { .. } | Transition::Submitted { .. }
                ) {
                    break;
                }
            }
        }
    }
    render_to_string(&state, SMOKE_WIDTH, SMOKE_HEIGHT)
}

fn render_to_string(state: &PortalState, width: u16, height: u16) -> Result<String> {
    // In-memory backend: no raw mode or alternate screen.
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, state))?;

    let buffer = terminal.backend().buffer();
    let mut screen = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            screen.push_str(buffer.get(x, y).symbol());
        }
        screen.push('\n');
    }
    Ok(screen)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &PortalSession,
    rt: &Runtime,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut state = PortalState::new();

    while !state.quit {
        terminal.draw(|f| draw(f.size(), f, &state))?;

        if state.submitting {
            finish_submit(&mut state, rt);
            continue;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut state, key.code, session, rt);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

fn finish_submit(state: &mut PortalState, rt: &Runtime) {
    state.submitting = false;
    let Some(page) = state.page.as_mut() else {
        return;
    };
    let transition = rt.block_on(page.next());
    apply_transition(state, &transition);
}

fn apply_transition(state: &mut PortalState, transition: &Transition) {
    match transition {
        Transition::Advanced { .. } | Transition::Retreated { .. } => {
            state.focus = Focus::Item(0);
        }
        Transition::Submitted { receipt, .. } => {
            info!(
                "[PHASE: tui] [STEP: submit] Request {} submitted",
                receipt.request_id
            );
        }
        // Blocked and CommitFailed leave the error line set; keep focus on Next.
        _ => {}
    }
}

fn handle_key(state: &mut PortalState, code: KeyCode, session: &PortalSession, rt: &Runtime) {
    if state.modal.is_some() {
        handle_modal_key(state, code, rt);
        return;
    }

    if state.page.is_none() {
        match code {
            KeyCode::Up => state.picker_index = state.picker_index.saturating_sub(1),
            KeyCode::Down => {
                state.picker_index = (state.picker_index + 1).min(DocumentType::ALL.len() - 1)
            }
            KeyCode::Enter => {
                let document_type = DocumentType::ALL[state.picker_index];
                state.open(document_type, session);
            }
            KeyCode::Esc | KeyCode::Char('q') => state.quit = true,
            _ => {}
        }
        return;
    }
    let Some(page) = state.page.as_mut() else {
        return;
    };

    if page.controller().on_terminal() {
        if matches!(code, KeyCode::Enter | KeyCode::Esc) {
            state.quit = true;
        }
        return;
    }

    let items = step_items(page);
    match code {
        KeyCode::Tab | KeyCode::Down => {
            move_focus(state, items.len(), true);
            return;
        }
        KeyCode::BackTab | KeyCode::Up => {
            move_focus(state, items.len(), false);
            return;
        }
        KeyCode::Esc => {
            state.modal = Some(Modal::Cancel);
            return;
        }
        _ => {}
    }

    match state.focus {
        Focus::Item(index) => match items.get(index) {
            Some(Item::Field(spec)) => {
                if code == KeyCode::Enter {
                    move_focus(state, items.len(), true);
                } else {
                    edit_field(page, spec, code);
                }
            }
            Some(Item::Slot(spec)) => match code {
                KeyCode::Enter => {
                    state.modal = Some(Modal::FilePath {
                        slot: spec.key.clone(),
                        label: spec.label.clone(),
                        input: String::new(),
                    });
                }
                KeyCode::Delete | KeyCode::Backspace => {
                    for file in selected_files(page, &spec.key) {
                        if let Err(e) = page.cancel_file(&spec.key, &file.file_name) {
                            log::warn!("[PHASE: tui] [STEP: cancel_file] {}", e);
                        }
                    }
                }
                _ => {}
            },
            None => state.focus = Focus::Button(ButtonFocus::Next),
        },
        Focus::Button(button) => match code {
            KeyCode::Left => {
                state.focus = Focus::Button(match button {
                    ButtonFocus::Cancel => ButtonFocus::Next,
                    _ => ButtonFocus::Back,
                })
            }
            KeyCode::Right => {
                state.focus = Focus::Button(match button {
                    ButtonFocus::Back => ButtonFocus::Next,
                    _ => ButtonFocus::Cancel,
                })
            }
            KeyCode::Enter => match button {
                ButtonFocus::Back => {
                    let transition = page.back();
                    apply_transition(state, &transition);
                }
                ButtonFocus::Next => {
                    let draft = page.draft().get();
                    let files = page.files().snapshot();
                    let controller = page.controller();
                    if controller.next_commits() && controller.current_complete(&draft, &files) {
                        state.submitting = true;
                    } else {
                        let transition = rt.block_on(page.next());
                        apply_transition(state, &transition);
                    }
                }
                ButtonFocus::Cancel => state.modal = Some(Modal::Cancel),
            },
            _ => {}
        },
    }
}

fn edit_field(page: &mut WizardPage, spec: &FieldSpec, code: KeyCode) {
    let current = field_value(page, &spec.key);
    let updated = match (spec.kind, code) {
        (FieldKind::Choice(options), KeyCode::Left) => cycle_choice(options, &current, false),
        (FieldKind::Choice(options), KeyCode::Right | KeyCode::Char(' ')) => {
            cycle_choice(options, &current, true)
        }
        (FieldKind::Choice(_), _) => return,
        (FieldKind::Number, KeyCode::Char(c)) if !c.is_ascii_digit() => return,
        (_, KeyCode::Char(c)) => {
            let mut v = current;
            v.push(c);
            v
        }
        (_, KeyCode::Backspace) => {
            let mut v = current;
            v.pop();
            v
        }
        _ => return,
    };
    if let Err(e) = page.set_field(&spec.key, updated) {
        log::warn!("[PHASE: tui] [STEP: edit] {}", e);
    }
}

fn handle_modal_key(state: &mut PortalState, code: KeyCode, rt: &Runtime) {
    let Some(modal) = state.modal.take() else {
        return;
    };
    match modal {
        Modal::Cancel => match code {
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                info!("[PHASE: tui] [STEP: cancel] Wizard cancelled by user");
                state.quit = true;
            }
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {}
            _ => state.modal = Some(Modal::Cancel),
        },
        Modal::FilePath {
            slot,
            label,
            mut input,
        } => match code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                let loaded = rt.block_on(PendingFile::from_path(Path::new(input.trim())));
                match (loaded, state.page.as_mut()) {
                    (Ok(file), Some(page)) => {
                        if let Err(e) = page.select_file(&slot, file) {
                            log::warn!("[PHASE: tui] [STEP: select_file] {}", e);
                        }
                    }
                    (Err(e), _) => {
                        log::warn!("[PHASE: tui] [STEP: select_file] {:#}", e);
                        state.modal = Some(Modal::Message {
                            title: "File not loaded".to_string(),
                            body: format!("{:#}", e),
                        });
                    }
                    (Ok(_), None) => {}
                }
            }
            KeyCode::Backspace => {
                input.pop();
                state.modal = Some(Modal::FilePath { slot, label, input });
            }
            KeyCode::Char(c) => {
                input.push(c);
                state.modal = Some(Modal::FilePath { slot, label, input });
            }
            _ => state.modal = Some(Modal::FilePath { slot, label, input }),
        },
        Modal::Message { .. } => {}
    }
}

// =============================================================================
// Drawing
// =============================================================================

fn draw(area: Rect, f: &mut ratatui::Frame<'_>, state: &PortalState) {
    let (window_area, _) = centered_window(area, 100, 30);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(WINDOW_TITLE);
    f.render_widget(outer_block, window_area);

    let inner = window_area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    });

    match &state.page {
        None => draw_picker(f, inner, state),
        Some(page) => draw_wizard(f, inner, state, page),
    }

    match &state.modal {
        Some(Modal::Cancel) => draw_modal(
            f,
            window_area,
            "Discard request?",
            vec![
                Line::from("Your answers will be lost."),
                Line::from(""),
                Line::from("[ Yes, discard ] (y)    [ No ] (n)"),
            ],
        ),
        Some(Modal::FilePath { label, input, .. }) => draw_modal(
            f,
            window_area,
            &format!("Select file: {}", label),
            vec![
                Line::from("Path to the file, then Enter (Esc to go back):"),
                Line::from(""),
                Line::from(format!("> {}", input)),
            ],
        ),
        Some(Modal::Message { title, body }) => draw_modal(
            f,
            window_area,
            title,
            vec![Line::from(body.as_str()), Line::from(""), Line::from("Press any key.")],
        ),
        None => {}
    }

    if state.submitting {
        draw_modal(
            f,
            window_area,
            "Please wait",
            vec![Line::from("Submitting your request...")],
        );
    }
}

fn centered_window(area: Rect, width: u16, height: u16) -> (Rect, Rect) {
    let w = width.min(area.width.saturating_sub(2)).max(60).min(area.width);
    let h = height.min(area.height.saturating_sub(2)).max(20).min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    let rect = Rect {
        x,
        y,
        width: w,
        height: h,
    };
    (rect, rect)
}

fn draw_picker(f: &mut ratatui::Frame<'_>, area: Rect, state: &PortalState) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Request a document",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (i, doc) in DocumentType::ALL.iter().enumerate() {
        let selected = i == state.picker_index;
        let style = if selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let cursor = if selected { ">" } else { " " };
        lines.push(Line::from(Span::styled(format!("{} {}", cursor, doc), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Up/Down to choose, Enter to start, Esc to quit."));
    f.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn draw_wizard(f: &mut ratatui::Frame<'_>, area: Rect, state: &PortalState, page: &WizardPage) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    draw_stepper(f, rows[0], page);

    let body_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} request", page.document_type()));
    let body_area = body_block.inner(rows[1]);
    f.render_widget(body_block, rows[1]);

    if page.controller().on_terminal() {
        draw_complete(f, body_area, page);
        return;
    }

    f.render_widget(
        Paragraph::new(step_lines(state, page)).wrap(Wrap { trim: false }),
        body_area,
    );

    if let Some(error) = page.error() {
        let p = Paragraph::new(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
        f.render_widget(p, rows[2]);
    }

    draw_buttons(f, rows[3], state, page);
}

fn draw_stepper(f: &mut ratatui::Frame<'_>, area: Rect, page: &WizardPage) {
    let indicators = page.stepper();
    let mut circles = Vec::new();
    let mut current_title = String::new();
    for (i, ind) in indicators.iter().enumerate() {
        if i > 0 {
            circles.push(Span::styled("──", Style::default().fg(Color::DarkGray)));
        }
        let (symbol, style) = if ind.completed {
            ("✓", Style::default().fg(Color::Green))
        } else if ind.highlighted {
            ("●", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        } else {
            ("○", Style::default().fg(Color::DarkGray))
        };
        circles.push(Span::styled(format!("({}{})", symbol, ind.number), style));
        if ind.label_visible() {
            current_title = ind.description.clone();
        }
    }
    let text = Text::from(vec![
        Line::from(circles),
        Line::from(Span::styled(
            format!(
                "Step {} of {}: {}",
                page.current_step(),
                indicators.len(),
                current_title
            ),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ]);
    f.render_widget(Paragraph::new(text), area);
}

fn step_lines(state: &PortalState, page: &WizardPage) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let Some(groups) = page.active_groups() else {
        return Text::from(lines);
    };
    let mut index = 0usize;
    let marker = |highlighted: bool| {
        if highlighted {
            Span::styled("! ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        } else {
            Span::raw("  ")
        }
    };

    for group in &groups.fields {
        lines.push(Line::from(Span::styled(
            group.title().to_string(),
            Style::default().add_modifier(Modifier::UNDERLINED),
        )));
        for spec in group.fields() {
            let focused = state.focus == Focus::Item(index);
            let highlighted = group.is_highlighted(&spec.key);
            let value = group.value(&spec.key);
            let shown = match spec.kind {
                FieldKind::Choice(_) if value.is_empty() => "< choose >".to_string(),
                FieldKind::Choice(_) => format!("< {} >", value),
                _ => value,
            };
            lines.push(input_line(
                marker(highlighted),
                &spec.label,
                spec.required,
                shown,
                focused,
                highlighted,
            ));
            index += 1;
        }
    }
    for group in &groups.uploads {
        lines.push(Line::from(Span::styled(
            group.title().to_string(),
            Style::default().add_modifier(Modifier::UNDERLINED),
        )));
        for spec in group.slots() {
            let focused = state.focus == Focus::Item(index);
            let highlighted = group.is_highlighted(&spec.key);
            let shown = match group.selected(&spec.key) {
                [] => "(no file, Enter to choose)".to_string(),
                files => files
                    .iter()
                    .map(|file| format!("{} ({} bytes)", file.file_name, file.len()))
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            lines.push(input_line(
                marker(highlighted),
                &spec.label,
                spec.required,
                shown,
                focused,
                highlighted,
            ));
            index += 1;
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab/Up/Down move, type to edit, Left/Right choose, Esc cancels.",
        Style::default().fg(Color::DarkGray),
    )));
    Text::from(lines)
}

fn input_line(
    marker: Span<'static>,
    label: &str,
    required: bool,
    value: String,
    focused: bool,
    highlighted: bool,
) -> Line<'static> {
    let mut label_style = Style::default();
    if highlighted {
        label_style = label_style.fg(Color::Red);
    }
    if focused {
        label_style = label_style.add_modifier(Modifier::REVERSED);
    }
    Line::from(vec![
        marker,
        Span::styled(
            format!("{}{}:", label, if required { "*" } else { "" }),
            label_style,
        ),
        Span::raw(" "),
        Span::raw(value),
    ])
}

fn draw_complete(f: &mut ratatui::Frame<'_>, area: Rect, page: &WizardPage) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Request submitted.",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Track its status from the tracking view."),
    ];
    if let Some(receipt) = page.receipt() {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Reference: {}", receipt.request_id)));
        lines.push(Line::from(format!("Files uploaded: {}", receipt.uploads.len())));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Press Enter to exit."));
    f.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn draw_buttons(f: &mut ratatui::Frame<'_>, area: Rect, state: &PortalState, page: &WizardPage) {
    let controller = page.controller();
    let busy = controller.is_busy() || state.submitting;
    let next_label = if controller.next_commits() { "Confirm" } else { "Next" };

    let back = button_text(
        "Back",
        state.focus == Focus::Button(ButtonFocus::Back),
        controller.can_go_back() && !busy,
    );
    let next = button_text(
        next_label,
        state.focus == Focus::Button(ButtonFocus::Next),
        !busy,
    );
    let cancel = button_text(
        "Cancel",
        state.focus == Focus::Button(ButtonFocus::Cancel),
        !busy,
    );

    let line = Line::from(vec![back, Span::raw(" "), next, Span::raw(" "), cancel]);
    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, area);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn draw_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, title: &str, body: Vec<Line<'_>>) {
    let modal_w = 60u16.min(window_area.width.saturating_sub(4)).max(40);
    let modal_h = (body.len() as u16 + 2).max(5);
    let x = window_area.x + (window_area.width.saturating_sub(modal_w)) / 2;
    let y = window_area.y + (window_area.height.saturating_sub(modal_h)) / 2;
    let area = Rect {
        x,
        y,
        width: modal_w.min(window_area.width),
        height: modal_h.min(window_area.height),
    };

    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let p = Paragraph::new(Text::from(body))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
