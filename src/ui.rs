use crate::modal::ModalState;
use crate::model::{Note, NoteDraft, CONTENT_MAX_CHARS, TITLE_MAX_CHARS};
use crate::store::NoteStore;
use crate::sync::{
    DeleteOutcome, DeleteRequest, LoadOutcome, LoadRequest, Notice, SaveOutcome, SaveRequest,
    SyncController,
};
use crate::theme::{Theme, ThemePreference};
use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use log::{error, info};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::Instant;
use tokio::sync::mpsc;

/// Runs the interactive client until the user quits. Must be called inside a
/// `LocalSet`: store calls are spawned as local tasks.
pub async fn run<S: NoteStore + 'static>(
    controller: SyncController<S>,
    theme: ThemePreference,
    endpoint: String,
) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut terminal = setup_terminal()?;
    let mut app = App::new(controller, theme, endpoint, tx);
    let result = app.event_loop(&mut terminal, rx).await;
    teardown_terminal(&mut terminal)?;
    result
}

enum AppMessage {
    Key(KeyEvent),
    Redraw,
    Loaded(LoadOutcome),
    Saved(SaveOutcome),
    Deleted(DeleteOutcome),
}

struct App<S> {
    controller: SyncController<S>,
    theme: ThemePreference,
    endpoint: String,
    tx: mpsc::UnboundedSender<AppMessage>,
    form: Option<NoteForm>,
    status: Option<Notice>,
    hint: String,
    last_sync: Option<Instant>,
    loading: usize,
    list_offset: usize,
}

struct NoteForm {
    title: FieldValue,
    content: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Content,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
    limit: usize,
}

impl FieldValue {
    fn new(value: &str, limit: usize) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
            limit,
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char(self.cursor, &self.value);
    }

    fn move_up(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx == 0 {
            return;
        }
        let target_start = line_starts[line_idx - 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn move_down(&mut self) {
        let (line_starts, line_idx, col) = line_state(&self.value, self.cursor);
        if line_idx + 1 >= line_starts.len() {
            return;
        }
        let target_start = line_starts[line_idx + 1];
        self.cursor = index_at_col(&self.value, target_start, col);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    /// Refuses input past the field's character limit.
    fn insert_char(&mut self, ch: char) -> bool {
        if self.value.chars().count() >= self.limit {
            return false;
        }
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        true
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl NoteForm {
    fn new() -> Self {
        NoteForm {
            title: FieldValue::new("", TITLE_MAX_CHARS),
            content: FieldValue::new("", CONTENT_MAX_CHARS),
            field: FormField::Title,
        }
    }

    fn from_note(note: &Note) -> Self {
        NoteForm {
            title: FieldValue::new(&note.title, TITLE_MAX_CHARS),
            content: FieldValue::new(&note.content, CONTENT_MAX_CHARS),
            field: FormField::Title,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Content,
            FormField::Content => FormField::Title,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Content => &mut self.content,
        }
    }

    fn to_draft(&self) -> NoteDraft {
        NoteDraft::new(self.title.value.trim(), self.content.value.clone())
    }
}

/// Colors for one theme.
struct Palette {
    background: Color,
    surface: Color,
    text: Color,
    muted: Color,
    accent: Color,
    danger: Color,
    selected_bg: Color,
    selected_fg: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                background: Color::Rgb(250, 250, 252),
                surface: Color::Rgb(255, 255, 255),
                text: Color::Rgb(30, 32, 40),
                muted: Color::Rgb(120, 124, 136),
                accent: Color::Rgb(25, 118, 210),
                danger: Color::Rgb(198, 40, 40),
                selected_bg: Color::Rgb(227, 238, 252),
                selected_fg: Color::Rgb(13, 71, 161),
            },
            Theme::Dark => Palette {
                background: Color::Rgb(16, 18, 24),
                surface: Color::Rgb(22, 24, 30),
                text: Color::Rgb(220, 222, 228),
                muted: Color::DarkGray,
                accent: Color::LightCyan,
                danger: Color::LightRed,
                selected_bg: Color::Rgb(252, 214, 112),
                selected_fg: Color::Black,
            },
        }
    }
}

impl<S: NoteStore + 'static> App<S> {
    fn new(
        controller: SyncController<S>,
        theme: ThemePreference,
        endpoint: String,
        tx: mpsc::UnboundedSender<AppMessage>,
    ) -> Self {
        App {
            controller,
            theme,
            endpoint,
            tx,
            form: None,
            status: None,
            hint: "Loading notes...".into(),
            last_sync: None,
            loading: 0,
            list_offset: 0,
        }
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        mut rx: mpsc::UnboundedReceiver<AppMessage>,
    ) -> Result<()> {
        let request = self.controller.request_load();
        self.spawn_load(request);
        self.spawn_input();

        loop {
            terminal.draw(|f| self.draw(f))?;
            let Some(message) = rx.recv().await else {
                break;
            };
            let quit = match message {
                AppMessage::Key(key) => self.handle_key(key),
                AppMessage::Redraw => false,
                AppMessage::Loaded(outcome) => {
                    self.loading = self.loading.saturating_sub(1);
                    self.last_sync = Some(Instant::now());
                    self.controller.apply_load(outcome);
                    false
                }
                AppMessage::Saved(outcome) => {
                    if let Some(reload) = self.controller.apply_save(outcome) {
                        self.spawn_load(reload);
                    }
                    false
                }
                AppMessage::Deleted(outcome) => {
                    if let Some(reload) = self.controller.apply_delete(outcome) {
                        self.spawn_load(reload);
                    }
                    false
                }
            };
            self.after_message();
            if quit {
                break;
            }
        }
        Ok(())
    }

    /// Keeps view-only state in line with the controller after every message.
    fn after_message(&mut self) {
        if let Some(notice) = self.controller.take_notice() {
            self.status = Some(notice);
        }
        if !self.controller.modal().is_editing() {
            self.form = None;
        }
    }

    fn spawn_input(&self) {
        let tx = self.tx.clone();
        tokio::task::spawn_local(async move {
            let mut reader = EventStream::new();
            while let Some(event) = reader.next().await {
                let message = match event {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => AppMessage::Key(key),
                    Ok(Event::Resize(_, _)) => AppMessage::Redraw,
                    Ok(_) => continue,
                    Err(err) => {
                        error!("event=input_error error={}", err);
                        break;
                    }
                };
                if tx.send(message).is_err() {
                    break;
                }
            }
        });
    }

    fn spawn_load(&mut self, request: LoadRequest) {
        self.loading += 1;
        let store = self.controller.store();
        let tx = self.tx.clone();
        tokio::task::spawn_local(async move {
            let outcome = SyncController::<S>::perform_load(&store, request).await;
            let _ = tx.send(AppMessage::Loaded(outcome));
        });
    }

    fn spawn_save(&self, request: SaveRequest) {
        let store = self.controller.store();
        let tx = self.tx.clone();
        tokio::task::spawn_local(async move {
            let outcome = SyncController::<S>::perform_save(&store, request).await;
            let _ = tx.send(AppMessage::Saved(outcome));
        });
    }

    fn spawn_delete(&self, request: DeleteRequest) {
        let store = self.controller.store();
        let tx = self.tx.clone();
        tokio::task::spawn_local(async move {
            let outcome = SyncController::<S>::perform_delete(&store, request).await;
            let _ = tx.send(AppMessage::Deleted(outcome));
        });
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.controller.modal() {
            ModalState::Closed => self.handle_normal_key(key),
            ModalState::Editing { .. } => {
                self.handle_form_key(key);
                false
            }
            ModalState::ConfirmingDelete { .. } => {
                self.handle_confirm_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Home | KeyCode::Char('g') => self.select_index(0),
            KeyCode::End | KeyCode::Char('G') => {
                let last = self.controller.notes().len().saturating_sub(1);
                self.select_index(last);
            }
            KeyCode::Char('n') => {
                self.controller.open_create();
                self.form = Some(NoteForm::new());
                self.hint = "New note (Tab switch field, Ctrl+S save, Esc cancel)".into();
            }
            KeyCode::Char('e') => match self.controller.selected_note().cloned() {
                Some(note) => {
                    self.hint = format!("Editing \"{}\"", note.display_title());
                    self.form = Some(NoteForm::from_note(&note));
                    self.controller.open_edit(note);
                }
                None => self.hint = "No note selected to edit".into(),
            },
            KeyCode::Char('d') => match self.controller.selected_note().cloned() {
                Some(note) => {
                    self.hint = "Delete? (y to confirm, n/Esc to cancel)".into();
                    self.controller.open_delete(note);
                }
                None => self.hint = "No note selected to delete".into(),
            },
            KeyCode::Char('r') => {
                let request = self.controller.request_load();
                self.spawn_load(request);
                self.hint = "Reloading...".into();
            }
            KeyCode::Char('t') => match self.theme.toggle() {
                Ok(theme) => self.hint = format!("Switched to {} theme", theme),
                Err(err) => {
                    error!("event=theme_persist status=error error={:#}", err);
                    self.hint = format!("Could not save theme: {}", err);
                }
            },
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.controller.cancel_modal();
            self.form = None;
            self.hint = "Canceled".into();
            return;
        }
        if self.controller.modal().is_submitting() {
            return;
        }
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        let mut submit = false;
        match key.code {
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Up => form.active_field_mut().move_up(),
            KeyCode::Down => form.active_field_mut().move_down(),
            KeyCode::Enter => {
                if form.field == FormField::Content && !control {
                    form.active_field_mut().insert_char('\n');
                } else {
                    submit = true;
                }
            }
            KeyCode::Char('s') if control => submit = true,
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    && !form.active_field_mut().insert_char(c)
                {
                    self.hint = "Field is full".into();
                }
            }
            _ => {}
        }
        if submit {
            self.submit_form();
        }
    }

    fn submit_form(&mut self) {
        let Some(draft) = self.form.as_ref().map(NoteForm::to_draft) else {
            return;
        };
        if let Some(request) = self.controller.request_save(draft) {
            info!("event=save_dispatched");
            self.hint = "Saving...".into();
            self.spawn_save(request);
        }
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(request) = self.controller.request_delete() {
                    self.hint = "Deleting...".into();
                    self.spawn_delete(request);
                }
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.controller.cancel_modal();
                self.hint = "Delete canceled".into();
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let notes = self.controller.notes();
        if notes.is_empty() {
            return;
        }
        let next = match self
            .controller
            .selection()
            .selected()
            .and_then(|id| notes.position(id))
        {
            Some(current) => current
                .saturating_add_signed(delta)
                .min(notes.len() - 1),
            None => 0,
        };
        self.select_index(next);
    }

    fn select_index(&mut self, index: usize) {
        let id = self.controller.notes().at(index).map(|n| n.id.clone());
        if id.is_some() {
            self.controller.select(id);
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let palette = Palette::for_theme(self.theme.theme());
        f.render_widget(
            Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
            f.size(),
        );
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0], &palette);
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(layout[1]);
        self.draw_list(f, body[0], &palette);
        self.draw_detail(f, body[1], &palette);
        self.draw_footer(f, layout[2], &palette);

        match self.controller.modal() {
            ModalState::Editing { target, submitting } => {
                let title = if target.is_some() { "Edit Note" } else { "New Note" };
                if let Some(form) = &self.form {
                    draw_form(f, title, form, *submitting, &palette);
                }
            }
            ModalState::ConfirmingDelete { target, submitting } => {
                draw_confirm(f, target, *submitting, &palette);
            }
            ModalState::Closed => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let sync = if self.loading > 0 {
            "syncing...".to_string()
        } else {
            match self.last_sync {
                Some(at) => format!("synced {}", format_elapsed(at)),
                None => "not synced".to_string(),
            }
        };
        let title = Line::from(vec![
            Span::styled(
                "notedesk ",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.endpoint.clone(), Style::default().fg(palette.muted)),
            Span::raw("  •  "),
            Span::styled(
                format!("{} notes", self.controller.notes().len()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(sync, Style::default().fg(palette.muted)),
            Span::raw("  •  "),
            Span::styled(
                format!("theme {}", self.theme.theme()),
                Style::default().fg(palette.accent),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(palette.muted));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_list(&mut self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let block = Block::default()
            .title(Span::styled(
                "All Notes",
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.accent))
            .style(Style::default().bg(palette.surface));

        let notes = self.controller.notes();
        if notes.is_empty() {
            let empty = Paragraph::new("No notes. Create the first one!")
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted))
                .block(block);
            f.render_widget(empty, area);
            return;
        }

        let width = area.width.saturating_sub(4) as usize;
        let selected = self
            .controller
            .selection()
            .selected()
            .and_then(|id| notes.position(id));
        let items = notes
            .iter()
            .map(|note| note_item(note, width, palette))
            .collect::<Vec<_>>();
        let viewport = visible_items(area.height);
        if let Some(sel) = selected {
            self.list_offset = adjust_offset(sel, self.list_offset, viewport, items.len());
        }
        let mut state = ListState::default();
        state.select(selected);
        *state.offset_mut() = self.list_offset.min(items.len().saturating_sub(1));

        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(palette.selected_bg)
                .fg(palette.selected_fg)
                .add_modifier(Modifier::BOLD),
        );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_detail(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.muted))
            .style(Style::default().bg(palette.surface));
        let Some(note) = self.controller.selected_note() else {
            let empty = Paragraph::new("Select a note to view its content.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(palette.muted))
                .block(block);
            f.render_widget(empty, area);
            return;
        };

        let mut lines = vec![
            Line::from(Span::styled(
                note.display_title().to_string(),
                Style::default()
                    .fg(palette.text)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("id {}", note.id),
                Style::default().fg(palette.muted),
            )),
            Line::from(""),
        ];
        if note.content.is_empty() {
            lines.push(Line::from(Span::styled(
                "(No content)",
                Style::default()
                    .fg(palette.muted)
                    .add_modifier(Modifier::ITALIC),
            )));
        } else {
            lines.extend(note.content.lines().map(|l| Line::from(l.to_string())));
        }
        let detail = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(block);
        f.render_widget(detail, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect, palette: &Palette) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(footer_help_line(palette))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(palette.muted)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let status = match &self.status {
            Some(notice) => Span::styled(
                notice.to_string(),
                Style::default().fg(if notice.is_error() {
                    palette.danger
                } else {
                    palette.text
                }),
            ),
            None => Span::raw(""),
        };
        f.render_widget(Paragraph::new(Line::from(status)), bottom[0]);
        f.render_widget(
            Paragraph::new(self.hint.clone())
                .alignment(Alignment::Right)
                .style(Style::default().fg(palette.muted)),
            bottom[1],
        );
    }
}

fn footer_help_line(palette: &Palette) -> Line<'static> {
    let key = Style::default().fg(palette.accent);
    let danger = Style::default().fg(palette.danger);
    Line::from(vec![
        Span::styled("↑↓ / j k", key),
        Span::raw(" select  "),
        Span::styled("n", key),
        Span::raw(" new  "),
        Span::styled("e", key),
        Span::raw(" edit  "),
        Span::styled("d", danger),
        Span::raw(" delete  "),
        Span::styled("r", key),
        Span::raw(" reload  "),
        Span::styled("t", key),
        Span::raw(" theme  "),
        Span::styled("q", danger),
        Span::raw(" quit"),
    ])
}

fn draw_form(
    f: &mut ratatui::Frame<'_>,
    title: &str,
    form: &NoteForm,
    submitting: bool,
    palette: &Palette,
) {
    let area = centered_rect(70, 60, f.size());
    let mut fields = Vec::new();
    fields.extend(field_lines(
        "Title",
        &form.title,
        form.field == FormField::Title,
        palette,
    ));
    fields.push(Line::from(""));
    fields.extend(field_lines(
        "Content",
        &form.content,
        form.field == FormField::Content,
        palette,
    ));
    fields.push(Line::from(""));
    let footer = if submitting {
        "Saving...".to_string()
    } else {
        format!(
            "Ctrl+S to save • Esc to cancel • Tab to switch field • {}/{} chars",
            form.content.value.chars().count(),
            CONTENT_MAX_CHARS
        )
    };
    fields.push(Line::from(Span::styled(
        footer,
        Style::default().fg(palette.muted),
    )));
    let dialog = Paragraph::new(fields)
        .style(Style::default().bg(palette.surface).fg(palette.text))
        .block(
            Block::default()
                .title(Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn draw_confirm(f: &mut ratatui::Frame<'_>, target: &Note, submitting: bool, palette: &Palette) {
    let area = centered_rect(50, 30, f.size());
    let prompt = if submitting {
        "Deleting..."
    } else {
        "Press y to confirm, n or Esc to cancel"
    };
    let body = vec![
        Line::from(Span::styled(
            delete_prompt(target),
            Style::default()
                .fg(palette.danger)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(prompt),
    ];
    let dialog = Paragraph::new(body)
        .alignment(Alignment::Center)
        .style(Style::default().bg(palette.surface).fg(palette.text))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    "Delete Note",
                    Style::default()
                        .fg(palette.danger)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.danger)),
        );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn delete_prompt(note: &Note) -> String {
    format!("Are you sure you want to delete \"{}\"?", note.title)
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
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

/// Every list entry takes a title row and a preview row.
const LIST_ITEM_HEIGHT: usize = 2;

/// Whole list entries that fit inside a bordered block of `height` rows.
fn visible_items(height: u16) -> usize {
    (height.saturating_sub(2) as usize / LIST_ITEM_HEIGHT).max(1)
}

/// Scrolls just enough to keep `selected` inside the viewport.
fn adjust_offset(selected: usize, offset: usize, viewport: usize, len: usize) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let mut offset = offset.min(len.saturating_sub(1));
    if selected < offset {
        offset = selected;
    } else if selected >= offset + viewport {
        offset = selected + 1 - viewport;
    }
    offset
}

fn prev_char(cursor: usize, text: &str) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut prev = 0;
    for (idx, _) in text.char_indices() {
        if idx >= cursor {
            break;
        }
        prev = idx;
    }
    prev
}

fn next_char(cursor: usize, text: &str) -> usize {
    for (idx, ch) in text.char_indices() {
        if idx > cursor {
            return idx;
        }
        if idx == cursor {
            return cursor + ch.len_utf8();
        }
    }
    text.len()
}

fn line_state(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    let line_idx = starts
        .iter()
        .rposition(|start| *start <= cursor)
        .unwrap_or(0);
    let col = text[starts[line_idx]..cursor].chars().count();
    (starts, line_idx, col)
}

fn index_at_col(text: &str, start: usize, target_col: usize) -> usize {
    let slice = &text[start..];
    let limit = slice.find('\n').unwrap_or(slice.len());
    slice[..limit]
        .char_indices()
        .nth(target_col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + limit)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(&".".repeat(max - keep));
    out
}

fn note_item(note: &Note, width: usize, palette: &Palette) -> ListItem<'static> {
    let title_style = if note.title.is_empty() {
        Style::default()
            .fg(palette.muted)
            .add_modifier(Modifier::ITALIC)
    } else {
        Style::default().fg(palette.text)
    };
    let preview = note.content.lines().next().unwrap_or_default();
    ListItem::new(vec![
        Line::from(Span::styled(
            truncate_text(note.display_title(), width),
            title_style,
        )),
        Line::from(Span::styled(
            truncate_text(preview, width),
            Style::default().fg(palette.muted),
        )),
    ])
}

fn field_lines(
    label: &str,
    field: &FieldValue,
    active: bool,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(palette.muted)
        .add_modifier(Modifier::BOLD);
    let value_style = Style::default().fg(if active { palette.accent } else { palette.text });
    let prefix = format!("{}: ", label);
    let spacer = " ".repeat(prefix.chars().count());
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            Line::from(vec![
                Span::styled(
                    if idx == 0 {
                        prefix.clone()
                    } else {
                        spacer.clone()
                    },
                    label_style,
                ),
                Span::styled(line.to_string(), value_style),
            ])
        })
        .collect()
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}
