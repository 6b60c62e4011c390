use crate::config::Config;
use crate::model::{day_name, hour_text, ArchiveStatus, SnailNumber, TaskDraft, DAY_NAMES};
use crate::notice::{NoticeId, Notices};
use crate::pending::{CreationQueue, PendingId};
use crate::popup::{self, Popup};
use crate::registry::Registry;
use crate::scene::{PickTarget, Scene};
use crate::storage::KeyValueStore;
use crate::tick::tick;
use crate::timeline::{self, tracker_offset, Clock, WeekTime, TRACK_LENGTH};
use anyhow::Result;
use chrono::{Duration as ChronoDuration, FixedOffset};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::HashMap;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{error, info};

const LANE_ROWS: usize = 4;
const SNAIL_GLYPH: char = '@';
const ME_COLOR: Color = Color::LightBlue;

pub fn run<S: KeyValueStore>(
    registry: Registry<S>,
    config: &Config,
    clock: Box<dyn Clock>,
) -> Result<()> {
    let mut terminal = open_terminal()?;
    let mut app = App::new(registry, config, clock);
    let result = app.event_loop(&mut terminal);
    close_terminal(&mut terminal)?;
    result
}

struct App<S: KeyValueStore> {
    registry: Registry<S>,
    scene: Scene,
    clock: Box<dyn Clock>,
    offset: FixedOffset,
    tick_interval: Duration,
    last_tick: Instant,
    creations: CreationQueue,
    preparing: HashMap<PendingId, NoticeId>,
    notices: Notices,
    status: String,
    mode: Mode,
    show_tasks: bool,
    show_history: bool,
    selected_task: usize,
    pick: Option<PickTarget>,
    track_area: Rect,
}

enum Mode {
    Normal,
    Creating(TaskForm),
    ConfirmDelete { snail_number: SnailNumber },
}

struct TaskForm {
    title: FieldValue,
    day_index: u8,
    time_enabled: bool,
    hour: FieldValue,
    minute: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Day,
    TimeToggle,
    Hour,
    Minute,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_boundary(&self.value, self.cursor);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_boundary(&self.value, self.cursor);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(&self.value, self.cursor);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl<S: KeyValueStore> App<S> {
    fn new(registry: Registry<S>, config: &Config, clock: Box<dyn Clock>) -> Self {
        let scene = Scene::from_tasks(registry.active());
        let status = format!("Loaded {} snail(s)", registry.active().len());
        let mut app = App {
            registry,
            scene,
            clock,
            offset: tracker_offset(config.utc_offset_hours),
            tick_interval: config.tick_interval(),
            last_tick: Instant::now(),
            creations: CreationQueue::new(config.preparation_delay()),
            preparing: HashMap::new(),
            notices: Notices::new(),
            status,
            mode: Mode::Normal,
            show_tasks: false,
            show_history: false,
            selected_task: 0,
            pick: None,
            track_area: Rect::default(),
        };
        app.on_tick();
        app
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            let until_tick = self.tick_interval.saturating_sub(self.last_tick.elapsed());
            if event::poll(until_tick.min(Duration::from_millis(200)))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press && self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
            self.advance();
            if self.last_tick.elapsed() >= self.tick_interval {
                self.on_tick();
                self.last_tick = Instant::now();
            }
        }
        Ok(())
    }

    /// Surfaces drafts whose preparation finished and drops stale notices.
    fn advance(&mut self) {
        let now = self.clock.now();
        for (id, draft) in self.creations.poll(now) {
            if let Some(notice) = self.preparing.remove(&id) {
                self.notices.dismiss(notice);
            }
            match self.registry.add(draft) {
                Ok(task) => {
                    self.scene.spawn(&task);
                    self.notices.show(
                        format!("Snail #{} ({}) was added!", task.snail_number, task.title),
                        false,
                        ChronoDuration::seconds(3),
                        now,
                    );
                    self.status = format!("Added snail #{}", task.snail_number);
                }
                Err(err) => {
                    error!(error = %err, "could not save new task");
                    self.status = format!("Could not save task: {}", err);
                }
            }
        }
        self.notices.expire(now);
    }

    fn on_tick(&mut self) {
        let now = self.clock.now();
        match tick(
            &mut self.registry,
            &mut self.scene,
            now,
            self.offset,
            &mut rand::thread_rng(),
        ) {
            Ok(report) => {
                for entry in report.completed {
                    self.notices.show(
                        entry.completed_message,
                        false,
                        ChronoDuration::seconds(5),
                        now,
                    );
                }
            }
            Err(err) => {
                error!(error = %err, "tick could not persist completions");
                self.status = format!("Could not save completion: {}", err);
            }
        }
        self.ensure_bounds();
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Creating(_) => self.handle_form_key(key),
            Mode::ConfirmDelete { .. } => self.handle_confirm_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('n') => {
                self.mode = Mode::Creating(TaskForm::new());
                self.status = "New snail (Tab/Shift-Tab move, Enter save, Esc cancel)".into();
            }
            KeyCode::Char('t') => {
                self.show_tasks = !self.show_tasks;
                self.ensure_bounds();
            }
            KeyCode::Char('h') => self.show_history = !self.show_history,
            KeyCode::Up | KeyCode::Char('k') => {
                if self.show_tasks && self.selected_task > 0 {
                    self.selected_task -= 1;
                    self.pick_selected_task();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.show_tasks && self.selected_task + 1 < self.registry.active().len() {
                    self.selected_task += 1;
                    self.pick_selected_task();
                }
            }
            KeyCode::Char('[') => self.cycle_pick(-1),
            KeyCode::Char(']') => self.cycle_pick(1),
            KeyCode::Char('d') => match self.delete_candidate() {
                Some(snail_number) => {
                    self.mode = Mode::ConfirmDelete { snail_number };
                    self.status = format!(
                        "Delete snail #{}? (y to confirm, n/Esc to cancel)",
                        snail_number
                    );
                }
                None => self.status = "No snail selected to delete".into(),
            },
            KeyCode::Esc => {
                if let Some(id) = self.creations.latest() {
                    self.creations.cancel(id);
                    if let Some(notice) = self.preparing.remove(&id) {
                        self.notices.dismiss(notice);
                    }
                    self.status = "Snail preparation canceled".into();
                } else {
                    self.pick = None;
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<bool> {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close_form = match &mut mode {
            Mode::Creating(form) => self.process_form_key(form, key),
            _ => true,
        };
        self.mode = if close_form { Mode::Normal } else { mode };
        Ok(false)
    }

    fn process_form_key(&mut self, form: &mut TaskForm, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Enter => return self.try_submit(form),
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.prev_field(),
            KeyCode::Left => match form.field {
                FormField::Day => form.day_index = (form.day_index + 6) % 7,
                _ => {
                    if let Some(field) = form.active_text_mut() {
                        field.move_left();
                    }
                }
            },
            KeyCode::Right => match form.field {
                FormField::Day => form.day_index = (form.day_index + 1) % 7,
                _ => {
                    if let Some(field) = form.active_text_mut() {
                        field.move_right();
                    }
                }
            },
            KeyCode::Backspace => {
                if let Some(field) = form.active_text_mut() {
                    field.backspace();
                }
            }
            KeyCode::Char(' ') if form.field == FormField::TimeToggle => {
                form.time_enabled = !form.time_enabled;
            }
            KeyCode::Char(c) => {
                if key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    return false;
                }
                match form.field {
                    FormField::Day => {
                        if let Some(day) = c.to_digit(10).filter(|d| (1..=7).contains(d)) {
                            form.day_index = day as u8 - 1;
                        }
                    }
                    _ => {
                        if let Some(field) = form.active_text_mut() {
                            field.insert_char(c);
                        }
                    }
                }
            }
            _ => {}
        }
        false
    }

    fn try_submit(&mut self, form: &TaskForm) -> bool {
        match form.to_draft() {
            Ok(draft) => {
                self.submit_draft(draft);
                true
            }
            Err(reason) => {
                self.status = format!("Could not create: {}", reason);
                false
            }
        }
    }

    fn submit_draft(&mut self, draft: TaskDraft) {
        let title = draft.title.clone();
        let id = self.creations.submit(draft, self.clock.now());
        let notice = self
            .notices
            .show_sticky("Preparing your snail...", true);
        self.preparing.insert(id, notice);
        self.status = format!("Preparing \"{}\" (Esc to cancel)", title);
        info!(pending = id, "task creation pending");
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<bool> {
        let snail_number = match self.mode {
            Mode::ConfirmDelete { snail_number } => snail_number,
            _ => return Ok(false),
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.delete_task(snail_number);
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
        Ok(false)
    }

    fn delete_task(&mut self, snail_number: SnailNumber) {
        let now = self.clock.now();
        match self.registry.delete(snail_number, now) {
            Ok(Some(entry)) => {
                self.scene.remove(snail_number);
                if self.pick == Some(PickTarget::TaskMarker { snail_number }) {
                    self.pick = None;
                }
                self.notices.show(
                    format!(
                        "Snail #{} ({}) was deleted.",
                        entry.task.snail_number, entry.task.title
                    ),
                    true,
                    ChronoDuration::seconds(1),
                    now,
                );
                self.status = format!("Deleted snail #{}", snail_number);
            }
            Ok(None) => self.status = format!("Snail #{} is already gone", snail_number),
            Err(err) => {
                error!(error = %err, snail = snail_number, "delete could not be saved");
                self.status = format!("Delete failed: {}", err);
            }
        }
        self.ensure_bounds();
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(mouse.kind, MouseEventKind::Moved) {
            return;
        }
        self.pick = self.pick_at(mouse.column, mouse.row);
    }

    /// Hit-tests a terminal cell against the track.
    fn pick_at(&self, column: u16, row: u16) -> Option<PickTarget> {
        let area = self.track_area;
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        if !inside || area.width == 0 {
            return None;
        }
        let position = position_for_column(column - area.x, area.width);
        self.scene.pick(position, pick_radius(area.width))
    }

    fn cycle_pick(&mut self, delta: isize) {
        let targets = self.scene.targets();
        if targets.is_empty() {
            return;
        }
        let len = targets.len() as isize;
        let next = match self.pick.and_then(|p| targets.iter().position(|t| *t == p)) {
            Some(idx) => (idx as isize + delta).rem_euclid(len),
            None if delta > 0 => 0,
            None => len - 1,
        };
        self.pick = Some(targets[next as usize]);
    }

    fn pick_selected_task(&mut self) {
        if let Some(task) = self.registry.active().get(self.selected_task) {
            self.pick = Some(PickTarget::TaskMarker {
                snail_number: task.snail_number,
            });
        }
    }

    fn delete_candidate(&self) -> Option<SnailNumber> {
        if self.show_tasks {
            if let Some(task) = self.registry.active().get(self.selected_task) {
                return Some(task.snail_number);
            }
        }
        match self.pick {
            Some(PickTarget::TaskMarker { snail_number }) => Some(snail_number),
            _ => None,
        }
    }

    fn ensure_bounds(&mut self) {
        let len = self.registry.active().len();
        self.selected_task = self.selected_task.min(len.saturating_sub(1));
        if let Some(PickTarget::TaskMarker { snail_number }) = self.pick {
            if self.scene.marker(snail_number).is_none() {
                self.pick = None;
            }
        }
    }

    fn current_popup(&self) -> Option<Popup> {
        popup::describe(
            self.pick,
            &self.scene,
            self.registry.active(),
            self.clock.now(),
            self.offset,
        )
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(12),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_body(f, layout[1]);
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::Creating(form) => self.draw_form(f, form),
            Mode::ConfirmDelete { snail_number } => self.draw_confirm(f, *snail_number),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let now = WeekTime::at(self.clock.now(), self.offset);
        let mut title = Line::from(vec![
            Span::styled(
                "snailtrack ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} {}", day_name(now.day_index), hour_text(now.hour)),
                Style::default().fg(ME_COLOR),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} on track", self.registry.active().len()),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{} archived", self.registry.archive().len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        if !self.creations.is_empty() {
            title.spans.push(Span::raw("  •  "));
            title.spans.push(Span::styled(
                format!("{} preparing", self.creations.len()),
                Style::default().fg(Color::Gray),
            ));
        }

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_body(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let panel_count = self.show_tasks as u16 + self.show_history as u16;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(if panel_count == 0 {
                vec![Constraint::Percentage(100)]
            } else {
                vec![Constraint::Percentage(65), Constraint::Percentage(35)]
            })
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(LANE_ROWS as u16 + 5),
                Constraint::Min(3),
            ])
            .split(columns[0]);
        self.draw_track(f, left[0]);

        let lower = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(left[1]);
        self.draw_popup(f, lower[0]);
        self.draw_notices(f, lower[1]);

        if panel_count > 0 {
            let panels = Layout::default()
                .direction(Direction::Vertical)
                .constraints(if panel_count == 2 {
                    vec![Constraint::Percentage(50), Constraint::Percentage(50)]
                } else {
                    vec![Constraint::Percentage(100)]
                })
                .split(columns[1]);
            let mut slot = 0;
            if self.show_tasks {
                self.draw_tasks_panel(f, panels[slot]);
                slot += 1;
            }
            if self.show_history {
                self.draw_history_panel(f, panels[slot]);
            }
        }
    }

    fn draw_track(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default()
            .title(Span::styled(
                "Week track",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        self.track_area = inner;
        f.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let width = inner.width as usize;
        let mut rows: Vec<Vec<(char, Style)>> =
            vec![vec![(' ', Style::default()); width]; LANE_ROWS + 3];

        for day in 0..7u8 {
            let col = column_for_position(timeline::day_start(day as i32), inner.width);
            for (offset, ch) in day_name(day).chars().enumerate() {
                if let Some(cell) = rows[0].get_mut(col + offset + 1) {
                    *cell = (ch, Style::default().fg(Color::Gray));
                }
            }
        }
        for col in 0..width {
            rows[1][col] = ('·', Style::default().fg(Color::DarkGray));
        }
        for day in 0..7 {
            let col = column_for_position(timeline::day_start(day), inner.width);
            rows[1][col] = ('|', Style::default().fg(Color::Gray));
        }

        let me_col = column_for_position(self.scene.me_position, inner.width);
        let me_style = if self.pick == Some(PickTarget::Me) {
            Style::default()
                .fg(Color::Black)
                .bg(ME_COLOR)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(ME_COLOR).add_modifier(Modifier::BOLD)
        };
        for row in rows.iter_mut().skip(2).take(LANE_ROWS) {
            row[me_col] = ('│', Style::default().fg(ME_COLOR));
        }

        for marker in self.scene.markers() {
            let col = column_for_position(marker.position, inner.width);
            let picked = self.pick
                == Some(PickTarget::TaskMarker {
                    snail_number: marker.snail_number,
                });
            let style = if picked {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Rgb(252, 214, 112))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Rgb(150, 75, 0))
            };
            rows[2 + marker.lane_row()][col] = (SNAIL_GLYPH, style);
        }

        let label_row = LANE_ROWS + 2;
        let label_start = me_col.saturating_sub(1).min(width.saturating_sub(2));
        for (offset, ch) in "ME".chars().enumerate() {
            if let Some(cell) = rows[label_row].get_mut(label_start + offset) {
                *cell = (ch, me_style);
            }
        }

        let lines: Vec<Line<'static>> = rows
            .into_iter()
            .take(inner.height as usize)
            .map(|row| {
                Line::from(
                    row.into_iter()
                        .map(|(ch, style)| Span::styled(ch.to_string(), style))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_popup(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = match self.current_popup() {
            Some(popup) => {
                let mut lines = vec![Line::from(Span::styled(
                    popup.heading,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))];
                lines.extend(popup.lines.into_iter().map(Line::from));
                lines
            }
            None => vec![Line::from(Span::styled(
                "Hover a snail or press [ ] to inspect",
                Style::default().fg(Color::DarkGray),
            ))],
        };
        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .title("Inspect")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(paragraph, area);
    }

    fn draw_notices(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let lines: Vec<Line<'static>> = self
            .notices
            .visible()
            .iter()
            .rev()
            .map(|notice| {
                let mut style = Style::default().fg(Color::White);
                if notice.oblique {
                    style = style.add_modifier(Modifier::ITALIC).fg(Color::Gray);
                }
                Line::from(Span::styled(notice.message.clone(), style))
            })
            .collect();
        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .title("Notifications")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        f.render_widget(paragraph, area);
    }

    fn draw_tasks_panel(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem<'static>> = self
            .registry
            .active()
            .iter()
            .map(|task| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        truncate_text(&task.title, 28),
                        Style::default()
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(
                        format!(
                            "({} {}) · snail #{}",
                            day_name(task.day_index),
                            hour_text(task.due_hour),
                            task.snail_number
                        ),
                        Style::default().fg(Color::LightYellow),
                    ),
                ]))
            })
            .collect();
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(self.selected_task));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .title(Span::styled(
                        format!("Tasks ({})", self.registry.active().len()),
                        Style::default()
                            .fg(Color::LightGreen)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::LightGreen)),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::LightCyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_history_panel(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let archive = self.registry.archive();
        let items: Vec<ListItem<'static>> = if archive.is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                "No snail has gone home yet..",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            )))]
        } else {
            archive
                .iter()
                .rev()
                .map(|entry| {
                    let status_style = match entry.status {
                        ArchiveStatus::Completed => Style::default().fg(Color::LightGreen),
                        ArchiveStatus::Deleted => Style::default().fg(Color::LightRed),
                    };
                    ListItem::new(vec![
                        Line::from(vec![
                            Span::styled(
                                entry.task.title.clone(),
                                Style::default().add_modifier(Modifier::BOLD),
                            ),
                            Span::raw(" "),
                            Span::styled(format!("({})", entry.status.label()), status_style),
                        ]),
                        Line::from(Span::styled(
                            entry.completed_message.clone(),
                            Style::default().fg(Color::Gray),
                        )),
                    ])
                })
                .collect()
        };
        let list = List::new(items).block(
            Block::default()
                .title(Span::styled(
                    "History",
                    Style::default()
                        .fg(Color::LightMagenta)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightMagenta)),
        );
        f.render_widget(list, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled("n", Style::default().fg(Color::LightMagenta)),
            Span::raw(" new  "),
            Span::styled("t", Style::default().fg(Color::LightGreen)),
            Span::raw(" tasks  "),
            Span::styled("h", Style::default().fg(Color::LightMagenta)),
            Span::raw(" history  "),
            Span::styled("↑↓ / j k", Style::default().fg(Color::LightCyan)),
            Span::raw(" browse  "),
            Span::styled("[ ]", Style::default().fg(Color::LightCyan)),
            Span::raw(" inspect  "),
            Span::styled("d", Style::default().fg(Color::LightRed)),
            Span::raw(" delete  "),
            Span::styled("Esc", Style::default().fg(Color::LightYellow)),
            Span::raw(" cancel  "),
            Span::styled("q", Style::default().fg(Color::LightRed)),
            Span::raw(" quit"),
        ])
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let area = centered_rect(60, 50, f.size());
        let mut fields = Vec::new();
        fields.push(field_line(
            "Title",
            &form.title,
            form.field == FormField::Title,
        ));
        fields.push(day_picker_line(form.day_index, form.field == FormField::Day));
        fields.push(choice_line(
            "Set time",
            if form.time_enabled { "[x]" } else { "[ ]" },
            form.field == FormField::TimeToggle,
        ));
        if form.time_enabled {
            fields.push(field_line("Hour", &form.hour, form.field == FormField::Hour));
            fields.push(field_line(
                "Minute",
                &form.minute,
                form.field == FormField::Minute,
            ));
        } else {
            fields.push(Line::from(Span::styled(
                "Due at 23:59",
                Style::default().fg(Color::DarkGray),
            )));
        }
        fields.push(Line::from(""));
        fields.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel • Tab/Shift-Tab to move • ←→ pick day • Space toggles time",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(fields)
            .block(
                Block::default()
                    .title(Span::styled(
                        "New Snail",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, snail_number: SnailNumber) {
        let area = centered_rect(50, 30, f.size());
        let title = self
            .registry
            .get(snail_number)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| format!("snail #{}", snail_number));
        let body = vec![
            Line::from(Span::styled(
                format!("Delete \"{}\"?", title),
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body).alignment(Alignment::Center).block(
            Block::default()
                .title(Span::styled(
                    "Confirm Delete",
                    Style::default()
                        .fg(Color::LightRed)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

impl TaskForm {
    fn new() -> Self {
        TaskForm {
            title: FieldValue::new(""),
            day_index: 0,
            time_enabled: false,
            hour: FieldValue::new(""),
            minute: FieldValue::new(""),
            field: FormField::Title,
        }
    }

    fn visible_fields(&self) -> &'static [FormField] {
        if self.time_enabled {
            &[
                FormField::Title,
                FormField::Day,
                FormField::TimeToggle,
                FormField::Hour,
                FormField::Minute,
            ]
        } else {
            &[FormField::Title, FormField::Day, FormField::TimeToggle]
        }
    }

    fn next_field(&mut self) {
        let fields = self.visible_fields();
        let idx = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        self.field = fields[(idx + 1) % fields.len()];
    }

    fn prev_field(&mut self) {
        let fields = self.visible_fields();
        let idx = fields.iter().position(|f| *f == self.field).unwrap_or(0);
        self.field = fields[(idx + fields.len() - 1) % fields.len()];
    }

    fn active_text_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            FormField::Title => Some(&mut self.title),
            FormField::Hour => Some(&mut self.hour),
            FormField::Minute => Some(&mut self.minute),
            FormField::Day | FormField::TimeToggle => None,
        }
    }

    /// Unparsable hour or minute reads as 0; values are clamped to a clock.
    fn to_draft(&self) -> std::result::Result<TaskDraft, &'static str> {
        let title = self.title.value.trim();
        if title.is_empty() {
            return Err("title is required");
        }
        let time = self.time_enabled.then(|| {
            let hour = self.hour.value.trim().parse::<u32>().unwrap_or(0).min(23);
            let minute = self.minute.value.trim().parse::<u32>().unwrap_or(0).min(59);
            (hour, minute)
        });
        Ok(TaskDraft {
            title: title.to_string(),
            day_index: self.day_index,
            time,
        })
    }
}

fn open_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(out))?)
}

fn close_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    disable_raw_mode()?;
    terminal.show_cursor()?;
    Ok(())
}

/// A rect covering the given percentages of `area`, centred in it.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = (area.width as u32 * percent_x.min(100) as u32 / 100) as u16;
    let height = (area.height as u32 * percent_y.min(100) as u32 / 100) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Column of `position` on a track `width` cells wide, clamped to the edges.
fn column_for_position(position: f64, width: u16) -> usize {
    if width == 0 {
        return 0;
    }
    let fraction = (position + TRACK_LENGTH / 2.0) / TRACK_LENGTH;
    let col = (fraction * width as f64).floor();
    col.clamp(0.0, (width - 1) as f64) as usize
}

/// Timeline position at the centre of `column`.
fn position_for_column(column: u16, width: u16) -> f64 {
    -TRACK_LENGTH / 2.0 + (column as f64 + 0.5) / width as f64 * TRACK_LENGTH
}

/// One cell's worth of track, never tighter than an hour.
fn pick_radius(width: u16) -> f64 {
    (TRACK_LENGTH / width.max(1) as f64).max(1.0)
}

/// Byte index of the char boundary before `cursor`.
fn prev_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map_or(0, |(idx, _)| idx)
}

/// Byte index of the char boundary after `cursor`.
fn next_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map_or(cursor, |ch| cursor + ch.len_utf8())
}

/// Cuts `text` to at most `max` chars, marking the cut with dots.
fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let dots = max.min(3);
    let mut out: String = text.chars().take(max - dots).collect();
    out.push_str(&"..."[..dots]);
    out
}

fn label_style() -> Style {
    Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM)
}

fn value_style(active: bool) -> Style {
    Style::default().fg(if active { Color::Cyan } else { Color::White })
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style()),
        Span::styled(text, value_style(active)),
    ])
}

fn choice_line(label: &str, value: &str, active: bool) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style()),
        Span::styled(value.to_string(), value_style(active)),
    ])
}

fn day_picker_line(selected: u8, active: bool) -> Line<'static> {
    let mut spans = vec![Span::styled("Day: ", label_style())];
    for (idx, name) in DAY_NAMES.iter().enumerate() {
        let style = if idx == selected as usize {
            value_style(active)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", name), style));
    }
    Line::from(spans)
}
