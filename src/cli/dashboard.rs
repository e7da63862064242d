use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use tracing::warn;

use crate::calc::{category_totals, monthly_category_totals, settlement, total_amount};
use crate::cli::open_household;
use crate::error::Result;
use crate::fmt::{compact, yen};
use crate::household::{Household, LoadSource, Mutation, Outcome};
use crate::models::{Expense, ExpenseDraft, DATE_FORMAT};
use crate::months::{available_months, current_month_key, MonthFilter, ALL};
use crate::tui::{
    run_view, truncate, yen_span, View, ViewAction, FOOTER_STYLE, HEADER_STYLE, NOTICE_STYLE,
    OWED_STYLE, SELECTED_STYLE, TAB_ACTIVE_STYLE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Home,
    Analysis,
}

/// Which Home list the cursor keys act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    /// Every record in the selected month, settled or not.
    History,
    /// Unsettled records across all months.
    Unsettled,
}

// ---------------------------------------------------------------------------
// Add form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    Item,
    Amount,
    Payer,
    Category,
}

const FIELDS: [Field; 5] = [Field::Date, Field::Item, Field::Amount, Field::Payer, Field::Category];

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::Item => "Item",
            Field::Amount => "Amount",
            Field::Payer => "Payer",
            Field::Category => "Category",
        }
    }
}

enum FormAction {
    Continue,
    Cancel,
    Submit,
}

struct AddForm {
    date: String,
    item: String,
    amount: String,
    payer: usize,
    category: usize,
    field: usize,
    error: Option<String>,
}

impl AddForm {
    fn new() -> Self {
        Self {
            date: chrono::Local::now().date_naive().format(DATE_FORMAT).to_string(),
            item: String::new(),
            amount: String::new(),
            payer: 0,
            category: 0,
            field: 1,
            error: None,
        }
    }

    fn focused(&self) -> Field {
        FIELDS[self.field]
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.focused() {
            Field::Date => Some(&mut self.date),
            Field::Item => Some(&mut self.item),
            Field::Amount => Some(&mut self.amount),
            Field::Payer | Field::Category => None,
        }
    }

    /// Step a choice field through `len` options.
    fn cycle(&mut self, forward: bool, payers: usize, categories: usize) {
        let (value, len) = match self.focused() {
            Field::Payer => (&mut self.payer, payers),
            Field::Category => (&mut self.category, categories),
            _ => return,
        };
        if len == 0 {
            return;
        }
        *value = if forward { (*value + 1) % len } else { (*value + len - 1) % len };
    }

    fn handle_key(&mut self, code: KeyCode, payers: usize, categories: usize) -> FormAction {
        match code {
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Tab | KeyCode::Down => self.field = (self.field + 1) % FIELDS.len(),
            KeyCode::BackTab | KeyCode::Up => self.field = (self.field + FIELDS.len() - 1) % FIELDS.len(),
            KeyCode::Left => self.cycle(false, payers, categories),
            KeyCode::Right => self.cycle(true, payers, categories),
            KeyCode::Backspace => {
                if let Some(text) = self.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => match self.text_mut() {
                Some(text) => text.push(c),
                None if c == ' ' => self.cycle(true, payers, categories),
                None => {}
            },
            _ => {}
        }
        FormAction::Continue
    }

    fn draft(&self, payers: &[String; 2], categories: &[String]) -> ExpenseDraft {
        ExpenseDraft {
            date: Some(self.date.clone()),
            item_name: self.item.clone(),
            category: categories.get(self.category).cloned(),
            amount: self.amount.clone(),
            payer: payers[self.payer.min(1)].clone(),
            is_settled: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

struct Dashboard {
    household: Household,
    categories: Vec<String>,
    tab: Tab,
    pane: Pane,
    /// `all` followed by every available month, newest first.
    months: Vec<String>,
    month_idx: usize,
    /// Cursor in the unsettled list (Home).
    selection: usize,
    /// Cursor in the month history list (Home).
    history_selection: usize,
    /// Cursor in the monthly table (Analysis).
    month_selection: usize,
    /// Id awaiting a `y` to be deleted.
    pending_delete: Option<String>,
    add_form: Option<AddForm>,
    notice: Option<String>,
    unconfirmed: i64,
}

impl Dashboard {
    fn new(household: Household, categories: Vec<String>) -> Self {
        let mut dashboard = Self {
            household,
            categories,
            tab: Tab::Home,
            pane: Pane::Unsettled,
            months: vec![ALL.to_string()],
            month_idx: 0,
            selection: 0,
            history_selection: 0,
            month_selection: 0,
            pending_delete: None,
            add_form: None,
            notice: None,
            unconfirmed: 0,
        };
        dashboard.refresh(&current_month_key());
        dashboard.notice = source_notice(&dashboard.household);
        dashboard
    }

    /// Rebuild the month list after the working set changed, keeping `keep`
    /// selected when it still exists.
    fn refresh(&mut self, keep: &str) {
        let today = chrono::Local::now().date_naive();
        self.months = std::iter::once(ALL.to_string())
            .chain(available_months(self.household.expenses(), today))
            .collect();
        self.month_idx = self.months.iter().position(|m| m == keep).unwrap_or(0);

        let unsettled = self.unsettled().len();
        self.selection = self.selection.min(unsettled.saturating_sub(1));
        let history = self.history().len();
        self.history_selection = self.history_selection.min(history.saturating_sub(1));
        let rows = monthly_category_totals(self.household.expenses()).rows.len();
        self.month_selection = self.month_selection.min(rows.saturating_sub(1));

        self.unconfirmed = match self.household.unconfirmed_count() {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "could not count unconfirmed operations");
                0
            }
        };
    }

    fn selected_month(&self) -> &str {
        self.months.get(self.month_idx).map(String::as_str).unwrap_or(ALL)
    }

    fn filter(&self) -> MonthFilter {
        match self.selected_month() {
            ALL => MonthFilter::All,
            key => MonthFilter::Month(key.to_string()),
        }
    }

    fn unsettled(&self) -> Vec<&Expense> {
        self.household.expenses().iter().filter(|e| !e.is_settled).collect()
    }

    fn history(&self) -> Vec<&Expense> {
        let filter = self.filter();
        self.household.expenses().iter().filter(|e| filter.matches(e)).collect()
    }

    fn cycle_month(&mut self, forward: bool) {
        let n = self.months.len();
        if n == 0 {
            return;
        }
        self.month_idx = if forward {
            (self.month_idx + 1) % n
        } else {
            (self.month_idx + n - 1) % n
        };
        self.history_selection = 0;
    }

    fn reload(&mut self) {
        let keep = self.selected_month().to_string();
        match self.household.load() {
            Ok(source) => {
                self.notice = source_notice(&self.household)
                    .or_else(|| Some(format!("Reloaded from {source}.")));
            }
            Err(e) => {
                warn!(error = %e, "reload failed");
                self.notice = Some(format!("Reload failed: {e}"));
            }
        }
        self.refresh(&keep);
    }

    fn after_mutation(&mut self, verb: &str, result: Result<Mutation>) {
        let keep = self.selected_month().to_string();
        self.notice = Some(match result {
            Ok(m) => {
                let what = format!("{verb} {} ({})", m.expense.item_name, yen(m.expense.amount));
                match m.outcome {
                    Outcome::Synced => format!("{what}."),
                    Outcome::LocalOnly => format!("{what}; saved locally."),
                    Outcome::Failed(err) => format!("{what}; remote update failed: {err}"),
                    Outcome::Preview => format!("{what} in the sample data only."),
                }
            }
            Err(e) => format!("Could not update: {e}"),
        });
        self.refresh(&keep);
    }

    fn selected_id(&self) -> Option<String> {
        match self.pane {
            Pane::History => self.history().get(self.history_selection).map(|e| e.id.clone()),
            Pane::Unsettled => self.unsettled().get(self.selection).map(|e| e.id.clone()),
        }
    }

    fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            let result = self.household.toggle(&id);
            self.after_mutation("Toggled", result);
        }
    }

    fn request_delete(&mut self) {
        if let Some(id) = self.selected_id() {
            self.pending_delete = Some(id);
        }
    }

    fn move_cursor(&mut self, down: bool) {
        let (cursor, len) = match self.pane {
            Pane::History => {
                let len = self.history().len();
                (&mut self.history_selection, len)
            }
            Pane::Unsettled => {
                let len = self.unsettled().len();
                (&mut self.selection, len)
            }
        };
        *cursor = if down {
            (*cursor + 1).min(len.saturating_sub(1))
        } else {
            cursor.saturating_sub(1)
        };
    }

    fn submit_form(&mut self) {
        let Some(form) = self.add_form.as_mut() else {
            return;
        };
        let draft = form.draft(self.household.payers(), &self.categories);
        match self.household.add(draft) {
            Ok(m) => {
                self.add_form = None;
                self.after_mutation("Added", Ok(m));
            }
            Err(e) => form.error = Some(e.to_string()),
        }
    }

    fn handle_form_key(&mut self, code: KeyCode) {
        let categories = self.categories.len();
        let Some(form) = self.add_form.as_mut() else {
            return;
        };
        match form.handle_key(code, 2, categories) {
            FormAction::Continue => {}
            FormAction::Cancel => {
                self.add_form = None;
                self.notice = Some("Add cancelled.".to_string());
            }
            FormAction::Submit => self.submit_form(),
        }
    }

    fn handle_home_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('[') => self.cycle_month(false),
            KeyCode::Char(']') => self.cycle_month(true),
            KeyCode::Left => self.pane = Pane::History,
            KeyCode::Right => self.pane = Pane::Unsettled,
            KeyCode::Up => self.move_cursor(false),
            KeyCode::Down => self.move_cursor(true),
            KeyCode::Char('a') => self.add_form = Some(AddForm::new()),
            KeyCode::Char('s') => self.toggle_selected(),
            KeyCode::Char('d') => self.request_delete(),
            _ => {}
        }
    }

    fn handle_analysis_key(&mut self, code: KeyCode) {
        let rows = monthly_category_totals(self.household.expenses()).rows;
        match code {
            KeyCode::Up => self.month_selection = self.month_selection.saturating_sub(1),
            KeyCode::Down => {
                self.month_selection = (self.month_selection + 1).min(rows.len().saturating_sub(1));
            }
            KeyCode::Enter => {
                let Some(row) = rows.get(self.month_selection) else {
                    return;
                };
                match self.months.iter().position(|m| *m == row.month) {
                    Some(idx) => {
                        self.month_idx = idx;
                        self.tab = Tab::Home;
                    }
                    None => self.notice = Some(format!("'{}' is not a month that can be selected.", row.month)),
                }
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_chrome(&self, frame: &mut Frame, header: Rect, tabs: Rect, sep: Rect) {
        let width = frame.area().width as usize;
        frame.render_widget(
            Paragraph::new(format!(" kakeibo  ·  {}", self.household.source())).style(HEADER_STYLE),
            header,
        );
        let tab_span = |label: &'static str, tab: Tab| {
            if self.tab == tab {
                Span::styled(label, TAB_ACTIVE_STYLE)
            } else {
                Span::raw(label)
            }
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw(" "),
                tab_span(" Home ", Tab::Home),
                Span::raw(" "),
                tab_span(" Analysis ", Tab::Analysis),
            ])),
            tabs,
        );
        frame.render_widget(
            Paragraph::new("━".repeat(width)).style(Style::default().fg(Color::DarkGray)),
            sep,
        );
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let unconfirmed = if self.unconfirmed > 0 {
            Span::styled(format!("  [{} unconfirmed]", self.unconfirmed), NOTICE_STYLE)
        } else {
            Span::raw("")
        };
        let line = if let Some(id) = &self.pending_delete {
            let label = self
                .household
                .find(id)
                .map(|e| format!("{} {}", e.item_name, yen(e.amount)))
                .unwrap_or_else(|_| id.clone());
            Line::from(Span::styled(format!(" Delete {label}? y=yes  any other key=cancel"), NOTICE_STYLE))
        } else if self.add_form.is_some() {
            Line::from(Span::styled(
                " Tab/Up/Down=field  Left/Right=choose  Enter=save  Esc=cancel",
                FOOTER_STYLE,
            ))
        } else if let Some(msg) = &self.notice {
            Line::from(vec![Span::styled(format!(" {msg}"), NOTICE_STYLE), unconfirmed])
        } else {
            let hints = match self.tab {
                Tab::Home => {
                    " [/]=month  Left/Right=pane  Up/Down=select  a=add  s=settle  d=delete  Tab=analysis  r=reload  q=quit"
                }
                Tab::Analysis => " Up/Down=month  Enter=open month  Tab=home  r=reload  q=quit",
            };
            Line::from(vec![Span::styled(hints, FOOTER_STYLE), unconfirmed])
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_home(&self, frame: &mut Frame) {
        let [header, tabs, sep1, cards, sep2, list_area, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        self.draw_chrome(frame, header, tabs, sep1);
        frame.render_widget(
            Paragraph::new("━".repeat(frame.area().width as usize)).style(Style::default().fg(Color::DarkGray)),
            sep2,
        );

        let [left, right] = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(cards);
        let bold = Style::default().add_modifier(Modifier::BOLD);

        let filter = self.filter();
        let in_month = filter.apply(self.household.expenses());
        let month_lines = vec![
            Line::from(vec![
                Span::raw(" Month   "),
                Span::styled(format!("< {} >", self.selected_month()), bold),
            ]),
            Line::from(""),
            Line::from(vec![Span::raw(format!(" Spent in {filter}  ")), yen_span(total_amount(&in_month))]),
            Line::from(format!(" Expenses          {}", in_month.len())),
        ];
        frame.render_widget(Paragraph::new(month_lines), left);

        let s = settlement(self.household.expenses(), self.household.payers());
        let card = vec![
            Line::from(Span::styled(" Unsettled", bold)),
            Line::from(""),
            Line::from(Span::styled(
                match s.parties() {
                    Some((debtor, creditor)) => format!(" {debtor} pays {creditor} {}", yen(s.transfer_amount)),
                    None => format!(" {}", s.description()),
                },
                OWED_STYLE,
            )),
            Line::from(format!(
                " {} paid {}   {} paid {}",
                s.payer_a,
                yen(s.total_a),
                s.payer_b,
                yen(s.total_b)
            )),
        ];
        frame.render_widget(Paragraph::new(card), right);

        if let Some(form) = &self.add_form {
            self.draw_form(frame, form, list_area);
        } else {
            let [history_area, unsettled_area] =
                Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(list_area);
            let history = self.history();
            let title = format!(" {} ({})", self.selected_month(), history.len());
            let empty = format!(" Nothing recorded in {filter}.");
            self.draw_list(frame, history_area, Pane::History, &title, &history, self.history_selection, &empty);

            let unsettled = self.unsettled();
            let title = format!(" Unsettled items ({})", unsettled.len());
            self.draw_list(
                frame,
                unsettled_area,
                Pane::Unsettled,
                &title,
                &unsettled,
                self.selection,
                " Everything is settled.",
            );
        }

        self.draw_status(frame, status);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_list(
        &self,
        frame: &mut Frame,
        area: Rect,
        pane: Pane,
        title: &str,
        rows: &[&Expense],
        selection: usize,
        empty: &str,
    ) {
        let focused = self.pane == pane;
        let title_style = if focused {
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let mut lines = vec![Line::from(Span::styled(title.to_string(), title_style))];
        if rows.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(empty.to_string()));
        }
        let item_width = (area.width as usize).saturating_sub(34).clamp(6, 22);
        let visible = area.height.saturating_sub(1) as usize;
        let offset = selection.saturating_sub(visible.saturating_sub(1));
        for (i, e) in rows.iter().enumerate().skip(offset).take(visible) {
            let text = format!(
                " {} {} {:<width$} {:>9} {}",
                if e.is_settled { "✓" } else { " " },
                e.date,
                truncate(&e.item_name, item_width),
                yen(e.amount),
                e.payer,
                width = item_width
            );
            let style = if focused && i == selection { SELECTED_STYLE } else { Style::default() };
            lines.push(Line::from(Span::styled(text, style)));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_form(&self, frame: &mut Frame, form: &AddForm, area: Rect) {
        let payers = self.household.payers();
        let mut lines = vec![
            Line::from(Span::styled(" New expense", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
        ];
        for (i, field) in FIELDS.iter().enumerate() {
            let value = match field {
                Field::Date => form.date.clone(),
                Field::Item => form.item.clone(),
                Field::Amount => form.amount.clone(),
                Field::Payer => format!("< {} >", payers[form.payer.min(1)]),
                Field::Category => format!(
                    "< {} >",
                    self.categories.get(form.category).map(String::as_str).unwrap_or("")
                ),
            };
            let style = if i == form.field { SELECTED_STYLE } else { Style::default() };
            lines.push(Line::from(vec![
                Span::raw(format!(" {:<10}", field.label())),
                Span::styled(format!(" {value} "), style),
            ]));
        }
        if let Some(err) = &form.error {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(format!(" {err}"), OWED_STYLE)));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_analysis(&self, frame: &mut Frame) {
        let [header, tabs, sep1, chart_area, sep2, table_area, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        self.draw_chrome(frame, header, tabs, sep1);
        frame.render_widget(
            Paragraph::new("━".repeat(frame.area().width as usize)).style(Style::default().fg(Color::DarkGray)),
            sep2,
        );

        let expenses = self.household.expenses();
        let totals = category_totals(expenses);
        if !totals.is_empty() {
            let n = totals.len() as u16;
            let bar_width = (chart_area.width / n.max(1)).saturating_sub(1).clamp(3, 14);
            let bars: Vec<Bar> = totals
                .iter()
                .map(|t| {
                    let value = t.total.max(0) as u64;
                    Bar::default()
                        .value(value)
                        .label(Line::from(truncate(&t.category, bar_width as usize)))
                        .text_value(compact(value))
                        .style(Style::default().fg(Color::Rgb(80, 220, 100)))
                })
                .collect();
            let chart = BarChart::default()
                .block(
                    Block::default()
                        .title(" Spending by category")
                        .title_style(Style::default().add_modifier(Modifier::BOLD))
                        .borders(Borders::NONE),
                )
                .bar_width(bar_width)
                .bar_gap(1)
                .data(BarGroup::default().bars(&bars));
            frame.render_widget(chart, chart_area);
        } else {
            frame.render_widget(Paragraph::new(" No expenses yet."), chart_area);
        }

        let report = monthly_category_totals(expenses);
        let mut header_cells = vec![Cell::from("Month")];
        header_cells.extend(report.categories.iter().map(|c| Cell::from(truncate(c, 12))));
        header_cells.push(Cell::from("Total"));

        let rows: Vec<Row> = report
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut cells = vec![Cell::from(row.month.clone())];
                for category in &report.categories {
                    cells.push(Cell::from(match row.get(category) {
                        0 => String::new(),
                        v => yen(v),
                    }));
                }
                cells.push(Cell::from(yen(row.sum())));
                let style = if i == self.month_selection { SELECTED_STYLE } else { Style::default() };
                Row::new(cells).style(style)
            })
            .collect();

        let mut widths = vec![Constraint::Length(8)];
        widths.extend(report.categories.iter().map(|_| Constraint::Length(12)));
        widths.push(Constraint::Length(12));

        let table = Table::new(rows, widths)
            .header(Row::new(header_cells).style(Style::default().add_modifier(Modifier::BOLD)))
            .block(Block::default().title(" Monthly").borders(Borders::NONE));
        frame.render_widget(table, table_area);

        self.draw_status(frame, status);
    }
}

impl View for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        match self.tab {
            Tab::Home => self.draw_home(frame),
            Tab::Analysis => self.draw_analysis(frame),
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        if let Some(id) = self.pending_delete.take() {
            if code == KeyCode::Char('y') {
                let result = self.household.delete(&id);
                self.after_mutation("Deleted", result);
            } else {
                self.notice = Some("Delete cancelled.".to_string());
            }
            return ViewAction::Continue;
        }
        if self.add_form.is_some() {
            self.handle_form_key(code);
            return ViewAction::Continue;
        }

        match code {
            KeyCode::Char('q') => return ViewAction::Close,
            KeyCode::Tab => {
                self.tab = match self.tab {
                    Tab::Home => Tab::Analysis,
                    Tab::Analysis => Tab::Home,
                };
                self.notice = None;
            }
            KeyCode::Char('r') => self.reload(),
            _ => match self.tab {
                Tab::Home => self.handle_home_key(code),
                Tab::Analysis => self.handle_analysis_key(code),
            },
        }
        ViewAction::Continue
    }
}

fn source_notice(household: &Household) -> Option<String> {
    match household.source() {
        LoadSource::Cache if household.has_remote() => Some("Remote unreachable; showing local cache.".to_string()),
        LoadSource::Fallback => Some("Nothing stored yet; showing sample data.".to_string()),
        _ => None,
    }
}

pub fn run(offline: bool) -> Result<()> {
    let (settings, household) = open_household(offline)?;
    let mut dashboard = Dashboard::new(household, settings.categories);
    run_view(&mut dashboard)
}
