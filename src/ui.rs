use anyhow::Result;
use crossterm::{
    event::{self, Event as TermEvent, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pet_ledger::{AnimalType, Event};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Inventory,
    Loans,
    Events,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Inventory => Page::Loans,
            Page::Loans => Page::Events,
            Page::Events => Page::Inventory,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Inventory => Page::Events,
            Page::Loans => Page::Inventory,
            Page::Events => Page::Loans,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Inventory => "Inventory",
            Page::Loans => "Loans",
            Page::Events => "Events",
        }
    }
}

pub struct App {
    pub inventory: Vec<(AnimalType, u64)>,
    pub loans: Vec<(String, AnimalType)>,
    pub events: Vec<Event>,
    pub current_page: Page,
    pub inventory_state: TableState,
    pub loans_state: TableState,
    pub events_state: TableState,
}

impl App {
    pub fn new(
        inventory: Vec<(AnimalType, u64)>,
        loans: Vec<(String, AnimalType)>,
        events: Vec<Event>,
    ) -> Self {
        let mut inventory_state = TableState::default();
        if !inventory.is_empty() {
            inventory_state.select(Some(0));
        }

        let mut loans_state = TableState::default();
        if !loans.is_empty() {
            loans_state.select(Some(0));
        }

        let mut events_state = TableState::default();
        if !events.is_empty() {
            events_state.select(Some(0));
        }

        Self {
            inventory,
            loans,
            events,
            current_page: Page::Inventory,
            inventory_state,
            loans_state,
            events_state,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn current_len(&self) -> usize {
        match self.current_page {
            Page::Inventory => self.inventory.len(),
            Page::Loans => self.loans.len(),
            Page::Events => self.events.len(),
        }
    }

    fn current_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Inventory => &mut self.inventory_state,
            Page::Loans => &mut self.loans_state,
            Page::Events => &mut self.events_state,
        }
    }

    pub fn next(&mut self) {
        let len = self.current_len();
        if len == 0 {
            return;
        }
        let state = self.current_state();
        let i = match state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.current_len();
        if len == 0 {
            return;
        }
        let state = self.current_state();
        let i = match state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn total_stock(&self) -> u64 {
        self.inventory.iter().map(|(_, count)| count).sum()
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let TermEvent::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => app.current_state().select(Some(0)),
                KeyCode::End => {
                    let len = app.current_len();
                    if len > 0 {
                        app.current_state().select(Some(len - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Inventory => render_inventory(f, chunks[1], app),
        Page::Loans => render_loans(f, chunks[1], app),
        Page::Events => render_events(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Inventory, Page::Loans, Page::Events];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Stock: {}", app.total_stock()),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Out: {}", app.loans.len()),
        Style::default().fg(Color::Red),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_inventory(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Animal", "Available"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.inventory.iter().map(|(animal, count)| {
        let color = if *count > 0 { Color::Green } else { Color::Red };

        let cells = vec![
            Cell::from(animal.as_str()),
            Cell::from(format!("{}", count)).style(Style::default().fg(color)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(rows, [Constraint::Length(12), Constraint::Length(12)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Inventory "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.inventory_state);
}

fn render_loans(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Identity", "Animal"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.loans.iter().map(|(identity, animal)| {
        let cells = vec![
            Cell::from(truncate(identity, 20)),
            Cell::from(animal.as_str()).style(Style::default().fg(Color::Cyan)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(rows, [Constraint::Length(24), Constraint::Length(12)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Outstanding Loans "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.loans_state);
}

fn render_events(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Time", "Event", "Animal", "Actor"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.events.iter().map(|event| {
        let color = match event.event_type.as_str() {
            "added" => Color::Green,
            "borrowed" => Color::Yellow,
            "returned" => Color::Cyan,
            _ => Color::White,
        };

        let cells = vec![
            Cell::from(event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::from(event.event_type.clone()).style(Style::default().fg(color)),
            Cell::from(event.entity_id.clone()),
            Cell::from(truncate(&event.actor, 18)),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Audit Events "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.events_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &mut App) {
    let selected = match app.current_page {
        Page::Inventory => app.inventory_state.selected(),
        Page::Loans => app.loans_state.selected(),
        Page::Events => app.events_state.selected(),
    }
    .map(|i| i + 1)
    .unwrap_or(0);
    let total = app.current_len();

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
