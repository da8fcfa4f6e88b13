mod charts;
mod export;
mod help;
mod state;

use crate::cli::{build_config, preprocess_options, train_options, Cli};
use crate::export::ResultExport;
use crate::gate;
use crate::logging::{self, LogTarget};
use crate::model::{EdaChart, PipelineStep};
use crate::orchestrator::{self, UiCommand, WorkflowController, WorkflowEvent};
use crate::transport::HttpBackend;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use state::{InputTarget, PreprocessField, PreprocessForm, TrainForm, UiState};
use std::path::PathBuf;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // The terminal belongs to the UI, so logs go to a file.
    let log_path = logging::init(LogTarget::File)?;

    let cfg = build_config(&args);
    let backend = HttpBackend::new(&cfg)?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = WorkflowController::new(
        backend,
        cfg.request_timeout,
        ResultExport::new(cfg.export_dir.clone()),
    )
    .with_events(event_tx.clone());

    let mut initial = UiState {
        base_url: cfg.base_url.clone(),
        log_path,
        preprocess: PreprocessForm::from_options(&preprocess_options(&args)),
        train: TrainForm::from_options(train_options(&args).as_ref()),
        ..Default::default()
    };
    if let Some(path) = args.file.as_ref() {
        initial.upload_path = path.display().to_string();
        let _ = cmd_tx.send(UiCommand::Upload(path.clone()));
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(initial, event_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                let mut send = |cmd: UiCommand| {
                    let _ = cmd_tx.send(cmd);
                };
                if handle_key(&mut state, k, &mut send) == KeyOutcome::Quit {
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, ev: WorkflowEvent) {
    match ev {
        WorkflowEvent::State(snapshot) => state.apply_snapshot(*snapshot),
        WorkflowEvent::Exported(files) => {
            state.info = export::exported_message(&files);
            state.exported.extend(files);
        }
        WorkflowEvent::Info(msg) => state.info = msg,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

/// Send a command that talks to the service, unless one is already running.
fn dispatch(state: &mut UiState, send: &mut impl FnMut(UiCommand), cmd: UiCommand) {
    if state.pipeline.loading {
        state.info = "Still working on the previous request…".into();
        return;
    }
    send(cmd);
}

fn navigate_by(state: &UiState, send: &mut impl FnMut(UiCommand), delta: isize) {
    let idx = state.pipeline.active_step.index() as isize + delta;
    if let Some(step) = usize::try_from(idx).ok().and_then(PipelineStep::from_index) {
        send(UiCommand::Navigate(step));
    }
}

fn handle_key(state: &mut UiState, k: KeyEvent, send: &mut impl FnMut(UiCommand)) -> KeyOutcome {
    if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
        send(UiCommand::Quit);
        return KeyOutcome::Quit;
    }

    if let Some(input) = state.input.as_mut() {
        match k.code {
            KeyCode::Esc => state.input = None,
            KeyCode::Backspace => {
                input.buffer.pop();
            }
            KeyCode::Char(c) => input.buffer.push(c),
            KeyCode::Enter => {
                if state.commit_input() == Some(InputTarget::UploadPath) {
                    submit_upload(state, send);
                }
            }
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match k.code {
        KeyCode::Char('q') => {
            send(UiCommand::Quit);
            return KeyOutcome::Quit;
        }
        KeyCode::Char('?') => state.show_help = !state.show_help,
        KeyCode::Tab => navigate_by(state, send, 1),
        KeyCode::BackTab => navigate_by(state, send, -1),
        KeyCode::Char(c @ '1'..='6') => {
            let idx = (c as u8 - b'1') as usize;
            if let Some(step) = PipelineStep::from_index(idx) {
                send(UiCommand::Navigate(step));
            }
        }
        KeyCode::Char('b') => {
            if let Some(gap) = state
                .pipeline
                .missing_prerequisite(state.pipeline.active_step)
            {
                send(UiCommand::Navigate(gap.back_to));
            }
        }
        KeyCode::Char('y') => match state.last_exported_path() {
            Some(path) => match export::copy_to_clipboard(&path) {
                Ok(()) => state.info = format!("Copied: {path}"),
                Err(e) => state.info = format!("Copy failed: {e:#}"),
            },
            None => state.info = "Nothing saved yet.".into(),
        },
        code => handle_step_key(state, code, send),
    }
    KeyOutcome::Continue
}

fn submit_upload(state: &mut UiState, send: &mut impl FnMut(UiCommand)) {
    if state.upload_path.is_empty() {
        state.info = "Enter the path of a CSV file first.".into();
        return;
    }
    let path = PathBuf::from(&state.upload_path);
    dispatch(state, send, UiCommand::Upload(path));
}

fn handle_step_key(state: &mut UiState, code: KeyCode, send: &mut impl FnMut(UiCommand)) {
    match state.pipeline.active_step {
        PipelineStep::Upload => match code {
            KeyCode::Enter | KeyCode::Char('e') => state.begin_input(InputTarget::UploadPath),
            KeyCode::Char('u') => submit_upload(state, send),
            _ => {}
        },
        PipelineStep::View => {
            let rows = state
                .pipeline
                .original
                .as_ref()
                .map_or(0, |t| t.row_count());
            match code {
                KeyCode::Left | KeyCode::Char('h') => {
                    state.original_pager.prev(rows);
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    state.original_pager.next(rows);
                }
                KeyCode::Char('s') => state.original_pager.cycle_page_size(),
                KeyCode::Char('i') => dispatch(state, send, UiCommand::RefreshInfo),
                KeyCode::Char('g') => dispatch(state, send, UiCommand::GenerateEda),
                _ => {}
            }
        }
        PipelineStep::Preprocess => {
            let rows = state
                .pipeline
                .processed
                .as_ref()
                .map_or(0, |p| p.table.row_count());
            match code {
                KeyCode::Up | KeyCode::Char('k') => state.preprocess.move_cursor(false),
                KeyCode::Down | KeyCode::Char('j') => state.preprocess.move_cursor(true),
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if let Some(target) = state.preprocess.activate() {
                        state.begin_input(target);
                    }
                }
                KeyCode::Left | KeyCode::Char('h') => {
                    state.processed_pager.prev(rows);
                }
                KeyCode::Right | KeyCode::Char('l') => {
                    state.processed_pager.next(rows);
                }
                KeyCode::Char('s') => state.processed_pager.cycle_page_size(),
                KeyCode::Char('r') => match state.preprocess.to_options() {
                    Ok(opts) => dispatch(state, send, UiCommand::Preprocess(opts)),
                    Err(e) => state.info = e.to_string(),
                },
                _ => {}
            }
        }
        PipelineStep::Explore => {
            let charts = state.pipeline.eda.as_ref().map_or(0, |e| e.charts().len());
            match code {
                KeyCode::Up | KeyCode::Char('k') => {
                    state.eda_selected = state.eda_selected.saturating_sub(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    state.eda_selected = (state.eda_selected + 1).min(charts.saturating_sub(1));
                }
                KeyCode::Char('g') => dispatch(state, send, UiCommand::GenerateEda),
                KeyCode::Char('w') => dispatch(state, send, UiCommand::SaveEdaImages),
                _ => {}
            }
        }
        PipelineStep::Train => match code {
            KeyCode::Up | KeyCode::Char('k') => state.train.move_cursor(false),
            KeyCode::Down | KeyCode::Char('j') => state.train.move_cursor(true),
            KeyCode::Char('m') => state.train.cycle_model(),
            KeyCode::Char('t') => {
                if !state.train.set_target() {
                    state.info = "Select a column to use as target.".into();
                }
            }
            KeyCode::Char(' ') => {
                if state.train.cursor == 0 {
                    state.train.cycle_model();
                } else if let Err(msg) = state.train.toggle_feature() {
                    state.info = msg.to_string();
                }
            }
            KeyCode::Char('r') => {
                let opts = state.train.to_options();
                match opts.validate() {
                    Ok(()) => dispatch(state, send, UiCommand::Train(opts)),
                    Err(e) => state.info = e.to_string(),
                }
            }
            _ => {}
        },
        PipelineStep::Results => {
            if code == KeyCode::Char('d') {
                dispatch(state, send, UiCommand::Download);
            }
        }
    }
}

fn draw(area: Rect, f: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(4)])
        .split(area);

    let active = state.pipeline.active_step;
    let open = gate::enterable_steps(active);
    let titles: Vec<Line> = PipelineStep::ALL
        .iter()
        .map(|step| {
            let label = format!("{} {}", step.index() + 1, step.title());
            if open.contains(step) {
                Line::from(label)
            } else {
                Line::from(Span::styled(label, Style::default().fg(Color::DarkGray)))
            }
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(active.index())
        .block(Block::default().borders(Borders::ALL).title("tabular-wizard"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    if state.show_help {
        let log_path = state.log_path.as_ref().map(|p| p.display().to_string());
        help::draw_help(chunks[1], f, log_path.as_deref());
    } else if active == PipelineStep::Explore && state.pipeline.eda.is_none() {
        draw_explore_empty(chunks[1], f, state);
    } else if let Some(gap) = state.pipeline.missing_prerequisite(active) {
        draw_empty_state(chunks[1], f, gap.guidance, gap.back_to);
    } else {
        match active {
            PipelineStep::Upload => draw_upload(chunks[1], f, state),
            PipelineStep::View => draw_view(chunks[1], f, state),
            PipelineStep::Preprocess => draw_preprocess(chunks[1], f, state),
            PipelineStep::Explore => draw_explore(chunks[1], f, state),
            PipelineStep::Train => draw_train(chunks[1], f, state),
            PipelineStep::Results => draw_results(chunks[1], f, state),
        }
    }

    draw_status(chunks[2], f, state);
}

/// Request status on the first line, the latest message on the second. A
/// recorded backend error never hides client-side messages that came after it.
fn draw_status(area: Rect, f: &mut Frame, state: &UiState) {
    let mut lines = Vec::with_capacity(2);
    if state.pipeline.loading {
        lines.push(Line::from(Span::styled(
            "Working…",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(err) = state.pipeline.error.as_ref() {
        lines.push(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(err.clone(), Style::default().fg(Color::Red)),
        ]));
    }
    if !state.info.is_empty() {
        lines.push(Line::from(state.info.clone()));
    }
    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{}  (? for help)", state.base_url)),
    );
    f.render_widget(p, area);
}

fn draw_empty_state(area: Rect, f: &mut Frame, guidance: &str, back_to: PipelineStep) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            guidance.to_string(),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(format!("Press 'b' to go back to {}.", back_to.title())),
    ];
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_explore_empty(area: Rect, f: &mut Frame, state: &UiState) {
    if state.pipeline.original.is_none() {
        draw_empty_state(
            area,
            f,
            "No data available. Upload a CSV file first.",
            PipelineStep::Upload,
        );
        return;
    }
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from("No charts generated yet."),
        Line::from(""),
        Line::from("Press 'g' to generate histograms, a correlation matrix and box plots."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Exploratory analysis"));
    f.render_widget(p, area);
}

fn label(text: &str) -> Span<'static> {
    Span::styled(format!("{text:<16}"), Style::default().fg(Color::Gray))
}

fn draw_upload(area: Rect, f: &mut Frame, state: &UiState) {
    let editing = state
        .input
        .as_ref()
        .filter(|i| i.target == InputTarget::UploadPath);
    let path_line = match editing {
        Some(input) => Line::from(vec![
            label("CSV file"),
            Span::styled(
                format!("{}▏", input.buffer),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        None if state.upload_path.is_empty() => Line::from(vec![
            label("CSV file"),
            Span::styled("<press Enter to type a path>", Style::default().fg(Color::DarkGray)),
        ]),
        None => Line::from(vec![label("CSV file"), Span::raw(state.upload_path.clone())]),
    };

    let mut lines = vec![
        Line::from("Upload a CSV file to start the analysis."),
        Line::from(""),
        path_line,
        Line::from(""),
        Line::from(Span::styled(
            "Enter: edit path, Enter again: upload, u: upload current path",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    if let Some(original) = state.pipeline.original.as_ref() {
        let (rows, cols) = original.shape();
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            label("Loaded"),
            Span::raw(format!(
                "{} rows × {} columns ({} shown)",
                original.total_rows(),
                cols,
                rows
            )),
        ]));
        lines.push(Line::from(vec![
            label("Columns"),
            Span::raw(original.columns().join(", ")),
        ]));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Upload"));
    f.render_widget(p, area);
}

fn draw_view(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(original) = state.pipeline.original.as_ref() else {
        return;
    };
    let Some(info) = state.pipeline.data_info.as_ref() else {
        charts::render_paged_table(f, area, "Data preview", original, &state.original_pager);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);
    charts::render_paged_table(f, chunks[0], "Data preview", original, &state.original_pager);

    let mut lines = vec![
        Line::from(format!("{} rows × {} columns", info.shape.0, info.shape.1)),
        Line::from(format!("{} missing values", info.total_missing())),
        Line::from(""),
    ];
    for col in &info.columns {
        let dtype = info.dtypes.get(col).map_or("?", String::as_str);
        let missing = info.missing_values.get(col).copied().unwrap_or(0);
        let missing_style = if missing > 0 {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{col:<14} ")),
            Span::styled(format!("{dtype:<8}"), Style::default().fg(Color::Cyan)),
            Span::styled(format!(" {missing} missing"), missing_style),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Columns"));
    f.render_widget(p, chunks[1]);
}

fn check(on: bool) -> &'static str {
    if on {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Scroll offset that keeps `cursor` inside a bordered area.
fn scroll_for(cursor: usize, area: Rect) -> u16 {
    let visible = area.height.saturating_sub(2) as usize;
    cursor.saturating_sub(visible.saturating_sub(1)) as u16
}

fn cursor_style(selected: bool) -> Style {
    if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    }
}

fn draw_preprocess(area: Rect, f: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(0)])
        .split(area);

    let form = &state.preprocess;
    let editing = |target: InputTarget, value: &str| -> String {
        match state.input.as_ref() {
            Some(i) if i.target == target => format!("{}▏", i.buffer),
            _ if value.is_empty() => "-".into(),
            _ => value.to_string(),
        }
    };
    let lines: Vec<Line> = (0..form.row_count())
        .map(|row| {
            let text = match form.field_at(row) {
                PreprocessField::FillMethod => {
                    format!("Missing values  {}", form.fill_method.label())
                }
                PreprocessField::FillValue => format!(
                    "Fill value      {}",
                    editing(InputTarget::FillValue, &form.fill_value)
                ),
                PreprocessField::Normalize => format!("{} Normalize", check(form.normalize)),
                PreprocessField::RemoveOutliers => {
                    format!("{} Remove outliers", check(form.remove_outliers))
                }
                PreprocessField::OutlierThreshold => format!(
                    "IQR threshold   {}",
                    editing(InputTarget::OutlierThreshold, &form.outlier_threshold)
                ),
                PreprocessField::Column(i) => {
                    let col = form.columns().get(i).map_or("", String::as_str);
                    format!("{} drop {col}", check(form.drop.contains(col)))
                }
            };
            Line::from(Span::styled(text, cursor_style(row == form.cursor)))
        })
        .collect();
    let p = Paragraph::new(lines)
        .scroll((scroll_for(form.cursor, chunks[0]), 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Options (r to run)"),
        );
    f.render_widget(p, chunks[0]);

    let Some(processed) = state.pipeline.processed.as_ref() else {
        let p = Paragraph::new("Choose options on the left, then press 'r'.")
            .block(Block::default().borders(Borders::ALL).title("Processed data"));
        f.render_widget(p, chunks[1]);
        return;
    };

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(processed.preprocessing_steps.len() as u16 + 3),
        ])
        .split(chunks[1]);
    charts::render_paged_table(
        f,
        right[0],
        "Processed data",
        &processed.table,
        &state.processed_pager,
    );

    let mut steps: Vec<Line> = processed
        .preprocessing_steps
        .iter()
        .enumerate()
        .map(|(i, s)| Line::from(format!("{}. {s}", i + 1)))
        .collect();
    if state.pipeline.processed_is_stale() {
        steps.push(Line::from(Span::styled(
            "Derived from an earlier upload; run again to refresh.",
            Style::default().fg(Color::Yellow),
        )));
    }
    let p = Paragraph::new(steps).block(Block::default().borders(Borders::ALL).title("Applied steps"));
    f.render_widget(p, right[1]);
}

fn draw_explore(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(eda) = state.pipeline.eda.as_ref() else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(0)])
        .split(area);

    let available = eda.charts();
    let mut lines: Vec<Line> = available
        .iter()
        .enumerate()
        .map(|(i, (chart, _))| {
            Line::from(Span::styled(
                chart.title().to_string(),
                cursor_style(i == state.eda_selected),
            ))
        })
        .collect();
    for chart in EdaChart::ALL {
        if eda.chart(chart).is_none() {
            lines.push(Line::from(Span::styled(
                format!("{} (not returned)", chart.title()),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Charts"));
    f.render_widget(p, chunks[0]);

    let mut detail = Vec::new();
    if let Some((chart, png)) = available.get(state.eda_selected) {
        detail.push(Line::from(vec![label("Chart"), Span::raw(chart.title())]));
        let dims = charts::png_dimensions(png)
            .map_or_else(|| "unknown".to_string(), |(w, h)| format!("{w} × {h} px"));
        detail.push(Line::from(vec![label("Image"), Span::raw(dims)]));
        detail.push(Line::from(vec![
            label("Size"),
            Span::raw(format!("{:.1} KiB", png.len() as f64 / 1024.0)),
        ]));
        detail.push(Line::from(vec![
            label("File"),
            Span::raw(format!("eda_{}.png", chart.file_stem())),
        ]));
    } else {
        detail.push(Line::from("The service returned no charts."));
    }
    detail.push(Line::from(""));
    detail.push(Line::from(Span::styled(
        "Terminals cannot show the images; press 'w' to write them as PNG files.",
        Style::default().fg(Color::DarkGray),
    )));
    if state.pipeline.eda_is_stale() {
        detail.push(Line::from(Span::styled(
            "Charts describe an earlier upload; press 'g' to regenerate.",
            Style::default().fg(Color::Yellow),
        )));
    }
    let p = Paragraph::new(detail)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Details"));
    f.render_widget(p, chunks[1]);
}

fn draw_train(area: Rect, f: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(0)])
        .split(area);

    let form = &state.train;
    let mut lines = vec![Line::from(Span::styled(
        format!("Model  {}", form.model_type.label()),
        cursor_style(form.cursor == 0),
    ))];
    for (i, col) in form.columns().iter().enumerate() {
        let marker = if form.target.as_deref() == Some(col.as_str()) {
            "[T]"
        } else {
            check(form.features.contains(col))
        };
        lines.push(Line::from(Span::styled(
            format!("{marker} {col}"),
            cursor_style(form.cursor == i + 1),
        )));
    }
    let p = Paragraph::new(lines)
        .scroll((scroll_for(form.cursor, chunks[0]), 0))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Target [T] / features [x]"),
        );
    f.render_widget(p, chunks[0]);

    let opts = form.to_options();
    let mut detail = vec![
        Line::from(vec![label("Model"), Span::raw(opts.model_type.label())]),
        Line::from(Span::styled(
            opts.model_type.description(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(vec![
            label("Target"),
            Span::raw(form.target.clone().unwrap_or_else(|| "-".into())),
        ]),
        Line::from(vec![
            label("Features"),
            Span::raw(if opts.features.is_empty() {
                "-".to_string()
            } else {
                opts.features.join(", ")
            }),
        ]),
        Line::from(""),
    ];
    match opts.validate() {
        Ok(()) => detail.push(Line::from(Span::styled(
            "Press 'r' to train.",
            Style::default().fg(Color::Green),
        ))),
        Err(e) => detail.push(Line::from(Span::styled(
            e.to_string(),
            Style::default().fg(Color::Yellow),
        ))),
    }
    let p = Paragraph::new(detail)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Model training"));
    f.render_widget(p, chunks[1]);
}

fn draw_results(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(result) = state.pipeline.results.as_ref() else {
        return;
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(rows[0]);
    charts::render_metrics(f, cols[0], result);
    charts::render_model_detail(f, cols[1], result);

    let saved = match state.exported.last() {
        Some(file) => format!(
            "Last saved: {} ({} bytes, {})",
            file.path.display(),
            file.bytes,
            export::local_time(&file.exported_at)
        ),
        None => "Press 'd' to download the processed data as CSV.".to_string(),
    };
    let p = Paragraph::new(saved).block(Block::default().borders(Borders::ALL).title("Export"));
    f.render_widget(p, rows[1]);
}
