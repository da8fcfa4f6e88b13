use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

fn key(k: &'static str, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{k:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, log_path: Option<&str>) {
    let mut lines = vec![
        Line::from("Keybinds:"),
        key("q / Ctrl-C", "Quit"),
        key("tab", "Next step"),
        key("shift-tab", "Previous step"),
        key("1-6", "Jump to a step (if unlocked)"),
        key("b", "Go back when a step has nothing to show"),
        key("y", "Copy last saved path to clipboard"),
        key("?", "Toggle this help"),
        Line::from(""),
        Line::from("Upload:"),
        key("enter", "Edit file path / upload"),
        key("esc", "Cancel editing"),
        Line::from(""),
        Line::from("Data preview:"),
        key("←/→ h/l", "Previous / next page"),
        key("s", "Cycle page size (5, 10, 20, 50)"),
        key("i", "Refresh column information"),
        key("g", "Generate exploratory charts"),
        Line::from(""),
        Line::from("Preprocessing:"),
        key("↑/↓ j/k", "Move between options and columns"),
        key("space", "Toggle / cycle option, drop column"),
        key("enter", "Edit numeric value"),
        key("r", "Run preprocessing"),
        Line::from(""),
        Line::from("Exploratory analysis:"),
        key("↑/↓", "Select chart"),
        key("g", "Regenerate charts"),
        key("w", "Write charts as PNG files"),
        Line::from(""),
        Line::from("Model training:"),
        key("m", "Cycle model type"),
        key("t", "Use column as target"),
        key("space", "Toggle column as feature"),
        key("r", "Train"),
        Line::from(""),
        Line::from("Results:"),
        key("d", "Download processed data as CSV"),
    ];
    if let Some(path) = log_path {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Log file: ", Style::default().fg(Color::Gray)),
            Span::styled(path.to_string(), Style::default().fg(Color::Cyan)),
        ]));
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
