use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Sparkline, Table},
    Frame,
};

use crate::model::{ModelFamily, ModelResult, TabularArtifact};
use crate::view::TablePager;

const MAX_CELL_WIDTH: u16 = 16;

/// Render the current page of `table` with a footer describing the window.
pub fn render_paged_table(
    f: &mut Frame,
    area: Rect,
    title: &str,
    table: &TabularArtifact,
    pager: &TablePager,
) {
    let rows = table.row_count();
    let widths: Vec<Constraint> = table
        .columns()
        .iter()
        .map(|c| Constraint::Length((c.chars().count() as u16).clamp(6, MAX_CELL_WIDTH)))
        .collect();

    let header = Row::new(
        table
            .columns()
            .iter()
            .map(|c| Cell::from(c.as_str()).style(Style::default().fg(Color::Yellow))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let body: Vec<Row> = pager
        .visible_rows(table)
        .iter()
        .map(|r| {
            Row::new(r.iter().map(|v| {
                let style = if v.is_null() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Cell::from(v.to_string()).style(style)
            }))
        })
        .collect();

    let mut footer = pager.label(rows);
    if rows > 0 {
        footer.push_str(&format!(
            " | page {}/{} | {} per page",
            pager.page(rows) + 1,
            pager.page_count(rows),
            pager.page_size()
        ));
    }
    if table.is_preview() {
        footer.push_str(&format!(" | preview of {} rows", table.total_rows()));
    }

    let widget = Table::new(body, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("{title} ({} × {})", table.total_rows(), table.column_count()))
            .title_bottom(Line::from(footer)),
    );
    f.render_widget(widget, area);
}

fn metric_label(name: &str) -> &str {
    match name {
        "mse" => "MSE",
        "rmse" => "RMSE",
        "mae" => "MAE",
        "r2" => "R²",
        "accuracy" => "Accuracy",
        "precision" => "Precision",
        "recall" => "Recall",
        "f1" => "F1-score",
        other => other,
    }
}

pub fn render_metrics(f: &mut Frame, area: Rect, result: &ModelResult) {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Model: ", Style::default().fg(Color::Gray)),
            Span::raw(result.model_type().label()),
        ]),
        Line::from(vec![
            Span::styled("Target: ", Style::default().fg(Color::Gray)),
            Span::raw(result.target.clone()),
        ]),
        Line::from(vec![
            Span::styled("Features: ", Style::default().fg(Color::Gray)),
            Span::raw(result.features.join(", ")),
        ]),
        Line::from(""),
    ];
    for (name, value) in result.metrics() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<10}", metric_label(name)),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw(format!("{value:.4}")),
        ]));
    }
    if !result.folds.is_empty() {
        lines.push(Line::from(format!(
            "Averaged over {} cross-validation folds",
            result.folds.len()
        )));
    }
    match &result.family {
        ModelFamily::Regression {
            intercept,
            coefficients,
            ..
        } => {
            lines.push(Line::from(""));
            if let Some(b) = intercept {
                lines.push(Line::from(format!("Intercept  {b:.4}")));
            }
            for (name, c) in coefficients {
                lines.push(Line::from(format!("  {name:<14} {c:+.4}")));
            }
        }
        ModelFamily::Classification { .. } | ModelFamily::RandomForest { .. } => {}
    }
    if let Some(classes) = result.classes().filter(|c| !c.is_empty()) {
        let classes: Vec<String> = classes.iter().map(ToString::to_string).collect();
        lines.push(Line::from(""));
        lines.push(Line::from(format!("Classes: {}", classes.join(", "))));
    }
    if let Some(next) = result.next_prediction {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Next prediction: ", Style::default().fg(Color::Gray)),
            Span::styled(format!("{next:.4}"), Style::default().fg(Color::Green)),
        ]));
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Metrics"));
    f.render_widget(p, area);
}

/// Feature importance bars (random forest) or the prediction trace otherwise.
pub fn render_model_detail(f: &mut Frame, area: Rect, result: &ModelResult) {
    let ranked = result.ranked_importance();
    if !ranked.is_empty() {
        let bars: Vec<Bar> = ranked
            .iter()
            .map(|(name, weight)| {
                Bar::default()
                    .label(Line::from(name.to_string()))
                    .value((weight * 1000.0).round() as u64)
                    .text_value(format!("{:.1}%", weight * 100.0))
                    .style(Style::default().fg(Color::Cyan))
            })
            .collect();
        let chart = BarChart::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Feature importance"),
            )
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .max(1000)
            .data(BarGroup::default().bars(&bars));
        f.render_widget(chart, area);
        return;
    }

    if result.predictions.is_empty() {
        let p = Paragraph::new("The service returned no predictions.")
            .block(Block::default().borders(Borders::ALL).title("Predictions"));
        f.render_widget(p, area);
        return;
    }

    let data = scale_for_sparkline(&result.predictions);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Predictions ({})", result.predictions.len())),
        )
        .style(Style::default().fg(Color::Green))
        .data(&data);
    f.render_widget(spark, chunks[0]);
    let (lo, hi) = min_max(&result.predictions);
    f.render_widget(
        Paragraph::new(format!(" min {lo:.3}  max {hi:.3}")),
        chunks[1],
    );
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

/// Shift and scale into small non-negative integers for a sparkline.
fn scale_for_sparkline(values: &[f64]) -> Vec<u64> {
    let (lo, hi) = min_max(values);
    let span = (hi - lo).max(f64::EPSILON);
    values
        .iter()
        .map(|v| (((v - lo) / span) * 100.0).round() as u64 + 1)
        .collect()
}

/// Width and height from a PNG's IHDR chunk.
pub fn png_dimensions(png: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
    if png.len() < 24 || !png.starts_with(SIGNATURE) || &png[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(png[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(png[20..24].try_into().ok()?);
    Some((width, height))
}
