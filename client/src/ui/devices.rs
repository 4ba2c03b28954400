use crate::app::App;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, Padding},
};

pub fn render_device_list(f: &mut Frame, app: &mut App, area: Rect, running: Option<&str>) {
    // Device list container
    let devices_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Blue))
        .title(Span::styled(
            " Cameras ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))
        .padding(Padding::new(1, 1, 0, 0));

    let devices_area = devices_block.inner(area);
    f.render_widget(devices_block, area);

    if app.devices.is_empty() {
        let hint = Line::from(Span::styled(
            "default camera",
            Style::default().fg(Color::DarkGray),
        ));
        f.render_widget(hint, devices_area);
        return;
    }

    let device_items: Vec<ListItem> = app
        .devices
        .iter()
        .map(|device| {
            let live = running == Some(device.id.as_str());
            let mut spans = vec![Span::styled(
                device.label.clone(),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            )];
            if live {
                spans.push(Span::styled(" ●", Style::default().fg(Color::Green)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let devices_list = List::new(device_items)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(" > ");

    f.render_stateful_widget(devices_list, devices_area, &mut app.devices_state);
}
