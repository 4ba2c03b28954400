use common::Severity;
use ratatui::style::Color;

// Helper: Get color based on status severity
pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Gray,
        Severity::Ok => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}
