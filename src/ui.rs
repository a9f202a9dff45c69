use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};

use crate::domain::CVConfig;
use crate::model::{LineKind, Model, UIData, UILine};

// Title and file line.
pub const HEADER_HEIGHT: usize = 2;
pub const SEARCH_BOX_MAX_LINES: usize = 3;
pub const SEARCH_BOX_BORDER: usize = 2;
pub const TABS_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;

const SEARCH_TITLE: &str = " Bulk header search (comma or newline separated) ";
const SEARCH_PLACEHOLDER: &str = "Type header names or keywords here...";

pub struct ExplorerUI {
    highlight: Color,
}

impl ExplorerUI {
    pub fn new(_cfg: &CVConfig) -> Self {
        Self {
            highlight: Color::Yellow,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let data = model.get_uidata();
        let [header_area, search_area, tabs_area, body_area, status_area] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT as u16),
            Constraint::Length(data.layout.search_height as u16),
            Constraint::Length(TABS_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.draw_header(data, frame, header_area);
        self.draw_search(data, frame, search_area);
        match &data.error_message {
            Some(message) => self.draw_error(message, frame, tabs_area.union(body_area)),
            None => {
                self.draw_tabs(data, frame, tabs_area);
                self.draw_body(data, frame, body_area);
            }
        }
        self.draw_statusline(data, frame, status_area);

        if data.show_file_picker {
            self.draw_file_picker(data, frame);
        }
        if data.show_popup {
            self.draw_popup(&data.popup_message, frame);
        }
    }

    fn draw_header(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            Span::raw("📊 "),
            Span::styled(data.title.clone(), Style::new().bold()),
        ]);
        let file = match &data.file_name {
            Some(name) => Line::from(vec![
                "File: ".into(),
                Span::styled(name.clone(), Style::new().fg(self.highlight)),
                Span::styled(
                    format!(
                        " ({} columns, {} rows) in {}",
                        data.ncolumns, data.nrows, data.directory
                    ),
                    Style::new().dark_gray(),
                ),
            ]),
            None => Line::from(vec![
                "Directory: ".into(),
                Span::styled(data.directory.clone(), Style::new().fg(self.highlight)),
            ]),
        };
        frame.render_widget(Paragraph::new(Text::from(vec![title, file])), area);
    }

    fn draw_search(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let border_style = if data.editing_search {
            Style::new().fg(self.highlight)
        } else {
            Style::new().dark_gray()
        };
        let block = Block::bordered()
            .title(SEARCH_TITLE)
            .border_set(border::ROUNDED)
            .border_style(border_style);

        let border = SEARCH_BOX_BORDER as u16;
        let visible_lines = area.height.saturating_sub(border) as usize;
        let visible_cols = area.width.saturating_sub(border) as usize;
        let (line, col) = data.search.cursor_line_col();
        let offset = line.saturating_sub(visible_lines.saturating_sub(1));
        let col_offset = col.saturating_sub(visible_cols.saturating_sub(1));

        let text = if data.search.input.is_empty() && !data.editing_search {
            Text::from(SEARCH_PLACEHOLDER.dark_gray().italic())
        } else {
            Text::from(data.search.input.clone())
        };
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .scroll((clamp_u16(offset), clamp_u16(col_offset))),
            area,
        );

        if data.editing_search {
            frame.set_cursor_position((
                area.x + 1 + clamp_u16(col - col_offset),
                area.y + 1 + clamp_u16(line - offset),
            ));
        }
    }

    fn draw_tabs(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let tabs = Tabs::new(data.tab_titles.clone())
            .select(data.active_tab)
            .style(Style::new().dark_gray())
            .highlight_style(Style::new().fg(self.highlight).bold().underlined())
            .divider(" │ ");
        frame.render_widget(tabs, area);
    }

    fn line_style(&self, kind: LineKind) -> Style {
        match kind {
            LineKind::Header { focused: true } => Style::new().bold().add_modifier(Modifier::REVERSED),
            LineKind::Header { focused: false } => Style::new().bold(),
            LineKind::Caption => Style::new().dark_gray().italic(),
            LineKind::Value => Style::new(),
            LineKind::Frame => Style::new().dark_gray(),
            LineKind::Note => Style::new().fg(self.highlight),
            LineKind::Placeholder => Style::new().fg(Color::Blue),
        }
    }

    fn draw_body(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        // Only the visible window is handed to ratatui, its scroll offset is a u16.
        let lines: Vec<Line> = data
            .lines
            .iter()
            .skip(data.scroll)
            .take(area.height as usize)
            .map(|UILine { text, kind }| Line::styled(text.clone(), self.line_style(*kind)))
            .collect();
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_error(&self, message: &str, frame: &mut Frame, area: Rect) {
        let text = Text::from(vec![
            Line::styled(message.to_string(), Style::new().fg(Color::Red).bold()),
            Line::from(""),
            Line::from("Press r to rescan the directory or q to quit.".dark_gray()),
        ]);
        frame.render_widget(
            Paragraph::new(text)
                .block(Block::bordered().border_style(Style::new().fg(Color::Red)))
                .wrap(Wrap { trim: false }),
            area,
        );
    }

    fn draw_statusline(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let hints = " ? help  / search  f file  c copy  q quit ";
        let [message_area, hints_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(hints.chars().count() as u16),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(data.status_message.clone()), message_area);
        frame.render_widget(Paragraph::new(hints.dark_gray()), hints_area);
    }

    fn draw_file_picker(&self, data: &UIData, frame: &mut Frame) {
        let area = centered_rect(frame.area(), 60, 60);
        let items: Vec<ListItem> = data
            .files
            .iter()
            .map(|name| ListItem::new(name.clone()))
            .collect();
        let list = List::new(items)
            .block(
                Block::bordered()
                    .title(" Select a CSV file to analyze: ")
                    .border_set(border::THICK),
            )
            .highlight_style(Style::new().fg(self.highlight).add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(data.file_cursor));
        frame.render_widget(Clear, area);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_popup(&self, message: &str, frame: &mut Frame) {
        let area = centered_rect(frame.area(), 70, 80);
        let popup = Paragraph::new(message.to_string()).block(
            Block::bordered()
                .title(" Help ")
                .title_bottom(Line::from(" <Esc> close ").centered())
                .border_set(border::THICK),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }
}

fn clamp_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;
    use ratatui::{Terminal, backend::TestBackend};
    use std::path::Path;

    const WIDTH: u16 = 100;
    const HEIGHT: u16 = 30;

    fn render(model: &Model) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
        let mut ui = ExplorerUI::new(&CVConfig::default());
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..HEIGHT)
            .map(|y| (0..WIDTH).map(|x| buffer[(x, y)].symbol()).collect::<String>())
            .collect()
    }

    fn model(dir: &str, file: Option<&str>) -> Model {
        let mut cfg = CVConfig::default().with_data_dir(
            Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("tests")
                .join("fixtures")
                .join(dir),
        );
        if let Some(file) = file {
            cfg = cfg.with_initial_file(file.to_string());
        }
        Model::init(&cfg, WIDTH as usize, HEIGHT as usize).unwrap()
    }

    fn contains(screen: &[String], needle: &str) -> bool {
        screen.iter().any(|line| line.contains(needle))
    }

    #[test]
    fn draws_page_with_search_box_and_tabs() {
        let screen = render(&model("csvs", Some("people.csv")));
        assert!(contains(&screen, "Data Analysis Dashboard"));
        assert!(contains(&screen, "people.csv"));
        assert!(contains(&screen, "Bulk header search"));
        assert!(contains(&screen, SEARCH_PLACEHOLDER));
        assert!(contains(&screen, "Copy-Paste Friendly (<300 unique values) [4]"));
        assert!(contains(&screen, "AgeGroup"));
    }

    #[test]
    fn draws_error_when_directory_has_no_csv_files() {
        let screen = render(&model("no_csv", None));
        assert!(contains(&screen, "No CSV files found"));
        assert!(!contains(&screen, "Copy-Paste Friendly"));
    }

    #[test]
    fn draws_file_picker_and_help() {
        let mut model = model("csvs", Some("people.csv"));
        model.update(Some(Message::OpenFilePicker)).unwrap();
        let screen = render(&model);
        assert!(contains(&screen, "Select a CSV file to analyze:"));
        assert!(contains(&screen, "> people.csv"));

        model.update(Some(Message::Exit)).unwrap();
        model.update(Some(Message::Help)).unwrap();
        let screen = render(&model);
        assert!(contains(&screen, " Help "));
        assert!(contains(&screen, "Copy all values of the column"));
    }

    #[test]
    fn body_scrolls_past_u16_range() {
        let mut data = UIData::empty();
        data.lines = (0..70_000)
            .map(|i| UILine {
                text: format!("line {i}"),
                kind: LineKind::Value,
            })
            .collect();
        data.scroll = 66_000;

        let mut terminal = Terminal::new(TestBackend::new(WIDTH, 5)).unwrap();
        let ui = ExplorerUI::new(&CVConfig::default());
        terminal
            .draw(|f| ui.draw_body(&data, f, f.area()))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let first: String = (0..WIDTH).map(|x| buffer[(x, 0)].symbol()).collect();
        assert!(first.starts_with("line 66000 "));
    }

    #[test]
    fn search_cursor_stays_inside_box() {
        let mut data = UIData::empty();
        data.editing_search = true;
        data.search.input = "x".repeat(150);
        data.search.cursor_pos = 150;

        let mut terminal = Terminal::new(TestBackend::new(40, 3)).unwrap();
        let ui = ExplorerUI::new(&CVConfig::default());
        terminal
            .draw(|f| ui.draw_search(&data, f, f.area()))
            .unwrap();
        let cursor = terminal.get_cursor_position().unwrap();
        assert_eq!(cursor.y, 1);
        assert_eq!(cursor.x, 38);
    }

    #[test]
    fn expanded_panel_shows_values() {
        let mut model = model("csvs", Some("people.csv"));
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::MoveDown)).unwrap();
        model.update(Some(Message::TogglePanel)).unwrap();
        let screen = render(&model);
        assert!(contains(&screen, "Copy all values below:"));
        assert!(contains(&screen, "│ Vienna"));
    }
}
