use arboard::Clipboard;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{CVConfig, CVError, HELP_TEXT, Message};
use crate::explorer::{SearchQuery, explore};
use crate::inputter::{InputResult, Inputter};
use crate::loader::{list_files, load_table};
use crate::render::{PAGE_TITLE, Page, Panel, PanelBody, Section, SectionKind, build_page};
use crate::table::Table;
use crate::ui::{
    HEADER_HEIGHT, SEARCH_BOX_BORDER, SEARCH_BOX_MAX_LINES, STATUSLINE_HEIGHT, TABS_HEIGHT,
};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    READY,
    NOFILES,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    BROWSE,
    SEARCH,
    FILEPICKER,
    POPUP,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind {
    Header { focused: bool },
    Caption,
    Value,
    Frame,
    Note,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UILine {
    pub text: String,
    pub kind: LineKind,
}

impl UILine {
    fn new(text: impl Into<String>, kind: LineKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

// Line range of one panel in the flattened section.
struct PanelSpan {
    key: String,
    start: usize,
    end: usize,
}

struct SectionLines {
    lines: Vec<UILine>,
    spans: Vec<PanelSpan>,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub search_height: usize,
    pub body_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize, search_lines: usize) -> Self {
        let search_height = search_lines.clamp(1, SEARCH_BOX_MAX_LINES) + SEARCH_BOX_BORDER;
        let body_height = ui_height
            .saturating_sub(HEADER_HEIGHT + search_height + TABS_HEIGHT + STATUSLINE_HEIGHT)
            .max(1);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            search_height,
            body_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct UIData {
    pub title: String,
    pub directory: String,
    pub file_name: Option<String>,
    pub nrows: usize,
    pub ncolumns: usize,
    pub search: InputResult,
    pub editing_search: bool,
    pub tab_titles: Vec<String>,
    pub active_tab: usize,
    pub lines: Vec<UILine>,
    pub scroll: usize,
    pub error_message: Option<String>,
    pub show_popup: bool,
    pub popup_message: String,
    pub show_file_picker: bool,
    pub files: Vec<String>,
    pub file_cursor: usize,
    pub layout: UILayout,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            title: PAGE_TITLE.to_string(),
            directory: String::new(),
            file_name: None,
            nrows: 0,
            ncolumns: 0,
            search: InputResult::default(),
            editing_search: false,
            tab_titles: Vec::new(),
            active_tab: 0,
            lines: Vec::new(),
            scroll: 0,
            error_message: None,
            show_popup: false,
            popup_message: String::new(),
            show_file_picker: false,
            files: Vec::new(),
            file_cursor: 0,
            layout: UILayout::default(),
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: CVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    files: Vec<String>,
    file_cursor: usize,
    selected_file: Option<String>,
    table: Option<Table>,
    page: Option<Page>,
    input: Inputter,
    last_input: InputResult,
    search_text: String,
    search_before_edit: String,
    active_section: SectionKind,
    // Panel state is keyed by column name, never by position.
    focused: [Option<String>; 2],
    expanded: HashSet<String>,
    scroll: [usize; 2],
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    error_message: Option<String>,
    status_message: String,
}

impl Model {
    pub fn init(config: &CVConfig, ui_width: usize, ui_height: usize) -> Result<Self, CVError> {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::BROWSE,
            previous_modus: Modus::BROWSE,
            files: Vec::new(),
            file_cursor: 0,
            selected_file: None,
            table: None,
            page: None,
            input: Inputter::default(),
            last_input: InputResult::default(),
            search_text: config.initial_search.clone(),
            search_before_edit: String::new(),
            active_section: SectionKind::Small,
            focused: [None, None],
            expanded: HashSet::new(),
            scroll: [0, 0],
            uilayout: UILayout::from_values(ui_width, ui_height, 1),
            uidata: UIData::empty(),
            clipboard: None,
            error_message: None,
            status_message: "Started cv!".to_string(),
        };
        model.input.set(&config.initial_search);
        model.last_input = model.input.get();

        let initial = config.initial_file.clone();
        model.rescan(initial)?;
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn data_dir(&self) -> PathBuf {
        self.config.data_dir.clone()
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }

    // -------------------- Loading ---------------------- //

    /// Reads the directory listing again. Returns false if there is nothing to show.
    /// Every listing failure ends up in the error box, where `r` retries.
    fn refresh_files(&mut self) -> bool {
        match list_files(&self.data_dir()) {
            Ok(files) => {
                self.files = files;
                if self.status == Status::NOFILES {
                    self.status = Status::READY;
                }
                self.error_message = None;
                true
            }
            Err(e) => {
                warn!("{e}");
                self.status = Status::NOFILES;
                self.files.clear();
                self.selected_file = None;
                self.table = None;
                self.page = None;
                self.error_message = Some(e.to_string());
                self.modus = Modus::BROWSE;
                self.update_uidata();
                false
            }
        }
    }

    /// Lists the directory and (re)loads `preferred`, the current file or the first one.
    fn rescan(&mut self, preferred: Option<String>) -> Result<(), CVError> {
        if !self.refresh_files() {
            return Ok(());
        }
        let wanted = preferred.or_else(|| self.selected_file.clone());
        let name = match wanted {
            Some(name) if self.files.contains(&name) => name,
            Some(name) => {
                warn!("File {name} is not available, falling back to the first file");
                self.files[0].clone()
            }
            None => self.files[0].clone(),
        };
        self.load_file(&name)
    }

    fn load_file(&mut self, name: &str) -> Result<(), CVError> {
        let start_time = Instant::now();
        let table = load_table(&self.data_dir().join(name))?;
        let message = format!(
            "Loaded {name}: {} columns, {} rows in {}ms",
            table.ncolumns(),
            table.nrows(),
            start_time.elapsed().as_millis()
        );
        info!("{message}");

        // A new file starts a new set of panels.
        if self.selected_file.as_deref() != Some(name) {
            self.expanded.clear();
            self.focused = [None, None];
            self.scroll = [0, 0];
            self.active_section = SectionKind::Small;
        }
        self.selected_file = Some(name.to_string());
        self.file_cursor = self.files.iter().position(|f| f == name).unwrap_or(0);
        self.table = Some(table);
        self.refresh_page();
        self.set_status_message(message);
        Ok(())
    }

    /// Runs the explore and render stages for the current table and search text.
    fn refresh_page(&mut self) {
        let Some(table) = &self.table else {
            self.page = None;
            self.update_uidata();
            return;
        };
        let query = SearchQuery::parse(&self.search_text);
        let page = build_page(&explore(table, &query));
        debug!(
            "Page for {:?}: {} small, {} large",
            self.search_text,
            page.section(SectionKind::Small).panels.len(),
            page.section(SectionKind::Large).panels.len()
        );

        for section in page.sections.iter() {
            let idx = section.kind.index();
            let still_there = self.focused[idx]
                .as_deref()
                .is_some_and(|key| section.position(key).is_some());
            if !still_there {
                self.focused[idx] = section.panels.first().map(|p| p.key.clone());
                self.scroll[idx] = 0;
            }
        }
        self.page = Some(page);
        self.reveal_focused();
    }

    // -------------------- View preparation ---------------------- //

    fn active_section(&self) -> Option<&Section> {
        self.page.as_ref().map(|p| p.section(self.active_section))
    }

    fn focused_key(&self) -> Option<&str> {
        self.focused[self.active_section.index()].as_deref()
    }

    fn focused_panel(&self) -> Option<&Panel> {
        let key = self.focused_key()?;
        self.active_section()?.panel(key)
    }

    fn panel_lines(&self, panel: &Panel, focused: bool, lines: &mut Vec<UILine>) {
        let expanded = self.expanded.contains(&panel.key);
        let marker = if expanded { "▾" } else { "▸" };
        lines.push(UILine::new(
            format!("{marker} {}", panel.label),
            LineKind::Header { focused },
        ));
        if !expanded {
            return;
        }
        match &panel.body {
            PanelBody::Values {
                caption,
                values,
                height,
            } => {
                lines.push(UILine::new(format!("  {caption}"), LineKind::Caption));
                let widest = values.iter().map(|v| v.chars().count()).max().unwrap_or(0);
                let box_width = widest
                    .max(caption.chars().count())
                    .min(self.uilayout.width.saturating_sub(6))
                    + 1;
                lines.push(UILine::new(
                    format!("  ┌{}", "─".repeat(box_width)),
                    LineKind::Frame,
                ));
                for value in values {
                    let shown = value.replace("\r\n", " ↵ ").replace('\n', " ↵ ");
                    lines.push(UILine::new(format!("  │ {shown}"), LineKind::Value));
                }
                for _ in values.len()..*height {
                    lines.push(UILine::new("  │", LineKind::Value));
                }
                lines.push(UILine::new(
                    format!("  └{}", "─".repeat(box_width)),
                    LineKind::Frame,
                ));
            }
            PanelBody::Count { note, .. } => {
                lines.push(UILine::new(format!("  {note}"), LineKind::Note));
            }
        }
    }

    fn section_lines(&self) -> SectionLines {
        let mut lines = Vec::new();
        let mut spans = Vec::new();
        let Some(section) = self.active_section() else {
            return SectionLines { lines, spans };
        };
        if let Some(placeholder) = &section.placeholder {
            lines.push(UILine::new(format!("ℹ {placeholder}"), LineKind::Placeholder));
        }
        let focused_key = self.focused_key();
        for panel in section.panels.iter() {
            let start = lines.len();
            self.panel_lines(panel, focused_key == Some(panel.key.as_str()), &mut lines);
            spans.push(PanelSpan {
                key: panel.key.clone(),
                start,
                end: lines.len() - 1,
            });
        }
        SectionLines { lines, spans }
    }

    fn clamp_scroll(&mut self, nlines: usize) {
        let idx = self.active_section.index();
        let max_scroll = nlines.saturating_sub(self.uilayout.body_height);
        self.scroll[idx] = self.scroll[idx].min(max_scroll);
    }

    /// Scrolls so the focused panel is visible, its header first.
    fn reveal_focused(&mut self) {
        let section_lines = self.section_lines();
        let height = self.uilayout.body_height;
        let idx = self.active_section.index();
        if let Some(key) = self.focused_key()
            && let Some(span) = section_lines.spans.iter().find(|s| s.key == key)
        {
            let scroll = &mut self.scroll[idx];
            if span.end >= *scroll + height {
                *scroll = span.end + 1 - height;
            }
            if span.start < *scroll {
                *scroll = span.start;
            }
        }
        self.update_uidata();
    }

    fn update_uidata(&mut self) {
        let search_lines = self.last_input.input.split('\n').count();
        self.uilayout =
            UILayout::from_values(self.uilayout.width, self.uilayout.height, search_lines);
        let section_lines = self.section_lines();
        self.clamp_scroll(section_lines.lines.len());

        let (nrows, ncolumns) = self
            .table
            .as_ref()
            .map(|t| (t.nrows(), t.ncolumns()))
            .unwrap_or((0, 0));
        let tab_titles = match &self.page {
            Some(page) => page
                .sections
                .iter()
                .map(|s| format!("{} [{}]", s.title, s.panels.len()))
                .collect(),
            None => Vec::new(),
        };

        self.uidata = UIData {
            title: self
                .page
                .as_ref()
                .map(|p| p.title.clone())
                .unwrap_or_else(|| PAGE_TITLE.to_string()),
            directory: self.config.data_dir.display().to_string(),
            file_name: self.selected_file.clone(),
            nrows,
            ncolumns,
            search: self.last_input.clone(),
            editing_search: self.modus == Modus::SEARCH,
            tab_titles,
            active_tab: self.active_section.index(),
            lines: section_lines.lines,
            scroll: self.scroll[self.active_section.index()],
            error_message: self.error_message.clone(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            show_file_picker: self.modus == Modus::FILEPICKER,
            files: self.files.clone(),
            file_cursor: self.file_cursor,
            layout: self.uilayout.clone(),
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout.width = width;
        self.uilayout.height = height;
        self.reveal_focused();
    }

    // -------------------- Message handling ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), CVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        if self.status == Status::NOFILES {
            match msg {
                Message::Quit => self.quit(),
                Message::Rescan => self.rescan(None)?,
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Help => self.show_help(),
                Message::Exit | Message::Enter if self.modus == Modus::POPUP => self.exit(),
                _ => (),
            }
            return Ok(());
        }

        match self.modus {
            Modus::BROWSE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_focus(-1),
                Message::MoveDown => self.move_focus(1),
                Message::MovePageUp => self.scroll_page(false),
                Message::MovePageDown => self.scroll_page(true),
                Message::MoveBeginning => self.move_focus(isize::MIN),
                Message::MoveEnd => self.move_focus(isize::MAX),
                Message::NextSection | Message::PrevSection => self.switch_section(),
                Message::TogglePanel | Message::Enter => self.toggle_panel(),
                Message::CopyValues => self.copy_focused_values(),
                Message::EditSearch => self.enter_search_mode(),
                Message::Paste(text) => {
                    self.enter_search_mode();
                    self.paste(&text);
                }
                Message::OpenFilePicker => self.open_file_picker()?,
                Message::Rescan => self.rescan(None)?,
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::SEARCH => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Paste(text) => self.paste(&text),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Quit => self.quit(),
                _ => (),
            },
            Modus::FILEPICKER => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_file_cursor(-1),
                Message::MoveDown => self.move_file_cursor(1),
                Message::MoveBeginning => self.move_file_cursor(isize::MIN),
                Message::MoveEnd => self.move_file_cursor(isize::MAX),
                Message::Enter | Message::TogglePanel => self.pick_file()?,
                Message::Exit | Message::OpenFilePicker => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP | Modus::FILEPICKER => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.update_uidata();
            }
            Modus::BROWSE | Modus::SEARCH => {}
        }
    }

    fn show_help(&mut self) {
        if self.modus != Modus::POPUP {
            self.previous_modus = self.modus;
            self.modus = Modus::POPUP;
        }
        self.update_uidata();
    }

    fn move_focus(&mut self, step: isize) {
        let Some(section) = self.active_section() else {
            return;
        };
        if section.panels.is_empty() {
            return;
        }
        let last = section.panels.len() - 1;
        let current = self
            .focused_key()
            .and_then(|key| section.position(key))
            .unwrap_or(0);
        let next = current.saturating_add_signed(step).min(last);
        let key = section.panels[next].key.clone();
        self.focused[self.active_section.index()] = Some(key);
        self.reveal_focused();
    }

    /// Scrolls a page and moves the focus onto the first panel header in view.
    fn scroll_page(&mut self, down: bool) {
        let idx = self.active_section.index();
        let height = self.uilayout.body_height;
        let scroll = self.scroll[idx];
        self.scroll[idx] = if down {
            scroll + height
        } else {
            scroll.saturating_sub(height)
        };
        let section_lines = self.section_lines();
        self.clamp_scroll(section_lines.lines.len());

        let top = self.scroll[idx];
        let visible = |line: usize| line >= top && line < top + height;
        let focus_visible = self
            .focused_key()
            .and_then(|key| section_lines.spans.iter().find(|s| s.key == key))
            .is_some_and(|span| visible(span.start));
        if !focus_visible
            && let Some(span) = section_lines.spans.iter().find(|s| visible(s.start))
        {
            self.focused[idx] = Some(span.key.clone());
        }
        self.update_uidata();
    }

    fn switch_section(&mut self) {
        self.active_section = self.active_section.toggle();
        self.reveal_focused();
    }

    fn toggle_panel(&mut self) {
        let Some(key) = self.focused_key().map(str::to_string) else {
            return;
        };
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
        self.reveal_focused();
    }

    fn copy_focused_values(&mut self) {
        let Some(panel) = self.focused_panel() else {
            self.set_status_message("Nothing to copy.");
            return;
        };
        let key = panel.key.clone();
        let count = panel.count();
        let Some(text) = panel.copy_text() else {
            self.set_status_message(format!(
                "\"{key}\" has {count} unique values, too many to copy."
            ));
            return;
        };

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard not available: {e:?}");
                    self.set_status_message(format!("Clipboard not available: {e}"));
                    return;
                }
            }
        }
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text),
            None => return,
        };
        match result {
            Ok(_) => {
                trace!("Copied values of {key} to clipboard.");
                self.set_status_message(format!("Copied {count} values of \"{key}\"."));
            }
            Err(e) => {
                warn!("Error copying to clipboard: {e:?}");
                self.set_status_message(format!("Error copying to clipboard: {e}"));
            }
        }
    }

    // -------------------- Search ---------------------- //

    fn enter_search_mode(&mut self) {
        trace!("Entering search mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCH;
        self.search_before_edit = self.search_text.clone();
        self.input.set(&self.search_text);
        self.input.resume();
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.canceled {
            trace!("Search canceled, restoring {:?}", self.search_before_edit);
            let previous = self.search_before_edit.clone();
            self.input.set(&previous);
            self.last_input = self.input.get();
        }
        self.apply_search(self.last_input.input.clone());
        if self.last_input.finished {
            self.modus = Modus::BROWSE;
            self.previous_modus = Modus::SEARCH;
            self.input.resume();
            self.last_input = self.input.get();
            self.update_uidata();
        }
    }

    fn paste(&mut self, text: &str) {
        self.last_input = self.input.paste(text);
        self.apply_search(self.last_input.input.clone());
    }

    fn apply_search(&mut self, text: String) {
        if text == self.search_text {
            self.update_uidata();
            return;
        }
        self.search_text = text;
        self.refresh_page();
        let query = SearchQuery::parse(&self.search_text);
        let shown = self.page.as_ref().map_or(0, |p| {
            p.sections.iter().map(|s| s.panels.len()).sum::<usize>()
        });
        if query.is_empty() {
            self.set_status_message(format!("Showing all {shown} columns"));
        } else {
            self.set_status_message(format!(
                "{shown} columns match {} search terms",
                query.len()
            ));
        }
    }

    // -------------------- File picker ---------------------- //

    fn open_file_picker(&mut self) -> Result<(), CVError> {
        if !self.refresh_files() {
            return Ok(());
        }
        self.file_cursor = self
            .selected_file
            .as_ref()
            .and_then(|name| self.files.iter().position(|f| f == name))
            .unwrap_or(0);
        self.previous_modus = self.modus;
        self.modus = Modus::FILEPICKER;
        self.update_uidata();
        Ok(())
    }

    fn move_file_cursor(&mut self, step: isize) {
        if self.files.is_empty() {
            return;
        }
        self.file_cursor = self
            .file_cursor
            .saturating_add_signed(step)
            .min(self.files.len() - 1);
        self.update_uidata();
    }

    fn pick_file(&mut self) -> Result<(), CVError> {
        self.modus = Modus::BROWSE;
        self.previous_modus = Modus::FILEPICKER;
        match self.files.get(self.file_cursor).cloned() {
            Some(name) => self.load_file(&name),
            None => {
                self.update_uidata();
                Ok(())
            }
        }
    }
}
