use std::io::stdout;
use std::process::ExitCode;

use clap::Parser;
use ratatui::crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
};
use ratatui::DefaultTerminal;
use tracing::{error, info, warn};

mod cli;
mod controller;
mod domain;
mod explorer;
mod inputter;
mod loader;
mod logging;
mod model;
mod render;
mod table;
mod ui;

use cli::Args;
use controller::Controller;
use domain::{CVConfig, CVError};
use model::{Model, Status};
use ui::ExplorerUI;

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log_file.as_deref()) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), CVError> {
    let cfg = args.to_config()?;
    info!("Starting cv in {}", cfg.data_dir.display());

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, &cfg);
    if let Err(e) = execute!(stdout(), DisableBracketedPaste) {
        warn!("Could not disable bracketed paste: {e}");
    }
    ratatui::restore();
    result
}

fn run_app(terminal: &mut DefaultTerminal, cfg: &CVConfig) -> Result<(), CVError> {
    execute!(stdout(), EnableBracketedPaste)?;
    let size = terminal.size()?;

    let mut model = Model::init(cfg, size.width as usize, size.height as usize)?;
    let mut ui = ExplorerUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        };
    }

    Ok(())
}
