//! diffdeck - scripted comparison session
//!
//! Opens the paths given on the command line in a window backed by
//! in-memory demo documents, lets background work run, then closes the
//! window and prints every window notification along the way.
//!
//! ```bash
//! diffdeck ~/src/project
//! diffdeck left.txt right.txt
//! diffdeck --auto-merge --output merged.txt mine.txt base.txt theirs.txt
//! DIFFDECK_LOG=diffdeck=debug diffdeck dir_a dir_b
//! ```

use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use diffdeck::app::{AppEvent, AppWindow, IdleDriver, LoopExit, MainLoop, WindowEvent};
use diffdeck::cli::Cli;
use diffdeck::clock::SystemClock;
use diffdeck::config::Settings;
use diffdeck::demo::DemoFactory;
use diffdeck::logging::init_logging;
use diffdeck::request::FsProbe;
use diffdeck::tab_manager::TabEvent;

fn describe(event: WindowEvent) -> String {
    match event {
        WindowEvent::Tab(TabEvent::Added(id)) => format!("tab added      {id}"),
        WindowEvent::Tab(TabEvent::Removed(id)) => format!("tab removed    {id}"),
        WindowEvent::Tab(TabEvent::FocusChanged(Some(id))) => format!("focus          {id}"),
        WindowEvent::Tab(TabEvent::FocusChanged(None)) => "focus          (none)".to_string(),
        WindowEvent::Closed => "window closed".to_string(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut settings = Settings::load();
    let _log_buffer = init_logging(&cli.logging(&settings.logging));

    let request = match cli.into_request() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("diffdeck: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = request.resolve(&FsProbe) {
        eprintln!("diffdeck: {e}");
        return ExitCode::from(2);
    }

    let factory = DemoFactory::new();
    let idle = IdleDriver::new(Rc::new(SystemClock)).with_progress_interval(settings.progress_interval());
    let mut window = AppWindow::new(Box::new(factory))
        .with_probe(Box::new(FsProbe))
        .with_tab_config(settings.tabs.clone())
        .with_geometry(settings.window)
        .with_idle_driver(idle);

    tracing::info!(paths = ?request.paths, "Starting diffdeck session");

    let mut main_loop = MainLoop::new();
    main_loop.push(AppEvent::Open(request));
    main_loop.push(AppEvent::NewComparison);
    let exit = main_loop.run(&mut window, |event| println!("{}", describe(event)));
    if exit != LoopExit::Idle {
        eprintln!("session ended early: {exit:?}");
        return ExitCode::FAILURE;
    }

    let stats = window.scheduler_stats();
    println!(
        "background work: {} steps, {} tasks completed, {} failed",
        stats.steps, stats.completed, stats.failed
    );

    // a pending save keeps the window open until the loop drains it
    main_loop.push(AppEvent::CloseWindow);
    let exit = main_loop.run(&mut window, |event| println!("{}", describe(event)));

    settings.window = window.geometry();
    if let Err(e) = settings.save() {
        tracing::warn!(error = %e, "Failed to save settings");
    }

    if exit == LoopExit::Closed {
        ExitCode::SUCCESS
    } else {
        eprintln!("window did not close: {exit:?}");
        ExitCode::FAILURE
    }
}
