use anyhow::Result;
use console::{Term, style};
use deepfake_probe::config::Config;
use deepfake_probe::init;
use deepfake_probe::menu::{AppContext, show_main_menu};
use deepfake_probe::signal::setup_shutdown_signal;
use log::{info, warn};
use rust_i18n::t;
use std::sync::Arc;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();

    // Load config and set locale
    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());

    let context = AppContext::new(&config)?;

    // Ctrl-C 只中止進行中的預測，選單本身照常運作
    let orchestrator = Arc::clone(&context.orchestrator);
    let shutdown_signal = setup_shutdown_signal(move || {
        if orchestrator.abandon() {
            info!("已中止進行中的預測");
        }
    });

    loop {
        match show_main_menu(&term, &shutdown_signal, &context, &mut config) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style(t!("main_menu.goodbye")).green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style(t!("main_menu.error_prefix")).red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
