use super::context::AppContext;
use super::handlers::{
    run_check_service, run_predict, run_reset, run_select_frame_rate, run_select_max_frames,
    run_select_media, run_select_model, run_show_result, state_label,
};
use crate::config::save::save_settings;
use crate::config::{Config, Language, MediaKind};
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

fn print_status(ctx: &AppContext) {
    let orchestrator = &ctx.orchestrator;
    let detection = orchestrator.config();
    let asset = orchestrator
        .asset()
        .map_or_else(|| "-".to_string(), |info| format!("{} ({})", info.file_name, info.kind));
    let frame_rate = detection
        .frame_rate
        .map_or_else(|| "auto".to_string(), |rate| format!("{rate} fps"));

    println!(
        "{} {}  {} {}",
        style(t!("status.state")).dim(),
        style(state_label(orchestrator.state())).bold(),
        style(t!("status.media")).dim(),
        asset
    );
    println!(
        "{} {}  {} {}  {} {}\n",
        style(t!("status.model")).dim(),
        detection.model_variant,
        style(t!("status.frame_rate")).dim(),
        frame_rate,
        style(t!("status.max_frames")).dim(),
        detection.max_frames
    );
}

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    ctx: &AppContext,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());
    print_status(ctx);

    let options = vec![
        t!("main_menu.opt_video"),
        t!("main_menu.opt_image"),
        t!("main_menu.opt_model"),
        t!("main_menu.opt_frame_rate"),
        t!("main_menu.opt_max_frames"),
        t!("main_menu.opt_predict"),
        t!("main_menu.opt_result"),
        t!("main_menu.opt_reset"),
        t!("main_menu.opt_service"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => run_select_media(term, ctx, config, MediaKind::Video)?,
        Some(1) => run_select_media(term, ctx, config, MediaKind::Image)?,
        Some(2) => run_select_model(term, ctx, config)?,
        Some(3) => run_select_frame_rate(term, ctx, config)?,
        Some(4) => run_select_max_frames(term, ctx, config)?,
        Some(5) => run_predict(term, shutdown_signal, ctx)?,
        Some(6) => run_show_result(term, ctx)?,
        Some(7) => run_reset(term, ctx)?,
        Some(8) => run_check_service(term, ctx)?,
        Some(9) => show_settings_menu(term, ctx, config)?,
        Some(10) | None => return Ok(false), // ESC pressed - exit
        _ => unreachable!(),
    }

    Ok(true)
}

/// 設定選單
fn show_settings_menu(term: &Term, ctx: &AppContext, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_language"),
            t!("settings.opt_sampling"),
            t!("settings.opt_retain_preview"),
            t!("settings.opt_service"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_language_menu(term, config)?,
            Some(1) => show_sampling_menu(ctx, config)?,
            Some(2) => show_retain_preview_menu(ctx, config)?,
            Some(3) => show_service_menu(config)?,
            Some(4) | None => break, // ESC or back
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 客戶端取樣張數
fn show_sampling_menu(ctx: &AppContext, config: &mut Config) -> Result<()> {
    let count: usize = Input::new()
        .with_prompt(t!("settings.sampling.prompt"))
        .default(config.settings.sampling.frame_count)
        .interact_text()?;

    if count != config.settings.sampling.frame_count {
        if let Err(e) = ctx.orchestrator.set_sample_count(count) {
            eprintln!("{} {e}", style(t!("common.error_prefix")).red().bold());
            std::thread::sleep(std::time::Duration::from_secs(2));
            return Ok(());
        }
        config.settings.sampling.frame_count = count;
        save_settings(&config.settings)?;
        println!("\n{} {count}", style(t!("settings.saved")).green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

fn show_retain_preview_menu(ctx: &AppContext, config: &mut Config) -> Result<()> {
    let retain = Confirm::new()
        .with_prompt(t!("settings.retain_preview.prompt"))
        .default(config.settings.retain_preview)
        .interact()?;

    if retain != config.settings.retain_preview {
        config.settings.retain_preview = retain;
        ctx.orchestrator.set_retain_preview(retain);
        save_settings(&config.settings)?;
        println!("\n{} {retain}", style(t!("settings.saved")).green());
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

/// 服務位址與逾時；重新啟動後生效
fn show_service_menu(config: &mut Config) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt(t!("settings.service.prompt_url"))
        .default(config.settings.service.base_url.clone())
        .interact_text()?;
    let timeout_secs: u64 = Input::new()
        .with_prompt(t!("settings.service.prompt_timeout"))
        .default(config.settings.service.timeout_secs)
        .interact_text()?;

    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if base_url != config.settings.service.base_url
        || timeout_secs != config.settings.service.timeout_secs
    {
        config.settings.service.base_url = base_url;
        config.settings.service.timeout_secs = timeout_secs;
        save_settings(&config.settings)?;
        println!("\n{}", style(t!("settings.service.restart_required")).yellow());
        std::thread::sleep(std::time::Duration::from_secs(2));
    }

    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::EnUs, Language::ZhTw];

    let items: Vec<String> = languages.iter().map(|l: &Language| l.to_string()).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];

    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!(
            "\n{} {}",
            style(t!("settings.saved")).green(),
            selected_lang
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}
