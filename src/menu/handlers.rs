use super::context::AppContext;
use crate::component::media_ingestion::MediaFile;
use crate::component::prediction_orchestrator::{OrchestrationState, PredictOutcome};
use crate::component::result_presenter::export_annotations;
use crate::config::save::{add_recent_path, save_settings};
use crate::config::{Config, MediaKind, ModelVariant};
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use rust_i18n::t;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn print_error(error: impl std::fmt::Display) {
    eprintln!("{} {}", style(t!("common.error_prefix")).red().bold(), error);
}

fn persist(config: &Config) {
    if let Err(e) = save_settings(&config.settings) {
        warn!("無法儲存設定: {e}");
    }
}

pub(crate) fn state_label(state: OrchestrationState) -> String {
    match state {
        OrchestrationState::Idle => t!("state.idle"),
        OrchestrationState::AwaitingFile => t!("state.awaiting_file"),
        OrchestrationState::Sampling => t!("state.sampling"),
        OrchestrationState::Submitting => t!("state.submitting"),
        OrchestrationState::Succeeded => t!("state.succeeded"),
        OrchestrationState::Failed => t!("state.failed"),
    }
    .to_string()
}

/// 選擇媒體路徑：有歷史紀錄時先列出同類型的歷史路徑
fn prompt_media_path(config: &Config, kind: MediaKind) -> Result<Option<String>> {
    let extensions = config.media_type_table.extensions(kind).join(" ");
    println!("{}", style(t!("media.allowed", extensions = extensions)).dim());

    let recent: Vec<&String> = config
        .settings
        .recent_paths
        .iter()
        .filter(|p| config.media_type_table.is_allowed(kind, Path::new(p)))
        .collect();

    let prompt_new = || -> Result<Option<String>> {
        let path: String = Input::new()
            .with_prompt(t!("media.prompt_path"))
            .interact_text()?;
        Ok(Some(path.trim().to_string()))
    };

    if recent.is_empty() {
        return prompt_new();
    }

    let mut options: Vec<String> = recent
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let indicator = if Path::new(p).exists() { "✓" } else { "✗" };
            format!("{} [{}] {}", i + 1, indicator, p)
        })
        .collect();
    options.push(t!("media.new_path").to_string());

    println!("{}", style(t!("common.esc_hint")).dim());

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("media.prompt_recent"))
        .items(&options)
        .default(0)
        .interact_opt()?;

    match selection {
        None => Ok(None),
        Some(idx) if idx < recent.len() => Ok(Some(recent[idx].clone())),
        Some(_) => prompt_new(),
    }
}

pub fn run_select_media(
    term: &Term,
    ctx: &AppContext,
    config: &mut Config,
    kind: MediaKind,
) -> Result<()> {
    let Some(path) = prompt_media_path(config, kind)? else {
        return Ok(());
    };

    match ctx.orchestrator.select_file(&MediaFile::new(&path), kind) {
        Ok(info) => {
            println!(
                "{} {} ({}, {:.2} MB)",
                style(t!("media.selected")).green(),
                info.file_name,
                info.mime_type,
                info.size_bytes as f64 / 1024.0 / 1024.0
            );
            add_recent_path(&mut config.settings, &path);
            persist(config);
        }
        Err(e) => print_error(e),
    }

    pause(term)
}

pub fn run_select_model(term: &Term, ctx: &AppContext, config: &mut Config) -> Result<()> {
    term.clear_screen()?;
    println!("{}", style(t!("model.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let current = ctx.orchestrator.config().model_variant;
    let items: Vec<String> = ModelVariant::ALL.iter().map(ToString::to_string).collect();
    let default_index = ModelVariant::ALL
        .iter()
        .position(|&m| m == current)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("model.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    let Some(selection) = selection else {
        return Ok(());
    };

    let selected = ModelVariant::ALL[selection];
    if selected != current {
        ctx.orchestrator.select_model(selected);
        config.settings.detection = ctx.orchestrator.config();
        persist(config);
        println!("\n{} {selected}", style(t!("settings.saved")).green());
        std::thread::sleep(Duration::from_secs(1));
    }

    Ok(())
}

/// 空白或 `auto` 代表交給服務端決定
fn parse_frame_rate(input: &str) -> Option<Option<f64>> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("auto") {
        return Some(None);
    }
    input.parse::<f64>().ok().map(Some)
}

pub fn run_select_frame_rate(term: &Term, ctx: &AppContext, config: &mut Config) -> Result<()> {
    let current = ctx
        .orchestrator
        .config()
        .frame_rate
        .map_or_else(|| "auto".to_string(), |rate| rate.to_string());

    let input: String = Input::new()
        .with_prompt(t!("frame_rate.prompt"))
        .default(current)
        .interact_text()?;

    let Some(frame_rate) = parse_frame_rate(&input) else {
        print_error(t!("frame_rate.not_a_number", value = input));
        return pause(term);
    };

    match ctx.orchestrator.select_frame_rate(frame_rate) {
        Ok(()) => {
            config.settings.detection = ctx.orchestrator.config();
            persist(config);
            println!("{}", style(t!("settings.saved")).green());
        }
        Err(e) => print_error(e),
    }

    pause(term)
}

pub fn run_select_max_frames(term: &Term, ctx: &AppContext, config: &mut Config) -> Result<()> {
    let input: u32 = Input::new()
        .with_prompt(t!("max_frames.prompt"))
        .default(ctx.orchestrator.config().max_frames)
        .interact_text()?;

    match ctx.orchestrator.select_max_frames(input) {
        Ok(()) => {
            config.settings.detection = ctx.orchestrator.config();
            persist(config);
            println!("{}", style(t!("settings.saved")).green());
        }
        Err(e) => print_error(e),
    }

    pause(term)
}

pub fn run_predict(term: &Term, shutdown_signal: &Arc<AtomicBool>, ctx: &AppContext) -> Result<()> {
    shutdown_signal.store(false, Ordering::SeqCst);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));

    let orchestrator = Arc::clone(&ctx.orchestrator);
    let mut states = orchestrator.subscribe();

    let outcome = ctx.runtime.block_on(async {
        let follow = async {
            loop {
                spinner.set_message(state_label(*states.borrow_and_update()));
                if states.changed().await.is_err() {
                    break;
                }
            }
            std::future::pending::<()>().await;
        };

        tokio::select! {
            outcome = orchestrator.predict() => outcome,
            () = follow => PredictOutcome::Superseded,
        }
    });

    spinner.finish_and_clear();

    if let Some(warning) = orchestrator.sampling_warning() {
        println!(
            "{} {warning}",
            style(t!("predict.sampling_degraded")).yellow()
        );
    }

    match outcome {
        PredictOutcome::Succeeded => {
            if let Some(result) = orchestrator.result() {
                let preview = orchestrator.retained_preview_uri();
                print!("{}", ctx.presenter.render(&result, preview.as_deref()));
            }
        }
        PredictOutcome::Failed(e) => print_error(e),
        PredictOutcome::Superseded => {
            if shutdown_signal.load(Ordering::SeqCst) {
                println!("{}", style(t!("predict.interrupted")).yellow());
            } else {
                println!("{}", style(t!("predict.superseded")).yellow());
            }
        }
        PredictOutcome::AlreadyRunning => {
            println!("{}", style(t!("predict.already_running")).yellow());
        }
        PredictOutcome::NoAsset => println!("{}", style(t!("predict.no_asset")).yellow()),
        PredictOutcome::Ignored => println!("{}", style(t!("predict.already_done")).yellow()),
    }

    pause(term)
}

pub fn run_show_result(term: &Term, ctx: &AppContext) -> Result<()> {
    term.clear_screen()?;

    let Some(result) = ctx.orchestrator.result() else {
        match ctx.orchestrator.last_error() {
            Some(e) => print_error(e),
            None => println!("{}", style(t!("result.none")).yellow()),
        }
        return pause(term);
    };

    let preview = ctx.orchestrator.retained_preview_uri();
    print!("{}", ctx.presenter.render(&result, preview.as_deref()));
    println!();

    let options = vec![
        t!("result.opt_export"),
        t!("result.opt_restart"),
        t!("result.back"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("result.prompt"))
        .items(&options)
        .default(0)
        .interact_opt()?;

    match selection {
        Some(0) => {
            let dir: String = Input::new()
                .with_prompt(t!("result.prompt_export_dir"))
                .interact_text()?;
            match export_annotations(&result, &PathBuf::from(dir.trim())) {
                Ok(summary) => println!(
                    "{}",
                    style(t!(
                        "result.exported",
                        annotations = summary.annotations,
                        samples = summary.samples
                    ))
                    .green()
                ),
                Err(e) => print_error(format!("{e:#}")),
            }
            pause(term)
        }
        Some(1) => {
            ctx.presenter.restart(ctx.orchestrator.as_ref());
            println!("{}", style(t!("result.restarted")).green());
            pause(term)
        }
        _ => Ok(()),
    }
}

pub fn run_reset(term: &Term, ctx: &AppContext) -> Result<()> {
    ctx.orchestrator.reset();
    println!("{}", style(t!("result.restarted")).green());
    pause(term)
}

pub fn run_check_service(term: &Term, ctx: &AppContext) -> Result<()> {
    println!(
        "{} {}",
        style(t!("service.checking")).dim(),
        ctx.client.base_url()
    );

    let (health, models) = ctx
        .runtime
        .block_on(async { tokio::join!(ctx.client.health(), ctx.client.models()) });

    match health {
        Ok(health) => {
            println!(
                "{} {}",
                style(t!("service.status")).green(),
                health.status
            );
            if !health.loaded_models.is_empty() {
                println!(
                    "{} {}",
                    style(t!("service.loaded_models")).dim(),
                    health.loaded_models.join(", ")
                );
            }
        }
        Err(e) => print_error(e),
    }

    match models {
        Ok(catalog) => {
            println!("{}", style(t!("service.available_models")).cyan());
            for model in &catalog.available_models {
                let marker = if catalog.default_model.as_deref() == Some(model.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("  {marker} {} - {}", model.name, model.description);
            }
        }
        Err(e) => print_error(e),
    }

    pause(term)
}
