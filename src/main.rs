use std::sync::Arc;

use anyhow::Result;
use skycast_core::{AppError, Config};
use skycast_weather::{
    RefreshOutcome, SqliteSnapshotStore, ViewModelOptions, WeatherServices, WeatherViewModel,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    skycast_core::init()?;

    if let Err(e) = run().await {
        tracing::error!("Skycast failed: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}

async fn run() -> Result<(), AppError> {
    let (config, _) = Config::load_validated()?;
    tracing::info!("Config directory: {}", config.config_dir.display());

    let store = Arc::new(SqliteSnapshotStore::new(config.cache_path())?);
    let services = WeatherServices::from_config(&config)?;
    let view_model =
        WeatherViewModel::new(store, services, ViewModelOptions::from_config(&config.display));

    let mut changes = view_model.subscribe();
    view_model.start_clock();

    let outcome = view_model.activate().await;

    println!("Skycast - weather refresh");
    while let Ok(change) = changes.try_recv() {
        println!("  {:<20} {}", change.property.name(), change.value);
    }

    let state = view_model.current();
    let symbol = state.temp_symbol();
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("\n{}", describe(outcome));
    println!("  City:        {}", text(&state.city_name));
    println!(
        "  Conditions:  {} ({})",
        text(&state.weather_description),
        text(&state.weather_icon)
    );
    println!("  Now:         {}{}", text(&state.current_temp), symbol);
    println!(
        "  High / Low:  {}{} / {}{}",
        text(&state.high_temp),
        symbol,
        text(&state.low_temp),
        symbol
    );
    println!("  Image:       {}", text(&state.weather_image));
    if let Some(background) = view_model.background_image() {
        println!("  Background:  {}", background);
    }

    // Graceful shutdown
    view_model.dispose();

    Ok(())
}

fn describe(outcome: RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::Refreshed => "Weather updated",
        RefreshOutcome::NoLocation => "No location available, showing cached weather",
        RefreshOutcome::FeatureUnsupported | RefreshOutcome::PermissionDenied => {
            "Location unavailable"
        }
        RefreshOutcome::Failed => "Refresh failed, showing cached weather",
        RefreshOutcome::AlreadyRunning => "A refresh is already running",
        RefreshOutcome::Disposed => "Stopped",
    }
}
