// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings resolution and engine assembly.
//!
//! ```text
//!   --config ─► Settings ◄─ CONDUIT_* ◄─ CLI flags
//!                  │
//!   --inventory ───┴─► FileInventory ─► Engine (EngineOptions from Settings)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use conduit_config::{FileInventory, Settings};
use conduit_engine::{Engine, EngineOptions};
use tracing::debug;

use crate::cli::Cli;
use crate::error::{BinError, BinResult};

/// Resolves settings: file (or defaults), environment, then CLI flags.
pub fn load_settings(cli: &Cli) -> BinResult<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::from_env()?,
    };

    if let Some(level) = cli.log_level_override() {
        settings.logging.level = level.to_ascii_lowercase();
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format.into();
    }
    if let Some(path) = &cli.inventory {
        settings.inventory = Some(path.clone());
    }
    settings.validate()?;
    Ok(settings)
}

/// Engine options derived from settings.
pub fn engine_options(settings: &Settings) -> EngineOptions {
    EngineOptions {
        fetch_timeout: settings.fetch_timeout(),
        cleanup_grace: settings.cleanup_grace(),
    }
}

/// Inventory path, required by every command that touches stored platforms.
pub fn inventory_path(settings: &Settings) -> BinResult<PathBuf> {
    settings.inventory.clone().ok_or_else(|| {
        BinError::config("no inventory file; pass --inventory or set CONDUIT_INVENTORY")
    })
}

/// Loads the inventory and builds an engine over it.
pub fn build_engine(settings: &Settings) -> BinResult<Engine> {
    let path = inventory_path(settings)?;
    let store = FileInventory::load(&path)?;
    let options = engine_options(settings);
    debug!(inventory = %path.display(), ?options, "Engine ready");
    Ok(Engine::new(Arc::new(store)).with_options(options))
}
