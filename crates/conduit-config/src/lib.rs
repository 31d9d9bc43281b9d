// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # conduit-config
//!
//! Runtime settings and the file-backed platform inventory.
//!
//! - [`Settings`]: deadlines and logging, from YAML, TOML or JSON with
//!   `${VAR:default}` placeholders and `CONDUIT_*` overrides
//! - [`Inventory`] / [`FileInventory`]: platforms, resources and device links,
//!   cross-checked on load and served through [`conduit_core::PlatformStore`]

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod format;
pub mod inventory;
pub mod settings;

pub use error::{LoadError, LoadResult};
pub use format::{resolve_placeholders, ConfigFormat};
pub use inventory::{FileInventory, Inventory};
pub use settings::{LogFormat, LoggingSettings, Settings, ENV_PREFIX};
