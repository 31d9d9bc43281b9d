// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use conduit_core::types::PlatformType;

use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version() -> BinResult<()> {
    println!("conduit - validated platform connectors");
    println!();
    println!("Version Information:");
    println!("  conduit-bin:  {}", env!("CARGO_PKG_VERSION"));
    println!("  conduit-core: {}", conduit_core::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("Platform Types:");
    for platform_type in PlatformType::ALL {
        println!("  {:<12} -> {}", platform_type.as_str(), platform_type.resource_type());
    }
    println!();
    println!("Features:");
    println!(
        "  OPC UA transport: {}",
        if cfg!(feature = "real-transport") { "opcua client" } else { "simulated" }
    );
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
