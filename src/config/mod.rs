// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

pub mod schema;

pub use schema::{
    BootstrapConfig, Config, ConfigSource, DirectoryConfig, DirectoryUserConfig, GatewayConfig,
    ObservabilityConfig, ENV_ACCESS_TOKEN, ENV_BOOTSTRAP_EMAIL,
};
