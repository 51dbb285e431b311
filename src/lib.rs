// SPDX-License-Identifier: EUPL-1.2
// Copyright (c) 2026 Benjamin Küttner <benjamin.kuettner@icloud.com>
// Patent Pending — DE Gebrauchsmuster, filed 2026-02-23

//! Claims Gateway — callable endpoints that assign `admin`, `author` and
//! guest role flags on accounts held by an external identity provider.

pub mod config;
pub mod gateway;
pub mod identity;
pub mod observability;

pub use config::Config;
