// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Maintenance command line for asset pipeline databases.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
