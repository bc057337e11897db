// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::calendar::{check_label_format, CalendarSettings, GridPolicy};

use std::collections::HashMap;
use std::env;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_DB_URL: &str = "sqlite://database/sqlite.db";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Server configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub calendar: CalendarSettings,
    pub conceal_foreign_tasks: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DB_URL.to_string(),
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            calendar: CalendarSettings::default(),
            conceal_foreign_tasks: true,
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// - `DATABASE_URL` (default `sqlite://database/sqlite.db`)
    /// - `APP_HOST` (default `0.0.0.0`), `APP_PORT` (default `3000`)
    /// - `CALENDAR_GRID_POLICY`: `variable` or `fixed` (default `variable`)
    /// - `CALENDAR_MONTH_LABEL`: chrono format (default `%B %Y`)
    /// - `CONCEAL_FOREIGN_TASKS`: `true`/`false` (default `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&env::vars().collect())
    }

    /// Builds the configuration from an explicit variable map.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let host = match get("APP_HOST") {
            Some(raw) => raw.parse::<IpAddr>().map_err(|e| invalid("APP_HOST", e))?,
            None => defaults.host,
        };
        let port = match get("APP_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| invalid("APP_PORT", e))?,
            None => defaults.port,
        };
        let grid_policy = match get("CALENDAR_GRID_POLICY") {
            Some(raw) => raw
                .parse::<GridPolicy>()
                .map_err(|e| invalid("CALENDAR_GRID_POLICY", e))?,
            None => defaults.calendar.grid_policy,
        };
        let month_label_format = match get("CALENDAR_MONTH_LABEL") {
            Some(raw) => {
                check_label_format(raw).map_err(|e| invalid("CALENDAR_MONTH_LABEL", e))?;
                raw.to_string()
            }
            None => defaults.calendar.month_label_format,
        };
        let conceal_foreign_tasks = match get("CONCEAL_FOREIGN_TASKS") {
            Some(raw) => parse_bool(raw).ok_or_else(|| {
                invalid("CONCEAL_FOREIGN_TASKS", format!("'{}' is not a boolean", raw))
            })?,
            None => defaults.conceal_foreign_tasks,
        };

        Ok(Self {
            database_url: get("DATABASE_URL")
                .map(str::to_string)
                .unwrap_or(defaults.database_url),
            host,
            port,
            calendar: CalendarSettings {
                grid_policy,
                month_label_format,
            },
            conceal_foreign_tasks,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn invalid(key: &str, message: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
