use std::env;
use std::path::PathBuf;
use std::time::Duration;

use seeder_identity::{ManifestSettings, OverridePolicy, RetrySettings, SeedSettings};

/// Environment-variable configuration for the seeder binary, read once
/// at start-up.
#[derive(Clone)]
pub struct Config {
    pub settings: SeedSettings,
    pub keypair_db_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = SeedSettings::default();
        let manifest_defaults = ManifestSettings::default();

        let settings = SeedSettings {
            super_identity_id: var_or("SEEDER_SUPER_ID", &defaults.super_identity_id),
            super_identity_did: var_opt("SEEDER_SUPER_DID"),
            identity_ids: var_or("SEEDER_IDENTITY_IDS", ""),
            manifest: ManifestSettings {
                key_algorithm: var_or("SEEDER_KEY_ALGORITHM", &manifest_defaults.key_algorithm),
                key_curve: var_or("SEEDER_KEY_CURVE", &manifest_defaults.key_curve),
                credential_service_url: var_opt("SEEDER_CREDENTIAL_SERVICE_URL"),
                protocol_endpoint_url: var_opt("SEEDER_PROTOCOL_CALLBACK_URL"),
                credentials_api_path: var_or(
                    "SEEDER_CREDENTIALS_API_PATH",
                    &manifest_defaults.credentials_api_path,
                ),
                protocol_api_path: var_or(
                    "SEEDER_PROTOCOL_API_PATH",
                    &manifest_defaults.protocol_api_path,
                ),
            },
            retry: RetrySettings {
                max_retries: var_opt("SEEDER_MAX_RETRIES")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.retry.max_retries),
                retry_delay: var_opt("SEEDER_RETRY_DELAY_MS")
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.retry_delay),
            },
            override_private_key: var_opt("SEEDER_OVERRIDE_PRIVATE_KEY"),
            override_policy: match var_opt("SEEDER_OVERRIDE_POLICY") {
                Some(raw) => raw.parse::<OverridePolicy>()?,
                None => defaults.override_policy,
            },
            data_source: var_or("SEEDER_DATA_SOURCE", &defaults.data_source),
        };

        Ok(Config {
            settings,
            keypair_db_path: PathBuf::from(var_or("SEEDER_KEYPAIR_DB", "keypairs.db")),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn var_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
