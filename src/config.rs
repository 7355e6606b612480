use rocket::figment::providers::Env;
use rocket::figment::Figment;
use serde::Deserialize;

use crate::store::StoreKind;

pub const DEFAULT_ADMIN_KEY: &str = "changeme";

/// Service settings read from the Rocket figment.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_admin_key")]
    pub admin_key: String,
    /// Allowed CORS origin, `*` reflects whatever origin asked.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub store: StoreKind,
}

fn default_admin_key() -> String {
    DEFAULT_ADMIN_KEY.to_string()
}

fn default_origin() -> String {
    "*".to_string()
}

/// Rocket's usual sources (`Rocket.toml`, `ROCKET_*`), then the plain
/// `PORT`, `ADMIN_KEY`, `ORIGIN` and `STORE` variables on top.
pub fn figment() -> Figment {
    rocket::Config::figment().merge(
        Env::raw()
            .only(&["port", "admin_key", "origin", "store"])
            .global(),
    )
}
