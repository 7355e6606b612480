#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::fairing::AdHoc;
use rocket::figment::{Error as FigmentError, Figment};
use rocket::{Build, Rocket};
use rocket_db_pools::Database;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub mod admin;
pub mod config;
pub mod cors;
pub mod error;
pub mod guard;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;
pub mod submission;

use config::{AppConfig, DEFAULT_ADMIN_KEY};
use store::{Db, MemoryStore, Store, StoreKind};

/// Installs the `tracing` subscriber, `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn rocket() -> Rocket<Build> {
    build(config::figment())
}

/// Assembles the service from `figment`. The record store named by the
/// `store` setting is chosen here and set up during ignition, before any
/// request is served. Invalid settings make ignition fail.
pub fn build(figment: Figment) -> Rocket<Build> {
    let config = match figment.extract::<AppConfig>() {
        Ok(config) => config,
        Err(e) => return misconfigured(figment, e),
    };

    match config.store {
        StoreKind::Mysql => {
            info!("using mysql record store");
            service(figment, config)
                .attach(Db::init())
                .attach(AdHoc::try_on_ignite("Record store", store::mysql::init))
        }
        StoreKind::Memory => {
            info!("using in-memory record store");
            let store: Store = Arc::new(MemoryStore::new());
            service(figment, config).manage(store)
        }
    }
}

/// Like [`build`], but serves from the given `store` and ignores the
/// `store` setting.
pub fn build_with(figment: Figment, store: Store) -> Rocket<Build> {
    match figment.extract::<AppConfig>() {
        Ok(config) => service(figment, config).manage(store),
        Err(e) => misconfigured(figment, e),
    }
}

fn misconfigured(figment: Figment, e: FigmentError) -> Rocket<Build> {
    error!(error = %e, "invalid configuration");
    rocket::custom(figment).attach(AdHoc::try_on_ignite("Configuration", |rocket| async move {
        Err(rocket)
    }))
}

fn service(figment: Figment, config: AppConfig) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(config)
        .attach(AdHoc::on_liftoff("Admin key check", |rocket| {
            Box::pin(async move {
                if let Some(config) = rocket.state::<AppConfig>() {
                    if config.admin_key == DEFAULT_ADMIN_KEY {
                        warn!("ADMIN_KEY is not set, admin endpoints use the default key");
                    }
                }
            })
        }))
        .attach(cors::Cors)
        .mount(
            "/api",
            routes![
                routes::submit_json,
                routes::submit_form,
                routes::list_rsvps,
                routes::stats,
                routes::export_csv,
                cors::preflight,
            ],
        )
        .register(
            "/",
            catchers![
                error::bad_request,
                error::unauthorized,
                error::not_found,
                error::unprocessable,
                error::server_error,
                error::fallback,
            ],
        )
}
