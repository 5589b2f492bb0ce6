use std::io;

use actix_web::{web, App, HttpServer};
use log::{info, warn};

use campus_ledger::api::{self, AppState};
use campus_ledger::registry::default_roster;
use campus_ledger::{Config, JsonStore, VoteService};

fn open_election(config: &Config) -> io::Result<(VoteService, JsonStore)> {
    let store = JsonStore::open(&config.data_dir).map_err(io::Error::other)?;

    let service = match store.restore(config.hash.hasher()).map_err(io::Error::other)? {
        Some(service) => service,
        None => {
            info!("no stored election in {}, starting a new chain", config.data_dir.display());
            let service = VoteService::new(config.hash.hasher());
            if config.seed_candidates {
                for metadata in default_roster() {
                    service.add_candidate(metadata).map_err(io::Error::other)?;
                }
            }
            store.save(&service.snapshot()).map_err(io::Error::other)?;
            service
        }
    };

    Ok((service, store))
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(io::Error::other)?;
    let (service, store) = open_election(&config)?;

    // Refuse to serve a chain that does not verify.
    let report = service.audit().map_err(io::Error::other)?;
    info!(
        "ledger verified ({} hash, valid: {}), {} blocks",
        config.hash,
        report.valid,
        service.all_blocks().len()
    );
    if service.candidates().is_empty() {
        warn!("no candidates registered; votes will be refused until one is added");
    }

    let state = web::Data::new(AppState::new(service, Some(store)));

    info!("listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind(config.bind_addr())?
    .run()
    .await
}
