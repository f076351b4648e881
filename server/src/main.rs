use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use server::handlers;
use server::relay::spawn_relay;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let relay_tx = spawn_relay();

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(8080);
    log::info!("listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .app_data(web::Data::new(relay_tx.clone()))
            .configure(handlers::root)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
