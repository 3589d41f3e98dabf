use actix_web::{web, HttpResponse, Responder};

/// Version from Cargo.toml, available at compile time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(keep_alive)));
    cfg.service(web::resource("/api/health").route(web::get().to(health_check)));
}

/// Uptime probes only care about the 200
async fn keep_alive() -> impl Responder {
    HttpResponse::Ok().body("Bot is running")
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": VERSION
    }))
}
