use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::{Request, Response};

use crate::config::AppConfig;

/// Adds CORS headers for the configured origin. `*` echoes the caller's
/// `Origin` back.
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(config) = req.rocket().state::<AppConfig>() else {
            return;
        };

        let allowed = match config.origin.as_str() {
            "*" => req.headers().get_one("Origin").map(str::to_string),
            origin => Some(origin.to_string()),
        };
        if let Some(origin) = allowed {
            res.set_header(Header::new("Access-Control-Allow-Origin", origin));
            res.set_header(Header::new("Vary", "Origin"));
        }
        res.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        res.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, X-Admin-Key",
        ));
    }
}

/// Preflight for anything under `/api`.
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}
