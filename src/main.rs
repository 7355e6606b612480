#[macro_use]
extern crate rocket;

#[launch]
fn rocket() -> _ {
    dotenvy::dotenv().ok();
    rsvp_service::init_tracing();
    rsvp_service::rocket()
}
