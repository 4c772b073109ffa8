#[macro_use]
extern crate rocket;

use sea_life_gacha::rocket_initialize;

#[launch]
fn rocket() -> _ {
    rocket_initialize()
}
