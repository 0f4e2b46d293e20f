#[rocket::launch]
fn rocket() -> _ {
    auth_api::rocket()
}
