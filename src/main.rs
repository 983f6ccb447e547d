fn main() {
    env_logger::init();
    if let Err(err) = phong_spin::run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
