//! surface-portal - inspect the configuration and simulate the view portal
//! against a headless window.

fn main() {
    if let Err(err) = surface_portal::cli::run() {
        eprintln!("surface-portal: {err}");
        std::process::exit(1);
    }
}
