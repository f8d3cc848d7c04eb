mod animation;
mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;

fn main() {
    if let Err(err) = app::run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
