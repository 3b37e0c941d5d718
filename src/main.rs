mod app;
mod artwork;
mod audio;
mod config;
mod library;
mod logging;
mod mpris;
mod runtime;
mod service;
mod ui;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run().await
}
