use std::net::SocketAddr;

// This main function is the entry point when running `cargo run -p web-server`.
// It sets up logging and hands over to the crate's library.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = configuration::load_config()?;
    let _guard = configuration::init_tracing(&config.logging)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    web_server::run_server(addr).await
}
