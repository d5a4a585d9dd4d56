#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = forge_rust::run().await {
        eprintln!("forge-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
