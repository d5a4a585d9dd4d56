#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = forge_rust::run_worker().await {
        eprintln!("forge-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
