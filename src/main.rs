#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = aems_rust::run().await {
        eprintln!("aems-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
