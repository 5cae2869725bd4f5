#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = classgrade::run().await {
        eprintln!("classgrade fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
