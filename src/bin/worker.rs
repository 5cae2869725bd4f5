#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = classgrade::run_worker().await {
        eprintln!("classgrade-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
