//! Binary entrypoint for the transformat worker.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    transformat_worker::bootstrap::run_app().await
}
