#[tokio::main]
async fn main() -> anyhow::Result<()> {
    review_cli::run().await
}
