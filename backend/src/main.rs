#[tokio::main]
async fn main() -> anyhow::Result<()> {
    publisher::start_server().await
}
