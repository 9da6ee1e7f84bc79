#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rx_intake_server::start_server().await
}
