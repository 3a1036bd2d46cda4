use netgate_telemetry::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::main().await
}
