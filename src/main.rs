#[tokio::main]
async fn main() -> anyhow::Result<()> {
    livroguia_lib::run().await
}
