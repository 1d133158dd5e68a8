use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    docmentor_cli::main_entry().await
}
