mod cli;

#[tokio::main]
async fn main() {
    if let Err(err) = cli::app::run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
