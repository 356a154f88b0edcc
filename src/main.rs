#[tokio::main]
async fn main() {
    let code = reposcan::app::startup::startup().await;
    std::process::exit(code);
}
