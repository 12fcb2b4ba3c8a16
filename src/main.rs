#[tokio::main]
async fn main() {
    if let Err(e) = academy_scheduler::run().await {
        eprintln!("academy-scheduler failed to start: {}", e);
        std::process::exit(1);
    }
}
