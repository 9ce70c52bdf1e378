#[tokio::main]
async fn main() {
    if let Err(e) = obstetrix_lib::run().await {
        eprintln!("obstetrix: {e}");
        std::process::exit(1);
    }
}
