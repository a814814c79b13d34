use std::ffi::OsString;

#[tokio::main]
async fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    if let Err(err) = slate_core::run(args).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
