use std::env;

#[tokio::main]
async fn main() {
    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = nestegg::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Some("quick") => {
            let mut args = vec!["nestegg quick".to_string()];
            args.extend_from_slice(&raw_args[2..]);
            std::process::exit(nestegg::api::run_quick_command(&args));
        }
        Some(_) => std::process::exit(nestegg::api::run_plan_command(&raw_args)),
        None => {
            eprintln!("Usage: nestegg serve [port] | nestegg quick --birth-date <YYYY-MM-DD> --monthly <amount> | nestegg --birth-date <YYYY-MM-DD> ...");
            std::process::exit(2);
        }
    }
}
