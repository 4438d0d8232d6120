use shuttlewatch::{EventFilter, TracingLogger, WatchConfig, Watcher};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    // Optional config file as first argument.
    let config = match std::env::args().nth(1) {
        Some(path) => WatchConfig::load(&path).expect("load config"),
        None => WatchConfig::default().with_scan_interval(Duration::from_secs(1)),
    };

    let provider = shuttlewatch::backends::hid::HidApiProvider::new().expect("init hidapi");
    let watcher = Watcher::new(config, provider).expect("build watcher");
    watcher.add_listener(TracingLogger::new(), EventFilter::All);
    watcher.scan_for_device().expect("start watcher");

    println!("Watching for {} (Ctrl+C to quit)", watcher.identity());
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
