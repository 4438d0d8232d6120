use shuttlewatch::backends::virtual_input::{VirtualProvider, VirtualShuttle};
use shuttlewatch::{EventFilter, ShuttleEvent, WatchConfig, Watcher};
use std::time::Duration;

fn main() {
    let dev = VirtualShuttle::shuttle_xpress();
    let config = WatchConfig::default()
        .with_scan_interval(Duration::from_millis(50))
        .with_read_timeout(Duration::from_millis(10));
    let watcher =
        Watcher::new(config, VirtualProvider::new().with_device(dev.clone())).expect("watcher");
    let (_, rx) = watcher.subscribe_channel(EventFilter::All);
    watcher.scan_for_device().expect("start");

    dev.plug();
    if let Ok(ShuttleEvent::Attached(meta)) = rx.recv_timeout(Duration::from_secs(1)) {
        println!("attached: {meta}");
    }

    // Turn the inner wheel across the wrap point, tap two buttons, spin the jog ring left.
    for report in [
        [0u8, 254, 0, 0, 0],
        [0, 2, 0, 0, 0],
        [0, 2, 0, 0x10, 0],
        [0, 2, 0, 0, 1],
        [0xfa, 2, 0, 0, 0],
    ] {
        dev.feed(&report);
    }
    dev.unplug();

    while let Ok(event) = rx.recv_timeout(Duration::from_millis(500)) {
        println!("{event:?}");
        if matches!(event, ShuttleEvent::Removed(_)) {
            break;
        }
    }
    watcher.dispose();
}
