use shuttlewatch::backends::hid::HidApiProvider;
use shuttlewatch::{DeviceIdentity, DeviceProvider};

fn main() {
    let json = std::env::args().any(|a| a == "--json");
    let mut provider = HidApiProvider::new().expect("init hidapi");
    let devices = provider.enumerate().expect("enumerate");

    for meta in &devices {
        if json {
            println!("{}", serde_json::to_string(meta).expect("serialize"));
            continue;
        }
        let marker = if DeviceIdentity::SHUTTLE_XPRESS.matches(meta) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} VID:PID={:04x}:{:04x} up=0x{:02x} u=0x{:02x} iface={:?} prod={:?} ser={:?} path={}",
            meta.vid.unwrap_or_default(),
            meta.pid.unwrap_or_default(),
            meta.usage_page.unwrap_or_default(),
            meta.usage.unwrap_or_default(),
            meta.interface_number,
            meta.product_string,
            meta.serial_number,
            meta.path.as_deref().unwrap_or("")
        );
    }
}
