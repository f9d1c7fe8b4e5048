fn main() {
    if let Err(err) = mqtt_monitor::app::run() {
        eprintln!("mqtt-monitor failed: {err}");
        std::process::exit(1);
    }
}
