fn main() {
    if let Err(err) = mqtt_monitor::app::run_temperature_monitor() {
        eprintln!("temperature monitor failed: {err}");
        std::process::exit(1);
    }
}
