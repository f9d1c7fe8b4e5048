fn main() {
    if let Err(err) = mqtt_monitor::app::run_log_monitor() {
        eprintln!("log monitor failed: {err}");
        std::process::exit(1);
    }
}
