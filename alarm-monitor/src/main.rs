fn main() {
    if let Err(err) = mqtt_monitor::app::run_alarm_monitor() {
        eprintln!("alarm monitor failed: {err}");
        std::process::exit(1);
    }
}
