// Logger setup shared by the binaries
use env_logger::Env;
use std::io::Write;

/// Installs `env_logger` at `info` unless `RUST_LOG` says otherwise, tagging
/// each line with `service_name`.
pub fn init(service_name: &str) {
    let service_name = service_name.to_string();
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}: {}",
                buf.timestamp_millis(),
                record.level(),
                service_name,
                record.target(),
                record.args()
            )
        })
        .init();
}
