use snapcloudd::SnapcloudDaemon;

const BINARY_NAME: &str = env!("CARGO_PKG_NAME");

fn main() {
    xecute::DaemonProcess::start(BINARY_NAME, "SnapCloud relay node", SnapcloudDaemon::new())
}
