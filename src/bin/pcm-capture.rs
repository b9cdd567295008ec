use clap::Parser;

use pcm_tools::audio::{DeviceSession, StreamDirection};
use pcm_tools::cli::{self, CaptureArgs};
use pcm_tools::config::Config;

fn main() -> anyhow::Result<()> {
    let args = CaptureArgs::parse();

    // 初始化日志
    cli::init_logging(&args.verbosity);

    // 加载配置
    let config = Config::new().map_err(anyhow::Error::msg)?;

    let stats = pcm_tools::capture::run(&args, &config, |device, stream| {
        DeviceSession::open(device, StreamDirection::Capture, stream)
    })?;

    if stats.overruns > 0 || stats.capture_errors > 0 {
        log::warn!(
            "Capture finished with {} overruns and {} errors",
            stats.overruns,
            stats.capture_errors,
        );
    }
    println!("Audio captured and saved to {}", args.output.display());
    Ok(())
}
