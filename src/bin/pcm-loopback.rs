use clap::Parser;

use pcm_tools::audio::{DeviceSession, StreamDirection};
use pcm_tools::cli::{self, LoopbackArgs};
use pcm_tools::config::Config;

fn main() -> anyhow::Result<()> {
    let args = LoopbackArgs::parse();

    // 初始化日志
    cli::init_logging(&args.verbosity);

    // 加载配置
    let config = Config::new().map_err(anyhow::Error::msg)?;

    let stats = pcm_tools::loopback::run(
        &args,
        &config,
        |device, stream| DeviceSession::open(device, StreamDirection::Capture, stream),
        |device, stream| DeviceSession::open(device, StreamDirection::Playback, stream),
    )?;

    log::info!(
        "Loopback done: {} periods, {} overruns, {} underruns",
        stats.playback_attempts,
        stats.overruns,
        stats.underruns,
    );
    Ok(())
}
