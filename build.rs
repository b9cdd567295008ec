use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    device: Device,
    stream: Stream,
    loopback: Loopback,
    limits: Limits,
}

#[derive(Deserialize)]
struct Device {
    capture: String,
    playback: String,
}

#[derive(Deserialize)]
struct Stream {
    sample_rate: u32,
    period_frames: usize,
}

#[derive(Deserialize)]
struct Loopback {
    duration_secs: u32,
    channels: u32,
}

#[derive(Deserialize)]
struct Limits {
    max_consecutive_errors: u32,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    // 设备
    println!("cargo:rustc-env=PCM_CAPTURE_DEVICE={}", config.device.capture);
    println!("cargo:rustc-env=PCM_PLAYBACK_DEVICE={}", config.device.playback);

    // 流参数
    println!("cargo:rustc-env=PCM_SAMPLE_RATE={}", config.stream.sample_rate);
    println!("cargo:rustc-env=PCM_PERIOD_FRAMES={}", config.stream.period_frames);

    // 回环演示
    println!("cargo:rustc-env=PCM_LOOPBACK_DURATION_SECS={}", config.loopback.duration_secs);
    println!("cargo:rustc-env=PCM_LOOPBACK_CHANNELS={}", config.loopback.channels);

    println!("cargo:rustc-env=PCM_MAX_CONSECUTIVE_ERRORS={}", config.limits.max_consecutive_errors);
}
