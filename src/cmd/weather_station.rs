use std::{env, thread};

use anyhow::Context;
use rppal::i2c::I2c;
use weather_station::config::StationConfig;
use weather_station::sensor::bmp280::BMP280;
use weather_station::sensor::sht21::SHT21;
use weather_station::solar::SunPosition;
use weather_station::station::{AnalogSample, Station};
use weather_station::std_clock::StdClock;

/// 读取外部提供的太阳位置(度)，未设置时为0
fn sun_position() -> anyhow::Result<SunPosition> {
    let read = |name: &str| -> anyhow::Result<f64> {
        match env::var(name) {
            Ok(value) => value
                .trim()
                .parse()
                .with_context(|| format!("环境变量 {} 无效", name)),
            Err(_) => Ok(0.0),
        }
    };

    Ok(SunPosition {
        elevation: read("WEATHER_SUN_ELEVATION")?,
        azimuth: read("WEATHER_SUN_AZIMUTH")?,
    })
}

/// 气象站主程序
fn main() -> anyhow::Result<()> {
    // 初始化日志，默认输出info级别
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = StationConfig::from_env()?;
    let sun = sun_position()?;
    log::info!("气象站配置: {:?}", config);

    // 初始化全局时钟
    let clock = StdClock::new();
    // 初始化I2C通信总线
    let mut i2c_bus = I2c::new()?;

    // 创建传感器实例
    let bmp280 = BMP280::new(&mut i2c_bus, Some(config.bmp280_address), config.bmp280)?;
    let sht21 = SHT21::new(&mut i2c_bus, Some(config.sht21_address), config.sht21)?;

    // 校准参数每次复位只读取一次
    let calibration = bmp280.read_calibration(&mut i2c_bus)?;
    let poll_interval = config.poll_interval;
    let mut station = Station::new(&clock, config, calibration);

    // 死循环读取传感器数据
    loop {
        // 树莓派没有ADC，风速、风向和光照通道保持为0
        let report = station.poll(&mut i2c_bus, &bmp280, &sht21, sun, AnalogSample::default());
        log::info!("{}", report);
        log::info!("温度|气压|湿度|海拔: {}", report.climate_line());

        if let Some(age) = station.age() {
            if report_is_old(age, poll_interval) {
                log::warn!("已经 {:.1}s 没有成功读取数据", age.as_secs_f64());
            }
        }

        thread::sleep(poll_interval);
    }
}

/// 连续多个周期失败
fn report_is_old(age: std::time::Duration, poll_interval: std::time::Duration) -> bool {
    age > poll_interval * 5
}
