//! 气象站配置
//!
//! 默认值即气象站固件使用的配置，可以通过 `WEATHER_*` 环境变量覆盖。

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::sensor::bmp280::{self, PressureFormula};
use crate::sensor::sht21::{self, CrcPolicy};

/// 计算海拔和折射修正使用的温度来源
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureSource {
    /// SHT21 温度，不可用时退回 BMP280 温度
    #[default]
    HumiditySensor,
    /// BMP280 温度
    Barometer,
}

impl FromStr for TemperatureSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sht21" | "humidity" => Ok(Self::HumiditySensor),
            "bmp280" | "barometer" => Ok(Self::Barometer),
            other => Err(anyhow::anyhow!("未知的温度来源: {}", other)),
        }
    }
}

/// 气象站配置
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub bmp280_address: u8,
    pub sht21_address: u8,
    pub bmp280: bmp280::Settings,
    pub sht21: sht21::Settings,
    pub crc_policy: CrcPolicy,
    pub pressure_formula: PressureFormula,
    pub temperature_source: TemperatureSource,
    /// 观测点海拔(m)，用于折射修正
    pub observer_altitude_m: i32,
    /// 两次读取之间的间隔
    pub poll_interval: Duration,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            bmp280_address: bmp280::DEFAULT_ADDRESS,
            sht21_address: sht21::DEFAULT_ADDRESS,
            bmp280: bmp280::Settings::default(),
            sht21: sht21::Settings::default(),
            crc_policy: CrcPolicy::Ignore,
            pressure_formula: PressureFormula::Reduced,
            temperature_source: TemperatureSource::HumiditySensor,
            observer_altitude_m: 0,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// 解析I2C地址，支持 0x 前缀的十六进制
fn parse_address(value: &str) -> anyhow::Result<u8> {
    let value = value.trim();
    let address = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => value.parse()?,
    };
    // 7位地址
    if address > 0x7F {
        return Err(anyhow::anyhow!("I2C地址超出范围: 0x{:02X}", address));
    }
    Ok(address)
}

fn parse_crc_policy(value: &str) -> anyhow::Result<CrcPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "ignore" | "off" => Ok(CrcPolicy::Ignore),
        "strict" | "on" => Ok(CrcPolicy::Strict),
        other => Err(anyhow::anyhow!("未知的CRC校验策略: {}", other)),
    }
}

fn parse_pressure_formula(value: &str) -> anyhow::Result<PressureFormula> {
    match value.trim().to_ascii_lowercase().as_str() {
        "reduced" => Ok(PressureFormula::Reduced),
        "complete" => Ok(PressureFormula::Complete),
        other => Err(anyhow::anyhow!("未知的压力补偿公式: {}", other)),
    }
}

fn parse_millis(value: &str) -> anyhow::Result<Duration> {
    Ok(Duration::from_millis(value.trim().parse()?))
}

fn parse_altitude(value: &str) -> anyhow::Result<i32> {
    Ok(value.trim().parse()?)
}

impl StationConfig {
    /// 从环境变量读取配置，未设置的项使用默认值
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意键值来源读取配置
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let field = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = field("WEATHER_BMP280_ADDRESS") {
            config.bmp280_address =
                parse_address(&value).context("环境变量 WEATHER_BMP280_ADDRESS 无效")?;
        }
        if let Some(value) = field("WEATHER_SHT21_ADDRESS") {
            config.sht21_address =
                parse_address(&value).context("环境变量 WEATHER_SHT21_ADDRESS 无效")?;
        }
        if let Some(value) = field("WEATHER_CRC_POLICY") {
            config.crc_policy =
                parse_crc_policy(&value).context("环境变量 WEATHER_CRC_POLICY 无效")?;
        }
        if let Some(value) = field("WEATHER_PRESSURE_FORMULA") {
            config.pressure_formula = parse_pressure_formula(&value)
                .context("环境变量 WEATHER_PRESSURE_FORMULA 无效")?;
        }
        if let Some(value) = field("WEATHER_TEMPERATURE_SOURCE") {
            config.temperature_source = value
                .parse()
                .context("环境变量 WEATHER_TEMPERATURE_SOURCE 无效")?;
        }
        if let Some(value) = field("WEATHER_OBSERVER_ALTITUDE") {
            config.observer_altitude_m =
                parse_altitude(&value).context("环境变量 WEATHER_OBSERVER_ALTITUDE 无效")?;
        }
        if let Some(value) = field("WEATHER_POLL_INTERVAL_MS") {
            config.poll_interval =
                parse_millis(&value).context("环境变量 WEATHER_POLL_INTERVAL_MS 无效")?;
        }

        Ok(config)
    }
}
