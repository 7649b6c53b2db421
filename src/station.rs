//! 气象站读取周期
//!
//! 每个周期按固定顺序执行：温度补偿、压力补偿、湿度分离、海拔估算、折射修正，
//! 最后换算风速、风向和光照等级。
//! 任意一步读取或解析失败时，本周期不发布新数据，保留上一次的报告并标记为过期。

use std::fmt;
use std::time::Duration;

use embedded_hal::i2c::I2c;
use embedded_timers::clock::Clock;

use crate::altitude::{self, AltitudeResult};
use crate::config::{StationConfig, TemperatureSource};
use crate::sensor::bmp280::{BMP280, Calibration, CompensatedReading, Compensator, RawMeasurement};
use crate::sensor::sht21::{Quantity, ReadMode, Reading, SHT21, Separator};
use crate::solar::{self, RefractionCorrector, SolarAngle, SunPosition};
use crate::wind::{self, Direction, WindVane};

/// 一次模拟量采样(12位ADC原始读数)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AnalogSample {
    pub wind_speed: u16,
    pub wind_direction: u16,
    pub sun_level: u16,
}

/// 一个周期的输入：传输层读到的原始数据和外部提供的太阳位置
#[derive(Debug)]
pub struct CycleInput {
    /// BMP280 原始温度、压力
    pub raw: anyhow::Result<RawMeasurement>,
    /// SHT21 湿度数据字
    pub humidity_word: anyhow::Result<u32>,
    /// SHT21 温度数据字
    pub temperature_word: anyhow::Result<u32>,
    pub sun: SunPosition,
    /// 观测点海拔(m)
    pub observer_altitude_m: i32,
    pub analog: AnalogSample,
}

/// 气象站报告
#[derive(Debug, Clone, Copy)]
pub struct Report<I> {
    /// BMP280 补偿后的温度、压力
    pub climate: Option<CompensatedReading>,
    /// 相对湿度(%RH)
    pub humidity: Option<f32>,
    /// SHT21 温度(°C)
    pub humidity_temperature: Option<f32>,
    /// 用于计算海拔和折射的温度(°C)
    pub temperature: Option<f64>,
    pub altitude: AltitudeResult,
    pub sun: SolarAngle,
    /// 风速(m/s)
    pub wind_speed: f32,
    pub wind_direction: Direction,
    /// 光照等级
    pub sun_level: u16,
    /// 最近一个周期失败，数据来自更早的周期
    pub stale: bool,
    /// 最近一次成功周期的时间
    pub updated_at: Option<I>,
}

impl<I> Default for Report<I> {
    fn default() -> Self {
        Self {
            climate: None,
            humidity: None,
            humidity_temperature: None,
            temperature: None,
            altitude: AltitudeResult::default(),
            sun: SolarAngle::default(),
            wind_speed: 0.0,
            wind_direction: Direction::default(),
            sun_level: 0,
            stale: false,
            updated_at: None,
        }
    }
}

fn write_value<T: Into<f64>>(f: &mut fmt::Formatter<'_>, value: Option<T>) -> fmt::Result {
    match value {
        Some(value) => write!(f, "{:.2}", value.into()),
        None => write!(f, "-"),
    }
}

impl<I> Report<I> {
    /// 气象数据: `温度|气压|湿度|海拔`，不可用的值为 `-`
    pub fn climate_line(&self) -> String {
        ClimateLine(self).to_string()
    }
}

struct ClimateLine<'r, I>(&'r Report<I>);

impl<I> fmt::Display for ClimateLine<'_, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        write_value(f, report.temperature)?;
        write!(f, "|")?;
        write_value(f, report.climate.map(|c| c.pressure_hpa()))?;
        write!(f, "|")?;
        write_value(f, report.humidity)?;
        write!(f, "|{}", report.altitude.averaged)
    }
}

/// 遥测格式: `{方位角|高度角|风速|风向|光照等级}`
///
/// 风速按整数 m/s 向下取整，风向为位置编号 0-7；过期数据末尾加 `*`
impl<I> fmt::Display for Report<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{:.2}|{:.2}|{}|{}|{}}}",
            self.sun.adjusted_azimuth,
            self.sun.adjusted_elevation,
            self.wind_speed as u8,
            self.wind_direction.position(),
            self.sun_level
        )?;
        if self.stale {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// 气象站处理上下文，保存跨周期的状态
pub struct Station<'a, C: Clock> {
    clock: &'a C,
    config: StationConfig,
    compensator: Compensator,
    separator: Separator,
    corrector: RefractionCorrector,
    vane: WindVane,
    report: Report<C::Instant>,
}

impl<'a, C> Station<'a, C>
where
    C: Clock,
    C::Instant: Copy,
{
    /// 用传感器复位后读取的校准参数创建气象站
    pub fn new(clock: &'a C, config: StationConfig, calibration: Calibration) -> Self {
        Self {
            clock,
            compensator: Compensator::new(calibration, config.pressure_formula),
            separator: Separator::new(config.crc_policy),
            corrector: RefractionCorrector::new(),
            vane: WindVane::new(),
            report: Report::default(),
            config,
        }
    }

    pub fn compensator(&self) -> &Compensator {
        &self.compensator
    }

    /// 传感器复位后替换校准参数
    pub fn recalibrate(&mut self, calibration: Calibration) {
        log::debug!("更新BMP280校准参数");
        self.compensator = Compensator::new(calibration, self.compensator.formula());
    }

    /// 最近的报告
    pub fn report(&self) -> &Report<C::Instant> {
        &self.report
    }

    /// 距离最近一次成功周期的时间，从未成功时为 None
    pub fn age(&self) -> Option<Duration> {
        self.report
            .updated_at
            .map(|instant| self.clock.elapsed(instant))
    }

    /// 从两个传感器读取原始数据并执行一个周期
    pub fn poll<I2C: I2c>(
        &mut self,
        bus: &mut I2C,
        bmp280: &BMP280,
        sht21: &SHT21,
        sun: SunPosition,
        analog: AnalogSample,
    ) -> &Report<C::Instant> {
        let input = CycleInput {
            raw: bmp280.read_raw(bus),
            // 先读湿度再读温度
            humidity_word: sht21.read_word(bus, Quantity::Humidity, ReadMode::Hold),
            temperature_word: sht21.read_word(bus, Quantity::Temperature, ReadMode::Hold),
            sun,
            observer_altitude_m: self.config.observer_altitude_m,
            analog,
        };
        self.run_cycle(input)
    }

    /// 执行一个周期
    pub fn run_cycle(&mut self, input: CycleInput) -> &Report<C::Instant> {
        match self.derive(input) {
            Ok(report) => {
                self.report = report;
            }
            Err(err) => {
                log::warn!("本周期读取失败，保留上一次的数据: {:#}", err);
                self.report.stale = true;
            }
        }
        &self.report
    }

    fn derive(&mut self, input: CycleInput) -> anyhow::Result<Report<C::Instant>> {
        let raw = input.raw?;
        let humidity_word = input.humidity_word?;
        let temperature_word = input.temperature_word?;

        // 1、2. 温度补偿、压力补偿
        let climate = self.compensator.compensate(raw);

        // 3. 湿度分离
        let humidity = match self.separator.separate(humidity_word)? {
            Reading::Humidity(rh) => rh,
            Reading::Temperature(_) => {
                return Err(anyhow::anyhow!("湿度数据字的状态位为温度"));
            }
        };
        let humidity_temperature = match self.separator.separate(temperature_word)? {
            Reading::Temperature(t) => t,
            Reading::Humidity(_) => {
                return Err(anyhow::anyhow!("温度数据字的状态位为湿度"));
            }
        };

        let temperature = match self.config.temperature_source {
            TemperatureSource::HumiditySensor if humidity_temperature.is_finite() => {
                humidity_temperature as f64
            }
            _ => climate.temperature_celsius() as f64,
        };
        let pressure = climate.pressure_hpa();

        // 4. 海拔估算
        let altitude = altitude::estimate(pressure, temperature, humidity as f64);

        // 5. 折射修正，气压按值传入
        let sun = self
            .corrector
            .correct(input.sun, pressure, temperature, input.observer_altitude_m);

        // 6. 风速、风向、光照等级
        let wind_speed = wind::speed(input.analog.wind_speed);
        let wind_direction = self.vane.update(input.analog.wind_direction);
        let sun_level = solar::sun_level(input.analog.sun_level);

        log::debug!(
            "温度: {:.2}℃, 气压: {:.2}hPa, 湿度: {:.2}%, 海拔: {}m, 高度角: {:.4}, 风: {:.2}m/s {}",
            temperature,
            pressure,
            humidity,
            altitude.averaged,
            sun.adjusted_elevation,
            wind_speed,
            wind_direction
        );

        Ok(Report {
            climate: Some(climate),
            humidity: Some(humidity),
            humidity_temperature: Some(humidity_temperature),
            temperature: Some(temperature),
            altitude,
            sun,
            wind_speed,
            wind_direction,
            sun_level,
            stale: false,
            updated_at: Some(self.clock.now()),
        })
    }
}
