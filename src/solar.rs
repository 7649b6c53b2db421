//! 太阳高度角的大气折射修正
//!
//! 太阳位置(高度角、方位角)由外部星历提供，这里只根据当前气压、温度和观测点
//! 海拔修正高度角。太阳在地平线以下时不做计算，保留上一次修正后的角度。

use std::f64::consts::PI;

/// 外部提供的太阳位置(度)
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SunPosition {
    /// 高度角
    pub elevation: f64,
    /// 方位角
    pub azimuth: f64,
}

/// 太阳角度：原始输入和修正结果(度)
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SolarAngle {
    pub elevation: f64,
    pub azimuth: f64,
    pub adjusted_elevation: f64,
    pub adjusted_azimuth: f64,
}

/// 按温度递减率把气压换算到观测点海拔
///
/// 海拔不大于0时不做换算
pub fn station_pressure(pressure_hpa: f64, observer_altitude_m: i32) -> f64 {
    if observer_altitude_m > 0 {
        pressure_hpa * (1.0 - 0.0065 * observer_altitude_m as f64 / 288.15).powf(5.255)
    } else {
        pressure_hpa
    }
}

/// 计算折射修正量(角分)
///
/// 太阳在地平线以下(高度角不大于0)时返回0
pub fn refraction_arcmin(
    elevation: f64,
    pressure_hpa: f64,
    temperature_c: f64,
    observer_altitude_m: i32,
) -> f64 {
    if !(elevation > 0.0) {
        return 0.0;
    }

    let elevation_rad = elevation * PI / 180.0;
    let pressure = station_pressure(pressure_hpa, observer_altitude_m);

    let refraction = 0.0167 / (elevation_rad + 10.3 / (elevation + 5.11)).tan();
    refraction * (pressure / 1010.0) * (283.0 / (273.0 + temperature_c))
}

/// 光照强度ADC读数换算为光照等级(0-1023)
///
/// 整数除法，向下取整
pub fn sun_level(adc: u16) -> u16 {
    adc / 4
}

/// 太阳高度角折射修正器
///
/// 保存上一次修正后的角度，初始为 0/0
#[derive(Debug, Default, Clone)]
pub struct RefractionCorrector {
    angle: SolarAngle,
}

impl RefractionCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的角度
    pub fn angle(&self) -> SolarAngle {
        self.angle
    }

    /// 修正太阳角度
    ///
    /// - 高度角大于0: 高度角加上折射修正量，方位角不变
    /// - 高度角不大于0: 保留上一次修正后的高度角和方位角
    pub fn correct(
        &mut self,
        sun: SunPosition,
        pressure_hpa: f64,
        temperature_c: f64,
        observer_altitude_m: i32,
    ) -> SolarAngle {
        self.angle.elevation = sun.elevation;
        self.angle.azimuth = sun.azimuth;

        if sun.elevation > 0.0 {
            let mut refraction =
                refraction_arcmin(sun.elevation, pressure_hpa, temperature_c, observer_altitude_m);
            if !refraction.is_finite() {
                log::warn!(
                    "折射修正量无效(气压 {:.2}hPa, 温度 {:.2}°C)，按0处理",
                    pressure_hpa,
                    temperature_c
                );
                refraction = 0.0;
            }

            self.angle.adjusted_elevation = sun.elevation + refraction / 60.0;
            self.angle.adjusted_azimuth = sun.azimuth;
        }

        self.angle
    }
}
