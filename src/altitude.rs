//! 根据气压、温度和湿度估算海拔高度

use std::fmt;

/// 标准海平面气压(hPa)
pub const SEA_LEVEL_PRESSURE: f64 = 1013.25;
/// 摄氏度与开尔文的差值
pub const KELVIN_OFFSET: f64 = 273.15;
/// Magnus公式常数(hPa)
pub const MAGNUS_A: f64 = 6.112;
/// Magnus公式常数
pub const MAGNUS_B: f64 = 17.67;
/// Magnus公式常数(°C)
pub const MAGNUS_C: f64 = 243.5;
/// 重力加速度(m/s²)
pub const GRAVITY: f64 = 9.80665;
/// 普适气体常数(J/(mol·K))
pub const UNIVERSAL_GAS_CONSTANT: f64 = 8.31432;
/// 干空气摩尔质量(kg/mol)
pub const MOLAR_MASS_AIR: f64 = 0.0289644;

/// 标准大气温度 / 温度递减率 (T0/L)
const BAROMETRIC_SCALE: f64 = 44330.7692307;
/// 预先计算的 -R*L/(g*M)
const BAROMETRIC_EXPONENT: f64 = -0.1902632;

/// 一个海拔估算值，输入超出公式定义域时为不可用
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Altitude {
    /// 海拔(m)
    Available(f64),
    #[default]
    Unavailable,
}

impl Altitude {
    fn from_meters(meters: f64) -> Self {
        if meters.is_finite() {
            Self::Available(meters)
        } else {
            Self::Unavailable
        }
    }

    pub fn meters(&self) -> Option<f64> {
        match self {
            Self::Available(meters) => Some(*meters),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl fmt::Display for Altitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(meters) => write!(f, "{:.2}", meters),
            Self::Unavailable => write!(f, "-"),
        }
    }
}

/// 三种海拔估算结果
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AltitudeResult {
    /// 仅由气压公式计算的海拔
    pub uncompensated: Altitude,
    /// 扣除水汽分压后计算的海拔
    pub compensated: Altitude,
    /// 两者的平均值
    pub averaged: Altitude,
}

/// 气压公式计算海拔(未补偿)
pub fn uncompensated(pressure_hpa: f64) -> Altitude {
    let ratio = pressure_hpa / SEA_LEVEL_PRESSURE;
    if !ratio.is_finite() || ratio <= 0.0 {
        return Altitude::Unavailable;
    }

    Altitude::from_meters(BAROMETRIC_SCALE * (ratio.powf(BAROMETRIC_EXPONENT) - 1.0))
}

/// 饱和水汽压(hPa)
pub fn saturation_vapor_pressure(temperature_c: f64) -> f64 {
    MAGNUS_A * ((MAGNUS_B * temperature_c) / (temperature_c + MAGNUS_C)).exp()
}

/// 扣除水汽分压后计算海拔(湿度补偿)
pub fn compensated(pressure_hpa: f64, temperature_c: f64, humidity_pct: f64) -> Altitude {
    // 1. 计算水汽分压
    let temp_k = temperature_c + KELVIN_OFFSET;
    let vapor_pressure = saturation_vapor_pressure(temperature_c) * (humidity_pct / 100.0);

    // 2. 扣除水汽分压得到干空气气压
    let adjusted_pressure = pressure_hpa - vapor_pressure;
    if !adjusted_pressure.is_finite() || adjusted_pressure <= 0.0 {
        return Altitude::Unavailable;
    }

    // 3. 等温大气公式计算海拔
    let elevation = (temp_k / GRAVITY)
        * (SEA_LEVEL_PRESSURE / adjusted_pressure).ln()
        * (UNIVERSAL_GAS_CONSTANT / MOLAR_MASS_AIR);

    Altitude::from_meters(elevation)
}

/// 计算三种海拔估算值
pub fn estimate(pressure_hpa: f64, temperature_c: f64, humidity_pct: f64) -> AltitudeResult {
    let uncompensated = uncompensated(pressure_hpa);
    let compensated = compensated(pressure_hpa, temperature_c, humidity_pct);

    let averaged = match (uncompensated, compensated) {
        (Altitude::Available(a), Altitude::Available(b)) => Altitude::from_meters((a + b) / 2.0),
        _ => Altitude::Unavailable,
    };

    AltitudeResult {
        uncompensated,
        compensated,
        averaged,
    }
}
